//! Security-focused tests.
//!
//! These tests verify:
//! 1. Keystore encryption rejects wrong passphrases and tampered blobs
//! 2. The signing engine rejects bad input without partial output
//! 3. Malformed transactions and addresses fail cleanly
//! 4. Unknown on-chain kinds degrade instead of failing a decode

use vaporkit_core::address::{decode_address, encode_address, AddressError};
use vaporkit_core::crypto::{decrypt_key, encrypt_key, keystore_xpub, reset_password, CryptoError, KdfParams};
use vaporkit_core::keys::XKey;
use vaporkit_core::keystore::{KeyStore, MemoryKeyStore};
use vaporkit_core::network::SIDECHAIN_MAIN;
use vaporkit_core::program::ProgramKind;
use vaporkit_tx::annotate::{decode_raw_tx, DecodeError, InputType, OutputType};
use vaporkit_tx::sign::{EncryptedKey, SignError, SigningEngine, StoredKey};
use vaporkit_tx::template::{SigningInstruction, Template};
use vaporkit_tx::tx::{OutputCommitment, Tx, TxInput, TxOutput};
use vaporkit_tx::types::AssetAmount;

const PASS: &str = "correct horse battery staple";

fn key() -> XKey {
    XKey::from_seed("vault", &[0x42; 64]).unwrap()
}

fn blob() -> Vec<u8> {
    encrypt_key(&key(), PASS, KdfParams::light()).unwrap()
}

fn template(path: &[&str], digests: &[&str]) -> Template {
    Template {
        raw_transaction: "01000000".into(),
        signing_instructions: vec![SigningInstruction {
            derivation_path: path.iter().map(|s| s.to_string()).collect(),
            sign_data: digests.iter().map(|s| s.to_string()).collect(),
        }],
    }
}

/// Rewrite one string field of the keystore JSON
fn tamper(blob: &[u8], section: Option<&str>, field: &str, f: impl Fn(&str) -> String) -> Vec<u8> {
    let mut json: serde_json::Value = serde_json::from_slice(blob).unwrap();
    let target = match section {
        Some(s) => &mut json[s][field],
        None => &mut json[field],
    };
    let old = target.as_str().unwrap().to_string();
    *target = serde_json::Value::String(f(&old));
    serde_json::to_vec(&json).unwrap()
}

fn flip_first_hex(s: &str) -> String {
    let first = if s.starts_with('0') { "1" } else { "0" };
    format!("{}{}", first, &s[1..])
}

// ============================================================================
// 1. Keystore encryption
// ============================================================================

#[test]
fn test_wrong_password_fails_decryption() {
    let result = decrypt_key(&blob(), "wrong horse battery staple");
    assert!(matches!(result, Err(CryptoError::Decrypt)));
}

#[test]
fn test_tampered_ciphertext_fails_decryption() {
    let tampered = tamper(&blob(), Some("crypto"), "ciphertext", flip_first_hex);
    assert!(matches!(decrypt_key(&tampered, PASS), Err(CryptoError::Decrypt)));
}

#[test]
fn test_tampered_nonce_fails_decryption() {
    let tampered = tamper(&blob(), Some("crypto"), "nonce", flip_first_hex);
    assert!(matches!(decrypt_key(&tampered, PASS), Err(CryptoError::Decrypt)));
}

#[test]
fn test_swapped_xpub_fails_decryption() {
    let other = XKey::from_seed("other", &[0x43; 64]).unwrap().xpub.to_string();
    let tampered = tamper(&blob(), None, "xpub", |_| other.clone());
    assert!(matches!(decrypt_key(&tampered, PASS), Err(CryptoError::Decrypt)));
}

#[test]
fn test_garbage_blob_is_decrypt_error() {
    for garbage in [&b""[..], b"{}", b"not json", b"[1,2,3]"] {
        assert!(matches!(decrypt_key(garbage, PASS), Err(CryptoError::Decrypt)));
    }
    assert!(keystore_xpub(b"{}").is_err());
}

#[test]
fn test_blob_does_not_contain_secrets() {
    let key = key();
    let text = String::from_utf8(blob()).unwrap();
    assert!(!text.contains(PASS));
    assert!(!text.contains(&key.xprv.to_string()));
    assert!(!text.contains(&hex::encode(key.xprv.private_key.secret_bytes())));
}

#[test]
fn test_reset_password_invalidates_old() {
    let new_blob = reset_password(&blob(), PASS, "new pass", KdfParams::light()).unwrap();
    assert!(decrypt_key(&new_blob, PASS).is_err());
    let key = decrypt_key(&new_blob, "new pass").unwrap();
    assert_eq!(key.xpub, self::key().xpub);
}

// ============================================================================
// 2. Signing engine
// ============================================================================

#[test]
fn test_wrong_passphrase_no_partial_signatures() {
    let engine = SigningEngine::new();
    let t = template(&[], &[&"00".repeat(32), &"11".repeat(32)]);
    let result = engine.sign_template(&EncryptedKey::new(blob()), "wrong", &t);
    assert_eq!(result, Err(SignError::BadPassphrase));
}

#[test]
fn test_empty_passphrase_is_bad_input() {
    let engine = SigningEngine::new();
    let t = template(&[], &[&"00".repeat(32)]);
    assert!(matches!(
        engine.sign_template(&EncryptedKey::new(blob()), "", &t),
        Err(SignError::BadInput(_))
    ));
}

#[test]
fn test_short_digest_rejected() {
    let engine = SigningEngine::new();
    let short = "00".repeat(31);
    let t = template(&[], &[&"00".repeat(32), &short]);
    assert!(matches!(
        engine.sign_template(&EncryptedKey::new(blob()), PASS, &t),
        Err(SignError::MalformedDigest { input: 0, position: 1, .. })
    ));
}

#[test]
fn test_bad_path_segment_rejected() {
    let engine = SigningEngine::new();
    for path in ["0001", "zzzzzzzz", "0000000100"] {
        let t = template(&[path], &[&"00".repeat(32)]);
        assert!(matches!(
            engine.sign_template(&EncryptedKey::new(blob()), PASS, &t),
            Err(SignError::MalformedTemplate(_))
        ));
    }
}

#[test]
fn test_malformed_template_json() {
    let engine = SigningEngine::new();
    let result = engine.sign_template_json(&EncryptedKey::new(blob()), PASS, "{\"raw\": 1}");
    assert!(matches!(result, Err(SignError::MalformedTemplate(_))));
}

#[test]
fn test_stored_key_lookup() {
    let mut store = MemoryKeyStore::new();
    let xpub = store.put(blob()).unwrap();
    let engine = SigningEngine::new();
    let t = template(&[], &[&"00".repeat(32)]);

    let signed = engine.sign_template(&StoredKey::new(&store, xpub), PASS, &t).unwrap();
    assert_eq!(signed.signatures[0].len(), 1);

    let stranger = XKey::from_seed("stranger", &[9; 64]).unwrap().xpub;
    assert!(matches!(
        engine.sign_template(&StoredKey::new(&store, stranger), PASS, &t),
        Err(SignError::KeyNotFound(_))
    ));
}

// ============================================================================
// 3. Malformed transactions and addresses
// ============================================================================

fn simple_tx() -> Tx {
    Tx {
        version: 1,
        time_range: 0,
        inputs: vec![TxInput::Coinbase {
            arbitrary: vec![1, 2, 3],
        }],
        outputs: vec![TxOutput::IntraChain(OutputCommitment {
            asset_amount: AssetAmount::native(100),
            vm_version: 1,
            control_program: vec![0x51],
        })],
    }
}

#[test]
fn test_empty_raw_tx_is_bad_input() {
    assert!(matches!(decode_raw_tx("", &SIDECHAIN_MAIN), Err(DecodeError::BadInput)));
}

#[test]
fn test_truncated_raw_tx_fails() {
    let hex = simple_tx().to_hex();
    for cut in (2..hex.len()).step_by(2) {
        assert!(
            decode_raw_tx(&hex[..cut], &SIDECHAIN_MAIN).is_err(),
            "prefix of {} hex chars decoded",
            cut
        );
    }
    assert!(decode_raw_tx(&hex, &SIDECHAIN_MAIN).is_ok());
}

#[test]
fn test_trailing_bytes_rejected() {
    let hex = format!("{}00", simple_tx().to_hex());
    assert!(matches!(decode_raw_tx(&hex, &SIDECHAIN_MAIN), Err(DecodeError::Codec(_))));
}

#[test]
fn test_non_hex_rejected() {
    assert!(decode_raw_tx("07zz", &SIDECHAIN_MAIN).is_err());
    assert!(decode_raw_tx("070", &SIDECHAIN_MAIN).is_err());
}

#[test]
fn test_oversized_varint_rejected() {
    // Ten byte varint for the version
    let hex = format!("{}01", "ff".repeat(9));
    assert!(decode_raw_tx(&hex, &SIDECHAIN_MAIN).is_err());
}

#[test]
fn test_address_rejections() {
    let good = encode_address(&[7; 20], ProgramKind::PubKeyHash, &SIDECHAIN_MAIN).unwrap();

    // Checksum
    let mut bad = good.clone();
    let last = bad.pop().unwrap();
    bad.push(if last == 'q' { 'p' } else { 'q' });
    assert!(matches!(decode_address(&bad), Err(AddressError::BadAddressFormat(_))));

    // Prefix
    let foreign = good.replacen("vp1", "bc1", 1);
    assert!(matches!(decode_address(&foreign), Err(AddressError::UnknownAddressPrefix(_))));

    assert!(decode_address("").is_err());
    assert!(decode_address("vp1").is_err());
}

// ============================================================================
// 4. Unknown kinds
// ============================================================================

#[test]
fn test_unknown_kinds_decode_with_empty_type() {
    let mut tx = simple_tx();
    tx.inputs.push(TxInput::Unknown {
        type_tag: 0x7f,
        body: vec![1, 2, 3, 4],
    });
    tx.outputs.push(TxOutput::Unknown {
        type_tag: 0x7e,
        body: vec![5, 6],
    });

    let decoded = decode_raw_tx(&tx.to_hex(), &SIDECHAIN_MAIN).unwrap();
    assert_eq!(decoded.inputs[0].kind, InputType::Coinbase);
    assert_eq!(decoded.inputs[1].kind, InputType::Unknown);
    assert_eq!(decoded.outputs[1].kind, OutputType::Unknown);

    let json = serde_json::to_value(&decoded).unwrap();
    assert_eq!(json["inputs"][1]["type"], "");
    assert_eq!(json["outputs"][1]["type"], "");
}
