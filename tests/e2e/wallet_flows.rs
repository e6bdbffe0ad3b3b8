//! End-to-end wallet flows across vaporkit crates.
//!
//! Exercises:
//!
//! 1. Root key creation, encryption and xpub derivation
//! 2. Accounts and receive programs for single and multi key accounts
//! 3. Address round trips on every network
//! 4. Transaction encoding, decoding and annotation
//! 5. Template construction and signing against the entry graph sighash
//!
//! Run with: cargo test --test wallet_flows

use bitcoin::bip32::Xpub;
use vaporkit_core::account::Account;
use vaporkit_core::address::{decode_address, encode_address};
use vaporkit_core::crypto::{encrypt_key, KdfParams};
use vaporkit_core::keys::{Bip32Deriver, Deriver, XKey};
use vaporkit_core::network::{NetworkParams, KNOWN_PARAMS, SIDECHAIN_MAIN, SIDECHAIN_TEST};
use vaporkit_core::path::{KeyPath, MAX_NORMAL_INDEX};
use vaporkit_core::program::{build_multisig_program, recognize, ProgramKind};
use vaporkit_tx::annotate::{decode_raw_tx, InputType, OutputType};
use vaporkit_tx::entry::TxGraph;
use vaporkit_tx::sign::{EcdsaSigner, EncryptedKey, Signer, SigningEngine};
use vaporkit_tx::template::{SigningInstruction, Template};
use vaporkit_tx::tx::{OutputCommitment, SpendCommitment, Tx, TxInput, TxOutput};
use vaporkit_tx::types::{AssetAmount, Hash};

const PASS: &str = "e2e passphrase";

fn root(n: u8) -> XKey {
    XKey::from_seed(&format!("key{}", n), &[n; 64]).unwrap()
}

fn spend_to(program: Vec<u8>, amount: u64, source: u8) -> TxInput {
    TxInput::Spend {
        commitment: SpendCommitment {
            source_id: Hash::new([source; 32]),
            asset_amount: AssetAmount::native(amount),
            source_position: 0,
            vm_version: 1,
            control_program: program,
        },
        arguments: vec![],
    }
}

fn pay(program: Vec<u8>, amount: u64) -> TxOutput {
    TxOutput::IntraChain(OutputCommitment {
        asset_amount: AssetAmount::native(amount),
        vm_version: 1,
        control_program: program,
    })
}

// ============================================================================
// 1. Derivation
// ============================================================================

#[test]
fn test_derivation_is_deterministic() {
    let key = root(1);
    let deriver = Bip32Deriver::new();
    let path = KeyPath::from_indices(&[1, 7, 3]).unwrap();

    let a = deriver.derive_private(&key.xprv, &path).unwrap();
    let b = deriver.derive_private(&key.xprv, &path).unwrap();
    assert_eq!(a.encode(), b.encode());

    let xa = deriver.derive_public(&key.xpub, &path).unwrap();
    let xb = deriver.derive_public(&key.xpub, &path).unwrap();
    assert_eq!(xa, xb);

    // Public derivation agrees with private derivation
    let secp = bitcoin::secp256k1::Secp256k1::new();
    assert_eq!(Xpub::from_priv(&secp, &a), xa);
}

#[test]
fn test_root_path_is_identity() {
    let key = root(2);
    let deriver = Bip32Deriver::new();
    let same = deriver.derive_public(&key.xpub, &KeyPath::root()).unwrap();
    assert_eq!(same, key.xpub);
}

#[test]
fn test_index_above_normal_range_rejected() {
    assert!(KeyPath::from_indices(&[MAX_NORMAL_INDEX]).is_ok());
    assert!(KeyPath::from_indices(&[MAX_NORMAL_INDEX + 1]).is_err());
}

// ============================================================================
// 2. Accounts and receive programs
// ============================================================================

#[test]
fn test_single_key_account_scenario() {
    let key = root(3);
    let account = Account::new("solo", vec![key.xpub], 1, 1).unwrap();
    let cp = account
        .next_receive_program(&Bip32Deriver::new(), 0, false, &SIDECHAIN_TEST)
        .unwrap();

    let decoded = decode_address(&cp.address).unwrap();
    assert_eq!(decoded.kind, ProgramKind::PubKeyHash);
    assert_eq!(decoded.params, SIDECHAIN_TEST);
    assert_eq!(decoded.to_program().unwrap(), cp.control_program);
}

#[test]
fn test_three_key_quorum_two_scenario() {
    let xpubs = vec![root(4).xpub, root(5).xpub, root(6).xpub];
    let account = Account::new("shared", xpubs, 2, 1).unwrap();
    let cp = account
        .next_receive_program(&Bip32Deriver::new(), 3, false, &SIDECHAIN_MAIN)
        .unwrap();

    let decoded = decode_address(&cp.address).unwrap();
    assert_eq!(decoded.kind, ProgramKind::ScriptHash);
    assert_eq!(decoded.hash.len(), 32);
    assert_eq!(
        recognize(cp.control_program.as_bytes()).map(|(k, _)| k),
        Some(ProgramKind::ScriptHash)
    );
}

#[test]
fn test_template_follows_key_count_not_quorum() {
    let deriver = Bip32Deriver::new();
    let xpubs = vec![root(7).xpub, root(8).xpub];
    for quorum in 1..=2 {
        let account = Account::new("pair", xpubs.clone(), quorum, 1).unwrap();
        let cp = account
            .next_receive_program(&deriver, 1, false, &SIDECHAIN_MAIN)
            .unwrap();
        assert_eq!(
            recognize(cp.control_program.as_bytes()).map(|(k, _)| k),
            Some(ProgramKind::ScriptHash)
        );
    }
}

#[test]
fn test_xpub_order_does_not_change_program() {
    let deriver = Bip32Deriver::new();
    let (a, b) = (root(9).xpub, root(10).xpub);
    let ab = Account::new("x", vec![a, b], 1, 1).unwrap();
    let ba = Account::new("x", vec![b, a], 1, 1).unwrap();

    let p1 = ab.next_receive_program(&deriver, 5, false, &SIDECHAIN_MAIN).unwrap();
    let p2 = ba.next_receive_program(&deriver, 5, false, &SIDECHAIN_MAIN).unwrap();
    assert_eq!(p1.control_program, p2.control_program);
}

#[test]
fn test_distinct_indices_give_distinct_programs() {
    let deriver = Bip32Deriver::new();
    let account = Account::new("many", vec![root(11).xpub], 1, 1).unwrap();
    let programs: Vec<_> = (1..=5)
        .map(|i| {
            account
                .next_receive_program(&deriver, i, false, &SIDECHAIN_MAIN)
                .unwrap()
                .storage_key()
        })
        .collect();
    for (i, a) in programs.iter().enumerate() {
        for b in &programs[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn test_quorum_bounds() {
    let keys: Vec<_> = [12u8, 13, 14]
        .iter()
        .map(|n| root(*n).xpub.public_key)
        .collect();
    assert!(build_multisig_program(&keys, 0).is_err());
    assert!(build_multisig_program(&keys, 4).is_err());
    assert!(build_multisig_program(&keys, 1).is_ok());
    assert!(build_multisig_program(&keys, 3).is_ok());
}

// ============================================================================
// 3. Addresses
// ============================================================================

#[test]
fn test_address_roundtrip_all_networks() {
    for params in KNOWN_PARAMS {
        for (kind, len) in [(ProgramKind::PubKeyHash, 20), (ProgramKind::ScriptHash, 32)] {
            let hash: Vec<u8> = (0..len as u8).collect();
            let address = encode_address(&hash, kind, &params).unwrap();
            let decoded = decode_address(&address).unwrap();
            assert_eq!(decoded.hash, hash);
            assert_eq!(decoded.kind, kind);
            assert_eq!(decoded.params, params);

            // Encoding is idempotent through decode
            assert_eq!(decoded.encode().unwrap(), address);
        }
    }
}

#[test]
fn test_decode_does_not_leak_network() {
    let test_address = encode_address(&[1; 20], ProgramKind::PubKeyHash, &SIDECHAIN_TEST).unwrap();
    let _ = decode_address(&test_address).unwrap();

    // Encoding after decoding a testnet address still uses the caller's params
    let main_address = encode_address(&[1; 20], ProgramKind::PubKeyHash, &SIDECHAIN_MAIN).unwrap();
    assert!(main_address.starts_with(SIDECHAIN_MAIN.bech32_hrp));
    assert_ne!(main_address, test_address);
}

// ============================================================================
// 4. Decode and sign a wallet transaction
// ============================================================================

fn wallet_tx(params: &NetworkParams) -> (Tx, Account) {
    let key = root(20);
    let account = Account::new("wallet", vec![key.xpub], 1, 1).unwrap();
    let deriver = Bip32Deriver::new();
    let receive = account.next_receive_program(&deriver, 1, false, params).unwrap();
    let change = account.next_receive_program(&deriver, 2, true, params).unwrap();

    let tx = Tx {
        version: 1,
        time_range: 0,
        inputs: vec![
            spend_to(receive.control_program.to_bytes(), 10_000, 1),
            spend_to(receive.control_program.to_bytes(), 2_500, 2),
        ],
        outputs: vec![
            pay(vec![0x51], 7_000),
            pay(change.control_program.to_bytes(), 5_000),
        ],
    };
    (tx, account)
}

#[test]
fn test_decode_wallet_tx() {
    let (tx, _) = wallet_tx(&SIDECHAIN_MAIN);
    let decoded = decode_raw_tx(&tx.to_hex(), &SIDECHAIN_MAIN).unwrap();

    assert_eq!(decoded.tx_id, tx.id());
    assert_eq!(decoded.fee, 500);
    assert_eq!(decoded.size as usize, tx.serialized_size());
    assert!(decoded.inputs.iter().all(|i| i.kind == InputType::Spend));
    assert!(decoded.inputs[0].address.starts_with("vp1"));
    assert_eq!(decoded.outputs[0].kind, OutputType::Control);
    assert!(decoded.outputs[0].address.is_empty());
    assert_eq!(decoded.outputs[1].position, 1);

    let json = serde_json::to_value(&decoded).unwrap();
    assert_eq!(json["inputs"][0]["type"], "spend");
    assert_eq!(json["outputs"][1]["type"], "control");
}

#[test]
fn test_sign_wallet_tx_against_sighash() {
    let key = root(20);
    let (tx, account) = wallet_tx(&SIDECHAIN_MAIN);
    let paths = vec![account.receive_path(1).unwrap(), account.receive_path(1).unwrap()];
    let template = Template::for_transaction(&tx, &paths).unwrap();

    let blob = encrypt_key(&key, PASS, KdfParams::light()).unwrap();
    let engine = SigningEngine::new();
    let signed = engine
        .sign_template(&EncryptedKey::new(blob), PASS, &template)
        .unwrap();

    assert_eq!(signed.raw_transaction, template.raw_transaction);
    assert_eq!(signed.signatures.len(), 2);

    let graph = TxGraph::build(&tx);
    let child = Bip32Deriver::new()
        .derive_public(&key.xpub, &paths[0])
        .unwrap();
    for (i, sigs) in signed.signatures.iter().enumerate() {
        assert_eq!(sigs.len(), 1);
        let digest = *graph.sig_hash(i).unwrap().as_bytes();
        let sig = hex::decode(&sigs[0]).unwrap();
        assert!(EcdsaSigner::new().verify(&child.public_key, &digest, &sig));
    }
}

#[test]
fn test_witness_arguments_do_not_change_tx_id() {
    let (mut tx, _) = wallet_tx(&SIDECHAIN_MAIN);
    let before = tx.id();
    tx.inputs[0].set_arguments(vec![vec![0xde, 0xad]]);
    assert_eq!(tx.id(), before);
    assert_ne!(tx.to_hex(), wallet_tx(&SIDECHAIN_MAIN).0.to_hex());
}

#[test]
fn test_root_key_scenario() {
    let key = root(21);
    let blob = encrypt_key(&key, PASS, KdfParams::light()).unwrap();
    let template = Template {
        raw_transaction: "01000000".into(),
        signing_instructions: vec![SigningInstruction {
            derivation_path: vec![],
            sign_data: vec!["00".repeat(32)],
        }],
    };

    let signed = SigningEngine::new()
        .sign_template(&EncryptedKey::new(blob), PASS, &template)
        .unwrap();
    assert_eq!(signed.signatures, vec![vec![signed.signatures[0][0].clone()]]);

    let sig = hex::decode(&signed.signatures[0][0]).unwrap();
    assert!(EcdsaSigner::new().verify(&key.xpub.public_key, &[0u8; 32], &sig));
}

#[test]
fn test_signature_alignment() {
    let key = root(22);
    let blob = encrypt_key(&key, PASS, KdfParams::light()).unwrap();
    let digests = |n: usize| (0..n).map(|i| format!("{:064x}", i + 1)).collect::<Vec<_>>();
    let template = Template {
        raw_transaction: "01000000".into(),
        signing_instructions: vec![
            SigningInstruction {
                derivation_path: vec!["00000001".into()],
                sign_data: digests(3),
            },
            SigningInstruction {
                derivation_path: vec![],
                sign_data: vec![],
            },
            SigningInstruction {
                derivation_path: vec!["00000001".into(), "00000002".into()],
                sign_data: digests(1),
            },
        ],
    };

    let signed = SigningEngine::new()
        .sign_template(&EncryptedKey::new(blob), PASS, &template)
        .unwrap();
    let counts: Vec<usize> = signed.signatures.iter().map(Vec::len).collect();
    assert_eq!(counts, vec![3, 0, 1]);

    // Each signature covers its own digest, in order
    let child = Bip32Deriver::new()
        .derive_public(&key.xpub, &KeyPath::from_indices(&[1]).unwrap())
        .unwrap();
    for (j, sig) in signed.signatures[0].iter().enumerate() {
        let mut digest = [0u8; 32];
        digest[31] = (j + 1) as u8;
        assert!(EcdsaSigner::new().verify(&child.public_key, &digest, &hex::decode(sig).unwrap()));
    }
}
