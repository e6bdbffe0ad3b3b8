//! Control program construction
//!
//! Two witness templates are produced and recognized:
//!
//! ```text
//! pay-to-witness-pubkey-hash:  OP_0 <20-byte HASH160(pubkey)>
//! pay-to-witness-script-hash:  OP_0 <32-byte SHA256(witness script)>
//! ```
//!
//! Multisig witness scripts are `<m> <pk1> ... <pkn> <n> OP_CHECKMULTISIG`,
//! compiled from a miniscript `multi` fragment.

use bitcoin::hashes::{sha256, Hash};
use bitcoin::secp256k1::PublicKey;
use bitcoin::{CompressedPublicKey, Script, ScriptBuf, WPubkeyHash, WScriptHash};
use miniscript::{Miniscript, Segwitv0};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

pub const PUBKEY_HASH_LEN: usize = 20;
pub const SCRIPT_HASH_LEN: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProgramError {
    #[error("Invalid quorum: {quorum} of {keys} keys")]
    InvalidQuorum { quorum: usize, keys: usize },
    #[error("No public keys given")]
    NoKeys,
    #[error("Hash length {got} does not match {kind:?} template")]
    BadHashLength { kind: ProgramKind, got: usize },
    #[error("Multisig script construction failed: {0}")]
    Script(String),
}

/// Which witness template a program follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramKind {
    PubKeyHash,
    ScriptHash,
}

impl ProgramKind {
    pub fn hash_len(&self) -> usize {
        match self {
            ProgramKind::PubKeyHash => PUBKEY_HASH_LEN,
            ProgramKind::ScriptHash => SCRIPT_HASH_LEN,
        }
    }
}

/// A multisig witness script and the program that commits to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiSigProgram {
    pub witness_script: ScriptBuf,
    pub script_hash: [u8; SCRIPT_HASH_LEN],
    pub program: ScriptBuf,
}

/// HASH160 of a compressed public key
pub fn pubkey_hash(pubkey: &PublicKey) -> [u8; PUBKEY_HASH_LEN] {
    CompressedPublicKey(*pubkey).wpubkey_hash().to_byte_array()
}

/// Single-signer witness program
pub fn build_single_sig_program(pubkey_hash: &[u8; PUBKEY_HASH_LEN]) -> ScriptBuf {
    ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(*pubkey_hash))
}

/// M-of-N multisig witness script
pub fn build_multisig_script(pubkeys: &[PublicKey], quorum: usize) -> Result<ScriptBuf, ProgramError> {
    if pubkeys.is_empty() {
        return Err(ProgramError::NoKeys);
    }
    if quorum == 0 || quorum > pubkeys.len() {
        return Err(ProgramError::InvalidQuorum {
            quorum,
            keys: pubkeys.len(),
        });
    }

    let keys: Vec<String> = pubkeys
        .iter()
        .map(|pk| bitcoin::PublicKey::new(*pk).to_string())
        .collect();
    let fragment = format!("multi({},{})", quorum, keys.join(","));
    let ms = Miniscript::<bitcoin::PublicKey, Segwitv0>::from_str(&fragment)
        .map_err(|e| ProgramError::Script(e.to_string()))?;

    Ok(ms.encode())
}

/// M-of-N multisig wrapped in a witness-script-hash program
pub fn build_multisig_program(
    pubkeys: &[PublicKey],
    quorum: usize,
) -> Result<MultiSigProgram, ProgramError> {
    let witness_script = build_multisig_script(pubkeys, quorum)?;
    let script_hash = sha256::Hash::hash(witness_script.as_bytes()).to_byte_array();
    let program = ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(script_hash));

    Ok(MultiSigProgram {
        witness_script,
        script_hash,
        program,
    })
}

/// Program for a known template and hash
pub fn program_from_hash(kind: ProgramKind, hash: &[u8]) -> Result<ScriptBuf, ProgramError> {
    let bad_len = || ProgramError::BadHashLength {
        kind,
        got: hash.len(),
    };
    match kind {
        ProgramKind::PubKeyHash => {
            let arr: [u8; PUBKEY_HASH_LEN] = hash.try_into().map_err(|_| bad_len())?;
            Ok(build_single_sig_program(&arr))
        }
        ProgramKind::ScriptHash => {
            let arr: [u8; SCRIPT_HASH_LEN] = hash.try_into().map_err(|_| bad_len())?;
            Ok(ScriptBuf::new_p2wsh(&WScriptHash::from_byte_array(arr)))
        }
    }
}

/// Classify a program by shape and return the hash it commits to.
///
/// Only the two witness templates are recognized; anything else is `None`.
pub fn recognize(program: &[u8]) -> Option<(ProgramKind, &[u8])> {
    let script = Script::from_bytes(program);
    if script.is_p2wpkh() {
        Some((ProgramKind::PubKeyHash, &program[2..]))
    } else if script.is_p2wsh() {
        Some((ProgramKind::ScriptHash, &program[2..]))
    } else {
        None
    }
}
