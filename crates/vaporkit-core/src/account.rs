//! Accounts and receive programs
//!
//! An account is a set of root xpubs plus a signature quorum. Each receive
//! program derives every xpub along
//! `[KeySpace::Account, account.key_index, index]` and commits to the
//! resulting keys: a plain pubkey-hash program for single-key accounts,
//! a multisig script hash otherwise.
//!
//! Nothing here persists state. Callers store accounts and control programs
//! and pass the next free index back in.

use crate::address::{encode_address, AddressError};
use crate::keys::{derive_xpubs, public_keys, Deriver, KeyError};
use crate::network::NetworkParams;
use crate::path::{account_path, KeyPath, KeySpace, PathError, MAX_NORMAL_INDEX};
use crate::program::{
    build_multisig_program, build_single_sig_program, pubkey_hash, ProgramError, ProgramKind,
};
use bitcoin::bip32::Xpub;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::ScriptBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Account key index used when deriving standalone public keys
pub const PUBKEY_ACCOUNT_INDEX: u64 = 1;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Bad input: {0}")]
    BadInput(String),
    #[error("Duplicate xpub: {0}")]
    DuplicateXPub(String),
    #[error("Invalid quorum: {quorum} of {keys} keys")]
    InvalidQuorum { quorum: usize, keys: usize },
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Program(#[from] ProgramError),
    #[error(transparent)]
    Address(#[from] AddressError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub alias: String,
    /// Root xpubs in canonical (sorted) order
    pub xpubs: Vec<Xpub>,
    pub quorum: usize,
    /// Distinguishes accounts sharing the same root keys
    pub key_index: u64,
}

impl Account {
    pub fn new(
        alias: &str,
        mut xpubs: Vec<Xpub>,
        quorum: usize,
        key_index: u64,
    ) -> Result<Self, AccountError> {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() {
            return Err(AccountError::BadInput("alias empty".into()));
        }
        if xpubs.is_empty() {
            return Err(AccountError::BadInput("at least one xpub required".into()));
        }
        if key_index > MAX_NORMAL_INDEX {
            return Err(PathError::InvalidIndex(key_index).into());
        }

        xpubs.sort_by_key(|x| x.encode());
        if let Some(dup) = xpubs.windows(2).find(|w| w[0] == w[1]) {
            return Err(AccountError::DuplicateXPub(dup[0].to_string()));
        }

        if quorum == 0 || quorum > xpubs.len() {
            return Err(AccountError::InvalidQuorum {
                quorum,
                keys: xpubs.len(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            alias,
            xpubs,
            quorum,
            key_index,
        })
    }

    /// Derivation path of the receive program at `index`
    pub fn receive_path(&self, index: u64) -> Result<KeyPath, AccountError> {
        Ok(account_path(KeySpace::Account, self.key_index, index)?)
    }

    /// Build the control program at `index`.
    ///
    /// The template follows the number of xpubs alone: one key gives a
    /// pubkey-hash program, more give an M-of-N script hash.
    pub fn next_receive_program<D: Deriver + ?Sized>(
        &self,
        deriver: &D,
        index: u64,
        change: bool,
        params: &NetworkParams,
    ) -> Result<ControlProgram, AccountError> {
        let path = self.receive_path(index)?;
        let derived = public_keys(&derive_xpubs(deriver, &self.xpubs, &path)?);

        let (hash, kind, program) = match derived.as_slice() {
            [single] => {
                let hash = pubkey_hash(single);
                let program = build_single_sig_program(&hash);
                (hash.to_vec(), ProgramKind::PubKeyHash, program)
            }
            keys => {
                let ms = build_multisig_program(keys, self.quorum)?;
                (ms.script_hash.to_vec(), ProgramKind::ScriptHash, ms.program)
            }
        };
        let address = encode_address(&hash, kind, params)?;

        log::debug!(
            "account {} receive program at {} ({:?})",
            self.id,
            path,
            kind
        );

        Ok(ControlProgram {
            account_id: self.id,
            address,
            key_index: index,
            control_program: program,
            change,
        })
    }
}

/// A receive program owned by an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlProgram {
    pub account_id: Uuid,
    pub address: String,
    pub key_index: u64,
    #[serde(with = "crate::serde_hex::script")]
    pub control_program: ScriptBuf,
    pub change: bool,
}

impl ControlProgram {
    /// Hex SHA-256 of the program, the key a caller files this record under
    pub fn storage_key(&self) -> String {
        hex::encode(sha256::Hash::hash(self.control_program.as_bytes()).to_byte_array())
    }
}

/// A root public key and the account path a wallet would derive it along
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyInfo {
    pub xpub: Xpub,
    pub pubkey: String,
    pub derived_path: KeyPath,
}

/// Report the public key of `xpub` together with the account path for
/// `index` in the default account key space.
///
/// The key is the xpub's own key, not a child. `index` starts at 1.
pub fn derive_pubkey_info(xpub: &Xpub, index: u64) -> Result<PubKeyInfo, AccountError> {
    if index == 0 {
        return Err(AccountError::BadInput("index must be positive".into()));
    }
    let path = account_path(KeySpace::Account, PUBKEY_ACCOUNT_INDEX, index)?;

    Ok(PubKeyInfo {
        xpub: *xpub,
        pubkey: hex::encode(xpub.public_key.serialize()),
        derived_path: path,
    })
}
