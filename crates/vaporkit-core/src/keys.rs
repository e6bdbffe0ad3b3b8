//! Root keys and hierarchical derivation
//!
//! A root key pair is a BIP-32 master key created from a BIP-39 seed.
//! Child keys are derived through the [`Deriver`] capability so engines can
//! run against a test double.

use crate::path::KeyPath;
use crate::seed::{derive_seed, generate_mnemonic, SeedError};
use bip39::Mnemonic;
use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::secp256k1::{All, PublicKey, Secp256k1};
use bitcoin::Network;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Key type recorded in keystore files
pub const KEY_TYPE: &str = "bip32_secp256k1";

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Derivation failed: {0}")]
    DerivationFailed(String),
    #[error("Bad input: {0}")]
    BadInput(String),
    #[error(transparent)]
    Seed(#[from] SeedError),
}

/// A root key pair with its keystore metadata
#[derive(Clone)]
pub struct XKey {
    pub id: Uuid,
    pub key_type: String,
    pub alias: String,
    pub xprv: Xpriv,
    pub xpub: Xpub,
}

impl XKey {
    /// Build a root key from seed bytes
    pub fn from_seed(alias: &str, seed: &[u8]) -> Result<Self, KeyError> {
        let alias = alias.trim();
        if alias.is_empty() {
            return Err(KeyError::BadInput("alias empty".into()));
        }
        let xprv = Xpriv::new_master(Network::Bitcoin, seed)
            .map_err(|e| KeyError::DerivationFailed(e.to_string()))?;
        let xpub = Xpub::from_priv(&Secp256k1::new(), &xprv);

        Ok(Self {
            id: Uuid::new_v4(),
            key_type: KEY_TYPE.to_string(),
            alias: alias.to_string(),
            xprv,
            xpub,
        })
    }

    /// Create a fresh root key. The mnemonic is returned for backup.
    pub fn generate(alias: &str) -> Result<(Self, Mnemonic), KeyError> {
        let mnemonic = generate_mnemonic()?;
        let seed = derive_seed(&mnemonic, "");
        let key = Self::from_seed(alias, seed.as_slice())?;
        log::debug!("generated root key {} ({})", key.id, key.alias);
        Ok((key, mnemonic))
    }
}

impl fmt::Debug for XKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XKey")
            .field("id", &self.id)
            .field("key_type", &self.key_type)
            .field("alias", &self.alias)
            .field("xpub", &self.xpub)
            .finish_non_exhaustive()
    }
}

/// Child key derivation along a [`KeyPath`].
///
/// Implementations must treat the empty path as identity.
pub trait Deriver {
    fn derive_private(&self, xprv: &Xpriv, path: &KeyPath) -> Result<Xpriv, KeyError>;
    fn derive_public(&self, xpub: &Xpub, path: &KeyPath) -> Result<Xpub, KeyError>;
}

/// BIP-32 derivation over secp256k1
pub struct Bip32Deriver {
    secp: Secp256k1<All>,
}

impl Bip32Deriver {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for Bip32Deriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Deriver for Bip32Deriver {
    fn derive_private(&self, xprv: &Xpriv, path: &KeyPath) -> Result<Xpriv, KeyError> {
        if path.is_root() {
            return Ok(*xprv);
        }
        xprv.derive_priv(&self.secp, path)
            .map_err(|e| KeyError::DerivationFailed(e.to_string()))
    }

    fn derive_public(&self, xpub: &Xpub, path: &KeyPath) -> Result<Xpub, KeyError> {
        if path.is_root() {
            return Ok(*xpub);
        }
        xpub.derive_pub(&self.secp, path)
            .map_err(|e| KeyError::DerivationFailed(e.to_string()))
    }
}

/// Derive every key in `xpubs` along the same path, preserving order
pub fn derive_xpubs<D: Deriver + ?Sized>(
    deriver: &D,
    xpubs: &[Xpub],
    path: &KeyPath,
) -> Result<Vec<Xpub>, KeyError> {
    xpubs
        .iter()
        .map(|xpub| deriver.derive_public(xpub, path))
        .collect()
}

/// Raw public keys of a set of extended public keys
pub fn public_keys(xpubs: &[Xpub]) -> Vec<PublicKey> {
    xpubs.iter().map(|x| x.public_key).collect()
}
