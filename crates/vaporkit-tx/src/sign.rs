//! Signing engine
//!
//! The engine unlocks a root key once, then for each signing instruction
//! derives the child key along the instruction's path and signs every digest
//! with it. The result mirrors the template: one signature list per input,
//! signatures in digest order. Any failure aborts the whole call, so a caller
//! never sees a partial signature set.
//!
//! Where the root key comes from is a [`KeyProvider`]:
//!
//! - [`EncryptedKey`] decrypts a keystore blob handed in with the request
//! - [`StoredKey`] looks the blob up by xpub in a [`KeyStore`]

use crate::template::{SignResponse, Template};
use crate::tx::Tx;
use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::hashes::{sha256, Hash as _};
use secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vaporkit_core::crypto::{Argon2Cipher, KeyCipher};
use vaporkit_core::keys::{Bip32Deriver, Deriver, XKey};
use vaporkit_core::keystore::KeyStore;
use vaporkit_core::path::KeyPath;

pub const DIGEST_LEN: usize = 32;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignError {
    #[error("Bad input: {0}")]
    BadInput(String),
    #[error("could not decrypt key with given passphrase")]
    BadPassphrase,
    #[error("malformed template: {0}")]
    MalformedTemplate(String),
    #[error("malformed digest for input {input} at {position}: {reason}")]
    MalformedDigest {
        input: usize,
        position: usize,
        reason: String,
    },
    #[error("no key stored for xpub {0}")]
    KeyNotFound(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Produces and checks signatures over 32-byte digests
pub trait Signer {
    fn sign(&self, key: &Xpriv, digest: &[u8; DIGEST_LEN]) -> Result<Vec<u8>, SignError>;
    fn verify(&self, key: &PublicKey, digest: &[u8; DIGEST_LEN], signature: &[u8]) -> bool;
}

/// Deterministic (RFC 6979) ECDSA with 64-byte compact signatures
pub struct EcdsaSigner {
    secp: Secp256k1<All>,
}

impl EcdsaSigner {
    pub fn new() -> Self {
        Self {
            secp: Secp256k1::new(),
        }
    }
}

impl Default for EcdsaSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl Signer for EcdsaSigner {
    fn sign(&self, key: &Xpriv, digest: &[u8; DIGEST_LEN]) -> Result<Vec<u8>, SignError> {
        let msg = Message::from_digest(*digest);
        let sig = self.secp.sign_ecdsa(&msg, &key.private_key);
        Ok(sig.serialize_compact().to_vec())
    }

    fn verify(&self, key: &PublicKey, digest: &[u8; DIGEST_LEN], signature: &[u8]) -> bool {
        let Ok(sig) = Signature::from_compact(signature) else {
            return false;
        };
        let msg = Message::from_digest(*digest);
        self.secp.verify_ecdsa(&msg, &sig, key).is_ok()
    }
}

/// Source of the root key to sign with
pub trait KeyProvider {
    /// Unlock the root key. Every failure to decrypt is `BadPassphrase`.
    fn unlock(&self, passphrase: &str) -> Result<XKey, SignError>;
}

/// A keystore blob supplied by the caller
pub struct EncryptedKey<C = Argon2Cipher> {
    blob: Vec<u8>,
    cipher: C,
}

impl EncryptedKey<Argon2Cipher> {
    pub fn new(blob: impl Into<Vec<u8>>) -> Self {
        Self::with_cipher(blob, Argon2Cipher::default())
    }
}

impl<C: KeyCipher> EncryptedKey<C> {
    pub fn with_cipher(blob: impl Into<Vec<u8>>, cipher: C) -> Self {
        Self {
            blob: blob.into(),
            cipher,
        }
    }
}

impl<C: KeyCipher> KeyProvider for EncryptedKey<C> {
    fn unlock(&self, passphrase: &str) -> Result<XKey, SignError> {
        self.cipher
            .decrypt(&self.blob, passphrase)
            .map_err(|_| SignError::BadPassphrase)
    }
}

/// A key held in a key store, addressed by its root xpub
pub struct StoredKey<'a, S: ?Sized, C = Argon2Cipher> {
    store: &'a S,
    xpub: Xpub,
    cipher: C,
}

impl<'a, S: KeyStore + ?Sized> StoredKey<'a, S, Argon2Cipher> {
    pub fn new(store: &'a S, xpub: Xpub) -> Self {
        Self::with_cipher(store, xpub, Argon2Cipher::default())
    }
}

impl<'a, S: KeyStore + ?Sized, C: KeyCipher> StoredKey<'a, S, C> {
    pub fn with_cipher(store: &'a S, xpub: Xpub, cipher: C) -> Self {
        Self {
            store,
            xpub,
            cipher,
        }
    }
}

impl<S: KeyStore + ?Sized, C: KeyCipher> KeyProvider for StoredKey<'_, S, C> {
    fn unlock(&self, passphrase: &str) -> Result<XKey, SignError> {
        let blob = self
            .store
            .get_by_xpub(&self.xpub)
            .ok_or_else(|| SignError::KeyNotFound(self.xpub.to_string()))?;
        let key = self
            .cipher
            .decrypt(&blob, passphrase)
            .map_err(|_| SignError::BadPassphrase)?;
        if key.xpub != self.xpub {
            return Err(SignError::BadPassphrase);
        }
        Ok(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSignature {
    pub signature: String,
}

fn parse_digest(input: usize, position: usize, text: &str) -> Result<[u8; DIGEST_LEN], SignError> {
    let malformed = |reason: String| SignError::MalformedDigest {
        input,
        position,
        reason,
    };
    let bytes = hex::decode(text).map_err(|e| malformed(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| malformed(format!("expected {} bytes, got {}", DIGEST_LEN, bytes.len())))
}

pub struct SigningEngine<D = Bip32Deriver, S = EcdsaSigner> {
    deriver: D,
    signer: S,
}

impl SigningEngine {
    pub fn new() -> Self {
        Self::with(Bip32Deriver::new(), EcdsaSigner::new())
    }
}

impl Default for SigningEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Deriver, S: Signer> SigningEngine<D, S> {
    pub fn with(deriver: D, signer: S) -> Self {
        Self { deriver, signer }
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    pub fn sign_template<P: KeyProvider + ?Sized>(
        &self,
        provider: &P,
        passphrase: &str,
        template: &Template,
    ) -> Result<SignResponse, SignError> {
        if passphrase.is_empty() {
            return Err(SignError::BadInput("passphrase empty".into()));
        }
        Tx::from_hex(&template.raw_transaction)
            .map_err(|e| SignError::MalformedTemplate(format!("raw transaction: {}", e)))?;
        let key = provider.unlock(passphrase)?;

        let mut signatures = Vec::with_capacity(template.signing_instructions.len());
        for (i, instruction) in template.signing_instructions.iter().enumerate() {
            let path = KeyPath::from_hex_segments(&instruction.derivation_path)
                .map_err(|e| SignError::MalformedTemplate(format!("input {}: {}", i, e)))?;
            let child = self
                .deriver
                .derive_private(&key.xprv, &path)
                .map_err(|e| SignError::Signing(e.to_string()))?;

            let mut sigs = Vec::with_capacity(instruction.sign_data.len());
            for (j, text) in instruction.sign_data.iter().enumerate() {
                let digest = parse_digest(i, j, text)?;
                sigs.push(hex::encode(self.signer.sign(&child, &digest)?));
            }
            signatures.push(sigs);
        }

        log::debug!(
            "signed {} inputs with key {}",
            signatures.len(),
            key.xpub
        );

        Ok(SignResponse {
            raw_transaction: template.raw_transaction.clone(),
            signatures,
        })
    }

    /// Same as [`Self::sign_template`] for a JSON template
    pub fn sign_template_json<P: KeyProvider + ?Sized>(
        &self,
        provider: &P,
        passphrase: &str,
        json: &str,
    ) -> Result<SignResponse, SignError> {
        let template: Template =
            serde_json::from_str(json).map_err(|e| SignError::MalformedTemplate(e.to_string()))?;
        self.sign_template(provider, passphrase, &template)
    }

    /// Sign SHA-256 of `message` with the root key
    pub fn sign_message<P: KeyProvider + ?Sized>(
        &self,
        provider: &P,
        passphrase: &str,
        message: &[u8],
    ) -> Result<MessageSignature, SignError> {
        if passphrase.is_empty() || message.is_empty() {
            return Err(SignError::BadInput("args empty".into()));
        }
        let key = provider.unlock(passphrase)?;
        let digest = sha256::Hash::hash(message).to_byte_array();
        let signature = self.signer.sign(&key.xprv, &digest)?;
        Ok(MessageSignature {
            signature: hex::encode(signature),
        })
    }
}
