//! Keystore encryption
//!
//! Root keys are stored as a JSON keystore: metadata (id, alias, xpub) in
//! clear, the serialized extended private key sealed with AES-256-GCM under a
//! key stretched from the passphrase by Argon2id. The xpub is bound as
//! associated data, so swapping it in the file breaks decryption.
//!
//! Every decryption failure collapses into one error. Callers cannot tell a
//! wrong passphrase from a corrupt file.

use crate::keys::XKey;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use zeroize::Zeroizing;

const ARGON2_OUTPUT_LEN: usize = 32; // 256 bits for AES-256

/// Salt length for Argon2
const SALT_LEN: usize = 16;

/// Nonce length for AES-256-GCM
const NONCE_LEN: usize = 12;

/// Upper bounds accepted when reading a keystore file
const MAX_M_COST: u32 = 262_144; // 256 MiB
const MAX_T_COST: u32 = 16;
const MAX_P_COST: u32 = 16;

const KEYSTORE_VERSION: u32 = 1;
const CIPHER_NAME: &str = "aes-256-gcm";
const KDF_NAME: &str = "argon2id";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),
    #[error("could not decrypt key with given passphrase")]
    Decrypt,
    #[error("Invalid keystore format")]
    InvalidFormat,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory in KiB
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl KdfParams {
    /// 64 MiB, 3 passes, 4 lanes
    pub const fn standard() -> Self {
        Self {
            m_cost: 65_536,
            t_cost: 3,
            p_cost: 4,
        }
    }

    /// 4 MiB, 3 passes, 1 lane. For constrained hosts and tests.
    pub const fn light() -> Self {
        Self {
            m_cost: 4_096,
            t_cost: 3,
            p_cost: 1,
        }
    }

    fn within_bounds(&self) -> bool {
        self.m_cost <= MAX_M_COST && self.t_cost <= MAX_T_COST && self.p_cost <= MAX_P_COST
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

#[derive(Serialize, Deserialize)]
struct KeystoreFile {
    version: u32,
    id: Uuid,
    alias: String,
    key_type: String,
    xpub: Xpub,
    crypto: CryptoSection,
}

#[derive(Serialize, Deserialize)]
struct CryptoSection {
    cipher: String,
    kdf: String,
    kdfparams: KdfSection,
    nonce: String,
    ciphertext: String,
}

#[derive(Serialize, Deserialize)]
struct KdfSection {
    #[serde(flatten)]
    params: KdfParams,
    salt: String,
}

/// Derive an encryption key from a passphrase using Argon2id
fn derive_key(
    passphrase: &str,
    salt: &[u8],
    kdf: &KdfParams,
) -> Result<Zeroizing<[u8; ARGON2_OUTPUT_LEN]>, CryptoError> {
    let params = Params::new(kdf.m_cost, kdf.t_cost, kdf.p_cost, Some(ARGON2_OUTPUT_LEN))
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; ARGON2_OUTPUT_LEN]);
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key[..])
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    Ok(key)
}

/// Encrypt a root key into a keystore blob.
///
/// Each call draws a fresh salt and nonce.
pub fn encrypt_key(key: &XKey, passphrase: &str, kdf: KdfParams) -> Result<Vec<u8>, CryptoError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let nonce_arr = Aes256Gcm::generate_nonce(&mut OsRng);
    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&nonce_arr);

    let enc_key = derive_key(passphrase, &salt, &kdf)?;
    let plaintext = Zeroizing::new(key.xprv.encode());
    let xpub = key.xpub.to_string();

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(enc_key.as_slice()));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_slice(),
                aad: xpub.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let file = KeystoreFile {
        version: KEYSTORE_VERSION,
        id: key.id,
        alias: key.alias.clone(),
        key_type: key.key_type.clone(),
        xpub: key.xpub,
        crypto: CryptoSection {
            cipher: CIPHER_NAME.to_string(),
            kdf: KDF_NAME.to_string(),
            kdfparams: KdfSection {
                params: kdf,
                salt: hex::encode(salt),
            },
            nonce: hex::encode(nonce),
            ciphertext: hex::encode(ciphertext),
        },
    };

    serde_json::to_vec(&file).map_err(|e| CryptoError::EncryptionFailed(e.to_string()))
}

/// Decrypt a keystore blob.
///
/// # Errors
/// Returns [`CryptoError::Decrypt`] if the passphrase is wrong or the blob is
/// malformed or tampered with.
pub fn decrypt_key(blob: &[u8], passphrase: &str) -> Result<XKey, CryptoError> {
    let file: KeystoreFile = serde_json::from_slice(blob).map_err(|_| CryptoError::Decrypt)?;
    if file.version != KEYSTORE_VERSION
        || file.crypto.cipher != CIPHER_NAME
        || file.crypto.kdf != KDF_NAME
        || !file.crypto.kdfparams.params.within_bounds()
    {
        return Err(CryptoError::Decrypt);
    }

    let salt = hex::decode(&file.crypto.kdfparams.salt).map_err(|_| CryptoError::Decrypt)?;
    let nonce = hex::decode(&file.crypto.nonce).map_err(|_| CryptoError::Decrypt)?;
    let ciphertext = hex::decode(&file.crypto.ciphertext).map_err(|_| CryptoError::Decrypt)?;
    if salt.len() != SALT_LEN || nonce.len() != NONCE_LEN {
        return Err(CryptoError::Decrypt);
    }

    let enc_key =
        derive_key(passphrase, &salt, &file.crypto.kdfparams.params).map_err(|_| CryptoError::Decrypt)?;
    let xpub = file.xpub.to_string();

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(enc_key.as_slice()));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: ciphertext.as_slice(),
                    aad: xpub.as_bytes(),
                },
            )
            .map_err(|_| CryptoError::Decrypt)?,
    );

    let xprv = Xpriv::decode(&plaintext).map_err(|_| CryptoError::Decrypt)?;
    if Xpub::from_priv(&Secp256k1::new(), &xprv) != file.xpub {
        return Err(CryptoError::Decrypt);
    }

    Ok(XKey {
        id: file.id,
        key_type: file.key_type,
        alias: file.alias,
        xprv,
        xpub: file.xpub,
    })
}

/// Re-encrypt a keystore blob under a new passphrase, keeping its id
pub fn reset_password(
    blob: &[u8],
    old_passphrase: &str,
    new_passphrase: &str,
    kdf: KdfParams,
) -> Result<Vec<u8>, CryptoError> {
    Argon2Cipher::new(kdf).reset_password(blob, old_passphrase, new_passphrase)
}

/// Read the root xpub of a keystore blob without decrypting it
pub fn keystore_xpub(blob: &[u8]) -> Result<Xpub, CryptoError> {
    let file: KeystoreFile =
        serde_json::from_slice(blob).map_err(|_| CryptoError::InvalidFormat)?;
    Ok(file.xpub)
}

/// Sealing and unsealing of root keys
pub trait KeyCipher {
    fn encrypt(&self, key: &XKey, passphrase: &str) -> Result<Vec<u8>, CryptoError>;
    fn decrypt(&self, blob: &[u8], passphrase: &str) -> Result<XKey, CryptoError>;

    fn reset_password(
        &self,
        blob: &[u8],
        old_passphrase: &str,
        new_passphrase: &str,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = self.decrypt(blob, old_passphrase)?;
        self.encrypt(&key, new_passphrase)
    }
}

/// The JSON keystore format above
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Cipher {
    pub params: KdfParams,
}

impl Argon2Cipher {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }
}

impl KeyCipher for Argon2Cipher {
    fn encrypt(&self, key: &XKey, passphrase: &str) -> Result<Vec<u8>, CryptoError> {
        encrypt_key(key, passphrase, self.params)
    }

    fn decrypt(&self, blob: &[u8], passphrase: &str) -> Result<XKey, CryptoError> {
        decrypt_key(blob, passphrase)
    }
}
