//! vaporkit core
//!
//! Key material, addresses and control programs for a sidechain wallet.
//!
//! # Key Derivation
//!
//! Root keys are BIP-32 master keys built from a BIP-39 seed. Account keys
//! live at `[key_space, account_key_index, index]`, all non-hardened, so an
//! account's receive programs can be derived from its xpubs alone.
//!
//! # Encrypted Storage
//!
//! Root keys are stored as JSON keystores sealed with Argon2id + AES-256-GCM.

pub mod account;
pub mod address;
pub mod argument;
pub mod crypto;
pub mod keys;
pub mod keystore;
pub mod network;
pub mod path;
pub mod program;
pub mod seed;
pub mod serde_hex;

pub use account::{derive_pubkey_info, Account, AccountError, ControlProgram, PubKeyInfo};
pub use address::{address_from_program, decode_address, encode_address, AddressError, WitnessAddress};
pub use argument::{convert_argument, ArgumentError, ContractArgument};
pub use crypto::{decrypt_key, encrypt_key, reset_password, Argon2Cipher, CryptoError, KdfParams, KeyCipher};
pub use keys::{Bip32Deriver, Deriver, KeyError, XKey};
pub use keystore::{KeyStore, MemoryKeyStore};
pub use network::{Chain, Network, NetworkError, NetworkParams};
pub use path::{account_path, KeyPath, KeySpace, PathError};
pub use program::{ProgramError, ProgramKind};
pub use seed::*;
