//! Lookup of encrypted root keys by xpub

use crate::crypto::{keystore_xpub, CryptoError};
use bitcoin::bip32::Xpub;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Somewhere keystore blobs can be found by their root xpub
pub trait KeyStore {
    fn get_by_xpub(&self, xpub: &Xpub) -> Option<Vec<u8>>;

    /// Store a blob under the xpub recorded inside it, replacing any previous
    /// blob for that key.
    fn put(&mut self, blob: Vec<u8>) -> Result<Xpub, CryptoError>;
}

/// In-process key store
#[derive(Debug, Default, Clone)]
pub struct MemoryKeyStore {
    keys: HashMap<String, Vec<u8>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Load every `*.json` keystore file in a directory.
    ///
    /// Files that are not keystores are skipped with a warning.
    pub fn load_dir(dir: &Path) -> io::Result<Self> {
        let mut store = Self::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let blob = fs::read(&path)?;
            match store.put(blob) {
                Ok(xpub) => log::debug!("loaded key {} from {}", xpub, path.display()),
                Err(e) => log::warn!("skipping {}: {}", path.display(), e),
            }
        }
        Ok(store)
    }
}

impl KeyStore for MemoryKeyStore {
    fn get_by_xpub(&self, xpub: &Xpub) -> Option<Vec<u8>> {
        self.keys.get(&xpub.to_string()).cloned()
    }

    fn put(&mut self, blob: Vec<u8>) -> Result<Xpub, CryptoError> {
        let xpub = keystore_xpub(&blob)?;
        self.keys.insert(xpub.to_string(), blob);
        Ok(xpub)
    }
}
