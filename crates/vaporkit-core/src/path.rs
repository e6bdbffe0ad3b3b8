//! Derivation paths
//!
//! An account path is three non-hardened BIP-32 steps:
//!
//! ```text
//! [ key_space, account_key_index, index ]
//! ```
//!
//! On the wire every step is a 4-byte big-endian hex string, which is the
//! shape signing templates carry in `derivation_path`.

use bitcoin::bip32::ChildNumber;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// Largest value a non-hardened child index can hold
pub const MAX_NORMAL_INDEX: u64 = 0x7fff_ffff;

/// Width of one serialized path segment
pub const SEGMENT_LEN: usize = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PathError {
    #[error("Index {0} cannot be represented as a non-hardened child number")]
    InvalidIndex(u64),
    #[error("Path segment must be 4 bytes, got {0}")]
    BadSegmentLength(usize),
    #[error("Path segment is not valid hex: {0}")]
    BadSegmentHex(String),
}

/// Key classes. Each class owns the first path step, so paths of different
/// classes never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeySpace {
    Asset = 0,
    /// Ordinary account keys (receiving and change addresses)
    Account = 1,
}

/// An ordered list of non-hardened child numbers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<ChildNumber>);

impl KeyPath {
    /// The empty path: derivation along it returns the parent unchanged
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a path from raw indices, rejecting anything that is not a
    /// non-hardened child number.
    pub fn from_indices(indices: &[u64]) -> Result<Self, PathError> {
        indices
            .iter()
            .map(|&idx| normal_child(idx))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parse wire segments (4 bytes each, big-endian)
    pub fn from_segments<B: AsRef<[u8]>>(segments: &[B]) -> Result<Self, PathError> {
        let mut path = Vec::with_capacity(segments.len());
        for segment in segments {
            let bytes = segment.as_ref();
            let arr: [u8; SEGMENT_LEN] = bytes
                .try_into()
                .map_err(|_| PathError::BadSegmentLength(bytes.len()))?;
            path.push(normal_child(u32::from_be_bytes(arr) as u64)?);
        }
        Ok(Self(path))
    }

    /// Parse hex wire segments
    pub fn from_hex_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, PathError> {
        let raw = segments
            .iter()
            .map(|s| hex::decode(s.as_ref()).map_err(|e| PathError::BadSegmentHex(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_segments(&raw)
    }

    /// Serialize as 4-byte big-endian segments
    pub fn to_segments(&self) -> Vec<[u8; SEGMENT_LEN]> {
        self.0.iter().map(|c| u32::from(*c).to_be_bytes()).collect()
    }

    pub fn to_hex_segments(&self) -> Vec<String> {
        self.to_segments().iter().map(hex::encode).collect()
    }
}

impl AsRef<[ChildNumber]> for KeyPath {
    fn as_ref(&self) -> &[ChildNumber] {
        &self.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for child in &self.0 {
            write!(f, "/{}", child)?;
        }
        Ok(())
    }
}

impl Serialize for KeyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_hex_segments().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let segments = Vec::<String>::deserialize(deserializer)?;
        Self::from_hex_segments(&segments).map_err(serde::de::Error::custom)
    }
}

fn normal_child(idx: u64) -> Result<ChildNumber, PathError> {
    if idx > MAX_NORMAL_INDEX {
        return Err(PathError::InvalidIndex(idx));
    }
    ChildNumber::from_normal_idx(idx as u32).map_err(|_| PathError::InvalidIndex(idx))
}

/// Path of the `index`-th key of an account.
///
/// Distinct `(key_space, account_key_index, index)` triples always produce
/// distinct paths.
pub fn account_path(
    key_space: KeySpace,
    account_key_index: u64,
    index: u64,
) -> Result<KeyPath, PathError> {
    KeyPath::from_indices(&[key_space as u64, account_key_index, index])
}
