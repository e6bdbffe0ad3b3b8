//! Network parameter sets
//!
//! Each chain (the mainchain and its sidechain) runs three networks: main,
//! test and solo. A parameter set only carries what address encoding needs,
//! the bech32 human-readable prefix, plus a checkpoint list that this crate
//! never reads.
//!
//! There is no process-wide "active" selection. Every encode/decode call takes
//! the parameters it should use, and address decoding reports the set it
//! inferred instead of overwriting anything.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
    #[error("Unknown chain: {0}")]
    UnknownChain(String),
}

/// Which network of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
    Solo,
}

impl FromStr for Network {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" => Ok(Network::Test),
            "solo" | "solonet" => Ok(Network::Solo),
            other => Err(NetworkError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Solo => "solo",
        };
        f.write_str(name)
    }
}

/// Which chain a parameter set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// The main chain, whose outputs cross-chain inputs reference
    Mainchain,
    /// The side chain this wallet transacts on
    Sidechain,
}

impl FromStr for Chain {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainchain" => Ok(Chain::Mainchain),
            "sidechain" => Ok(Chain::Sidechain),
            other => Err(NetworkError::UnknownChain(other.to_string())),
        }
    }
}

/// A known good block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub height: u64,
    pub hash: [u8; 32],
}

/// Configuration for one network of one chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Human-readable identifier ("main", "test", "solo")
    pub name: &'static str,
    /// Bech32 human-readable prefix for segwit addresses
    pub bech32_hrp: &'static str,
    pub chain: Chain,
    pub network: Network,
    pub checkpoints: &'static [Checkpoint],
}

pub const MAINCHAIN_MAIN: NetworkParams = NetworkParams {
    name: "main",
    bech32_hrp: "bm",
    chain: Chain::Mainchain,
    network: Network::Main,
    checkpoints: &[],
};

pub const MAINCHAIN_TEST: NetworkParams = NetworkParams {
    name: "test",
    bech32_hrp: "tm",
    chain: Chain::Mainchain,
    network: Network::Test,
    checkpoints: &[],
};

pub const MAINCHAIN_SOLO: NetworkParams = NetworkParams {
    name: "solo",
    bech32_hrp: "sm",
    chain: Chain::Mainchain,
    network: Network::Solo,
    checkpoints: &[],
};

pub const SIDECHAIN_MAIN: NetworkParams = NetworkParams {
    name: "main",
    bech32_hrp: "vp",
    chain: Chain::Sidechain,
    network: Network::Main,
    checkpoints: &[],
};

pub const SIDECHAIN_TEST: NetworkParams = NetworkParams {
    name: "test",
    bech32_hrp: "tp",
    chain: Chain::Sidechain,
    network: Network::Test,
    checkpoints: &[],
};

pub const SIDECHAIN_SOLO: NetworkParams = NetworkParams {
    name: "solo",
    bech32_hrp: "sp",
    chain: Chain::Sidechain,
    network: Network::Solo,
    checkpoints: &[],
};

/// Every parameter set an address prefix can resolve to
pub const KNOWN_PARAMS: [NetworkParams; 6] = [
    MAINCHAIN_MAIN,
    MAINCHAIN_TEST,
    MAINCHAIN_SOLO,
    SIDECHAIN_MAIN,
    SIDECHAIN_TEST,
    SIDECHAIN_SOLO,
];

impl NetworkParams {
    /// Look up the parameter set for a chain and network
    pub fn new(chain: Chain, network: Network) -> Self {
        match (chain, network) {
            (Chain::Mainchain, Network::Main) => MAINCHAIN_MAIN,
            (Chain::Mainchain, Network::Test) => MAINCHAIN_TEST,
            (Chain::Mainchain, Network::Solo) => MAINCHAIN_SOLO,
            (Chain::Sidechain, Network::Main) => SIDECHAIN_MAIN,
            (Chain::Sidechain, Network::Test) => SIDECHAIN_TEST,
            (Chain::Sidechain, Network::Solo) => SIDECHAIN_SOLO,
        }
    }

    /// The mainchain set on the same network.
    ///
    /// Cross-chain inputs and outputs live in the mainchain's address space.
    pub fn mainchain(&self) -> Self {
        Self::new(Chain::Mainchain, self.network)
    }

    /// Find the parameter set whose prefix matches, ignoring case
    pub fn from_hrp(hrp: &str) -> Option<Self> {
        let hrp = hrp.to_lowercase();
        KNOWN_PARAMS.iter().copied().find(|p| p.bech32_hrp == hrp)
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        SIDECHAIN_MAIN
    }
}
