//! Transaction model
//!
//! Inputs and outputs are closed sum types with an `Unknown` arm. A kind this
//! crate does not understand is kept as its raw type tag and body so the
//! transaction still decodes, re-encodes byte for byte and can be displayed.

use crate::types::{AssetAmount, Hash};

pub const INPUT_CROSS_CHAIN: u8 = 0;
pub const INPUT_SPEND: u8 = 1;
pub const INPUT_COINBASE: u8 = 2;
pub const INPUT_VETO: u8 = 3;

pub const OUTPUT_INTRA_CHAIN: u8 = 0;
pub const OUTPUT_CROSS_CHAIN: u8 = 1;
pub const OUTPUT_VOTE: u8 = 2;

/// The output an input spends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendCommitment {
    /// Entry that produced the spent output
    pub source_id: Hash,
    pub asset_amount: AssetAmount,
    pub source_position: u64,
    pub vm_version: u64,
    pub control_program: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCommitment {
    pub asset_amount: AssetAmount,
    pub vm_version: u64,
    pub control_program: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxInput {
    Spend {
        commitment: SpendCommitment,
        arguments: Vec<Vec<u8>>,
    },
    Coinbase {
        arbitrary: Vec<u8>,
    },
    /// Withdraws a vote
    Veto {
        commitment: SpendCommitment,
        arguments: Vec<Vec<u8>>,
        vote: Vec<u8>,
    },
    /// Claims an output locked on the mainchain
    CrossChain {
        commitment: SpendCommitment,
        arguments: Vec<Vec<u8>>,
        asset_definition: Vec<u8>,
        issuance_vm_version: u64,
        issuance_program: Vec<u8>,
    },
    Unknown {
        type_tag: u8,
        body: Vec<u8>,
    },
}

impl TxInput {
    pub fn type_tag(&self) -> u8 {
        match self {
            TxInput::CrossChain { .. } => INPUT_CROSS_CHAIN,
            TxInput::Spend { .. } => INPUT_SPEND,
            TxInput::Coinbase { .. } => INPUT_COINBASE,
            TxInput::Veto { .. } => INPUT_VETO,
            TxInput::Unknown { type_tag, .. } => *type_tag,
        }
    }

    pub fn is_coinbase(&self) -> bool {
        matches!(self, TxInput::Coinbase { .. })
    }

    pub fn commitment(&self) -> Option<&SpendCommitment> {
        match self {
            TxInput::Spend { commitment, .. }
            | TxInput::Veto { commitment, .. }
            | TxInput::CrossChain { commitment, .. } => Some(commitment),
            TxInput::Coinbase { .. } | TxInput::Unknown { .. } => None,
        }
    }

    pub fn asset_amount(&self) -> Option<AssetAmount> {
        self.commitment().map(|c| c.asset_amount)
    }

    pub fn control_program(&self) -> Option<&[u8]> {
        self.commitment().map(|c| c.control_program.as_slice())
    }

    /// Witness arguments, empty for kinds that carry none
    pub fn arguments(&self) -> &[Vec<u8>] {
        match self {
            TxInput::Spend { arguments, .. }
            | TxInput::Veto { arguments, .. }
            | TxInput::CrossChain { arguments, .. } => arguments,
            TxInput::Coinbase { .. } | TxInput::Unknown { .. } => &[],
        }
    }

    /// Replace the witness arguments. Returns false for kinds without any.
    pub fn set_arguments(&mut self, args: Vec<Vec<u8>>) -> bool {
        match self {
            TxInput::Spend { arguments, .. }
            | TxInput::Veto { arguments, .. }
            | TxInput::CrossChain { arguments, .. } => {
                *arguments = args;
                true
            }
            TxInput::Coinbase { .. } | TxInput::Unknown { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutput {
    IntraChain(OutputCommitment),
    /// Locks value for release on the mainchain
    CrossChain(OutputCommitment),
    Vote {
        vote: Vec<u8>,
        commitment: OutputCommitment,
    },
    Unknown {
        type_tag: u8,
        body: Vec<u8>,
    },
}

impl TxOutput {
    pub fn type_tag(&self) -> u8 {
        match self {
            TxOutput::IntraChain(_) => OUTPUT_INTRA_CHAIN,
            TxOutput::CrossChain(_) => OUTPUT_CROSS_CHAIN,
            TxOutput::Vote { .. } => OUTPUT_VOTE,
            TxOutput::Unknown { type_tag, .. } => *type_tag,
        }
    }

    pub fn commitment(&self) -> Option<&OutputCommitment> {
        match self {
            TxOutput::IntraChain(c) | TxOutput::CrossChain(c) => Some(c),
            TxOutput::Vote { commitment, .. } => Some(commitment),
            TxOutput::Unknown { .. } => None,
        }
    }

    pub fn asset_amount(&self) -> Option<AssetAmount> {
        self.commitment().map(|c| c.asset_amount)
    }

    pub fn control_program(&self) -> Option<&[u8]> {
        self.commitment().map(|c| c.control_program.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tx {
    pub version: u64,
    pub time_range: u64,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl Tx {
    pub fn is_coinbase(&self) -> bool {
        self.inputs.iter().any(TxInput::is_coinbase)
    }
}
