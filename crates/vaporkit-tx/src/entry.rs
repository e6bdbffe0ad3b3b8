//! Content-addressed entry graph of a transaction
//!
//! Every input and output maps to one typed entry. An entry's id is
//!
//! ```text
//! SHA256("entryid:" || type || ":" || SHA256(body))
//! ```
//!
//! where `body` is the entry's fields in codec encoding. Witness arguments
//! are not part of any body, so ids and signing digests do not change when
//! signatures are attached.
//!
//! Inputs feed a single mux entry, outputs draw from the mux by position and
//! the header commits to the outputs. The header id is the transaction id.

use crate::codec::{write_varint, write_varstr};
use crate::tx::{OutputCommitment, SpendCommitment, Tx, TxInput, TxOutput};
use crate::types::{AssetAmount, Hash};
use bitcoin::hashes::{sha256, Hash as _, HashEngine};
use std::collections::HashMap;

/// Where an output's value comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSource {
    pub ref_id: Hash,
    pub value: AssetAmount,
    pub position: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub vm_version: u64,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    TxHeader {
        version: u64,
        time_range: u64,
        result_ids: Vec<Hash>,
    },
    Mux {
        sources: Vec<Hash>,
    },
    Spend {
        spent_output_id: Hash,
        ordinal: u64,
    },
    Coinbase {
        arbitrary: Vec<u8>,
        ordinal: u64,
    },
    VetoInput {
        spent_output_id: Hash,
        ordinal: u64,
    },
    CrossChainInput {
        mainchain_output_id: Hash,
        ordinal: u64,
    },
    IntraChainOutput {
        source: ValueSource,
        program: Program,
        ordinal: u64,
    },
    CrossChainOutput {
        source: ValueSource,
        program: Program,
        ordinal: u64,
    },
    VoteOutput {
        source: ValueSource,
        program: Program,
        vote: Vec<u8>,
        ordinal: u64,
    },
    /// An input or output kind this crate does not know
    Unknown {
        type_tag: u8,
        body: Vec<u8>,
        ordinal: u64,
    },
}

const MAINCHAIN_OUTPUT_TYPE: &str = "output1";

fn write_hash(buf: &mut Vec<u8>, h: &Hash) {
    buf.extend_from_slice(h.as_bytes());
}

fn write_source(buf: &mut Vec<u8>, s: &ValueSource) {
    write_hash(buf, &s.ref_id);
    buf.extend_from_slice(s.value.asset_id.as_bytes());
    write_varint(buf, s.value.amount);
    write_varint(buf, s.position);
}

fn write_program(buf: &mut Vec<u8>, p: &Program) {
    write_varint(buf, p.vm_version);
    write_varstr(buf, &p.code);
}

fn hash_entry(type_name: &str, body: &[u8]) -> Hash {
    let inner = sha256::Hash::hash(body);
    let mut engine = sha256::Hash::engine();
    engine.input(b"entryid:");
    engine.input(type_name.as_bytes());
    engine.input(b":");
    engine.input(inner.as_byte_array());
    Hash(sha256::Hash::from_engine(engine).to_byte_array())
}

impl Entry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Entry::TxHeader { .. } => "txheader",
            Entry::Mux { .. } => "mux1",
            Entry::Spend { .. } => "spend1",
            Entry::Coinbase { .. } => "coinbase1",
            Entry::VetoInput { .. } => "vetoInput1",
            Entry::CrossChainInput { .. } => "crosschaininput1",
            Entry::IntraChainOutput { .. } => "intrachainoutput1",
            Entry::CrossChainOutput { .. } => "crosschainoutput1",
            Entry::VoteOutput { .. } => "voteOutput1",
            Entry::Unknown { .. } => "unknown",
        }
    }

    fn body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Entry::TxHeader {
                version,
                time_range,
                result_ids,
            } => {
                write_varint(&mut buf, *version);
                write_varint(&mut buf, *time_range);
                write_varint(&mut buf, result_ids.len() as u64);
                result_ids.iter().for_each(|id| write_hash(&mut buf, id));
            }
            Entry::Mux { sources } => {
                write_varint(&mut buf, sources.len() as u64);
                sources.iter().for_each(|id| write_hash(&mut buf, id));
            }
            Entry::Spend {
                spent_output_id,
                ordinal,
            }
            | Entry::VetoInput {
                spent_output_id,
                ordinal,
            } => {
                write_hash(&mut buf, spent_output_id);
                write_varint(&mut buf, *ordinal);
            }
            Entry::Coinbase { arbitrary, ordinal } => {
                write_varstr(&mut buf, arbitrary);
                write_varint(&mut buf, *ordinal);
            }
            Entry::CrossChainInput {
                mainchain_output_id,
                ordinal,
            } => {
                write_hash(&mut buf, mainchain_output_id);
                write_varint(&mut buf, *ordinal);
            }
            Entry::IntraChainOutput {
                source,
                program,
                ordinal,
            }
            | Entry::CrossChainOutput {
                source,
                program,
                ordinal,
            } => {
                write_source(&mut buf, source);
                write_program(&mut buf, program);
                write_varint(&mut buf, *ordinal);
            }
            Entry::VoteOutput {
                source,
                program,
                vote,
                ordinal,
            } => {
                write_source(&mut buf, source);
                write_program(&mut buf, program);
                write_varstr(&mut buf, vote);
                write_varint(&mut buf, *ordinal);
            }
            Entry::Unknown {
                type_tag,
                body,
                ordinal,
            } => {
                buf.push(*type_tag);
                write_varstr(&mut buf, body);
                write_varint(&mut buf, *ordinal);
            }
        }
        buf
    }

    pub fn id(&self) -> Hash {
        hash_entry(self.type_name(), &self.body())
    }
}

fn spent_source(c: &SpendCommitment) -> (ValueSource, Program) {
    (
        ValueSource {
            ref_id: c.source_id,
            value: c.asset_amount,
            position: c.source_position,
        },
        Program {
            vm_version: c.vm_version,
            code: c.control_program.clone(),
        },
    )
}

/// Id of the sidechain output a spend commitment points at
pub fn spent_output_id(c: &SpendCommitment) -> Hash {
    let (source, program) = spent_source(c);
    Entry::IntraChainOutput {
        source,
        program,
        ordinal: c.source_position,
    }
    .id()
}

/// Id of the vote output a veto withdraws
pub fn spent_vote_output_id(c: &SpendCommitment, vote: &[u8]) -> Hash {
    let (source, program) = spent_source(c);
    Entry::VoteOutput {
        source,
        program,
        vote: vote.to_vec(),
        ordinal: c.source_position,
    }
    .id()
}

/// Id of the mainchain output a cross-chain input claims
pub fn mainchain_output_id(c: &SpendCommitment) -> Hash {
    let (source, program) = spent_source(c);
    let mut body = Vec::new();
    write_source(&mut body, &source);
    write_program(&mut body, &program);
    write_varint(&mut body, c.source_position);
    hash_entry(MAINCHAIN_OUTPUT_TYPE, &body)
}

fn input_entry(input: &TxInput, ordinal: u64) -> Entry {
    match input {
        TxInput::Spend { commitment, .. } => Entry::Spend {
            spent_output_id: spent_output_id(commitment),
            ordinal,
        },
        TxInput::Coinbase { arbitrary } => Entry::Coinbase {
            arbitrary: arbitrary.clone(),
            ordinal,
        },
        TxInput::Veto {
            commitment, vote, ..
        } => Entry::VetoInput {
            spent_output_id: spent_vote_output_id(commitment, vote),
            ordinal,
        },
        TxInput::CrossChain { commitment, .. } => Entry::CrossChainInput {
            mainchain_output_id: mainchain_output_id(commitment),
            ordinal,
        },
        TxInput::Unknown { type_tag, body } => Entry::Unknown {
            type_tag: *type_tag,
            body: body.clone(),
            ordinal,
        },
    }
}

fn output_entry(output: &TxOutput, mux_id: Hash, position: u64) -> Entry {
    let source = |c: &OutputCommitment| ValueSource {
        ref_id: mux_id,
        value: c.asset_amount,
        position,
    };
    let program = |c: &OutputCommitment| Program {
        vm_version: c.vm_version,
        code: c.control_program.clone(),
    };
    match output {
        TxOutput::IntraChain(c) => Entry::IntraChainOutput {
            source: source(c),
            program: program(c),
            ordinal: position,
        },
        TxOutput::CrossChain(c) => Entry::CrossChainOutput {
            source: source(c),
            program: program(c),
            ordinal: position,
        },
        TxOutput::Vote { vote, commitment } => Entry::VoteOutput {
            source: source(commitment),
            program: program(commitment),
            vote: vote.clone(),
            ordinal: position,
        },
        TxOutput::Unknown { type_tag, body } => Entry::Unknown {
            type_tag: *type_tag,
            body: body.clone(),
            ordinal: position,
        },
    }
}

/// The entry graph of one transaction
#[derive(Debug, Clone)]
pub struct TxGraph {
    pub tx_id: Hash,
    pub mux_id: Hash,
    /// Entry id of each input, by position
    pub input_ids: Vec<Hash>,
    /// Entry id of each output, by position
    pub output_ids: Vec<Hash>,
    entries: HashMap<Hash, Entry>,
}

impl TxGraph {
    pub fn build(tx: &Tx) -> Self {
        let mut entries = HashMap::new();

        let mut input_ids = Vec::with_capacity(tx.inputs.len());
        for (i, input) in tx.inputs.iter().enumerate() {
            let entry = input_entry(input, i as u64);
            let id = entry.id();
            entries.insert(id, entry);
            input_ids.push(id);
        }

        let mux = Entry::Mux {
            sources: input_ids.clone(),
        };
        let mux_id = mux.id();
        entries.insert(mux_id, mux);

        let mut output_ids = Vec::with_capacity(tx.outputs.len());
        for (j, output) in tx.outputs.iter().enumerate() {
            let entry = output_entry(output, mux_id, j as u64);
            let id = entry.id();
            entries.insert(id, entry);
            output_ids.push(id);
        }

        let header = Entry::TxHeader {
            version: tx.version,
            time_range: tx.time_range,
            result_ids: output_ids.clone(),
        };
        let tx_id = header.id();
        entries.insert(tx_id, header);

        Self {
            tx_id,
            mux_id,
            input_ids,
            output_ids,
            entries,
        }
    }

    pub fn entry(&self, id: &Hash) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn input_entry(&self, index: usize) -> Option<&Entry> {
        self.input_ids.get(index).and_then(|id| self.entry(id))
    }

    pub fn output_entry(&self, index: usize) -> Option<&Entry> {
        self.output_ids.get(index).and_then(|id| self.entry(id))
    }

    /// Digest a signature over input `index` commits to
    pub fn sig_hash(&self, index: usize) -> Option<Hash> {
        let input_id = self.input_ids.get(index)?;
        let mut engine = sha256::Hash::engine();
        engine.input(input_id.as_bytes());
        engine.input(self.tx_id.as_bytes());
        Some(Hash(sha256::Hash::from_engine(engine).to_byte_array()))
    }
}

impl Tx {
    /// Transaction id (the header entry id)
    pub fn id(&self) -> Hash {
        TxGraph::build(self).tx_id
    }
}
