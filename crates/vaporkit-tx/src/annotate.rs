//! Display form of a decoded transaction
//!
//! Each input and output is classified by the kind of its entry in the
//! transaction's entry graph. Kinds this crate does not know produce a record
//! with an empty type instead of failing the decode. Addresses are derived
//! from control programs with the local network parameters, except for
//! cross-chain inputs and outputs, which live in the mainchain's address
//! space.

use crate::codec::CodecError;
use crate::entry::{Entry, TxGraph};
use crate::fee::calculate_fee;
use crate::tx::{Tx, TxInput, TxOutput};
use crate::types::{AssetId, Hash};
use serde::Serialize;
use thiserror::Error;
use vaporkit_core::address::address_from_program;
use vaporkit_core::network::NetworkParams;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("raw_transaction empty")]
    BadInput,
    #[error(transparent)]
    Codec(#[from] CodecError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Spend,
    Coinbase,
    Veto,
    CrossChainIn,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputType {
    Control,
    CrossChainOut,
    Vote,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnnotatedInput {
    #[serde(rename = "type")]
    pub kind: InputType,
    pub input_id: Hash,
    #[serde(rename = "asset", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(rename = "script", skip_serializing_if = "String::is_empty")]
    pub control_program: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_output_id: Option<Hash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arbitrary: Option<String>,
    #[serde(rename = "arguments", skip_serializing_if = "Vec::is_empty")]
    pub witness_arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_data: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AnnotatedOutput {
    #[serde(rename = "type")]
    pub kind: OutputType,
    #[serde(rename = "utxo_id")]
    pub output_id: Hash,
    pub position: usize,
    #[serde(rename = "asset", skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(rename = "script")]
    pub control_program: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedRawTx {
    pub tx_id: Hash,
    pub version: u64,
    pub size: u64,
    pub time_range: u64,
    pub inputs: Vec<AnnotatedInput>,
    pub outputs: Vec<AnnotatedOutput>,
    pub fee: u64,
}

fn hex_args(input: &TxInput) -> Vec<String> {
    input.arguments().iter().map(hex::encode).collect()
}

/// Annotate input `index` of `tx`
pub fn annotate_input(
    tx: &Tx,
    graph: &TxGraph,
    index: usize,
    params: &NetworkParams,
) -> AnnotatedInput {
    let orig = &tx.inputs[index];
    let mut ann = AnnotatedInput {
        input_id: graph.input_ids[index],
        ..Default::default()
    };

    if orig.is_coinbase() {
        ann.asset_id = Some(AssetId::NATIVE);
    } else {
        if let Some(amount) = orig.asset_amount() {
            ann.asset_id = Some(amount.asset_id);
            ann.amount = Some(amount.amount);
        }
        ann.sign_data = graph.sig_hash(index);
        if let TxInput::Veto { vote, .. } = orig {
            ann.vote = Some(hex::encode(vote));
        }
    }

    let program = orig.control_program().unwrap_or_default();
    let spend_like = |ann: &mut AnnotatedInput, spent: Hash, params: &NetworkParams| {
        ann.control_program = hex::encode(program);
        ann.address = address_from_program(program, params);
        ann.spent_output_id = Some(spent);
        ann.witness_arguments = hex_args(orig);
    };

    match graph.input_entry(index) {
        Some(Entry::Spend {
            spent_output_id, ..
        }) => {
            ann.kind = InputType::Spend;
            spend_like(&mut ann, *spent_output_id, params);
        }
        Some(Entry::VetoInput {
            spent_output_id, ..
        }) => {
            ann.kind = InputType::Veto;
            spend_like(&mut ann, *spent_output_id, params);
        }
        Some(Entry::CrossChainInput {
            mainchain_output_id,
            ..
        }) => {
            ann.kind = InputType::CrossChainIn;
            spend_like(&mut ann, *mainchain_output_id, &params.mainchain());
        }
        Some(Entry::Coinbase { arbitrary, .. }) => {
            ann.kind = InputType::Coinbase;
            ann.arbitrary = Some(hex::encode(arbitrary));
        }
        other => {
            log::debug!(
                "input {} has unrecognized entry {:?}, leaving type empty",
                index,
                other.map(Entry::type_name)
            );
        }
    }
    ann
}

/// Annotate output `index` of `tx`
pub fn annotate_output(
    tx: &Tx,
    graph: &TxGraph,
    index: usize,
    params: &NetworkParams,
) -> AnnotatedOutput {
    let orig = &tx.outputs[index];
    let program = orig.control_program().unwrap_or_default();
    let amount = orig.asset_amount();

    let mut ann = AnnotatedOutput {
        output_id: graph.output_ids[index],
        position: index,
        asset_id: amount.map(|a| a.asset_id),
        amount: amount.map(|a| a.amount),
        control_program: hex::encode(program),
        ..Default::default()
    };

    let mut address_params = *params;
    match graph.output_entry(index) {
        Some(Entry::IntraChainOutput { .. }) => ann.kind = OutputType::Control,
        Some(Entry::CrossChainOutput { .. }) => {
            ann.kind = OutputType::CrossChainOut;
            address_params = params.mainchain();
        }
        Some(Entry::VoteOutput { vote, .. }) => {
            ann.kind = OutputType::Vote;
            ann.vote = Some(hex::encode(vote));
        }
        other => {
            log::debug!(
                "output {} has unrecognized entry {:?}, leaving type empty",
                index,
                other.map(Entry::type_name)
            );
        }
    }
    if !matches!(orig, TxOutput::Unknown { .. }) {
        ann.address = address_from_program(program, &address_params);
    }
    ann
}

/// Annotate a whole transaction. Fee errors are logged and reported as zero.
pub fn annotate_tx(tx: &Tx, params: &NetworkParams) -> AnnotatedRawTx {
    let graph = TxGraph::build(tx);
    let inputs = (0..tx.inputs.len())
        .map(|i| annotate_input(tx, &graph, i, params))
        .collect();
    let outputs = (0..tx.outputs.len())
        .map(|j| annotate_output(tx, &graph, j, params))
        .collect();

    let fee = calculate_fee(tx).unwrap_or_else(|e| {
        log::warn!("fee for {}: {}", graph.tx_id, e);
        0
    });

    AnnotatedRawTx {
        tx_id: graph.tx_id,
        version: tx.version,
        size: tx.serialized_size() as u64,
        time_range: tx.time_range,
        inputs,
        outputs,
        fee,
    }
}

/// Decode a hex transaction into its display form
pub fn decode_raw_tx(raw: &str, params: &NetworkParams) -> Result<AnnotatedRawTx, DecodeError> {
    if raw.trim().is_empty() {
        return Err(DecodeError::BadInput);
    }
    let tx = Tx::from_hex(raw)?;
    Ok(annotate_tx(&tx, params))
}
