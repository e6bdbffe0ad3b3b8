//! Transaction fee in the native asset

use crate::tx::Tx;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FeeError {
    #[error("native asset total overflows")]
    Overflow,
    #[error("outputs ({outputs}) exceed inputs ({inputs})")]
    OutputsExceedInputs { inputs: u64, outputs: u64 },
}

/// Native inputs minus native outputs. Coinbase transactions pay no fee.
pub fn calculate_fee(tx: &Tx) -> Result<u64, FeeError> {
    if tx.is_coinbase() {
        return Ok(0);
    }

    let mut inputs = 0u64;
    for amount in tx.inputs.iter().filter_map(|i| i.asset_amount()) {
        if amount.asset_id.is_native() {
            inputs = inputs.checked_add(amount.amount).ok_or(FeeError::Overflow)?;
        }
    }

    let mut outputs = 0u64;
    for amount in tx.outputs.iter().filter_map(|o| o.asset_amount()) {
        if amount.asset_id.is_native() {
            outputs = outputs.checked_add(amount.amount).ok_or(FeeError::Overflow)?;
        }
    }

    inputs
        .checked_sub(outputs)
        .ok_or(FeeError::OutputsExceedInputs { inputs, outputs })
}
