//! vaporkit transactions
//!
//! Binary codec and entry graph for sidechain transactions, the annotated
//! decoder built on them, and the template signing engine.

pub mod annotate;
pub mod codec;
pub mod entry;
pub mod fee;
pub mod sign;
pub mod template;
pub mod tx;
pub mod types;

pub use annotate::{decode_raw_tx, AnnotatedInput, AnnotatedOutput, AnnotatedRawTx, DecodeError};
pub use codec::CodecError;
pub use entry::{Entry, TxGraph};
pub use fee::{calculate_fee, FeeError};
pub use sign::{
    EcdsaSigner, EncryptedKey, KeyProvider, MessageSignature, SignError, Signer, SigningEngine,
    StoredKey,
};
pub use template::{SignResponse, SigningInstruction, Template};
pub use tx::{OutputCommitment, SpendCommitment, Tx, TxInput, TxOutput};
pub use types::{AssetAmount, AssetId, Hash};
