//! Signing templates
//!
//! A template pairs a raw transaction with one instruction per input: the
//! derivation path of the key that signs it and the digests to sign. Paths
//! and digests stay hex text here and are parsed by the signing engine, so a
//! bad entry is reported where it is used.

use crate::entry::TxGraph;
use crate::sign::SignError;
use crate::tx::Tx;
use serde::{Deserialize, Serialize};
use vaporkit_core::path::KeyPath;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningInstruction {
    /// Hex path segments; empty means the root key
    pub derivation_path: Vec<String>,
    /// Hex 32-byte digests
    pub sign_data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub raw_transaction: String,
    pub signing_instructions: Vec<SigningInstruction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignResponse {
    pub raw_transaction: String,
    /// One list per signing instruction, one signature per digest
    pub signatures: Vec<Vec<String>>,
}

impl Template {
    /// Build a template asking for one signature per input over its sighash.
    ///
    /// `paths[i]` is the key path for input `i`. Coinbase and unknown inputs
    /// get no digests.
    pub fn for_transaction(tx: &Tx, paths: &[KeyPath]) -> Result<Self, SignError> {
        if paths.len() != tx.inputs.len() {
            return Err(SignError::MalformedTemplate(format!(
                "{} paths for {} inputs",
                paths.len(),
                tx.inputs.len()
            )));
        }

        let graph = TxGraph::build(tx);
        let signing_instructions = tx
            .inputs
            .iter()
            .zip(paths)
            .enumerate()
            .map(|(i, (input, path))| {
                let sign_data = match input.commitment() {
                    Some(_) => graph.sig_hash(i).map(|h| h.to_string()).into_iter().collect(),
                    None => Vec::new(),
                };
                SigningInstruction {
                    derivation_path: path.to_hex_segments(),
                    sign_data,
                }
            })
            .collect();

        Ok(Self {
            raw_transaction: tx.to_hex(),
            signing_instructions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{coinbase_tx, sample_tx};
    use vaporkit_core::path::{account_path, KeySpace};

    #[test]
    fn test_for_transaction() {
        let tx = sample_tx();
        let paths = vec![
            account_path(KeySpace::Account, 1, 1).unwrap(),
            KeyPath::root(),
        ];
        let template = Template::for_transaction(&tx, &paths).unwrap();
        let graph = TxGraph::build(&tx);

        assert_eq!(template.raw_transaction, tx.to_hex());
        assert_eq!(template.signing_instructions.len(), 2);
        assert_eq!(
            template.signing_instructions[0].derivation_path,
            vec!["00000001", "00000001", "00000001"]
        );
        assert!(template.signing_instructions[1].derivation_path.is_empty());
        assert_eq!(
            template.signing_instructions[1].sign_data,
            vec![graph.sig_hash(1).unwrap().to_string()]
        );
    }

    #[test]
    fn test_coinbase_needs_no_signature() {
        let template = Template::for_transaction(&coinbase_tx(), &[KeyPath::root()]).unwrap();
        assert!(template.signing_instructions[0].sign_data.is_empty());
    }

    #[test]
    fn test_path_count_must_match() {
        assert!(matches!(
            Template::for_transaction(&sample_tx(), &[KeyPath::root()]),
            Err(SignError::MalformedTemplate(_))
        ));
    }

    #[test]
    fn test_wire_shape() {
        let json = r#"{"raw_transaction":"00","signing_instructions":[{"derivation_path":[],"sign_data":["aa"]}]}"#;
        let template: Template = serde_json::from_str(json).unwrap();
        assert_eq!(serde_json::to_string(&template).unwrap(), json);
    }
}
