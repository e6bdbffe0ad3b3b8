//! Contract argument conversion
//!
//! A contract argument arrives as a type tag and an untyped payload of the
//! form `{"value": ...}`. Conversion produces the bytes pushed as a witness
//! argument.

use crate::address::decode_address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("bad argument type: {0}")]
    BadArgumentType(String),
    #[error("bad raw data for {kind} argument: {reason}")]
    BadRawData { kind: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractArgument {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub raw_data: Value,
}

#[derive(Deserialize)]
struct Wrapped<T> {
    value: T,
}

impl ContractArgument {
    fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, ArgumentError> {
        serde_json::from_value::<Wrapped<T>>(self.raw_data.clone())
            .map(|w| w.value)
            .map_err(|e| self.bad(e))
    }

    fn bad(&self, reason: impl ToString) -> ArgumentError {
        ArgumentError::BadRawData {
            kind: self.kind.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Little-endian two's complement with trailing zero bytes dropped; zero is empty
pub fn int64_bytes(n: i64) -> Vec<u8> {
    let mut bytes = (n as u64).to_le_bytes().to_vec();
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

pub fn bool_bytes(b: bool) -> Vec<u8> {
    if b {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Convert an argument into its witness bytes
pub fn convert_argument(arg: &ContractArgument) -> Result<Vec<u8>, ArgumentError> {
    match arg.kind.as_str() {
        "data" => {
            let value: String = arg.payload()?;
            hex::decode(value).map_err(|e| arg.bad(e))
        }
        "string" => {
            let value: String = arg.payload()?;
            Ok(value.into_bytes())
        }
        "integer" => Ok(int64_bytes(arg.payload()?)),
        "boolean" => Ok(bool_bytes(arg.payload()?)),
        "address" => {
            let value: String = arg.payload()?;
            let address = decode_address(&value).map_err(|e| arg.bad(e))?;
            let program = address.to_program().map_err(|e| arg.bad(e))?;
            Ok(program.into_bytes())
        }
        other => Err(ArgumentError::BadArgumentType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::encode_address;
    use crate::network::SIDECHAIN_MAIN;
    use crate::program::{build_single_sig_program, ProgramKind};
    use serde_json::json;

    fn arg(kind: &str, raw: Value) -> ContractArgument {
        ContractArgument {
            kind: kind.to_string(),
            raw_data: raw,
        }
    }

    #[test]
    fn test_data_and_string() {
        assert_eq!(
            convert_argument(&arg("data", json!({"value": "beef"}))).unwrap(),
            vec![0xbe, 0xef]
        );
        assert_eq!(
            convert_argument(&arg("string", json!({"value": "hi"}))).unwrap(),
            b"hi".to_vec()
        );
    }

    #[test]
    fn test_integer_encoding() {
        assert_eq!(int64_bytes(0), Vec::<u8>::new());
        assert_eq!(int64_bytes(1), vec![1]);
        assert_eq!(int64_bytes(256), vec![0, 1]);
        assert_eq!(int64_bytes(-1), vec![0xff; 8]);
        assert_eq!(
            convert_argument(&arg("integer", json!({"value": 1000}))).unwrap(),
            vec![0xe8, 0x03]
        );
    }

    #[test]
    fn test_boolean_encoding() {
        assert_eq!(
            convert_argument(&arg("boolean", json!({"value": true}))).unwrap(),
            vec![1]
        );
        assert!(convert_argument(&arg("boolean", json!({"value": false})))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_address_argument() {
        let hash = [0x77u8; 20];
        let addr = encode_address(&hash, ProgramKind::PubKeyHash, &SIDECHAIN_MAIN).unwrap();
        let bytes = convert_argument(&arg("address", json!({ "value": addr }))).unwrap();
        assert_eq!(bytes, build_single_sig_program(&hash).into_bytes());
    }

    #[test]
    fn test_unknown_type() {
        assert_eq!(
            convert_argument(&arg("float", json!({"value": 1.5}))).unwrap_err(),
            ArgumentError::BadArgumentType("float".into())
        );
    }

    #[test]
    fn test_bad_payloads() {
        for (kind, raw) in [
            ("data", json!({"value": "xyz"})),
            ("integer", json!({"value": "ten"})),
            ("boolean", json!({})),
            ("address", json!({"value": "vp1nothing"})),
        ] {
            assert!(
                matches!(
                    convert_argument(&arg(kind, raw)),
                    Err(ArgumentError::BadRawData { .. })
                ),
                "{kind}"
            );
        }
    }
}
