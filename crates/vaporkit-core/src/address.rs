//! Segwit v0 addresses
//!
//! An address is the bech32 encoding of a witness program hash under the
//! prefix of a [`NetworkParams`] set. Decoding infers the set from the prefix.

use crate::network::NetworkParams;
use crate::program::{program_from_hash, recognize, ProgramError, ProgramKind};
use bech32::{segwit, Fe32, Hrp};
use bitcoin::ScriptBuf;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressError {
    #[error("Bad input: {0}")]
    BadInput(String),
    #[error("Unknown address prefix: {0}")]
    UnknownAddressPrefix(String),
    #[error("Bad address format: {0}")]
    BadAddressFormat(String),
}

impl From<ProgramError> for AddressError {
    fn from(e: ProgramError) -> Self {
        AddressError::BadAddressFormat(e.to_string())
    }
}

/// A decoded address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessAddress {
    pub hash: Vec<u8>,
    pub kind: ProgramKind,
    pub params: NetworkParams,
}

impl WitnessAddress {
    /// The control program this address pays to
    pub fn to_program(&self) -> Result<ScriptBuf, AddressError> {
        Ok(program_from_hash(self.kind, &self.hash)?)
    }

    pub fn encode(&self) -> Result<String, AddressError> {
        encode_address(&self.hash, self.kind, &self.params)
    }
}

/// Encode a witness program hash as an address
pub fn encode_address(
    hash: &[u8],
    kind: ProgramKind,
    params: &NetworkParams,
) -> Result<String, AddressError> {
    if hash.len() != kind.hash_len() {
        return Err(AddressError::BadAddressFormat(format!(
            "{:?} hash must be {} bytes, got {}",
            kind,
            kind.hash_len(),
            hash.len()
        )));
    }
    let hrp = Hrp::parse(params.bech32_hrp)
        .map_err(|e| AddressError::BadAddressFormat(e.to_string()))?;
    segwit::encode_v0(hrp, hash).map_err(|e| AddressError::BadAddressFormat(e.to_string()))
}

/// Decode an address, inferring its network from the prefix
pub fn decode_address(address: &str) -> Result<WitnessAddress, AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::BadInput("address empty".into()));
    }

    // Check the prefix first so a foreign address reports the prefix and not
    // its checksum.
    let prefix = match address.rfind('1') {
        Some(pos) if pos > 0 => &address[..pos],
        _ => return Err(AddressError::BadAddressFormat("missing separator".into())),
    };
    let params = NetworkParams::from_hrp(prefix)
        .ok_or_else(|| AddressError::UnknownAddressPrefix(prefix.to_string()))?;

    let (_hrp, version, program) =
        segwit::decode(address).map_err(|e| AddressError::BadAddressFormat(e.to_string()))?;
    if version != Fe32::Q {
        return Err(AddressError::BadAddressFormat(format!(
            "unsupported witness version {}",
            version.to_u8()
        )));
    }

    let kind = match program.len() {
        20 => ProgramKind::PubKeyHash,
        32 => ProgramKind::ScriptHash,
        n => {
            return Err(AddressError::BadAddressFormat(format!(
                "witness program of {} bytes",
                n
            )))
        }
    };

    Ok(WitnessAddress {
        hash: program,
        kind,
        params,
    })
}

/// Address for a control program, or an empty string when the program is not
/// one of the witness templates.
pub fn address_from_program(program: &[u8], params: &NetworkParams) -> String {
    match recognize(program) {
        Some((kind, hash)) => encode_address(hash, kind, params).unwrap_or_else(|e| {
            log::warn!("cannot encode address for recognized program: {}", e);
            String::new()
        }),
        None => String::new(),
    }
}
