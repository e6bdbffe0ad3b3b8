//! Binary transaction encoding
//!
//! ```text
//! tx      := varint(version) varint(time_range)
//!            varint(n_in)  { u8(type) varstr(input body)  }
//!            varint(n_out) { u8(type) varstr(output body) }
//! varint  := LEB128, at most 2^63 - 1
//! varstr  := varint(len) bytes
//! ```
//!
//! Every input and output body is length-prefixed, so a reader skips kinds it
//! does not know and keeps their bytes. The text form of a transaction is the
//! hex of its binary form.

use crate::tx::*;
use crate::types::{AssetAmount, AssetId, Hash};
use std::str::FromStr;
use thiserror::Error;

/// Largest value a varint may carry
pub const MAX_VARINT: u64 = i64::MAX as u64;

const MAX_VARINT_LEN: usize = 9;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("raw transaction empty")]
    Empty,
    #[error("invalid hex: {0}")]
    Hex(String),
    #[error("unexpected end of data")]
    UnexpectedEof,
    #[error("varint exceeds 63 bits")]
    VarintOverflow,
    #[error("length {len} exceeds remaining {remaining} bytes")]
    LengthTooLarge { len: u64, remaining: usize },
    #[error("{0} trailing bytes")]
    TrailingBytes(usize),
}

pub fn write_varint(buf: &mut Vec<u8>, value: u64) {
    let mut v = value;
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if v == 0 {
            break;
        }
    }
}

pub fn write_varstr(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

pub fn write_varstr_list(buf: &mut Vec<u8>, items: &[Vec<u8>]) {
    write_varint(buf, items.len() as u64);
    for item in items {
        write_varstr(buf, item);
    }
}

/// Cursor over a byte slice
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        let b = *self.buf.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_varint(&mut self) -> Result<u64, CodecError> {
        let mut result = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let b = self.read_u8()?;
            result |= u64::from(b & 0x7f) << (7 * i);
            if b & 0x80 == 0 {
                if result > MAX_VARINT {
                    return Err(CodecError::VarintOverflow);
                }
                return Ok(result);
            }
        }
        Err(CodecError::VarintOverflow)
    }

    /// Read a length or count that must fit in what is left of the input
    fn read_len(&mut self) -> Result<usize, CodecError> {
        let len = self.read_varint()?;
        let remaining = self.remaining();
        if len > remaining as u64 {
            return Err(CodecError::LengthTooLarge { len, remaining });
        }
        Ok(len as usize)
    }

    pub fn read_varstr(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len()?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_varstr_list(&mut self) -> Result<Vec<Vec<u8>>, CodecError> {
        let count = self.read_len()?;
        (0..count).map(|_| self.read_varstr()).collect()
    }

    pub fn read_hash(&mut self) -> Result<[u8; 32], CodecError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.read_bytes(32)?);
        Ok(out)
    }

    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

fn write_spend_commitment(buf: &mut Vec<u8>, c: &SpendCommitment) {
    buf.extend_from_slice(c.source_id.as_bytes());
    buf.extend_from_slice(c.asset_amount.asset_id.as_bytes());
    write_varint(buf, c.asset_amount.amount);
    write_varint(buf, c.source_position);
    write_varint(buf, c.vm_version);
    write_varstr(buf, &c.control_program);
}

fn read_spend_commitment(r: &mut Reader<'_>) -> Result<SpendCommitment, CodecError> {
    Ok(SpendCommitment {
        source_id: Hash(r.read_hash()?),
        asset_amount: AssetAmount::new(AssetId(r.read_hash()?), r.read_varint()?),
        source_position: r.read_varint()?,
        vm_version: r.read_varint()?,
        control_program: r.read_varstr()?,
    })
}

fn write_output_commitment(buf: &mut Vec<u8>, c: &OutputCommitment) {
    buf.extend_from_slice(c.asset_amount.asset_id.as_bytes());
    write_varint(buf, c.asset_amount.amount);
    write_varint(buf, c.vm_version);
    write_varstr(buf, &c.control_program);
}

fn read_output_commitment(r: &mut Reader<'_>) -> Result<OutputCommitment, CodecError> {
    Ok(OutputCommitment {
        asset_amount: AssetAmount::new(AssetId(r.read_hash()?), r.read_varint()?),
        vm_version: r.read_varint()?,
        control_program: r.read_varstr()?,
    })
}

fn input_body(input: &TxInput) -> Vec<u8> {
    let mut body = Vec::new();
    match input {
        TxInput::Spend {
            commitment,
            arguments,
        } => {
            write_spend_commitment(&mut body, commitment);
            write_varstr_list(&mut body, arguments);
        }
        TxInput::Coinbase { arbitrary } => write_varstr(&mut body, arbitrary),
        TxInput::Veto {
            commitment,
            arguments,
            vote,
        } => {
            write_spend_commitment(&mut body, commitment);
            write_varstr_list(&mut body, arguments);
            write_varstr(&mut body, vote);
        }
        TxInput::CrossChain {
            commitment,
            arguments,
            asset_definition,
            issuance_vm_version,
            issuance_program,
        } => {
            write_spend_commitment(&mut body, commitment);
            write_varstr_list(&mut body, arguments);
            write_varstr(&mut body, asset_definition);
            write_varint(&mut body, *issuance_vm_version);
            write_varstr(&mut body, issuance_program);
        }
        TxInput::Unknown { body: raw, .. } => body.extend_from_slice(raw),
    }
    body
}

/// Decode a known input body; `None` for tags this crate does not know
fn parse_known_input(type_tag: u8, body: &[u8]) -> Result<Option<TxInput>, CodecError> {
    let mut r = Reader::new(body);
    let input = match type_tag {
        INPUT_SPEND => TxInput::Spend {
            commitment: read_spend_commitment(&mut r)?,
            arguments: r.read_varstr_list()?,
        },
        INPUT_COINBASE => TxInput::Coinbase {
            arbitrary: r.read_varstr()?,
        },
        INPUT_VETO => TxInput::Veto {
            commitment: read_spend_commitment(&mut r)?,
            arguments: r.read_varstr_list()?,
            vote: r.read_varstr()?,
        },
        INPUT_CROSS_CHAIN => TxInput::CrossChain {
            commitment: read_spend_commitment(&mut r)?,
            arguments: r.read_varstr_list()?,
            asset_definition: r.read_varstr()?,
            issuance_vm_version: r.read_varint()?,
            issuance_program: r.read_varstr()?,
        },
        _ => return Ok(None),
    };
    r.finish()?;
    Ok(Some(input))
}

fn parse_input(type_tag: u8, body: Vec<u8>) -> Result<TxInput, CodecError> {
    match parse_known_input(type_tag, &body)? {
        Some(input) => Ok(input),
        None => {
            log::warn!("keeping input of unknown type {} as raw bytes", type_tag);
            Ok(TxInput::Unknown { type_tag, body })
        }
    }
}

fn output_body(output: &TxOutput) -> Vec<u8> {
    let mut body = Vec::new();
    match output {
        TxOutput::IntraChain(c) | TxOutput::CrossChain(c) => write_output_commitment(&mut body, c),
        TxOutput::Vote { vote, commitment } => {
            write_varstr(&mut body, vote);
            write_output_commitment(&mut body, commitment);
        }
        TxOutput::Unknown { body: raw, .. } => body.extend_from_slice(raw),
    }
    body
}

fn parse_known_output(type_tag: u8, body: &[u8]) -> Result<Option<TxOutput>, CodecError> {
    let mut r = Reader::new(body);
    let output = match type_tag {
        OUTPUT_INTRA_CHAIN => TxOutput::IntraChain(read_output_commitment(&mut r)?),
        OUTPUT_CROSS_CHAIN => TxOutput::CrossChain(read_output_commitment(&mut r)?),
        OUTPUT_VOTE => TxOutput::Vote {
            vote: r.read_varstr()?,
            commitment: read_output_commitment(&mut r)?,
        },
        _ => return Ok(None),
    };
    r.finish()?;
    Ok(Some(output))
}

fn parse_output(type_tag: u8, body: Vec<u8>) -> Result<TxOutput, CodecError> {
    match parse_known_output(type_tag, &body)? {
        Some(output) => Ok(output),
        None => {
            log::warn!("keeping output of unknown type {} as raw bytes", type_tag);
            Ok(TxOutput::Unknown { type_tag, body })
        }
    }
}

impl Tx {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, self.version);
        write_varint(&mut buf, self.time_range);

        write_varint(&mut buf, self.inputs.len() as u64);
        for input in &self.inputs {
            buf.push(input.type_tag());
            write_varstr(&mut buf, &input_body(input));
        }

        write_varint(&mut buf, self.outputs.len() as u64);
        for output in &self.outputs {
            buf.push(output.type_tag());
            write_varstr(&mut buf, &output_body(output));
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Err(CodecError::Empty);
        }
        let mut r = Reader::new(bytes);
        let version = r.read_varint()?;
        let time_range = r.read_varint()?;

        let n_in = r.read_len()?;
        let mut inputs = Vec::with_capacity(n_in);
        for _ in 0..n_in {
            let tag = r.read_u8()?;
            inputs.push(parse_input(tag, r.read_varstr()?)?);
        }

        let n_out = r.read_len()?;
        let mut outputs = Vec::with_capacity(n_out);
        for _ in 0..n_out {
            let tag = r.read_u8()?;
            outputs.push(parse_output(tag, r.read_varstr()?)?);
        }
        r.finish()?;

        Ok(Self {
            version,
            time_range,
            inputs,
            outputs,
        })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CodecError::Empty);
        }
        let bytes = hex::decode(s).map_err(|e| CodecError::Hex(e.to_string()))?;
        Self::decode(&bytes)
    }

    /// Length of the binary form
    pub fn serialized_size(&self) -> usize {
        self.encode().len()
    }
}

impl FromStr for Tx {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
