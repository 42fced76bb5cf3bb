//! Transaction bodies, witnesses, and their canonical encoding.
//!
//! The body encodes as a CBOR map with fixed integer keys (0 inputs,
//! 1 outputs, 2 fee, 3 ttl, 9 mint); optional fields are simply absent.
//! The transaction ID is BLAKE2b-256 over exactly those bytes, so the
//! encoding must never change shape for the same logical body.

use serde::{Deserialize, Serialize};

use crate::cbor::{self, Decoder};
use crate::crypto;
use crate::datum::Datum;
use crate::error::CborError;
use crate::types::{DatumOption, Hash32, TxInput, TxOutput, Utxo};
use crate::value::Value;

const KEY_INPUTS: u64 = 0;
const KEY_OUTPUTS: u64 = 1;
const KEY_FEE: u64 = 2;
const KEY_TTL: u64 = 3;
const KEY_MINT: u64 = 9;

const OUT_KEY_ADDRESS: u64 = 0;
const OUT_KEY_VALUE: u64 = 1;
const OUT_KEY_DATUM: u64 = 2;
const OUT_KEY_SCRIPT_REF: u64 = 3;

/// An unsigned transaction body.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct TxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Fee in base-currency units.
    pub fee: u64,
    /// Slot after which the transaction is invalid, if bounded.
    pub ttl: Option<u64>,
    /// Minted (positive) and burned (negative) assets, if any.
    pub mint: Option<Value>,
}

impl TxBody {
    /// Serialize to canonical bytes.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CborError> {
        let mut fields = 3;
        if self.ttl.is_some() {
            fields += 1;
        }
        if self.mint.is_some() {
            fields += 1;
        }
        cbor::write_map(buf, fields);

        cbor::write_uint(buf, KEY_INPUTS);
        cbor::write_array(buf, self.inputs.len());
        for input in &self.inputs {
            encode_input(buf, input);
        }

        cbor::write_uint(buf, KEY_OUTPUTS);
        cbor::write_array(buf, self.outputs.len());
        for output in &self.outputs {
            encode_output(buf, output)?;
        }

        cbor::write_uint(buf, KEY_FEE);
        cbor::write_uint(buf, self.fee);

        if let Some(ttl) = self.ttl {
            cbor::write_uint(buf, KEY_TTL);
            cbor::write_uint(buf, ttl);
        }
        if let Some(mint) = &self.mint {
            cbor::write_uint(buf, KEY_MINT);
            mint.encode(buf)?;
        }
        Ok(())
    }

    /// Canonical bytes as an owned vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// The transaction ID: BLAKE2b-256 of the canonical body bytes.
    pub fn hash(&self) -> Result<Hash32, CborError> {
        Ok(crypto::blake2b_256(&self.to_bytes()?))
    }

    /// Parse a body from canonical bytes, consuming the whole input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CborError> {
        let mut dec = Decoder::new(bytes);
        let body = Self::decode(&mut dec)?;
        dec.finish()?;
        Ok(body)
    }

    /// Parse one body from a decoder.
    pub fn decode(dec: &mut Decoder<'_>) -> Result<Self, CborError> {
        let field_count = dec.read_map()?;
        let mut inputs = None;
        let mut outputs = None;
        let mut fee = None;
        let mut ttl = None;
        let mut mint = None;

        for _ in 0..field_count {
            match dec.read_uint()? {
                KEY_INPUTS => {
                    if inputs.is_some() {
                        return Err(CborError::DuplicateKey);
                    }
                    let len = dec.read_array()?;
                    let mut items = Vec::with_capacity(len.min(1024) as usize);
                    for _ in 0..len {
                        items.push(decode_input(dec)?);
                    }
                    inputs = Some(items);
                }
                KEY_OUTPUTS => {
                    if outputs.is_some() {
                        return Err(CborError::DuplicateKey);
                    }
                    let len = dec.read_array()?;
                    let mut items = Vec::with_capacity(len.min(1024) as usize);
                    for _ in 0..len {
                        items.push(decode_output(dec)?);
                    }
                    outputs = Some(items);
                }
                KEY_FEE => {
                    if fee.is_some() {
                        return Err(CborError::DuplicateKey);
                    }
                    fee = Some(dec.read_uint()?);
                }
                KEY_TTL => {
                    if ttl.is_some() {
                        return Err(CborError::DuplicateKey);
                    }
                    ttl = Some(dec.read_uint()?);
                }
                KEY_MINT => {
                    if mint.is_some() {
                        return Err(CborError::DuplicateKey);
                    }
                    mint = Some(Value::decode(dec)?);
                }
                other => return Err(CborError::UnknownField(other)),
            }
        }

        Ok(Self {
            inputs: inputs.ok_or(CborError::MissingField("inputs"))?,
            outputs: outputs.ok_or(CborError::MissingField("outputs"))?,
            fee: fee.ok_or(CborError::MissingField("fee"))?,
            ttl,
            mint,
        })
    }
}

fn encode_input(buf: &mut Vec<u8>, input: &TxInput) {
    cbor::write_array(buf, 2);
    cbor::write_bytes(buf, input.tx_hash.as_bytes());
    cbor::write_uint(buf, input.output_index as u64);
}

fn decode_input(dec: &mut Decoder<'_>) -> Result<TxInput, CborError> {
    let len = dec.read_array()?;
    if len != 2 {
        return Err(CborError::UnexpectedType {
            expected: "2-element input",
            found: cbor::MAJOR_ARRAY,
        });
    }
    let tx_hash = Hash32::from_slice(dec.read_byte_string()?)?;
    let index = dec.read_uint()?;
    if index > u32::MAX as u64 {
        return Err(CborError::IntegerOutOfRange);
    }
    Ok(TxInput::new(tx_hash, index as u32))
}

fn encode_output(buf: &mut Vec<u8>, output: &TxOutput) -> Result<(), CborError> {
    let mut fields = 2;
    if output.datum != DatumOption::None {
        fields += 1;
    }
    if output.script_ref.is_some() {
        fields += 1;
    }
    cbor::write_map(buf, fields);

    cbor::write_uint(buf, OUT_KEY_ADDRESS);
    cbor::write_bytes(buf, &output.address.to_bytes());

    cbor::write_uint(buf, OUT_KEY_VALUE);
    output.value.encode(buf)?;

    match &output.datum {
        DatumOption::None => {}
        DatumOption::Hash(hash) => {
            cbor::write_uint(buf, OUT_KEY_DATUM);
            cbor::write_array(buf, 2);
            cbor::write_uint(buf, 0);
            cbor::write_bytes(buf, hash.as_bytes());
        }
        DatumOption::Inline(datum) => {
            cbor::write_uint(buf, OUT_KEY_DATUM);
            cbor::write_array(buf, 2);
            cbor::write_uint(buf, 1);
            datum.encode(buf)?;
        }
    }
    if let Some(script_ref) = &output.script_ref {
        cbor::write_uint(buf, OUT_KEY_SCRIPT_REF);
        cbor::write_bytes(buf, script_ref.as_bytes());
    }
    Ok(())
}

fn decode_output(dec: &mut Decoder<'_>) -> Result<TxOutput, CborError> {
    let field_count = dec.read_map()?;
    let mut address = None;
    let mut value = None;
    let mut datum = DatumOption::None;
    let mut script_ref = None;

    for _ in 0..field_count {
        match dec.read_uint()? {
            OUT_KEY_ADDRESS => {
                if address.is_some() {
                    return Err(CborError::DuplicateKey);
                }
                let bytes = dec.read_byte_string()?;
                address = Some(crate::address::Address::from_bytes(bytes)?);
            }
            OUT_KEY_VALUE => {
                if value.is_some() {
                    return Err(CborError::DuplicateKey);
                }
                value = Some(Value::decode(dec)?);
            }
            OUT_KEY_DATUM => {
                if datum != DatumOption::None {
                    return Err(CborError::DuplicateKey);
                }
                let len = dec.read_array()?;
                if len != 2 {
                    return Err(CborError::UnexpectedType {
                        expected: "2-element datum option",
                        found: cbor::MAJOR_ARRAY,
                    });
                }
                datum = match dec.read_uint()? {
                    0 => DatumOption::Hash(Hash32::from_slice(dec.read_byte_string()?)?),
                    1 => DatumOption::Inline(Datum::decode(dec)?),
                    other => return Err(CborError::UnknownField(other)),
                };
            }
            OUT_KEY_SCRIPT_REF => {
                if script_ref.is_some() {
                    return Err(CborError::DuplicateKey);
                }
                script_ref = Some(Hash32::from_slice(dec.read_byte_string()?)?);
            }
            other => return Err(CborError::UnknownField(other)),
        }
    }

    Ok(TxOutput {
        address: address.ok_or(CborError::MissingField("address"))?,
        value: value.ok_or(CborError::MissingField("value"))?,
        datum,
        script_ref,
    })
}

/// A verification-key witness: public key plus Ed25519 signature over the
/// transaction ID.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Witness {
    pub public_key: [u8; 32],
    /// 64-byte Ed25519 signature.
    pub signature: Vec<u8>,
}

/// An ordered, deduplicated collection of witnesses.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct WitnessSet {
    vkeys: Vec<Witness>,
}

impl WitnessSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a witness unless one for the same public key is already present.
    /// Returns whether the witness was added.
    pub fn add(&mut self, witness: Witness) -> bool {
        if self.vkeys.iter().any(|w| w.public_key == witness.public_key) {
            return false;
        }
        self.vkeys.push(witness);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.vkeys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vkeys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Witness> {
        self.vkeys.iter()
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        if self.vkeys.is_empty() {
            cbor::write_map(buf, 0);
            return;
        }
        cbor::write_map(buf, 1);
        cbor::write_uint(buf, 0);
        cbor::write_array(buf, self.vkeys.len());
        for witness in &self.vkeys {
            cbor::write_array(buf, 2);
            cbor::write_bytes(buf, &witness.public_key);
            cbor::write_bytes(buf, &witness.signature);
        }
    }

    pub fn decode(dec: &mut Decoder<'_>) -> Result<Self, CborError> {
        let mut set = Self::new();
        let field_count = dec.read_map()?;
        for _ in 0..field_count {
            match dec.read_uint()? {
                0 => {
                    let len = dec.read_array()?;
                    for _ in 0..len {
                        let pair_len = dec.read_array()?;
                        if pair_len != 2 {
                            return Err(CborError::UnexpectedType {
                                expected: "2-element witness",
                                found: cbor::MAJOR_ARRAY,
                            });
                        }
                        let key_bytes = dec.read_byte_string()?;
                        let public_key: [u8; 32] =
                            key_bytes.try_into().map_err(|_| CborError::WrongHashLength {
                                expected: 32,
                                got: key_bytes.len(),
                            })?;
                        let signature = dec.read_byte_string()?.to_vec();
                        if signature.len() != 64 {
                            return Err(CborError::WrongHashLength {
                                expected: 64,
                                got: signature.len(),
                            });
                        }
                        if !set.add(Witness {
                            public_key,
                            signature,
                        }) {
                            return Err(CborError::DuplicateKey);
                        }
                    }
                }
                other => return Err(CborError::UnknownField(other)),
            }
        }
        Ok(set)
    }
}

/// A complete transaction: body plus witness set, encoded as a 2-element
/// array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Tx {
    pub body: TxBody,
    pub witness_set: WitnessSet,
}

impl Tx {
    pub fn unsigned(body: TxBody) -> Self {
        Self {
            body,
            witness_set: WitnessSet::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        let mut buf = Vec::new();
        cbor::write_array(&mut buf, 2);
        self.body.encode(&mut buf)?;
        self.witness_set.encode(&mut buf);
        Ok(buf)
    }

    pub fn to_hex(&self) -> Result<String, CborError> {
        Ok(hex::encode(self.to_bytes()?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CborError> {
        let mut dec = Decoder::new(bytes);
        let len = dec.read_array()?;
        if len != 2 {
            return Err(CborError::UnexpectedType {
                expected: "2-element transaction",
                found: cbor::MAJOR_ARRAY,
            });
        }
        let body = TxBody::decode(&mut dec)?;
        let witness_set = WitnessSet::decode(&mut dec)?;
        dec.finish()?;
        Ok(Self { body, witness_set })
    }

    pub fn from_hex(s: &str) -> Result<Self, CborError> {
        let bytes = hex::decode(s).map_err(|_| CborError::InvalidUtf8)?;
        Self::from_bytes(&bytes)
    }
}

/// Total value carried by a set of UTxOs.
pub fn total_value(utxos: &[Utxo]) -> Value {
    utxos
        .iter()
        .fold(Value::new(), |acc, u| acc.merge(&u.output.value))
}
