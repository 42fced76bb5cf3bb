//! Shared ledger types: hashes, inputs, outputs, UTxOs.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Address;
use crate::datum::Datum;
use crate::error::CborError;
use crate::value::Value;

/// A 28-byte credential hash (BLAKE2b-224 of a public key or script body).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash28(pub [u8; 28]);

impl Hash28 {
    /// The zero hash (28 zero bytes).
    pub const ZERO: Self = Self([0u8; 28]);

    pub fn from_bytes(bytes: [u8; 28]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 28] {
        &self.0
    }

    /// Parse from a slice, rejecting any other length.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CborError> {
        let bytes: [u8; 28] = slice.try_into().map_err(|_| CborError::WrongHashLength {
            expected: 28,
            got: slice.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash28 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 28]> for Hash28 {
    fn from(bytes: [u8; 28]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash28 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A 32-byte hash. Used for transaction IDs and datum hashes (BLAKE2b-256).
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub struct Hash32(pub [u8; 32]);

impl Hash32 {
    /// The zero hash (32 zero bytes).
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse from a slice, rejecting any other length.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CborError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| CborError::WrongHashLength {
            expected: 32,
            got: slice.len(),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 32]> for Hash32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reference to a specific output of a previous transaction.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxInput {
    /// ID of the transaction containing the referenced output.
    pub tx_hash: Hash32,
    /// Index of the output within that transaction.
    pub output_index: u32,
}

impl TxInput {
    pub fn new(tx_hash: Hash32, output_index: u32) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

impl fmt::Display for TxInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

/// What a transaction output carries alongside its value, if anything.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub enum DatumOption {
    /// No datum attached.
    #[default]
    None,
    /// A 32-byte hash of a datum supplied elsewhere.
    Hash(Hash32),
    /// The datum itself, carried inline.
    Inline(Datum),
}

/// A transaction output: destination, value, optional script data.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
    pub datum: DatumOption,
    /// Hash of a reference script attached to this output, if any.
    pub script_ref: Option<Hash32>,
}

impl TxOutput {
    /// A plain output with no datum and no reference script.
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum: DatumOption::None,
            script_ref: None,
        }
    }
}

/// An unspent transaction output together with its location on the ledger.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub input: TxInput,
    pub output: TxOutput,
}

impl Utxo {
    pub fn new(input: TxInput, output: TxOutput) -> Self {
        Self { input, output }
    }
}
