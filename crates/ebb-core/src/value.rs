//! Multi-asset value maps and their arithmetic.
//!
//! A [`Value`] maps asset units to signed quantities. The reserved unit
//! `"lovelace"` is the base currency; every other unit is the hex
//! concatenation of a 28-byte policy ID and an asset name. Negative
//! quantities appear only transiently (deficits during selection, burns in
//! mint fields); realized outputs must be non-negative per unit.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::cbor::{self, Decoder};
use crate::error::CborError;

/// The reserved unit for the base currency.
pub const LOVELACE: &str = "lovelace";

/// Hex length of a policy ID (28 bytes).
const POLICY_HEX_LEN: usize = 56;

/// A mapping from asset unit to quantity. Zero-quantity entries are never
/// stored; an absent unit and a zero quantity are the same thing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Value(BTreeMap<String, i128>);

impl Value {
    /// The empty value.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// A value holding only base currency.
    pub fn lovelace(quantity: i128) -> Self {
        let mut v = Self::new();
        v.add(LOVELACE, quantity);
        v
    }

    /// A value holding a single unit.
    pub fn from_unit(unit: &str, quantity: i128) -> Self {
        let mut v = Self::new();
        v.add(unit, quantity);
        v
    }

    /// Quantity of a unit; zero when absent.
    pub fn get(&self, unit: &str) -> i128 {
        self.0.get(unit).copied().unwrap_or(0)
    }

    /// Base-currency quantity.
    pub fn coin(&self) -> i128 {
        self.get(LOVELACE)
    }

    /// Add `quantity` to a unit, removing the entry if the sum is zero.
    pub fn add(&mut self, unit: &str, quantity: i128) {
        let total = self.get(unit).saturating_add(quantity);
        if total == 0 {
            self.0.remove(unit);
        } else {
            self.0.insert(unit.to_string(), total);
        }
    }

    /// Per-unit sum of two values.
    pub fn merge(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (unit, quantity) in &other.0 {
            out.add(unit, *quantity);
        }
        out
    }

    /// Per-unit difference `self - other`.
    pub fn subtract(&self, other: &Self) -> Self {
        let mut out = self.clone();
        for (unit, quantity) in &other.0 {
            out.add(unit, -quantity);
        }
        out
    }

    /// The value with every quantity negated.
    pub fn negate(&self) -> Self {
        Self(self.0.iter().map(|(u, q)| (u.clone(), -q)).collect())
    }

    /// Whether every quantity is >= 0.
    pub fn is_non_negative(&self) -> bool {
        self.0.values().all(|&q| q >= 0)
    }

    /// Whether every quantity is <= 0.
    pub fn is_non_positive(&self) -> bool {
        self.0.values().all(|&q| q <= 0)
    }

    /// Whether no units are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of non-base asset units present.
    pub fn asset_count(&self) -> usize {
        self.0.keys().filter(|u| *u != LOVELACE).count()
    }

    /// Only the strictly positive entries.
    pub fn positive_part(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|&(_, &q)| q > 0)
                .map(|(u, &q)| (u.clone(), q))
                .collect(),
        )
    }

    /// Iterate `(unit, quantity)` pairs in unit order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i128)> {
        self.0.iter().map(|(u, &q)| (u.as_str(), q))
    }

    /// Units in deterministic (lexicographic) order.
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Split a non-base unit into `(policy_id, asset_name)` hex halves.
    fn split_unit(unit: &str) -> Result<(&str, &str), CborError> {
        if unit.len() < POLICY_HEX_LEN || !unit.is_char_boundary(POLICY_HEX_LEN) {
            return Err(CborError::MissingField("policy id"));
        }
        Ok(unit.split_at(POLICY_HEX_LEN))
    }

    /// Canonical CBOR encoding.
    ///
    /// A pure-coin value encodes as a bare integer; otherwise as
    /// `[coin, {policy: {asset_name: quantity}}]` with byte-string keys.
    /// Unit strings must be valid hex with a 56-character policy prefix.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CborError> {
        if self.asset_count() == 0 {
            return cbor::write_int(buf, self.coin());
        }
        // Group non-base units by policy. BTreeMap keeps both levels sorted,
        // which is what the canonical form requires.
        let mut policies: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, i128>> = BTreeMap::new();
        for (unit, quantity) in self.iter() {
            if unit == LOVELACE {
                continue;
            }
            let (policy_hex, name_hex) = Self::split_unit(unit)?;
            let policy = hex::decode(policy_hex).map_err(|_| CborError::InvalidUtf8)?;
            let name = hex::decode(name_hex).map_err(|_| CborError::InvalidUtf8)?;
            policies.entry(policy).or_default().insert(name, quantity);
        }
        cbor::write_array(buf, 2);
        cbor::write_int(buf, self.coin())?;
        cbor::write_map(buf, policies.len());
        for (policy, assets) in &policies {
            cbor::write_bytes(buf, policy);
            cbor::write_map(buf, assets.len());
            for (name, quantity) in assets {
                cbor::write_bytes(buf, name);
                cbor::write_int(buf, *quantity)?;
            }
        }
        Ok(())
    }

    /// Decode a value from its canonical CBOR form.
    ///
    /// Rejects zero quantities and duplicate units.
    pub fn decode(dec: &mut Decoder<'_>) -> Result<Self, CborError> {
        let mut value = Self::new();
        match dec.peek_major()? {
            cbor::MAJOR_UNSIGNED | cbor::MAJOR_NEGATIVE => {
                let coin = dec.read_int()?;
                if coin != 0 {
                    value.add(LOVELACE, coin);
                }
                return Ok(value);
            }
            cbor::MAJOR_ARRAY => {}
            found => {
                return Err(CborError::UnexpectedType {
                    expected: "value",
                    found,
                })
            }
        }
        let len = dec.read_array()?;
        if len != 2 {
            return Err(CborError::UnexpectedType {
                expected: "2-element value array",
                found: cbor::MAJOR_ARRAY,
            });
        }
        let coin = dec.read_int()?;
        if coin != 0 {
            value.add(LOVELACE, coin);
        }
        let policy_count = dec.read_map()?;
        for _ in 0..policy_count {
            let policy = hex::encode(dec.read_byte_string()?);
            let asset_count = dec.read_map()?;
            for _ in 0..asset_count {
                let name = hex::encode(dec.read_byte_string()?);
                let quantity = dec.read_int()?;
                if quantity == 0 {
                    return Err(CborError::ZeroQuantity);
                }
                let unit = format!("{policy}{name}");
                if value.get(&unit) != 0 {
                    return Err(CborError::DuplicateKey);
                }
                value.add(&unit, quantity);
            }
        }
        Ok(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "0 lovelace");
        }
        let mut first = true;
        for (unit, quantity) in self.iter() {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{quantity} {unit}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromIterator<(String, i128)> for Value {
    fn from_iter<T: IntoIterator<Item = (String, i128)>>(iter: T) -> Self {
        let mut v = Self::new();
        for (unit, quantity) in iter {
            v.add(&unit, quantity);
        }
        v
    }
}
