//! Structured script data with a canonical binary form.
//!
//! A [`Datum`] is the recursive algebraic value attached to script outputs:
//! integer, byte string, list, map, or tagged constructor. Two semantically
//! equal datums always encode to identical bytes, which is what makes datum
//! hashes well defined.
//!
//! Constructor tags follow the compact scheme: alternatives 0..=6 use tags
//! 121..=127, alternatives 7..=127 use tags 1280..=1400, and anything larger
//! falls back to tag 102 wrapping `[alternative, fields]`.

use serde::{Deserialize, Serialize};

use crate::cbor::{self, Decoder};
use crate::crypto;
use crate::error::CborError;
use crate::types::Hash32;

/// Maximum recursion depth accepted when decoding.
const MAX_DEPTH: usize = 64;

const TAG_COMPACT_BASE: u64 = 121;
const TAG_EXTENDED_BASE: u64 = 1280;
const TAG_GENERAL: u64 = 102;

/// A structured script datum.
///
/// Map entries keep their insertion order; order is part of the value, and
/// two maps with the same entries in different orders encode differently.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum Datum {
    Int(i128),
    Bytes(Vec<u8>),
    List(Vec<Datum>),
    Map(Vec<(Datum, Datum)>),
    Constr { alternative: u64, fields: Vec<Datum> },
}

impl Datum {
    /// Constructor with no fields (a bare enum variant).
    pub fn unit(alternative: u64) -> Self {
        Datum::Constr {
            alternative,
            fields: Vec::new(),
        }
    }

    /// Serialize to canonical bytes.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), CborError> {
        match self {
            Datum::Int(v) => cbor::write_int(buf, *v),
            Datum::Bytes(b) => {
                cbor::write_bytes(buf, b);
                Ok(())
            }
            Datum::List(items) => {
                cbor::write_array(buf, items.len());
                for item in items {
                    item.encode(buf)?;
                }
                Ok(())
            }
            Datum::Map(entries) => {
                cbor::write_map(buf, entries.len());
                for (key, value) in entries {
                    key.encode(buf)?;
                    value.encode(buf)?;
                }
                Ok(())
            }
            Datum::Constr {
                alternative,
                fields,
            } => {
                let compact = match alternative {
                    0..=6 => Some(TAG_COMPACT_BASE + alternative),
                    7..=127 => Some(TAG_EXTENDED_BASE + (alternative - 7)),
                    _ => None,
                };
                match compact {
                    Some(tag) => {
                        cbor::write_tag(buf, tag);
                        cbor::write_array(buf, fields.len());
                    }
                    None => {
                        cbor::write_tag(buf, TAG_GENERAL);
                        cbor::write_array(buf, 2);
                        cbor::write_uint(buf, *alternative);
                        cbor::write_array(buf, fields.len());
                    }
                }
                for field in fields {
                    field.encode(buf)?;
                }
                Ok(())
            }
        }
    }

    /// Canonical bytes as an owned vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CborError> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// BLAKE2b-256 hash of the canonical encoding.
    pub fn hash(&self) -> Result<Hash32, CborError> {
        Ok(crypto::blake2b_256(&self.to_bytes()?))
    }

    /// Parse a datum from canonical bytes, consuming the whole input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CborError> {
        let mut dec = Decoder::new(bytes);
        let datum = Self::decode(&mut dec)?;
        dec.finish()?;
        Ok(datum)
    }

    /// Parse one datum from a decoder.
    pub fn decode(dec: &mut Decoder<'_>) -> Result<Self, CborError> {
        Self::decode_at(dec, 0)
    }

    fn decode_at(dec: &mut Decoder<'_>, depth: usize) -> Result<Self, CborError> {
        if depth > MAX_DEPTH {
            return Err(CborError::NestingTooDeep);
        }
        match dec.peek_major()? {
            cbor::MAJOR_UNSIGNED | cbor::MAJOR_NEGATIVE => Ok(Datum::Int(dec.read_int()?)),
            cbor::MAJOR_BYTES => Ok(Datum::Bytes(dec.read_byte_string()?.to_vec())),
            cbor::MAJOR_ARRAY => {
                let len = dec.read_array()?;
                let mut items = Vec::with_capacity(len.min(1024) as usize);
                for _ in 0..len {
                    items.push(Self::decode_at(dec, depth + 1)?);
                }
                Ok(Datum::List(items))
            }
            cbor::MAJOR_MAP => {
                let len = dec.read_map()?;
                let mut entries = Vec::with_capacity(len.min(1024) as usize);
                for _ in 0..len {
                    let key = Self::decode_at(dec, depth + 1)?;
                    let value = Self::decode_at(dec, depth + 1)?;
                    entries.push((key, value));
                }
                Ok(Datum::Map(entries))
            }
            cbor::MAJOR_TAG => {
                let tag = dec.read_tag()?;
                let (alternative, field_count) = match tag {
                    TAG_COMPACT_BASE..=127 => (tag - TAG_COMPACT_BASE, dec.read_array()?),
                    TAG_EXTENDED_BASE..=1400 => (tag - TAG_EXTENDED_BASE + 7, dec.read_array()?),
                    TAG_GENERAL => {
                        let len = dec.read_array()?;
                        if len != 2 {
                            return Err(CborError::UnexpectedType {
                                expected: "2-element constructor wrapper",
                                found: cbor::MAJOR_ARRAY,
                            });
                        }
                        (dec.read_uint()?, dec.read_array()?)
                    }
                    other => return Err(CborError::UnsupportedTag(other)),
                };
                let mut fields = Vec::with_capacity(field_count.min(1024) as usize);
                for _ in 0..field_count {
                    fields.push(Self::decode_at(dec, depth + 1)?);
                }
                Ok(Datum::Constr {
                    alternative,
                    fields,
                })
            }
            found => Err(CborError::UnexpectedType {
                expected: "datum",
                found,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(datum: &Datum) -> Vec<u8> {
        let bytes = datum.to_bytes().unwrap();
        assert_eq!(&Datum::from_bytes(&bytes).unwrap(), datum);
        bytes
    }

    #[test]
    fn int_round_trip() {
        roundtrip(&Datum::Int(0));
        roundtrip(&Datum::Int(42));
        roundtrip(&Datum::Int(-42));
        roundtrip(&Datum::Int(u64::MAX as i128));
    }

    #[test]
    fn bytes_round_trip() {
        roundtrip(&Datum::Bytes(vec![]));
        roundtrip(&Datum::Bytes(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn list_round_trip() {
        roundtrip(&Datum::List(vec![
            Datum::Int(1),
            Datum::Bytes(vec![2]),
            Datum::List(vec![Datum::Int(3)]),
        ]));
    }

    #[test]
    fn map_preserves_insertion_order() {
        let forward = Datum::Map(vec![
            (Datum::Int(1), Datum::Int(10)),
            (Datum::Int(2), Datum::Int(20)),
        ]);
        let reversed = Datum::Map(vec![
            (Datum::Int(2), Datum::Int(20)),
            (Datum::Int(1), Datum::Int(10)),
        ]);
        let a = roundtrip(&forward);
        let b = roundtrip(&reversed);
        assert_ne!(a, b);
    }

    #[test]
    fn constr_compact_tags() {
        let bytes = Datum::unit(0).to_bytes().unwrap();
        // tag 121 = 0xd8 0x79, empty array = 0x80
        assert_eq!(bytes, vec![0xd8, 0x79, 0x80]);
        let bytes = Datum::unit(6).to_bytes().unwrap();
        assert_eq!(bytes, vec![0xd8, 0x7f, 0x80]);
    }

    #[test]
    fn constr_extended_tags() {
        let bytes = Datum::unit(7).to_bytes().unwrap();
        // tag 1280 = 0xd9 0x0500
        assert_eq!(bytes, vec![0xd9, 0x05, 0x00, 0x80]);
        roundtrip(&Datum::unit(127));
    }

    #[test]
    fn constr_general_tag() {
        let datum = Datum::Constr {
            alternative: 1000,
            fields: vec![Datum::Int(5)],
        };
        let bytes = roundtrip(&datum);
        // tag 102 = 0xd8 0x66
        assert_eq!(&bytes[..2], &[0xd8, 0x66]);
    }

    #[test]
    fn constr_with_fields_round_trip() {
        roundtrip(&Datum::Constr {
            alternative: 0,
            fields: vec![
                Datum::Bytes(vec![0xaa; 28]),
                Datum::Int(1_000_000),
                Datum::unit(1),
            ],
        });
    }

    #[test]
    fn boundary_alternatives_round_trip() {
        for alt in [0u64, 6, 7, 127, 128, u32::MAX as u64] {
            roundtrip(&Datum::unit(alt));
        }
    }

    #[test]
    fn unsupported_tag_rejected() {
        let mut buf = Vec::new();
        cbor::write_tag(&mut buf, 99);
        cbor::write_array(&mut buf, 0);
        assert_eq!(
            Datum::from_bytes(&buf).unwrap_err(),
            CborError::UnsupportedTag(99)
        );
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = Datum::Int(1).to_bytes().unwrap();
        bytes.push(0x00);
        assert_eq!(
            Datum::from_bytes(&bytes).unwrap_err(),
            CborError::TrailingBytes
        );
    }

    #[test]
    fn deep_nesting_rejected() {
        let mut buf = Vec::new();
        for _ in 0..(MAX_DEPTH + 2) {
            cbor::write_array(&mut buf, 1);
        }
        cbor::write_uint(&mut buf, 0);
        assert_eq!(
            Datum::from_bytes(&buf).unwrap_err(),
            CborError::NestingTooDeep
        );
    }

    #[test]
    fn hash_deterministic_and_distinct() {
        let a = Datum::Int(1).hash().unwrap();
        assert_eq!(a, Datum::Int(1).hash().unwrap());
        assert_ne!(a, Datum::Int(2).hash().unwrap());
    }

    #[test]
    fn equal_datums_encode_identically() {
        let make = || Datum::Constr {
            alternative: 2,
            fields: vec![Datum::List(vec![Datum::Int(7), Datum::Bytes(vec![1, 2])])],
        };
        assert_eq!(make().to_bytes().unwrap(), make().to_bytes().unwrap());
    }
}
