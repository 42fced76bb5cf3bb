//! Minimal canonical CBOR reader and writer.
//!
//! Datum hashes and transaction signatures are computed over these bytes,
//! so the encoding must be deterministic: definite lengths only, and every
//! integer written with its minimal width. The reader enforces the same
//! rules, rejecting indefinite lengths and non-minimal headers so that
//! `decode(encode(x))` accepts exactly one byte string per value.

use crate::error::CborError;

/// Major type constants (RFC 8949 §3.1).
pub const MAJOR_UNSIGNED: u8 = 0;
pub const MAJOR_NEGATIVE: u8 = 1;
pub const MAJOR_BYTES: u8 = 2;
pub const MAJOR_TEXT: u8 = 3;
pub const MAJOR_ARRAY: u8 = 4;
pub const MAJOR_MAP: u8 = 5;
pub const MAJOR_TAG: u8 = 6;

/// Write a header with the minimal argument width.
pub fn write_header(buf: &mut Vec<u8>, major: u8, value: u64) {
    let m = major << 5;
    if value < 24 {
        buf.push(m | value as u8);
    } else if value <= 0xff {
        buf.push(m | 24);
        buf.push(value as u8);
    } else if value <= 0xffff {
        buf.push(m | 25);
        buf.extend_from_slice(&(value as u16).to_be_bytes());
    } else if value <= 0xffff_ffff {
        buf.push(m | 26);
        buf.extend_from_slice(&(value as u32).to_be_bytes());
    } else {
        buf.push(m | 27);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

/// Write an unsigned integer.
pub fn write_uint(buf: &mut Vec<u8>, value: u64) {
    write_header(buf, MAJOR_UNSIGNED, value);
}

/// Write a signed integer.
///
/// CBOR major types 0/1 carry at most 64-bit magnitudes; quantities outside
/// `-(2^64) ..= 2^64 - 1` are unencodable and rejected.
pub fn write_int(buf: &mut Vec<u8>, value: i128) -> Result<(), CborError> {
    if value >= 0 {
        if value > u64::MAX as i128 {
            return Err(CborError::IntegerOutOfRange);
        }
        write_header(buf, MAJOR_UNSIGNED, value as u64);
    } else {
        let magnitude = -1i128 - value;
        if magnitude > u64::MAX as i128 {
            return Err(CborError::IntegerOutOfRange);
        }
        write_header(buf, MAJOR_NEGATIVE, magnitude as u64);
    }
    Ok(())
}

/// Write a definite-length byte string.
pub fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_header(buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

/// Write a definite-length text string.
pub fn write_text(buf: &mut Vec<u8>, text: &str) {
    write_header(buf, MAJOR_TEXT, text.len() as u64);
    buf.extend_from_slice(text.as_bytes());
}

/// Write an array header for `len` following items.
pub fn write_array(buf: &mut Vec<u8>, len: usize) {
    write_header(buf, MAJOR_ARRAY, len as u64);
}

/// Write a map header for `len` following key/value pairs.
pub fn write_map(buf: &mut Vec<u8>, len: usize) {
    write_header(buf, MAJOR_MAP, len as u64);
}

/// Write a tag preceding the next item.
pub fn write_tag(buf: &mut Vec<u8>, tag: u64) {
    write_header(buf, MAJOR_TAG, tag);
}

/// Streaming canonical CBOR reader over a borrowed byte slice.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Major type of the next item without consuming it.
    pub fn peek_major(&self) -> Result<u8, CborError> {
        let b = *self.buf.get(self.pos).ok_or(CborError::Truncated)?;
        Ok(b >> 5)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CborError> {
        if self.buf.len() - self.pos < n {
            return Err(CborError::Truncated);
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a header, enforcing minimal-width arguments.
    fn read_header(&mut self) -> Result<(u8, u64), CborError> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        let info = initial & 0x1f;
        let value = match info {
            0..=23 => info as u64,
            24 => {
                let v = self.take(1)?[0] as u64;
                if v < 24 {
                    return Err(CborError::NonMinimalInt);
                }
                v
            }
            25 => {
                let v = u16::from_be_bytes(self.take(2)?.try_into().expect("2-byte slice")) as u64;
                if v <= 0xff {
                    return Err(CborError::NonMinimalInt);
                }
                v
            }
            26 => {
                let v = u32::from_be_bytes(self.take(4)?.try_into().expect("4-byte slice")) as u64;
                if v <= 0xffff {
                    return Err(CborError::NonMinimalInt);
                }
                v
            }
            27 => {
                let v = u64::from_be_bytes(self.take(8)?.try_into().expect("8-byte slice"));
                if v <= 0xffff_ffff {
                    return Err(CborError::NonMinimalInt);
                }
                v
            }
            31 => return Err(CborError::IndefiniteLength),
            _ => {
                return Err(CborError::UnexpectedType {
                    expected: "well-formed header",
                    found: major,
                })
            }
        };
        Ok((major, value))
    }

    fn expect_major(&mut self, major: u8, expected: &'static str) -> Result<u64, CborError> {
        let (found, value) = self.read_header()?;
        if found != major {
            return Err(CborError::UnexpectedType { expected, found });
        }
        Ok(value)
    }

    /// Read an unsigned integer (major type 0).
    pub fn read_uint(&mut self) -> Result<u64, CborError> {
        self.expect_major(MAJOR_UNSIGNED, "unsigned integer")
    }

    /// Read a signed integer (major type 0 or 1).
    pub fn read_int(&mut self) -> Result<i128, CborError> {
        let (major, value) = self.read_header()?;
        match major {
            MAJOR_UNSIGNED => Ok(value as i128),
            MAJOR_NEGATIVE => Ok(-1i128 - value as i128),
            found => Err(CborError::UnexpectedType {
                expected: "integer",
                found,
            }),
        }
    }

    /// Read a definite-length byte string (major type 2).
    pub fn read_byte_string(&mut self) -> Result<&'a [u8], CborError> {
        let len = self.expect_major(MAJOR_BYTES, "byte string")?;
        self.take(len as usize)
    }

    /// Read a definite-length text string (major type 3).
    pub fn read_text_string(&mut self) -> Result<&'a str, CborError> {
        let len = self.expect_major(MAJOR_TEXT, "text string")?;
        let bytes = self.take(len as usize)?;
        std::str::from_utf8(bytes).map_err(|_| CborError::InvalidUtf8)
    }

    /// Read an array header, returning the item count.
    pub fn read_array(&mut self) -> Result<u64, CborError> {
        self.expect_major(MAJOR_ARRAY, "array")
    }

    /// Read a map header, returning the pair count.
    pub fn read_map(&mut self) -> Result<u64, CborError> {
        self.expect_major(MAJOR_MAP, "map")
    }

    /// Read a tag (major type 6).
    pub fn read_tag(&mut self) -> Result<u64, CborError> {
        self.expect_major(MAJOR_TAG, "tag")
    }

    /// Whether all input has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Finish decoding, rejecting unconsumed input.
    pub fn finish(self) -> Result<(), CborError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(CborError::TrailingBytes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_uint(v: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        write_uint(&mut buf, v);
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_uint().unwrap(), v);
        dec.finish().unwrap();
        buf
    }

    #[test]
    fn uint_widths() {
        assert_eq!(roundtrip_uint(0), vec![0x00]);
        assert_eq!(roundtrip_uint(23), vec![0x17]);
        assert_eq!(roundtrip_uint(24), vec![0x18, 24]);
        assert_eq!(roundtrip_uint(255), vec![0x18, 0xff]);
        assert_eq!(roundtrip_uint(256), vec![0x19, 0x01, 0x00]);
        assert_eq!(roundtrip_uint(65536), vec![0x1a, 0x00, 0x01, 0x00, 0x00]);
        assert_eq!(roundtrip_uint(u64::MAX).len(), 9);
    }

    #[test]
    fn int_negative() {
        let mut buf = Vec::new();
        write_int(&mut buf, -1).unwrap();
        assert_eq!(buf, vec![0x20]);
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_int().unwrap(), -1);
    }

    #[test]
    fn int_extremes() {
        for v in [i128::from(u64::MAX), -(u64::MAX as i128) - 1, 0, -1] {
            let mut buf = Vec::new();
            write_int(&mut buf, v).unwrap();
            let mut dec = Decoder::new(&buf);
            assert_eq!(dec.read_int().unwrap(), v);
        }
    }

    #[test]
    fn int_out_of_range() {
        let mut buf = Vec::new();
        assert_eq!(
            write_int(&mut buf, u64::MAX as i128 + 1).unwrap_err(),
            CborError::IntegerOutOfRange
        );
        assert_eq!(
            write_int(&mut buf, -(u64::MAX as i128) - 2).unwrap_err(),
            CborError::IntegerOutOfRange
        );
    }

    #[test]
    fn bytes_roundtrip() {
        let mut buf = Vec::new();
        write_bytes(&mut buf, b"hello");
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_byte_string().unwrap(), b"hello");
        dec.finish().unwrap();
    }

    #[test]
    fn text_roundtrip() {
        let mut buf = Vec::new();
        write_text(&mut buf, "lovelace");
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_text_string().unwrap(), "lovelace");
    }

    #[test]
    fn array_and_map_headers() {
        let mut buf = Vec::new();
        write_array(&mut buf, 2);
        write_uint(&mut buf, 1);
        write_uint(&mut buf, 2);
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_array().unwrap(), 2);
        assert_eq!(dec.read_uint().unwrap(), 1);
        assert_eq!(dec.read_uint().unwrap(), 2);
        dec.finish().unwrap();
    }

    #[test]
    fn tag_roundtrip() {
        let mut buf = Vec::new();
        write_tag(&mut buf, 121);
        write_array(&mut buf, 0);
        let mut dec = Decoder::new(&buf);
        assert_eq!(dec.read_tag().unwrap(), 121);
        assert_eq!(dec.read_array().unwrap(), 0);
    }

    #[test]
    fn non_minimal_rejected() {
        // 24 encoded with a one-byte argument of 10 (must be < 24 inline)
        let mut dec = Decoder::new(&[0x18, 0x0a]);
        assert_eq!(dec.read_uint().unwrap_err(), CborError::NonMinimalInt);
        // 255 encoded with a two-byte argument
        let mut dec = Decoder::new(&[0x19, 0x00, 0xff]);
        assert_eq!(dec.read_uint().unwrap_err(), CborError::NonMinimalInt);
    }

    #[test]
    fn indefinite_rejected() {
        let mut dec = Decoder::new(&[0x9f]); // indefinite array
        assert_eq!(dec.read_array().unwrap_err(), CborError::IndefiniteLength);
        let mut dec = Decoder::new(&[0x5f]); // indefinite bytes
        assert_eq!(
            dec.read_byte_string().unwrap_err(),
            CborError::IndefiniteLength
        );
    }

    #[test]
    fn truncated_rejected() {
        let mut dec = Decoder::new(&[0x19, 0x01]);
        assert_eq!(dec.read_uint().unwrap_err(), CborError::Truncated);
        let mut dec = Decoder::new(&[0x45, 0x01]); // 5-byte string, 1 byte present
        assert_eq!(dec.read_byte_string().unwrap_err(), CborError::Truncated);
    }

    #[test]
    fn trailing_rejected() {
        let mut buf = Vec::new();
        write_uint(&mut buf, 7);
        buf.push(0x00);
        let mut dec = Decoder::new(&buf);
        dec.read_uint().unwrap();
        assert_eq!(dec.finish().unwrap_err(), CborError::TrailingBytes);
    }

    #[test]
    fn wrong_major_reported() {
        let mut buf = Vec::new();
        write_text(&mut buf, "x");
        let mut dec = Decoder::new(&buf);
        let err = dec.read_uint().unwrap_err();
        assert_eq!(
            err,
            CborError::UnexpectedType {
                expected: "unsigned integer",
                found: MAJOR_TEXT
            }
        );
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut dec = Decoder::new(&[0x62, 0xff, 0xfe]);
        assert_eq!(dec.read_text_string().unwrap_err(), CborError::InvalidUtf8);
    }
}
