//! Address encoding: header-byte binary form plus bech32 text.
//!
//! Addresses carry a payment credential and a stake part (payment form) or a
//! stake credential alone (reward form). The binary layout is one header
//! byte — high nibble selects the shape, low nibble the network — followed
//! by the credential bytes; pointer stake parts append three variable-length
//! naturals. The bech32 text form is derived from the bytes and is never the
//! source of truth. HRPs:
//! - Mainnet: `addr1...` / `stake1...`
//! - Testnet: `addr_test1...` / `stake_test1...`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;
use crate::types::Hash28;

/// Bech32 checksum constant (classic bech32, BIP-173).
const BECH32_CONST: u32 = 1;

/// Bech32 character set for encoding 5-bit values.
const CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

/// Network identifier carried in the header byte's low nibble.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkTag {
    /// Mainnet (network nibble 1).
    Mainnet,
    /// Any test network (network nibble 0).
    Testnet,
}

impl NetworkTag {
    fn nibble(self) -> u8 {
        match self {
            NetworkTag::Mainnet => 1,
            NetworkTag::Testnet => 0,
        }
    }

    fn from_nibble(nibble: u8) -> Result<Self, AddressError> {
        match nibble {
            1 => Ok(NetworkTag::Mainnet),
            0 => Ok(NetworkTag::Testnet),
            other => Err(AddressError::UnknownNetwork(format!("nibble {other}"))),
        }
    }
}

/// A 28-byte hash tagged as either a key hash or a script hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Credential {
    KeyHash(Hash28),
    ScriptHash(Hash28),
}

impl Credential {
    pub fn hash(&self) -> Hash28 {
        match self {
            Credential::KeyHash(h) | Credential::ScriptHash(h) => *h,
        }
    }

    fn is_script(&self) -> bool {
        matches!(self, Credential::ScriptHash(_))
    }
}

/// Position of a stake registration certificate on the chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub slot: u64,
    pub tx_index: u64,
    pub cert_index: u64,
}

/// The stake part of a payment address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StakePart {
    /// Enterprise address: no delegation part.
    #[default]
    None,
    Key(Hash28),
    Script(Hash28),
    Pointer(Pointer),
}

/// A ledger address.
///
/// Distinguished by discriminant in the header byte, never by length
/// heuristics.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    /// An address that can receive value: payment credential plus stake part.
    Payment {
        network: NetworkTag,
        payment: Credential,
        stake: StakePart,
    },
    /// A reward (stake) account address: stake credential only.
    Reward {
        network: NetworkTag,
        stake: Credential,
    },
}

impl Address {
    pub fn payment(network: NetworkTag, payment: Credential, stake: StakePart) -> Self {
        Address::Payment {
            network,
            payment,
            stake,
        }
    }

    pub fn reward(network: NetworkTag, stake: Credential) -> Self {
        Address::Reward { network, stake }
    }

    /// Base address: payment key hash plus stake key hash.
    pub fn base(network: NetworkTag, payment: Hash28, stake: Hash28) -> Self {
        Self::payment(
            network,
            Credential::KeyHash(payment),
            StakePart::Key(stake),
        )
    }

    /// Enterprise address: payment key hash, no stake part.
    pub fn enterprise(network: NetworkTag, payment: Hash28) -> Self {
        Self::payment(network, Credential::KeyHash(payment), StakePart::None)
    }

    pub fn network(&self) -> NetworkTag {
        match self {
            Address::Payment { network, .. } | Address::Reward { network, .. } => *network,
        }
    }

    /// The payment credential, if this is a payment-form address.
    pub fn payment_credential(&self) -> Option<&Credential> {
        match self {
            Address::Payment { payment, .. } => Some(payment),
            Address::Reward { .. } => None,
        }
    }

    /// Human-readable prefix for the bech32 form.
    pub fn hrp(&self) -> &'static str {
        match (self, self.network()) {
            (Address::Payment { .. }, NetworkTag::Mainnet) => "addr",
            (Address::Payment { .. }, NetworkTag::Testnet) => "addr_test",
            (Address::Reward { .. }, NetworkTag::Mainnet) => "stake",
            (Address::Reward { .. }, NetworkTag::Testnet) => "stake_test",
        }
    }

    fn header(&self) -> u8 {
        let network = self.network().nibble();
        let shape = match self {
            Address::Payment { payment, stake, .. } => {
                let p = payment.is_script() as u8;
                match stake {
                    StakePart::Key(_) => p,
                    StakePart::Script(_) => 0b0010 | p,
                    StakePart::Pointer(_) => 0b0100 | p,
                    StakePart::None => 0b0110 | p,
                }
            }
            Address::Reward { stake, .. } => 0b1110 | stake.is_script() as u8,
        };
        (shape << 4) | network
    }

    /// Serialize to the binary header-byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.header()];
        match self {
            Address::Payment { payment, stake, .. } => {
                out.extend_from_slice(payment.hash().as_bytes());
                match stake {
                    StakePart::None => {}
                    StakePart::Key(h) | StakePart::Script(h) => {
                        out.extend_from_slice(h.as_bytes());
                    }
                    StakePart::Pointer(p) => {
                        write_nat(&mut out, p.slot);
                        write_nat(&mut out, p.tx_index);
                        write_nat(&mut out, p.cert_index);
                    }
                }
            }
            Address::Reward { stake, .. } => {
                out.extend_from_slice(stake.hash().as_bytes());
            }
        }
        out
    }

    /// Parse the binary header-byte form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AddressError> {
        let (&header, rest) = bytes.split_first().ok_or(AddressError::InvalidLength)?;
        let network = NetworkTag::from_nibble(header & 0x0f)?;
        let shape = header >> 4;

        let credential = |hash: Hash28, is_script: bool| {
            if is_script {
                Credential::ScriptHash(hash)
            } else {
                Credential::KeyHash(hash)
            }
        };

        match shape {
            // payment + stake hash: two 28-byte credentials
            0b0000..=0b0011 => {
                let (payment, stake) = take_hash28(rest)?;
                let (stake_hash, rest) = take_hash28(stake)?;
                if !rest.is_empty() {
                    return Err(AddressError::TrailingBytes);
                }
                let stake = if shape & 0b0010 != 0 {
                    StakePart::Script(stake_hash)
                } else {
                    StakePart::Key(stake_hash)
                };
                Ok(Address::Payment {
                    network,
                    payment: credential(payment, shape & 1 != 0),
                    stake,
                })
            }
            // payment + pointer
            0b0100 | 0b0101 => {
                let (payment, rest) = take_hash28(rest)?;
                let (slot, rest) = read_nat(rest)?;
                let (tx_index, rest) = read_nat(rest)?;
                let (cert_index, rest) = read_nat(rest)?;
                if !rest.is_empty() {
                    return Err(AddressError::TrailingBytes);
                }
                Ok(Address::Payment {
                    network,
                    payment: credential(payment, shape & 1 != 0),
                    stake: StakePart::Pointer(Pointer {
                        slot,
                        tx_index,
                        cert_index,
                    }),
                })
            }
            // enterprise
            0b0110 | 0b0111 => {
                let (payment, rest) = take_hash28(rest)?;
                if !rest.is_empty() {
                    return Err(AddressError::TrailingBytes);
                }
                Ok(Address::Payment {
                    network,
                    payment: credential(payment, shape & 1 != 0),
                    stake: StakePart::None,
                })
            }
            // reward
            0b1110 | 0b1111 => {
                let (stake, rest) = take_hash28(rest)?;
                if !rest.is_empty() {
                    return Err(AddressError::TrailingBytes);
                }
                Ok(Address::Reward {
                    network,
                    stake: credential(stake, shape & 1 != 0),
                })
            }
            _ => Err(AddressError::InvalidHeader(header)),
        }
    }

    /// Encode this address as a bech32 string.
    pub fn encode(&self) -> String {
        let hrp = self.hrp();
        let bytes = self.to_bytes();
        let data_5bit =
            convert_bits(&bytes, 8, 5, true).expect("8-to-5 conversion with padding is total");
        let checksum = bech32_create_checksum(hrp, &data_5bit);

        let mut result = String::with_capacity(hrp.len() + 1 + data_5bit.len() + 6);
        result.push_str(hrp);
        result.push('1');
        for &d in data_5bit.iter().chain(checksum.iter()) {
            result.push(CHARSET[d as usize] as char);
        }
        result
    }

    /// Decode a bech32 address string.
    pub fn decode(s: &str) -> Result<Self, AddressError> {
        // All-lower or all-upper; bech32 forbids mixed case
        let has_lower = s.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = s.chars().any(|c| c.is_ascii_uppercase());
        if has_lower && has_upper {
            return Err(AddressError::MixedCase);
        }
        let s_lower = s.to_ascii_lowercase();

        let sep_pos = s_lower.rfind('1').ok_or(AddressError::MissingSeparator)?;
        if sep_pos == 0 {
            return Err(AddressError::InvalidHrp);
        }
        if sep_pos + 7 > s_lower.len() {
            return Err(AddressError::InvalidLength);
        }

        let hrp = &s_lower[..sep_pos];
        match hrp {
            "addr" | "addr_test" | "stake" | "stake_test" => {}
            _ => return Err(AddressError::InvalidHrp),
        }

        let mut data = Vec::with_capacity(s_lower.len() - sep_pos - 1);
        for c in s_lower[sep_pos + 1..].chars() {
            let pos = CHARSET
                .iter()
                .position(|&ch| ch as char == c)
                .ok_or(AddressError::InvalidCharacter(c))?;
            data.push(pos as u8);
        }

        if !bech32_verify_checksum(hrp, &data) {
            return Err(AddressError::InvalidChecksum);
        }

        let payload = &data[..data.len() - 6];
        let bytes = convert_bits(payload, 5, 8, false).ok_or(AddressError::InvalidPadding)?;
        let address = Self::from_bytes(&bytes)?;

        // The HRP must agree with the decoded header byte.
        if address.hrp() != hrp {
            return Err(AddressError::InvalidHrp);
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::decode(&s).map_err(serde::de::Error::custom)
    }
}

fn take_hash28(bytes: &[u8]) -> Result<(Hash28, &[u8]), AddressError> {
    if bytes.len() < 28 {
        return Err(AddressError::InvalidLength);
    }
    let (head, rest) = bytes.split_at(28);
    let mut hash = [0u8; 28];
    hash.copy_from_slice(head);
    Ok((Hash28(hash), rest))
}

/// Write a variable-length natural: 7 bits per byte, high bit set on all but
/// the last byte, most significant group first.
fn write_nat(out: &mut Vec<u8>, mut value: u64) {
    let mut groups = [0u8; 10];
    let mut n = 0;
    loop {
        groups[n] = (value & 0x7f) as u8;
        n += 1;
        value >>= 7;
        if value == 0 {
            break;
        }
    }
    for i in (1..n).rev() {
        out.push(groups[i] | 0x80);
    }
    out.push(groups[0]);
}

/// Read a variable-length natural, returning the value and the remainder.
fn read_nat(bytes: &[u8]) -> Result<(u64, &[u8]), AddressError> {
    let mut value: u64 = 0;
    for (i, &b) in bytes.iter().enumerate() {
        value = value
            .checked_shl(7)
            .filter(|_| value >> 57 == 0)
            .ok_or(AddressError::InvalidLength)?
            | (b & 0x7f) as u64;
        if b & 0x80 == 0 {
            return Ok((value, &bytes[i + 1..]));
        }
    }
    Err(AddressError::InvalidLength)
}

// --- bech32 internals ---

/// Compute the bech32 polymod over a sequence of 5-bit values.
fn bech32_polymod(values: &[u8]) -> u32 {
    const GEN: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
    let mut chk: u32 = 1;
    for &v in values {
        let b = chk >> 25;
        chk = ((chk & 0x1ffffff) << 5) ^ (v as u32);
        for (i, &g) in GEN.iter().enumerate() {
            if (b >> i) & 1 != 0 {
                chk ^= g;
            }
        }
    }
    chk
}

/// Expand the HRP for checksum computation.
fn bech32_hrp_expand(hrp: &str) -> Vec<u8> {
    let mut ret = Vec::with_capacity(hrp.len() * 2 + 1);
    for c in hrp.bytes() {
        ret.push(c >> 5);
    }
    ret.push(0);
    for c in hrp.bytes() {
        ret.push(c & 31);
    }
    ret
}

/// Create the 6-value bech32 checksum for the given HRP and data.
fn bech32_create_checksum(hrp: &str, data: &[u8]) -> Vec<u8> {
    let mut values = bech32_hrp_expand(hrp);
    values.extend_from_slice(data);
    values.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    let polymod = bech32_polymod(&values) ^ BECH32_CONST;
    (0..6)
        .map(|i| ((polymod >> (5 * (5 - i))) & 31) as u8)
        .collect()
}

/// Verify the bech32 checksum for the given HRP and data (including checksum).
fn bech32_verify_checksum(hrp: &str, data: &[u8]) -> bool {
    let mut values = bech32_hrp_expand(hrp);
    values.extend_from_slice(data);
    bech32_polymod(&values) == BECH32_CONST
}

/// Convert between bit widths (e.g. 8-bit bytes to 5-bit bech32 groups).
fn convert_bits(data: &[u8], from_bits: u32, to_bits: u32, pad: bool) -> Option<Vec<u8>> {
    let mut acc: u32 = 0;
    let mut bits: u32 = 0;
    let mut ret = Vec::new();
    let maxv = (1u32 << to_bits) - 1;
    for &value in data {
        let v = value as u32;
        if v >> from_bits != 0 {
            return None;
        }
        acc = (acc << from_bits) | v;
        bits += from_bits;
        while bits >= to_bits {
            bits -= to_bits;
            ret.push(((acc >> bits) & maxv) as u8);
        }
    }
    if pad {
        if bits > 0 {
            ret.push(((acc << (to_bits - bits)) & maxv) as u8);
        }
    } else if bits >= from_bits || ((acc << (to_bits - bits)) & maxv) != 0 {
        return None;
    }
    Some(ret)
}
