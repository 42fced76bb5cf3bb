//! Root secrets and hardened hierarchical key derivation.
//!
//! Derivation is hardened-only HMAC-SHA512 over the fixed path
//! `m/1852'/1815'/account'/role'/index'` with role 0 for payment keys and
//! role 2 for stake keys. Ed25519 has no public-parent derivation, so every
//! level is hardened; the scheme is deterministic and the same root secret
//! always yields the same keys.

use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use ebb_core::crypto::KeyPair;

use crate::error::WalletError;
use crate::mnemonic;

type HmacSha512 = Hmac<Sha512>;

/// Domain separator for the master key (SLIP-0010 convention).
const MASTER_KEY_DOMAIN: &[u8] = b"ed25519 seed";

/// Derivation path constants.
pub const PURPOSE: u32 = 1852;
pub const COIN_TYPE: u32 = 1815;
pub const ROLE_PAYMENT: u32 = 0;
pub const ROLE_STAKE: u32 = 2;

const HARDENED: u32 = 0x8000_0000;

/// Stake key installed when key material carries a payment key only, so
/// enterprise-style wallets still derive all three address forms
/// deterministically.
pub const PLACEHOLDER_STAKE_KEY: [u8; 32] = [0xf0; 32];

/// The ways a wallet's root secret can be supplied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyMaterial {
    /// A BIP-39 word list.
    Mnemonic(Vec<String>),
    /// A hex-encoded 64-byte extended private key (key followed by chain
    /// code).
    ExtendedKey(String),
    /// Raw hex-encoded 32-byte signing keys. Each key may carry a leading
    /// CBOR byte-string header (`5820`), which is stripped.
    SigningKeys {
        payment: String,
        stake: Option<String>,
    },
}

/// An extended private key: signing key plus chain code.
///
/// Zeroized on drop; never serialized.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKey {
    key: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedKey {
    /// Master key from a BIP-39 root seed.
    pub fn from_seed(seed: &[u8; 64]) -> Self {
        let mut mac = HmacSha512::new_from_slice(MASTER_KEY_DOMAIN)
            .expect("HMAC accepts keys of any length");
        mac.update(seed);
        Self::split(mac.finalize().into_bytes().as_slice())
    }

    /// Parse from 64 raw bytes: key followed by chain code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        if bytes.len() != 64 {
            return Err(WalletError::InvalidKeyMaterial(format!(
                "extended key must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self::split(bytes))
    }

    fn split(bytes: &[u8]) -> Self {
        let mut key = [0u8; 32];
        let mut chain_code = [0u8; 32];
        key.copy_from_slice(&bytes[..32]);
        chain_code.copy_from_slice(&bytes[32..64]);
        Self { key, chain_code }
    }

    /// Hardened child derivation.
    pub fn derive_hardened(&self, index: u32) -> Self {
        let hardened_index = index | HARDENED;
        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .expect("HMAC accepts keys of any length");
        mac.update(&[0x00]);
        mac.update(&self.key);
        mac.update(&hardened_index.to_be_bytes());
        Self::split(mac.finalize().into_bytes().as_slice())
    }

    /// Walk a whole path of hardened indices.
    pub fn derive_path(&self, path: &[u32]) -> Self {
        let mut current = self.clone();
        for &index in path {
            current = current.derive_hardened(index);
        }
        current
    }

    /// The signing keypair at this node.
    pub fn keypair(&self) -> KeyPair {
        KeyPair::from_secret_bytes(self.key)
    }
}

impl Clone for ExtendedKey {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            chain_code: self.chain_code,
        }
    }
}

impl fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("key", &"[REDACTED]")
            .field("chain_code", &"[REDACTED]")
            .finish()
    }
}

/// The wallet's resolved root secret.
pub(crate) enum WalletSecret {
    /// Full hierarchy: accounts derived on demand.
    Root(ExtendedKey),
    /// Raw keys: one fixed account, indices ignored.
    Pair { payment: KeyPair, stake: KeyPair },
}

impl WalletSecret {
    /// Resolve key material into a root secret. Pure derivation, no I/O.
    pub(crate) fn from_material(material: &KeyMaterial) -> Result<Self, WalletError> {
        match material {
            KeyMaterial::Mnemonic(words) => {
                let seed = mnemonic::mnemonic_to_seed(words)?;
                Ok(WalletSecret::Root(ExtendedKey::from_seed(&seed)))
            }
            KeyMaterial::ExtendedKey(hex_str) => {
                let bytes = hex::decode(hex_str.trim()).map_err(|_| {
                    WalletError::InvalidKeyMaterial("extended key is not valid hex".into())
                })?;
                Ok(WalletSecret::Root(ExtendedKey::from_bytes(&bytes)?))
            }
            KeyMaterial::SigningKeys { payment, stake } => {
                let payment = KeyPair::from_secret_bytes(parse_signing_key(payment)?);
                let stake = match stake {
                    Some(s) => KeyPair::from_secret_bytes(parse_signing_key(s)?),
                    None => KeyPair::from_secret_bytes(PLACEHOLDER_STAKE_KEY),
                };
                Ok(WalletSecret::Pair { payment, stake })
            }
        }
    }

    /// Payment and stake keypairs for `(account_index, key_index)`.
    pub(crate) fn derive(&self, account_index: u32, key_index: u32) -> (KeyPair, KeyPair) {
        match self {
            WalletSecret::Root(root) => {
                let account = root.derive_path(&[PURPOSE, COIN_TYPE, account_index]);
                let payment = account.derive_path(&[ROLE_PAYMENT, key_index]).keypair();
                let stake = account.derive_path(&[ROLE_STAKE, key_index]).keypair();
                (payment, stake)
            }
            WalletSecret::Pair { payment, stake } => (payment.clone(), stake.clone()),
        }
    }
}

impl fmt::Debug for WalletSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletSecret::Root(_) => write!(f, "WalletSecret::Root([REDACTED])"),
            WalletSecret::Pair { .. } => write!(f, "WalletSecret::Pair([REDACTED])"),
        }
    }
}

/// Parse a hex-encoded 32-byte signing key, stripping the CBOR byte-string
/// header CLI tools wrap exported keys in.
fn parse_signing_key(hex_str: &str) -> Result<[u8; 32], WalletError> {
    let trimmed = hex_str.trim();
    let stripped = trimmed.strip_prefix("5820").filter(|s| s.len() == 64);
    let body = stripped.unwrap_or(trimmed);
    let bytes = hex::decode(body)
        .map_err(|_| WalletError::InvalidKeyMaterial("signing key is not valid hex".into()))?;
    bytes.as_slice().try_into().map_err(|_| {
        WalletError::InvalidKeyMaterial(format!(
            "signing key must be 32 bytes, got {}",
            bytes.len()
        ))
    })
}
