//! Error types for the wallet layer.
use thiserror::Error;

use ebb_core::error::{CborError, CryptoError, ProviderError};

/// Failures constructing, deriving from, or signing with a wallet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
    #[error("unsupported entropy strength: {0} bits")]
    UnsupportedStrength(usize),
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
    /// Signing was requested for an address this wallet does not control.
    #[error("address not owned by the derived account: {0}")]
    ForeignAddress(String),
    /// A non-partial sign was requested on a body that already carries
    /// witnesses.
    #[error("transaction already witnessed; request a partial sign to add witnesses")]
    AlreadyWitnessed,
    #[error("capability not provided: {0}")]
    CapabilityNotProvided(&'static str),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Cbor(#[from] CborError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
