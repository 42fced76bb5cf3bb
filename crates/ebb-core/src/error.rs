//! Error types for the ebb codec layer.
use thiserror::Error;

/// Errors decoding or encoding an address, in either its bech32 text form
/// or its binary header-byte form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid HRP")] InvalidHrp,
    #[error("invalid length")] InvalidLength,
    #[error("invalid checksum")] InvalidChecksum,
    #[error("invalid character: {0}")] InvalidCharacter(char),
    #[error("invalid header byte: {0:#04x}")] InvalidHeader(u8),
    #[error("invalid padding bits")] InvalidPadding,
    #[error("unknown network: {0}")] UnknownNetwork(String),
    #[error("missing separator")] MissingSeparator,
    #[error("mixed case")] MixedCase,
    #[error("trailing bytes after address payload")] TrailingBytes,
}

/// Errors from the canonical CBOR layer.
///
/// Decoding is strict: indefinite lengths and non-minimal integer widths
/// are rejected so that every value has exactly one valid encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CborError {
    #[error("truncated input")] Truncated,
    #[error("expected {expected}, found major type {found}")] UnexpectedType { expected: &'static str, found: u8 },
    #[error("non-minimal integer encoding")] NonMinimalInt,
    #[error("indefinite lengths are not supported")] IndefiniteLength,
    #[error("trailing bytes after value")] TrailingBytes,
    #[error("unsupported tag: {0}")] UnsupportedTag(u64),
    #[error("integer out of encodable range")] IntegerOutOfRange,
    #[error("invalid UTF-8 in text string")] InvalidUtf8,
    #[error("wrong hash length: expected {expected}, got {got}")] WrongHashLength { expected: usize, got: usize },
    #[error("duplicate map key")] DuplicateKey,
    #[error("zero-quantity entry in value map")] ZeroQuantity,
    #[error("unknown field key: {0}")] UnknownField(u64),
    #[error("missing field: {0}")] MissingField(&'static str),
    #[error("nesting too deep")] NestingTooDeep,
    #[error(transparent)] Address(#[from] AddressError),
}

/// Errors from key handling and signature verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid signature bytes")] InvalidSignature,
    #[error("signature verification failed")] VerificationFailed,
    #[error("key hash does not match expected credential")] KeyHashMismatch,
}

/// Failures crossing the process boundary to an external collaborator.
///
/// Propagated to the caller untouched; the core never retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("fetch failed: {0}")] Fetch(String),
    #[error("submit failed: {0}")] Submit(String),
    #[error("collaborator timed out")] Timeout,
}

/// Umbrella error for callers that do not care which layer failed.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Cbor(#[from] CborError),
    #[error(transparent)] Crypto(#[from] CryptoError),
    #[error(transparent)] Provider(#[from] ProviderError),
}
