//! Contracts for external collaborators.
//!
//! Fetching and submission cross a process or network boundary, so they are
//! async and single-shot: no caching, no retry. Retry policy belongs to the
//! implementation behind the trait, never to the engine.

use async_trait::async_trait;

use crate::address::Address;
use crate::error::ProviderError;
use crate::types::{Hash32, Utxo};

/// Supplies spendable outputs from an external data source.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// All unspent outputs currently held at an address.
    async fn fetch_address_utxos(&self, address: &Address) -> Result<Vec<Utxo>, ProviderError>;

    /// The outputs created by a specific transaction that remain unspent.
    async fn fetch_utxos(&self, tx_hash: &Hash32) -> Result<Vec<Utxo>, ProviderError>;
}

/// Hands a signed transaction to an external node or service.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit the hex-encoded signed transaction; returns the transaction ID.
    async fn submit_tx(&self, signed_tx_hex: &str) -> Result<Hash32, ProviderError>;
}
