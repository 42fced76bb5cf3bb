//! # ebb-wallet
//! Embedded deterministic wallet: BIP-39 mnemonics, hardened hierarchical
//! derivation, address derivation, and witness production.

pub mod error;
pub mod keys;
pub mod mnemonic;
pub mod wallet;
pub mod witness;

pub use error::WalletError;
pub use keys::{ExtendedKey, KeyMaterial};
pub use mnemonic::{generate_mnemonic, mnemonic_to_seed};
pub use wallet::{Account, DataSignature, EmbeddedWallet};
pub use witness::add_witnesses;
