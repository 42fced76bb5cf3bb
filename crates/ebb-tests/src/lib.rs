//! Cross-crate test suite for the ebb engine.
//!
//! This crate exercises the full lifecycle: derive a wallet, fetch
//! spendable outputs, fund a payment through selection, assemble and sign
//! the transaction, and hand it off for submission. Conservation and
//! determinism invariants are verified end to end.

pub mod helpers;
