//! # ebb-core
//! Canonical codec, value arithmetic, and shared types for the ebb engine.

pub mod address;
pub mod cbor;
pub mod crypto;
pub mod datum;
pub mod error;
pub mod traits;
pub mod tx;
pub mod types;
pub mod value;
