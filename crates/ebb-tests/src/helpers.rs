//! Shared helpers for end-to-end and property tests.

use ebb_core::address::{Address, NetworkTag};
use ebb_core::tx::total_value;
use ebb_core::types::{Hash28, Hash32, TxInput, TxOutput, Utxo};
use ebb_core::value::Value;
use ebb_select::{ImplicitValue, TransactionPrototype};

/// 56-hex-char policy id plus ascii asset name "tokA" / "tokB".
pub const TOKEN_A: &str = "00000000000000000000000000000000000000000000000000000000746f6b41";
pub const TOKEN_B: &str = "11111111111111111111111111111111111111111111111111111111746f6b42";

/// Simple credential hash from a seed byte.
pub fn pkh(seed: u8) -> Hash28 {
    Hash28([seed; 28])
}

/// An enterprise testnet address derived from a seed byte.
pub fn test_address(seed: u8) -> Address {
    Address::enterprise(NetworkTag::Testnet, pkh(seed))
}

/// A spendable output holding `value` at a fixed address, with a unique
/// input per index.
pub fn utxo(index: u32, value: Value) -> Utxo {
    Utxo::new(
        TxInput::new(Hash32::from_bytes([index as u8; 32]), index),
        TxOutput::new(test_address(0xAA), value),
    )
}

/// A spendable output holding only base currency.
pub fn lovelace_utxo(index: u32, coin: i128) -> Utxo {
    utxo(index, Value::lovelace(coin))
}

/// Sum of a slice of outputs' values.
pub fn output_total(outputs: &[TxOutput]) -> Value {
    outputs
        .iter()
        .fold(Value::new(), |acc, o| acc.merge(&o.value))
}

/// Per-unit conservation check for a successful selection:
/// inputs + implicit inflows == requested + change + fee, exactly.
pub fn assert_conserved(
    prototype: &TransactionPrototype,
    preselected: &[Utxo],
    requested: &[TxOutput],
    implicit: &ImplicitValue,
) {
    let in_side = total_value(&prototype.new_inputs)
        .merge(&total_value(preselected))
        .merge(&implicit.net_inflow());
    let out_side = output_total(requested)
        .merge(&output_total(&prototype.change))
        .merge(&Value::lovelace(prototype.fee as i128));
    let diff = in_side.subtract(&out_side);
    assert!(
        diff.is_empty(),
        "selection does not conserve value, imbalance: {diff}"
    );
}
