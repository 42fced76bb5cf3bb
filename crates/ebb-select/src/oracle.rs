//! The cost oracle contract and a linear-fee reference implementation.
//!
//! Selection never hardcodes fee formulas: every pricing question goes
//! through a caller-supplied [`CostOracle`], which may in turn consult a
//! remote fee-estimation service.

use serde::{Deserialize, Serialize};

use ebb_core::types::{TxOutput, Utxo};
use ebb_core::value::{self, Value};

/// The result of selection: newly chosen inputs, change outputs, and a fee.
///
/// Mutable until the caller assembles a transaction body from it.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TransactionPrototype {
    pub new_inputs: Vec<Utxo>,
    pub change: Vec<TxOutput>,
    pub fee: u64,
}

/// Value entering or leaving a transaction without a corresponding UTxO.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ImplicitValue {
    /// Staking rewards withdrawn into the transaction.
    pub withdrawals: Value,
    /// New deposit paid out of the transaction, in base units.
    pub deposit: i128,
    /// Deposit reclaimed into the transaction, in base units.
    pub reclaim_deposit: i128,
    /// Minted (positive) and burned (negative) assets.
    pub mint: Value,
}

impl ImplicitValue {
    /// The net inflow this record contributes to the transaction.
    ///
    /// Withdrawals, reclaimed deposits, and mints flow in; new deposits flow
    /// out. Burns show up as negative mint quantities and reduce the inflow.
    pub fn net_inflow(&self) -> Value {
        self.withdrawals
            .merge(&self.mint)
            .merge(&Value::lovelace(self.reclaim_deposit - self.deposit))
    }
}

/// Answers fee and size-limit questions for a candidate transaction shape.
pub trait CostOracle {
    /// Minimum fee for a transaction shaped like this prototype.
    fn compute_minimum_cost(&self, prototype: &TransactionPrototype) -> u64;

    /// Minimum base-currency quantity a candidate output must carry.
    fn compute_minimum_coin_quantity(&self, output: &TxOutput) -> u64;

    /// Whether a value holds too many assets for one output.
    fn token_bundle_size_exceeds_limit(&self, value: &Value) -> bool;

    /// Maximum number of inputs a selection may use.
    fn compute_selection_limit(&self, prototype: &TransactionPrototype) -> usize;
}

/// A linear fee model: base fee plus per-input and per-change-output terms.
///
/// Suitable for tests and offline estimation; production callers supply an
/// oracle backed by live protocol parameters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LinearCostOracle {
    pub base_fee: u64,
    pub fee_per_input: u64,
    pub fee_per_change_output: u64,
    pub min_coin_per_output: u64,
    pub max_assets_per_bundle: usize,
    pub max_inputs: usize,
}

impl Default for LinearCostOracle {
    fn default() -> Self {
        Self {
            base_fee: 160_000,
            fee_per_input: 5_000,
            fee_per_change_output: 5_000,
            min_coin_per_output: 1_000_000,
            max_assets_per_bundle: 50,
            max_inputs: 100,
        }
    }
}

impl CostOracle for LinearCostOracle {
    fn compute_minimum_cost(&self, prototype: &TransactionPrototype) -> u64 {
        self.base_fee
            .saturating_add(
                self.fee_per_input
                    .saturating_mul(prototype.new_inputs.len() as u64),
            )
            .saturating_add(
                self.fee_per_change_output
                    .saturating_mul(prototype.change.len() as u64),
            )
    }

    fn compute_minimum_coin_quantity(&self, _output: &TxOutput) -> u64 {
        self.min_coin_per_output
    }

    fn token_bundle_size_exceeds_limit(&self, value: &Value) -> bool {
        value.asset_count() > self.max_assets_per_bundle
    }

    fn compute_selection_limit(&self, _prototype: &TransactionPrototype) -> usize {
        self.max_inputs
    }
}

/// Lovelace shorthand for assembling implicit flows in callers and tests.
pub fn lovelace_withdrawal(quantity: i128) -> ImplicitValue {
    ImplicitValue {
        withdrawals: Value::from_unit(value::LOVELACE, quantity),
        ..ImplicitValue::default()
    }
}
