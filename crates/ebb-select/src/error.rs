//! Error types for input selection.
use thiserror::Error;

use ebb_core::value::Value;

/// Failures producing a funded transaction prototype.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The spendable set cannot cover the required value.
    ///
    /// `deficit` lists the units still short and by how much; `selected` and
    /// `available` are input counts for diagnosis.
    #[error("insufficient funds: short {deficit} ({selected} of {available} inputs selected)")]
    InsufficientFunds {
        deficit: Value,
        selected: usize,
        available: usize,
    },
    /// The fee-refinement loop ran out of rounds without a change set that
    /// satisfies the minimum-coin floor.
    #[error("fee did not converge within {rounds} refinement rounds")]
    FeeDidNotConverge { rounds: usize },
    /// More inputs were chosen than the cost oracle permits.
    #[error("selection limit exceeded: {selected} inputs chosen, limit {limit}")]
    SelectionLimitExceeded { selected: usize, limit: usize },
}
