//! The reference largest-first strategy.
//!
//! For each unit in deficit, pulls the not-yet-selected input holding the
//! largest quantity of that unit. Deterministic given the same inputs.

use ebb_core::types::Utxo;

use crate::error::SelectionError;
use crate::oracle::{CostOracle, TransactionPrototype};
use crate::selection::{self, InputSelector, Picker, SelectionRequest};

/// Largest-first input selection.
#[derive(Clone, Copy, Debug, Default)]
pub struct LargestFirstSelector;

impl LargestFirstSelector {
    pub fn new() -> Self {
        Self
    }
}

struct LargestFirstPicker;

impl Picker for LargestFirstPicker {
    fn pick(
        &mut self,
        unit: &str,
        _deficit: i128,
        available: &[Utxo],
        candidates: &[usize],
    ) -> Option<usize> {
        candidates
            .iter()
            .copied()
            .max_by_key(|&i| available[i].output.value.get(unit))
    }
}

impl InputSelector for LargestFirstSelector {
    fn select(
        &self,
        request: &SelectionRequest<'_>,
        oracle: &dyn CostOracle,
    ) -> Result<TransactionPrototype, SelectionError> {
        selection::run(request, oracle, &mut LargestFirstPicker)
    }
}
