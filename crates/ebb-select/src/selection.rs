//! The selection engine shared by every strategy.
//!
//! Strategies differ only in which input they pull for a unit in deficit;
//! the deficit accounting, the change computation, and the bounded fee
//! refinement are common and live here so that every strategy upholds the
//! same conservation invariant:
//!
//! ```text
//! inputs + implicit inflows == outputs + change + fee + implicit outflows
//! ```
//! per asset unit, exactly.

use tracing::{debug, warn};

use ebb_core::address::Address;
use ebb_core::tx::total_value;
use ebb_core::types::{TxOutput, Utxo};
use ebb_core::value::{LOVELACE, Value};

use crate::error::SelectionError;
use crate::oracle::{CostOracle, ImplicitValue, TransactionPrototype};

/// Fixed bound on the fee-refinement loop. Exhausting it is a hard failure;
/// callers depend on the specific failure point.
pub const MAX_FEE_ROUNDS: usize = 3;

/// Everything one selection run needs besides the strategy and the oracle.
pub struct SelectionRequest<'a> {
    /// Inputs the caller has already committed to spending.
    pub preselected: &'a [Utxo],
    /// The requested payments.
    pub outputs: &'a [TxOutput],
    /// Non-UTxO value flows.
    pub implicit: &'a ImplicitValue,
    /// The spendable set.
    pub available: &'a [Utxo],
    /// Where leftover value goes.
    pub change_address: &'a Address,
}

/// A strategy for producing funded transaction prototypes.
///
/// Implementations are interchangeable: same contract, same conservation
/// invariant, possibly different inputs chosen.
pub trait InputSelector {
    fn select(
        &self,
        request: &SelectionRequest<'_>,
        oracle: &dyn CostOracle,
    ) -> Result<TransactionPrototype, SelectionError>;
}

/// How a strategy chooses the next input for a unit in deficit.
///
/// `candidates` are indices into `available`, each holding a positive
/// quantity of `unit`. `None` means the strategy found nothing usable.
pub(crate) trait Picker {
    fn pick(
        &mut self,
        unit: &str,
        deficit: i128,
        available: &[Utxo],
        candidates: &[usize],
    ) -> Option<usize>;
}

/// Run a full selection with the given picking strategy.
pub(crate) fn run(
    request: &SelectionRequest<'_>,
    oracle: &dyn CostOracle,
    picker: &mut dyn Picker,
) -> Result<TransactionPrototype, SelectionError> {
    let requested = request
        .outputs
        .iter()
        .fold(Value::new(), |acc, o| acc.merge(&o.value));
    let committed = total_value(request.preselected);
    let required = requested
        .subtract(&committed)
        .subtract(&request.implicit.net_inflow());

    // Coarse feasibility: every unit in deficit must be coverable by the
    // spendable set as a whole before any input is pulled.
    let spendable = total_value(request.available);
    let shortfall = required.subtract(&spendable).positive_part();
    if !shortfall.is_empty() {
        return Err(SelectionError::InsufficientFunds {
            deficit: shortfall,
            selected: 0,
            available: request.available.len(),
        });
    }

    let mut chosen = vec![false; request.available.len()];
    let mut selected: Vec<usize> = Vec::new();
    let mut deficit = required;

    // Cover each unit still in deficit with inputs of the strategy's choice.
    loop {
        let Some(unit) = deficit
            .iter()
            .find(|&(_, q)| q > 0)
            .map(|(u, _)| u.to_string())
        else {
            break;
        };
        let need = deficit.get(&unit);
        let candidates: Vec<usize> = (0..request.available.len())
            .filter(|&i| !chosen[i] && request.available[i].output.value.get(&unit) > 0)
            .collect();
        let Some(i) = picker.pick(&unit, need, request.available, &candidates) else {
            return Err(SelectionError::InsufficientFunds {
                deficit: deficit.positive_part(),
                selected: selected.len(),
                available: request.available.len(),
            });
        };
        chosen[i] = true;
        selected.push(i);
        deficit = deficit.subtract(&request.available[i].output.value);
        debug!(unit, input = %request.available[i].input, "covered deficit with input");
    }

    // Provisional fee against the bare selection, then refine: each round
    // derives change from the leftover at the current fee and re-prices.
    let mut fee = oracle.compute_minimum_cost(&TransactionPrototype {
        new_inputs: collect_inputs(request, &selected),
        change: Vec::new(),
        fee: 0,
    });

    for round in 1..=MAX_FEE_ROUNDS {
        let new_inputs = collect_inputs(request, &selected);
        let total_in = total_value(&new_inputs)
            .merge(&committed)
            .merge(&request.implicit.net_inflow());
        let leftover = total_in
            .subtract(&requested)
            .subtract(&Value::lovelace(fee as i128));
        let (change, coin_shortfall) = compute_change(&leftover, request.change_address, oracle);
        let prototype = TransactionPrototype {
            new_inputs,
            change,
            fee,
        };

        let limit = oracle.compute_selection_limit(&prototype);
        if prototype.new_inputs.len() > limit {
            return Err(SelectionError::SelectionLimitExceeded {
                selected: prototype.new_inputs.len(),
                limit,
            });
        }

        let new_fee = oracle.compute_minimum_cost(&prototype);
        if coin_shortfall == 0 && new_fee == fee {
            debug!(round, fee, inputs = prototype.new_inputs.len(), "selection converged");
            return Ok(prototype);
        }

        if coin_shortfall > 0 {
            warn!(round, coin_shortfall, "change below minimum-coin floor");
            // Pull the largest remaining input by base-currency quantity.
            let next = (0..request.available.len())
                .filter(|&i| !chosen[i])
                .max_by_key(|&i| request.available[i].output.value.coin());
            match next {
                Some(i) => {
                    chosen[i] = true;
                    selected.push(i);
                }
                None => {
                    return Err(SelectionError::InsufficientFunds {
                        deficit: Value::lovelace(coin_shortfall),
                        selected: selected.len(),
                        available: request.available.len(),
                    });
                }
            }
        }
        fee = new_fee;
    }

    Err(SelectionError::FeeDidNotConverge {
        rounds: MAX_FEE_ROUNDS,
    })
}

fn collect_inputs(request: &SelectionRequest<'_>, selected: &[usize]) -> Vec<Utxo> {
    selected
        .iter()
        .map(|&i| request.available[i].clone())
        .collect()
}

/// Derive change outputs from the leftover value.
///
/// Returns the outputs plus the base-currency shortfall: zero when the
/// change set is realizable, otherwise how much more base currency the
/// selection needs before it is. Asset bundles too large for one output are
/// split, each shard floored at its minimum coin, with excess base currency
/// carried by the final shard.
fn compute_change(
    leftover: &Value,
    change_address: &Address,
    oracle: &dyn CostOracle,
) -> (Vec<TxOutput>, i128) {
    let assets: Vec<(&str, i128)> = leftover
        .iter()
        .filter(|&(u, q)| u != LOVELACE && q > 0)
        .collect();
    let coin = leftover.coin();

    if assets.is_empty() {
        if coin == 0 {
            return (Vec::new(), 0);
        }
        if coin < 0 {
            return (Vec::new(), -coin);
        }
        let out = TxOutput::new(change_address.clone(), Value::lovelace(coin));
        let floor = oracle.compute_minimum_coin_quantity(&out) as i128;
        let shortfall = (floor - coin).max(0);
        return (vec![out], shortfall);
    }

    // Pack assets into bundles the oracle accepts for a single output.
    let mut bundles: Vec<Value> = Vec::new();
    let mut current = Value::new();
    for (unit, quantity) in assets {
        let tentative = current.merge(&Value::from_unit(unit, quantity));
        if !current.is_empty() && oracle.token_bundle_size_exceeds_limit(&tentative) {
            bundles.push(current);
            current = Value::from_unit(unit, quantity);
        } else {
            current = tentative;
        }
    }
    bundles.push(current);

    let mut outputs = Vec::with_capacity(bundles.len());
    let mut coin_left = coin;
    let last = bundles.len() - 1;
    let final_bundle = bundles.pop().unwrap_or_default();

    // Every shard but the last carries exactly its minimum coin.
    for bundle in bundles {
        let probe = TxOutput::new(change_address.clone(), bundle.clone());
        let floor = oracle.compute_minimum_coin_quantity(&probe) as i128;
        outputs.push(TxOutput::new(
            change_address.clone(),
            bundle.merge(&Value::lovelace(floor)),
        ));
        coin_left -= floor;
    }
    debug_assert_eq!(outputs.len(), last);

    // The final shard absorbs the remaining assets and all excess coin.
    let out = TxOutput::new(
        change_address.clone(),
        final_bundle.merge(&Value::lovelace(coin_left.max(0))),
    );
    let floor = oracle.compute_minimum_coin_quantity(&out) as i128;
    let shortfall = (floor - coin_left).max(0);
    outputs.push(out);
    (outputs, shortfall)
}
