//! Witness-set assembly for multi-signer workflows.

use tracing::debug;

use ebb_core::tx::{Tx, Witness};

use crate::error::WalletError;

/// Merge witnesses into a transaction's witness set.
///
/// `partial_sign` signals that the caller expects witnesses from other
/// signers to already be present; without it, a non-empty witness set is a
/// conflict and the merge is refused. Duplicate witnesses for the same
/// public key collapse to one, so merging the same witness twice is
/// idempotent.
pub fn add_witnesses(
    tx: &mut Tx,
    witnesses: Vec<Witness>,
    partial_sign: bool,
) -> Result<(), WalletError> {
    if !partial_sign && !tx.witness_set.is_empty() {
        return Err(WalletError::AlreadyWitnessed);
    }
    let mut added = 0usize;
    for witness in witnesses {
        if tx.witness_set.add(witness) {
            added += 1;
        }
    }
    debug!(added, total = tx.witness_set.len(), "merged witnesses");
    Ok(())
}
