//! # Asset Ledger
//!
//! The per-session ledger tracks one signed net obligation ("delta") per
//! asset for the duration of a single top-level invocation. Positive
//! means the custodian currently owes the asset to its counterparties (a
//! debit -- "the custodian must pay out"); negative means the custodian
//! is owed the asset (a credit -- "the custodian must receive").
//!
//! The ledger itself never validates anything: [`debit`](Ledger::debit)
//! and [`credit`](Ledger::credit) are pure additions to the existing
//! signed value, and none of its operations can fail. All validation
//! (insufficient payment, bound violations) belongs to callers that
//! compare deltas before and after using it. The one question the ledger
//! answers authoritatively is [`is_reconciled`](Ledger::is_reconciled):
//! whether every delta has been driven back to exactly zero.
//!
//! Amounts are `u64` in smallest-unit denomination; deltas accumulate in
//! `i128`, which a `u64` addend cannot overflow in any feasible number of
//! operations.

use std::collections::HashMap;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// Signed per-asset obligations for one session.
///
/// Internally a `HashMap<AssetId, i128>` plus a counter of currently
/// nonzero deltas. The touched-asset set is derived (assets whose delta
/// is nonzero) and its size always equals the counter.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    /// Net delta per asset. Entries may return to zero without being
    /// removed; the counter tracks how many are nonzero.
    deltas: HashMap<AssetId, i128>,

    /// Number of assets with a nonzero delta.
    nonzero: usize,
}

impl Ledger {
    /// Creates an empty, reconciled ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the custodian owes `amount` of `asset`.
    ///
    /// A zero `amount` is a no-op.
    pub fn debit(&mut self, asset: AssetId, amount: u64) {
        self.apply(asset, amount as i128);
    }

    /// Records that the custodian is owed `amount` of `asset`.
    ///
    /// A zero `amount` is a no-op.
    pub fn credit(&mut self, asset: AssetId, amount: u64) {
        self.apply(asset, -(amount as i128));
    }

    /// Returns the current net delta for `asset` (zero if untouched).
    pub fn net_delta(&self, asset: AssetId) -> i128 {
        self.deltas.get(&asset).copied().unwrap_or(0)
    }

    /// Returns `true` iff no asset has an outstanding nonzero delta.
    pub fn is_reconciled(&self) -> bool {
        self.nonzero == 0
    }

    /// Returns the number of assets with a nonzero delta.
    pub fn nonzero_count(&self) -> usize {
        self.nonzero
    }

    /// Iterates over the touched assets: those with a nonzero delta.
    pub fn touched(&self) -> impl Iterator<Item = AssetId> + '_ {
        self.deltas
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(asset, _)| *asset)
    }

    /// Resets the ledger to its initial empty state.
    pub fn clear(&mut self) {
        self.deltas.clear();
        self.nonzero = 0;
    }

    /// Adds `signed` to the asset's delta, maintaining the nonzero
    /// counter across zero-crossings.
    fn apply(&mut self, asset: AssetId, signed: i128) {
        if signed == 0 {
            return;
        }

        let delta = self.deltas.entry(asset).or_insert(0);
        let was_zero = *delta == 0;
        *delta += signed;
        let is_zero = *delta == 0;

        if was_zero && !is_zero {
            self.nonzero += 1;
        } else if !was_zero && is_zero {
            self.nonzero -= 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
