//! # Path Executor
//!
//! A path is an ordered chain of steps converting one input asset into
//! one output asset; a batch is every path submitted to one top-level
//! call. The executor threads each step's resolved amount into the next
//! step and accumulates per-asset totals across the whole batch, so that
//! settlement moves each distinct asset at most once per side no matter
//! how many paths touch it.
//!
//! Both computation directions run through one parameterized loop over
//! [`SwapKind`] with an index transform: given-input walks the steps
//! forward, given-output walks them backward because the fixed amount
//! applies to the path's final step. The declared output floor binds only
//! the last step of a given-input path; the declared input ceiling binds
//! only the first step of a given-output path; every other step is
//! unconstrained. The executor introduces no rounding of its own -- each
//! step's driving amount is exactly the amount the previous venue
//! returned.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::asset::AssetId;
use crate::backend::{SwapKind, VaultBackend};
use crate::config::UNBOUNDED_LIMIT;
use crate::error::Result;
use crate::step::{resolve_step, PathStep, StepContext};
use crate::vault::Vault;

// ---------------------------------------------------------------------------
// Path Declarations
// ---------------------------------------------------------------------------

/// A path whose input amount is fixed and whose output is bounded below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPathExactIn {
    /// The asset the caller pays in.
    pub asset_in: AssetId,
    /// The ordered step chain.
    pub steps: Vec<PathStep>,
    /// Exactly how much of `asset_in` this path consumes.
    pub exact_amount_in: u64,
    /// Floor on the final step's output.
    pub min_amount_out: u64,
}

/// A path whose output amount is fixed and whose input is bounded above.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapPathExactOut {
    /// The asset the caller pays in.
    pub asset_in: AssetId,
    /// The ordered step chain.
    pub steps: Vec<PathStep>,
    /// Ceiling on the first step's input.
    pub max_amount_in: u64,
    /// Exactly how much of the final asset this path must produce.
    pub exact_amount_out: u64,
}

// ---------------------------------------------------------------------------
// BatchState
// ---------------------------------------------------------------------------

/// Per-batch aggregates: what settlement must still pull from and push to
/// the caller, plus the amounts that already moved (or were issued
/// directly to the caller) and must only be reported, never moved again.
///
/// Asset lists keep first-touch order so results are deterministic.
#[derive(Debug, Default)]
pub struct BatchState {
    assets_in: Vec<AssetId>,
    amounts_in: HashMap<AssetId, u64>,
    settled_in: HashMap<AssetId, u64>,
    assets_out: Vec<AssetId>,
    amounts_out: HashMap<AssetId, u64>,
    settled_out: HashMap<AssetId, u64>,
}

/// Borrowed view of a batch's aggregates, for inspection in tests.
#[derive(Debug)]
pub struct BatchSnapshot<'a> {
    /// Amounts still to pull, keyed by asset.
    pub amounts_in: &'a HashMap<AssetId, u64>,
    /// Amounts still to push, keyed by asset.
    pub amounts_out: &'a HashMap<AssetId, u64>,
    /// Input-side amounts that settled instantly against the ledger.
    pub settled_in: &'a HashMap<AssetId, u64>,
    /// Output-side amounts that settled instantly against the ledger.
    pub settled_out: &'a HashMap<AssetId, u64>,
}

impl BatchState {
    /// Adds `amount` to what settlement pulls from the caller.
    pub(crate) fn register_input(&mut self, asset: AssetId, amount: u64) {
        if !self.listed_in(asset) {
            self.assets_in.push(asset);
        }
        *self.amounts_in.entry(asset).or_insert(0) += amount;
    }

    /// Adds `amount` to what settlement pushes to the caller.
    pub(crate) fn register_output(&mut self, asset: AssetId, amount: u64) {
        if !self.listed_out(asset) {
            self.assets_out.push(asset);
        }
        *self.amounts_out.entry(asset).or_insert(0) += amount;
    }

    /// Records an input-side amount that already moved; settlement will
    /// report it but not pull it.
    pub(crate) fn note_settled_input(&mut self, asset: AssetId, amount: u64) {
        if !self.listed_in(asset) {
            self.assets_in.push(asset);
        }
        *self.settled_in.entry(asset).or_insert(0) += amount;
    }

    /// Records an output-side amount that already reached the caller;
    /// settlement will report it but not push it.
    pub(crate) fn note_settled_output(&mut self, asset: AssetId, amount: u64) {
        if !self.listed_out(asset) {
            self.assets_out.push(asset);
        }
        *self.settled_out.entry(asset).or_insert(0) += amount;
    }

    // The settled maps are kept strictly per side so that one asset
    // settling instantly on both sides of a batch (shares redeemed in
    // one path, issued to the caller in another) reports each side its
    // own amount.

    fn listed_in(&self, asset: AssetId) -> bool {
        self.amounts_in.contains_key(&asset) || self.settled_in.contains_key(&asset)
    }

    fn listed_out(&self, asset: AssetId) -> bool {
        self.amounts_out.contains_key(&asset) || self.settled_out.contains_key(&asset)
    }

    /// Drains every registration, leaving the batch empty. A second
    /// drain (or a drain of an untouched batch) yields nothing, which is
    /// what makes settlement idempotent.
    #[allow(clippy::type_complexity)]
    pub(crate) fn drain(
        &mut self,
    ) -> (
        Vec<AssetId>,
        HashMap<AssetId, u64>,
        HashMap<AssetId, u64>,
        Vec<AssetId>,
        HashMap<AssetId, u64>,
        HashMap<AssetId, u64>,
    ) {
        (
            std::mem::take(&mut self.assets_in),
            std::mem::take(&mut self.amounts_in),
            std::mem::take(&mut self.settled_in),
            std::mem::take(&mut self.assets_out),
            std::mem::take(&mut self.amounts_out),
            std::mem::take(&mut self.settled_out),
        )
    }

    /// Read-only view of the current aggregates.
    pub fn snapshot(&self) -> BatchSnapshot<'_> {
        BatchSnapshot {
            amounts_in: &self.amounts_in,
            amounts_out: &self.amounts_out,
            settled_in: &self.settled_in,
            settled_out: &self.settled_out,
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Executes every given-input path of a batch, returning each path's
/// final output amount in submission order.
pub(crate) fn execute_exact_in_paths<B: VaultBackend>(
    vault: &mut Vault<B>,
    paths: &[SwapPathExactIn],
    batch: &mut BatchState,
    payload: &[u8],
) -> Result<Vec<u64>> {
    let mut path_amounts_out = Vec::with_capacity(paths.len());

    for path in paths {
        // A first-step share redemption settles its own input instantly;
        // everything else is pulled at settlement time.
        if !path.steps[0].redeems_shares_from(path.asset_in) {
            batch.register_input(path.asset_in, path.exact_amount_in);
        }

        let amount_out = run_path(
            vault,
            batch,
            SwapKind::ExactIn,
            path.asset_in,
            &path.steps,
            path.exact_amount_in,
            path.min_amount_out,
            payload,
        )?;

        let last = &path.steps[path.steps.len() - 1];
        if !last.issues_shares() {
            batch.register_output(last.asset_out, amount_out);
        }
        path_amounts_out.push(amount_out);
    }

    Ok(path_amounts_out)
}

/// Executes every given-output path of a batch, returning each path's
/// computed input amount in submission order.
pub(crate) fn execute_exact_out_paths<B: VaultBackend>(
    vault: &mut Vault<B>,
    paths: &[SwapPathExactOut],
    batch: &mut BatchState,
    payload: &[u8],
) -> Result<Vec<u64>> {
    let mut path_amounts_in = Vec::with_capacity(paths.len());

    for path in paths {
        // The declared output is known before any step runs; shares
        // issued directly to the caller are marked settled by the step
        // resolver instead.
        let last = &path.steps[path.steps.len() - 1];
        if !last.issues_shares() {
            batch.register_output(last.asset_out, path.exact_amount_out);
        }

        let amount_in = run_path(
            vault,
            batch,
            SwapKind::ExactOut,
            path.asset_in,
            &path.steps,
            path.exact_amount_out,
            path.max_amount_in,
            payload,
        )?;

        if !path.steps[0].redeems_shares_from(path.asset_in) {
            batch.register_input(path.asset_in, amount_in);
        }
        path_amounts_in.push(amount_in);
    }

    Ok(path_amounts_in)
}

/// One loop, two directions. `seed` is the path's fixed amount (input for
/// exact-in, output for exact-out); `bound` is its declared floor or
/// ceiling. Returns the amount computed at the far end of the chain.
#[allow(clippy::too_many_arguments)]
fn run_path<B: VaultBackend>(
    vault: &mut Vault<B>,
    batch: &mut BatchState,
    kind: SwapKind,
    path_asset_in: AssetId,
    steps: &[PathStep],
    seed: u64,
    bound: u64,
    payload: &[u8],
) -> Result<u64> {
    let n = steps.len();
    let mut amount = seed;

    for j in 0..n {
        let idx = match kind {
            SwapKind::ExactIn => j,
            SwapKind::ExactOut => n - 1 - j,
        };
        let step = &steps[idx];
        let step_asset_in = if idx == 0 {
            path_asset_in
        } else {
            steps[idx - 1].asset_out
        };

        // The declared bound binds the step holding the non-fixed end of
        // the path: the last step for exact-in, the first for exact-out.
        let (bounded, unconstrained) = match kind {
            SwapKind::ExactIn => (idx == n - 1, 0),
            SwapKind::ExactOut => (idx == 0, UNBOUNDED_LIMIT),
        };
        let ctx = StepContext {
            kind,
            is_first: idx == 0,
            is_last: idx == n - 1,
            limit: if bounded { bound } else { unconstrained },
        };

        let outcome = resolve_step(vault, batch, step, step_asset_in, amount, ctx, payload)?;
        amount = outcome.amount_calculated;
    }

    Ok(amount)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::error::VaultError;
    use crate::testing::FixedRateBackend;

    fn asset(tag: &str) -> AssetId {
        AssetId::derive(tag, "tide:test")
    }

    fn hop(venue: AssetId, asset_out: AssetId) -> PathStep {
        PathStep {
            venue,
            asset_out,
            is_buffer: false,
        }
    }

    /// Two pools: P prices A=4, B=2 (A->B doubles); Q prices B=3, C=1
    /// (B->C triples).
    fn two_pool_backend() -> (FixedRateBackend, [AssetId; 3], [AssetId; 2]) {
        let a = asset("A");
        let b = asset("B");
        let c = asset("C");
        let p = asset("POOL_P");
        let q = asset("POOL_Q");
        let mut backend = FixedRateBackend::new();
        backend.add_pool(p, &[(a, 4), (b, 2)], 1);
        backend.add_pool(q, &[(b, 3), (c, 1)], 1);
        (backend, [a, b, c], [p, q])
    }

    #[test]
    fn exact_in_threads_amounts_without_rounding() {
        let (backend, [a, b, c], [p, q]) = two_pool_backend();
        let mut vault = Vault::new(backend);
        let mut batch = BatchState::default();

        let path = SwapPathExactIn {
            asset_in: a,
            steps: vec![hop(p, b), hop(q, c)],
            exact_amount_in: 100,
            min_amount_out: 0,
        };

        let amounts = vault
            .quote(|v| execute_exact_in_paths(v, &[path], &mut batch, &[]))
            .unwrap();

        // 100 A -> 200 B -> 600 C, exactly the venues' arithmetic.
        assert_eq!(amounts, vec![600]);
        let snap = batch.snapshot();
        assert_eq!(snap.amounts_in.get(&a), Some(&100));
        assert_eq!(snap.amounts_out.get(&c), Some(&600));
        // The intermediate asset never reaches the aggregates.
        assert_eq!(snap.amounts_in.get(&b), None);
        assert_eq!(snap.amounts_out.get(&b), None);
    }

    #[test]
    fn exact_out_walks_steps_backward() {
        let (backend, [a, _, c], [p, q]) = two_pool_backend();
        let mut vault = Vault::new(backend);
        let mut batch = BatchState::default();

        let path = SwapPathExactOut {
            asset_in: a,
            steps: vec![hop(p, asset("B")), hop(q, c)],
            max_amount_in: 1_000,
            exact_amount_out: 600,
        };

        let amounts = vault
            .quote(|v| execute_exact_out_paths(v, &[path], &mut batch, &[]))
            .unwrap();

        // The mirror of the exact-in run: 600 C needs 200 B needs 100 A.
        assert_eq!(amounts, vec![100]);
        let snap = batch.snapshot();
        assert_eq!(snap.amounts_in.get(&a), Some(&100));
        assert_eq!(snap.amounts_out.get(&c), Some(&600));
    }

    #[test]
    fn direction_symmetry_on_clean_rates() {
        let (backend, [a, b, c], [p, q]) = two_pool_backend();
        let mut vault = Vault::new(backend);

        let forward = vault
            .quote(|v| {
                let mut batch = BatchState::default();
                execute_exact_in_paths(
                    v,
                    &[SwapPathExactIn {
                        asset_in: a,
                        steps: vec![hop(p, b), hop(q, c)],
                        exact_amount_in: 84,
                        min_amount_out: 0,
                    }],
                    &mut batch,
                    &[],
                )
            })
            .unwrap()[0];

        let backward = vault
            .quote(|v| {
                let mut batch = BatchState::default();
                execute_exact_out_paths(
                    v,
                    &[SwapPathExactOut {
                        asset_in: a,
                        steps: vec![hop(p, b), hop(q, c)],
                        max_amount_in: u64::MAX,
                        exact_amount_out: forward,
                    }],
                    &mut batch,
                    &[],
                )
            })
            .unwrap()[0];

        assert_eq!(backward, 84);
    }

    #[test]
    fn paths_sharing_an_input_aggregate() {
        let (backend, [a, b, c], [p, q]) = two_pool_backend();
        let mut vault = Vault::new(backend);
        let mut batch = BatchState::default();

        let path_ab = SwapPathExactIn {
            asset_in: a,
            steps: vec![hop(p, b)],
            exact_amount_in: 100,
            min_amount_out: 0,
        };
        let path_ac = SwapPathExactIn {
            asset_in: a,
            steps: vec![hop(p, b), hop(q, c)],
            exact_amount_in: 100,
            min_amount_out: 0,
        };

        vault
            .quote(|v| execute_exact_in_paths(v, &[path_ab, path_ac], &mut batch, &[]))
            .unwrap();

        // One aggregate entry for A, covering both paths.
        let snap = batch.snapshot();
        assert_eq!(snap.amounts_in.get(&a), Some(&200));
        assert_eq!(snap.amounts_in.len(), 1);
    }

    #[test]
    fn floor_binds_only_the_last_step() {
        let (backend, [a, b, c], [p, q]) = two_pool_backend();
        let mut vault = Vault::new(backend);

        // Exactly at the floor: succeeds.
        let ok = vault.quote(|v| {
            let mut batch = BatchState::default();
            execute_exact_in_paths(
                v,
                &[SwapPathExactIn {
                    asset_in: a,
                    steps: vec![hop(p, b), hop(q, c)],
                    exact_amount_in: 100,
                    min_amount_out: 600,
                }],
                &mut batch,
                &[],
            )
        });
        assert_eq!(ok.unwrap(), vec![600]);

        // One unit above the achievable output: the venue rejects.
        let too_high = vault.quote(|v| {
            let mut batch = BatchState::default();
            execute_exact_in_paths(
                v,
                &[SwapPathExactIn {
                    asset_in: a,
                    steps: vec![hop(p, b), hop(q, c)],
                    exact_amount_in: 100,
                    min_amount_out: 601,
                }],
                &mut batch,
                &[],
            )
        });
        assert!(matches!(
            too_high,
            Err(VaultError::Backend(BackendError::SwapLimit {
                amount: 600,
                limit: 601
            }))
        ));
    }

    #[test]
    fn ceiling_binds_only_the_first_step() {
        let (backend, [a, b, c], [p, q]) = two_pool_backend();
        let mut vault = Vault::new(backend);

        let at_ceiling = vault.quote(|v| {
            let mut batch = BatchState::default();
            execute_exact_out_paths(
                v,
                &[SwapPathExactOut {
                    asset_in: a,
                    steps: vec![hop(p, b), hop(q, c)],
                    max_amount_in: 100,
                    exact_amount_out: 600,
                }],
                &mut batch,
                &[],
            )
        });
        assert_eq!(at_ceiling.unwrap(), vec![100]);

        let below_ceiling = vault.quote(|v| {
            let mut batch = BatchState::default();
            execute_exact_out_paths(
                v,
                &[SwapPathExactOut {
                    asset_in: a,
                    steps: vec![hop(p, b), hop(q, c)],
                    max_amount_in: 99,
                    exact_amount_out: 600,
                }],
                &mut batch,
                &[],
            )
        });
        assert!(matches!(
            below_ceiling,
            Err(VaultError::Backend(BackendError::SwapLimit {
                amount: 100,
                limit: 99
            }))
        ));
    }

    #[test]
    fn mid_path_share_redemption_stays_internal() {
        // A -> (issue shares of POOL_S) -> S -> (redeem) -> B, with the
        // share hop entirely inside the session.
        let a = asset("A");
        let b = asset("B");
        let s = asset("POOL_S");
        let mut backend = FixedRateBackend::new();
        backend.add_pool(s, &[(a, 1), (b, 1)], 1);
        let mut vault = Vault::new(backend);
        let mut batch = BatchState::default();

        let path = SwapPathExactIn {
            asset_in: a,
            steps: vec![hop(s, s), hop(s, b)],
            exact_amount_in: 400,
            min_amount_out: 0,
        };

        let amounts = vault
            .quote(|v| {
                let out = execute_exact_in_paths(v, &[path], &mut batch, &[])?;
                // Share loan netted inside the session.
                assert_eq!(v.net_delta(s), 0);
                Ok(out)
            })
            .unwrap();

        assert_eq!(amounts, vec![400]);
        let snap = batch.snapshot();
        // No external movement of the share asset in either direction.
        assert_eq!(snap.amounts_in.get(&s), None);
        assert_eq!(snap.amounts_out.get(&s), None);
        assert_eq!(snap.settled_in.get(&s), None);
        assert_eq!(snap.settled_out.get(&s), None);
    }

    #[test]
    fn drain_is_idempotent() {
        let mut batch = BatchState::default();
        batch.register_input(asset("A"), 10);
        batch.register_output(asset("B"), 20);

        let (assets_in, ..) = batch.drain();
        assert_eq!(assets_in.len(), 1);

        let (assets_in, amounts_in, settled_in, assets_out, amounts_out, settled_out) =
            batch.drain();
        assert!(assets_in.is_empty());
        assert!(amounts_in.is_empty());
        assert!(settled_in.is_empty());
        assert!(assets_out.is_empty());
        assert!(amounts_out.is_empty());
        assert!(settled_out.is_empty());
    }

    #[test]
    fn path_declarations_serialize() {
        let (_, [a, b, _], [p, _]) = two_pool_backend();
        let path = SwapPathExactIn {
            asset_in: a,
            steps: vec![hop(p, b)],
            exact_amount_in: 5,
            min_amount_out: 1,
        };
        let json = serde_json::to_string(&path).expect("serialize");
        let recovered: SwapPathExactIn = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(path, recovered);
    }
}
