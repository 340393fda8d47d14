//! # Step Resolver
//!
//! A step names a venue, an output asset, and a buffer flag; the input
//! asset is whatever the previous step produced. Comparing the venue id
//! against the step's asset pair picks exactly one of four shapes:
//!
//! - neither asset equals the venue: a **plain exchange** against the
//!   pool's opaque pricing function;
//! - the input asset equals the venue: a **share redemption** (burn pool
//!   shares, receive one underlying asset);
//! - the output asset equals the venue: a **share issuance** (deposit one
//!   asset, receive pool shares);
//! - the buffer flag is set: a **wrapper conversion**, direction inferred
//!   from which side is the wrapper's own token.
//!
//! Both assets equaling the venue matches nothing and fails with
//! [`StepError::OperationNotSupported`].
//!
//! ## Share boundaries
//!
//! The settled-versus-in-flight accounting for share steps is deliberately
//! kept out of the path loop. [`resolve_share_redeem`] and
//! [`resolve_share_issue`] alone decide whether shares cross the caller
//! boundary (path endpoints: instant settlement, marked in the batch's
//! settled map) or stay inside the custodian (intermediate steps: a
//! same-session loan against the ledger that nets to zero once the
//! venue operation completes). Get this wrong and either an asset moves
//! twice or the session fails to reconcile, so it carries its own tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetId;
use crate::backend::{ExchangeOutcome, Party, SwapKind, VaultBackend, WrapDirection};
use crate::config::TOKEN_SLOT_SENTINEL;
use crate::error::Result;
use crate::path::BatchState;
use crate::vault::Vault;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures in step classification and resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    /// The venue/asset combination matched none of the supported shapes.
    #[error(
        "unsupported step: venue {venue} with input {asset_in} and output {asset_out}"
    )]
    OperationNotSupported {
        /// The step's venue id.
        venue: AssetId,
        /// The running input asset.
        asset_in: AssetId,
        /// The step's declared output asset.
        asset_out: AssetId,
    },

    /// A share step referenced an asset the pool does not hold.
    #[error("asset {asset} is not registered in pool {pool}")]
    AssetNotInPool {
        /// The pool in question.
        pool: AssetId,
        /// The asset that was not found.
        asset: AssetId,
    },
}

// ---------------------------------------------------------------------------
// PathStep
// ---------------------------------------------------------------------------

/// One hop of a path: a venue, the hop's output asset, and whether the
/// venue is a yield-wrapper buffer rather than a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Pool, wrapper, or share-operation marker. A pool's share token and
    /// a wrapper's wrapped token carry the venue's own id.
    pub venue: AssetId,
    /// The asset this hop produces.
    pub asset_out: AssetId,
    /// Marks a wrapper conversion instead of a pool operation.
    pub is_buffer: bool,
}

impl PathStep {
    /// `true` if this step deposits into its venue and takes shares out.
    pub fn issues_shares(&self) -> bool {
        !self.is_buffer && self.venue == self.asset_out
    }

    /// `true` if this step burns shares of its venue, given the running
    /// input asset.
    pub fn redeems_shares_from(&self, asset_in: AssetId) -> bool {
        !self.is_buffer && self.venue == asset_in
    }
}

/// The four supported step shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepShape {
    /// Plain conversion through a pool's pricing function.
    Exchange,
    /// Burn venue shares, receive one underlying asset.
    ShareRedeem,
    /// Deposit one asset, receive venue shares.
    ShareIssue,
    /// Wrapper conversion (wrap or unwrap).
    BufferWrap(WrapDirection),
}

/// Classifies a step against its running input asset.
pub fn classify(step: &PathStep, asset_in: AssetId) -> std::result::Result<StepShape, StepError> {
    let unsupported = || StepError::OperationNotSupported {
        venue: step.venue,
        asset_in,
        asset_out: step.asset_out,
    };

    if asset_in == step.venue && step.asset_out == step.venue {
        return Err(unsupported());
    }
    if step.is_buffer {
        return if step.asset_out == step.venue {
            Ok(StepShape::BufferWrap(WrapDirection::Wrap))
        } else if asset_in == step.venue {
            Ok(StepShape::BufferWrap(WrapDirection::Unwrap))
        } else {
            Err(unsupported())
        };
    }
    if asset_in == step.venue {
        Ok(StepShape::ShareRedeem)
    } else if step.asset_out == step.venue {
        Ok(StepShape::ShareIssue)
    } else {
        Ok(StepShape::Exchange)
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Position and bound of a step within its path.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepContext {
    /// Which leg of the path's amounts is fixed.
    pub kind: SwapKind,
    /// This step is the path's first in original order.
    pub is_first: bool,
    /// This step is the path's last in original order.
    pub is_last: bool,
    /// Output floor ([`SwapKind::ExactIn`]) or input ceiling
    /// ([`SwapKind::ExactOut`]) applying to this step.
    pub limit: u64,
}

/// Resolves one step: dispatches to the matching venue operation and
/// returns the normalized amount triple. `amount_given` is the input
/// amount for exact-in, the target output amount for exact-out; the
/// `amount_calculated` of the result drives the next step.
pub(crate) fn resolve_step<B: VaultBackend>(
    vault: &mut Vault<B>,
    batch: &mut BatchState,
    step: &PathStep,
    asset_in: AssetId,
    amount_given: u64,
    ctx: StepContext,
    payload: &[u8],
) -> Result<ExchangeOutcome> {
    match classify(step, asset_in)? {
        StepShape::Exchange => vault.exchange(
            step.venue,
            asset_in,
            step.asset_out,
            ctx.kind,
            amount_given,
            ctx.limit,
            payload,
        ),
        StepShape::BufferWrap(direction) => vault.wrap_or_unwrap(
            step.venue,
            ctx.kind,
            direction,
            asset_in,
            step.asset_out,
            amount_given,
            ctx.limit,
        ),
        StepShape::ShareRedeem => {
            resolve_share_redeem(vault, batch, step, amount_given, ctx, payload)
        }
        StepShape::ShareIssue => {
            resolve_share_issue(vault, batch, step, asset_in, amount_given, ctx, payload)
        }
    }
}

/// Burn shares of `step.venue`, receive `step.asset_out`.
///
/// As a path's first step the shares belong to the caller: they are moved
/// in and settled instantly, bypassing the batch aggregates (recorded in
/// the settled map for reporting). As an intermediate step the shares are
/// borrowed against the ledger's existing positive delta from the prior
/// step, with no external movement.
fn resolve_share_redeem<B: VaultBackend>(
    vault: &mut Vault<B>,
    batch: &mut BatchState,
    step: &PathStep,
    amount_given: u64,
    ctx: StepContext,
    payload: &[u8],
) -> Result<ExchangeOutcome> {
    let pool = step.venue;
    let assets = vault.pool_assets(pool)?;
    let idx = asset_index(&assets, pool, step.asset_out)?;
    let assets_len = assets.len();
    let source = if ctx.is_first {
        Party::Caller
    } else {
        Party::Custodian
    };

    match ctx.kind {
        SwapKind::ExactIn => {
            if ctx.is_first {
                vault.pull_from_caller(pool, amount_given, false)?;
                batch.note_settled_input(pool, amount_given);
            }
            let mut min_amounts_out = vec![0u64; assets_len];
            // The nonzero slot marks the target token; a zero floor still
            // needs the one-unit sentinel.
            min_amounts_out[idx] = ctx.limit.max(TOKEN_SLOT_SENTINEL);

            let outcome = vault.remove_liquidity(
                pool,
                source,
                amount_given,
                &min_amounts_out,
                SwapKind::ExactIn,
                payload,
            )?;
            let amount_out = outcome.amounts_out[idx];
            Ok(ExchangeOutcome {
                amount_calculated: amount_out,
                amount_in: outcome.shares_in,
                amount_out,
            })
        }
        SwapKind::ExactOut => {
            let mut min_amounts_out = vec![0u64; assets_len];
            min_amounts_out[idx] = amount_given;

            let outcome = vault.remove_liquidity(
                pool,
                source,
                ctx.limit,
                &min_amounts_out,
                SwapKind::ExactOut,
                payload,
            )?;
            if ctx.is_first {
                // The share amount was only just computed; move it in now
                // and settle instantly.
                vault.pull_from_caller(pool, outcome.shares_in, false)?;
                batch.note_settled_input(pool, outcome.shares_in);
            }
            Ok(ExchangeOutcome {
                amount_calculated: outcome.shares_in,
                amount_in: outcome.shares_in,
                amount_out: amount_given,
            })
        }
    }
}

/// Deposit `asset_in`, receive shares of `step.venue`.
///
/// As a path's last step the shares are issued directly to the caller and
/// marked settled (the batch must not push them a second time). As an
/// intermediate step they are issued to the custodian and only the ledger
/// records them, to be consumed by the next step.
fn resolve_share_issue<B: VaultBackend>(
    vault: &mut Vault<B>,
    batch: &mut BatchState,
    step: &PathStep,
    asset_in: AssetId,
    amount_given: u64,
    ctx: StepContext,
    payload: &[u8],
) -> Result<ExchangeOutcome> {
    let pool = step.venue;
    let assets = vault.pool_assets(pool)?;
    let idx = asset_index(&assets, pool, asset_in)?;
    let assets_len = assets.len();
    let recipient = if ctx.is_last {
        Party::Caller
    } else {
        Party::Custodian
    };

    match ctx.kind {
        SwapKind::ExactIn => {
            let mut max_amounts_in = vec![0u64; assets_len];
            max_amounts_in[idx] = amount_given;

            let outcome = vault.add_liquidity(
                pool,
                recipient,
                &max_amounts_in,
                ctx.limit,
                SwapKind::ExactIn,
                payload,
            )?;
            if recipient == Party::Caller {
                batch.note_settled_output(pool, outcome.shares_out);
            }
            Ok(ExchangeOutcome {
                amount_calculated: outcome.shares_out,
                amount_in: amount_given,
                amount_out: outcome.shares_out,
            })
        }
        SwapKind::ExactOut => {
            let mut max_amounts_in = vec![0u64; assets_len];
            max_amounts_in[idx] = ctx.limit;

            let outcome = vault.add_liquidity(
                pool,
                recipient,
                &max_amounts_in,
                amount_given,
                SwapKind::ExactOut,
                payload,
            )?;
            let amount_in = outcome.amounts_in[idx];
            if recipient == Party::Caller {
                batch.note_settled_output(pool, amount_given);
            }
            Ok(ExchangeOutcome {
                amount_calculated: amount_in,
                amount_in,
                amount_out: amount_given,
            })
        }
    }
}

fn asset_index(assets: &[AssetId], pool: AssetId, asset: AssetId) -> Result<usize> {
    assets
        .iter()
        .position(|a| *a == asset)
        .ok_or_else(|| StepError::AssetNotInPool { pool, asset }.into())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
