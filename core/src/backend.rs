//! # External Collaborators
//!
//! The settlement core never prices anything and never moves real funds
//! itself. Pool math, wrapper rates, and the actual token transfers live
//! behind [`VaultBackend`], a fixed trait seam. The core's job is to call
//! these operations in the right order, with the right bounds, and to
//! account for every unit that moves in the [`Ledger`](crate::ledger::Ledger).
//!
//! Conventions carried by the trait:
//!
//! - Every operation that computes an amount returns the full
//!   `(amount_calculated, amount_in, amount_out)` triple so the caller
//!   never re-derives a number the venue already produced.
//! - Single-token liquidity operations identify the target token by the
//!   one nonzero slot of the bounds array (see
//!   [`TOKEN_SLOT_SENTINEL`](crate::config::TOKEN_SLOT_SENTINEL)).
//! - A bound violation is the venue's failure
//!   ([`BackendError::SwapLimit`]), propagated verbatim; the core adds no
//!   tolerance of its own.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Which leg of a conversion is fixed by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwapKind {
    /// The input amount is given; the venue computes the output.
    ExactIn,
    /// The output amount is given; the venue computes the input.
    ExactOut,
}

/// Direction of a yield-wrapper conversion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapDirection {
    /// Deposit the underlying asset, receive the wrapped token.
    Wrap,
    /// Redeem the wrapped token, receive the underlying asset.
    Unwrap,
}

/// Who receives newly issued shares, or whose shares are burned.
///
/// Intermediate steps of a path keep share movements inside the custodian
/// so they can net against the ledger; only path endpoints touch the
/// caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Party {
    /// The original initiator of the top-level call.
    Caller,
    /// The vault itself, holding transiently for the session.
    Custodian,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of an [`exchange`](VaultBackend::exchange) or
/// [`wrap_or_unwrap`](VaultBackend::wrap_or_unwrap) operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOutcome {
    /// The amount the venue computed: output for [`SwapKind::ExactIn`],
    /// input for [`SwapKind::ExactOut`].
    pub amount_calculated: u64,
    /// The input-side amount, regardless of kind.
    pub amount_in: u64,
    /// The output-side amount, regardless of kind.
    pub amount_out: u64,
}

/// Result of an [`add_liquidity`](VaultBackend::add_liquidity) operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLiquidityOutcome {
    /// Actual per-token amounts deposited, aligned with
    /// [`pool_assets`](VaultBackend::pool_assets) order.
    pub amounts_in: Vec<u64>,
    /// Pool shares issued.
    pub shares_out: u64,
    /// Venue-specific opaque return payload.
    pub return_data: Vec<u8>,
}

/// Result of a [`remove_liquidity`](VaultBackend::remove_liquidity)
/// operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLiquidityOutcome {
    /// Pool shares burned.
    pub shares_in: u64,
    /// Actual per-token amounts withdrawn, aligned with
    /// [`pool_assets`](VaultBackend::pool_assets) order.
    pub amounts_out: Vec<u64>,
    /// Venue-specific opaque return payload.
    pub return_data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures surfaced by external venues and transfer primitives.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The computed amount violated the caller's declared bound.
    #[error("swap limit violated: amount {amount}, limit {limit}")]
    SwapLimit {
        /// The amount the venue computed.
        amount: u64,
        /// The bound it violated (floor for exact-in, ceiling for
        /// exact-out).
        limit: u64,
    },

    /// A transfer primitive found less pre-paid balance than required.
    #[error("insufficient funds: required {required}, available {available} (asset {asset})")]
    InsufficientFunds {
        /// The asset being pulled.
        asset: AssetId,
        /// The net aggregate amount settlement tried to pull.
        required: u64,
        /// What the caller actually had available.
        available: u64,
    },

    /// No pool is registered under the given venue id.
    #[error("unknown pool {0}")]
    UnknownPool(AssetId),

    /// No yield wrapper is registered under the given venue id.
    #[error("unknown wrapper {0}")]
    UnknownWrapper(AssetId),
}

// ---------------------------------------------------------------------------
// VaultBackend
// ---------------------------------------------------------------------------

/// The fixed interface to everything outside the settlement core.
///
/// Implementations are expected to be deterministic within one session:
/// the read-only quote mode re-runs the exact same computations and must
/// produce byte-identical numbers to a committing run.
pub trait VaultBackend {
    /// Executes one conversion against a pool's opaque pricing function.
    ///
    /// Fails with [`BackendError::SwapLimit`] if the computed amount
    /// violates `limit` (a minimum output for [`SwapKind::ExactIn`], a
    /// maximum input for [`SwapKind::ExactOut`]).
    #[allow(clippy::too_many_arguments)]
    fn exchange(
        &mut self,
        pool: AssetId,
        asset_in: AssetId,
        asset_out: AssetId,
        kind: SwapKind,
        amount_given: u64,
        limit: u64,
        payload: &[u8],
    ) -> Result<ExchangeOutcome, BackendError>;

    /// Converts between a wrapper's underlying and wrapped token at the
    /// wrapper's current (deterministic but time-varying) rate. Bound
    /// semantics match [`exchange`](Self::exchange).
    fn wrap_or_unwrap(
        &mut self,
        wrapper: AssetId,
        kind: SwapKind,
        direction: WrapDirection,
        amount_given: u64,
        limit: u64,
    ) -> Result<ExchangeOutcome, BackendError>;

    /// Deposits assets into a pool, issuing shares to `recipient`.
    ///
    /// For [`SwapKind::ExactIn`], the nonzero slots of `max_amounts_in`
    /// are exact deposit amounts and `min_shares_out` is a floor. For
    /// [`SwapKind::ExactOut`], `min_shares_out` carries the exact share
    /// target and the single nonzero slot of `max_amounts_in` is the
    /// input ceiling.
    fn add_liquidity(
        &mut self,
        pool: AssetId,
        recipient: Party,
        max_amounts_in: &[u64],
        min_shares_out: u64,
        kind: SwapKind,
        payload: &[u8],
    ) -> Result<AddLiquidityOutcome, BackendError>;

    /// Burns shares held by `source`, withdrawing pool assets.
    ///
    /// For [`SwapKind::ExactIn`], `max_shares_in` is the exact share
    /// amount to burn and the single nonzero slot of `min_amounts_out`
    /// is the output floor. For [`SwapKind::ExactOut`], the nonzero slot
    /// of `min_amounts_out` is the exact output target and
    /// `max_shares_in` is the share ceiling.
    fn remove_liquidity(
        &mut self,
        pool: AssetId,
        source: Party,
        max_shares_in: u64,
        min_amounts_out: &[u64],
        kind: SwapKind,
        payload: &[u8],
    ) -> Result<RemoveLiquidityOutcome, BackendError>;

    /// Returns a pool's registered assets in canonical order. Used to
    /// locate the single target token's slot in liquidity operations.
    fn pool_assets(&self, pool: AssetId) -> Result<Vec<AssetId>, BackendError>;

    /// Pulls exactly `amount` of `asset` from the caller into the
    /// custodian. One-shot and atomic; fails the whole session on
    /// shortfall. `as_native` signals that the caller intends to pay in
    /// the chain-native asset and have it wrapped on the way in.
    fn pull_from_caller(
        &mut self,
        asset: AssetId,
        amount: u64,
        as_native: bool,
    ) -> Result<(), BackendError>;

    /// Pushes exactly `amount` of `asset` from the custodian to the
    /// caller. `as_native` signals unwrap-on-the-way-out intent.
    fn push_to_caller(
        &mut self,
        asset: AssetId,
        amount: u64,
        as_native: bool,
    ) -> Result<(), BackendError>;

    /// Returns any native-asset balance the custodian still holds
    /// transiently for this call back to the caller. Invoked
    /// unconditionally as the final settlement step.
    fn sweep_native(&mut self) -> Result<(), BackendError>;
}
