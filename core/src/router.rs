//! # Batch Router
//!
//! The caller-facing surface: four entry points over a [`Vault`]. The
//! two `swap_*` calls open a committing session, execute every path,
//! settle, and return per-path and per-asset totals; the two `query_*`
//! calls run the identical arithmetic against a scratch copy of the
//! backend in quote mode, so nothing moves and the live vault is
//! untouched.
//!
//! Validation happens before any session opens: the deadline is checked
//! exactly once against the wall clock, and path shapes are checked
//! against the batch limits in [`config`](crate::config). A failure
//! anywhere leaves no trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::asset::AssetId;
use crate::backend::VaultBackend;
use crate::config::{MAX_PATHS_PER_BATCH, MAX_STEPS_PER_PATH};
use crate::error::{Result, VaultError};
use crate::path::{
    execute_exact_in_paths, execute_exact_out_paths, BatchState, SwapPathExactIn, SwapPathExactOut,
};
use crate::settle::settle_batch;
use crate::step::PathStep;
use crate::vault::Vault;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a given-input batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactInResult {
    /// Final output amount of each path, in submission order.
    pub path_amounts_out: Vec<u64>,
    /// Distinct output assets in first-touch order.
    pub assets_out: Vec<AssetId>,
    /// Total output per asset, aligned with `assets_out`.
    pub amounts_out: Vec<u64>,
}

/// Outcome of a given-output batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapExactOutResult {
    /// Computed input amount of each path, in submission order.
    pub path_amounts_in: Vec<u64>,
    /// Distinct input assets in first-touch order.
    pub assets_in: Vec<AssetId>,
    /// Total input per asset, aligned with `assets_in`.
    pub amounts_in: Vec<u64>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Owns the vault and exposes the batch swap entry points.
#[derive(Debug)]
pub struct Router<B: VaultBackend> {
    vault: Vault<B>,
}

impl<B: VaultBackend> Router<B> {
    /// Builds a router over a fresh vault for `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            vault: Vault::new(backend),
        }
    }

    /// Read access to the underlying vault.
    pub fn vault(&self) -> &Vault<B> {
        &self.vault
    }

    /// Mutable access to the underlying vault, for venue registration
    /// and funding between calls.
    pub fn vault_mut(&mut self) -> &mut Vault<B> {
        &mut self.vault
    }

    /// Consumes the router, returning the vault.
    pub fn into_vault(self) -> Vault<B> {
        self.vault
    }

    /// Executes a batch of given-input paths and settles it.
    ///
    /// Each path consumes exactly its `exact_amount_in` and must produce
    /// at least its `min_amount_out`. `as_native` pulls native-asset
    /// inputs and pushes native-asset outputs in native units.
    ///
    /// # Errors
    ///
    /// Validation errors before any session opens; otherwise any step,
    /// session, or settlement failure, in which case nothing moved.
    pub fn swap_exact_in(
        &mut self,
        paths: &[SwapPathExactIn],
        deadline: DateTime<Utc>,
        as_native: bool,
        payload: &[u8],
    ) -> Result<SwapExactInResult> {
        check_deadline(deadline)?;
        validate_paths(paths.iter().map(|p| p.steps.as_slice()))?;
        info!(paths = paths.len(), "swap exact in");

        self.vault.unlock(|vault| {
            let mut batch = BatchState::default();
            let path_amounts_out = execute_exact_in_paths(vault, paths, &mut batch, payload)?;
            let report = settle_batch(vault, &mut batch, as_native)?;
            Ok(SwapExactInResult {
                path_amounts_out,
                assets_out: report.assets_out,
                amounts_out: report.amounts_out,
            })
        })
    }

    /// Executes a batch of given-output paths and settles it.
    ///
    /// Each path produces exactly its `exact_amount_out` and may consume
    /// at most its `max_amount_in`.
    pub fn swap_exact_out(
        &mut self,
        paths: &[SwapPathExactOut],
        deadline: DateTime<Utc>,
        as_native: bool,
        payload: &[u8],
    ) -> Result<SwapExactOutResult> {
        check_deadline(deadline)?;
        validate_paths(paths.iter().map(|p| p.steps.as_slice()))?;
        info!(paths = paths.len(), "swap exact out");

        self.vault.unlock(|vault| {
            let mut batch = BatchState::default();
            let path_amounts_in = execute_exact_out_paths(vault, paths, &mut batch, payload)?;
            let report = settle_batch(vault, &mut batch, as_native)?;
            Ok(SwapExactOutResult {
                path_amounts_in,
                assets_in: report.assets_in,
                amounts_in: report.amounts_in,
            })
        })
    }
}

impl<B: VaultBackend + Clone> Router<B> {
    /// Previews [`swap_exact_in`](Self::swap_exact_in) without moving
    /// anything: the batch runs in quote mode against a scratch copy of
    /// the backend, which is discarded afterwards. No deadline applies.
    pub fn query_swap_exact_in(
        &self,
        paths: &[SwapPathExactIn],
        payload: &[u8],
    ) -> Result<SwapExactInResult> {
        validate_paths(paths.iter().map(|p| p.steps.as_slice()))?;

        let mut scratch = Vault::new(self.vault.backend().clone());
        scratch.quote(|vault| {
            let mut batch = BatchState::default();
            let path_amounts_out = execute_exact_in_paths(vault, paths, &mut batch, payload)?;
            let report = settle_batch(vault, &mut batch, false)?;
            Ok(SwapExactInResult {
                path_amounts_out,
                assets_out: report.assets_out,
                amounts_out: report.amounts_out,
            })
        })
    }

    /// Previews [`swap_exact_out`](Self::swap_exact_out); same scratch
    /// semantics as [`query_swap_exact_in`](Self::query_swap_exact_in).
    pub fn query_swap_exact_out(
        &self,
        paths: &[SwapPathExactOut],
        payload: &[u8],
    ) -> Result<SwapExactOutResult> {
        validate_paths(paths.iter().map(|p| p.steps.as_slice()))?;

        let mut scratch = Vault::new(self.vault.backend().clone());
        scratch.quote(|vault| {
            let mut batch = BatchState::default();
            let path_amounts_in = execute_exact_out_paths(vault, paths, &mut batch, payload)?;
            let report = settle_batch(vault, &mut batch, false)?;
            Ok(SwapExactOutResult {
                path_amounts_in,
                assets_in: report.assets_in,
                amounts_in: report.amounts_in,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn check_deadline(deadline: DateTime<Utc>) -> Result<()> {
    if Utc::now() > deadline {
        return Err(VaultError::DeadlineExpired { deadline });
    }
    Ok(())
}

fn validate_paths<'a>(paths: impl ExactSizeIterator<Item = &'a [PathStep]>) -> Result<()> {
    if paths.len() > MAX_PATHS_PER_BATCH {
        return Err(VaultError::BatchTooLarge {
            paths: paths.len(),
            max: MAX_PATHS_PER_BATCH,
        });
    }
    for (index, steps) in paths.enumerate() {
        if steps.is_empty() {
            return Err(VaultError::EmptyPath { path: index });
        }
        if steps.len() > MAX_STEPS_PER_PATH {
            return Err(VaultError::PathTooLong {
                path: index,
                steps: steps.len(),
                max: MAX_STEPS_PER_PATH,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
