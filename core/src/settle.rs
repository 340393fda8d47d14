//! # Settlement
//!
//! One pass at the end of a batch: pull every aggregated input from the
//! caller, push every aggregated output to the caller, then sweep any
//! native-unit remainder. Each distinct asset moves at most once per
//! side. Amounts the step resolvers already moved (share boundaries)
//! appear in the report but are never moved again.
//!
//! Settlement drains the batch aggregates as it walks them, so running
//! it twice against the same batch moves nothing the second time.

use tracing::{debug, info};

use crate::asset::AssetId;
use crate::backend::VaultBackend;
use crate::error::Result;
use crate::path::BatchState;
use crate::vault::Vault;

/// What a settled batch moved and reported, per side, in first-touch
/// asset order. Reported amounts include instantly-settled share
/// boundary amounts; moved amounts do not.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SettlementReport {
    /// Input assets in the order the batch first touched them.
    pub assets_in: Vec<AssetId>,
    /// Total input per asset, aligned with `assets_in`.
    pub amounts_in: Vec<u64>,
    /// Output assets in the order the batch first touched them.
    pub assets_out: Vec<AssetId>,
    /// Total output per asset, aligned with `assets_out`.
    pub amounts_out: Vec<u64>,
}

/// Settles `batch` against the caller: pulls aggregated inputs, pushes
/// aggregated outputs, sweeps native remainder. In quote mode the vault
/// suppresses the actual transfers but the ledger and the report see
/// identical numbers.
pub(crate) fn settle_batch<B: VaultBackend>(
    vault: &mut Vault<B>,
    batch: &mut BatchState,
    as_native: bool,
) -> Result<SettlementReport> {
    let (assets_in, amounts_in, settled_in, assets_out, amounts_out, settled_out) = batch.drain();

    let mut report = SettlementReport {
        assets_in: Vec::with_capacity(assets_in.len()),
        amounts_in: Vec::with_capacity(assets_in.len()),
        assets_out: Vec::with_capacity(assets_out.len()),
        amounts_out: Vec::with_capacity(assets_out.len()),
    };

    for asset in assets_in {
        let to_pull = amounts_in.get(&asset).copied().unwrap_or(0);
        let already = settled_in.get(&asset).copied().unwrap_or(0);
        if to_pull > 0 {
            vault.pull_from_caller(asset, to_pull, as_native)?;
        }
        debug!(asset = %asset, pulled = to_pull, settled = already, "input settled");
        report.assets_in.push(asset);
        report.amounts_in.push(to_pull + already);
    }

    for asset in assets_out {
        let to_push = amounts_out.get(&asset).copied().unwrap_or(0);
        let already = settled_out.get(&asset).copied().unwrap_or(0);
        if to_push > 0 {
            vault.push_to_caller(asset, to_push, as_native)?;
        }
        debug!(asset = %asset, pushed = to_push, settled = already, "output settled");
        report.assets_out.push(asset);
        report.amounts_out.push(to_push + already);
    }

    // Leftover native units (callers overpaying in the native asset)
    // always go back, even when both sides above were empty.
    vault.sweep_native()?;

    info!(
        inputs = report.assets_in.len(),
        outputs = report.assets_out.len(),
        "batch settled"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
