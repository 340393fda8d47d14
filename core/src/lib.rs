// Copyright (c) 2026 Tidepool Contributors. MIT License.
// See LICENSE for details.

//! # TIDEPOOL — Settlement Core
//!
//! The accounting heart of a multi-asset liquidity exchange: a custodian
//! vault that tracks, per top-level call, exactly what it owes and is
//! owed, and a batch router that chains conversions across pools and
//! yield wrappers while moving each real asset at most once per side.
//!
//! The trick that makes multi-hop swaps cheap is transient accounting:
//! intermediate assets never physically move. Every venue operation
//! records a signed obligation in a session ledger, and only the net
//! per-asset totals are settled against the caller at the end. A session
//! that cannot drive every delta to zero refuses to close, so there is
//! no code path that leaves value stranded in the custodian.
//!
//! ## Architecture
//!
//! - **asset** — Content-addressed 32-byte asset identifiers.
//! - **ledger** — The per-session signed obligation map.
//! - **backend** — The trait seam to pools, wrappers, and transfers.
//! - **vault** — Session lifecycle and ledger-mediated operations.
//! - **step** — Step shape classification and share-boundary handling.
//! - **path** — Multi-hop path execution and per-batch aggregation.
//! - **settle** — The one-pass end-of-batch settlement walk.
//! - **router** — The caller-facing swap and query entry points.
//! - **config** — Protocol constants and batch limits.
//! - **testing** — Deterministic fixtures shared by tests and benches.
//!
//! ## Design Philosophy
//!
//! 1. All-or-nothing: a batch settles completely or not at all.
//! 2. Quotes are not a second pricing engine; they are the same code
//!    with transfers switched off.
//! 3. Venues do the math, the core does the bookkeeping. Never both.
//! 4. If it touches balances, it has tests. Plural.

pub mod asset;
pub mod backend;
pub mod config;
pub mod error;
pub mod ledger;
pub mod path;
pub mod router;
pub mod settle;
pub mod step;
pub mod testing;
pub mod vault;

pub use asset::{native_asset_id, AssetId};
pub use backend::{
    AddLiquidityOutcome, BackendError, ExchangeOutcome, Party, RemoveLiquidityOutcome, SwapKind,
    VaultBackend, WrapDirection,
};
pub use error::{Result, VaultError};
pub use path::{SwapPathExactIn, SwapPathExactOut};
pub use router::{Router, SwapExactInResult, SwapExactOutResult};
pub use settle::SettlementReport;
pub use step::{PathStep, StepError};
pub use vault::{SessionError, SettlementMode, Vault};
