//! # Protocol Configuration & Constants
//!
//! The settlement core's tunables in one place: batch limits, sentinel
//! amounts, well-known identities. Each constant documents why its value
//! is what it is, because a bare number in a settlement system is a bug
//! report waiting to happen.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The settlement core version string, assembled at release time so we
/// don't allocate for something this trivial at runtime.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Path & Batch Limits
// ---------------------------------------------------------------------------

/// Maximum number of steps a single path may contain. Enforced at router
/// entry. Nobody routes through sixteen venues on purpose -- beyond this
/// the request is malformed or adversarial, and the work per call must
/// stay bounded either way.
pub const MAX_STEPS_PER_PATH: usize = 16;

/// Maximum number of paths per batch. Same reasoning as
/// [`MAX_STEPS_PER_PATH`]: keeps one top-level call's work bounded.
pub const MAX_PATHS_PER_BATCH: usize = 64;

// ---------------------------------------------------------------------------
// Well-known Identities
// ---------------------------------------------------------------------------

/// Issuer string used for protocol-level assets. Not backed by any real
/// keypair; assets under this issuer exist by protocol definition.
pub const SYSTEM_ISSUER: &str = "tide:0000000000000000000000000000000000000000";

/// Symbol of the chain-native asset, used to derive its id (see
/// [`crate::asset::native_asset_id`]).
pub const NATIVE_ASSET_SYMBOL: &str = "NATIVE";

// ---------------------------------------------------------------------------
// Amount Sentinels
// ---------------------------------------------------------------------------

/// Upper bound used for a step with no caller-declared input ceiling.
/// Intermediate steps of a given-output path are unconstrained; the
/// ceiling applies only to the path's first step.
pub const UNBOUNDED_LIMIT: u64 = u64::MAX;

/// Sentinel written into a single-token bounds array to mark the target
/// token's slot when the step carries no real bound. Liquidity operations
/// identify the single target token by the one nonzero slot, so "no
/// bound" still needs a nonzero marker. One smallest unit is below any
/// meaningful trade size.
pub const TOKEN_SLOT_SENTINEL: u64 = 1;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
