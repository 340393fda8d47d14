//! # Vault & Session Controller
//!
//! The [`Vault`] is the custodian: it owns the external backend and, for
//! the duration of exactly one top-level invocation, a [`Ledger`] of
//! signed obligations. A session is opened with [`unlock`](Vault::unlock),
//! which runs a caller-supplied callback against the explicitly-passed
//! vault context and refuses to return while any asset still has an
//! outstanding nonzero delta. That check-then-return is the core
//! correctness gate of the whole system.
//!
//! ## Session model
//!
//! The session context is an ordinary value owned by the call tree -- no
//! process-wide ambient state. Only one session can exist per vault
//! (nested [`unlock`](Vault::unlock) fails with
//! [`SessionError::AlreadyOpen`]), every ledger-touching operation
//! outside a session fails with [`SessionError::NotUnlocked`], and a
//! step's external operation can never re-enter path resolution because
//! the callback holds the one `&mut Vault` there is.
//!
//! ## Quote mode
//!
//! [`quote`](Vault::quote) runs the same callback through the same
//! numeric code path but in [`SettlementMode::Quote`]: the caller-facing
//! transfer primitives record their ledger entries without moving real
//! assets, and reconciliation is not required on return. Quotes are for
//! previewing calculated amounts; they are not a separate pricing path.
//!
//! The vault only accounts; the backend's own state is the backend's
//! problem. On failure the session (and its ledger) is discarded whole,
//! matching the all-or-nothing execution model.

use thiserror::Error;
use tracing::{debug, trace};

use crate::asset::AssetId;
use crate::backend::{
    AddLiquidityOutcome, ExchangeOutcome, Party, RemoveLiquidityOutcome, SwapKind, VaultBackend,
    WrapDirection,
};
use crate::error::Result;
use crate::ledger::Ledger;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Session lifecycle violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A session was already open when another open was attempted.
    #[error("a session is already open")]
    AlreadyOpen,

    /// A ledger-touching operation was attempted outside a session.
    #[error("vault is not unlocked")]
    NotUnlocked,

    /// The callback returned while some asset still had a nonzero delta.
    #[error("session balance not settled: {unsettled} asset(s) with outstanding deltas")]
    BalanceNotSettled {
        /// Number of assets left with a nonzero delta.
        unsettled: usize,
    },
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Whether caller-facing transfers actually move assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementMode {
    /// Real settlement: transfers execute, reconciliation is enforced.
    Commit,
    /// Read-only preview: identical arithmetic and ledger bookkeeping,
    /// no real asset movement, no reconciliation requirement.
    Quote,
}

/// Per-invocation session state. Created on open, destroyed on close.
#[derive(Debug)]
struct Session {
    ledger: Ledger,
    mode: SettlementMode,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

/// The central custodian: backend access plus per-session accounting.
#[derive(Debug)]
pub struct Vault<B: VaultBackend> {
    backend: B,
    session: Option<Session>,
}

impl<B: VaultBackend> Vault<B> {
    /// Creates a locked vault over the given backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            session: None,
        }
    }

    /// Returns a reference to the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns a mutable reference to the backend, for registering venues
    /// or funding between calls. Sessions are never open across this.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consumes the vault, returning the backend.
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Returns `true` while a session is open.
    pub fn is_unlocked(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the current net delta for `asset`, or zero when no
    /// session is open.
    pub fn net_delta(&self, asset: AssetId) -> i128 {
        self.session
            .as_ref()
            .map_or(0, |s| s.ledger.net_delta(asset))
    }

    /// Returns `true` iff the open session's ledger shows no outstanding
    /// deltas (vacuously true when no session is open).
    pub fn is_reconciled(&self) -> bool {
        self.session.as_ref().map_or(true, |s| s.ledger.is_reconciled())
    }

    // -----------------------------------------------------------------------
    // Session Lifecycle
    // -----------------------------------------------------------------------

    /// Opens a committing session, runs `callback`, and enforces
    /// reconciliation before returning its result.
    ///
    /// # Errors
    ///
    /// [`SessionError::AlreadyOpen`] if a session exists;
    /// [`SessionError::BalanceNotSettled`] if the callback returned with
    /// outstanding deltas; otherwise whatever the callback failed with.
    /// The session closes on every exit path.
    pub fn unlock<R>(&mut self, callback: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.open_session(SettlementMode::Commit)?;
        let outcome = callback(self);
        let unsettled = self
            .session
            .as_ref()
            .map_or(0, |s| s.ledger.nonzero_count());
        self.session = None;

        let value = outcome?;
        if unsettled > 0 {
            return Err(SessionError::BalanceNotSettled { unsettled }.into());
        }
        Ok(value)
    }

    /// Opens a quote session and runs `callback` through the same code
    /// path as [`unlock`](Self::unlock), minus real transfers and the
    /// reconciliation gate.
    pub fn quote<R>(&mut self, callback: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        self.open_session(SettlementMode::Quote)?;
        let outcome = callback(self);
        self.session = None;
        outcome
    }

    fn open_session(&mut self, mode: SettlementMode) -> Result<()> {
        if self.session.is_some() {
            return Err(SessionError::AlreadyOpen.into());
        }
        trace!(?mode, "opening session");
        self.session = Some(Session {
            ledger: Ledger::new(),
            mode,
        });
        Ok(())
    }

    fn session_mut(&mut self) -> std::result::Result<&mut Session, SessionError> {
        self.session.as_mut().ok_or(SessionError::NotUnlocked)
    }

    fn committing(&self) -> bool {
        matches!(
            self.session,
            Some(Session {
                mode: SettlementMode::Commit,
                ..
            })
        )
    }

    // -----------------------------------------------------------------------
    // Ledger-Touching Operations
    // -----------------------------------------------------------------------

    /// Executes one pool conversion and records both legs in the ledger:
    /// the custodian is owed the input, and owes the output.
    #[allow(clippy::too_many_arguments)]
    pub fn exchange(
        &mut self,
        pool: AssetId,
        asset_in: AssetId,
        asset_out: AssetId,
        kind: SwapKind,
        amount_given: u64,
        limit: u64,
        payload: &[u8],
    ) -> Result<ExchangeOutcome> {
        self.session_mut()?;
        let outcome = self
            .backend
            .exchange(pool, asset_in, asset_out, kind, amount_given, limit, payload)?;

        let session = self.session_mut()?;
        session.ledger.credit(asset_in, outcome.amount_in);
        session.ledger.debit(asset_out, outcome.amount_out);
        trace!(
            pool = %pool,
            amount_in = outcome.amount_in,
            amount_out = outcome.amount_out,
            "exchange recorded"
        );
        Ok(outcome)
    }

    /// Executes one wrapper conversion; ledger recording mirrors
    /// [`exchange`](Self::exchange).
    #[allow(clippy::too_many_arguments)]
    pub fn wrap_or_unwrap(
        &mut self,
        wrapper: AssetId,
        kind: SwapKind,
        direction: WrapDirection,
        asset_in: AssetId,
        asset_out: AssetId,
        amount_given: u64,
        limit: u64,
    ) -> Result<ExchangeOutcome> {
        self.session_mut()?;
        let outcome = self
            .backend
            .wrap_or_unwrap(wrapper, kind, direction, amount_given, limit)?;

        let session = self.session_mut()?;
        session.ledger.credit(asset_in, outcome.amount_in);
        session.ledger.debit(asset_out, outcome.amount_out);
        trace!(
            wrapper = %wrapper,
            ?direction,
            amount_in = outcome.amount_in,
            amount_out = outcome.amount_out,
            "wrap recorded"
        );
        Ok(outcome)
    }

    /// Deposits into a pool. The custodian is owed every deposited
    /// amount; shares issued to the custodian itself are additionally
    /// recorded as owed onward (they will be consumed by a later step),
    /// while shares issued directly to the caller leave no share delta.
    #[allow(clippy::too_many_arguments)]
    pub fn add_liquidity(
        &mut self,
        pool: AssetId,
        recipient: Party,
        max_amounts_in: &[u64],
        min_shares_out: u64,
        kind: SwapKind,
        payload: &[u8],
    ) -> Result<AddLiquidityOutcome> {
        self.session_mut()?;
        let assets = self.backend.pool_assets(pool)?;
        let outcome = self.backend.add_liquidity(
            pool,
            recipient,
            max_amounts_in,
            min_shares_out,
            kind,
            payload,
        )?;

        let session = self.session_mut()?;
        for (asset, amount) in assets.iter().zip(outcome.amounts_in.iter()) {
            session.ledger.credit(*asset, *amount);
        }
        if recipient == Party::Custodian {
            session.ledger.debit(pool, outcome.shares_out);
        }
        trace!(
            pool = %pool,
            ?recipient,
            shares_out = outcome.shares_out,
            "liquidity added"
        );
        Ok(outcome)
    }

    /// Burns pool shares for underlying assets. The custodian is owed the
    /// shares (netting a prior step's debit, or an instant transfer-in)
    /// and owes every withdrawn amount.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_liquidity(
        &mut self,
        pool: AssetId,
        source: Party,
        max_shares_in: u64,
        min_amounts_out: &[u64],
        kind: SwapKind,
        payload: &[u8],
    ) -> Result<RemoveLiquidityOutcome> {
        self.session_mut()?;
        let assets = self.backend.pool_assets(pool)?;
        let outcome = self.backend.remove_liquidity(
            pool,
            source,
            max_shares_in,
            min_amounts_out,
            kind,
            payload,
        )?;

        let session = self.session_mut()?;
        session.ledger.credit(pool, outcome.shares_in);
        for (asset, amount) in assets.iter().zip(outcome.amounts_out.iter()) {
            session.ledger.debit(*asset, *amount);
        }
        trace!(
            pool = %pool,
            ?source,
            shares_in = outcome.shares_in,
            "liquidity removed"
        );
        Ok(outcome)
    }

    /// Returns a pool's registered assets in canonical order.
    pub fn pool_assets(&self, pool: AssetId) -> Result<Vec<AssetId>> {
        Ok(self.backend.pool_assets(pool)?)
    }

    // -----------------------------------------------------------------------
    // Caller-Facing Transfers
    // -----------------------------------------------------------------------

    /// Pulls `amount` of `asset` from the caller (commit mode only) and
    /// records that the custodian received it.
    pub fn pull_from_caller(&mut self, asset: AssetId, amount: u64, as_native: bool) -> Result<()> {
        self.session_mut()?;
        if amount == 0 {
            return Ok(());
        }
        if self.committing() {
            self.backend.pull_from_caller(asset, amount, as_native)?;
        }
        let session = self.session_mut()?;
        session.ledger.debit(asset, amount);
        debug!(asset = %asset, amount, "pulled from caller");
        Ok(())
    }

    /// Pushes `amount` of `asset` to the caller (commit mode only) and
    /// records that the custodian paid it out.
    pub fn push_to_caller(&mut self, asset: AssetId, amount: u64, as_native: bool) -> Result<()> {
        self.session_mut()?;
        if amount == 0 {
            return Ok(());
        }
        if self.committing() {
            self.backend.push_to_caller(asset, amount, as_native)?;
        }
        let session = self.session_mut()?;
        session.ledger.credit(asset, amount);
        debug!(asset = %asset, amount, "pushed to caller");
        Ok(())
    }

    /// Returns leftover transient native balance to the caller. A no-op
    /// in quote mode.
    pub fn sweep_native(&mut self) -> Result<()> {
        self.session_mut()?;
        if self.committing() {
            self.backend.sweep_native()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultError;
    use crate::testing::FixedRateBackend;

    fn asset(tag: &str) -> AssetId {
        AssetId::derive(tag, "tide:test")
    }

    fn vault() -> Vault<FixedRateBackend> {
        Vault::new(FixedRateBackend::new())
    }

    #[test]
    fn unlock_with_no_activity_succeeds() {
        let mut vault = vault();
        let out = vault.unlock(|_| Ok(42)).unwrap();
        assert_eq!(out, 42);
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn nested_unlock_is_rejected() {
        let mut vault = vault();
        let result = vault.unlock(|v| v.unlock(|_| Ok(())));
        assert!(matches!(
            result,
            Err(VaultError::Session(SessionError::AlreadyOpen))
        ));
        // The outer failure closed the session.
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn ledger_ops_outside_session_are_rejected() {
        let mut vault = vault();
        let result = vault.pull_from_caller(asset("USDX"), 100, false);
        assert!(matches!(
            result,
            Err(VaultError::Session(SessionError::NotUnlocked))
        ));
    }

    #[test]
    fn unsettled_session_fails_to_close() {
        let mut vault = vault();
        vault.backend_mut().fund_caller(asset("USDX"), 1_000);

        let result = vault.unlock(|v| {
            // Pull without a matching obligation: delta stays nonzero.
            v.pull_from_caller(asset("USDX"), 100, false)
        });
        assert!(matches!(
            result,
            Err(VaultError::Session(SessionError::BalanceNotSettled { unsettled: 1 }))
        ));
        assert!(!vault.is_unlocked());
    }

    #[test]
    fn offsetting_transfers_settle() {
        let mut vault = vault();
        let usdx = asset("USDX");
        vault.backend_mut().fund_caller(usdx, 1_000);

        vault
            .unlock(|v| {
                v.push_to_caller(usdx, 100, false)?;
                v.pull_from_caller(usdx, 100, false)?;
                assert_eq!(v.net_delta(usdx), 0);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn callback_error_discards_session() {
        let mut vault = vault();
        let usdx = asset("USDX");
        vault.backend_mut().fund_caller(usdx, 1_000);

        let result: crate::error::Result<()> = vault.unlock(|v| {
            v.pull_from_caller(usdx, 50, false)?;
            Err(SessionError::NotUnlocked.into()) // arbitrary failure
        });
        assert!(result.is_err());
        assert!(!vault.is_unlocked());
        assert_eq!(vault.net_delta(usdx), 0);
    }

    #[test]
    fn quote_does_not_require_reconciliation() {
        let mut vault = vault();
        let usdx = asset("USDX");

        // No caller funding: a commit-mode pull would fail, a quote only
        // records the delta.
        vault
            .quote(|v| {
                v.pull_from_caller(usdx, 500, false)?;
                assert_eq!(v.net_delta(usdx), 500);
                Ok(())
            })
            .unwrap();
        assert!(vault.backend().pulls().is_empty());
    }

    #[test]
    fn quote_performs_no_real_transfers() {
        let mut vault = vault();
        let usdx = asset("USDX");
        vault.backend_mut().fund_caller(usdx, 1_000);

        vault
            .quote(|v| {
                v.pull_from_caller(usdx, 100, false)?;
                v.push_to_caller(usdx, 100, false)?;
                v.sweep_native()
            })
            .unwrap();

        assert!(vault.backend().pulls().is_empty());
        assert!(vault.backend().pushes().is_empty());
        assert_eq!(vault.backend().native_sweeps(), 0);
    }

    #[test]
    fn zero_amount_transfers_are_noops() {
        let mut vault = vault();
        let usdx = asset("USDX");

        vault
            .unlock(|v| {
                v.pull_from_caller(usdx, 0, false)?;
                v.push_to_caller(usdx, 0, false)?;
                assert!(v.is_reconciled());
                Ok(())
            })
            .unwrap();
        assert!(vault.backend().pulls().is_empty());
    }

    #[test]
    fn session_reopens_after_close() {
        let mut vault = vault();
        vault.unlock(|_| Ok(())).unwrap();
        vault.unlock(|_| Ok(())).unwrap();
        vault.quote(|_| Ok(())).unwrap();
    }
}
