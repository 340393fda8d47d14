//! # Test Fixtures
//!
//! [`FixedRateBackend`]: a deterministic in-memory [`VaultBackend`] for
//! unit tests, integration tests, benches, and the demo. Pools price
//! every asset at a fixed integer unit value and issue shares at a fixed
//! share price; wrappers convert at a fixed rational rate. Division
//! rounds the way a real venue would: in the venue's favor (outputs
//! floor, inputs ceil).
//!
//! Caller funds are a plain balance map, and every caller-facing
//! transfer is recorded so tests can assert exactly what moved and how
//! often.

use std::collections::HashMap;

use crate::asset::AssetId;
use crate::backend::{
    AddLiquidityOutcome, BackendError, ExchangeOutcome, Party, RemoveLiquidityOutcome, SwapKind,
    VaultBackend, WrapDirection,
};

#[derive(Clone, Debug)]
struct MockPool {
    assets: Vec<AssetId>,
    prices: HashMap<AssetId, u64>,
    share_price: u64,
}

#[derive(Clone, Copy, Debug)]
struct MockWrapper {
    /// Wrapped units per `den` underlying units.
    num: u64,
    den: u64,
}

/// Deterministic backend with fixed-price pools and fixed-rate wrappers.
#[derive(Clone, Debug, Default)]
pub struct FixedRateBackend {
    pools: HashMap<AssetId, MockPool>,
    wrappers: HashMap<AssetId, MockWrapper>,
    caller_funds: HashMap<AssetId, u64>,
    pulls: Vec<(AssetId, u64)>,
    pushes: Vec<(AssetId, u64)>,
    native_sweeps: usize,
}

impl FixedRateBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pool holding `assets` at the given unit prices, with
    /// shares worth `share_price` units each.
    pub fn add_pool(&mut self, pool: AssetId, assets: &[(AssetId, u64)], share_price: u64) {
        self.pools.insert(
            pool,
            MockPool {
                assets: assets.iter().map(|(a, _)| *a).collect(),
                prices: assets.iter().copied().collect(),
                share_price,
            },
        );
    }

    /// Registers a wrapper converting `den` underlying units into `num`
    /// wrapped units.
    pub fn add_wrapper(&mut self, wrapper: AssetId, num: u64, den: u64) {
        self.wrappers.insert(wrapper, MockWrapper { num, den });
    }

    /// Credits the caller's pre-paid balance of `asset`.
    pub fn fund_caller(&mut self, asset: AssetId, amount: u64) {
        *self.caller_funds.entry(asset).or_insert(0) += amount;
    }

    /// The caller's remaining balance of `asset`.
    pub fn caller_balance(&self, asset: AssetId) -> u64 {
        self.caller_funds.get(&asset).copied().unwrap_or(0)
    }

    /// Every committed pull, in order.
    pub fn pulls(&self) -> &[(AssetId, u64)] {
        &self.pulls
    }

    /// Every committed push, in order.
    pub fn pushes(&self) -> &[(AssetId, u64)] {
        &self.pushes
    }

    /// How many times the native sweep ran.
    pub fn native_sweeps(&self) -> usize {
        self.native_sweeps
    }

    fn pool(&self, pool: AssetId) -> Result<&MockPool, BackendError> {
        self.pools.get(&pool).ok_or(BackendError::UnknownPool(pool))
    }

    fn price(pool_state: &MockPool, pool: AssetId, asset: AssetId) -> Result<u64, BackendError> {
        pool_state
            .prices
            .get(&asset)
            .copied()
            .ok_or(BackendError::UnknownPool(pool))
    }

    /// Index of the single nonzero slot of a bounds array.
    fn nonzero_slot(bounds: &[u64]) -> Result<usize, BackendError> {
        bounds
            .iter()
            .position(|b| *b != 0)
            .ok_or(BackendError::SwapLimit { amount: 0, limit: 0 })
    }
}

fn mul_div_floor(amount: u64, num: u64, den: u64) -> u64 {
    (amount as u128 * num as u128 / den as u128) as u64
}

fn mul_div_ceil(amount: u64, num: u64, den: u64) -> u64 {
    ((amount as u128 * num as u128).div_ceil(den as u128)) as u64
}

fn check_floor(amount: u64, limit: u64) -> Result<(), BackendError> {
    if amount < limit {
        return Err(BackendError::SwapLimit { amount, limit });
    }
    Ok(())
}

fn check_ceiling(amount: u64, limit: u64) -> Result<(), BackendError> {
    if amount > limit {
        return Err(BackendError::SwapLimit { amount, limit });
    }
    Ok(())
}

impl VaultBackend for FixedRateBackend {
    fn exchange(
        &mut self,
        pool: AssetId,
        asset_in: AssetId,
        asset_out: AssetId,
        kind: SwapKind,
        amount_given: u64,
        limit: u64,
        _payload: &[u8],
    ) -> Result<ExchangeOutcome, BackendError> {
        let state = self.pool(pool)?;
        let price_in = Self::price(state, pool, asset_in)?;
        let price_out = Self::price(state, pool, asset_out)?;

        match kind {
            SwapKind::ExactIn => {
                let amount_out = mul_div_floor(amount_given, price_in, price_out);
                check_floor(amount_out, limit)?;
                Ok(ExchangeOutcome {
                    amount_calculated: amount_out,
                    amount_in: amount_given,
                    amount_out,
                })
            }
            SwapKind::ExactOut => {
                let amount_in = mul_div_ceil(amount_given, price_out, price_in);
                check_ceiling(amount_in, limit)?;
                Ok(ExchangeOutcome {
                    amount_calculated: amount_in,
                    amount_in,
                    amount_out: amount_given,
                })
            }
        }
    }

    fn wrap_or_unwrap(
        &mut self,
        wrapper: AssetId,
        kind: SwapKind,
        direction: WrapDirection,
        amount_given: u64,
        limit: u64,
    ) -> Result<ExchangeOutcome, BackendError> {
        let rate = *self
            .wrappers
            .get(&wrapper)
            .ok_or(BackendError::UnknownWrapper(wrapper))?;
        // Wrap multiplies by num/den; unwrap divides.
        let (num, den) = match direction {
            WrapDirection::Wrap => (rate.num, rate.den),
            WrapDirection::Unwrap => (rate.den, rate.num),
        };

        match kind {
            SwapKind::ExactIn => {
                let amount_out = mul_div_floor(amount_given, num, den);
                check_floor(amount_out, limit)?;
                Ok(ExchangeOutcome {
                    amount_calculated: amount_out,
                    amount_in: amount_given,
                    amount_out,
                })
            }
            SwapKind::ExactOut => {
                let amount_in = mul_div_ceil(amount_given, den, num);
                check_ceiling(amount_in, limit)?;
                Ok(ExchangeOutcome {
                    amount_calculated: amount_in,
                    amount_in,
                    amount_out: amount_given,
                })
            }
        }
    }

    fn add_liquidity(
        &mut self,
        pool: AssetId,
        recipient: Party,
        max_amounts_in: &[u64],
        min_shares_out: u64,
        kind: SwapKind,
        _payload: &[u8],
    ) -> Result<AddLiquidityOutcome, BackendError> {
        let state = self.pool(pool)?;

        let outcome = match kind {
            SwapKind::ExactIn => {
                // Nonzero slots are exact deposit amounts.
                let mut value: u128 = 0;
                for (asset, amount) in state.assets.iter().zip(max_amounts_in.iter()) {
                    let price = Self::price(state, pool, *asset)?;
                    value += *amount as u128 * price as u128;
                }
                let shares_out = (value / state.share_price as u128) as u64;
                check_floor(shares_out, min_shares_out)?;
                AddLiquidityOutcome {
                    amounts_in: max_amounts_in.to_vec(),
                    shares_out,
                    return_data: Vec::new(),
                }
            }
            SwapKind::ExactOut => {
                // min_shares_out carries the exact share target; the one
                // nonzero slot is the input ceiling.
                let idx = Self::nonzero_slot(max_amounts_in)?;
                let price = Self::price(state, pool, state.assets[idx])?;
                let amount_in = mul_div_ceil(min_shares_out, state.share_price, price);
                check_ceiling(amount_in, max_amounts_in[idx])?;

                let mut amounts_in = vec![0u64; max_amounts_in.len()];
                amounts_in[idx] = amount_in;
                AddLiquidityOutcome {
                    amounts_in,
                    shares_out: min_shares_out,
                    return_data: Vec::new(),
                }
            }
        };

        // Shares issued to the caller are delivered by the venue itself,
        // not through a settlement push.
        if recipient == Party::Caller {
            *self.caller_funds.entry(pool).or_insert(0) += outcome.shares_out;
        }
        Ok(outcome)
    }

    fn remove_liquidity(
        &mut self,
        pool: AssetId,
        _source: Party,
        max_shares_in: u64,
        min_amounts_out: &[u64],
        kind: SwapKind,
        _payload: &[u8],
    ) -> Result<RemoveLiquidityOutcome, BackendError> {
        let state = self.pool(pool)?;
        let idx = Self::nonzero_slot(min_amounts_out)?;
        let price = Self::price(state, pool, state.assets[idx])?;

        match kind {
            SwapKind::ExactIn => {
                // max_shares_in is the exact burn amount; the nonzero
                // slot is the output floor.
                let amount_out = mul_div_floor(max_shares_in, state.share_price, price);
                check_floor(amount_out, min_amounts_out[idx])?;

                let mut amounts_out = vec![0u64; min_amounts_out.len()];
                amounts_out[idx] = amount_out;
                Ok(RemoveLiquidityOutcome {
                    shares_in: max_shares_in,
                    amounts_out,
                    return_data: Vec::new(),
                })
            }
            SwapKind::ExactOut => {
                // The nonzero slot is the exact output target;
                // max_shares_in is the burn ceiling.
                let target = min_amounts_out[idx];
                let shares_in = mul_div_ceil(target, price, state.share_price);
                check_ceiling(shares_in, max_shares_in)?;

                let mut amounts_out = vec![0u64; min_amounts_out.len()];
                amounts_out[idx] = target;
                Ok(RemoveLiquidityOutcome {
                    shares_in,
                    amounts_out,
                    return_data: Vec::new(),
                })
            }
        }
    }

    fn pool_assets(&self, pool: AssetId) -> Result<Vec<AssetId>, BackendError> {
        Ok(self.pool(pool)?.assets.clone())
    }

    fn pull_from_caller(
        &mut self,
        asset: AssetId,
        amount: u64,
        _as_native: bool,
    ) -> Result<(), BackendError> {
        let available = self.caller_funds.entry(asset).or_insert(0);
        if *available < amount {
            return Err(BackendError::InsufficientFunds {
                asset,
                required: amount,
                available: *available,
            });
        }
        *available -= amount;
        self.pulls.push((asset, amount));
        Ok(())
    }

    fn push_to_caller(
        &mut self,
        asset: AssetId,
        amount: u64,
        _as_native: bool,
    ) -> Result<(), BackendError> {
        *self.caller_funds.entry(asset).or_insert(0) += amount;
        self.pushes.push((asset, amount));
        Ok(())
    }

    fn sweep_native(&mut self) -> Result<(), BackendError> {
        self.native_sweeps += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
