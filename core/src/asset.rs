//! # Asset Identifiers
//!
//! Every fungible unit the settlement core touches -- external tokens,
//! pool share tokens, wrapped yield-bearing tokens -- is addressed by an
//! [`AssetId`]. Ids are deterministic BLAKE3 hashes of the asset's
//! canonical properties (symbol, issuer), so the same asset always gets
//! the same id wherever it is referenced. No registry, no coordination.
//!
//! Two conventions matter for the step resolver:
//!
//! - A liquidity pool's share token is identified by the pool's own id.
//!   "The input asset equals the venue id" therefore reads as "this step
//!   spends pool shares."
//! - A yield wrapper's wrapped token is identified by the wrapper's own
//!   id, for the same reason.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{NATIVE_ASSET_SYMBOL, SYSTEM_ISSUER};

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A unique, content-addressed identifier for an asset.
///
/// Computed as `BLAKE3(symbol || 0x00 || issuer)`. The separator byte
/// prevents ambiguity when one field's suffix matches another field's
/// prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// Creates an `AssetId` from a raw 32-byte hash.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded asset id.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded asset id.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives an `AssetId` from the asset's canonical properties.
    pub fn derive(symbol: &str, issuer: &str) -> Self {
        let mut preimage = Vec::with_capacity(symbol.len() + issuer.len() + 1);
        preimage.extend_from_slice(symbol.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(issuer.as_bytes());

        Self(*blake3::hash(&preimage).as_bytes())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for AssetId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// Well-known assets
// ---------------------------------------------------------------------------

/// Returns the [`AssetId`] of the chain-native asset.
///
/// The executor may transiently hold native balance while wrapping; the
/// settlement phase sweeps any leftover back to the caller, keyed by
/// this id.
pub fn native_asset_id() -> AssetId {
    AssetId::derive(NATIVE_ASSET_SYMBOL, SYSTEM_ISSUER)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
