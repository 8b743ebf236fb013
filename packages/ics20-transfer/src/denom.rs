//! Denom traces and the registry of vouchers minted on this chain

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TransferError;

/// Prefix of local voucher denoms
pub const VOUCHER_PREFIX: &str = "ibc/";

/// What a registered denom is on this chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenomKind {
    /// Issued here; leaves the chain through escrow
    Native,
    /// Minted here for a token issued elsewhere; leaves home through burning
    Voucher,
}

/// A registered denom
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denom {
    /// Full trace, e.g. `transfer/chanB/uatom`
    pub trace: String,
    /// Set once at registration
    pub kind: DenomKind,
}

impl Denom {
    /// The denom the bank holds this token under
    #[must_use]
    pub fn local_denom(&self) -> String {
        match self.kind {
            DenomKind::Native => self.trace.clone(),
            DenomKind::Voucher => voucher_denom(&self.trace),
        }
    }
}

/// `sha256(trace)`, the registry key of a trace
#[must_use]
pub fn denom_hash(trace: &str) -> [u8; 32] {
    Sha256::digest(trace.as_bytes()).into()
}

/// The local voucher denom of a trace: `ibc/{HEX(sha256(trace))}`
#[must_use]
pub fn voucher_denom(trace: &str) -> String {
    format!("{VOUCHER_PREFIX}{}", hex::encode_upper(denom_hash(trace)))
}

/// Whether `trace` starts with the `{port}/{channel}/` hop
#[must_use]
pub fn has_prefix(trace: &str, port: &str, channel: &str) -> bool {
    strip_prefix(trace, port, channel).is_some()
}

/// `trace` without its leading `{port}/{channel}/` hop
#[must_use]
pub fn strip_prefix<'a>(trace: &'a str, port: &str, channel: &str) -> Option<&'a str> {
    trace
        .strip_prefix(port)?
        .strip_prefix('/')?
        .strip_prefix(channel)?
        .strip_prefix('/')
        .filter(|rest| !rest.is_empty())
}

/// Denoms keyed by the hash of their full trace.
///
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct DenomRegistry {
    denoms: Arc<RwLock<BTreeMap<[u8; 32], Denom>>>,
}

impl DenomRegistry {
    /// Returns the denom registered for `trace`, registering it as `kind` if absent
    #[allow(clippy::must_use_candidate)]
    pub fn get_or_register(&self, trace: &str, kind: DenomKind) -> Denom {
        let mut denoms = self.denoms.write().unwrap_or_else(PoisonError::into_inner);
        denoms
            .entry(denom_hash(trace))
            .or_insert_with(|| {
                tracing::info!(trace, ?kind, "denom registered");
                Denom {
                    trace: trace.to_string(),
                    kind,
                }
            })
            .clone()
    }

    /// The denom registered under `hash`
    #[must_use]
    pub fn get(&self, hash: &[u8; 32]) -> Option<Denom> {
        self.denoms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(hash)
            .cloned()
    }

    /// Resolves a denom as held by the bank to its full trace.
    ///
    /// `ibc/{HEX}` denoms must be registered vouchers; anything else is a native denom.
    ///
    /// # Errors
    /// Returns [`TransferError::DenomNotFound`] for an unknown voucher denom.
    pub fn resolve(&self, local_denom: &str) -> Result<Denom, TransferError> {
        let Some(hex_hash) = local_denom.strip_prefix(VOUCHER_PREFIX) else {
            return Ok(Denom {
                trace: local_denom.to_string(),
                kind: DenomKind::Native,
            });
        };
        let not_found = || TransferError::DenomNotFound(local_denom.to_string());
        let hash = hex::decode(hex_hash)
            .ok()
            .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
            .ok_or_else(not_found)?;
        self.get(&hash).ok_or_else(not_found)
    }

    /// The denom the bank holds a token with this trace under
    #[must_use]
    pub fn local_denom(&self, trace: &str) -> String {
        self.get(&denom_hash(trace))
            .map_or_else(|| trace.to_string(), |denom| denom.local_denom())
    }
}
