//! Header admission and consensus state bookkeeping

use std::{
    collections::BTreeMap,
    ops::Bound::{Excluded, Unbounded},
};

use ibc_eureka_commitment::Height;
use serde::{Deserialize, Serialize};

use crate::{
    client_state::ClientState, consensus_state::ConsensusState, error::LightClientError,
    header::Header, verify::HeaderVerifier,
};

/// Outcome of a successful update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateResult {
    /// A new consensus state was stored
    Update,
    /// The header was already known
    NoOp,
    /// The header conflicts with stored state and the client is now frozen
    Misbehaviour,
}

/// Checks that `header` may be admitted on top of its trusted consensus state at `now`.
///
/// # Errors
/// Returns the first failed check, in order: frozen client, missing trusted state,
/// future or expired timestamps, non-increasing height, chain id, header consistency and
/// finally the signatures.
pub fn verify_header<V: HeaderVerifier>(
    client_state: &ClientState,
    consensus_states: &BTreeMap<Height, ConsensusState>,
    header: &Header,
    now: u64,
    verifier: &V,
) -> Result<(), LightClientError> {
    if client_state.is_frozen() {
        return Err(LightClientError::ClientFrozen);
    }

    let trusted = consensus_states
        .get(&header.trusted_height)
        .ok_or(LightClientError::TrustedHeightNotFound(header.trusted_height))?;

    check_timestamps(client_state, trusted, header, now)?;

    if header.height <= header.trusted_height {
        return Err(LightClientError::NonIncreasingHeight {
            height: header.height,
            trusted_height: header.trusted_height,
        });
    }
    if header.chain_id != client_state.chain_id {
        return Err(LightClientError::ChainIdMismatch {
            expected: client_state.chain_id.clone(),
            actual: header.chain_id.clone(),
        });
    }

    header.validate_basic()?;
    verifier.verify_header(header, trusted, client_state.trust_level)
}

fn check_timestamps(
    client_state: &ClientState,
    trusted: &ConsensusState,
    header: &Header,
    now: u64,
) -> Result<(), LightClientError> {
    let expired = |reason: &str| LightClientError::HeaderExpired {
        reason: reason.to_string(),
    };

    if header.timestamp > now.saturating_add(client_state.max_clock_drift) {
        return Err(LightClientError::HeaderInFuture {
            timestamp: header.timestamp,
            now,
        });
    }
    if client_state.is_expired(trusted.timestamp, now) {
        return Err(expired("trusted consensus state is outside the trusting period"));
    }
    if client_state.is_expired(header.timestamp, now) {
        return Err(expired("header is older than the trusting period"));
    }
    let window_end = trusted.timestamp.saturating_add(client_state.trusting_period);
    if header.timestamp < trusted.timestamp || header.timestamp >= window_end {
        return Err(expired("header is outside the trust window of its trusted state"));
    }
    Ok(())
}

/// Stores the consensus state of an already verified header.
///
/// A header conflicting with a stored consensus state at its height, or whose timestamp
/// does not fit strictly between its neighbours, freezes the client instead.
pub fn update_consensus_state(
    client_state: &mut ClientState,
    consensus_states: &mut BTreeMap<Height, ConsensusState>,
    header: &Header,
    now: u64,
) -> UpdateResult {
    let height = header.height;
    let new_state = header.consensus_state();

    if let Some(existing) = consensus_states.get(&height) {
        if *existing == new_state {
            return UpdateResult::NoOp;
        }
        client_state.frozen_height = height;
        return UpdateResult::Misbehaviour;
    }

    let after_previous = consensus_states
        .range(..height)
        .next_back()
        .is_none_or(|(_, prev)| prev.timestamp < new_state.timestamp);
    let before_next = consensus_states
        .range((Excluded(height), Unbounded))
        .next()
        .is_none_or(|(_, next)| next.timestamp > new_state.timestamp);
    if !(after_previous && before_next) {
        client_state.frozen_height = height;
        return UpdateResult::Misbehaviour;
    }

    consensus_states.insert(height, new_state);
    if height > client_state.latest_height {
        client_state.latest_height = height;
    }
    prune_expired(client_state, consensus_states, now);

    UpdateResult::Update
}

/// Drops expired consensus states, always keeping the latest one
fn prune_expired(
    client_state: &ClientState,
    consensus_states: &mut BTreeMap<Height, ConsensusState>,
    now: u64,
) {
    let before = consensus_states.len();
    consensus_states.retain(|height, state| {
        *height == client_state.latest_height || !client_state.is_expired(state.timestamp, now)
    });
    let pruned = before - consensus_states.len();
    if pruned > 0 {
        tracing::debug!(pruned, "pruned expired consensus states");
    }
}
