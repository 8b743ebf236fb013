//! Membership and non-membership verification against stored consensus roots

use std::collections::BTreeMap;

use ibc_eureka_commitment::{Height, MerklePath, MerkleProof};

use crate::{client_state::ClientState, consensus_state::ConsensusState, error::LightClientError};

/// Verifies that `value` is stored at `path` in the state committed at `height`.
/// Returns the timestamp of the consensus state at `height`.
///
/// # Errors
/// Returns an error if the client is frozen, the value is empty, no consensus state is
/// stored at `height`, or the proof does not verify.
pub fn verify_membership(
    client_state: &ClientState,
    consensus_states: &BTreeMap<Height, ConsensusState>,
    height: Height,
    proof: &[u8],
    path: &[Vec<u8>],
    value: &[u8],
) -> Result<u64, LightClientError> {
    let (consensus_state, proof, path) =
        prepare(client_state, consensus_states, height, proof, path)?;
    if value.is_empty() {
        return Err(LightClientError::EmptyValue);
    }

    ibc_eureka_merkle::verify_membership(
        &client_state.proof_specs,
        &consensus_state.root,
        &proof,
        &path,
        value,
    )?;
    Ok(consensus_state.timestamp)
}

/// Verifies that nothing is stored at `path` in the state committed at `height`.
/// Returns the timestamp of the consensus state at `height`.
///
/// # Errors
/// Returns an error if the client is frozen, no consensus state is stored at `height`, or
/// the proof does not verify.
pub fn verify_non_membership(
    client_state: &ClientState,
    consensus_states: &BTreeMap<Height, ConsensusState>,
    height: Height,
    proof: &[u8],
    path: &[Vec<u8>],
) -> Result<u64, LightClientError> {
    let (consensus_state, proof, path) =
        prepare(client_state, consensus_states, height, proof, path)?;

    ibc_eureka_merkle::verify_non_membership(
        &client_state.proof_specs,
        &consensus_state.root,
        &proof,
        &path,
    )?;
    Ok(consensus_state.timestamp)
}

fn prepare<'a>(
    client_state: &ClientState,
    consensus_states: &'a BTreeMap<Height, ConsensusState>,
    height: Height,
    proof: &[u8],
    path: &[Vec<u8>],
) -> Result<(&'a ConsensusState, MerkleProof, MerklePath), LightClientError> {
    if client_state.is_frozen() {
        return Err(LightClientError::ClientFrozen);
    }
    let consensus_state = consensus_states
        .get(&height)
        .ok_or(LightClientError::ConsensusStateNotFound(height))?;
    let proof = MerkleProof::from_bytes(proof)?;
    Ok((consensus_state, proof, MerklePath::new(path.to_vec())))
}
