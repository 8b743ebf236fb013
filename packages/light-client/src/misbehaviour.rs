//! Misbehaviour evidence

use std::collections::BTreeMap;

use ibc_eureka_commitment::Height;
use serde::{Deserialize, Serialize};

use crate::{
    client_state::ClientState, consensus_state::ConsensusState, error::LightClientError,
    header::Header, update::verify_header, verify::HeaderVerifier,
};

/// Two validly signed headers that cannot both be canonical
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Misbehaviour {
    /// The first header; for time violations the one at the greater height
    pub header_1: Header,
    /// The second header
    pub header_2: Header,
}

impl Misbehaviour {
    /// Whether the headers contradict each other, ignoring signatures.
    ///
    /// Either they are different headers for the same height, or the higher one is not
    /// later in time.
    #[must_use]
    pub fn is_conflicting(&self) -> bool {
        let (h1, h2) = (&self.header_1, &self.header_2);
        if h1.height == h2.height {
            return h1.sign_bytes() != h2.sign_bytes();
        }
        h1.height > h2.height && h1.timestamp <= h2.timestamp
    }
}

/// Verifies misbehaviour evidence and returns the height to freeze the client at.
///
/// Both headers must verify from their own trusted heights.
///
/// # Errors
/// - [`LightClientError::ClientFrozen`] if the client is already frozen
/// - [`LightClientError::MisbehaviourNotDetected`] if the headers do not conflict
/// - any header verification error for either header
pub fn verify_misbehaviour<V: HeaderVerifier>(
    client_state: &ClientState,
    consensus_states: &BTreeMap<Height, ConsensusState>,
    misbehaviour: &Misbehaviour,
    now: u64,
    verifier: &V,
) -> Result<Height, LightClientError> {
    if client_state.is_frozen() {
        return Err(LightClientError::ClientFrozen);
    }
    if !misbehaviour.is_conflicting() {
        return Err(LightClientError::MisbehaviourNotDetected);
    }

    verify_header(client_state, consensus_states, &misbehaviour.header_1, now, verifier)?;
    verify_header(client_state, consensus_states, &misbehaviour.header_2, now, verifier)?;

    Ok(misbehaviour.header_1.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        test_utils::{client_state, consensus_state, signed_header, TestValidators},
        verify::Ed25519HeaderVerifier,
    };

    const T0: u64 = 50_000;

    fn setup() -> (ClientState, BTreeMap<Height, ConsensusState>, TestValidators) {
        let validators = TestValidators::new(&[4, 5, 6], 7);
        let consensus_states = BTreeMap::from([(
            Height::new(1, 90),
            consensus_state(T0, vec![0; 32], &validators),
        )]);
        (client_state(Height::new(1, 90)), consensus_states, validators)
    }

    fn header(validators: &TestValidators, height: u64, timestamp: u64, root: u8) -> Header {
        signed_header(
            Height::new(1, height),
            Height::new(1, 90),
            timestamp,
            vec![root; 32],
            validators,
            validators,
        )
    }

    #[test]
    fn same_height_different_roots() {
        let (cs, states, vals) = setup();
        let misbehaviour = Misbehaviour {
            header_1: header(&vals, 100, T0 + 10, 1),
            header_2: header(&vals, 100, T0 + 10, 2),
        };
        assert_eq!(
            verify_misbehaviour(&cs, &states, &misbehaviour, T0 + 20, &Ed25519HeaderVerifier),
            Ok(Height::new(1, 100))
        );
    }

    #[test]
    fn time_violation() {
        let (cs, states, vals) = setup();
        let misbehaviour = Misbehaviour {
            header_1: header(&vals, 105, T0 + 10, 1),
            header_2: header(&vals, 100, T0 + 10, 2),
        };
        assert_eq!(
            verify_misbehaviour(&cs, &states, &misbehaviour, T0 + 20, &Ed25519HeaderVerifier),
            Ok(Height::new(1, 105))
        );
    }

    #[test]
    fn consistent_headers_are_not_misbehaviour() {
        let (cs, states, vals) = setup();
        let same = header(&vals, 100, T0 + 10, 1);
        let identical = Misbehaviour {
            header_1: same.clone(),
            header_2: same,
        };
        let monotone = Misbehaviour {
            header_1: header(&vals, 105, T0 + 15, 1),
            header_2: header(&vals, 100, T0 + 10, 2),
        };
        for evidence in [identical, monotone] {
            assert_eq!(
                verify_misbehaviour(&cs, &states, &evidence, T0 + 20, &Ed25519HeaderVerifier),
                Err(LightClientError::MisbehaviourNotDetected)
            );
        }
    }

    #[test]
    fn unsigned_evidence_is_rejected() {
        let (cs, states, vals) = setup();
        let mut forged = header(&vals, 100, T0 + 10, 2);
        forged.signatures.clear();
        let misbehaviour = Misbehaviour {
            header_1: header(&vals, 100, T0 + 10, 1),
            header_2: forged,
        };
        assert!(matches!(
            verify_misbehaviour(&cs, &states, &misbehaviour, T0 + 20, &Ed25519HeaderVerifier),
            Err(LightClientError::InsufficientVotingPower { .. })
        ));
    }
}
