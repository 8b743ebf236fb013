//! The light client state machine for one counterparty chain

use std::collections::BTreeMap;

use ibc_eureka_commitment::Height;

use crate::{
    client_state::{ClientState, Status},
    consensus_state::ConsensusState,
    error::LightClientError,
    header::Header,
    membership,
    misbehaviour::{verify_misbehaviour, Misbehaviour},
    update::{update_consensus_state, verify_header, UpdateResult},
    verify::{Ed25519HeaderVerifier, HeaderVerifier},
};

/// Trusted consensus states of a counterparty chain and the rules to extend them.
///
/// Every operation either succeeds or leaves the client untouched; freezing through
/// misbehaviour is a successful outcome, not an error.
#[derive(Debug, Clone)]
pub struct TendermintLightClient<V = Ed25519HeaderVerifier> {
    client_state: ClientState,
    consensus_states: BTreeMap<Height, ConsensusState>,
    verifier: V,
}

impl TendermintLightClient {
    /// Creates a client from a genesis client and consensus state.
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidClientState`] if the client state is invalid.
    pub fn new(
        client_state: ClientState,
        consensus_state: ConsensusState,
    ) -> Result<Self, LightClientError> {
        Self::with_verifier(client_state, consensus_state, Ed25519HeaderVerifier)
    }
}

impl<V: HeaderVerifier> TendermintLightClient<V> {
    /// Creates a client that checks commits with `verifier`.
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidClientState`] if the client state is invalid.
    pub fn with_verifier(
        client_state: ClientState,
        consensus_state: ConsensusState,
        verifier: V,
    ) -> Result<Self, LightClientError> {
        client_state.validate()?;
        let consensus_states = BTreeMap::from([(client_state.latest_height, consensus_state)]);
        Ok(Self {
            client_state,
            consensus_states,
            verifier,
        })
    }

    /// The current client state
    #[must_use]
    pub const fn client_state(&self) -> &ClientState {
        &self.client_state
    }

    /// The consensus state stored at `height`
    #[must_use]
    pub fn consensus_state(&self, height: Height) -> Option<&ConsensusState> {
        self.consensus_states.get(&height)
    }

    /// Heights with a stored consensus state, ascending
    pub fn consensus_heights(&self) -> impl Iterator<Item = Height> + '_ {
        self.consensus_states.keys().copied()
    }

    /// Status of the client at `now`
    #[must_use]
    pub fn status(&self, now: u64) -> Status {
        if self.client_state.is_frozen() {
            return Status::Frozen;
        }
        match self.consensus_state(self.client_state.latest_height) {
            Some(latest) if !self.client_state.is_expired(latest.timestamp, now) => Status::Active,
            _ => Status::Expired,
        }
    }

    /// Admits a header.
    ///
    /// # Errors
    /// Returns an error if the header fails verification; the client is unchanged.
    pub fn update_client(
        &mut self,
        header: &Header,
        now: u64,
    ) -> Result<UpdateResult, LightClientError> {
        verify_header(
            &self.client_state,
            &self.consensus_states,
            header,
            now,
            &self.verifier,
        )?;

        let result = update_consensus_state(
            &mut self.client_state,
            &mut self.consensus_states,
            header,
            now,
        );
        match result {
            UpdateResult::Update => tracing::info!(
                chain_id = %self.client_state.chain_id,
                height = %header.height,
                "client updated"
            ),
            UpdateResult::NoOp => tracing::debug!(height = %header.height, "header already known"),
            UpdateResult::Misbehaviour => tracing::warn!(
                chain_id = %self.client_state.chain_id,
                height = %header.height,
                "conflicting header, client frozen"
            ),
        }
        Ok(result)
    }

    /// Admits a JSON encoded [`Header`].
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidClientMessage`] if the bytes are not a header, or
    /// any error of [`Self::update_client`].
    pub fn update_client_msg(
        &mut self,
        msg: &[u8],
        now: u64,
    ) -> Result<UpdateResult, LightClientError> {
        let header: Header = decode_client_message(msg)?;
        self.update_client(&header, now)
    }

    /// Freezes the client on valid misbehaviour evidence.
    ///
    /// # Errors
    /// Returns an error if the evidence is not valid misbehaviour; the client is unchanged.
    pub fn submit_misbehaviour(
        &mut self,
        misbehaviour: &Misbehaviour,
        now: u64,
    ) -> Result<(), LightClientError> {
        let frozen_height = verify_misbehaviour(
            &self.client_state,
            &self.consensus_states,
            misbehaviour,
            now,
            &self.verifier,
        )?;
        self.client_state.frozen_height = frozen_height;
        tracing::warn!(
            chain_id = %self.client_state.chain_id,
            %frozen_height,
            "misbehaviour detected, client frozen"
        );
        Ok(())
    }

    /// Freezes the client on JSON encoded [`Misbehaviour`].
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidClientMessage`] if the bytes are not misbehaviour,
    /// or any error of [`Self::submit_misbehaviour`].
    pub fn submit_misbehaviour_msg(&mut self, msg: &[u8], now: u64) -> Result<(), LightClientError> {
        let misbehaviour: Misbehaviour = decode_client_message(msg)?;
        self.submit_misbehaviour(&misbehaviour, now)
    }

    /// Verifies a membership proof at `height`, returning the consensus timestamp there.
    ///
    /// # Errors
    /// See [`membership::verify_membership`].
    pub fn verify_membership(
        &self,
        height: Height,
        proof: &[u8],
        path: &[Vec<u8>],
        value: &[u8],
    ) -> Result<u64, LightClientError> {
        membership::verify_membership(
            &self.client_state,
            &self.consensus_states,
            height,
            proof,
            path,
            value,
        )
    }

    /// Verifies a non-membership proof at `height`, returning the consensus timestamp there.
    ///
    /// # Errors
    /// See [`membership::verify_non_membership`].
    pub fn verify_non_membership(
        &self,
        height: Height,
        proof: &[u8],
        path: &[Vec<u8>],
    ) -> Result<u64, LightClientError> {
        membership::verify_non_membership(
            &self.client_state,
            &self.consensus_states,
            height,
            proof,
            path,
        )
    }

    /// Replaces a frozen or expired client with the latest state of an active substitute
    /// tracking the same chain. The subject keeps its trust parameters.
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidSubstitute`] if the substitute is not active, is
    /// for another chain or is not ahead of the subject.
    pub fn recover<W>(
        &mut self,
        substitute: &TendermintLightClient<W>,
        now: u64,
    ) -> Result<(), LightClientError> {
        let invalid = |reason: &str| LightClientError::InvalidSubstitute {
            reason: reason.to_string(),
        };

        let substitute_state = &substitute.client_state;
        if substitute_state.is_frozen() {
            return Err(invalid("substitute is frozen"));
        }
        if substitute_state.chain_id != self.client_state.chain_id {
            return Err(invalid("substitute tracks another chain"));
        }
        if substitute_state.latest_height <= self.client_state.latest_height {
            return Err(invalid("substitute is not ahead of the subject"));
        }
        let latest = substitute
            .consensus_states
            .get(&substitute_state.latest_height)
            .filter(|cs| !substitute_state.is_expired(cs.timestamp, now))
            .ok_or_else(|| invalid("substitute is expired"))?;

        self.consensus_states = BTreeMap::from([(substitute_state.latest_height, latest.clone())]);
        self.client_state.latest_height = substitute_state.latest_height;
        self.client_state.frozen_height = Height::zero();

        tracing::info!(
            chain_id = %self.client_state.chain_id,
            height = %self.client_state.latest_height,
            "client recovered from substitute"
        );
        Ok(())
    }
}

fn decode_client_message<T: serde::de::DeserializeOwned>(msg: &[u8]) -> Result<T, LightClientError> {
    serde_json::from_slice(msg).map_err(|e| LightClientError::InvalidClientMessage {
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ibc_eureka_commitment::MerkleProof;
    use ibc_eureka_merkle::SimpleMerkleTree;

    use super::*;
    use crate::test_utils::{
        client_state, consensus_state, signed_header, TestValidators, TRUSTING_PERIOD,
    };

    const T0: u64 = 1_700_000_000;

    /// The `ibc` store of a counterparty and the multistore root committing to it
    struct Counterparty {
        ibc: SimpleMerkleTree,
        multistore: SimpleMerkleTree,
    }

    impl Counterparty {
        fn new(entries: &[(&str, &[u8])]) -> Self {
            let ibc = SimpleMerkleTree::new(
                entries
                    .iter()
                    .map(|(k, v)| (k.as_bytes().to_vec(), v.to_vec()))
                    .collect(),
            );
            let multistore =
                SimpleMerkleTree::new(BTreeMap::from([(b"ibc".to_vec(), ibc.root())]));
            Self { ibc, multistore }
        }

        fn proof(&self, key: &str) -> Vec<u8> {
            let leaf = self
                .ibc
                .prove_existence(key.as_bytes())
                .or_else(|_| self.ibc.prove_non_existence(key.as_bytes()))
                .unwrap();
            MerkleProof {
                proofs: vec![leaf, self.multistore.prove_existence(b"ibc").unwrap()],
            }
            .to_bytes()
        }
    }

    fn path(key: &str) -> Vec<Vec<u8>> {
        vec![b"ibc".to_vec(), key.as_bytes().to_vec()]
    }

    fn h(height: u64) -> Height {
        Height::new(1, height)
    }

    fn client_at(root: Vec<u8>, validators: &TestValidators) -> TendermintLightClient {
        TendermintLightClient::new(client_state(h(90)), consensus_state(T0, root, validators))
            .unwrap()
    }

    #[test]
    fn membership_and_non_membership() {
        let validators = TestValidators::new(&[1, 2, 3], 10);
        let counterparty = Counterparty::new(&[("commitments/chanA/1", b"commitment".as_slice())]);
        let client = client_at(counterparty.multistore.root(), &validators);

        assert_eq!(
            client.verify_membership(
                h(90),
                &counterparty.proof("commitments/chanA/1"),
                &path("commitments/chanA/1"),
                b"commitment",
            ),
            Ok(T0)
        );
        assert_eq!(
            client.verify_non_membership(
                h(90),
                &counterparty.proof("receipts/chanB/1"),
                &path("receipts/chanB/1"),
            ),
            Ok(T0)
        );

        assert!(matches!(
            client.verify_membership(
                h(90),
                &counterparty.proof("commitments/chanA/1"),
                &path("commitments/chanA/1"),
                b"other",
            ),
            Err(LightClientError::VerificationFailed(_))
        ));
        assert_eq!(
            client.verify_membership(
                h(90),
                &counterparty.proof("commitments/chanA/1"),
                &path("commitments/chanA/1"),
                b"",
            ),
            Err(LightClientError::EmptyValue)
        );
        assert_eq!(
            client.verify_membership(
                h(91),
                &counterparty.proof("commitments/chanA/1"),
                &path("commitments/chanA/1"),
                b"commitment",
            ),
            Err(LightClientError::ConsensusStateNotFound(h(91)))
        );
        assert!(matches!(
            client.verify_membership(h(90), &[0xff, 0x01], &path("x"), b"commitment"),
            Err(LightClientError::InvalidProof(_))
        ));
    }

    #[test]
    fn conflicting_headers_at_same_height_freeze_the_client() {
        let validators = TestValidators::new(&[1, 2, 3], 10);
        let counterparty = Counterparty::new(&[("commitments/chanA/1", b"commitment".as_slice())]);
        let mut client = client_at(counterparty.multistore.root(), &validators);

        let header_a = signed_header(h(100), h(90), T0 + 5, vec![0xa; 32], &validators, &validators);
        let header_b = signed_header(h(100), h(90), T0 + 5, vec![0xb; 32], &validators, &validators);
        client
            .submit_misbehaviour(
                &Misbehaviour {
                    header_1: header_a,
                    header_2: header_b.clone(),
                },
                T0 + 10,
            )
            .unwrap();

        assert_eq!(client.status(T0 + 10), Status::Frozen);
        assert_eq!(client.client_state().frozen_height, h(100));
        assert_eq!(
            client.update_client(&header_b, T0 + 10),
            Err(LightClientError::ClientFrozen)
        );
        assert_eq!(
            client.verify_membership(
                h(90),
                &counterparty.proof("commitments/chanA/1"),
                &path("commitments/chanA/1"),
                b"commitment",
            ),
            Err(LightClientError::ClientFrozen)
        );
    }

    #[test]
    fn update_through_json_message() {
        let validators = TestValidators::new(&[1, 2, 3], 10);
        let mut client = client_at(vec![1; 32], &validators);

        let header = signed_header(h(100), h(90), T0 + 5, vec![2; 32], &validators, &validators);
        let msg = serde_json::to_vec(&header).unwrap();
        assert_eq!(client.update_client_msg(&msg, T0 + 10), Ok(UpdateResult::Update));
        assert_eq!(client.update_client_msg(&msg, T0 + 10), Ok(UpdateResult::NoOp));
        assert_eq!(client.client_state().latest_height, h(100));
        assert_eq!(client.consensus_heights().collect::<Vec<_>>(), vec![h(90), h(100)]);

        assert!(matches!(
            client.update_client_msg(b"{\"not\":\"a header\"}", T0 + 10),
            Err(LightClientError::InvalidClientMessage { .. })
        ));
        assert!(matches!(
            client.submit_misbehaviour_msg(b"[]", T0 + 10),
            Err(LightClientError::InvalidClientMessage { .. })
        ));
    }

    #[test]
    fn failed_update_leaves_state_untouched() {
        let validators = TestValidators::new(&[1, 2, 3], 10);
        let mut client = client_at(vec![1; 32], &validators);
        let before = client.clone();

        let mut header = signed_header(h(100), h(90), T0 + 5, vec![2; 32], &validators, &validators);
        header.signatures.truncate(1);
        assert!(client.update_client(&header, T0 + 10).is_err());
        assert_eq!(client.client_state(), before.client_state());
        assert_eq!(
            client.consensus_heights().collect::<Vec<_>>(),
            before.consensus_heights().collect::<Vec<_>>()
        );
    }

    #[test]
    fn status_expires_and_recovers() {
        let validators = TestValidators::new(&[1, 2, 3], 10);
        let mut subject = client_at(vec![1; 32], &validators);
        let now = T0 + TRUSTING_PERIOD;
        assert_eq!(subject.status(now - 1), Status::Active);
        assert_eq!(subject.status(now), Status::Expired);

        let mut substitute = TendermintLightClient::new(
            client_state(h(200)),
            consensus_state(now - 5, vec![7; 32], &validators),
        )
        .unwrap();
        subject.recover(&substitute, now).unwrap();
        assert_eq!(subject.status(now), Status::Active);
        assert_eq!(subject.client_state().latest_height, h(200));
        assert_eq!(subject.consensus_heights().collect::<Vec<_>>(), vec![h(200)]);

        // no longer ahead
        assert!(matches!(
            subject.recover(&substitute, now),
            Err(LightClientError::InvalidSubstitute { .. })
        ));

        let mut other_chain = client_state(h(300));
        other_chain.chain_id = "other-1".to_string();
        substitute = TendermintLightClient::new(
            other_chain,
            consensus_state(now, vec![7; 32], &validators),
        )
        .unwrap();
        assert!(matches!(
            subject.recover(&substitute, now),
            Err(LightClientError::InvalidSubstitute { .. })
        ));
    }

    #[test]
    fn rejects_invalid_genesis() {
        let validators = TestValidators::new(&[1], 10);
        let mut state = client_state(h(1));
        state.trusting_period = state.unbonding_period + 1;
        assert!(matches!(
            TendermintLightClient::new(state, consensus_state(T0, vec![1; 32], &validators)),
            Err(LightClientError::InvalidClientState { .. })
        ));
    }
}
