//! Fixtures for light client tests: deterministic validators and signed headers

#[cfg(any(test, feature = "test-utils"))]
pub use fixtures::*;

#[allow(missing_docs, clippy::missing_panics_doc, clippy::must_use_candidate)]
#[cfg(any(test, feature = "test-utils"))]
mod fixtures {
    use ed25519_dalek::{Signer, SigningKey};
    use ibc_eureka_commitment::Height;
    use ibc_eureka_merkle::ProofSpecs;

    use crate::{
        client_state::{ClientState, TrustThreshold},
        consensus_state::ConsensusState,
        header::{CommitSig, Header, Validator, ValidatorSet},
    };

    pub const TEST_CHAIN_ID: &str = "test-chain-1";
    pub const TRUSTING_PERIOD: u64 = 1_000;
    pub const UNBONDING_PERIOD: u64 = 2_000;
    pub const MAX_CLOCK_DRIFT: u64 = 10;

    /// Validators whose signing keys are derived from single byte seeds
    #[derive(Debug, Clone)]
    pub struct TestValidators {
        keys: Vec<SigningKey>,
        set: ValidatorSet,
    }

    impl TestValidators {
        pub fn new(seeds: &[u8], power: u64) -> Self {
            let keys: Vec<SigningKey> = seeds
                .iter()
                .map(|seed| SigningKey::from_bytes(&[*seed; 32]))
                .collect();
            let set = ValidatorSet {
                validators: keys
                    .iter()
                    .map(|key| Validator {
                        pub_key: key.verifying_key().to_bytes().to_vec(),
                        voting_power: power,
                    })
                    .collect(),
            };
            Self { keys, set }
        }

        pub const fn set(&self) -> &ValidatorSet {
            &self.set
        }

        pub fn hash(&self) -> Vec<u8> {
            self.set.hash()
        }

        pub fn all_keys(&self) -> &[SigningKey] {
            &self.keys
        }

        pub fn signing_keys(&self, indices: &[usize]) -> Vec<SigningKey> {
            indices.iter().map(|i| self.keys[*i].clone()).collect()
        }
    }

    /// Appends a commit signature from every key
    pub fn sign_header(header: &mut Header, keys: &[SigningKey]) {
        let sign_bytes = header.sign_bytes();
        header.signatures.extend(keys.iter().map(|key| CommitSig {
            pub_key: key.verifying_key().to_bytes().to_vec(),
            signature: key.sign(&sign_bytes).to_bytes().to_vec(),
        }));
    }

    /// A header at `height` signed by all of `validators`, which also sign the next block
    pub fn signed_header(
        height: Height,
        trusted_height: Height,
        timestamp: u64,
        root: Vec<u8>,
        validators: &TestValidators,
        trusted_validators: &TestValidators,
    ) -> Header {
        let mut header = Header {
            chain_id: TEST_CHAIN_ID.to_string(),
            height,
            trusted_height,
            timestamp,
            root,
            validators_hash: validators.hash(),
            next_validators_hash: validators.hash(),
            validator_set: validators.set().clone(),
            trusted_validator_set: trusted_validators.set().clone(),
            signatures: vec![],
        };
        sign_header(&mut header, validators.all_keys());
        header
    }

    pub fn client_state(latest_height: Height) -> ClientState {
        ClientState {
            chain_id: TEST_CHAIN_ID.to_string(),
            trust_level: TrustThreshold::ONE_THIRD,
            trusting_period: TRUSTING_PERIOD,
            unbonding_period: UNBONDING_PERIOD,
            max_clock_drift: MAX_CLOCK_DRIFT,
            latest_height,
            frozen_height: Height::zero(),
            proof_specs: ProofSpecs::simple(2),
        }
    }

    pub fn consensus_state(timestamp: u64, root: Vec<u8>, validators: &TestValidators) -> ConsensusState {
        ConsensusState {
            timestamp,
            root,
            next_validators_hash: validators.hash(),
        }
    }
}
