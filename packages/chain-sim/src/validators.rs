//! The validator set signing a simulated chain's headers

use ed25519_dalek::{Signer, SigningKey};
use ibc_eureka_light_client::{CommitSig, Header, Validator, ValidatorSet};

/// Validators with ed25519 keys derived from single byte seeds
#[derive(Debug, Clone)]
pub struct Validators {
    keys: Vec<SigningKey>,
    set: ValidatorSet,
}

impl Validators {
    /// One validator of `voting_power` per seed
    #[must_use]
    pub fn from_seeds(seeds: &[u8], voting_power: u64) -> Self {
        let keys: Vec<_> = seeds
            .iter()
            .map(|seed| SigningKey::from_bytes(&[*seed; 32]))
            .collect();
        let set = ValidatorSet {
            validators: keys
                .iter()
                .map(|key| Validator {
                    pub_key: key.verifying_key().to_bytes().to_vec(),
                    voting_power,
                })
                .collect(),
        };
        Self { keys, set }
    }

    /// The public validator set
    #[must_use]
    pub const fn set(&self) -> &ValidatorSet {
        &self.set
    }

    /// Hash of the validator set
    #[must_use]
    pub fn hash(&self) -> Vec<u8> {
        self.set.hash()
    }

    /// Replaces the header's commit with a signature from every validator
    pub fn sign(&self, header: &mut Header) {
        let sign_bytes = header.sign_bytes();
        header.signatures = self
            .keys
            .iter()
            .map(|key| CommitSig {
                pub_key: key.verifying_key().to_bytes().to_vec(),
                signature: key.sign(&sign_bytes).to_bytes().to_vec(),
            })
            .collect();
    }
}
