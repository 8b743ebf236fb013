//! Signed headers and validator sets

use ibc_eureka_commitment::Height;
use ibc_eureka_utils::ensure;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{consensus_state::ConsensusState, error::LightClientError};

/// A validator with its ed25519 key and voting power
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// ed25519 public key
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub pub_key: Vec<u8>,
    /// Voting power
    pub voting_power: u64,
}

/// An ordered validator set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    /// Validators in proposer order
    pub validators: Vec<Validator>,
}

impl ValidatorSet {
    /// `sha256` over every `pub_key || voting_power` in order
    #[must_use]
    pub fn hash(&self) -> Vec<u8> {
        let mut hasher = Sha256::new();
        for validator in &self.validators {
            hasher.update(&validator.pub_key);
            hasher.update(validator.voting_power.to_be_bytes());
        }
        hasher.finalize().to_vec()
    }

    /// Sum of all voting power
    #[must_use]
    pub fn total_power(&self) -> u64 {
        self.validators
            .iter()
            .fold(0u64, |acc, v| acc.saturating_add(v.voting_power))
    }

    /// Voting power of the validator with `pub_key`, if it is in the set
    #[must_use]
    pub fn power_of(&self, pub_key: &[u8]) -> Option<u64> {
        self.validators
            .iter()
            .find(|v| v.pub_key == pub_key)
            .map(|v| v.voting_power)
    }
}

/// One validator's signature over the header sign bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSig {
    /// ed25519 public key of the signer
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub pub_key: Vec<u8>,
    /// ed25519 signature
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub signature: Vec<u8>,
}

/// A counterparty header together with everything needed to verify it from a trusted height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Chain the header belongs to
    pub chain_id: String,
    /// Height of the header
    pub height: Height,
    /// Height of the consensus state this header is verified against
    pub trusted_height: Height,
    /// Block time in unix seconds
    pub timestamp: u64,
    /// App hash
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub root: Vec<u8>,
    /// Hash of `validator_set`
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub validators_hash: Vec<u8>,
    /// Hash of the validator set of the next block
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub next_validators_hash: Vec<u8>,
    /// Validators that signed this header
    pub validator_set: ValidatorSet,
    /// Validators of the trusted height's next block
    pub trusted_validator_set: ValidatorSet,
    /// Commit signatures
    pub signatures: Vec<CommitSig>,
}

impl Header {
    /// The bytes every validator signs.
    ///
    /// Big-endian layout: `len(chain_id) || chain_id || revision_number || revision_height ||
    /// timestamp || len(root) || root || validators_hash || next_validators_hash`.
    #[must_use]
    pub fn sign_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(
            8 * 5 + self.chain_id.len() + self.root.len() + self.validators_hash.len() * 2,
        );
        bytes.extend_from_slice(&(self.chain_id.len() as u64).to_be_bytes());
        bytes.extend_from_slice(self.chain_id.as_bytes());
        bytes.extend_from_slice(&self.height.revision_number.to_be_bytes());
        bytes.extend_from_slice(&self.height.revision_height.to_be_bytes());
        bytes.extend_from_slice(&self.timestamp.to_be_bytes());
        bytes.extend_from_slice(&(self.root.len() as u64).to_be_bytes());
        bytes.extend_from_slice(&self.root);
        bytes.extend_from_slice(&self.validators_hash);
        bytes.extend_from_slice(&self.next_validators_hash);
        bytes
    }

    /// The consensus state this header attests to
    #[must_use]
    pub fn consensus_state(&self) -> ConsensusState {
        ConsensusState {
            timestamp: self.timestamp,
            root: self.root.clone(),
            next_validators_hash: self.next_validators_hash.clone(),
        }
    }

    /// Whether this header is the direct successor of its trusted height
    #[must_use]
    pub const fn is_adjacent(&self) -> bool {
        self.height.revision_number == self.trusted_height.revision_number
            && self.height.revision_height == self.trusted_height.revision_height + 1
    }

    /// Checks that the header is internally consistent.
    ///
    /// # Errors
    /// Returns [`LightClientError::InvalidHeader`] on an empty root, a zero height, or a
    /// validator set that does not hash to `validators_hash`.
    pub fn validate_basic(&self) -> Result<(), LightClientError> {
        let invalid = |reason: &str| LightClientError::InvalidHeader {
            reason: reason.to_string(),
        };

        ensure!(!self.height.is_zero(), invalid("zero height"));
        ensure!(!self.root.is_empty(), invalid("empty root"));
        ensure!(
            !self.validator_set.validators.is_empty(),
            invalid("empty validator set")
        );
        ensure!(
            self.validator_set.hash() == self.validators_hash,
            invalid("validator set does not match validators hash")
        );
        Ok(())
    }
}
