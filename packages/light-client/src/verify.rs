//! Commit signature verification

use std::collections::HashSet;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::{
    client_state::TrustThreshold, consensus_state::ConsensusState, error::LightClientError,
    header::Header,
};

/// Verifies that a header is signed by enough of the right validators
pub trait HeaderVerifier {
    /// Verifies the commit of `header` against the `trusted` consensus state.
    ///
    /// # Errors
    /// Returns an error if the signatures do not carry the header.
    fn verify_header(
        &self,
        header: &Header,
        trusted: &ConsensusState,
        trust_level: TrustThreshold,
    ) -> Result<(), LightClientError>;
}

/// [`HeaderVerifier`] for ed25519 validator sets
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519HeaderVerifier;

impl HeaderVerifier for Ed25519HeaderVerifier {
    fn verify_header(
        &self,
        header: &Header,
        trusted: &ConsensusState,
        trust_level: TrustThreshold,
    ) -> Result<(), LightClientError> {
        if header.trusted_validator_set.hash() != trusted.next_validators_hash {
            return Err(LightClientError::InvalidTrustedValidators);
        }
        if header.is_adjacent() && header.validators_hash != trusted.next_validators_hash {
            return Err(LightClientError::InvalidHeader {
                reason: "adjacent header must be signed by the trusted next validators".to_string(),
            });
        }

        let signers = verified_signers(header)?;

        if !header.is_adjacent() {
            let trusted_set = &header.trusted_validator_set;
            let signed = tally(&signers, |key| trusted_set.power_of(key));
            if !trust_level.is_exceeded_by(signed, trusted_set.total_power()) {
                return Err(LightClientError::InsufficientVotingPower {
                    reason: format!(
                        "trusted validators signed {signed} of {}, need more than {trust_level}",
                        trusted_set.total_power()
                    ),
                });
            }
        }

        let own_set = &header.validator_set;
        let signed = tally(&signers, |key| own_set.power_of(key));
        let two_thirds = TrustThreshold {
            numerator: 2,
            denominator: 3,
        };
        if !two_thirds.is_exceeded_by(signed, own_set.total_power()) {
            return Err(LightClientError::InsufficientVotingPower {
                reason: format!(
                    "validators signed {signed} of {}, need more than 2/3",
                    own_set.total_power()
                ),
            });
        }

        tracing::debug!(
            height = %header.height,
            signers = signers.len(),
            "header signatures verified"
        );
        Ok(())
    }
}

/// Checks every commit signature and returns the keys that signed
fn verified_signers(header: &Header) -> Result<Vec<&[u8]>, LightClientError> {
    let invalid = |reason: String| LightClientError::InvalidSignatures { reason };
    let sign_bytes = header.sign_bytes();

    let mut seen = HashSet::new();
    header
        .signatures
        .iter()
        .map(|commit_sig| {
            let key_hex = hex_prefix(&commit_sig.pub_key);
            if !seen.insert(commit_sig.pub_key.as_slice()) {
                return Err(invalid(format!("duplicate signer {key_hex}")));
            }

            let key_bytes: &[u8; 32] = commit_sig
                .pub_key
                .as_slice()
                .try_into()
                .map_err(|_| invalid(format!("malformed public key {key_hex}")))?;
            let key = VerifyingKey::from_bytes(key_bytes)
                .map_err(|e| invalid(format!("malformed public key {key_hex}: {e}")))?;
            let signature = Signature::from_slice(&commit_sig.signature)
                .map_err(|e| invalid(format!("malformed signature from {key_hex}: {e}")))?;

            key.verify(&sign_bytes, &signature)
                .map_err(|_| invalid(format!("bad signature from {key_hex}")))?;
            Ok(commit_sig.pub_key.as_slice())
        })
        .collect()
}

fn tally(signers: &[&[u8]], power_of: impl Fn(&[u8]) -> Option<u64>) -> u64 {
    signers
        .iter()
        .filter_map(|key| power_of(*key))
        .fold(0u64, u64::saturating_add)
}

fn hex_prefix(key: &[u8]) -> String {
    key.iter().take(4).map(|b| format!("{b:02x}")).collect()
}
