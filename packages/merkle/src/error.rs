//! Merkle verification and proof generation errors

use thiserror::Error;

/// Errors of the verifier and the proof producer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MerkleError {
    /// The proof does not prove the claim against the root
    #[error("verification failed: {reason}")]
    VerificationFailed {
        /// Why verification failed
        reason: String,
    },

    /// An existence proof was requested for a key not in the tree
    #[error("key not found in tree: {0}")]
    KeyNotFound(String),

    /// A non-existence proof was requested for a key present in the tree
    #[error("key exists in tree: {0}")]
    KeyExists(String),

    /// Nothing can be proven in an empty tree
    #[error("tree is empty")]
    EmptyTree,
}

impl MerkleError {
    pub(crate) fn verification(reason: impl ToString) -> Self {
        Self::VerificationFailed {
            reason: reason.to_string(),
        }
    }
}
