//! Error types for the light client

use ibc_eureka_commitment::{CodecError, Height};
use ibc_eureka_merkle::MerkleError;
use thiserror::Error;

/// Errors returned by client creation, updates, misbehaviour handling and membership
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LightClientError {
    /// The client state failed validation
    #[error("invalid client state: {reason}")]
    InvalidClientState {
        /// Which parameter is invalid
        reason: String,
    },

    /// The client has been frozen by misbehaviour
    #[error("client is frozen")]
    ClientFrozen,

    /// No consensus state is stored at the header's trusted height
    #[error("trusted consensus state not found at height {0}")]
    TrustedHeightNotFound(Height),

    /// The header timestamp is beyond the allowed clock drift
    #[error("header timestamp {timestamp} is in the future (now {now})")]
    HeaderInFuture {
        /// Header timestamp
        timestamp: u64,
        /// Host time
        now: u64,
    },

    /// The header or its trusted state is outside the trusting period
    #[error("header expired: {reason}")]
    HeaderExpired {
        /// Which bound was crossed
        reason: String,
    },

    /// The header does not advance past its trusted height
    #[error("header height {height} is not greater than trusted height {trusted_height}")]
    NonIncreasingHeight {
        /// Header height
        height: Height,
        /// Trusted height the header builds on
        trusted_height: Height,
    },

    /// The header is for another chain
    #[error("chain id mismatch: expected {expected}, got {actual}")]
    ChainIdMismatch {
        /// Tracked chain id
        expected: String,
        /// Header chain id
        actual: String,
    },

    /// The header is internally inconsistent
    #[error("invalid header: {reason}")]
    InvalidHeader {
        /// What is inconsistent
        reason: String,
    },

    /// A commit signature is duplicated, malformed or does not verify
    #[error("invalid signatures: {reason}")]
    InvalidSignatures {
        /// Which signature failed
        reason: String,
    },

    /// The trusted validator set does not hash to the trusted next validators hash
    #[error("trusted validator set does not match the trusted consensus state")]
    InvalidTrustedValidators,

    /// Not enough voting power signed the header
    #[error("insufficient voting power: {reason}")]
    InsufficientVotingPower {
        /// Which tally fell short
        reason: String,
    },

    /// The evidence does not show misbehaviour
    #[error("misbehaviour not detected")]
    MisbehaviourNotDetected,

    /// No consensus state is stored at the proof height
    #[error("consensus state not found at height {0}")]
    ConsensusStateNotFound(Height),

    /// Membership proofs must prove a non-empty value
    #[error("membership value is empty")]
    EmptyValue,

    /// The proof bytes are not a merkle proof
    #[error("invalid proof: {0}")]
    InvalidProof(#[from] CodecError),

    /// The proof does not verify against the consensus root
    #[error("proof verification failed: {0}")]
    VerificationFailed(#[from] MerkleError),

    /// A client message could not be decoded
    #[error("invalid client message: {reason}")]
    InvalidClientMessage {
        /// Decoder error
        reason: String,
    },

    /// The substitute client cannot replace the subject
    #[error("invalid substitute client: {reason}")]
    InvalidSubstitute {
        /// Why the substitute was rejected
        reason: String,
    },
}
