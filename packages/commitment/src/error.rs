//! Error types for the commitment codecs

use thiserror::Error;

/// Errors returned by the encoders, decoders and path helpers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The bytes are not the canonical encoding of the expected structure
    #[error("malformed encoding: {reason}")]
    MalformedEncoding {
        /// What did not match
        reason: String,
    },

    /// The payload names an encoding this codec does not speak
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// A native proof operation could not be mapped onto an ICS-23 proof
    #[error("proof conversion failed: {reason}")]
    ProofConversionError {
        /// Which operation failed and why
        reason: String,
    },

    /// A counterparty merkle prefix must have at least one element
    #[error("empty merkle prefix")]
    EmptyMerklePrefix,

    /// An acknowledgement commitment needs at least one acknowledgement
    #[error("no acknowledgements provided")]
    NoAcknowledgements,

    /// A height string was not of the form `{revision}-{height}`
    #[error("invalid height `{0}`")]
    InvalidHeight(String),
}

impl CodecError {
    pub(crate) fn malformed(reason: impl ToString) -> Self {
        Self::MalformedEncoding {
            reason: reason.to_string(),
        }
    }

    pub(crate) fn conversion(reason: impl ToString) -> Self {
        Self::ProofConversionError {
            reason: reason.to_string(),
        }
    }
}
