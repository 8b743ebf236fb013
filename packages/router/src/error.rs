//! Router errors

use ibc_eureka_commitment::CodecError;
use ibc_eureka_light_client::{LightClientError, Status};

use crate::app::AppError;

/// Errors returned by the router. A failed operation leaves the store untouched.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The caller is not the router owner
    #[error("unauthorized: {caller} is not the router owner")]
    Unauthorized {
        /// The rejected caller
        caller: String,
    },
    /// A channel with this id is already registered
    #[error("channel already exists: {0}")]
    ChannelAlreadyExists(String),
    /// No channel with this id is registered
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    /// A client with this id is already registered
    #[error("client already exists: {0}")]
    ClientAlreadyExists(String),
    /// No client with this id is registered
    #[error("client not found: {0}")]
    ClientNotFound(String),
    /// The counterparty channel of a packet does not match the registered one
    #[error("invalid counterparty: expected {expected}, got {actual}")]
    InvalidCounterparty {
        /// Registered counterparty channel
        expected: String,
        /// Channel named by the packet
        actual: String,
    },
    /// The channel's client cannot be used
    #[error("client {client_id} is not active: {status:?}")]
    ClientNotActive {
        /// The client
        client_id: String,
        /// Its current status
        status: Status,
    },
    /// An application is already bound to this port
    #[error("port already exists: {0}")]
    PortAlreadyExists(String),
    /// No application is bound to this port
    #[error("port not found: {0}")]
    PortNotFound(String),
    /// Only single payload packets are supported
    #[error("multi-payload packets are not supported: got {0} payloads")]
    MultiPayloadNotSupported(usize),
    /// The packet carries no payload
    #[error("packet has no payloads")]
    NoPayloads,
    /// The send timeout is in the past or too far in the future
    #[error("invalid timeout: {reason}")]
    InvalidTimeout {
        /// Why the timeout was rejected
        reason: String,
    },
    /// The packet's timeout has passed on the receiving chain
    #[error("packet timed out at {timeout}, now {now}")]
    PacketTimedOut {
        /// Packet timeout
        timeout: u64,
        /// Receiving chain time
        now: u64,
    },
    /// A receipt for the packet already exists
    #[error("packet {channel}/{sequence} already received")]
    PacketAlreadyReceived {
        /// Destination channel
        channel: String,
        /// Packet sequence
        sequence: u64,
    },
    /// The packet commitment was already deleted by an acknowledgement or timeout
    #[error("packet {channel}/{sequence} already acknowledged or timed out")]
    AckAlreadyProcessed {
        /// Source channel
        channel: String,
        /// Packet sequence
        sequence: u64,
    },
    /// No commitment exists for the packet
    #[error("packet commitment not found for {channel}/{sequence}")]
    PacketCommitmentNotFound {
        /// Source channel
        channel: String,
        /// Packet sequence
        sequence: u64,
    },
    /// The stored commitment differs from the hash of the submitted packet
    #[error("packet commitment mismatch")]
    PacketCommitmentMismatch,
    /// The timeout proof is for a height before the packet timed out
    #[error("timeout not reached: packet times out at {timeout}, proof is at {proof_timestamp}")]
    TimeoutNotReached {
        /// Packet timeout
        timeout: u64,
        /// Consensus timestamp at the proof height
        proof_timestamp: u64,
    },
    /// A counterparty proof failed to verify
    #[error("proof verification failed: {0}")]
    ProofVerificationFailed(#[source] LightClientError),
    /// A client update or misbehaviour submission failed
    #[error("light client error: {0}")]
    LightClient(#[from] LightClientError),
    /// A path or commitment could not be built
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// An application callback aborted the operation
    #[error("application callback on port {port} failed: {source}")]
    AppCallback {
        /// Port of the application
        port: String,
        /// The application's error
        #[source]
        source: AppError,
    },
    /// The channel handed out its last sequence
    #[error("no packet sequences left on channel {0}")]
    SequenceExhausted(String),
    /// Stored router state could not be decoded
    #[error("corrupted store entry {key}: {reason}")]
    CorruptedStore {
        /// Store key
        key: String,
        /// Decoding failure
        reason: String,
    },
}
