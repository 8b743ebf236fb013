//! Messages handled by the router

use ibc_eureka_commitment::{Height, Packet, Payload};
use serde::{Deserialize, Serialize};

/// Registers a channel and its counterparty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAddChannel {
    /// Local channel id
    pub channel_id: String,
    /// Channel id on the counterparty chain
    pub counterparty_channel_id: String,
    /// Light client of the counterparty chain
    pub client_id: String,
    /// Prefix of the counterparty's IBC store, e.g. `["ibc", ""]`
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes_vec")]
    pub merkle_prefix: Vec<Vec<u8>>,
}

/// Sends a packet from a local channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSendPacket {
    /// Local channel
    pub source_channel: String,
    /// Counterparty channel; must match the channel's registered counterparty
    pub dest_channel: String,
    /// Unix seconds after which the packet can no longer be received
    pub timeout_timestamp: u64,
    /// Application payloads
    pub payloads: Vec<Payload>,
    /// Sending account
    pub sender: String,
}

/// Receives a packet proven to be committed on the counterparty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRecvPacket {
    /// The packet
    pub packet: Packet,
    /// Proof of the packet commitment
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub proof_commitment: Vec<u8>,
    /// Counterparty height the proof is for
    pub proof_height: Height,
    /// Submitting relayer
    pub relayer: String,
}

/// Acknowledges a sent packet with the counterparty's acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAckPacket {
    /// The packet as it was sent
    pub packet: Packet,
    /// Acknowledgement written by the counterparty
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub acknowledgement: Vec<u8>,
    /// Proof of the acknowledgement commitment
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub proof_acked: Vec<u8>,
    /// Counterparty height the proof is for
    pub proof_height: Height,
    /// Submitting relayer
    pub relayer: String,
}

/// Times out a sent packet the counterparty never received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTimeoutPacket {
    /// The packet as it was sent
    pub packet: Packet,
    /// Proof of absence of the packet receipt
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub proof_timeout: Vec<u8>,
    /// Counterparty height the proof is for
    pub proof_height: Height,
    /// Submitting relayer
    pub relayer: String,
}

/// Updates a light client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateClient {
    /// Client to update
    pub client_id: String,
    /// Encoded client message
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub client_message: Vec<u8>,
}

/// Submits misbehaviour evidence to a light client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSubmitMisbehaviour {
    /// Client the evidence is for
    pub client_id: String,
    /// Encoded misbehaviour
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub misbehaviour: Vec<u8>,
}
