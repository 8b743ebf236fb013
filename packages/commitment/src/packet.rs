//! Packet and payload types

use serde::{Deserialize, Serialize};

/// One application payload carried by a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    /// Port of the sending application
    pub source_port: String,
    /// Port of the receiving application
    pub dest_port: String,
    /// Application version, e.g. `ics20-1`
    pub version: String,
    /// Encoding of `value`, e.g. `application/json`
    pub encoding: String,
    /// Application-encoded packet data
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub value: Vec<u8>,
}

/// A packet in flight between two channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Per source channel sequence, starting at 1
    pub sequence: u64,
    /// Channel on the sending chain
    pub source_channel: String,
    /// Channel on the receiving chain
    pub dest_channel: String,
    /// Unix seconds after which the packet can no longer be received
    pub timeout_timestamp: u64,
    /// Application payloads
    pub payloads: Vec<Payload>,
}

impl Packet {
    /// Path of this packet's commitment on the sending chain
    #[must_use]
    pub fn commitment_path(&self) -> Vec<u8> {
        crate::ics24::packet_commitment_path(&self.source_channel, self.sequence)
    }

    /// Path of this packet's receipt on the receiving chain
    #[must_use]
    pub fn receipt_path(&self) -> Vec<u8> {
        crate::ics24::packet_receipt_path(&self.dest_channel, self.sequence)
    }

    /// Path of this packet's acknowledgement commitment on the receiving chain
    #[must_use]
    pub fn ack_commitment_path(&self) -> Vec<u8> {
        crate::ics24::packet_acknowledgement_path(&self.dest_channel, self.sequence)
    }

    /// The commitment hash stored at [`Self::commitment_path`]
    #[must_use]
    pub fn commitment(&self) -> [u8; 32] {
        crate::ics24::packet_commitment_bytes32(self)
    }
}
