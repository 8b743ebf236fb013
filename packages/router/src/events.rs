//! Events emitted by the router, drained by the host once per block

use ibc_eureka_commitment::Packet;
use serde::{Deserialize, Serialize};

/// A router event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouterEvent {
    /// A packet was committed for sending
    SendPacket(Packet),
    /// A received packet's acknowledgement was committed
    WriteAcknowledgement {
        /// The received packet
        packet: Packet,
        /// One acknowledgement per payload
        #[serde(with = "ibc_eureka_utils::serde::hex_bytes_vec")]
        acknowledgements: Vec<Vec<u8>>,
    },
    /// A sent packet was acknowledged and its commitment deleted
    AcknowledgePacket(Packet),
    /// A sent packet timed out and its commitment was deleted
    TimeoutPacket(Packet),
}

impl RouterEvent {
    /// The packet the event is about
    #[must_use]
    pub const fn packet(&self) -> &Packet {
        match self {
            Self::SendPacket(packet)
            | Self::WriteAcknowledgement { packet, .. }
            | Self::AcknowledgePacket(packet)
            | Self::TimeoutPacket(packet) => packet,
        }
    }
}
