//! ICS24 store paths and commitment hashes
//!
//! Proofs are verified against these exact bytes, so every function here is part of the
//! wire protocol: paths are ASCII strings with decimal sequences and commitments are
//! SHA-256 digests prefixed with the IBC version byte.

use sha2::{Digest, Sha256};

use crate::{error::CodecError, packet::Packet, Payload};

/// Version byte prepended to packet and acknowledgement commitments
pub const IBC_VERSION: u8 = 0x02;

/// Value stored at a receipt path once a packet has been received
pub const RECEIPT_VALUE: [u8; 1] = [0x01];

/// Path prefix of packet commitments
pub const COMMITMENTS_PREFIX: &str = "commitments";
/// Path prefix of acknowledgement commitments
pub const ACKS_PREFIX: &str = "acks";
/// Path prefix of packet receipts
pub const RECEIPTS_PREFIX: &str = "receipts";
/// Path prefix of the per-channel send sequence counter
pub const NEXT_SEQUENCE_SEND_PREFIX: &str = "nextSequenceSend";

/// The literal whose hash is the universal error acknowledgement
const UNIVERSAL_ERROR_ACK_PREIMAGE: &[u8] = b"UNIVERSAL_ERROR_ACKNOWLEDGEMENT";

/// `commitments/{channel}/{sequence}`
#[must_use]
pub fn packet_commitment_path(channel_id: &str, sequence: u64) -> Vec<u8> {
    format!("{COMMITMENTS_PREFIX}/{channel_id}/{sequence}").into_bytes()
}

/// `acks/{channel}/{sequence}`
#[must_use]
pub fn packet_acknowledgement_path(channel_id: &str, sequence: u64) -> Vec<u8> {
    format!("{ACKS_PREFIX}/{channel_id}/{sequence}").into_bytes()
}

/// `receipts/{channel}/{sequence}`
#[must_use]
pub fn packet_receipt_path(channel_id: &str, sequence: u64) -> Vec<u8> {
    format!("{RECEIPTS_PREFIX}/{channel_id}/{sequence}").into_bytes()
}

/// `nextSequenceSend/{channel}`
#[must_use]
pub fn next_sequence_send_path(channel_id: &str) -> Vec<u8> {
    format!("{NEXT_SEQUENCE_SEND_PREFIX}/{channel_id}").into_bytes()
}

/// The universal error acknowledgement written when an application fails to receive
#[must_use]
pub fn universal_error_ack() -> Vec<u8> {
    Sha256::digest(UNIVERSAL_ERROR_ACK_PREIMAGE).to_vec()
}

/// Computes the packet commitment hash.
///
/// `sha256(0x02 || sha256(destChannel) || sha256(timeout) || sha256(h(p1) || ... || h(pn)))`
#[must_use]
pub fn packet_commitment_bytes32(packet: &Packet) -> [u8; 32] {
    let app_bytes: Vec<u8> = packet.payloads.iter().flat_map(hash_payload).collect();

    let mut hasher = Sha256::new();
    hasher.update([IBC_VERSION]);
    hasher.update(Sha256::digest(packet.dest_channel.as_bytes()));
    hasher.update(Sha256::digest(packet.timeout_timestamp.to_be_bytes()));
    hasher.update(Sha256::digest(&app_bytes));
    hasher.finalize().into()
}

fn hash_payload(payload: &Payload) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(Sha256::digest(payload.source_port.as_bytes()));
    hasher.update(Sha256::digest(payload.dest_port.as_bytes()));
    hasher.update(Sha256::digest(payload.version.as_bytes()));
    hasher.update(Sha256::digest(payload.encoding.as_bytes()));
    hasher.update(Sha256::digest(&payload.value));
    hasher.finalize().into()
}

/// Computes the acknowledgement commitment hash.
///
/// `sha256(0x02 || sha256(ack1) || ... || sha256(ackn))`
///
/// # Errors
/// Returns [`CodecError::NoAcknowledgements`] if `acks` is empty.
pub fn packet_acknowledgement_commitment_bytes32(
    acks: &[Vec<u8>],
) -> Result<[u8; 32], CodecError> {
    if acks.is_empty() {
        return Err(CodecError::NoAcknowledgements);
    }

    let mut hasher = Sha256::new();
    hasher.update([IBC_VERSION]);
    for ack in acks {
        hasher.update(Sha256::digest(ack));
    }
    Ok(hasher.finalize().into())
}

/// Appends `path` to the last element of a counterparty merkle prefix.
///
/// With the Cosmos SDK prefix `["ibc", ""]` this yields `["ibc", path]`.
///
/// # Errors
/// Returns [`CodecError::EmptyMerklePrefix`] if the prefix is empty.
pub fn prefixed_path(merkle_prefix: &[Vec<u8>], path: &[u8]) -> Result<Vec<Vec<u8>>, CodecError> {
    let mut result = merkle_prefix.to_vec();
    let last = result.last_mut().ok_or(CodecError::EmptyMerklePrefix)?;
    last.extend_from_slice(path);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_payload(value: &[u8]) -> Payload {
        Payload {
            source_port: "transfer".to_string(),
            dest_port: "transfer".to_string(),
            version: "ics20-1".to_string(),
            encoding: "application/json".to_string(),
            value: value.to_vec(),
        }
    }

    fn test_packet() -> Packet {
        Packet {
            sequence: 1,
            source_channel: "chanA".to_string(),
            dest_channel: "chanB".to_string(),
            timeout_timestamp: 1_700_000_000,
            payloads: vec![transfer_payload(br#"{"amount":"100"}"#)],
        }
    }

    #[test]
    fn paths_are_ascii_with_decimal_sequence() {
        assert_eq!(packet_commitment_path("chanA", 1), b"commitments/chanA/1");
        assert_eq!(packet_acknowledgement_path("chanB", 42), b"acks/chanB/42");
        assert_eq!(packet_receipt_path("chanB", 1_000), b"receipts/chanB/1000");
        assert_eq!(next_sequence_send_path("chanA"), b"nextSequenceSend/chanA");
    }

    #[test]
    fn packet_commitment_matches_layout() {
        let packet = test_packet();

        let payload = &packet.payloads[0];
        let payload_hash = Sha256::digest(
            [
                Sha256::digest(payload.source_port.as_bytes()),
                Sha256::digest(payload.dest_port.as_bytes()),
                Sha256::digest(payload.version.as_bytes()),
                Sha256::digest(payload.encoding.as_bytes()),
                Sha256::digest(&payload.value),
            ]
            .concat(),
        );
        let expected: [u8; 32] = Sha256::digest(
            [
                vec![IBC_VERSION],
                Sha256::digest(b"chanB").to_vec(),
                Sha256::digest(1_700_000_000u64.to_be_bytes()).to_vec(),
                Sha256::digest(payload_hash).to_vec(),
            ]
            .concat(),
        )
        .into();

        assert_eq!(packet_commitment_bytes32(&packet), expected);
        assert_eq!(packet.commitment(), expected);
    }

    #[test]
    fn packet_commitment_binds_every_field_but_source() {
        let packet = test_packet();
        let commitment = packet_commitment_bytes32(&packet);

        let mut other = packet.clone();
        other.timeout_timestamp += 1;
        assert_ne!(packet_commitment_bytes32(&other), commitment);

        let mut other = packet.clone();
        other.dest_channel = "chanC".to_string();
        assert_ne!(packet_commitment_bytes32(&other), commitment);

        let mut other = packet.clone();
        other.payloads[0].value.push(0);
        assert_ne!(packet_commitment_bytes32(&other), commitment);

        let mut other = packet.clone();
        other.payloads.push(transfer_payload(b"second"));
        assert_ne!(packet_commitment_bytes32(&other), commitment);

        // the sequence and source channel are bound by the path, not the value
        let mut other = packet;
        other.sequence = 9;
        other.source_channel = "chanZ".to_string();
        assert_eq!(packet_commitment_bytes32(&other), commitment);
    }

    #[test]
    fn ack_commitment() {
        assert_eq!(
            packet_acknowledgement_commitment_bytes32(&[]),
            Err(CodecError::NoAcknowledgements)
        );

        let acks = vec![b"ok".to_vec()];
        let expected: [u8; 32] =
            Sha256::digest([vec![IBC_VERSION], Sha256::digest(b"ok").to_vec()].concat()).into();
        assert_eq!(
            packet_acknowledgement_commitment_bytes32(&acks).unwrap(),
            expected
        );
    }

    #[test]
    fn universal_error_ack_is_hash_of_literal() {
        assert_eq!(
            universal_error_ack(),
            Sha256::digest(b"UNIVERSAL_ERROR_ACKNOWLEDGEMENT").to_vec()
        );
    }

    #[test]
    fn prefixed_path_appends_to_last_element() {
        let prefix = vec![b"ibc".to_vec(), Vec::new()];
        assert_eq!(
            prefixed_path(&prefix, b"commitments/chanA/1").unwrap(),
            vec![b"ibc".to_vec(), b"commitments/chanA/1".to_vec()]
        );

        let prefix = vec![b"store".to_vec(), b"ibc/".to_vec()];
        assert_eq!(
            prefixed_path(&prefix, b"acks/x/2").unwrap(),
            vec![b"store".to_vec(), b"ibc/acks/x/2".to_vec()]
        );

        assert_eq!(
            prefixed_path(&[], b"acks/x/2"),
            Err(CodecError::EmptyMerklePrefix)
        );
    }
}
