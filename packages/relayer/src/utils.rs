//! Relayer utilities for turning router events into proven router messages.

use anyhow::{bail, ensure, Context, Result};
use ibc_eureka_commitment::{proof::convert_native_proof, Height, Packet};
use ibc_eureka_router::{
    msgs::{MsgAckPacket, MsgRecvPacket, MsgTimeoutPacket},
    RouterEvent,
};

use crate::{chain::StateQuery, events::EurekaEventWithHeight};

/// Store holding the router's provable state
pub const IBC_STORE_KEY: &[u8] = b"ibc";

/// Blocks between the state a proof is read from and the header committing to it.
///
/// The header at height `h` carries the app hash computed after block `h - 1`, so state
/// queried at `h - 1` is proven against the consensus state at `h`.
pub const PROOF_HEIGHT_OFFSET: u64 = 1;

/// Converts target chain events into timeout messages for packets the target never
/// received before their timeout.
///
/// `now` is the time of the latest source chain header the target client will know of.
/// An empty `dst_packet_seqs` selects every sequence.
#[must_use]
pub fn target_events_to_timeout_msgs(
    target_events: Vec<EurekaEventWithHeight>,
    src_channel_id: &str,
    dst_channel_id: &str,
    dst_packet_seqs: &[u64],
    signer_address: &str,
    now: u64,
) -> Vec<MsgTimeoutPacket> {
    target_events
        .into_iter()
        .filter_map(|e| match e.event {
            RouterEvent::SendPacket(packet)
                if now >= packet.timeout_timestamp
                    && packet.source_channel == dst_channel_id
                    && packet.dest_channel == src_channel_id
                    && selected(dst_packet_seqs, packet.sequence) =>
            {
                Some(MsgTimeoutPacket {
                    packet,
                    proof_timeout: vec![],
                    proof_height: Height::zero(),
                    relayer: signer_address.to_string(),
                })
            }
            _ => None,
        })
        .collect()
}

/// Converts source chain events into receive and acknowledgement messages for the
/// target chain.
///
/// Send events still within their timeout become receive messages; write
/// acknowledgement events become acknowledgement messages. Empty sequence filters
/// select every sequence. Proofs are left empty for [`inject_proofs`].
#[must_use]
pub fn src_events_to_recv_and_ack_msgs(
    src_events: Vec<EurekaEventWithHeight>,
    src_channel_id: &str,
    dst_channel_id: &str,
    src_packet_seqs: &[u64],
    dst_packet_seqs: &[u64],
    signer_address: &str,
    now: u64,
) -> (Vec<MsgRecvPacket>, Vec<MsgAckPacket>) {
    let (src_send_events, src_ack_events): (Vec<_>, Vec<_>) = src_events
        .into_iter()
        .filter(|e| match &e.event {
            RouterEvent::SendPacket(packet) => {
                packet.source_channel == src_channel_id
                    && packet.dest_channel == dst_channel_id
                    && selected(src_packet_seqs, packet.sequence)
            }
            RouterEvent::WriteAcknowledgement { packet, .. } => {
                packet.dest_channel == src_channel_id
                    && packet.source_channel == dst_channel_id
                    && selected(dst_packet_seqs, packet.sequence)
            }
            RouterEvent::AcknowledgePacket(_) | RouterEvent::TimeoutPacket(_) => false,
        })
        .partition(|e| matches!(e.event, RouterEvent::SendPacket(_)));

    let recv_msgs = src_send_events
        .into_iter()
        .filter_map(|e| match e.event {
            RouterEvent::SendPacket(packet) if packet.timeout_timestamp > now => {
                Some(MsgRecvPacket {
                    packet,
                    proof_commitment: vec![],
                    proof_height: Height::zero(),
                    relayer: signer_address.to_string(),
                })
            }
            RouterEvent::SendPacket(packet) => {
                tracing::debug!(
                    sequence = packet.sequence,
                    timeout = packet.timeout_timestamp,
                    "skipping timed out packet"
                );
                None
            }
            _ => None,
        })
        .collect();

    let ack_msgs = src_ack_events
        .into_iter()
        .filter_map(|e| match e.event {
            RouterEvent::WriteAcknowledgement {
                packet,
                mut acknowledgements,
            } => {
                if acknowledgements.len() != 1 {
                    tracing::warn!(
                        sequence = packet.sequence,
                        count = acknowledgements.len(),
                        "skipping acknowledgement without exactly one entry"
                    );
                    return None;
                }
                Some(MsgAckPacket {
                    packet,
                    acknowledgement: acknowledgements.remove(0),
                    proof_acked: vec![],
                    proof_height: Height::zero(),
                    relayer: signer_address.to_string(),
                })
            }
            _ => None,
        })
        .collect();

    (recv_msgs, ack_msgs)
}

/// Fills in the proofs of relay messages from the source chain state at `query_height`.
///
/// Every message gets proof height `query_height + PROOF_HEIGHT_OFFSET`, the height whose
/// consensus state commits to the queried state.
///
/// # Errors
/// Returns an error if a query fails, a committed value the message relies on is missing,
/// or a receipt a timeout relies on being absent is present.
#[tracing::instrument(skip_all, fields(query_height = %query_height))]
pub fn inject_proofs<Q: StateQuery + ?Sized>(
    recv_msgs: &mut [MsgRecvPacket],
    ack_msgs: &mut [MsgAckPacket],
    timeout_msgs: &mut [MsgTimeoutPacket],
    source: &Q,
    query_height: Height,
) -> Result<()> {
    let proof_height = query_height.increment_by(PROOF_HEIGHT_OFFSET);

    for msg in recv_msgs.iter_mut() {
        let (value, proof) = prove(source, &msg.packet.commitment_path(), query_height)?;
        ensure!(!value.is_empty(), missing(&msg.packet, "packet commitment"));
        msg.proof_commitment = proof;
        msg.proof_height = proof_height;
    }

    for msg in ack_msgs.iter_mut() {
        let (value, proof) = prove(source, &msg.packet.ack_commitment_path(), query_height)?;
        ensure!(!value.is_empty(), missing(&msg.packet, "acknowledgement"));
        msg.proof_acked = proof;
        msg.proof_height = proof_height;
    }

    for msg in timeout_msgs.iter_mut() {
        let (value, proof) = prove(source, &msg.packet.receipt_path(), query_height)?;
        if !value.is_empty() {
            bail!(
                "non-membership value is not empty: packet {}/{} was received",
                msg.packet.dest_channel,
                msg.packet.sequence
            );
        }
        msg.proof_timeout = proof;
        msg.proof_height = proof_height;
    }

    tracing::debug!(
        recv = recv_msgs.len(),
        ack = ack_msgs.len(),
        timeout = timeout_msgs.len(),
        %proof_height,
        "injected proofs"
    );
    Ok(())
}

/// The value under `path` in the ibc store and its encoded merkle proof
fn prove<Q: StateQuery + ?Sized>(
    source: &Q,
    path: &[u8],
    height: Height,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let (value, proof_ops, proven_height) = source
        .query(&[IBC_STORE_KEY.to_vec(), path.to_vec()], height)
        .with_context(|| format!("failed to query {}", String::from_utf8_lossy(path)))?;
    ensure!(
        proven_height == height,
        "queried height {height}, got a proof for {proven_height}"
    );
    let proof = convert_native_proof(&proof_ops).context("failed to convert proof")?;
    Ok((value, proof.to_bytes()))
}

fn missing(packet: &Packet, what: &str) -> String {
    format!(
        "membership value is empty: no {what} for packet {}/{}",
        packet.source_channel, packet.sequence
    )
}

fn selected(seqs: &[u64], sequence: u64) -> bool {
    seqs.is_empty() || seqs.contains(&sequence)
}
