//! This module defines [`TxBuilder`], which builds the messages relaying one chain's events
//! to its counterparty.

use anyhow::{Context, Result};
use ibc_eureka_commitment::Height;
use ibc_eureka_router::msgs::{MsgAckPacket, MsgRecvPacket, MsgTimeoutPacket, MsgUpdateClient};
use serde::{Deserialize, Serialize};

use crate::{
    chain::{HeaderSource, StateQuery},
    events::EurekaEventWithHeight,
    utils::{
        inject_proofs, src_events_to_recv_and_ack_msgs, target_events_to_timeout_msgs,
        PROOF_HEIGHT_OFFSET,
    },
};

/// The channel pair and target client a [`TxBuilder`] relays over
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayPath {
    /// Channel on the source chain
    pub src_channel_id: String,
    /// Channel on the target chain
    pub dst_channel_id: String,
    /// Client of the source chain on the target chain
    pub dst_client_id: String,
}

/// A message for the target chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "msg", rename_all = "snake_case")]
pub enum RelayMsg {
    /// Client update making the proof height trusted
    UpdateClient(MsgUpdateClient),
    /// Timeout of a packet the target sent
    Timeout(MsgTimeoutPacket),
    /// Receipt of a packet the source sent
    Recv(MsgRecvPacket),
    /// Acknowledgement of a packet the target sent
    Ack(MsgAckPacket),
}

/// Proven messages for the target chain, in submission order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayBatch {
    /// Update of the target's client of the source, if the proof height is not yet trusted
    pub update: Option<MsgUpdateClient>,
    /// Timeouts of target packets
    pub timeout_msgs: Vec<MsgTimeoutPacket>,
    /// Receipts of source packets
    pub recv_msgs: Vec<MsgRecvPacket>,
    /// Acknowledgements of target packets
    pub ack_msgs: Vec<MsgAckPacket>,
}

impl RelayBatch {
    /// Whether there are no packet messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timeout_msgs.is_empty() && self.recv_msgs.is_empty() && self.ack_msgs.is_empty()
    }

    /// Messages in the order they must be submitted: the client update first
    #[must_use]
    pub fn into_msgs(self) -> Vec<RelayMsg> {
        self.update
            .into_iter()
            .map(RelayMsg::UpdateClient)
            .chain(self.timeout_msgs.into_iter().map(RelayMsg::Timeout))
            .chain(self.recv_msgs.into_iter().map(RelayMsg::Recv))
            .chain(self.ack_msgs.into_iter().map(RelayMsg::Ack))
            .collect()
    }
}

/// The `TxBuilder` produces relay messages for a target chain from the events of a source
/// chain and of the target itself.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    /// Where to relay
    pub path: RelayPath,
    /// The signer address for the messages
    pub signer_address: String,
}

impl TxBuilder {
    /// Creates a new `TxBuilder`.
    #[must_use]
    pub const fn new(path: RelayPath, signer_address: String) -> Self {
        Self {
            path,
            signer_address,
        }
    }

    /// Builds the messages relaying `src_events` (and timeouts for `target_events`) to the
    /// target chain.
    ///
    /// State is proven at the source's latest height minus [`PROOF_HEIGHT_OFFSET`] against
    /// the header at its latest height, which the batch's client update installs on top of
    /// `trusted_height`, the latest height the target's client already trusts. `now` is the
    /// time of that header.
    ///
    /// # Arguments
    /// - `src_packet_seqs` - The source packets to relay. All are relayed if empty.
    /// - `dst_packet_seqs` - The target packets to acknowledge or time out. All are relayed
    ///   if empty.
    ///
    /// # Errors
    /// Returns an error if the source has no provable state yet, its header cannot be
    /// built, or a proof cannot be produced.
    #[tracing::instrument(skip_all, fields(src_channel = %self.path.src_channel_id))]
    #[allow(clippy::too_many_arguments)]
    pub fn relay_events<C: StateQuery + HeaderSource + ?Sized>(
        &self,
        source: &C,
        src_events: Vec<EurekaEventWithHeight>,
        target_events: Vec<EurekaEventWithHeight>,
        trusted_height: Height,
        src_packet_seqs: &[u64],
        dst_packet_seqs: &[u64],
        now: u64,
    ) -> Result<RelayBatch> {
        let (mut recv_msgs, mut ack_msgs) = src_events_to_recv_and_ack_msgs(
            src_events,
            &self.path.src_channel_id,
            &self.path.dst_channel_id,
            src_packet_seqs,
            dst_packet_seqs,
            &self.signer_address,
            now,
        );
        let mut timeout_msgs = target_events_to_timeout_msgs(
            target_events,
            &self.path.src_channel_id,
            &self.path.dst_channel_id,
            dst_packet_seqs,
            &self.signer_address,
            now,
        );
        if recv_msgs.is_empty() && ack_msgs.is_empty() && timeout_msgs.is_empty() {
            tracing::debug!("no messages to relay");
            return Ok(RelayBatch::default());
        }

        let proof_height = source.latest_height();
        let query_height = proof_height
            .revision_height
            .checked_sub(PROOF_HEIGHT_OFFSET)
            .filter(|height| *height > 0)
            .map(|height| Height::new(proof_height.revision_number, height))
            .with_context(|| format!("no provable state below height {proof_height}"))?;

        inject_proofs(
            &mut recv_msgs,
            &mut ack_msgs,
            &mut timeout_msgs,
            source,
            query_height,
        )?;

        let update = if proof_height > trusted_height {
            let header = source
                .header(proof_height, trusted_height)
                .with_context(|| format!("failed to build header {proof_height}"))?;
            Some(MsgUpdateClient {
                client_id: self.path.dst_client_id.clone(),
                client_message: serde_json::to_vec(&header)?,
            })
        } else {
            None
        };

        tracing::info!(
            recv = recv_msgs.len(),
            ack = ack_msgs.len(),
            timeout = timeout_msgs.len(),
            %proof_height,
            "built relay batch"
        );
        Ok(RelayBatch {
            update,
            timeout_msgs,
            recv_msgs,
            ack_msgs,
        })
    }
}
