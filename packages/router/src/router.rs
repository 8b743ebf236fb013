//! The packet lifecycle state machine of one chain

use std::collections::BTreeMap;

use ibc_eureka_commitment::{
    ics24::{self, RECEIPT_VALUE},
    Packet, Payload,
};
use ibc_eureka_light_client::{LightClientError, Status, TendermintLightClient, UpdateResult};
use ibc_eureka_utils::ensure;
use serde::{Deserialize, Serialize};

use crate::{
    app::{CallbackContext, IbcApp},
    error::RouterError,
    events::RouterEvent,
    light_client::{LightClient, MembershipMsg},
    msgs::{
        MsgAckPacket, MsgAddChannel, MsgRecvPacket, MsgSendPacket, MsgSubmitMisbehaviour,
        MsgTimeoutPacket, MsgUpdateClient,
    },
    store::{MemStore, Store, Transaction},
};

/// Default upper bound on how far in the future a send timeout may lie, in seconds
pub const DEFAULT_MAX_TIMEOUT_DURATION: u64 = 86_400;

/// Store prefix of registered channels
pub const CHANNELS_PREFIX: &str = "channels";

/// Highest sequence a channel hands out. Sequences are `uint32` on the wire.
pub const MAX_SEQUENCE: u64 = 0xFFFF_FFFF;

/// Router parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Upper bound on `timeout_timestamp - now` for sends, in seconds
    #[serde(default = "default_max_timeout_duration")]
    pub max_timeout_duration: u64,
}

const fn default_max_timeout_duration() -> u64 {
    DEFAULT_MAX_TIMEOUT_DURATION
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_timeout_duration: DEFAULT_MAX_TIMEOUT_DURATION,
        }
    }
}

/// A registered channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel id on the counterparty chain
    pub counterparty_channel_id: String,
    /// Light client of the counterparty chain
    pub client_id: String,
    /// Prefix of the counterparty's IBC store
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes_vec")]
    pub merkle_prefix: Vec<Vec<u8>>,
}

/// The IBC router of one chain.
///
/// Owns the provable store, the light clients of counterparty chains and the
/// applications bound to ports. Lifecycle operations either apply all their writes or
/// none of them.
pub struct Router<C = TendermintLightClient, S = MemStore> {
    owner: String,
    config: RouterConfig,
    store: S,
    clients: BTreeMap<String, C>,
    apps: BTreeMap<String, Box<dyn IbcApp>>,
    events: Vec<RouterEvent>,
}

impl<C, S: Store + Default> Router<C, S> {
    /// Creates a router over an empty store
    #[must_use]
    pub fn new(owner: impl Into<String>, config: RouterConfig) -> Self {
        Self::with_store(owner, config, S::default())
    }
}

impl<C, S: Store> Router<C, S> {
    /// Creates a router over `store`
    #[must_use]
    pub fn with_store(owner: impl Into<String>, config: RouterConfig, store: S) -> Self {
        Self {
            owner: owner.into(),
            config,
            store,
            clients: BTreeMap::new(),
            apps: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// The account allowed to register clients, channels and applications
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Router parameters
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The provable store
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The client registered under `client_id`
    #[must_use]
    pub fn client(&self, client_id: &str) -> Option<&C> {
        self.clients.get(client_id)
    }

    /// Takes the events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<RouterEvent> {
        std::mem::take(&mut self.events)
    }

    /// The channel registered under `channel_id`
    ///
    /// # Errors
    /// Returns [`RouterError::ChannelNotFound`] if no such channel exists.
    pub fn channel(&self, channel_id: &str) -> Result<Channel, RouterError> {
        let key = channel_path(channel_id);
        let bytes = self
            .store
            .get(&key)
            .ok_or_else(|| RouterError::ChannelNotFound(channel_id.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| corrupted(&key, &e))
    }

    /// The sequence the next packet sent on `channel_id` will get
    ///
    /// # Errors
    /// Returns [`RouterError::CorruptedStore`] if the stored sequence is malformed.
    pub fn next_sequence_send(&self, channel_id: &str) -> Result<u64, RouterError> {
        next_sequence_send(&self.store, channel_id)
    }

    /// The commitment stored for a sent packet, if it was neither acknowledged nor timed out
    #[must_use]
    pub fn packet_commitment(&self, channel_id: &str, sequence: u64) -> Option<Vec<u8>> {
        self.store
            .get(&ics24::packet_commitment_path(channel_id, sequence))
    }

    /// Whether a packet was received on `channel_id`
    #[must_use]
    pub fn has_packet_receipt(&self, channel_id: &str, sequence: u64) -> bool {
        self.store
            .has(&ics24::packet_receipt_path(channel_id, sequence))
    }

    /// The acknowledgement commitment written for a received packet
    #[must_use]
    pub fn packet_acknowledgement(&self, channel_id: &str, sequence: u64) -> Option<Vec<u8>> {
        self.store
            .get(&ics24::packet_acknowledgement_path(channel_id, sequence))
    }

    /// Binds `app` to `port_id`
    ///
    /// # Errors
    /// Returns [`RouterError::Unauthorized`] unless called by the owner, or
    /// [`RouterError::PortAlreadyExists`] if the port is taken.
    pub fn add_app(
        &mut self,
        caller: &str,
        port_id: &str,
        app: Box<dyn IbcApp>,
    ) -> Result<(), RouterError> {
        self.ensure_owner(caller)?;
        ensure!(
            !self.apps.contains_key(port_id),
            RouterError::PortAlreadyExists(port_id.to_string())
        );

        self.apps.insert(port_id.to_string(), app);
        tracing::info!(port_id, "application added");
        Ok(())
    }
}

impl<C: LightClient, S: Store> Router<C, S> {
    /// Registers the light client of a counterparty chain
    ///
    /// # Errors
    /// Returns [`RouterError::Unauthorized`] unless called by the owner, or
    /// [`RouterError::ClientAlreadyExists`] if the id is taken.
    pub fn add_client(&mut self, caller: &str, client_id: &str, client: C) -> Result<(), RouterError> {
        self.ensure_owner(caller)?;
        ensure!(
            !self.clients.contains_key(client_id),
            RouterError::ClientAlreadyExists(client_id.to_string())
        );

        tracing::info!(client_id, height = %client.latest_height(), "client added");
        self.clients.insert(client_id.to_string(), client);
        Ok(())
    }

    /// Registers a channel and persists it in the provable store
    ///
    /// # Errors
    /// Returns [`RouterError::Unauthorized`] unless called by the owner,
    /// [`RouterError::ChannelAlreadyExists`] if the id is taken,
    /// [`RouterError::ClientNotFound`] for an unknown client or
    /// [`RouterError::Codec`] for an empty merkle prefix.
    pub fn add_channel(&mut self, caller: &str, msg: MsgAddChannel) -> Result<(), RouterError> {
        self.ensure_owner(caller)?;
        let key = channel_path(&msg.channel_id);
        ensure!(
            !self.store.has(&key),
            RouterError::ChannelAlreadyExists(msg.channel_id)
        );
        ensure!(
            self.clients.contains_key(&msg.client_id),
            RouterError::ClientNotFound(msg.client_id)
        );
        // rejects an empty prefix
        ics24::prefixed_path(&msg.merkle_prefix, &[])?;

        let channel = Channel {
            counterparty_channel_id: msg.counterparty_channel_id,
            client_id: msg.client_id,
            merkle_prefix: msg.merkle_prefix,
        };
        let value = serde_json::to_vec(&channel).map_err(|e| corrupted(&key, &e))?;
        self.store.set(key, value);

        tracing::info!(
            channel_id = %msg.channel_id,
            counterparty_channel_id = %channel.counterparty_channel_id,
            client_id = %channel.client_id,
            "channel added"
        );
        Ok(())
    }

    /// Passes a client message to the light client
    ///
    /// # Errors
    /// Returns [`RouterError::ClientNotFound`] or the light client's error.
    pub fn update_client(&mut self, msg: &MsgUpdateClient, now: u64) -> Result<UpdateResult, RouterError> {
        let client = self.client_mut(&msg.client_id)?;
        let result = client.update_client(&msg.client_message, now)?;
        match result {
            UpdateResult::Update => tracing::info!(
                client_id = %msg.client_id,
                height = %client.latest_height(),
                "client updated"
            ),
            UpdateResult::NoOp => tracing::debug!(client_id = %msg.client_id, "client update was a no-op"),
            UpdateResult::Misbehaviour => {
                tracing::warn!(client_id = %msg.client_id, "conflicting update, client frozen");
            }
        }
        Ok(result)
    }

    /// Passes misbehaviour evidence to the light client
    ///
    /// # Errors
    /// Returns [`RouterError::ClientNotFound`] or the light client's error.
    pub fn submit_misbehaviour(&mut self, msg: &MsgSubmitMisbehaviour, now: u64) -> Result<(), RouterError> {
        self.client_mut(&msg.client_id)?
            .submit_misbehaviour(&msg.misbehaviour, now)?;
        tracing::warn!(client_id = %msg.client_id, "misbehaviour submitted, client frozen");
        Ok(())
    }

    /// Replaces the state of `subject_id` with that of `substitute_id`
    ///
    /// # Errors
    /// Returns [`RouterError::Unauthorized`] unless called by the owner,
    /// [`RouterError::ClientNotFound`] for unknown ids or the light client's error.
    pub fn recover_client(
        &mut self,
        caller: &str,
        subject_id: &str,
        substitute_id: &str,
        now: u64,
    ) -> Result<(), RouterError> {
        self.ensure_owner(caller)?;
        ensure!(
            subject_id != substitute_id,
            RouterError::LightClient(LightClientError::InvalidSubstitute {
                reason: "substitute is the subject".to_string(),
            })
        );
        let substitute = self
            .clients
            .remove(substitute_id)
            .ok_or_else(|| RouterError::ClientNotFound(substitute_id.to_string()))?;
        let result = self
            .client_mut(subject_id)
            .and_then(|subject| {
                subject
                    .recover(&substitute, now)
                    .map_err(RouterError::LightClient)
            });
        self.clients.insert(substitute_id.to_string(), substitute);
        result?;

        tracing::info!(subject_id, substitute_id, "client recovered");
        Ok(())
    }

    /// Commits a packet for sending and returns its sequence
    ///
    /// # Errors
    /// Fails on unknown or mismatched channels, an inactive client, an out of range
    /// timeout, an unknown port or a refusing application.
    pub fn send_packet(&mut self, msg: MsgSendPacket, now: u64) -> Result<u64, RouterError> {
        single_payload(&msg.payloads)?;
        let channel = self.channel(&msg.source_channel)?;
        ensure_counterparty(&channel, &msg.dest_channel)?;
        self.active_client(&channel.client_id, now)?;
        ensure!(
            msg.timeout_timestamp > now,
            RouterError::InvalidTimeout {
                reason: format!(
                    "timeout {} is not after block time {now}",
                    msg.timeout_timestamp
                ),
            }
        );
        ensure!(
            msg.timeout_timestamp - now <= self.config.max_timeout_duration,
            RouterError::InvalidTimeout {
                reason: format!(
                    "timeout {} is more than {}s after block time {now}",
                    msg.timeout_timestamp, self.config.max_timeout_duration
                ),
            }
        );

        let mut tx = Transaction::new(&self.store);
        let sequence = next_sequence_send(&tx, &msg.source_channel)?;
        let packet = Packet {
            sequence,
            source_channel: msg.source_channel,
            dest_channel: msg.dest_channel,
            timeout_timestamp: msg.timeout_timestamp,
            payloads: msg.payloads,
        };
        let payload = single_payload(&packet.payloads)?;
        let app = self
            .apps
            .get_mut(&payload.source_port)
            .ok_or_else(|| RouterError::PortNotFound(payload.source_port.clone()))?;

        ensure!(
            sequence <= MAX_SEQUENCE,
            RouterError::SequenceExhausted(packet.source_channel.clone())
        );
        let next_key = ics24::next_sequence_send_path(&packet.source_channel);
        let next = sequence
            .checked_add(1)
            .ok_or_else(|| corrupted(&next_key, &"sequence overflow"))?;
        tx.set(next_key, next.to_be_bytes().to_vec());
        tx.set(packet.commitment_path(), packet.commitment().to_vec());

        let ctx = CallbackContext {
            source_channel: &packet.source_channel,
            dest_channel: &packet.dest_channel,
            sequence,
            payload,
            signer: &msg.sender,
        };
        app.on_send_packet(&ctx)
            .map_err(|source| RouterError::AppCallback {
                port: payload.source_port.clone(),
                source,
            })?;

        let writes = tx.into_writes();
        self.store.apply(writes);

        tracing::info!(
            source_channel = %packet.source_channel,
            sequence,
            timeout = packet.timeout_timestamp,
            "packet sent"
        );
        self.events.push(RouterEvent::SendPacket(packet));
        Ok(sequence)
    }

    /// Receives a packet committed on the counterparty and returns the acknowledgement
    /// written for it
    ///
    /// # Errors
    /// Fails on unknown or mismatched channels, an inactive client, an expired timeout,
    /// a replay, an invalid proof or an unknown port. A failing application does not fail
    /// the receive; it results in the universal error acknowledgement.
    pub fn recv_packet(&mut self, msg: MsgRecvPacket, now: u64) -> Result<Vec<u8>, RouterError> {
        let packet = &msg.packet;
        let payload = single_payload(&packet.payloads)?;
        let channel = self.channel(&packet.dest_channel)?;
        ensure_counterparty(&channel, &packet.source_channel)?;
        let client = self.active_client(&channel.client_id, now)?;
        ensure!(
            packet.timeout_timestamp > now,
            RouterError::PacketTimedOut {
                timeout: packet.timeout_timestamp,
                now,
            }
        );

        let mut tx = Transaction::new(&self.store);
        ensure!(
            !tx.has(&packet.receipt_path()),
            RouterError::PacketAlreadyReceived {
                channel: packet.dest_channel.clone(),
                sequence: packet.sequence,
            }
        );

        let membership = MembershipMsg {
            height: msg.proof_height,
            proof: msg.proof_commitment.clone(),
            path: ics24::prefixed_path(&channel.merkle_prefix, &packet.commitment_path())?,
            value: packet.commitment().to_vec(),
        };
        client
            .verify_membership(&membership)
            .map_err(RouterError::ProofVerificationFailed)?;
        tracing::debug!(proof_height = %msg.proof_height, "packet commitment proven");

        let app = self
            .apps
            .get_mut(&payload.dest_port)
            .ok_or_else(|| RouterError::PortNotFound(payload.dest_port.clone()))?;
        let ctx = CallbackContext {
            source_channel: &packet.source_channel,
            dest_channel: &packet.dest_channel,
            sequence: packet.sequence,
            payload,
            signer: &msg.relayer,
        };
        let ack = match app.on_recv_packet(&ctx) {
            Ok(ack) if !ack.is_empty() => ack,
            Ok(_) => {
                tracing::warn!(port = %payload.dest_port, "application returned an empty acknowledgement");
                ics24::universal_error_ack()
            }
            Err(e) => {
                tracing::warn!(port = %payload.dest_port, error = %e, "application failed to receive packet");
                ics24::universal_error_ack()
            }
        };

        let acknowledgements = vec![ack.clone()];
        tx.set(packet.receipt_path(), RECEIPT_VALUE.to_vec());
        tx.set(
            packet.ack_commitment_path(),
            ics24::packet_acknowledgement_commitment_bytes32(&acknowledgements)?.to_vec(),
        );
        let writes = tx.into_writes();
        self.store.apply(writes);

        tracing::info!(
            dest_channel = %packet.dest_channel,
            sequence = packet.sequence,
            "packet received"
        );
        self.events.push(RouterEvent::WriteAcknowledgement {
            packet: msg.packet,
            acknowledgements,
        });
        Ok(ack)
    }

    /// Processes the counterparty's acknowledgement of a sent packet and deletes its
    /// commitment
    ///
    /// # Errors
    /// Fails on unknown or mismatched channels, an inactive client, an already processed
    /// or altered packet, an invalid proof, an unknown port or a failing application.
    pub fn acknowledge_packet(&mut self, msg: MsgAckPacket, now: u64) -> Result<(), RouterError> {
        let packet = &msg.packet;
        let payload = single_payload(&packet.payloads)?;
        let channel = self.channel(&packet.source_channel)?;
        ensure_counterparty(&channel, &packet.dest_channel)?;
        let client = self.active_client(&channel.client_id, now)?;

        let mut tx = Transaction::new(&self.store);
        let stored = tx
            .get(&packet.commitment_path())
            .ok_or_else(|| RouterError::AckAlreadyProcessed {
                channel: packet.source_channel.clone(),
                sequence: packet.sequence,
            })?;
        ensure!(
            stored == packet.commitment(),
            RouterError::PacketCommitmentMismatch
        );

        let membership = MembershipMsg {
            height: msg.proof_height,
            proof: msg.proof_acked.clone(),
            path: ics24::prefixed_path(&channel.merkle_prefix, &packet.ack_commitment_path())?,
            value: ics24::packet_acknowledgement_commitment_bytes32(&[msg
                .acknowledgement
                .clone()])?
            .to_vec(),
        };
        client
            .verify_membership(&membership)
            .map_err(RouterError::ProofVerificationFailed)?;

        let app = self
            .apps
            .get_mut(&payload.source_port)
            .ok_or_else(|| RouterError::PortNotFound(payload.source_port.clone()))?;
        let success = msg.acknowledgement != ics24::universal_error_ack();
        tx.delete(&packet.commitment_path());

        let ctx = CallbackContext {
            source_channel: &packet.source_channel,
            dest_channel: &packet.dest_channel,
            sequence: packet.sequence,
            payload,
            signer: &msg.relayer,
        };
        app.on_acknowledgement_packet(&ctx, &msg.acknowledgement, success)
            .map_err(|source| RouterError::AppCallback {
                port: payload.source_port.clone(),
                source,
            })?;

        let writes = tx.into_writes();
        self.store.apply(writes);

        tracing::info!(
            source_channel = %packet.source_channel,
            sequence = packet.sequence,
            success,
            "packet acknowledged"
        );
        self.events.push(RouterEvent::AcknowledgePacket(msg.packet));
        Ok(())
    }

    /// Times out a sent packet the counterparty provably never received and deletes its
    /// commitment
    ///
    /// # Errors
    /// Fails on unknown or mismatched channels, an inactive client, a missing or altered
    /// commitment, an invalid proof, a proof from before the timeout, an unknown port or a
    /// failing application.
    pub fn timeout_packet(&mut self, msg: MsgTimeoutPacket, now: u64) -> Result<(), RouterError> {
        let packet = &msg.packet;
        let payload = single_payload(&packet.payloads)?;
        let channel = self.channel(&packet.source_channel)?;
        ensure_counterparty(&channel, &packet.dest_channel)?;
        let client = self.active_client(&channel.client_id, now)?;

        let mut tx = Transaction::new(&self.store);
        let stored = tx
            .get(&packet.commitment_path())
            .ok_or_else(|| RouterError::PacketCommitmentNotFound {
                channel: packet.source_channel.clone(),
                sequence: packet.sequence,
            })?;
        ensure!(
            stored == packet.commitment(),
            RouterError::PacketCommitmentMismatch
        );

        let non_membership = MembershipMsg {
            height: msg.proof_height,
            proof: msg.proof_timeout.clone(),
            path: ics24::prefixed_path(&channel.merkle_prefix, &packet.receipt_path())?,
            value: vec![],
        };
        let proof_timestamp = client
            .verify_non_membership(&non_membership)
            .map_err(RouterError::ProofVerificationFailed)?;
        ensure!(
            proof_timestamp >= packet.timeout_timestamp,
            RouterError::TimeoutNotReached {
                timeout: packet.timeout_timestamp,
                proof_timestamp,
            }
        );

        let app = self
            .apps
            .get_mut(&payload.source_port)
            .ok_or_else(|| RouterError::PortNotFound(payload.source_port.clone()))?;
        tx.delete(&packet.commitment_path());

        let ctx = CallbackContext {
            source_channel: &packet.source_channel,
            dest_channel: &packet.dest_channel,
            sequence: packet.sequence,
            payload,
            signer: &msg.relayer,
        };
        app.on_timeout_packet(&ctx)
            .map_err(|source| RouterError::AppCallback {
                port: payload.source_port.clone(),
                source,
            })?;

        let writes = tx.into_writes();
        self.store.apply(writes);

        tracing::info!(
            source_channel = %packet.source_channel,
            sequence = packet.sequence,
            "packet timed out"
        );
        self.events.push(RouterEvent::TimeoutPacket(msg.packet));
        Ok(())
    }

    fn client_mut(&mut self, client_id: &str) -> Result<&mut C, RouterError> {
        self.clients
            .get_mut(client_id)
            .ok_or_else(|| RouterError::ClientNotFound(client_id.to_string()))
    }

    fn active_client(&self, client_id: &str, now: u64) -> Result<&C, RouterError> {
        let client = self
            .clients
            .get(client_id)
            .ok_or_else(|| RouterError::ClientNotFound(client_id.to_string()))?;
        match client.status(now) {
            Status::Active => Ok(client),
            status => Err(RouterError::ClientNotActive {
                client_id: client_id.to_string(),
                status,
            }),
        }
    }
}

impl<C, S> Router<C, S> {
    fn ensure_owner(&self, caller: &str) -> Result<(), RouterError> {
        ensure!(
            caller == self.owner,
            RouterError::Unauthorized {
                caller: caller.to_string(),
            }
        );
        Ok(())
    }
}

fn single_payload(payloads: &[Payload]) -> Result<&Payload, RouterError> {
    match payloads {
        [] => Err(RouterError::NoPayloads),
        [payload] => Ok(payload),
        _ => Err(RouterError::MultiPayloadNotSupported(payloads.len())),
    }
}

fn ensure_counterparty(channel: &Channel, counterparty_channel_id: &str) -> Result<(), RouterError> {
    ensure!(
        channel.counterparty_channel_id == counterparty_channel_id,
        RouterError::InvalidCounterparty {
            expected: channel.counterparty_channel_id.clone(),
            actual: counterparty_channel_id.to_string(),
        }
    );
    Ok(())
}

fn next_sequence_send<S: Store + ?Sized>(store: &S, channel_id: &str) -> Result<u64, RouterError> {
    let key = ics24::next_sequence_send_path(channel_id);
    let Some(bytes) = store.get(&key) else {
        return Ok(1);
    };
    let sequence = <[u8; 8]>::try_from(bytes.as_slice())
        .map(u64::from_be_bytes)
        .map_err(|e| corrupted(&key, &e))?;
    // one past the last sequence marks an exhausted channel
    ensure!(
        (1..=MAX_SEQUENCE + 1).contains(&sequence),
        corrupted(&key, &format!("sequence {sequence} out of range"))
    );
    Ok(sequence)
}

fn channel_path(channel_id: &str) -> Vec<u8> {
    format!("{CHANNELS_PREFIX}/{channel_id}").into_bytes()
}

fn corrupted(key: &[u8], error: &impl std::fmt::Display) -> RouterError {
    RouterError::CorruptedStore {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: error.to_string(),
    }
}
