//! A chain hosting a router and the transfer application

use std::collections::BTreeMap;

use anyhow::{ensure, Context, Result};
use ibc_eureka_commitment::{ics20::ICS20_PORT, Height};
use ibc_eureka_ics20::{Bank, MsgTransfer, TransferApp};
use ibc_eureka_light_client::{
    ClientState, ConsensusState, Header, Misbehaviour, TendermintLightClient,
};
use ibc_eureka_relayer_lib::{
    chain::{HeaderSource, StateQuery},
    events::EurekaEventWithHeight,
    tx_builder::RelayMsg,
    utils::IBC_STORE_KEY,
};
use ibc_eureka_router::{
    msgs::{MsgAddChannel, MsgSubmitMisbehaviour},
    Router, RouterError,
};
use tendermint_proto::crypto::ProofOps;

use crate::{config::ChainConfig, multistore::Multistore, validators::Validators};

/// Prefix of light client ids
pub const CLIENT_ID_PREFIX: &str = "07-tendermint";

#[derive(Debug)]
struct Block {
    timestamp: u64,
    state: Multistore,
}

/// A simulated chain.
///
/// Transactions execute immediately against the router at the time of the block being
/// built; [`MockChain::commit_block`] seals that block. The header of block `h` carries
/// the app hash of the state committed at `h - 1`.
pub struct MockChain {
    config: ChainConfig,
    validators: Validators,
    router: Router,
    transfer: TransferApp,
    blocks: BTreeMap<u64, Block>,
    height: Height,
    time: u64,
    events: Vec<EurekaEventWithHeight>,
    next_client: u64,
}

impl MockChain {
    /// Starts a chain from genesis and commits its first block
    ///
    /// # Errors
    /// Returns an error if the config is invalid.
    pub fn new(config: ChainConfig) -> Result<Self> {
        config.validate()?;
        let validators = Validators::from_seeds(&config.validator_seeds, config.voting_power);
        let mut router: Router = Router::new(config.owner.clone(), config.router);
        let transfer = TransferApp::default();
        router.add_app(&config.owner, ICS20_PORT, Box::new(transfer.clone()))?;

        let mut chain = Self {
            blocks: BTreeMap::from([(
                0,
                Block {
                    timestamp: config.genesis_time,
                    state: snapshot(&router),
                },
            )]),
            height: Height::new(config.revision_number, 0),
            time: config.genesis_time + config.block_time,
            config,
            validators,
            router,
            transfer,
            events: Vec::new(),
            next_client: 0,
        };
        chain.commit_block();
        Ok(chain)
    }

    /// Chain id
    #[must_use]
    pub fn chain_id(&self) -> &str {
        &self.config.chain_id
    }

    /// Chain parameters
    #[must_use]
    pub const fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// The router
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Handle on the transfer application
    #[must_use]
    pub const fn transfer_app(&self) -> &TransferApp {
        &self.transfer
    }

    /// The bank the transfer application moves tokens in
    #[must_use]
    pub const fn bank(&self) -> &Bank {
        self.transfer.bank()
    }

    /// The validators signing headers
    #[must_use]
    pub const fn validators(&self) -> &Validators {
        &self.validators
    }

    /// The light client registered under `client_id`
    #[must_use]
    pub fn client(&self, client_id: &str) -> Option<&TendermintLightClient> {
        self.router.client(client_id)
    }

    /// Time of the block being built; transactions execute at this time
    #[must_use]
    pub const fn now(&self) -> u64 {
        self.time
    }

    /// Height of the latest committed block
    #[must_use]
    pub const fn height(&self) -> Height {
        self.height
    }

    /// Timestamp of the committed block at `height`
    #[must_use]
    pub fn timestamp_at(&self, height: Height) -> Option<u64> {
        self.block(height).ok().map(|block| block.timestamp)
    }

    /// Timestamp of the latest committed block
    #[must_use]
    pub fn latest_timestamp(&self) -> u64 {
        self.timestamp_at(self.height).unwrap_or(self.config.genesis_time)
    }

    /// Every event committed so far
    #[must_use]
    pub fn events(&self) -> &[EurekaEventWithHeight] {
        &self.events
    }

    /// Events committed after `height`
    #[must_use]
    pub fn events_after(&self, height: Height) -> Vec<EurekaEventWithHeight> {
        self.events
            .iter()
            .filter(|e| e.height > height)
            .cloned()
            .collect()
    }

    /// Moves the time of the block being built forward
    pub const fn advance_time(&mut self, seconds: u64) {
        self.time += seconds;
    }

    /// Moves the time of the block being built forward to at least `timestamp`
    pub fn sync_time(&mut self, timestamp: u64) {
        self.time = self.time.max(timestamp);
    }

    /// Seals the block being built and returns its events
    pub fn commit_block(&mut self) -> Vec<EurekaEventWithHeight> {
        let height = self.height.increment_by(1);
        self.blocks.insert(
            height.revision_height,
            Block {
                timestamp: self.time,
                state: snapshot(&self.router),
            },
        );
        self.height = height;

        let events = EurekaEventWithHeight::at_height(self.router.drain_events(), height);
        self.events.extend(events.iter().cloned());
        tracing::info!(
            chain_id = %self.config.chain_id,
            %height,
            timestamp = self.time,
            events = events.len(),
            "committed block"
        );

        self.time += self.config.block_time;
        events
    }

    /// Commits `count` empty blocks
    pub fn commit_blocks(&mut self, count: u64) {
        for _ in 0..count {
            self.commit_block();
        }
    }

    /// The client state a counterparty creates to track this chain at its latest height
    #[must_use]
    pub fn client_state(&self) -> ClientState {
        let client = self.config.client;
        ClientState {
            chain_id: self.config.chain_id.clone(),
            trust_level: client.trust_level,
            trusting_period: client.trusting_period,
            unbonding_period: client.unbonding_period,
            max_clock_drift: client.max_clock_drift,
            latest_height: self.height,
            frozen_height: Height::zero(),
            proof_specs: Multistore::proof_specs(),
        }
    }

    /// The consensus state the header at `height` attests to
    ///
    /// # Errors
    /// Returns an error if there is no header at `height`.
    pub fn consensus_state(&self, height: Height) -> Result<ConsensusState> {
        Ok(self.signed_header(height, height)?.consensus_state())
    }

    /// The header of block `height`, for a client that trusts `trusted_height`
    ///
    /// # Errors
    /// Returns an error if either height was never committed, or `height` is genesis.
    pub fn signed_header(&self, height: Height, trusted_height: Height) -> Result<Header> {
        let parent = height
            .decrement()
            .with_context(|| format!("no header at genesis height {height}"))?;
        let root = self.block(parent)?.state.app_hash();
        self.header_with_root(height, trusted_height, root)
    }

    /// A header of block `height` signed by the validators over a different root, as a
    /// double-signing validator set would produce
    ///
    /// # Errors
    /// Returns an error if either height was never committed.
    pub fn forged_header(
        &self,
        height: Height,
        trusted_height: Height,
        root: Vec<u8>,
    ) -> Result<Header> {
        self.header_with_root(height, trusted_height, root)
    }

    fn header_with_root(&self, height: Height, trusted_height: Height, root: Vec<u8>) -> Result<Header> {
        let timestamp = self.block(height)?.timestamp;
        self.block(trusted_height)?;

        let mut header = Header {
            chain_id: self.config.chain_id.clone(),
            height,
            trusted_height,
            timestamp,
            root,
            validators_hash: self.validators.hash(),
            next_validators_hash: self.validators.hash(),
            validator_set: self.validators.set().clone(),
            trusted_validator_set: self.validators.set().clone(),
            signatures: vec![],
        };
        self.validators.sign(&mut header);
        Ok(header)
    }

    /// Registers a light client of `counterparty` at its latest height and returns its id
    ///
    /// # Errors
    /// Returns an error if the counterparty's state does not make a valid client.
    pub fn create_client(&mut self, counterparty: &Self) -> Result<String> {
        let client_state = counterparty.client_state();
        let consensus_state = counterparty.consensus_state(client_state.latest_height)?;
        let client = TendermintLightClient::new(client_state, consensus_state)?;

        let client_id = format!("{CLIENT_ID_PREFIX}-{}", self.next_client);
        self.router.add_client(&self.config.owner, &client_id, client)?;
        self.next_client += 1;
        Ok(client_id)
    }

    /// Registers channel `channel_id` to `counterparty_channel_id`, whose chain `client_id`
    /// tracks
    ///
    /// # Errors
    /// Returns the router's error.
    pub fn add_channel(
        &mut self,
        channel_id: &str,
        counterparty_channel_id: &str,
        client_id: &str,
    ) -> Result<(), RouterError> {
        self.router.add_channel(
            &self.config.owner,
            MsgAddChannel {
                channel_id: channel_id.to_string(),
                counterparty_channel_id: counterparty_channel_id.to_string(),
                client_id: client_id.to_string(),
                merkle_prefix: vec![IBC_STORE_KEY.to_vec(), vec![]],
            },
        )
    }

    /// Sends an ICS20 transfer and returns the packet sequence
    ///
    /// # Errors
    /// Returns an error if the transfer application or the router rejects the transfer.
    pub fn transfer(&mut self, msg: MsgTransfer) -> Result<u64> {
        let send = self.transfer.send_packet_msg(msg)?;
        Ok(self.router.send_packet(send, self.time)?)
    }

    /// Executes relayed messages in order, stopping at the first failure. Messages before
    /// the failing one stay applied.
    ///
    /// # Errors
    /// Returns the router's error for the failing message.
    pub fn submit(&mut self, msgs: Vec<RelayMsg>) -> Result<(), RouterError> {
        for msg in msgs {
            match msg {
                RelayMsg::UpdateClient(msg) => {
                    self.router.update_client(&msg, self.time)?;
                }
                RelayMsg::Timeout(msg) => self.router.timeout_packet(msg, self.time)?,
                RelayMsg::Recv(msg) => {
                    self.router.recv_packet(msg, self.time)?;
                }
                RelayMsg::Ack(msg) => self.router.acknowledge_packet(msg, self.time)?,
            }
        }
        Ok(())
    }

    /// Submits misbehaviour evidence to the client `client_id`
    ///
    /// # Errors
    /// Returns an error if the evidence cannot be encoded or the client rejects it.
    pub fn submit_misbehaviour(&mut self, client_id: &str, misbehaviour: &Misbehaviour) -> Result<()> {
        let msg = MsgSubmitMisbehaviour {
            client_id: client_id.to_string(),
            misbehaviour: serde_json::to_vec(misbehaviour)?,
        };
        self.router.submit_misbehaviour(&msg, self.time)?;
        Ok(())
    }

    fn block(&self, height: Height) -> Result<&Block> {
        ensure!(
            height.revision_number == self.config.revision_number,
            "height {height} is not in revision {}",
            self.config.revision_number
        );
        self.blocks
            .get(&height.revision_height)
            .with_context(|| format!("no block at height {height}"))
    }
}

impl StateQuery for MockChain {
    fn query(&self, key_path: &[Vec<u8>], height: Height) -> Result<(Vec<u8>, ProofOps, Height)> {
        let (value, proof) = self.block(height)?.state.query(key_path)?;
        Ok((value, proof, height))
    }
}

impl HeaderSource for MockChain {
    fn latest_height(&self) -> Height {
        self.height
    }

    fn header(&self, height: Height, trusted_height: Height) -> Result<Header> {
        self.signed_header(height, trusted_height)
    }
}

fn snapshot(router: &Router) -> Multistore {
    Multistore::new(BTreeMap::from([(
        IBC_STORE_KEY.to_vec(),
        router.store().entries().clone(),
    )]))
}
