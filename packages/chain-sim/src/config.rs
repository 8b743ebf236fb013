//! Parameters of a simulated chain

use std::collections::BTreeSet;

use anyhow::{ensure, Result};
use ibc_eureka_light_client::TrustThreshold;
use ibc_eureka_router::RouterConfig;
use serde::{Deserialize, Serialize};

/// A simulated chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    /// Chain id, also the id counterparty light clients track
    pub chain_id: String,
    /// Revision of every height the chain produces
    #[serde(default = "default_revision_number")]
    pub revision_number: u64,
    /// Account allowed to register clients and channels
    #[serde(default = "default_owner")]
    pub owner: String,
    /// Unix seconds of the genesis block
    pub genesis_time: u64,
    /// Seconds between blocks
    #[serde(default = "default_block_time")]
    pub block_time: u64,
    /// One validator per seed byte, keys derived from the seed
    #[serde(default = "default_validator_seeds")]
    pub validator_seeds: Vec<u8>,
    /// Voting power of every validator
    #[serde(default = "default_voting_power")]
    pub voting_power: u64,
    /// Router parameters
    #[serde(default)]
    pub router: RouterConfig,
    /// Parameters of light clients tracking this chain
    #[serde(default)]
    pub client: ClientConfig,
}

/// Trust parameters of a light client tracking a simulated chain. Periods in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Trust level as `"n/d"`
    pub trust_level: TrustThreshold,
    /// How long a consensus state can be built upon
    pub trusting_period: u64,
    /// Unbonding period of the chain
    pub unbonding_period: u64,
    /// Tolerated clock skew
    pub max_clock_drift: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            trust_level: TrustThreshold::ONE_THIRD,
            trusting_period: 14 * 24 * 3600,
            unbonding_period: 21 * 24 * 3600,
            max_clock_drift: 15,
        }
    }
}

const fn default_revision_number() -> u64 {
    1
}

fn default_owner() -> String {
    "owner".to_string()
}

const fn default_block_time() -> u64 {
    5
}

fn default_validator_seeds() -> Vec<u8> {
    vec![1, 2, 3, 4]
}

const fn default_voting_power() -> u64 {
    10
}

impl ChainConfig {
    /// A chain with default parameters
    #[must_use]
    pub fn new(chain_id: impl Into<String>, genesis_time: u64) -> Self {
        Self {
            chain_id: chain_id.into(),
            revision_number: default_revision_number(),
            owner: default_owner(),
            genesis_time,
            block_time: default_block_time(),
            validator_seeds: default_validator_seeds(),
            voting_power: default_voting_power(),
            router: RouterConfig::default(),
            client: ClientConfig::default(),
        }
    }

    /// Checks that the chain can produce verifiable headers
    ///
    /// # Errors
    /// Returns an error naming the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.chain_id.is_empty(), "empty chain id");
        ensure!(self.revision_number > 0, "revision number must be positive");
        ensure!(self.block_time > 0, "block time must be positive");
        ensure!(self.voting_power > 0, "voting power must be positive");
        ensure!(!self.validator_seeds.is_empty(), "no validators");
        let unique: BTreeSet<_> = self.validator_seeds.iter().collect();
        ensure!(
            unique.len() == self.validator_seeds.len(),
            "duplicate validator seeds"
        );
        Ok(())
    }
}
