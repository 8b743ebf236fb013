//! Defines the configuration of a simulation run.

use std::{fs, path::Path, str::FromStr};

use alloy_primitives::U256;
use anyhow::{ensure, Context, Result};
use ibc_eureka_chain_sim::ChainConfig;
use ibc_eureka_commitment::ics20::ICS20_ENCODING_JSON;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// The top level configuration of a simulation.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::module_name_repetitions)]
pub struct SimulatorConfig {
    /// The first chain.
    pub chain_a: ChainConfig,
    /// The second chain.
    pub chain_b: ChainConfig,
    /// The channel id on chain A.
    #[serde(default = "default_channel_a")]
    pub channel_a: String,
    /// The channel id on chain B.
    #[serde(default = "default_channel_b")]
    pub channel_b: String,
    /// Tokens minted before the first transfer.
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
    /// Transfers executed in order.
    #[serde(default)]
    pub transfers: Vec<TransferConfig>,
    /// The log level of the simulator.
    #[serde(default)]
    pub log_level: String,
}

/// One of the two simulated chains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// `chain_a`
    A,
    /// `chain_b`
    B,
}

/// Tokens credited to an account at genesis.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisBalance {
    /// The chain holding the tokens.
    pub chain: Side,
    /// The receiving account.
    pub account: String,
    /// The denom minted.
    pub denom: String,
    /// The amount minted, as a decimal string.
    #[serde(with = "ibc_eureka_utils::serde::number_as_string")]
    pub amount: U256,
}

/// A transfer from one chain to the other.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransferConfig {
    /// The sending chain.
    pub from: Side,
    /// The denom as held by the sender.
    pub denom: String,
    /// The amount sent, as a decimal string.
    #[serde(with = "ibc_eureka_utils::serde::number_as_string")]
    pub amount: U256,
    /// The sending account.
    pub sender: String,
    /// The receiving account on the other chain.
    pub receiver: String,
    /// Free-form memo.
    #[serde(default)]
    pub memo: String,
    /// Seconds after sending at which the packet times out.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// The payload encoding.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Whether the packet is relayed. Unrelayed packets are left to time out.
    #[serde(default = "default_true")]
    pub relay: bool,
}

fn default_channel_a() -> String {
    "chanA".to_string()
}

fn default_channel_b() -> String {
    "chanB".to_string()
}

const fn default_timeout_seconds() -> u64 {
    600
}

fn default_encoding() -> String {
    ICS20_ENCODING_JSON.to_string()
}

/// Returns true, used as a default value for boolean fields.
const fn default_true() -> bool {
    true
}

impl SimulatorConfig {
    /// Reads and parses the configuration at `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not parse.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Parses a JSON configuration, reporting the path of the offending field on failure.
    ///
    /// # Errors
    /// Returns an error naming the JSON path of the first field that fails to parse.
    pub fn parse(json: &str) -> Result<Self> {
        let deserializer = &mut serde_json::Deserializer::from_str(json);
        let config: Self = serde_path_to_error::deserialize(deserializer)
            .map_err(|e| anyhow::anyhow!("config error at {}: {}", e.path(), e.inner()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks what the types cannot express.
    ///
    /// Genesis balances are native tokens: a denom containing `/` would read as a denom
    /// trace, and a `{port}/{channel}/` prefix would make the transfer application treat
    /// it as a voucher returning home.
    ///
    /// # Errors
    /// Returns an error naming the first offending genesis balance.
    pub fn validate(&self) -> Result<()> {
        for (index, balance) in self.balances.iter().enumerate() {
            ensure!(
                !balance.account.is_empty(),
                "config error at balances[{index}].account: empty account"
            );
            ensure!(
                !balance.denom.is_empty() && !balance.denom.contains('/'),
                "config error at balances[{index}].denom: {:?} is not a native denom",
                balance.denom
            );
        }
        Ok(())
    }

    /// Returns the log level of the simulator.
    #[must_use]
    pub fn log_level(&self) -> Level {
        Level::from_str(&self.log_level).unwrap_or(Level::INFO)
    }

    /// The configuration of `side`'s chain.
    #[must_use]
    pub const fn chain(&self, side: Side) -> &ChainConfig {
        match side {
            Side::A => &self.chain_a,
            Side::B => &self.chain_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;

    use super::*;

    const MINIMAL: &str = r#"{
        "chain_a": { "chain_id": "chain-a", "genesis_time": 1700000000 },
        "chain_b": { "chain_id": "chain-b", "genesis_time": 1700000000 }
    }"#;

    #[test]
    fn defaults_fill_optional_fields() {
        let config = SimulatorConfig::parse(MINIMAL).unwrap();
        assert_eq!(config.channel_a, "chanA");
        assert_eq!(config.channel_b, "chanB");
        assert!(config.transfers.is_empty());
        assert_eq!(config.log_level(), Level::INFO);
        assert_eq!(config.chain(Side::B).chain_id, "chain-b");
    }

    #[test]
    fn transfer_fields() {
        let config = SimulatorConfig::parse(
            r#"{
                "chain_a": { "chain_id": "chain-a", "genesis_time": 1700000000 },
                "chain_b": { "chain_id": "chain-b", "genesis_time": 1700000000 },
                "log_level": "debug",
                "transfers": [
                    { "from": "b", "denom": "uosmo", "amount": "42", "sender": "bob", "receiver": "alice" }
                ]
            }"#,
        )
        .unwrap();
        let transfer = &config.transfers[0];
        assert_eq!(transfer.from, Side::B);
        assert_eq!(transfer.amount, U256::from(42_u64));
        assert_eq!(transfer.timeout_seconds, 600);
        assert_eq!(transfer.encoding, ICS20_ENCODING_JSON);
        assert!(transfer.relay);
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn errors_name_the_field_path() {
        let err = SimulatorConfig::parse(
            r#"{
                "chain_a": { "chain_id": "chain-a", "genesis_time": 1700000000 },
                "chain_b": { "chain_id": "chain-b", "genesis_time": 1700000000 },
                "balances": [
                    { "chain": "a", "account": "alice", "denom": "uatom", "amount": "lots" }
                ]
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("config error at balances[0].amount"), "{err}");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = SimulatorConfig::parse(
            r#"{
                "chain_a": { "chain_id": "chain-a", "genesis_time": 1700000000, "gas": 1 },
                "chain_b": { "chain_id": "chain-b", "genesis_time": 1700000000 }
            }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("chain_a"), "{err}");
    }

    #[rstest]
    #[case::trace("transfer/chanA/uosmo")]
    #[case::voucher("ibc/58E1AF004796D3060470303A07DCBCA754304DA126E4480BA9AB93132BAF54B3")]
    #[case::empty("")]
    fn genesis_denoms_must_be_native(#[case] denom: &str) {
        let json = format!(
            r#"{{
                "chain_a": {{ "chain_id": "chain-a", "genesis_time": 1700000000 }},
                "chain_b": {{ "chain_id": "chain-b", "genesis_time": 1700000000 }},
                "balances": [
                    {{ "chain": "a", "account": "alice", "denom": "uatom", "amount": "1" }},
                    {{ "chain": "a", "account": "mallory", "denom": "{denom}", "amount": "5" }}
                ]
            }}"#
        );
        let err = SimulatorConfig::parse(&json).unwrap_err();
        assert!(
            err.to_string().starts_with("config error at balances[1].denom"),
            "{err}"
        );
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = SimulatorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.chain_a.chain_id, "chain-a");

        assert!(SimulatorConfig::from_file(file.path().with_extension("missing")).is_err());
    }
}
