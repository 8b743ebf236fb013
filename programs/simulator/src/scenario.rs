//! Runs the transfers of a [`SimulatorConfig`] between two freshly started chains.

use std::collections::BTreeSet;

use alloy_primitives::U256;
use anyhow::{Context, Result};
use ibc_eureka_chain_sim::{connect, relay, MockChain};
use ibc_eureka_commitment::ics24::universal_error_ack;
use ibc_eureka_ics20::MsgTransfer;
use ibc_eureka_relayer_lib::{events::EurekaEventWithHeight, tx_builder::RelayPath};
use ibc_eureka_router::RouterEvent;
use serde::Serialize;

use crate::config::{Side, SimulatorConfig, TransferConfig};

/// What the simulation did
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    /// One entry per configured transfer, in order
    pub transfers: Vec<TransferReport>,
    /// Final balances of every account the configuration names
    pub balances: Vec<BalanceReport>,
}

/// How a transfer ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Received and successfully acknowledged
    Acknowledged,
    /// Received, but the destination acknowledged with an error; the sender was refunded
    Failed,
    /// Never received; the sender was refunded
    TimedOut,
}

/// A transfer and its outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    /// The sending chain
    pub from: Side,
    /// Packet sequence on the source channel
    pub sequence: u64,
    /// How it ended
    pub outcome: Outcome,
}

/// A balance after the last transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    /// Chain id
    pub chain: String,
    /// Holder
    pub account: String,
    /// Denom as held by the bank
    pub denom: String,
    /// Full trace of the denom
    pub trace: String,
    /// Amount held
    #[serde(with = "ibc_eureka_utils::serde::number_as_string")]
    pub amount: U256,
}

/// Starts both chains, connects them, mints the genesis balances and executes every
/// transfer in order.
///
/// # Errors
/// Returns an error if the configuration is invalid, a balance cannot be minted, or a
/// transfer is rejected or cannot be relayed.
pub fn run(config: &SimulatorConfig) -> Result<Report> {
    config.validate()?;
    let mut a = MockChain::new(config.chain_a.clone()).context("invalid chain_a")?;
    let mut b = MockChain::new(config.chain_b.clone()).context("invalid chain_b")?;
    let (a_to_b, b_to_a) = connect(&mut a, &mut b, &config.channel_a, &config.channel_b)?;

    for balance in &config.balances {
        let chain = match balance.chain {
            Side::A => &a,
            Side::B => &b,
        };
        chain
            .bank()
            .mint(&balance.account, &balance.denom, balance.amount)
            .with_context(|| format!("failed to mint {} for {}", balance.denom, balance.account))?;
    }

    let mut transfers = Vec::with_capacity(config.transfers.len());
    for (index, transfer) in config.transfers.iter().enumerate() {
        let report = match transfer.from {
            Side::A => execute(&mut a, &mut b, &a_to_b, &b_to_a, transfer),
            Side::B => execute(&mut b, &mut a, &b_to_a, &a_to_b, transfer),
        }
        .with_context(|| format!("transfer {index} failed"))?;
        transfers.push(report);
    }

    let mut balances = balances_of(&a, Side::A, config);
    balances.extend(balances_of(&b, Side::B, config));
    Ok(Report {
        transfers,
        balances,
    })
}

/// Sends `transfer` from `source`, then either relays it and its acknowledgement, or lets
/// it expire on `dest` and relays the timeout.
fn execute(
    source: &mut MockChain,
    dest: &mut MockChain,
    out: &RelayPath,
    back: &RelayPath,
    transfer: &TransferConfig,
) -> Result<TransferReport> {
    let timeout_timestamp = source.now() + transfer.timeout_seconds;
    let sequence = source.transfer(MsgTransfer {
        source_channel: out.src_channel_id.clone(),
        dest_channel: out.dst_channel_id.clone(),
        denom: transfer.denom.clone(),
        amount: transfer.amount,
        sender: transfer.sender.clone(),
        receiver: transfer.receiver.clone(),
        memo: transfer.memo.clone(),
        timeout_timestamp,
        encoding: transfer.encoding.clone(),
    })?;
    let sent = source.commit_block();

    let outcome = if transfer.relay {
        let received = relay(source, dest, out, sent, vec![])?;
        let ack = acknowledgement(&received, &out.dst_channel_id, sequence)
            .context("packet was not acknowledged")?;
        relay(dest, source, back, received, vec![])?;
        if ack == universal_error_ack() {
            Outcome::Failed
        } else {
            Outcome::Acknowledged
        }
    } else {
        dest.sync_time(timeout_timestamp);
        dest.commit_block();
        relay(dest, source, back, vec![], sent)?;
        Outcome::TimedOut
    };

    tracing::info!(
        from = source.chain_id(),
        to = dest.chain_id(),
        sequence,
        ?outcome,
        "transfer finished"
    );
    Ok(TransferReport {
        from: transfer.from,
        sequence,
        outcome,
    })
}

/// The acknowledgement written for packet `sequence` received on `dest_channel`
fn acknowledgement(
    events: &[EurekaEventWithHeight],
    dest_channel: &str,
    sequence: u64,
) -> Option<Vec<u8>> {
    events.iter().find_map(|e| match &e.event {
        RouterEvent::WriteAcknowledgement {
            packet,
            acknowledgements,
        } if packet.dest_channel == dest_channel && packet.sequence == sequence => {
            acknowledgements.first().cloned()
        }
        _ => None,
    })
}

/// Balances on `chain` of every account the configuration places on `side`
fn balances_of(chain: &MockChain, side: Side, config: &SimulatorConfig) -> Vec<BalanceReport> {
    let accounts: BTreeSet<&str> = config
        .balances
        .iter()
        .filter(|balance| balance.chain == side)
        .map(|balance| balance.account.as_str())
        .chain(config.transfers.iter().map(|transfer| {
            if transfer.from == side {
                transfer.sender.as_str()
            } else {
                transfer.receiver.as_str()
            }
        }))
        .collect();

    accounts
        .into_iter()
        .flat_map(|account| {
            chain
                .bank()
                .balances(account)
                .into_iter()
                .map(move |(denom, amount)| BalanceReport {
                    chain: chain.chain_id().to_string(),
                    account: account.to_string(),
                    trace: chain
                        .transfer_app()
                        .denoms()
                        .resolve(&denom)
                        .map_or_else(|_| denom.clone(), |resolved| resolved.trace),
                    denom,
                    amount,
                })
        })
        .collect()
}
