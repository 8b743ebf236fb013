//! Connecting simulated chains and relaying between them

use anyhow::{Context, Result};
use ibc_eureka_relayer_lib::{
    events::EurekaEventWithHeight,
    tx_builder::{RelayMsg, RelayPath, TxBuilder},
};
use ibc_eureka_router::msgs::MsgUpdateClient;

use crate::chain::MockChain;

/// Signer of relayed messages
pub const RELAYER_ADDRESS: &str = "relayer";

/// Creates a client of each chain on the other and a channel pair between them, then
/// commits a block on both. Returns the paths from `a` to `b` and from `b` to `a`.
///
/// # Errors
/// Returns an error if a client or channel cannot be registered.
pub fn connect(
    a: &mut MockChain,
    b: &mut MockChain,
    channel_a: &str,
    channel_b: &str,
) -> Result<(RelayPath, RelayPath)> {
    let client_on_a = a.create_client(b)?;
    let client_on_b = b.create_client(a)?;
    a.add_channel(channel_a, channel_b, &client_on_a)?;
    b.add_channel(channel_b, channel_a, &client_on_b)?;
    a.commit_block();
    b.commit_block();

    tracing::info!(
        a = a.chain_id(),
        b = b.chain_id(),
        channel_a,
        channel_b,
        "chains connected"
    );
    Ok((
        RelayPath {
            src_channel_id: channel_a.to_string(),
            dst_channel_id: channel_b.to_string(),
            dst_client_id: client_on_b,
        },
        RelayPath {
            src_channel_id: channel_b.to_string(),
            dst_channel_id: channel_a.to_string(),
            dst_client_id: client_on_a,
        },
    ))
}

/// Relays `src_events` of `source`, and timeouts of the `target_events` the source never
/// received, to `target` along `path`.
///
/// Seals the block being built on the source first, so everything executed on it so far
/// is provable. The target's clock catches up with the source's latest header, then the
/// messages execute and a target block is committed, whose events are returned.
///
/// # Errors
/// Returns an error if the target has no client `path.dst_client_id`, the batch cannot be
/// built, or the target rejects a message.
pub fn relay(
    source: &mut MockChain,
    target: &mut MockChain,
    path: &RelayPath,
    src_events: Vec<EurekaEventWithHeight>,
    target_events: Vec<EurekaEventWithHeight>,
) -> Result<Vec<EurekaEventWithHeight>> {
    source.commit_block();
    let trusted_height = target
        .client(&path.dst_client_id)
        .with_context(|| format!("no client {} on {}", path.dst_client_id, target.chain_id()))?
        .client_state()
        .latest_height;

    let batch = TxBuilder::new(path.clone(), RELAYER_ADDRESS.to_string()).relay_events(
        &*source,
        src_events,
        target_events,
        trusted_height,
        &[],
        &[],
        source.latest_timestamp(),
    )?;
    if batch.is_empty() {
        return Ok(vec![]);
    }

    target.sync_time(source.latest_timestamp());
    target.submit(batch.into_msgs())?;
    Ok(target.commit_block())
}

/// Updates `target`'s client of `source` to the source's latest header and commits a
/// target block
///
/// # Errors
/// Returns an error if the client is unknown or rejects the header.
pub fn update_client(source: &MockChain, target: &mut MockChain, client_id: &str) -> Result<()> {
    let trusted_height = target
        .client(client_id)
        .with_context(|| format!("no client {client_id} on {}", target.chain_id()))?
        .client_state()
        .latest_height;
    let header = source.signed_header(source.height(), trusted_height)?;

    target.sync_time(source.latest_timestamp());
    target.submit(vec![RelayMsg::UpdateClient(MsgUpdateClient {
        client_id: client_id.to_string(),
        client_message: serde_json::to_vec(&header)?,
    })])?;
    target.commit_block();
    Ok(())
}
