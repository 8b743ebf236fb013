//! In-process chains for IBC Eureka.
//!
//! A [`MockChain`] stands in for a consensus engine and its RPC: it hosts a router with
//! the ICS20 transfer application, commits the router's store into a provable multistore
//! once per block, signs headers with a deterministic validator set and answers proof
//! queries in the native `ProofOps` format.
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

#[cfg(test)]
use {alloy_primitives as _, rstest as _};

pub mod chain;
pub mod config;
pub mod multistore;
pub mod relay;
pub mod validators;

pub use chain::MockChain;
pub use config::{ChainConfig, ClientConfig};
pub use relay::{connect, relay, update_client};
