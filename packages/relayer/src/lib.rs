//! Relayer library for IBC Eureka.
//!
//! Turns router events of one chain into the messages another chain needs to process
//! them, and proves those messages against the source chain's committed state.
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

pub mod chain;
pub mod events;
pub mod tx_builder;
pub mod utils;
