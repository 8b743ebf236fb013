//! Drives ICS20 transfers between two simulated chains from a config file.
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

pub mod cli;
pub mod config;
pub mod observability;
pub mod scenario;
