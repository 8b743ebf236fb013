//! ICS20 fungible token transfers.
//!
//! [`TransferApp`] binds to the `transfer` port of an IBC Eureka router. Native tokens
//! leaving the chain are escrowed per channel and vouchers returning to their origin are
//! burned; incoming tokens either unescrow a returning native token or mint a voucher
//! whose denom trace is recorded in the [`DenomRegistry`].
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

#[cfg(test)]
use rstest as _;
#[cfg(test)]
use serde_json as _;

pub mod app;
pub mod bank;
pub mod denom;
pub mod error;

pub use app::{escrow_address, MsgTransfer, TransferApp};
pub use bank::Bank;
pub use denom::{Denom, DenomKind, DenomRegistry};
pub use error::TransferError;
