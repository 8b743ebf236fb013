//! The IBC Eureka router.
//!
//! The router owns the provable packet store of one chain. It allocates send sequences,
//! writes packet commitments, receipts and acknowledgement commitments, verifies
//! counterparty proofs through registered light clients and dispatches payloads to the
//! application bound to each port. Every lifecycle operation runs against a
//! [`store::Transaction`] that is only applied when the whole operation succeeds.
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

#[cfg(test)]
use ibc_eureka_merkle as _;
#[cfg(test)]
use rstest as _;

pub mod app;
pub mod error;
pub mod events;
pub mod light_client;
pub mod msgs;
pub mod router;
pub mod store;

pub use app::{AppError, CallbackContext, IbcApp};
pub use error::RouterError;
pub use events::RouterEvent;
pub use light_client::{LightClient, MembershipMsg};
pub use router::{Channel, Router, RouterConfig, MAX_SEQUENCE};
pub use store::{MemStore, Store, Transaction};
