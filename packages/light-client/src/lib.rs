#![doc = "Tendermint-style light client for IBC Eureka"]
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

pub mod client;
pub mod client_state;
pub mod consensus_state;
pub mod error;
pub mod header;
pub mod membership;
pub mod misbehaviour;
pub mod update;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::TendermintLightClient;
pub use client_state::{ClientState, Status, TrustThreshold};
pub use consensus_state::ConsensusState;
pub use error::LightClientError;
pub use header::{CommitSig, Header, Validator, ValidatorSet};
pub use misbehaviour::Misbehaviour;
pub use update::UpdateResult;
pub use verify::{Ed25519HeaderVerifier, HeaderVerifier};
