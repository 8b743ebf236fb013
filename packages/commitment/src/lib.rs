//! Canonical encodings shared by both sides of an IBC Eureka connection.
//!
//! Everything in this crate is a pure function of its inputs: packet and payload types,
//! the ICS24 store paths and commitment hashes both chains must agree on bit for bit,
//! the ICS20 packet data codecs, and the conversion of native chain proofs into
//! ICS-23 [`MerkleProof`]s.
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

#[cfg(test)]
use hex as _;

pub mod error;
pub mod height;
pub mod ics20;
pub mod ics24;
pub mod packet;
pub mod proof;

pub use error::CodecError;
pub use height::Height;
pub use packet::{Packet, Payload};
pub use proof::{MerklePath, MerkleProof};
