//! Verification of ICS-23 merkle proofs against a trusted root.
//!
//! Proofs are folded leaf layer first: every layer proves the value (or, for the leaf
//! layer of a non-membership proof, the absence of the key) under a sub-root, and the
//! sub-root becomes the value proven by the next layer. The final sub-root must equal
//! the trusted root exactly.
//!
//! [`SimpleMerkleTree`] is the producing side, emitting proofs in the Tendermint simple
//! tree format that verify under [`ics23::tendermint_spec`].
#![deny(
    clippy::nursery,
    clippy::pedantic,
    warnings,
    missing_docs,
    unused_crate_dependencies
)]

#[cfg(test)]
use serde_json as _;

pub mod error;
pub mod specs;
pub mod tree;
pub mod verify;

pub use error::MerkleError;
pub use specs::ProofSpecs;
pub use tree::SimpleMerkleTree;
pub use verify::{verify_membership, verify_non_membership};
