//! Trusted consensus snapshots

use serde::{Deserialize, Serialize};

/// A trusted snapshot of the counterparty at one height
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusState {
    /// Block time in unix seconds
    pub timestamp: u64,
    /// App hash committing to the state proofs are verified against
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub root: Vec<u8>,
    /// Hash of the validator set that signs the next block
    #[serde(with = "ibc_eureka_utils::serde::hex_bytes")]
    pub next_validators_hash: Vec<u8>,
}
