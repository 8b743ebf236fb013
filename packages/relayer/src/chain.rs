//! What the relayer needs from a chain it relays from

use anyhow::Result;
use ibc_eureka_commitment::Height;
use ibc_eureka_light_client::Header;
use tendermint_proto::crypto::ProofOps;

/// Proven reads of committed chain state
pub trait StateQuery {
    /// The value under `key_path` (store name first) in the state committed at `height`,
    /// with its native proof and the height it was read at. An absent key yields an empty
    /// value and a proof of absence.
    ///
    /// # Errors
    /// Returns an error if the state at `height` is unavailable.
    fn query(&self, key_path: &[Vec<u8>], height: Height) -> Result<(Vec<u8>, ProofOps, Height)>;
}

/// Signed headers of a chain
pub trait HeaderSource {
    /// Height of the latest signed header
    fn latest_height(&self) -> Height;

    /// The header at `height`, carrying the validator set trusted at `trusted_height`
    ///
    /// # Errors
    /// Returns an error if either height is unknown.
    fn header(&self, height: Height, trusted_height: Height) -> Result<Header>;
}
