//! The interface the router uses to talk to light clients

use ibc_eureka_commitment::Height;
use ibc_eureka_light_client::{
    HeaderVerifier, LightClientError, Status, TendermintLightClient, UpdateResult,
};

/// A (non-)membership query against a light client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipMsg {
    /// Height whose consensus root the proof is checked against
    pub height: Height,
    /// Encoded merkle proof
    pub proof: Vec<u8>,
    /// Prefixed merkle path, root layer first
    pub path: Vec<Vec<u8>>,
    /// Expected value; empty for non-membership
    pub value: Vec<u8>,
}

/// A light client of one counterparty chain
pub trait LightClient {
    /// Admits an encoded client message
    ///
    /// # Errors
    /// Returns an error if the message is not a valid update.
    fn update_client(&mut self, msg: &[u8], now: u64) -> Result<UpdateResult, LightClientError>;

    /// Freezes the client on encoded misbehaviour evidence
    ///
    /// # Errors
    /// Returns an error if the evidence is invalid.
    fn submit_misbehaviour(&mut self, msg: &[u8], now: u64) -> Result<(), LightClientError>;

    /// Verifies membership and returns the consensus timestamp at the proof height
    ///
    /// # Errors
    /// Returns an error if the proof does not verify.
    fn verify_membership(&self, msg: &MembershipMsg) -> Result<u64, LightClientError>;

    /// Verifies non-membership and returns the consensus timestamp at the proof height
    ///
    /// # Errors
    /// Returns an error if the proof does not verify.
    fn verify_non_membership(&self, msg: &MembershipMsg) -> Result<u64, LightClientError>;

    /// Client status at `now`
    fn status(&self, now: u64) -> Status;

    /// Latest trusted height
    fn latest_height(&self) -> Height;

    /// Replaces the client's trusted state with that of `substitute`
    ///
    /// # Errors
    /// Returns an error if `substitute` cannot replace this client.
    fn recover(&mut self, substitute: &Self, now: u64) -> Result<(), LightClientError>;
}

impl<V: HeaderVerifier> LightClient for TendermintLightClient<V> {
    fn update_client(&mut self, msg: &[u8], now: u64) -> Result<UpdateResult, LightClientError> {
        self.update_client_msg(msg, now)
    }

    fn submit_misbehaviour(&mut self, msg: &[u8], now: u64) -> Result<(), LightClientError> {
        self.submit_misbehaviour_msg(msg, now)
    }

    fn verify_membership(&self, msg: &MembershipMsg) -> Result<u64, LightClientError> {
        Self::verify_membership(self, msg.height, &msg.proof, &msg.path, &msg.value)
    }

    fn verify_non_membership(&self, msg: &MembershipMsg) -> Result<u64, LightClientError> {
        Self::verify_non_membership(self, msg.height, &msg.proof, &msg.path)
    }

    fn status(&self, now: u64) -> Status {
        Self::status(self, now)
    }

    fn latest_height(&self) -> Height {
        self.client_state().latest_height
    }

    fn recover(&mut self, substitute: &Self, now: u64) -> Result<(), LightClientError> {
        Self::recover(self, substitute, now)
    }
}
