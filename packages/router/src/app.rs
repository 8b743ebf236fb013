//! The callback interface between the router and IBC applications

use ibc_eureka_commitment::Payload;

/// Error returned by an application callback
pub type AppError = Box<dyn std::error::Error + Send + Sync>;

/// What an application learns about the packet it is called for
#[derive(Debug, Clone, Copy)]
pub struct CallbackContext<'a> {
    /// Channel on the sending chain
    pub source_channel: &'a str,
    /// Channel on the receiving chain
    pub dest_channel: &'a str,
    /// Packet sequence
    pub sequence: u64,
    /// The payload addressed to the application
    pub payload: &'a Payload,
    /// The packet sender for sends, the relayer otherwise
    pub signer: &'a str,
}

/// An application bound to a port
pub trait IbcApp {
    /// Called when a packet is sent from the application's port. An error aborts the send.
    ///
    /// # Errors
    /// Returns an error if the application refuses the packet.
    fn on_send_packet(&mut self, ctx: &CallbackContext<'_>) -> Result<(), AppError>;

    /// Called when a packet for the application's port is received; returns the
    /// acknowledgement. An error results in the universal error acknowledgement.
    ///
    /// # Errors
    /// Returns an error if the application cannot process the packet.
    fn on_recv_packet(&mut self, ctx: &CallbackContext<'_>) -> Result<Vec<u8>, AppError>;

    /// Called when the acknowledgement of a sent packet is proven. `success` is false for
    /// the universal error acknowledgement.
    ///
    /// # Errors
    /// Returns an error if the application cannot process the acknowledgement.
    fn on_acknowledgement_packet(
        &mut self,
        ctx: &CallbackContext<'_>,
        acknowledgement: &[u8],
        success: bool,
    ) -> Result<(), AppError>;

    /// Called when a sent packet is proven to have timed out.
    ///
    /// # Errors
    /// Returns an error if the application cannot process the timeout.
    fn on_timeout_packet(&mut self, ctx: &CallbackContext<'_>) -> Result<(), AppError>;
}
