//! Transfer errors

use alloy_primitives::U256;
use ibc_eureka_commitment::CodecError;

/// Errors of the transfer application
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The account holds less than the requested amount
    #[error("insufficient funds: {account} has {balance}{denom}, needs {amount}{denom}")]
    InsufficientFunds {
        /// Debited account
        account: String,
        /// Local denom
        denom: String,
        /// Current balance
        balance: U256,
        /// Requested amount
        amount: U256,
    },
    /// Zero amounts are not transferable
    #[error("invalid amount: {0}")]
    InvalidAmount(U256),
    /// A credit would overflow the balance or supply
    #[error("balance overflow for {denom}")]
    BalanceOverflow {
        /// Local denom
        denom: String,
    },
    /// A local voucher denom is not registered
    #[error("denom not found: {0}")]
    DenomNotFound(String),
    /// The payload is not a transfer payload
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// What is wrong with it
        reason: String,
    },
    /// The packet sender is not the account the packet data names
    #[error("unauthorized sender: packet data names {expected}, signed by {actual}")]
    UnauthorizedSender {
        /// Sender in the packet data
        expected: String,
        /// Account that submitted the send
        actual: String,
    },
    /// The receiver is empty
    #[error("invalid receiver")]
    InvalidReceiver,
    /// The packet data does not decode
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl TransferError {
    pub(crate) fn invalid_payload(reason: impl ToString) -> Self {
        Self::InvalidPayload {
            reason: reason.to_string(),
        }
    }
}
