//! The transfer application and its router callbacks

use alloy_primitives::U256;
use ibc_eureka_commitment::{
    ics20::{FungibleTokenPacketData, ICS20_ENCODING_JSON, ICS20_PORT, ICS20_SUCCESS_ACK, ICS20_VERSION},
    Payload,
};
use ibc_eureka_router::{msgs::MsgSendPacket, AppError, CallbackContext, IbcApp};
use ibc_eureka_utils::ensure;
use serde::{Deserialize, Serialize};

use crate::{
    bank::Bank,
    denom::{has_prefix, strip_prefix, DenomKind, DenomRegistry},
    error::TransferError,
};

/// The account holding tokens escrowed on `port`/`channel`
#[must_use]
pub fn escrow_address(port: &str, channel: &str) -> String {
    format!("escrow/{port}/{channel}")
}

/// A user's request to transfer tokens to another chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTransfer {
    /// Local channel
    pub source_channel: String,
    /// Counterparty channel
    pub dest_channel: String,
    /// Denom as held by the bank: native or `ibc/{HEX}`
    pub denom: String,
    /// Amount to transfer
    #[serde(with = "ibc_eureka_utils::serde::number_as_string")]
    pub amount: U256,
    /// Sending account
    pub sender: String,
    /// Receiving account on the counterparty
    pub receiver: String,
    /// Free-form memo
    #[serde(default)]
    pub memo: String,
    /// Unix seconds after which the transfer times out
    pub timeout_timestamp: u64,
    /// Payload encoding, JSON unless set
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

fn default_encoding() -> String {
    ICS20_ENCODING_JSON.to_string()
}

/// ICS20 transfers on top of a [`Bank`].
///
/// Clones share the bank and the denom registry, so the host can keep a handle while the
/// router owns the boxed app.
#[derive(Debug, Clone, Default)]
pub struct TransferApp {
    bank: Bank,
    denoms: DenomRegistry,
}

impl TransferApp {
    /// An app moving tokens in `bank`
    #[must_use]
    pub fn new(bank: Bank) -> Self {
        Self {
            bank,
            denoms: DenomRegistry::default(),
        }
    }

    /// The bank
    #[must_use]
    pub const fn bank(&self) -> &Bank {
        &self.bank
    }

    /// The registry of vouchers minted by this app
    #[must_use]
    pub const fn denoms(&self) -> &DenomRegistry {
        &self.denoms
    }

    /// Builds the router message for a transfer, resolving the denom to its full trace.
    ///
    /// # Errors
    /// Returns [`TransferError::InvalidAmount`] for zero, [`TransferError::DenomNotFound`]
    /// for an unknown voucher or [`TransferError::Codec`] for an unknown encoding.
    pub fn send_packet_msg(&self, msg: MsgTransfer) -> Result<MsgSendPacket, TransferError> {
        ensure!(!msg.amount.is_zero(), TransferError::InvalidAmount(msg.amount));
        let denom = self.denoms.resolve(&msg.denom)?;
        let data = FungibleTokenPacketData {
            denom: denom.trace,
            amount: msg.amount,
            sender: msg.sender.clone(),
            receiver: msg.receiver,
            memo: msg.memo,
        };
        let value = data.encode(&msg.encoding)?;

        Ok(MsgSendPacket {
            source_channel: msg.source_channel,
            dest_channel: msg.dest_channel,
            timeout_timestamp: msg.timeout_timestamp,
            payloads: vec![Payload {
                source_port: ICS20_PORT.to_string(),
                dest_port: ICS20_PORT.to_string(),
                version: ICS20_VERSION.to_string(),
                encoding: msg.encoding,
                value,
            }],
            sender: msg.sender,
        })
    }

    fn send(&self, ctx: &CallbackContext<'_>) -> Result<(), TransferError> {
        let data = packet_data(ctx.payload)?;
        ensure!(
            data.sender == ctx.signer,
            TransferError::UnauthorizedSender {
                expected: data.sender,
                actual: ctx.signer.to_string(),
            }
        );

        let port = &ctx.payload.source_port;
        let local_denom = self.denoms.local_denom(&data.denom);
        if has_prefix(&data.denom, port, ctx.source_channel) {
            // voucher returning home
            self.bank.burn(&data.sender, &local_denom, data.amount)?;
        } else {
            let escrow = escrow_address(port, ctx.source_channel);
            self.bank
                .transfer(&data.sender, &escrow, &local_denom, data.amount)?;
        }

        tracing::info!(
            sequence = ctx.sequence,
            denom = %data.denom,
            amount = %data.amount,
            sender = %data.sender,
            "transfer sent"
        );
        Ok(())
    }

    fn receive(&self, ctx: &CallbackContext<'_>) -> Result<Vec<u8>, TransferError> {
        let data = packet_data(ctx.payload)?;

        let source_port = &ctx.payload.source_port;
        let dest_port = &ctx.payload.dest_port;
        if let Some(trace) = strip_prefix(&data.denom, source_port, ctx.source_channel) {
            // our token coming back
            let escrow = escrow_address(dest_port, ctx.dest_channel);
            let local_denom = self.denoms.local_denom(trace);
            self.bank
                .transfer(&escrow, &data.receiver, &local_denom, data.amount)?;
        } else {
            let trace = format!("{dest_port}/{}/{}", ctx.dest_channel, data.denom);
            let voucher = self.denoms.get_or_register(&trace, DenomKind::Voucher);
            self.bank
                .mint(&data.receiver, &voucher.local_denom(), data.amount)?;
        }

        tracing::info!(
            sequence = ctx.sequence,
            denom = %data.denom,
            amount = %data.amount,
            receiver = %data.receiver,
            "transfer received"
        );
        Ok(ICS20_SUCCESS_ACK.to_vec())
    }

    fn refund(&self, ctx: &CallbackContext<'_>) -> Result<(), TransferError> {
        let data = packet_data(ctx.payload)?;

        let port = &ctx.payload.source_port;
        let local_denom = self.denoms.local_denom(&data.denom);
        if has_prefix(&data.denom, port, ctx.source_channel) {
            self.bank.mint(&data.sender, &local_denom, data.amount)?;
        } else {
            let escrow = escrow_address(port, ctx.source_channel);
            self.bank
                .transfer(&escrow, &data.sender, &local_denom, data.amount)?;
        }

        tracing::info!(
            sequence = ctx.sequence,
            denom = %data.denom,
            amount = %data.amount,
            sender = %data.sender,
            "transfer refunded"
        );
        Ok(())
    }
}

/// Decodes and validates the transfer data of a payload
fn packet_data(payload: &Payload) -> Result<FungibleTokenPacketData, TransferError> {
    ensure!(
        payload.version == ICS20_VERSION,
        TransferError::invalid_payload(format!("unsupported version {}", payload.version))
    );
    ensure!(
        payload.source_port == ICS20_PORT && payload.dest_port == ICS20_PORT,
        TransferError::invalid_payload(format!(
            "unexpected ports {} -> {}",
            payload.source_port, payload.dest_port
        ))
    );

    let data = FungibleTokenPacketData::decode(&payload.value, &payload.encoding)?;
    ensure!(!data.amount.is_zero(), TransferError::InvalidAmount(data.amount));
    ensure!(!data.receiver.is_empty(), TransferError::InvalidReceiver);
    Ok(data)
}

impl IbcApp for TransferApp {
    fn on_send_packet(&mut self, ctx: &CallbackContext<'_>) -> Result<(), AppError> {
        self.send(ctx).map_err(AppError::from)
    }

    fn on_recv_packet(&mut self, ctx: &CallbackContext<'_>) -> Result<Vec<u8>, AppError> {
        self.receive(ctx).map_err(AppError::from)
    }

    fn on_acknowledgement_packet(
        &mut self,
        ctx: &CallbackContext<'_>,
        acknowledgement: &[u8],
        success: bool,
    ) -> Result<(), AppError> {
        if success {
            tracing::debug!(
                sequence = ctx.sequence,
                ack = %String::from_utf8_lossy(acknowledgement),
                "transfer acknowledged"
            );
            return Ok(());
        }
        self.refund(ctx).map_err(AppError::from)
    }

    fn on_timeout_packet(&mut self, ctx: &CallbackContext<'_>) -> Result<(), AppError> {
        self.refund(ctx).map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use ibc_eureka_commitment::ics20::ICS20_ENCODING_ABI;
    use rstest::rstest;

    use super::*;
    use crate::denom::voucher_denom;

    fn amount(n: u64) -> U256 {
        U256::from(n)
    }

    fn transfer(denom: &str, n: u64, encoding: &str) -> MsgTransfer {
        MsgTransfer {
            source_channel: "chanA".to_string(),
            dest_channel: "chanB".to_string(),
            denom: denom.to_string(),
            amount: amount(n),
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            memo: String::new(),
            timeout_timestamp: 1_000,
            encoding: encoding.to_string(),
        }
    }

    fn ctx<'a>(payload: &'a Payload, signer: &'a str) -> CallbackContext<'a> {
        CallbackContext {
            source_channel: "chanA",
            dest_channel: "chanB",
            sequence: 1,
            payload,
            signer,
        }
    }

    #[rstest]
    #[case::json(ICS20_ENCODING_JSON)]
    #[case::abi(ICS20_ENCODING_ABI)]
    fn send_escrows_native_tokens(#[case] encoding: &str) {
        let mut app = TransferApp::default();
        app.bank().mint("alice", "uatom", amount(100)).unwrap();

        let msg = app.send_packet_msg(transfer("uatom", 40, encoding)).unwrap();
        let payload = &msg.payloads[0];
        assert_eq!(payload.encoding, encoding);
        app.on_send_packet(&ctx(payload, "alice")).unwrap();

        assert_eq!(app.bank().balance("alice", "uatom"), amount(60));
        assert_eq!(
            app.bank().balance(&escrow_address("transfer", "chanA"), "uatom"),
            amount(40)
        );
    }

    #[test]
    fn send_rejects_foreign_signer() {
        let mut app = TransferApp::default();
        app.bank().mint("alice", "uatom", amount(100)).unwrap();
        let msg = app.send_packet_msg(transfer("uatom", 40, ICS20_ENCODING_JSON)).unwrap();

        let err = app.on_send_packet(&ctx(&msg.payloads[0], "mallory")).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TransferError>(),
            Some(&TransferError::UnauthorizedSender {
                expected: "alice".to_string(),
                actual: "mallory".to_string(),
            })
        );
        assert_eq!(app.bank().balance("alice", "uatom"), amount(100));
    }

    #[test]
    fn send_rejects_insufficient_funds() {
        let mut app = TransferApp::default();
        let msg = app.send_packet_msg(transfer("uatom", 1, ICS20_ENCODING_JSON)).unwrap();
        let err = app.on_send_packet(&ctx(&msg.payloads[0], "alice")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TransferError>(),
            Some(TransferError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn transfer_msg_validation() {
        let app = TransferApp::default();
        assert_eq!(
            app.send_packet_msg(transfer("uatom", 0, ICS20_ENCODING_JSON)),
            Err(TransferError::InvalidAmount(U256::ZERO))
        );
        let unknown = voucher_denom("transfer/chanZ/uatom");
        assert_eq!(
            app.send_packet_msg(transfer(&unknown, 1, ICS20_ENCODING_JSON)),
            Err(TransferError::DenomNotFound(unknown.clone()))
        );
        assert!(matches!(
            app.send_packet_msg(transfer("uatom", 1, "application/protobuf")),
            Err(TransferError::Codec(_))
        ));
    }

    #[test]
    fn receive_mints_voucher_with_prefixed_trace() {
        let mut app = TransferApp::default();
        let data = FungibleTokenPacketData {
            denom: "uatom".to_string(),
            amount: amount(7),
            sender: "alice".to_string(),
            receiver: "bob".to_string(),
            memo: String::new(),
        };
        let payload = Payload {
            source_port: ICS20_PORT.to_string(),
            dest_port: ICS20_PORT.to_string(),
            version: ICS20_VERSION.to_string(),
            encoding: ICS20_ENCODING_JSON.to_string(),
            value: data.encode(ICS20_ENCODING_JSON).unwrap(),
        };

        let ack = app.on_recv_packet(&ctx(&payload, "relayer")).unwrap();
        assert_eq!(ack, ICS20_SUCCESS_ACK);

        let voucher = voucher_denom("transfer/chanB/uatom");
        assert_eq!(app.bank().balance("bob", &voucher), amount(7));
        assert_eq!(
            app.denoms().resolve(&voucher).unwrap().kind,
            DenomKind::Voucher
        );
    }

    #[rstest]
    #[case::version(|p: &mut Payload| p.version = "ics20-2".to_string())]
    #[case::port(|p: &mut Payload| p.dest_port = "other".to_string())]
    #[case::non_canonical_json(|p: &mut Payload| p.value.push(b' '))]
    #[case::zero_amount(|p: &mut Payload| {
        p.value = br#"{"denom":"uatom","amount":"0","sender":"alice","receiver":"bob","memo":""}"#.to_vec();
    })]
    #[case::empty_receiver(|p: &mut Payload| {
        p.value = br#"{"denom":"uatom","amount":"1","sender":"alice","receiver":"","memo":""}"#.to_vec();
    })]
    fn receive_rejects_invalid_payload(#[case] tamper: fn(&mut Payload)) {
        let mut app = TransferApp::default();
        let mut msg = app
            .send_packet_msg(transfer("uatom", 1, ICS20_ENCODING_JSON))
            .unwrap();
        let mut payload = msg.payloads.remove(0);
        tamper(&mut payload);

        assert!(app.on_recv_packet(&ctx(&payload, "relayer")).is_err());
        assert!(app.denoms().get(&crate::denom::denom_hash("transfer/chanB/uatom")).is_none());
    }

    #[test]
    fn successful_ack_keeps_escrow() {
        let mut app = TransferApp::default();
        app.bank().mint("alice", "uatom", amount(10)).unwrap();
        let msg = app.send_packet_msg(transfer("uatom", 10, ICS20_ENCODING_JSON)).unwrap();
        let ctx = ctx(&msg.payloads[0], "alice");
        app.on_send_packet(&ctx).unwrap();

        app.on_acknowledgement_packet(&ctx, ICS20_SUCCESS_ACK, true)
            .unwrap();
        assert_eq!(app.bank().balance("alice", "uatom"), U256::ZERO);
        assert_eq!(
            app.bank().balance(&escrow_address("transfer", "chanA"), "uatom"),
            amount(10)
        );
    }

    #[test]
    fn failed_ack_and_timeout_refund_escrow() {
        let mut app = TransferApp::default();
        app.bank().mint("alice", "uatom", amount(10)).unwrap();
        let msg = app.send_packet_msg(transfer("uatom", 4, ICS20_ENCODING_JSON)).unwrap();
        let ctx = ctx(&msg.payloads[0], "alice");

        app.on_send_packet(&ctx).unwrap();
        app.on_acknowledgement_packet(&ctx, b"error", false).unwrap();
        assert_eq!(app.bank().balance("alice", "uatom"), amount(10));

        app.on_send_packet(&ctx).unwrap();
        app.on_timeout_packet(&ctx).unwrap();
        assert_eq!(app.bank().balance("alice", "uatom"), amount(10));
        assert_eq!(
            app.bank().balance(&escrow_address("transfer", "chanA"), "uatom"),
            U256::ZERO
        );
    }
}
