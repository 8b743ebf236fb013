//! ICS20 fungible token packet data and its two wire encodings.

use alloy_primitives::U256;
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Port the transfer application binds to
pub const ICS20_PORT: &str = "transfer";
/// Application version carried in transfer payloads
pub const ICS20_VERSION: &str = "ics20-1";
/// Canonical JSON encoding
pub const ICS20_ENCODING_JSON: &str = "application/json";
/// Solidity ABI encoding
pub const ICS20_ENCODING_ABI: &str = "application/x-solidity-abi";
/// Acknowledgement written by a successful transfer receive
pub const ICS20_SUCCESS_ACK: &[u8] = br#"{"result":"AQ=="}"#;

#[allow(missing_docs, clippy::pedantic, clippy::nursery)]
mod abi {
    alloy_sol_types::sol! {
        struct AbiFungibleTokenPacketData {
            string denom;
            uint256 amount;
            string sender;
            string receiver;
            string memo;
        }
    }
}

use abi::AbiFungibleTokenPacketData;

/// The data of a token transfer packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FungibleTokenPacketData {
    /// Full denom trace, e.g. `transfer/chanB/uatom`
    pub denom: String,
    /// Amount, a decimal string on the JSON wire
    #[serde(with = "ibc_eureka_utils::serde::number_as_string")]
    pub amount: U256,
    /// Sender address on the source chain
    pub sender: String,
    /// Receiver address on the destination chain
    pub receiver: String,
    /// Free-form memo, possibly empty
    pub memo: String,
}

/// A packet data encoding understood by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `application/json`
    Json,
    /// `application/x-solidity-abi`
    Abi,
}

impl Encoding {
    /// Resolves a payload encoding string.
    ///
    /// # Errors
    /// Returns [`CodecError::UnsupportedEncoding`] for anything but the two known encodings.
    pub fn parse(encoding: &str) -> Result<Self, CodecError> {
        match encoding {
            ICS20_ENCODING_JSON => Ok(Self::Json),
            ICS20_ENCODING_ABI => Ok(Self::Abi),
            other => Err(CodecError::UnsupportedEncoding(other.to_string())),
        }
    }

    /// The payload encoding string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => ICS20_ENCODING_JSON,
            Self::Abi => ICS20_ENCODING_ABI,
        }
    }
}

impl FungibleTokenPacketData {
    /// Encodes the packet data. Deterministic for both encodings.
    ///
    /// # Errors
    /// Returns [`CodecError::UnsupportedEncoding`] for an unknown encoding string.
    pub fn encode(&self, encoding: &str) -> Result<Vec<u8>, CodecError> {
        Ok(match Encoding::parse(encoding)? {
            Encoding::Json => self.encode_json(),
            Encoding::Abi => self.encode_abi(),
        })
    }

    /// Decodes packet data, accepting only the canonical form.
    ///
    /// # Errors
    /// - [`CodecError::UnsupportedEncoding`] for an unknown encoding string
    /// - [`CodecError::MalformedEncoding`] if the bytes do not parse or are not canonical
    pub fn decode(value: &[u8], encoding: &str) -> Result<Self, CodecError> {
        let data = match Encoding::parse(encoding)? {
            Encoding::Json => serde_json::from_slice::<Self>(value).map_err(CodecError::malformed)?,
            Encoding::Abi => AbiFungibleTokenPacketData::abi_decode(value)
                .map_err(CodecError::malformed)?
                .into(),
        };

        let canonical = data.encode(encoding)?;
        if canonical != value {
            return Err(CodecError::malformed(format!(
                "{encoding} packet data is not in canonical form"
            )));
        }
        Ok(data)
    }

    fn encode_json(&self) -> Vec<u8> {
        // struct fields serialize in declaration order and nothing here can fail
        serde_json::to_vec(self).unwrap_or_default()
    }

    fn encode_abi(&self) -> Vec<u8> {
        AbiFungibleTokenPacketData::from(self.clone()).abi_encode()
    }
}

impl From<FungibleTokenPacketData> for AbiFungibleTokenPacketData {
    fn from(data: FungibleTokenPacketData) -> Self {
        Self {
            denom: data.denom,
            amount: data.amount,
            sender: data.sender,
            receiver: data.receiver,
            memo: data.memo,
        }
    }
}

impl From<AbiFungibleTokenPacketData> for FungibleTokenPacketData {
    fn from(abi: AbiFungibleTokenPacketData) -> Self {
        Self {
            denom: abi.denom,
            amount: abi.amount,
            sender: abi.sender,
            receiver: abi.receiver,
            memo: abi.memo,
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn packet_data(memo: &str) -> FungibleTokenPacketData {
        FungibleTokenPacketData {
            denom: "uatom".to_string(),
            amount: U256::from(1_000_u64),
            sender: "cosmos1sender".to_string(),
            receiver: "0xreceiver".to_string(),
            memo: memo.to_string(),
        }
    }

    #[test]
    fn json_is_canonical_key_order() {
        let encoded = packet_data("").encode(ICS20_ENCODING_JSON).unwrap();
        assert_eq!(
            encoded,
            br#"{"denom":"uatom","amount":"1000","sender":"cosmos1sender","receiver":"0xreceiver","memo":""}"#
        );
    }

    #[rstest]
    #[case::json_empty_memo(ICS20_ENCODING_JSON, "")]
    #[case::json_with_memo(ICS20_ENCODING_JSON, "hello \"world\"")]
    #[case::abi_empty_memo(ICS20_ENCODING_ABI, "")]
    #[case::abi_with_memo(ICS20_ENCODING_ABI, "{\"forward\":{}}")]
    fn decode_accepts_own_encoding(#[case] encoding: &str, #[case] memo: &str) {
        let data = packet_data(memo);
        let encoded = data.encode(encoding).unwrap();
        assert_eq!(
            FungibleTokenPacketData::decode(&encoded, encoding).unwrap(),
            data
        );
    }

    #[test]
    fn max_amount_survives_json() {
        let mut data = packet_data("");
        data.amount = U256::MAX;
        let encoded = data.encode(ICS20_ENCODING_JSON).unwrap();
        assert_eq!(
            FungibleTokenPacketData::decode(&encoded, ICS20_ENCODING_JSON)
                .unwrap()
                .amount,
            U256::MAX
        );
    }

    #[rstest]
    #[case::reordered_keys(r#"{"amount":"1000","denom":"uatom","sender":"cosmos1sender","receiver":"0xreceiver","memo":""}"#)]
    #[case::whitespace(r#"{"denom": "uatom","amount":"1000","sender":"cosmos1sender","receiver":"0xreceiver","memo":""}"#)]
    #[case::missing_memo(r#"{"denom":"uatom","amount":"1000","sender":"cosmos1sender","receiver":"0xreceiver"}"#)]
    #[case::extra_key(r#"{"denom":"uatom","amount":"1000","sender":"cosmos1sender","receiver":"0xreceiver","memo":"","x":1}"#)]
    #[case::numeric_amount(r#"{"denom":"uatom","amount":1000,"sender":"cosmos1sender","receiver":"0xreceiver","memo":""}"#)]
    #[case::hex_amount(r#"{"denom":"uatom","amount":"0x3e8","sender":"cosmos1sender","receiver":"0xreceiver","memo":""}"#)]
    #[case::unterminated(r#"{"denom":"uatom","amount":"1000"#)]
    #[case::unescaped_quote(r#"{"denom":"ua"tom","amount":"1000","sender":"cosmos1sender","receiver":"0xreceiver","memo":""}"#)]
    fn json_rejects_non_canonical(#[case] input: &str) {
        assert!(matches!(
            FungibleTokenPacketData::decode(input.as_bytes(), ICS20_ENCODING_JSON),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn abi_rejects_tampered_bytes() {
        let encoded = packet_data("memo").encode(ICS20_ENCODING_ABI).unwrap();

        let truncated = &encoded[..encoded.len() - 32];
        assert!(matches!(
            FungibleTokenPacketData::decode(truncated, ICS20_ENCODING_ABI),
            Err(CodecError::MalformedEncoding { .. })
        ));

        let mut trailing = encoded.clone();
        trailing.extend_from_slice(&[0u8; 32]);
        assert!(matches!(
            FungibleTokenPacketData::decode(&trailing, ICS20_ENCODING_ABI),
            Err(CodecError::MalformedEncoding { .. })
        ));

        // the first word is the tuple offset, which must be 0x20
        let mut bad_offset = encoded;
        bad_offset[31] = 0x40;
        assert!(matches!(
            FungibleTokenPacketData::decode(&bad_offset, ICS20_ENCODING_ABI),
            Err(CodecError::MalformedEncoding { .. })
        ));
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert_eq!(
            packet_data("").encode("application/x-protobuf"),
            Err(CodecError::UnsupportedEncoding(
                "application/x-protobuf".to_string()
            ))
        );
        assert_eq!(
            FungibleTokenPacketData::decode(b"{}", "text/plain"),
            Err(CodecError::UnsupportedEncoding("text/plain".to_string()))
        );
    }
}
