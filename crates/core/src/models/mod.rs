//! Domain models representing indexed chain data.
//!
//! These models are storage-agnostic and represent the canonical
//! form of indexed data within the domain layer. The engine treats
//! blocks and transactions as opaque; only the message enum below is
//! interpreted, and only inside block actions.

use serde::{Deserialize, Serialize};

// =============================================================================
// 32-byte Hash Types
// =============================================================================

/// Macro to generate 32-byte hash newtypes with common functionality.
///
/// Generates:
/// - `from_hex()` - Parse from hex string (with or without 0x prefix)
/// - `to_hex()` - Convert to 0x-prefixed hex string
/// - `Display` trait implementation
/// - `From<[u8; 32]>` implementation
macro_rules! hash32_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Parse from hex string (with or without 0x prefix).
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let s = s.strip_prefix("0x").unwrap_or(s);
                let bytes = hex::decode(s)?;
                let arr: [u8; 32] = bytes
                    .try_into()
                    .map_err(|_| hex::FromHexError::InvalidStringLength)?;
                Ok(Self(arr))
            }

            /// Convert to 0x-prefixed hex string.
            pub fn to_hex(&self) -> String {
                format!("0x{}", hex::encode(self.0))
            }

            /// Get the inner bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

hash32_newtype!(
    /// 32-byte block hash.
    BlockHash
);

hash32_newtype!(
    /// 32-byte transaction hash (SHA-256 of the raw tx bytes).
    TxHash
);

// =============================================================================
// Coins
// =============================================================================

/// A single denomination amount.
///
/// Amounts are kept as decimal strings: cosmos amounts routinely exceed
/// u64 and the indexer never does arithmetic on them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination (e.g., "uatom", "ujuno").
    pub denom: String,
    /// Decimal string amount.
    pub amount: String,
}

// =============================================================================
// Decoded Transactions
// =============================================================================

/// Execution result of a transaction, as reported by the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    /// ABCI response code; 0 means success.
    pub code: u32,
    /// Raw log emitted by the tx (JSON for successful txs, free text for
    /// failed ones).
    pub raw_log: String,
    /// Gas consumed.
    pub gas_used: i64,
    /// Gas requested.
    pub gas_wanted: i64,
}

impl TxResult {
    /// Whether the tx executed successfully.
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}

/// A transaction decoded from its wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTx {
    /// Messages carried by the tx, in order.
    pub msgs: Vec<Msg>,
    /// First fee coin, if any was attached.
    pub fee: Option<Coin>,
    /// Tx memo.
    pub memo: String,
}

// =============================================================================
// Messages
// =============================================================================

/// IBC fungible token transfer (ICS-20 `MsgTransfer`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcTransferMsg {
    /// Transfer sender (also the signer).
    pub sender: String,
    /// Transfer receiver on the counterparty chain.
    pub receiver: String,
    /// Token being transferred.
    pub token: Coin,
    /// Source channel (e.g., "channel-0").
    pub source_channel: String,
    /// Source port (e.g., "transfer").
    pub source_port: String,
}

/// IBC channel packet lifecycle message (`MsgRecvPacket`, `MsgTimeout`,
/// `MsgAcknowledgement` share this shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcPacketMsg {
    /// Relayer that submitted the message.
    pub signer: String,
    /// Packet source channel.
    pub src_channel: String,
    /// Packet destination channel.
    pub dst_channel: String,
    /// Packet source port.
    pub src_port: String,
    /// Packet destination port.
    pub dst_port: String,
}

/// CosmWasm contract execution (`MsgExecuteContract`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasmExecuteMsg {
    /// Account executing the contract.
    pub sender: String,
    /// Contract address.
    pub contract: String,
    /// Execute payload as JSON.
    pub msg: serde_json::Value,
    /// Funds sent along with the call.
    pub funds: Vec<Coin>,
}

/// CosmWasm contract instantiation (`MsgInstantiateContract`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WasmInstantiateMsg {
    /// Account instantiating the contract.
    pub sender: String,
    /// Code id being instantiated.
    pub code_id: u64,
    /// Human-readable contract label.
    pub label: String,
    /// Init payload as JSON.
    pub msg: serde_json::Value,
}

/// A message carried by a transaction, decoded into the variants the
/// built-in actions know how to index.
///
/// Branching over message kinds belongs inside the actions; the engine
/// never inspects this enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Msg {
    /// ICS-20 fungible token transfer.
    IbcTransfer(IbcTransferMsg),
    /// IBC packet receive.
    IbcRecvPacket(IbcPacketMsg),
    /// IBC packet timeout.
    IbcTimeout(IbcPacketMsg),
    /// IBC packet acknowledgement.
    IbcAcknowledgement(IbcPacketMsg),
    /// CosmWasm contract execution.
    WasmExecute(WasmExecuteMsg),
    /// CosmWasm contract instantiation.
    WasmInstantiate(WasmInstantiateMsg),
    /// Any message kind the indexer does not interpret.
    Other {
        /// Protobuf type URL of the message.
        type_url: String,
    },
}

impl Msg {
    /// Protobuf type URL of this message.
    pub fn type_url(&self) -> &str {
        match self {
            Msg::IbcTransfer(_) => "/ibc.applications.transfer.v1.MsgTransfer",
            Msg::IbcRecvPacket(_) => "/ibc.core.channel.v1.MsgRecvPacket",
            Msg::IbcTimeout(_) => "/ibc.core.channel.v1.MsgTimeout",
            Msg::IbcAcknowledgement(_) => "/ibc.core.channel.v1.MsgAcknowledgement",
            Msg::WasmExecute(_) => "/cosmwasm.wasm.v1.MsgExecuteContract",
            Msg::WasmInstantiate(_) => "/cosmwasm.wasm.v1.MsgInstantiateContract",
            Msg::Other { type_url } => type_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_hash_hex_roundtrip() {
        let hex = "0x1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = BlockHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
    }

    #[test]
    fn tx_hash_without_prefix() {
        let hex = "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
        let hash = TxHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), format!("0x{}", hex));
    }

    #[test]
    fn hash32_invalid_length() {
        assert!(BlockHash::from_hex("0x1234").is_err());
    }

    #[test]
    fn msg_type_urls_are_stable() {
        let msg = Msg::IbcTransfer(IbcTransferMsg {
            sender: "juno1sender".into(),
            receiver: "cosmos1receiver".into(),
            token: Coin {
                denom: "ujuno".into(),
                amount: "1000".into(),
            },
            source_channel: "channel-0".into(),
            source_port: "transfer".into(),
        });
        assert_eq!(msg.type_url(), "/ibc.applications.transfer.v1.MsgTransfer");

        let other = Msg::Other {
            type_url: "/osmosis.gamm.v1beta1.MsgSwapExactAmountIn".into(),
        };
        assert_eq!(
            other.type_url(),
            "/osmosis.gamm.v1beta1.MsgSwapExactAmountIn"
        );
    }

    #[test]
    fn tx_result_success_is_code_zero() {
        let ok = TxResult {
            code: 0,
            raw_log: "[]".into(),
            gas_used: 60_000,
            gas_wanted: 200_000,
        };
        assert!(ok.is_success());

        let failed = TxResult { code: 5, ..ok };
        assert!(!failed.is_success());
    }
}
