//! Models for the IBC transfers action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scribe_core::models::TxHash;

/// A single tx, which can contain many messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxRecord {
    /// Transaction hash.
    pub hash: TxHash,
    /// Chain the tx was observed on.
    pub chain_id: String,
    /// Height of the containing block.
    pub block_height: u64,
    /// Block timestamp.
    pub block_time: DateTime<Utc>,
    /// Raw log as a JSON string; failed txs get `{"error": …}`.
    pub raw_log: String,
    /// ABCI response code; 0 means success.
    pub code: u32,
    /// First fee coin amount ("0" when no fee was attached).
    pub fee_amount: String,
    /// First fee coin denom ("" when no fee was attached).
    pub fee_denom: String,
    /// Gas consumed.
    pub gas_used: i64,
    /// Gas requested.
    pub gas_wanted: i64,
}

/// An ICS-20 `MsgTransfer` carried by a tx.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferMsgRecord {
    /// Hash of the containing tx.
    pub tx_hash: TxHash,
    /// Index of the message within the tx.
    pub msg_index: u32,
    /// Message signer (the transfer sender).
    pub signer: String,
    /// Transfer sender.
    pub sender: String,
    /// Transfer receiver on the counterparty chain.
    pub receiver: String,
    /// Amount as a decimal string.
    pub amount: String,
    /// Token denomination.
    pub denom: String,
    /// Source channel.
    pub src_channel: String,
    /// Source port.
    pub src_port: String,
}

/// An IBC packet lifecycle message (receive, acknowledgement, timeout
/// share this shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacketMsgRecord {
    /// Hash of the containing tx.
    pub tx_hash: TxHash,
    /// Index of the message within the tx.
    pub msg_index: u32,
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
