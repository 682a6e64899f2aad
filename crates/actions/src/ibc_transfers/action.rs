//! Block action for IBC fungible token transfers.
//!
//! Indexes every tx in a block plus the ICS-20 transfer and IBC packet
//! lifecycle messages those txs carry.
//!
//! # Indexed messages
//!
//! - `MsgTransfer`: outgoing fungible token transfer
//! - `MsgRecvPacket` / `MsgAcknowledgement` / `MsgTimeout`: packet lifecycle

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use scribe_core::error::{ActionError, ActionResult};
use scribe_core::metrics::record_tx_indexed;
use scribe_core::models::{Msg, TxHash};
use scribe_core::ports::{ActionContext, BlockAction, RawBlock};

use super::models::{PacketMsgRecord, TransferMsgRecord, TxRecord};
use super::storage::{IbcTransferStorage, PgIbcTransferStorage};

/// Name used for configuring this action via `--actions`.
pub const ACTION_NAME: &str = "ics20_transfers";

// =============================================================================
// Action
// =============================================================================

/// Block action indexing txs and ICS-20 transfer data.
///
/// Extracts tx rows and IBC message rows and persists them using its own
/// storage.
pub struct IbcTransferAction {
    storage: Arc<dyn IbcTransferStorage>,
}

impl IbcTransferAction {
    pub fn new(storage: Arc<dyn IbcTransferStorage>) -> Self {
        Self { storage }
    }

    /// Convenience constructor backed by PostgreSQL.
    pub fn with_pool(pool: PgPool) -> Self {
        Self::new(Arc::new(PgIbcTransferStorage::new(pool)))
    }

    /// Index every tx in the block along with its IBC messages.
    async fn index_transfers(&self, ctx: &ActionContext, block: &RawBlock) -> ActionResult<()> {
        let total_txs = block.txs.len();

        for tx in &block.txs {
            if ctx.is_cancelled() {
                return Err(ActionError::Cancelled);
            }

            // Application-specific txs this client cannot decode are
            // skipped, not fatal.
            let decoded = match ctx.chain().decode_tx(tx) {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(
                        height = block.height,
                        tx_index = tx.index + 1,
                        total_txs,
                        error = %err,
                        "Failed to decode tx"
                    );
                    continue;
                }
            };

            let result = match ctx.chain().tx_result(&tx.hash).await {
                Ok(result) => result,
                Err(err) => {
                    debug!(
                        height = block.height,
                        tx_index = tx.index + 1,
                        total_txs,
                        error = %err,
                        "Failed to query tx results"
                    );
                    continue;
                }
            };

            let (fee_amount, fee_denom) = match &decoded.fee {
                Some(fee) => (fee.amount.clone(), fee.denom.clone()),
                None => ("0".to_string(), String::new()),
            };

            // Failed txs carry free text in raw_log; wrap it so the column
            // stays valid JSON.
            let raw_log = if result.is_success() {
                result.raw_log.clone()
            } else {
                serde_json::json!({ "error": result.raw_log }).to_string()
            };

            let record = TxRecord {
                hash: tx.hash.clone(),
                chain_id: ctx.chain().chain_id().to_string(),
                block_height: block.height,
                block_time: block.time,
                raw_log,
                code: result.code,
                fee_amount,
                fee_denom,
                gas_used: result.gas_used,
                gas_wanted: result.gas_wanted,
            };

            let inserted = self.storage.insert_tx(&record).await;
            self.log_tx_insertion(
                inserted.err(),
                tx.index,
                decoded.msgs.len(),
                total_txs,
                block.height,
            );

            for (msg_index, msg) in decoded.msgs.iter().enumerate() {
                self.handle_ibc_msg(msg, msg_index as u32, block.height, &tx.hash)
                    .await;
            }
        }

        Ok(())
    }

    /// Appropriately log a successful or failed attempt to write a tx row.
    fn log_tx_insertion(
        &self,
        err: Option<scribe_core::error::StorageError>,
        tx_index: u32,
        msg_count: usize,
        tx_count: usize,
        height: u64,
    ) {
        match err {
            Some(err) => warn!(
                height,
                tx_index = tx_index + 1,
                tx_count,
                msg_count,
                error = %err,
                "Failed to write tx to database"
            ),
            None => {
                record_tx_indexed(ACTION_NAME);
                info!(
                    height,
                    tx_index = tx_index + 1,
                    tx_count,
                    msg_count,
                    "Successfully wrote tx to database"
                );
            }
        }
    }

    /// Persist one IBC message if it is a kind this action indexes.
    ///
    /// Insert failures are logged per message and never stop the rest of
    /// the tx.
    async fn handle_ibc_msg(&self, msg: &Msg, msg_index: u32, height: u64, hash: &TxHash) {
        let inserted = match msg {
            Msg::IbcTransfer(m) => {
                self.storage
                    .insert_transfer(&TransferMsgRecord {
                        tx_hash: hash.clone(),
                        msg_index,
                        signer: m.sender.clone(),
                        sender: m.sender.clone(),
                        receiver: m.receiver.clone(),
                        amount: m.token.amount.clone(),
                        denom: m.token.denom.clone(),
                        src_channel: m.source_channel.clone(),
                        src_port: m.source_port.clone(),
                    })
                    .await
            }
            Msg::IbcRecvPacket(m) => {
                self.storage
                    .insert_recv_packet(&packet_record(m, msg_index, hash))
                    .await
            }
            Msg::IbcAcknowledgement(m) => {
                self.storage
                    .insert_acknowledgement(&packet_record(m, msg_index, hash))
                    .await
            }
            Msg::IbcTimeout(m) => {
                self.storage
                    .insert_timeout(&packet_record(m, msg_index, hash))
                    .await
            }
            _ => return,
        };

        if let Err(err) = inserted {
            warn!(
                height,
                tx_hash = %hash,
                msg_index,
                kind = msg.type_url(),
                error = %err,
                "Failed to insert IBC msg"
            );
        }
    }
}

fn packet_record(
    m: &scribe_core::models::IbcPacketMsg,
    msg_index: u32,
    hash: &TxHash,
) -> PacketMsgRecord {
    PacketMsgRecord {
        tx_hash: hash.clone(),
        msg_index,
        signer: m.signer.clone(),
        src_channel: m.src_channel.clone(),
        dst_channel: m.dst_channel.clone(),
        src_port: m.src_port.clone(),
        dst_port: m.dst_port.clone(),
    }
}

#[async_trait]
impl BlockAction for IbcTransferAction {
    fn name(&self) -> &'static str {
        ACTION_NAME
    }

    async fn prepare_schema(&self) -> ActionResult<()> {
        self.storage.prepare_schema().await?;
        Ok(())
    }

    async fn execute(&self, ctx: &ActionContext, block: &RawBlock) -> ActionResult<()> {
        self.index_transfers(ctx, block).await
    }
}

// =============================================================================
// Tests
// =============================================================================
