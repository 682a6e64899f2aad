//! Storage layer for the IBC transfers action.

use async_trait::async_trait;
use sqlx::PgPool;

use scribe_core::error::{StorageError, StorageResult};

use super::models::{PacketMsgRecord, TransferMsgRecord, TxRecord};

/// Storage trait for IBC transfer data.
#[async_trait]
pub trait IbcTransferStorage: Send + Sync {
    /// Idempotently ensure all tables exist.
    async fn prepare_schema(&self) -> StorageResult<()>;

    /// Insert a tx row.
    async fn insert_tx(&self, tx: &TxRecord) -> StorageResult<()>;

    /// Insert an ICS-20 transfer message row.
    async fn insert_transfer(&self, msg: &TransferMsgRecord) -> StorageResult<()>;

    /// Insert a packet receive message row.
    async fn insert_recv_packet(&self, msg: &PacketMsgRecord) -> StorageResult<()>;

    /// Insert a packet acknowledgement message row.
    async fn insert_acknowledgement(&self, msg: &PacketMsgRecord) -> StorageResult<()>;

    /// Insert a packet timeout message row.
    async fn insert_timeout(&self, msg: &PacketMsgRecord) -> StorageResult<()>;
}

/// PostgreSQL implementation of IbcTransferStorage.
pub struct PgIbcTransferStorage {
    pool: PgPool,
}

impl PgIbcTransferStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_packet_msg(
        &self,
        table: &'static str,
        msg: &PacketMsgRecord,
    ) -> StorageResult<()> {
        // Table names come from the constants below, never from input.
        let query = format!(
            r#"
            INSERT INTO {table} (
                tx_hash, msg_index, signer, src_channel, dst_channel, src_port, dst_port
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tx_hash, msg_index) DO NOTHING
            "#,
        );

        sqlx::query(&query)
            .bind(&msg.tx_hash.0[..])
            .bind(msg.msg_index as i32)
            .bind(&msg.signer)
            .bind(&msg.src_channel)
            .bind(&msg.dst_channel)
            .bind(&msg.src_port)
            .bind(&msg.dst_port)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl IbcTransferStorage for PgIbcTransferStorage {
    async fn prepare_schema(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::SchemaError(e.to_string()))?;
        Ok(())
    }

    async fn insert_tx(&self, tx: &TxRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO txs (
                hash, chain_id, block_height, block_time, raw_log,
                code, fee_amount, fee_denom, gas_used, gas_wanted
            )
            VALUES ($1, $2, $3, $4, $5::JSONB, $6, $7, $8, $9, $10)
            ON CONFLICT (hash) DO NOTHING
            "#,
        )
        .bind(&tx.hash.0[..])
        .bind(&tx.chain_id)
        .bind(tx.block_height as i64)
        .bind(tx.block_time)
        .bind(&tx.raw_log)
        .bind(tx.code as i32)
        .bind(&tx.fee_amount)
        .bind(&tx.fee_denom)
        .bind(tx.gas_used)
        .bind(tx.gas_wanted)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn insert_transfer(&self, msg: &TransferMsgRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO msg_transfers (
                tx_hash, msg_index, signer, sender, receiver,
                amount, denom, src_channel, src_port
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tx_hash, msg_index) DO NOTHING
            "#,
        )
        .bind(&msg.tx_hash.0[..])
        .bind(msg.msg_index as i32)
        .bind(&msg.signer)
        .bind(&msg.sender)
        .bind(&msg.receiver)
        .bind(&msg.amount)
        .bind(&msg.denom)
        .bind(&msg.src_channel)
        .bind(&msg.src_port)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn insert_recv_packet(&self, msg: &PacketMsgRecord) -> StorageResult<()> {
        self.insert_packet_msg("msg_recv_packets", msg).await
    }

    async fn insert_acknowledgement(&self, msg: &PacketMsgRecord) -> StorageResult<()> {
        self.insert_packet_msg("msg_acknowledgements", msg).await
    }

    async fn insert_timeout(&self, msg: &PacketMsgRecord) -> StorageResult<()> {
        self.insert_packet_msg("msg_timeouts", msg).await
    }
}

/// Idempotent schema for the IBC transfers action.
///
/// Message tables key on (tx_hash, msg_index) and cascade with their tx,
/// so re-running a block can never duplicate rows.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS txs (
    hash BYTEA PRIMARY KEY,
    chain_id TEXT NOT NULL,
    block_height BIGINT NOT NULL,
    block_time TIMESTAMPTZ NOT NULL,
    raw_log JSONB NOT NULL,
    code INTEGER NOT NULL,
    fee_amount TEXT,
    fee_denom TEXT,
    gas_used BIGINT NOT NULL,
    gas_wanted BIGINT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX IF NOT EXISTS idx_txs_block_height ON txs(block_height);
CREATE INDEX IF NOT EXISTS idx_txs_chain_id ON txs(chain_id);

CREATE TABLE IF NOT EXISTS msg_transfers (
    tx_hash BYTEA NOT NULL REFERENCES txs(hash) ON DELETE CASCADE,
    msg_index INTEGER NOT NULL,
    signer TEXT NOT NULL,
    sender TEXT NOT NULL,
    receiver TEXT NOT NULL,
    amount TEXT NOT NULL,
    denom TEXT NOT NULL,
    src_channel TEXT NOT NULL,
    src_port TEXT NOT NULL,
    PRIMARY KEY (tx_hash, msg_index)
);

CREATE INDEX IF NOT EXISTS idx_msg_transfers_sender ON msg_transfers(sender);
CREATE INDEX IF NOT EXISTS idx_msg_transfers_receiver ON msg_transfers(receiver);

CREATE TABLE IF NOT EXISTS msg_recv_packets (
    tx_hash BYTEA NOT NULL REFERENCES txs(hash) ON DELETE CASCADE,
    msg_index INTEGER NOT NULL,
    signer TEXT NOT NULL,
    src_channel TEXT NOT NULL,
    dst_channel TEXT NOT NULL,
    src_port TEXT NOT NULL,
    dst_port TEXT NOT NULL,
    PRIMARY KEY (tx_hash, msg_index)
);

CREATE TABLE IF NOT EXISTS msg_acknowledgements (
    tx_hash BYTEA NOT NULL REFERENCES txs(hash) ON DELETE CASCADE,
    msg_index INTEGER NOT NULL,
    signer TEXT NOT NULL,
    src_channel TEXT NOT NULL,
    dst_channel TEXT NOT NULL,
    src_port TEXT NOT NULL,
    dst_port TEXT NOT NULL,
    PRIMARY KEY (tx_hash, msg_index)
);

CREATE TABLE IF NOT EXISTS msg_timeouts (
    tx_hash BYTEA NOT NULL REFERENCES txs(hash) ON DELETE CASCADE,
    msg_index INTEGER NOT NULL,
    signer TEXT NOT NULL,
    src_channel TEXT NOT NULL,
    dst_channel TEXT NOT NULL,
    src_port TEXT NOT NULL,
    dst_port TEXT NOT NULL,
    PRIMARY KEY (tx_hash, msg_index)
);
"#;
