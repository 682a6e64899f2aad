//! Storage layer for the CosmWasm action.

use async_trait::async_trait;
use sqlx::PgPool;

use scribe_core::error::{StorageError, StorageResult};

use super::models::{ContractExecution, ContractInstantiation};

/// Storage trait for CosmWasm contract activity.
#[async_trait]
pub trait WasmStorage: Send + Sync {
    /// Idempotently ensure all tables exist.
    async fn prepare_schema(&self) -> StorageResult<()>;

    /// Insert a contract execution row.
    async fn insert_execution(&self, execution: &ContractExecution) -> StorageResult<()>;

    /// Insert a contract instantiation row.
    async fn insert_instantiation(
        &self,
        instantiation: &ContractInstantiation,
    ) -> StorageResult<()>;
}

/// PostgreSQL implementation of WasmStorage.
pub struct PgWasmStorage {
    pool: PgPool,
}

impl PgWasmStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WasmStorage for PgWasmStorage {
    async fn prepare_schema(&self) -> StorageResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::SchemaError(e.to_string()))?;
        Ok(())
    }

    async fn insert_execution(&self, execution: &ContractExecution) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasm_executions (
                tx_hash, msg_index, sender, contract, msg, funds
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tx_hash, msg_index) DO NOTHING
            "#,
        )
        .bind(&execution.tx_hash.0[..])
        .bind(execution.msg_index as i32)
        .bind(&execution.sender)
        .bind(&execution.contract)
        .bind(&execution.msg)
        .bind(&execution.funds)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }

    async fn insert_instantiation(
        &self,
        instantiation: &ContractInstantiation,
    ) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasm_instantiations (
                tx_hash, msg_index, sender, code_id, label, msg
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tx_hash, msg_index) DO NOTHING
            "#,
        )
        .bind(&instantiation.tx_hash.0[..])
        .bind(instantiation.msg_index as i32)
        .bind(&instantiation.sender)
        .bind(instantiation.code_id as i64)
        .bind(&instantiation.label)
        .bind(&instantiation.msg)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(())
    }
}

/// Idempotent schema for the CosmWasm action.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS wasm_executions (
    tx_hash BYTEA NOT NULL,
    msg_index INTEGER NOT NULL,
    sender TEXT NOT NULL,
    contract TEXT NOT NULL,
    msg JSONB NOT NULL,
    funds JSONB NOT NULL DEFAULT '[]',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (tx_hash, msg_index)
);

CREATE INDEX IF NOT EXISTS idx_wasm_executions_contract ON wasm_executions(contract);
CREATE INDEX IF NOT EXISTS idx_wasm_executions_sender ON wasm_executions(sender);

CREATE TABLE IF NOT EXISTS wasm_instantiations (
    tx_hash BYTEA NOT NULL,
    msg_index INTEGER NOT NULL,
    sender TEXT NOT NULL,
    code_id BIGINT NOT NULL,
    label TEXT NOT NULL,
    msg JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (tx_hash, msg_index)
);

CREATE INDEX IF NOT EXISTS idx_wasm_instantiations_code_id ON wasm_instantiations(code_id);
"#;
