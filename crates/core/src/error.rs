//! Error types for the indexer domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ChainError`] - Chain RPC and tx decoding errors
//! - [`StorageError`] - Database errors
//! - [`ActionError`] - Block action execution errors
//! - [`IndexerError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Chain Errors
// =============================================================================

/// Chain RPC and connectivity errors.
///
/// These errors occur when communicating with the CometBFT node over
/// JSON-RPC, or when decoding the transactions a node returned.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Initial connection to the node failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// An RPC request failed.
    #[error("RPC error: {0}")]
    RpcError(String),

    /// A block could not be fetched.
    #[error("Block fetch error at height {height}: {message}")]
    BlockFetch {
        /// Height that failed to fetch.
        height: u64,
        /// Error details.
        message: String,
    },

    /// A transaction payload could not be decoded.
    #[error("Tx decode error: {0}")]
    TxDecode(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and schema preparation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish a database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Schema preparation failed.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Action Errors
// =============================================================================

/// Errors returned by block actions.
///
/// An action error is attributed to one (action, height) pair and logged;
/// it never aborts an indexing run.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Chain collaborator failed.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// The run was cancelled while the action was executing.
    #[error("Action cancelled")]
    Cancelled,
}

// =============================================================================
// Indexer Errors
// =============================================================================

/// Top-level indexer orchestration errors.
///
/// This is the main error type returned by [`crate::services::Indexer`].
/// It wraps all lower-level errors and adds orchestration-specific variants.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Chain connectivity error.
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Storage/database error.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid configuration (zero concurrency, no actions, unknown action
    /// name). Fatal before any block is fetched.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Schema preparation failed for one action.
    ///
    /// Fatal to starting a run; never retried.
    #[error("Schema preparation failed for action {action}: {source}")]
    Schema {
        /// Name of the action whose schema preparation failed.
        action: String,
        /// Underlying action error.
        source: ActionError,
    },

    /// Heights kept failing after the configured number of passes.
    #[error("{count} heights still failing after {passes} passes", count = .heights.len())]
    PersistentFailures {
        /// Number of completed passes.
        passes: u32,
        /// Heights that never fetched successfully.
        heights: Vec<u64>,
    },

    /// Graceful shutdown was requested.
    ///
    /// This is not really an error but uses the error type for control flow.
    #[error("Indexer shutdown requested")]
    ShutdownRequested,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for action operations.
pub type ActionResult<T> = Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    // Permet d'utiliser ? à travers les couches
    #[test]
    fn test_error_conversion_chain() {
        // Storage -> Action
        let storage_err = StorageError::QueryError("db failed".into());
        let action_err: ActionError = storage_err.into();
        assert!(action_err.to_string().contains("db failed"));

        // Chain -> Indexer
        let chain_err = ChainError::RpcError("rpc failed".into());
        let indexer_err: IndexerError = chain_err.into();
        assert!(indexer_err.to_string().contains("rpc failed"));
    }

    #[test]
    fn test_persistent_failures_reports_count() {
        let err = IndexerError::PersistentFailures {
            passes: 10,
            heights: vec![4, 8, 15],
        };
        let msg = err.to_string();
        assert!(msg.contains('3') && msg.contains("10"));
    }

    #[test]
    fn test_block_fetch_error_includes_height() {
        let err = ChainError::BlockFetch {
            height: 2_301_720,
            message: "post failed".into(),
        };
        assert!(err.to_string().contains("2301720"));
    }
}
