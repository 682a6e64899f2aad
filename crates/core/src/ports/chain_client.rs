//! Port trait for the chain RPC client.
//!
//! This trait defines the interface for fetching blocks and looking up
//! transaction data on a CometBFT chain. Implementations live in the
//! infrastructure layer (e.g., `scribe-cometbft`).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ChainResult;
use crate::models::{BlockHash, DecodedTx, TxHash, TxResult};

/// Raw block data from the chain before any interpretation.
///
/// The engine hands this to block actions without looking inside;
/// transactions stay as wire bytes until an action asks for a decode.
#[derive(Debug, Clone)]
pub struct RawBlock {
    /// Block height.
    pub height: u64,
    /// Block hash.
    pub hash: BlockHash,
    /// Block timestamp.
    pub time: DateTime<Utc>,
    /// Transactions in block order.
    pub txs: Vec<RawTx>,
}

/// Raw transaction data.
#[derive(Debug, Clone)]
pub struct RawTx {
    /// Index in block.
    pub index: u32,
    /// Transaction hash (SHA-256 of `bytes`).
    pub hash: TxHash,
    /// Wire-encoded transaction bytes.
    pub bytes: Vec<u8>,
}

/// Port trait for the chain RPC client.
///
/// One client instance is shared read-only by every concurrent worker and
/// every action; implementations must be safe for that.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Identifier of the connected chain (e.g., "juno-1").
    fn chain_id(&self) -> &str;

    /// Current latest block height on the node.
    async fn latest_height(&self) -> ChainResult<u64>;

    /// Fetch the full block at the given height.
    ///
    /// The engine retries this uniformly on any error; implementations do
    /// not need to distinguish transient from permanent failures.
    async fn block_at(&self, height: u64) -> ChainResult<RawBlock>;

    /// Decode a raw transaction into its messages and fee.
    fn decode_tx(&self, tx: &RawTx) -> ChainResult<DecodedTx>;

    /// Query the execution result of a transaction by hash.
    async fn tx_result(&self, hash: &TxHash) -> ChainResult<TxResult>;
}
