//! Models for the CosmWasm action.

use serde::{Deserialize, Serialize};

use scribe_core::models::TxHash;

/// A contract execution observed on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractExecution {
    /// Hash of the containing tx.
    pub tx_hash: TxHash,
    /// Index of the message within the tx.
    pub msg_index: u32,
    /// Account that executed the contract.
    pub sender: String,
    /// Contract address.
    pub contract: String,
    /// Execute payload.
    pub msg: serde_json::Value,
    /// Funds sent along with the call, as a JSON array of coins.
    pub funds: serde_json::Value,
}

/// A contract instantiation observed on-chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInstantiation {
    /// Hash of the containing tx.
    pub tx_hash: TxHash,
    /// Index of the message within the tx.
    pub msg_index: u32,
    /// Account that instantiated the contract.
    pub sender: String,
    /// Code id instantiated.
    pub code_id: u64,
    /// Human-readable contract label.
    pub label: String,
    /// Init payload.
    pub msg: serde_json::Value,
}
