//! Block action for CosmWasm smart contract activity.
//!
//! Indexes contract executions and instantiations carried by a block's
//! txs. Store-code, migrate, and admin messages are not persisted.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, warn};

use scribe_core::error::{ActionError, ActionResult};
use scribe_core::metrics::record_tx_indexed;
use scribe_core::models::{Msg, TxHash};
use scribe_core::ports::{ActionContext, BlockAction, RawBlock};

use super::models::{ContractExecution, ContractInstantiation};
use super::storage::{PgWasmStorage, WasmStorage};

/// Name used for configuring this action via `--actions`.
pub const ACTION_NAME: &str = "cosmwasm_contracts";

/// Block action indexing CosmWasm contract activity.
pub struct CosmwasmAction {
    storage: Arc<dyn WasmStorage>,
}

impl CosmwasmAction {
    pub fn new(storage: Arc<dyn WasmStorage>) -> Self {
        Self { storage }
    }

    /// Convenience constructor backed by PostgreSQL.
    pub fn with_pool(pool: PgPool) -> Self {
        Self::new(Arc::new(PgWasmStorage::new(pool)))
    }

    async fn index_contracts(&self, ctx: &ActionContext, block: &RawBlock) -> ActionResult<()> {
        let total_txs = block.txs.len();

        for tx in &block.txs {
            if ctx.is_cancelled() {
                return Err(ActionError::Cancelled);
            }

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

            let mut indexed_any = false;
            for (msg_index, msg) in decoded.msgs.iter().enumerate() {
                indexed_any |= self
                    .handle_wasm_msg(msg, msg_index as u32, block.height, &tx.hash)
                    .await;
            }
            if indexed_any {
                record_tx_indexed(ACTION_NAME);
            }
        }

        Ok(())
    }

    /// Persist one wasm message if it is a kind this action indexes.
    /// Returns whether a row was written.
    async fn handle_wasm_msg(&self, msg: &Msg, msg_index: u32, height: u64, hash: &TxHash) -> bool {
        let inserted = match msg {
            Msg::WasmExecute(m) => {
                let funds = serde_json::to_value(&m.funds).unwrap_or_default();
                self.storage
                    .insert_execution(&ContractExecution {
                        tx_hash: hash.clone(),
                        msg_index,
                        sender: m.sender.clone(),
                        contract: m.contract.clone(),
                        msg: m.msg.clone(),
                        funds,
                    })
                    .await
            }
            Msg::WasmInstantiate(m) => {
                self.storage
                    .insert_instantiation(&ContractInstantiation {
                        tx_hash: hash.clone(),
                        msg_index,
                        sender: m.sender.clone(),
                        code_id: m.code_id,
                        label: m.label.clone(),
                        msg: m.msg.clone(),
                    })
                    .await
            }
            _ => return false,
        };

        match inserted {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    height,
                    tx_hash = %hash,
                    msg_index,
                    kind = msg.type_url(),
                    error = %err,
                    "Failed to insert wasm msg"
                );
                false
            }
        }
    }
}

#[async_trait]
impl BlockAction for CosmwasmAction {
    fn name(&self) -> &'static str {
        ACTION_NAME
    }

    async fn prepare_schema(&self) -> ActionResult<()> {
        self.storage.prepare_schema().await?;
        Ok(())
    }

    async fn execute(&self, ctx: &ActionContext, block: &RawBlock) -> ActionResult<()> {
        self.index_contracts(ctx, block).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::Utc;
    use tokio::sync::watch;

    use scribe_core::error::{ChainError, ChainResult, StorageResult};
    use scribe_core::models::{
        BlockHash, Coin, DecodedTx, WasmExecuteMsg, WasmInstantiateMsg,
    };
    use scribe_core::ports::{ChainClient, RawTx};

    struct OneTxChain {
        decoded: DecodedTx,
    }

    #[async_trait]
    impl ChainClient for OneTxChain {
        fn chain_id(&self) -> &str {
            "juno-1"
        }

        async fn latest_height(&self) -> ChainResult<u64> {
            Ok(0)
        }

        async fn block_at(&self, height: u64) -> ChainResult<RawBlock> {
            Err(ChainError::BlockFetch {
                height,
                message: "not used".into(),
            })
        }

        fn decode_tx(&self, _tx: &RawTx) -> ChainResult<DecodedTx> {
            Ok(self.decoded.clone())
        }

        async fn tx_result(
            &self,
            _hash: &scribe_core::models::TxHash,
        ) -> ChainResult<scribe_core::models::TxResult> {
            Err(ChainError::RpcError("not used".into()))
        }
    }

    #[derive(Default)]
    struct RecordingStorage {
        executions: Mutex<Vec<ContractExecution>>,
        instantiations: Mutex<Vec<ContractInstantiation>>,
    }

    #[async_trait]
    impl WasmStorage for RecordingStorage {
        async fn prepare_schema(&self) -> StorageResult<()> {
            Ok(())
        }

        async fn insert_execution(&self, execution: &ContractExecution) -> StorageResult<()> {
            self.executions.lock().unwrap().push(execution.clone());
            Ok(())
        }

        async fn insert_instantiation(
            &self,
            instantiation: &ContractInstantiation,
        ) -> StorageResult<()> {
            self.instantiations
                .lock()
                .unwrap()
                .push(instantiation.clone());
            Ok(())
        }
    }

    fn block_with_one_tx() -> RawBlock {
        RawBlock {
            height: 42,
            hash: BlockHash([1; 32]),
            time: Utc::now(),
            txs: vec![RawTx {
                index: 0,
                hash: scribe_core::models::TxHash([9; 32]),
                bytes: vec![0x0a],
            }],
        }
    }

    fn context(chain: Arc<dyn ChainClient>) -> ActionContext {
        let (_tx, rx) = watch::channel(false);
        ActionContext::new(chain, rx)
    }

    #[tokio::test]
    async fn indexes_executions_and_instantiations() {
        let decoded = DecodedTx {
            msgs: vec![
                Msg::WasmExecute(WasmExecuteMsg {
                    sender: "juno1caller".into(),
                    contract: "juno1contract".into(),
                    msg: serde_json::json!({"vote": {"proposal_id": 12, "vote": "yes"}}),
                    funds: vec![Coin {
                        denom: "ujuno".into(),
                        amount: "10".into(),
                    }],
                }),
                Msg::WasmInstantiate(WasmInstantiateMsg {
                    sender: "juno1deployer".into(),
                    code_id: 487,
                    label: "dao-core".into(),
                    msg: serde_json::json!({"name": "my dao"}),
                }),
                Msg::Other {
                    type_url: "/cosmwasm.wasm.v1.MsgStoreCode".into(),
                },
            ],
            fee: None,
            memo: String::new(),
        };
        let storage = Arc::new(RecordingStorage::default());
        let action = CosmwasmAction::new(storage.clone());

        action
            .execute(&context(Arc::new(OneTxChain { decoded })), &block_with_one_tx())
            .await
            .unwrap();

        let executions = storage.executions.lock().unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].contract, "juno1contract");
        assert_eq!(executions[0].msg["vote"]["vote"], "yes");
        assert_eq!(executions[0].funds[0]["amount"], "10");

        let instantiations = storage.instantiations.lock().unwrap();
        assert_eq!(instantiations.len(), 1);
        assert_eq!(instantiations[0].code_id, 487);
        assert_eq!(instantiations[0].msg_index, 1);
    }

    #[tokio::test]
    async fn blocks_without_wasm_activity_write_nothing() {
        let decoded = DecodedTx {
            msgs: vec![Msg::Other {
                type_url: "/cosmos.staking.v1beta1.MsgDelegate".into(),
            }],
            fee: None,
            memo: String::new(),
        };
        let storage = Arc::new(RecordingStorage::default());
        let action = CosmwasmAction::new(storage.clone());

        action
            .execute(&context(Arc::new(OneTxChain { decoded })), &block_with_one_tx())
            .await
            .unwrap();

        assert!(storage.executions.lock().unwrap().is_empty());
        assert!(storage.instantiations.lock().unwrap().is_empty());
    }
}
