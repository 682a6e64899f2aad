//! CometBFT JSON-RPC client implementing the ChainClient port.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use scribe_core::error::{ChainError, ChainResult};
use scribe_core::models::{BlockHash, DecodedTx, TxHash, TxResult};
use scribe_core::ports::{ChainClient, RawBlock, RawTx};

use crate::decode;

/// Configuration for the CometBFT client.
#[derive(Debug, Clone)]
pub struct CometClientConfig {
    /// RPC endpoint (e.g., "http://127.0.0.1:26657").
    pub rpc_url: String,
    /// Per-request timeout.
    pub request_timeout: std::time::Duration,
}

impl Default for CometClientConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:26657".to_string(),
            request_timeout: std::time::Duration::from_secs(10),
        }
    }
}

/// CometBFT client adapter implementing the ChainClient port.
pub struct CometClient {
    http: reqwest::Client,
    rpc_url: String,
    chain_id: String,
}

impl CometClient {
    /// Connect to a CometBFT node and verify it answers.
    ///
    /// The chain id is read once from the node's status and kept for the
    /// lifetime of the client.
    #[instrument(skip_all, fields(url = %config.rpc_url))]
    pub async fn connect(config: CometClientConfig) -> ChainResult<Self> {
        debug!("Connecting to node");

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?;

        let status: StatusResult = call(&http, &config.rpc_url, "status", serde_json::json!({}))
            .await
            .map_err(|e| ChainError::ConnectionFailed(e.to_string()))?;

        debug!(chain_id = %status.node_info.network, "Connected successfully");

        Ok(Self {
            http,
            rpc_url: config.rpc_url,
            chain_id: status.node_info.network,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> ChainResult<T> {
        call(&self.http, &self.rpc_url, method, params).await
    }
}

#[async_trait]
impl ChainClient for CometClient {
    fn chain_id(&self) -> &str {
        &self.chain_id
    }

    async fn latest_height(&self) -> ChainResult<u64> {
        let status: StatusResult = self.call("status", serde_json::json!({})).await?;
        parse_height(&status.sync_info.latest_block_height)
    }

    async fn block_at(&self, height: u64) -> ChainResult<RawBlock> {
        let response: BlockResult = self
            .call(
                "block",
                serde_json::json!({ "height": height.to_string() }),
            )
            .await
            .map_err(|e| ChainError::BlockFetch {
                height,
                message: e.to_string(),
            })?;

        parse_block(height, response)
    }

    fn decode_tx(&self, tx: &RawTx) -> ChainResult<DecodedTx> {
        decode::decode_tx(&tx.bytes)
    }

    async fn tx_result(&self, hash: &TxHash) -> ChainResult<TxResult> {
        let response: TxLookupResult = self
            .call(
                "tx",
                serde_json::json!({
                    "hash": BASE64.encode(hash.as_bytes()),
                    "prove": false,
                }),
            )
            .await?;

        Ok(TxResult {
            code: response.tx_result.code,
            raw_log: response.tx_result.log,
            gas_used: parse_gas(&response.tx_result.gas_used)?,
            gas_wanted: parse_gas(&response.tx_result.gas_wanted)?,
        })
    }
}

// =============================================================================
// JSON-RPC plumbing
// =============================================================================

async fn call<T: DeserializeOwned>(
    http: &reqwest::Client,
    rpc_url: &str,
    method: &str,
    params: serde_json::Value,
) -> ChainResult<T> {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });

    let response = http
        .post(rpc_url)
        .json(&request)
        .send()
        .await
        .map_err(|e| ChainError::RpcError(format!("{method}: {e}")))?;

    let status = response.status();
    let envelope: RpcResponse<T> = response
        .json()
        .await
        .map_err(|e| ChainError::RpcError(format!("{method}: invalid response ({status}): {e}")))?;

    if let Some(err) = envelope.error {
        return Err(ChainError::RpcError(format!(
            "{method}: {} ({})",
            err.message,
            err.data.unwrap_or_default()
        )));
    }

    envelope
        .result
        .ok_or_else(|| ChainError::RpcError(format!("{method}: response has neither result nor error")))
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
    data: Option<String>,
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct StatusResult {
    node_info: NodeInfo,
    sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
struct NodeInfo {
    network: String,
}

#[derive(Debug, Deserialize)]
struct SyncInfo {
    latest_block_height: String,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    block_id: BlockId,
    block: BlockBody,
}

#[derive(Debug, Deserialize)]
struct BlockId {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    header: BlockHeader,
    data: BlockData,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    /// Base64-encoded txs; null when the block is empty.
    txs: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TxLookupResult {
    tx_result: AbciTxResult,
}

#[derive(Debug, Deserialize)]
struct AbciTxResult {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    gas_wanted: String,
    #[serde(default)]
    gas_used: String,
}

// =============================================================================
// Parsing
// =============================================================================

fn parse_height(s: &str) -> ChainResult<u64> {
    s.parse()
        .map_err(|_| ChainError::RpcError(format!("invalid block height {s:?}")))
}

fn parse_gas(s: &str) -> ChainResult<i64> {
    if s.is_empty() {
        return Ok(0);
    }
    s.parse()
        .map_err(|_| ChainError::RpcError(format!("invalid gas value {s:?}")))
}

fn parse_block(height: u64, response: BlockResult) -> ChainResult<RawBlock> {
    let hash = BlockHash::from_hex(&response.block_id.hash).map_err(|_| ChainError::BlockFetch {
        height,
        message: format!("invalid block hash {:?}", response.block_id.hash),
    })?;

    let mut txs = Vec::new();
    for (index, encoded) in response
        .block
        .data
        .txs
        .unwrap_or_default()
        .iter()
        .enumerate()
    {
        let bytes = BASE64.decode(encoded).map_err(|e| ChainError::BlockFetch {
            height,
            message: format!("tx {index} is not valid base64: {e}"),
        })?;
        txs.push(RawTx {
            index: index as u32,
            hash: tx_hash(&bytes),
            bytes,
        });
    }

    Ok(RawBlock {
        height,
        hash,
        time: response.block.header.time,
        txs,
    })
}

/// CometBFT tx hash: SHA-256 over the raw tx bytes.
fn tx_hash(bytes: &[u8]) -> TxHash {
    let digest = Sha256::digest(bytes);
    TxHash(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_block_response() {
        let raw = serde_json::json!({
            "block_id": {
                "hash": "3C9F4C3EA8F33B9B1D5CDE2DF7B3AC05D2789F24C9D1EBA2C4F2D5C6A7B8E9F0",
                "parts": { "total": 1, "hash": "AA" }
            },
            "block": {
                "header": {
                    "chain_id": "juno-1",
                    "height": "2578098",
                    "time": "2022-03-25T12:00:03.123456789Z"
                },
                "data": {
                    "txs": [BASE64.encode(b"first tx"), BASE64.encode(b"second tx")]
                }
            }
        });

        let response: BlockResult = serde_json::from_value(raw).unwrap();
        let block = parse_block(2_578_098, response).unwrap();

        assert_eq!(block.height, 2_578_098);
        assert_eq!(block.txs.len(), 2);
        assert_eq!(block.txs[0].index, 0);
        assert_eq!(block.txs[1].bytes, b"second tx");
        // SHA-256 du contenu brut, pas du base64
        assert_eq!(block.txs[0].hash, tx_hash(b"first tx"));
        assert_eq!(block.time.timezone(), Utc);
    }

    #[test]
    fn parses_empty_block_with_null_txs() {
        let raw = serde_json::json!({
            "block_id": { "hash": "00".repeat(32) },
            "block": {
                "header": { "time": "2022-03-25T12:00:03Z" },
                "data": { "txs": null }
            }
        });

        let response: BlockResult = serde_json::from_value(raw).unwrap();
        let block = parse_block(10, response).unwrap();
        assert!(block.txs.is_empty());
    }

    #[test]
    fn rejects_malformed_block_hash() {
        let raw = serde_json::json!({
            "block_id": { "hash": "not-hex" },
            "block": {
                "header": { "time": "2022-03-25T12:00:03Z" },
                "data": { "txs": [] }
            }
        });

        let response: BlockResult = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            parse_block(10, response),
            Err(ChainError::BlockFetch { height: 10, .. })
        ));
    }

    #[test]
    fn parses_status_and_tx_result_payloads() {
        let status: StatusResult = serde_json::from_value(serde_json::json!({
            "node_info": { "network": "juno-1", "moniker": "node0" },
            "sync_info": { "latest_block_height": "2578100", "catching_up": false }
        }))
        .unwrap();
        assert_eq!(status.node_info.network, "juno-1");
        assert_eq!(parse_height(&status.sync_info.latest_block_height).unwrap(), 2_578_100);

        // A failed tx: code present, log is free text
        let lookup: TxLookupResult = serde_json::from_value(serde_json::json!({
            "hash": "AB12",
            "height": "2578098",
            "tx_result": {
                "code": 5,
                "log": "insufficient funds",
                "gas_wanted": "200000",
                "gas_used": "61234"
            }
        }))
        .unwrap();
        assert_eq!(lookup.tx_result.code, 5);
        assert_eq!(parse_gas(&lookup.tx_result.gas_used).unwrap(), 61_234);

        // A successful tx frequently omits code entirely
        let lookup: TxLookupResult = serde_json::from_value(serde_json::json!({
            "hash": "AB12",
            "height": "2578098",
            "tx_result": { "log": "[]", "gas_wanted": "200000", "gas_used": "51234" }
        }))
        .unwrap();
        assert_eq!(lookup.tx_result.code, 0);
    }

    #[test]
    fn rpc_error_envelope_is_surfaced() {
        let envelope: RpcResponse<StatusResult> = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": -32603,
                "message": "Internal error",
                "data": "height 99999999 must be less than or equal to the current blockchain height"
            }
        }))
        .unwrap();

        assert!(envelope.result.is_none());
        let err = envelope.error.unwrap();
        assert!(err.data.unwrap().contains("current blockchain height"));
    }
}
