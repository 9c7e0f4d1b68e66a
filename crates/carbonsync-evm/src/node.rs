//! The chain node seam and its JSON-RPC implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use carbonsync_core::error::SyncError;
use carbonsync_rpc::{RpcTransport, TransportError};

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: String,
    pub transaction_hash: B256,
    pub log_index: String,
    /// Set by the node when the log is no longer canonical.
    #[serde(default)]
    pub removed: bool,
}

impl RawLog {
    pub fn block_number_u64(&self) -> Result<u64, SyncError> {
        parse_hex_u64(&self.block_number)
    }

    pub fn log_index_u64(&self) -> Result<u64, SyncError> {
        parse_hex_u64(&self.log_index)
    }
}

/// Block selector for `eth_getBlockByNumber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Number(u64),
}

impl BlockTag {
    fn to_param(self) -> Value {
        match self {
            Self::Latest => json!("latest"),
            Self::Number(n) => json!(format!("{n:#x}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
}

/// `eth_getLogs` filter for one contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    /// Accepted `topic0` values (event signature hashes).
    pub topics0: Vec<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

/// Everything the synchronizer needs from the ledger node.
#[async_trait]
pub trait ChainNode: Send + Sync {
    /// Current head block number.
    async fn current_head(&self) -> Result<u64, SyncError>;

    async fn block_by_tag(&self, tag: BlockTag) -> Result<Option<BlockHeader>, SyncError>;

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, SyncError>;

    /// `eth_call` against `address` at the latest block; returns the raw output.
    async fn read_contract(&self, address: Address, calldata: Bytes) -> Result<Bytes, SyncError>;
}

/// Parse a hex quantity (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Result<u64, SyncError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16).map_err(|e| SyncError::Decode(format!("bad hex quantity '{s}': {e}")))
}

fn rpc_err(method: &str, e: TransportError) -> SyncError {
    if e.is_node_error() {
        tracing::debug!(method, error = %e, "node rejected request");
    }
    match e {
        TransportError::Deserialization(e) => SyncError::Decode(format!("{method}: {e}")),
        other => SyncError::Rpc(format!("{method}: {other}")),
    }
}

// ─── JsonRpcNode ─────────────────────────────────────────────────────────────

/// [`ChainNode`] over any [`RpcTransport`].
pub struct JsonRpcNode<T> {
    transport: T,
    next_id: AtomicU64,
}

impl<T: RpcTransport> JsonRpcNode<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<R: serde::de::DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<R, SyncError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.transport
            .call(id, method, params)
            .await
            .map_err(|e| rpc_err(method, e))
    }
}

#[derive(Deserialize)]
struct RpcBlock {
    number: String,
    hash: B256,
}

#[async_trait]
impl<T: RpcTransport> ChainNode for JsonRpcNode<T> {
    async fn current_head(&self) -> Result<u64, SyncError> {
        let raw: String = self.call("eth_blockNumber", vec![]).await?;
        parse_hex_u64(&raw)
    }

    async fn block_by_tag(&self, tag: BlockTag) -> Result<Option<BlockHeader>, SyncError> {
        let block: Option<RpcBlock> = self
            .call("eth_getBlockByNumber", vec![tag.to_param(), json!(false)])
            .await?;
        block
            .map(|b| {
                Ok(BlockHeader {
                    number: parse_hex_u64(&b.number)?,
                    hash: b.hash,
                })
            })
            .transpose()
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, SyncError> {
        let params = json!({
            "address": filter.address,
            "topics": [filter.topics0],
            "fromBlock": format!("{:#x}", filter.from_block),
            "toBlock": format!("{:#x}", filter.to_block),
        });
        self.call("eth_getLogs", vec![params]).await
    }

    async fn read_contract(&self, address: Address, calldata: Bytes) -> Result<Bytes, SyncError> {
        let params = vec![json!({ "to": address, "data": calldata }), json!("latest")];
        self.call("eth_call", params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carbonsync_rpc::{JsonRpcRequest, JsonRpcResponse};
    use std::sync::Mutex;

    /// Answers every request with a canned result and records what was asked.
    struct Canned {
        result: Value,
        seen: Mutex<Vec<JsonRpcRequest>>,
    }

    #[async_trait]
    impl RpcTransport for Canned {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            self.seen.lock().unwrap().push(req);
            Ok(JsonRpcResponse {
                jsonrpc: "2.0".into(),
                id: json!(1),
                result: Some(self.result.clone()),
                error: None,
            })
        }

        fn url(&self) -> &str {
            "mock://node"
        }
    }

    fn node(result: Value) -> JsonRpcNode<Canned> {
        JsonRpcNode::new(Canned { result, seen: Mutex::new(vec![]) })
    }

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1").unwrap(), 1);
        assert_eq!(parse_hex_u64("0xff").unwrap(), 255);
        assert_eq!(parse_hex_u64("1234").unwrap(), 0x1234);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[tokio::test]
    async fn current_head_parses_quantity() {
        assert_eq!(node(json!("0x12a05f200")).current_head().await.unwrap(), 5_000_000_000);
    }

    #[tokio::test]
    async fn unknown_block_is_none() {
        assert!(node(Value::Null).block_by_tag(BlockTag::Number(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_logs_request_shape() {
        let n = node(json!([]));
        let filter = LogFilter {
            address: Address::repeat_byte(0x42),
            topics0: vec![B256::repeat_byte(0x01)],
            from_block: 16,
            to_block: 255,
        };
        assert!(n.get_logs(&filter).await.unwrap().is_empty());

        let seen = n.transport.seen.lock().unwrap();
        assert_eq!(seen[0].method, "eth_getLogs");
        let p = &seen[0].params[0];
        assert_eq!(p["fromBlock"], "0x10");
        assert_eq!(p["toBlock"], "0xff");
        assert_eq!(p["address"], "0x4242424242424242424242424242424242424242");
        assert_eq!(p["topics"][0][0], format!("0x{}", "01".repeat(32)));
    }

    #[test]
    fn raw_log_deserializes_node_json() {
        let raw = json!({
            "address": "0x4242424242424242424242424242424242424242",
            "topics": [format!("0x{}", "00".repeat(32))],
            "data": "0x",
            "blockNumber": "0x1b4",
            "blockHash": format!("0x{}", "aa".repeat(32)),
            "transactionHash": format!("0x{}", "bb".repeat(32)),
            "transactionIndex": "0x0",
            "logIndex": "0x5",
        });
        let log: RawLog = serde_json::from_value(raw).unwrap();
        assert_eq!(log.block_number_u64().unwrap(), 436);
        assert_eq!(log.log_index_u64().unwrap(), 5);
        assert!(!log.removed);
    }
}
