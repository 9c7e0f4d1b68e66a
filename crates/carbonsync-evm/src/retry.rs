//! Resilient chain client: a [`ChainNode`] decorator that retries every call.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;

use carbonsync_core::error::SyncError;
use carbonsync_rpc::RetryPolicy;

use crate::node::{BlockHeader, BlockTag, ChainNode, LogFilter, RawLog};

/// Wraps a node so that each call gets up to `max_attempts` tries.
///
/// Only [`SyncError::Rpc`] failures are retried. Decode errors come back from
/// a healthy node and would fail the same way again.
pub struct RetryingNode<N> {
    inner: N,
    policy: RetryPolicy,
}

impl<N: ChainNode> RetryingNode<N> {
    pub fn new(inner: N, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &N {
        &self.inner
    }
}

#[async_trait]
impl<N: ChainNode> ChainNode for RetryingNode<N> {
    async fn current_head(&self) -> Result<u64, SyncError> {
        let inner = &self.inner;
        self.policy
            .run("eth_blockNumber", SyncError::is_rpc, move || inner.current_head())
            .await
    }

    async fn block_by_tag(&self, tag: BlockTag) -> Result<Option<BlockHeader>, SyncError> {
        let inner = &self.inner;
        self.policy
            .run("eth_getBlockByNumber", SyncError::is_rpc, move || inner.block_by_tag(tag))
            .await
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, SyncError> {
        let inner = &self.inner;
        self.policy
            .run("eth_getLogs", SyncError::is_rpc, move || inner.get_logs(filter))
            .await
    }

    async fn read_contract(&self, address: Address, calldata: Bytes) -> Result<Bytes, SyncError> {
        let inner = &self.inner;
        self.policy
            .run("eth_call", SyncError::is_rpc, move || {
                inner.read_contract(address, calldata.clone())
            })
            .await
    }
}
