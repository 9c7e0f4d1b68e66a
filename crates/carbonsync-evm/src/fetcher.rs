//! Block range fetcher.
//!
//! Pulls `Transfer` logs for `[from, to]` from both watched contracts. A
//! range is fetched with one `eth_getLogs` per contract unless a
//! `max_range` is configured, in which case it is split into chunks.

use alloy_primitives::{Address, B256};

use carbonsync_core::error::SyncError;

use crate::events::transfer_topic;
use crate::node::{ChainNode, LogFilter, RawLog};

/// Logs of one block range, per contract, in node order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeLogs {
    pub token: Vec<RawLog>,
    pub nft: Vec<RawLog>,
}

impl RangeLogs {
    pub fn len(&self) -> usize {
        self.token.len() + self.nft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct BlockRangeFetcher {
    token_contract: Address,
    nft_contract: Address,
    topics0: Vec<B256>,
    max_range: Option<u64>,
}

impl BlockRangeFetcher {
    pub fn new(token_contract: Address, nft_contract: Address) -> Self {
        Self {
            token_contract,
            nft_contract,
            topics0: vec![transfer_topic()],
            max_range: None,
        }
    }

    /// Split ranges wider than `max_range` blocks into several queries.
    pub fn with_max_range(mut self, max_range: Option<u64>) -> Self {
        self.max_range = max_range.filter(|r| *r > 0);
        self
    }

    pub async fn fetch<N: ChainNode + ?Sized>(&self, node: &N, from: u64, to: u64) -> Result<RangeLogs, SyncError> {
        if to < from {
            return Ok(RangeLogs::default());
        }
        Ok(RangeLogs {
            token: self.contract_logs(node, self.token_contract, from, to).await?,
            nft: self.contract_logs(node, self.nft_contract, from, to).await?,
        })
    }

    async fn contract_logs<N: ChainNode + ?Sized>(
        &self,
        node: &N,
        address: Address,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, SyncError> {
        let step = self.max_range.unwrap_or(u64::MAX);
        let mut logs = Vec::new();
        let mut start = from;
        loop {
            let end = start.saturating_add(step - 1).min(to);
            let filter = LogFilter {
                address,
                topics0: self.topics0.clone(),
                from_block: start,
                to_block: end,
            };
            logs.extend(node.get_logs(&filter).await?);
            if end >= to {
                break;
            }
            start = end + 1;
        }
        tracing::trace!(contract = %address, from, to, logs = logs.len(), "fetched logs");
        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BlockHeader, BlockTag};
    use alloy_primitives::Bytes;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LogFilter>>);

    #[async_trait]
    impl ChainNode for Recorder {
        async fn current_head(&self) -> Result<u64, SyncError> {
            Ok(0)
        }
        async fn block_by_tag(&self, _tag: BlockTag) -> Result<Option<BlockHeader>, SyncError> {
            Ok(None)
        }
        async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, SyncError> {
            self.0.lock().unwrap().push(filter.clone());
            Ok(vec![])
        }
        async fn read_contract(&self, _a: Address, _c: Bytes) -> Result<Bytes, SyncError> {
            Ok(Bytes::new())
        }
    }

    const TOKEN: Address = Address::new([0x01; 20]);
    const NFT: Address = Address::new([0x02; 20]);

    #[tokio::test]
    async fn one_query_per_contract_by_default() {
        let node = Recorder::default();
        BlockRangeFetcher::new(TOKEN, NFT).fetch(&node, 1, 10_000).await.unwrap();

        let seen = node.0.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].address, TOKEN);
        assert_eq!(seen[1].address, NFT);
        assert_eq!((seen[0].from_block, seen[0].to_block), (1, 10_000));
        assert_eq!(seen[0].topics0, vec![transfer_topic()]);
    }

    #[tokio::test]
    async fn chunks_wide_ranges() {
        let node = Recorder::default();
        BlockRangeFetcher::new(TOKEN, NFT)
            .with_max_range(Some(100))
            .fetch(&node, 1, 250)
            .await
            .unwrap();

        let seen = node.0.lock().unwrap();
        let token: Vec<_> = seen
            .iter()
            .filter(|f| f.address == TOKEN)
            .map(|f| (f.from_block, f.to_block))
            .collect();
        assert_eq!(token, vec![(1, 100), (101, 200), (201, 250)]);
    }

    #[tokio::test]
    async fn empty_range_skips_the_node() {
        let node = Recorder::default();
        let logs = BlockRangeFetcher::new(TOKEN, NFT).fetch(&node, 10, 9).await.unwrap();
        assert!(logs.is_empty());
        assert!(node.0.lock().unwrap().is_empty());
    }
}
