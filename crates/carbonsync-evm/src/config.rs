//! Synchronizer configuration and its fluent builder.
//!
//! # Example
//!
//! ```rust
//! use alloy_primitives::Address;
//! use carbonsync_evm::SyncConfigBuilder;
//!
//! let config = SyncConfigBuilder::new(Address::repeat_byte(1), Address::repeat_byte(2))
//!     .start_block(4_200_000)
//!     .poll_interval_ms(1_000)
//!     .concurrency(8)
//!     .build();
//! assert_eq!(config.start_block, 4_200_000);
//! ```

use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::payload::DEFAULT_PAYLOAD_TYPES;

pub const DEFAULT_CHECKPOINT_KEY: &str = "carbonsync:processed_height";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fungible token contract.
    pub token_contract: Address,
    /// Report NFT contract.
    pub nft_contract: Address,
    /// First block to apply when no checkpoint has been stored yet.
    pub start_block: u64,
    /// Key of the processed-height value in the checkpoint store.
    pub checkpoint_key: String,
    /// Live-mode wait between polls that found no new block.
    pub poll_interval_ms: u64,
    /// Upper bound on concurrent auxiliary contract reads.
    pub concurrency: usize,
    /// Return tuple of `tokenDataMap(uint256)`.
    pub payload_types: String,
    /// Split catch-up ranges wider than this into several `eth_getLogs` calls.
    pub max_block_range: Option<u64>,
}

impl SyncConfig {
    pub fn new(token_contract: Address, nft_contract: Address) -> Self {
        Self {
            token_contract,
            nft_contract,
            start_block: 1,
            checkpoint_key: DEFAULT_CHECKPOINT_KEY.into(),
            poll_interval_ms: 500,
            concurrency: 5,
            payload_types: DEFAULT_PAYLOAD_TYPES.into(),
            max_block_range: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Fluent builder for [`SyncConfig`].
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new(token_contract: Address, nft_contract: Address) -> Self {
        Self {
            config: SyncConfig::new(token_contract, nft_contract),
        }
    }

    pub fn start_block(mut self, block: u64) -> Self {
        self.config.start_block = block;
        self
    }

    pub fn checkpoint_key(mut self, key: impl Into<String>) -> Self {
        self.config.checkpoint_key = key.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn payload_types(mut self, types: impl Into<String>) -> Self {
        self.config.payload_types = types.into();
        self
    }

    pub fn max_block_range(mut self, range: Option<u64>) -> Self {
        self.config.max_block_range = range;
        self
    }

    pub fn build(self) -> SyncConfig {
        self.config
    }
}
