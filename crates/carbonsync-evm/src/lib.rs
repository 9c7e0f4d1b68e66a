//! carbonsync-evm: the chain side of the carbonsync event synchronizer.
//!
//! - [`ChainNode`]: what the synchronizer needs from a node, with a
//!   JSON-RPC implementation ([`JsonRpcNode`]) and a retrying decorator
//!   ([`RetryingNode`])
//! - [`events`]: `Transfer` log decoding and mint/burn/transfer classification
//! - [`BlockRangeFetcher`]: per-contract `eth_getLogs` over a block range
//! - [`BlockProcessor`]: applies a range to the ledger, reconciler and linker
//! - [`Synchronizer`]: catch-up followed by live polling
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use alloy_primitives::Address;
//! use carbonsync_evm::{JsonRpcNode, RetryingNode, SyncConfigBuilder, SyncStores, Synchronizer};
//! use carbonsync_rpc::{HttpTransport, RetryPolicy};
//! # use carbonsync_core::{PayloadDecryptor, SyncError};
//! # struct Plain;
//! # impl PayloadDecryptor for Plain {
//! #     fn decrypt(&self, c: &str) -> Result<String, SyncError> { Ok(c.to_string()) }
//! # }
//! # async fn demo(stores: SyncStores) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new("http://localhost:8545", Duration::from_secs(30))?;
//! let node = RetryingNode::new(JsonRpcNode::new(transport), RetryPolicy::default());
//!
//! let config = SyncConfigBuilder::new(Address::repeat_byte(1), Address::repeat_byte(2)).build();
//! let mut sync = Synchronizer::new(config, Arc::new(node), stores, Arc::new(Plain))?;
//! sync.run(tokio_util::sync::CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod events;
pub mod fetcher;
pub mod node;
pub mod payload;
pub mod processor;
pub mod retry;
pub mod sync_loop;

pub use config::{SyncConfig, SyncConfigBuilder, DEFAULT_CHECKPOINT_KEY};
pub use events::{classify, transfer_topic, ContractKind, TransferEvent};
pub use fetcher::{BlockRangeFetcher, RangeLogs};
pub use node::{BlockHeader, BlockTag, ChainNode, JsonRpcNode, LogFilter, RawLog};
pub use payload::{PayloadReader, DEFAULT_PAYLOAD_TYPES};
pub use processor::{BlockProcessor, ProcessSummary};
pub use retry::RetryingNode;
pub use sync_loop::{PollOutcome, SyncPhase, SyncState, SyncStores, Synchronizer};
