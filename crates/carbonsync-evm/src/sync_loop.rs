//! The synchronizer loop: catch-up, then live polling.
//!
//! # Phase 1: CATCH-UP
//! Apply every log in `[h0, head]` in one range, where `h0` is the stored
//! checkpoint (or the configured start block). Persist `head` as the checkpoint.
//!
//! # Phase 2: LIVE
//! For `h = head + 1, head + 2, …`: wait until the chain reaches `h`, apply
//! the logs of block `h`, persist `h`. The checkpoint is only written after
//! every event of its range has been applied or skipped, so a crash re-applies
//! at most one range (the ledger write is idempotent).

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use carbonsync_core::account::AccountResolver;
use carbonsync_core::checkpoint::{CheckpointManager, CheckpointStore};
use carbonsync_core::error::SyncError;
use carbonsync_core::ledger::LedgerWriter;
use carbonsync_core::linker::{PayloadDecryptor, ReportLinker};
use carbonsync_core::reconciler::OrderReconciler;
use carbonsync_core::store::{LedgerStore, OrderStore, ReportStore, WalletRegistry};

use crate::config::SyncConfig;
use crate::fetcher::BlockRangeFetcher;
use crate::node::{BlockTag, ChainNode};
use crate::payload::PayloadReader;
use crate::processor::{BlockProcessor, ProcessSummary};

/// The persistence handles the synchronizer writes through.
#[derive(Clone)]
pub struct SyncStores {
    pub ledger: Arc<dyn LedgerStore>,
    pub wallets: Arc<dyn WalletRegistry>,
    pub orders: Arc<dyn OrderStore>,
    pub reports: Arc<dyn ReportStore>,
    pub checkpoints: Arc<dyn CheckpointStore>,
}

impl SyncStores {
    /// Use one backend for every store.
    pub fn from_backend<S>(backend: Arc<S>) -> Self
    where
        S: LedgerStore + WalletRegistry + OrderStore + ReportStore + CheckpointStore + 'static,
    {
        Self {
            ledger: backend.clone(),
            wallets: backend.clone(),
            orders: backend.clone(),
            reports: backend.clone(),
            checkpoints: backend,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncPhase {
    Idle,
    CatchingUp,
    Live,
    Stopped,
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::CatchingUp => write!(f, "catching-up"),
            Self::Live => write!(f, "live"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Progress cursor handed from catch-up to live polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    /// Last height persisted to the checkpoint store, if any.
    pub checkpoint: Option<u64>,
    /// Next height live polling applies.
    pub next: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Applied { height: u64, summary: ProcessSummary },
    /// The chain has not reached the next height yet.
    Stalled { head: u64 },
}

pub struct Synchronizer {
    config: SyncConfig,
    node: Arc<dyn ChainNode>,
    fetcher: BlockRangeFetcher,
    processor: BlockProcessor,
    checkpoint: CheckpointManager,
    phase: SyncPhase,
}

impl Synchronizer {
    pub fn new(
        config: SyncConfig,
        node: Arc<dyn ChainNode>,
        stores: SyncStores,
        decryptor: Arc<dyn PayloadDecryptor>,
    ) -> Result<Self, SyncError> {
        let payloads = PayloadReader::new(config.nft_contract, &config.payload_types)?;
        let writer = LedgerWriter::new(stores.ledger, AccountResolver::new(stores.wallets));
        let processor = BlockProcessor::new(
            node.clone(),
            writer,
            OrderReconciler::new(stores.orders),
            ReportLinker::new(stores.reports, decryptor),
            payloads,
            config.concurrency,
        );
        let fetcher = BlockRangeFetcher::new(config.token_contract, config.nft_contract)
            .with_max_range(config.max_block_range);
        let checkpoint = CheckpointManager::new(
            stores.checkpoints,
            config.checkpoint_key.clone(),
            config.start_block,
        );

        Ok(Self {
            config,
            node,
            fetcher,
            processor,
            checkpoint,
            phase: SyncPhase::Idle,
        })
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Apply everything between the checkpoint and the current head.
    ///
    /// If the checkpoint is already ahead of the node's head nothing is
    /// applied or written, and live polling starts right after the checkpoint.
    pub async fn catch_up(&mut self) -> Result<SyncState, SyncError> {
        self.phase = SyncPhase::CatchingUp;

        let stored = self.checkpoint.load().await?;
        let from = stored.unwrap_or(self.checkpoint.start_height());
        if let Some(height) = stored {
            info!(height, key = %self.checkpoint.key(), "resuming from checkpoint");
        }

        let head = self
            .node
            .block_by_tag(BlockTag::Latest)
            .await?
            .ok_or_else(|| SyncError::Rpc("node returned no latest block".into()))?
            .number;

        if from > head {
            warn!(from, head, "start height is ahead of chain head");
            return Ok(SyncState {
                checkpoint: stored,
                next: stored.map_or(from, |height| height + 1),
            });
        }

        let started = Instant::now();
        info!(from, to = head, "starting catch-up");
        let summary = self.apply_range(from, head).await?;
        self.checkpoint.set(head).await?;

        info!(
            from,
            to = head,
            logs = summary.logs,
            created = summary.created,
            skipped = summary.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed historical blocks"
        );

        Ok(SyncState {
            checkpoint: Some(head),
            next: head + 1,
        })
    }

    /// Apply block `state.next` if the chain has reached it.
    pub async fn poll_once(&mut self, state: &mut SyncState) -> Result<PollOutcome, SyncError> {
        self.phase = SyncPhase::Live;

        let head = self.node.current_head().await?;
        if state.next > head {
            return Ok(PollOutcome::Stalled { head });
        }

        let height = state.next;
        let started = Instant::now();
        let summary = self.apply_range(height, height).await?;
        self.checkpoint.set(height).await?;
        state.checkpoint = Some(height);
        state.next = height + 1;

        info!(
            block = height,
            logs = summary.logs,
            created = summary.created,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "processed block"
        );
        Ok(PollOutcome::Applied { height, summary })
    }

    /// Catch up, then follow the chain until `cancel` fires.
    ///
    /// Cancellation is observed between blocks, never in the middle of one.
    /// Any fatal error stops the loop with the checkpoint at the last fully
    /// applied height.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<(), SyncError> {
        let mut state = self.catch_up().await?;
        let poll_interval = self.config.poll_interval();

        while !cancel.is_cancelled() {
            if let PollOutcome::Stalled { .. } = self.poll_once(&mut state).await? {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
        }

        self.phase = SyncPhase::Stopped;
        info!(checkpoint = ?state.checkpoint, "synchronizer stopped");
        Ok(())
    }

    async fn apply_range(&self, from: u64, to: u64) -> Result<ProcessSummary, SyncError> {
        let logs = self.fetcher.fetch(self.node.as_ref(), from, to).await?;
        self.processor.process(&logs).await
    }
}
