//! Applies the logs of one block range to the ledger.
//!
//! Token logs are applied before NFT logs, each in node order. Per-event
//! failures (undecodable log, unresolvable account, bad payload) are logged
//! and skipped; storage and exhausted RPC failures abort the range so the
//! checkpoint is not advanced past it.

use std::collections::HashMap;
use std::sync::Arc;

use alloy_primitives::U256;
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use carbonsync_core::account::AccountRef;
use carbonsync_core::error::SyncError;
use carbonsync_core::ledger::{LedgerWriter, RecordOutcome};
use carbonsync_core::linker::{LinkOutcome, ReportLinker};
use carbonsync_core::reconciler::OrderReconciler;
use carbonsync_core::types::TransferKind;

use crate::events::{ContractKind, TransferEvent};
use crate::fetcher::RangeLogs;
use crate::node::{ChainNode, RawLog};
use crate::payload::PayloadReader;

/// Counters for one processed range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    pub logs: usize,
    pub created: usize,
    pub duplicates: usize,
    pub skipped: usize,
    pub removed: usize,
    pub settled: usize,
    pub linked: usize,
}

pub struct BlockProcessor {
    node: Arc<dyn ChainNode>,
    writer: LedgerWriter,
    reconciler: OrderReconciler,
    linker: ReportLinker,
    payloads: PayloadReader,
    concurrency: usize,
}

impl BlockProcessor {
    pub fn new(
        node: Arc<dyn ChainNode>,
        writer: LedgerWriter,
        reconciler: OrderReconciler,
        linker: ReportLinker,
        payloads: PayloadReader,
        concurrency: usize,
    ) -> Self {
        Self {
            node,
            writer,
            reconciler,
            linker,
            payloads,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn process(&self, logs: &RangeLogs) -> Result<ProcessSummary, SyncError> {
        let mut summary = ProcessSummary {
            logs: logs.len(),
            ..Default::default()
        };
        self.process_token_logs(&logs.token, &mut summary).await?;
        self.process_nft_logs(&logs.nft, &mut summary).await?;
        Ok(summary)
    }

    async fn process_token_logs(&self, logs: &[RawLog], summary: &mut ProcessSummary) -> Result<(), SyncError> {
        for event in decode_all(ContractKind::Token, logs, summary) {
            let kind = event.kind();
            debug!(
                kind = %kind,
                from = %event.from,
                to = %event.to,
                value = %event.value,
                block = event.block_number,
                "token transfer"
            );

            let entry = event.to_entry();
            let Some(outcome) = self.record(&event, summary).await? else {
                continue;
            };
            if kind != TransferKind::Transfer {
                continue;
            }

            // A replayed row may belong to a range that failed before its
            // order was settled.
            let (from, to) = match outcome {
                RecordOutcome::Created { from, to } => (from, to),
                RecordOutcome::AlreadyExists => match self.resolve_sides(&event).await {
                    Ok(sides) => sides,
                    Err(e) if e.is_skippable() => {
                        warn!(hash = %event.tx_hash, error = %e, "replayed transfer not reconciled");
                        continue;
                    }
                    Err(e) => return Err(e),
                },
            };

            if self
                .reconciler
                .reconcile(&entry.hash_key(), from, to, entry.amount)
                .await?
                .is_some()
            {
                summary.settled += 1;
            }
        }
        Ok(())
    }

    async fn process_nft_logs(&self, logs: &[RawLog], summary: &mut ProcessSummary) -> Result<(), SyncError> {
        let events = decode_all(ContractKind::Nft, logs, summary);
        let payloads = self.prefetch_payloads(&events).await?;

        for event in &events {
            let kind = event.kind();
            debug!(
                kind = %kind,
                token_id = %event.value,
                from = %event.from,
                to = %event.to,
                block = event.block_number,
                "nft transfer"
            );

            self.record(event, summary).await?;

            if kind != TransferKind::Mint {
                continue;
            }
            let Some(payload) = payloads.get(&event.value) else {
                continue;
            };
            let hash = event.to_entry().hash_key();
            if let LinkOutcome::Linked { .. } = self.linker.link(payload, event.value, &hash).await? {
                summary.linked += 1;
            }
        }
        Ok(())
    }

    /// Read the on-chain payload of every minted token, `concurrency` at a time.
    ///
    /// Tokens whose payload cannot be decoded are left out; RPC failures abort.
    async fn prefetch_payloads(&self, events: &[TransferEvent]) -> Result<HashMap<U256, String>, SyncError> {
        let minted: Vec<U256> = events
            .iter()
            .filter(|e| e.kind() == TransferKind::Mint)
            .map(|e| e.value)
            .collect();
        if minted.is_empty() {
            return Ok(HashMap::new());
        }

        let reads: Vec<_> = stream::iter(minted)
            .map(|token_id| async move { (token_id, self.payloads.read(self.node.as_ref(), token_id).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut payloads = HashMap::with_capacity(reads.len());
        for (token_id, read) in reads {
            match read {
                Ok(payload) => {
                    info!(token_id = %token_id, payload = %payload, "read report payload");
                    payloads.insert(token_id, payload);
                }
                Err(e) if e.is_skippable() => {
                    error!(token_id = %token_id, error = %e, "report payload unreadable");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(payloads)
    }

    /// Record one event, folding skippable failures into the summary.
    ///
    /// Returns `None` when the event was skipped.
    async fn record(
        &self,
        event: &TransferEvent,
        summary: &mut ProcessSummary,
    ) -> Result<Option<RecordOutcome>, SyncError> {
        match self.writer.record(&event.to_entry()).await {
            Ok(outcome) => {
                match outcome {
                    RecordOutcome::Created { .. } => summary.created += 1,
                    RecordOutcome::AlreadyExists => summary.duplicates += 1,
                }
                Ok(Some(outcome))
            }
            Err(e) if e.is_skippable() => {
                error!(hash = %event.tx_hash, block = event.block_number, error = %e, "event skipped");
                summary.skipped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_sides(&self, event: &TransferEvent) -> Result<(AccountRef, AccountRef), SyncError> {
        let resolver = self.writer.resolver();
        Ok((resolver.resolve(&event.from).await?, resolver.resolve(&event.to).await?))
    }
}

fn decode_all(contract: ContractKind, logs: &[RawLog], summary: &mut ProcessSummary) -> Vec<TransferEvent> {
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        if log.removed {
            summary.removed += 1;
            continue;
        }
        match TransferEvent::decode(contract, log) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(hash = %log.transaction_hash, log_index = %log.log_index, error = %e, "undecodable log skipped");
                summary.skipped += 1;
            }
        }
    }
    events
}
