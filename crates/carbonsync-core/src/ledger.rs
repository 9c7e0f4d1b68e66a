//! Ledger writer: turns classified transfers into idempotent ledger rows.
//!
//! `(transaction_hash, transaction_type)` is the idempotency boundary: the
//! polling loop may deliver the same log more than once (replay after a
//! crash), and every delivery after the first is a logged no-op.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::account::{AccountRef, AccountResolver};
use crate::error::SyncError;
use crate::store::LedgerStore;
use crate::types::{LedgerEntry, LedgerRow};

/// Result of [`LedgerWriter::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// A new row was inserted; carries the resolved parties.
    Created { from: AccountRef, to: AccountRef },
    /// A row with the same `(hash, type)` already existed. Nothing changed.
    AlreadyExists,
}

impl RecordOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Records ledger entries, resolving both parties first.
pub struct LedgerWriter {
    ledger: Arc<dyn LedgerStore>,
    resolver: AccountResolver,
}

impl LedgerWriter {
    pub fn new(ledger: Arc<dyn LedgerStore>, resolver: AccountResolver) -> Self {
        Self { ledger, resolver }
    }

    pub fn resolver(&self) -> &AccountResolver {
        &self.resolver
    }

    /// Record `entry` once.
    ///
    /// Fails with `UnresolvableAccount` if either side is an unregistered,
    /// non-sentinel address; no row is written in that case.
    pub async fn record(&self, entry: &LedgerEntry) -> Result<RecordOutcome, SyncError> {
        let hash = entry.hash_key();

        if self.ledger.exists(&hash, entry.tx_type).await? {
            warn!(hash = %hash, tx_type = %entry.tx_type, "transaction already exists");
            return Ok(RecordOutcome::AlreadyExists);
        }

        let from = self.resolver.resolve(&entry.from).await?;
        let to = self.resolver.resolve(&entry.to).await?;

        let row = LedgerRow {
            block_height: entry.block_number,
            transaction_hash: hash.clone(),
            from_account: from.account_id(),
            to_account: to.account_id(),
            amount: entry.amount,
            transaction_type: entry.tx_type,
            nft_id: entry.nft_id,
            created_date: chrono::Utc::now(),
        };

        if !self.ledger.insert(&row).await? {
            // Lost a race against another writer between exists() and insert().
            warn!(hash = %hash, tx_type = %entry.tx_type, "transaction already exists");
            return Ok(RecordOutcome::AlreadyExists);
        }

        debug!(
            hash = %hash,
            tx_type = %entry.tx_type,
            block = entry.block_number,
            from = from.account_id(),
            to = to.account_id(),
            amount = %entry.amount,
            "ledger entry created"
        );
        Ok(RecordOutcome::Created { from, to })
    }
}
