//! Storage seams consumed by the synchronizer.
//!
//! Implementations include `InMemoryStorage` and `PostgresStorage` in
//! `carbonsync-storage`.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use crate::error::SyncError;
use crate::types::{AccountId, LedgerRow, Order, Report, TransactionType};

/// Read-only view of the wallet registry (`tbl_wallets`).
#[async_trait]
pub trait WalletRegistry: Send + Sync {
    /// Return the account that owns `address`, if any.
    async fn find_by_address(&self, address: &Address) -> Result<Option<AccountId>, SyncError>;
}

/// The transaction ledger (`tbl_transactions`). Rows are never updated or deleted.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Returns `true` if a row with this `(hash, type)` already exists.
    async fn exists(&self, tx_hash: &str, tx_type: TransactionType) -> Result<bool, SyncError>;

    /// Insert a row. Returns `false` if the `(hash, type)` pair was already taken.
    async fn insert(&self, row: &LedgerRow) -> Result<bool, SyncError>;
}

/// Marketplace orders (`tbl_orders`).
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// First pending order between `buyer` and `seller` for exactly `amount`.
    async fn find_pending(
        &self,
        buyer: AccountId,
        seller: AccountId,
        amount: U256,
    ) -> Result<Option<Order>, SyncError>;

    /// The order already settled by `tx_hash`, if any.
    async fn find_by_tx_hash(&self, tx_hash: &str) -> Result<Option<Order>, SyncError>;

    /// Mark an order settled by `tx_hash`. Returns `false` if it was no longer pending.
    async fn settle(&self, order_id: i64, tx_hash: &str) -> Result<bool, SyncError>;
}

/// Report records (`tbl_reports`).
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_by_uuid(&self, uuid: &uuid::Uuid) -> Result<Option<Report>, SyncError>;

    /// Attach a minted NFT to a report.
    async fn link_mint(&self, report_id: i64, nft_id: U256, tx_hash: &str) -> Result<(), SyncError>;
}
