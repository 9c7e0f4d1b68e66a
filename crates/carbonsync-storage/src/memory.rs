//! In-memory storage backend.
//!
//! Holds wallets, ledger rows, orders, reports and checkpoints in RAM.
//! Useful for tests and dry runs that don't need persistence.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use carbonsync_core::checkpoint::CheckpointStore;
use carbonsync_core::error::SyncError;
use carbonsync_core::store::{LedgerStore, OrderStore, ReportStore, WalletRegistry};
use carbonsync_core::types::{AccountId, LedgerRow, Order, OrderStatus, Report, TransactionType};

/// In-memory synchronizer storage.
///
/// All data is lost when the process exits.
#[derive(Default)]
pub struct InMemoryStorage {
    wallets: Mutex<HashMap<Address, AccountId>>,
    ledger: Mutex<Vec<LedgerRow>>,
    orders: Mutex<Vec<Order>>,
    reports: Mutex<Vec<Report>>,
    checkpoints: Mutex<HashMap<String, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, SyncError> {
    mutex
        .lock()
        .map_err(|_| SyncError::Storage("in-memory storage lock poisoned".into()))
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address` as a wallet of `account`.
    pub fn register_wallet(&self, address: Address, account: AccountId) -> Result<(), SyncError> {
        lock(&self.wallets)?.insert(address, account);
        Ok(())
    }

    /// Add a pending order and return its id.
    pub fn add_order(&self, buyer_id: AccountId, seller_id: AccountId, amount: U256) -> Result<i64, SyncError> {
        let mut orders = lock(&self.orders)?;
        let id = orders.len() as i64 + 1;
        orders.push(Order {
            id,
            buyer_id,
            seller_id,
            amount,
            status: OrderStatus::PendingPayment,
            transaction_hash: None,
        });
        Ok(id)
    }

    /// Add an unlinked report and return its id.
    pub fn add_report(&self, uuid: uuid::Uuid) -> Result<i64, SyncError> {
        let mut reports = lock(&self.reports)?;
        let id = reports.len() as i64 + 1;
        reports.push(Report {
            id,
            uuid,
            nft_id: None,
            transaction_hash: None,
        });
        Ok(id)
    }

    /// Snapshot of every ledger row, in insertion order.
    pub fn ledger_rows(&self) -> Result<Vec<LedgerRow>, SyncError> {
        Ok(lock(&self.ledger)?.clone())
    }

    pub fn order(&self, id: i64) -> Result<Option<Order>, SyncError> {
        Ok(lock(&self.orders)?.iter().find(|o| o.id == id).cloned())
    }

    pub fn report(&self, id: i64) -> Result<Option<Report>, SyncError> {
        Ok(lock(&self.reports)?.iter().find(|r| r.id == id).cloned())
    }
}

#[async_trait]
impl WalletRegistry for InMemoryStorage {
    async fn find_by_address(&self, address: &Address) -> Result<Option<AccountId>, SyncError> {
        Ok(lock(&self.wallets)?.get(address).copied())
    }
}

#[async_trait]
impl LedgerStore for InMemoryStorage {
    async fn exists(&self, tx_hash: &str, tx_type: TransactionType) -> Result<bool, SyncError> {
        Ok(lock(&self.ledger)?
            .iter()
            .any(|r| r.transaction_hash == tx_hash && r.transaction_type == tx_type))
    }

    async fn insert(&self, row: &LedgerRow) -> Result<bool, SyncError> {
        let mut ledger = lock(&self.ledger)?;
        let taken = ledger
            .iter()
            .any(|r| r.transaction_hash == row.transaction_hash && r.transaction_type == row.transaction_type);
        if taken {
            return Ok(false);
        }
        ledger.push(row.clone());
        Ok(true)
    }
}

#[async_trait]
impl OrderStore for InMemoryStorage {
    async fn find_pending(
        &self,
        buyer: AccountId,
        seller: AccountId,
        amount: U256,
    ) -> Result<Option<Order>, SyncError> {
        Ok(lock(&self.orders)?
            .iter()
            .find(|o| {
                o.status == OrderStatus::PendingPayment
                    && o.buyer_id == buyer
                    && o.seller_id == seller
                    && o.amount == amount
            })
            .cloned())
    }

    async fn find_by_tx_hash(&self, tx_hash: &str) -> Result<Option<Order>, SyncError> {
        Ok(lock(&self.orders)?
            .iter()
            .find(|o| o.transaction_hash.as_deref() == Some(tx_hash))
            .cloned())
    }

    async fn settle(&self, order_id: i64, tx_hash: &str) -> Result<bool, SyncError> {
        let mut orders = lock(&self.orders)?;
        match orders
            .iter_mut()
            .find(|o| o.id == order_id && o.status == OrderStatus::PendingPayment)
        {
            Some(order) => {
                order.status = OrderStatus::Settled;
                order.transaction_hash = Some(tx_hash.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ReportStore for InMemoryStorage {
    async fn find_by_uuid(&self, uuid: &uuid::Uuid) -> Result<Option<Report>, SyncError> {
        Ok(lock(&self.reports)?.iter().find(|r| r.uuid == *uuid).cloned())
    }

    async fn link_mint(&self, report_id: i64, nft_id: U256, tx_hash: &str) -> Result<(), SyncError> {
        let mut reports = lock(&self.reports)?;
        let report = reports
            .iter_mut()
            .find(|r| r.id == report_id)
            .ok_or_else(|| SyncError::Storage(format!("report {report_id} does not exist")))?;
        report.nft_id = Some(nft_id);
        report.transaction_hash = Some(tx_hash.to_string());
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        Ok(lock(&self.checkpoints)?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        lock(&self.checkpoints)?.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
