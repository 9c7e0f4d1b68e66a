//! carbonsync-core: the ledger side of the carbonsync event synchronizer.
//!
//! # Architecture
//!
//! ```text
//! Synchronizer (carbonsync-evm)
//!      │ TransferEvent
//!      ▼
//! LedgerWriter ──── AccountResolver ──── WalletRegistry
//!      │ Created
//!      ├── OrderReconciler ─────────── OrderStore
//!      └── ReportLinker ────────────── ReportStore + PayloadDecryptor
//!
//! CheckpointManager ─────────────────── CheckpointStore
//! ```
//!
//! Everything that touches persistent state goes through the traits in
//! [`store`]; the storage crate provides in-memory and PostgreSQL backends.

pub mod account;
pub mod checkpoint;
pub mod error;
pub mod ledger;
pub mod linker;
pub mod reconciler;
pub mod store;
pub mod types;

pub use account::{AccountRef, AccountResolver};
pub use checkpoint::{CheckpointManager, CheckpointStore, MemoryCheckpointStore};
pub use error::SyncError;
pub use ledger::{LedgerWriter, RecordOutcome};
pub use linker::{LinkOutcome, PayloadDecryptor, ReportLinker};
pub use reconciler::OrderReconciler;
pub use store::{LedgerStore, OrderStore, ReportStore, WalletRegistry};
pub use types::{
    AccountId, LedgerEntry, LedgerRow, Order, OrderStatus, Report, TransactionType, TransferKind,
};
