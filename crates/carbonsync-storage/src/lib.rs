//! carbonsync-storage: storage backends for the carbonsync synchronizer.
//!
//! Backends:
//! - [`memory`]: in-memory (dev/testing, no persistence)
//! - `postgres`: PostgreSQL via `sqlx`, against the platform's existing
//!   `tbl_*` schema (enable the `postgres` feature)
//!
//! Each backend implements every store trait of `carbonsync-core` plus the
//! checkpoint store, so one instance can back a whole synchronizer.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use memory::InMemoryStorage;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresOptions, PostgresStorage};
