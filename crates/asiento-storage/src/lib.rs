//! Asiento record repository.
//!
//! This crate defines the storage contract the bookkeeping engine consumes:
//! - classification rules with optimistic concurrency (`version`)
//! - transactions with atomic, numbered saves and soft delete
//! - reference data: companies, chart of accounts, third parties
//! - recurring transaction templates
//!
//! [`InMemoryRepository`] implements the whole contract and can mirror itself
//! to a JSON snapshot file ([`StorageConfig::Snapshot`]).

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
pub mod snapshot;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryRepository;
pub use model::{
    LedgerLine, MovementFilter, MovementUpdate, QueryWindow, TransactionFilter,
    TransactionHeaderUpdate,
};
pub use snapshot::{SnapshotFile, StorageConfig};
pub use traits::{LedgerStore, RecordRepository, RecurringStore, ReferenceStore, RuleStore};
