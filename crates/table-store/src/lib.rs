//! Versioned document store for table aggregates.
//!
//! Each table is persisted as one JSON document guarded by a version
//! number. Writers pass back the version they loaded; a stale version is
//! rejected with `TableStoreError::ConcurrencyConflict`.

pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod timeout;

pub use common::TableNumber;
pub use document::{TableDocument, Version};
pub use error::{Result, TableStoreError};
pub use memory::InMemoryTableStore;
pub use postgres::PostgresTableStore;
pub use store::{SaveOptions, TableStore, TableStoreExt};
pub use timeout::TimeoutTableStore;
