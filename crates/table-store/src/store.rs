use async_trait::async_trait;

use crate::{Result, TableDocument, TableNumber, Version};

/// Options for saving a table document.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Version the writer loaded. The save fails with `ConcurrencyConflict`
    /// if the stored version moved on in the meantime.
    /// If None, the document is overwritten unconditionally (use with caution).
    pub expected_version: Option<Version>,
}

impl SaveOptions {
    /// Creates options with no version check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options expecting the stored document to be at a specific version.
    pub fn expect_version(version: Version) -> Self {
        Self {
            expected_version: Some(version),
        }
    }
}

/// Core trait for table document stores.
///
/// Every table is one document. Writers follow a load, modify, save cycle
/// and pass the loaded version back so concurrent writers on the same table
/// cannot silently overwrite each other.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Inserts a new table document at `Version::first()`.
    ///
    /// Fails with `TableAlreadyExists` if the number is taken.
    async fn insert(&self, document: TableDocument) -> Result<Version>;

    /// Loads the document for a table, or None if it doesn't exist.
    async fn get(&self, number: TableNumber) -> Result<Option<TableDocument>>;

    /// Replaces the state of an existing table document.
    ///
    /// Returns the new version of the document.
    async fn save(&self, document: TableDocument, options: SaveOptions) -> Result<Version>;

    /// Loads every table document, ordered by table number.
    async fn list(&self) -> Result<Vec<TableDocument>>;
}

/// Extension trait providing convenience methods for table stores.
#[async_trait]
pub trait TableStoreExt: TableStore {
    /// Checks if a table exists.
    async fn table_exists(&self, number: TableNumber) -> Result<bool> {
        Ok(self.get(number).await?.is_some())
    }

    /// Gets the current version of a table document.
    async fn current_version(&self, number: TableNumber) -> Result<Option<Version>> {
        Ok(self.get(number).await?.map(|doc| doc.version))
    }
}

impl<T: TableStore + ?Sized> TableStoreExt for T {}

#[async_trait]
impl<T: TableStore + ?Sized> TableStore for std::sync::Arc<T> {
    async fn insert(&self, document: TableDocument) -> Result<Version> {
        (**self).insert(document).await
    }

    async fn get(&self, number: TableNumber) -> Result<Option<TableDocument>> {
        (**self).get(number).await
    }

    async fn save(&self, document: TableDocument, options: SaveOptions) -> Result<Version> {
        (**self).save(document, options).await
    }

    async fn list(&self) -> Result<Vec<TableDocument>> {
        (**self).list().await
    }
}
