use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    Result, TableDocument, TableNumber, TableStoreError, Version,
    store::{SaveOptions, TableStore},
};

#[derive(Debug, Default)]
struct FaultConfig {
    fail_on_save: bool,
    save_delay: Option<Duration>,
}

/// In-memory table store implementation.
///
/// Serves as the default backend when no database is configured and as the
/// test double for the PostgreSQL implementation. Faults can be injected to
/// exercise persistence failure paths.
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    tables: Arc<RwLock<BTreeMap<TableNumber, TableDocument>>>,
    faults: Arc<std::sync::RwLock<FaultConfig>>,
}

impl InMemoryTableStore {
    /// Creates a new empty in-memory table store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored tables.
    pub async fn table_count(&self) -> usize {
        self.tables.read().await.len()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        self.tables.write().await.clear();
    }

    /// Makes every subsequent save fail with `Unavailable`.
    pub fn set_fail_on_save(&self, fail: bool) {
        if let Ok(mut faults) = self.faults.write() {
            faults.fail_on_save = fail;
        }
    }

    /// Delays every subsequent save by the given duration.
    pub fn set_save_delay(&self, delay: Option<Duration>) {
        if let Ok(mut faults) = self.faults.write() {
            faults.save_delay = delay;
        }
    }

    fn save_faults(&self) -> (bool, Option<Duration>) {
        self.faults
            .read()
            .map(|f| (f.fail_on_save, f.save_delay))
            .unwrap_or((false, None))
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn insert(&self, mut document: TableDocument) -> Result<Version> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&document.number) {
            return Err(TableStoreError::TableAlreadyExists(document.number));
        }

        document.version = Version::first();
        document.updated_at = Utc::now();
        tables.insert(document.number, document);

        Ok(Version::first())
    }

    async fn get(&self, number: TableNumber) -> Result<Option<TableDocument>> {
        Ok(self.tables.read().await.get(&number).cloned())
    }

    async fn save(&self, mut document: TableDocument, options: SaveOptions) -> Result<Version> {
        let (fail, delay) = self.save_faults();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(TableStoreError::Unavailable(
                "save rejected by fault injection".to_string(),
            ));
        }

        let number = document.number;
        let mut tables = self.tables.write().await;

        let current_version = tables
            .get(&number)
            .map(|doc| doc.version)
            .ok_or(TableStoreError::TableNotFound(number))?;

        if let Some(expected) = options.expected_version
            && current_version != expected
        {
            return Err(TableStoreError::ConcurrencyConflict {
                table_number: number,
                expected,
                actual: current_version,
            });
        }

        let new_version = current_version.next();
        document.version = new_version;
        document.updated_at = Utc::now();
        tables.insert(number, document);

        Ok(new_version)
    }

    async fn list(&self) -> Result<Vec<TableDocument>> {
        Ok(self.tables.read().await.values().cloned().collect())
    }
}
