use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TableNumber;

/// Version number of a table document, used for optimistic concurrency control.
///
/// A freshly inserted document is at version 1 and every successful save
/// increments it by one. Version 0 never exists in the store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a new version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the version (0) of a document that has not been stored yet.
    pub fn initial() -> Self {
        Self(0)
    }

    /// Returns the version (1) assigned on insert.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw version value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A table aggregate as persisted: its key, its version and the
/// serialized state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDocument {
    /// The table this document belongs to.
    pub number: TableNumber,

    /// The version of the document as read from (or written to) the store.
    pub version: Version,

    /// When the document was last written.
    pub updated_at: DateTime<Utc>,

    /// The serialized aggregate state.
    pub state: serde_json::Value,
}

impl TableDocument {
    /// Creates a document that has not been stored yet.
    pub fn new(number: TableNumber, state: serde_json::Value) -> Self {
        Self {
            number,
            version: Version::initial(),
            updated_at: Utc::now(),
            state,
        }
    }

    /// Creates a document from a serializable state at the given version.
    pub fn from_state<T: Serialize>(
        number: TableNumber,
        version: Version,
        state: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            number,
            version,
            updated_at: Utc::now(),
            state: serde_json::to_value(state)?,
        })
    }

    /// Deserializes the document state into a concrete type.
    pub fn into_state<T: for<'de> Deserialize<'de>>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.state)
    }
}
