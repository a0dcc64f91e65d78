//! Domain error types.

use common::{OrderId, TableNumber};
use table_store::TableStoreError;
use thiserror::Error;

use crate::access::{Capability, Role};
use crate::table::TableError;

/// Error categories surfaced to callers.
///
/// Each [`DomainError`] maps to exactly one kind; the HTTP layer turns the
/// kind into a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Forbidden,
    Conflict,
    Persistence,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Validation => "validation",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Persistence => "persistence",
        }
    }
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the table aggregate.
    #[error("{0}")]
    Table(#[from] TableError),

    #[error("Table not found: {0}")]
    TableNotFound(TableNumber),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(TableNumber),

    /// Query narrowed to an order id that matched nothing.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The caller's role lacks the capability for this operation.
    #[error("Role {role} is not allowed to {capability}")]
    Forbidden { role: Role, capability: Capability },

    /// A query asked for populated references but no directory is configured.
    #[error("Cannot populate references: no directory is configured")]
    DirectoryUnavailable,

    /// Every attempt lost the optimistic concurrency race.
    #[error("Table {table_number} was modified concurrently; gave up after {attempts} attempts")]
    WriteConflict {
        table_number: TableNumber,
        attempts: u32,
    },

    /// An error occurred in the table store.
    #[error("Table store error: {0}")]
    Store(TableStoreError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TableStoreError> for DomainError {
    fn from(e: TableStoreError) -> Self {
        match e {
            TableStoreError::TableNotFound(number) => DomainError::TableNotFound(number),
            TableStoreError::TableAlreadyExists(number) => DomainError::TableAlreadyExists(number),
            other => DomainError::Store(other),
        }
    }
}

impl DomainError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Table(e) => e.kind(),
            DomainError::TableNotFound(_) | DomainError::OrderNotFound(_) => ErrorKind::NotFound,
            DomainError::TableAlreadyExists(_) | DomainError::WriteConflict { .. } => {
                ErrorKind::Conflict
            }
            DomainError::Forbidden { .. } => ErrorKind::Forbidden,
            DomainError::DirectoryUnavailable => ErrorKind::Validation,
            DomainError::Store(_) | DomainError::Serialization(_) => ErrorKind::Persistence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn store_errors_map_to_domain_kinds() {
        let missing: DomainError = TableStoreError::TableNotFound(TableNumber::new(4)).into();
        assert!(matches!(missing, DomainError::TableNotFound(_)));
        assert_eq!(missing.kind(), ErrorKind::NotFound);

        let duplicate: DomainError =
            TableStoreError::TableAlreadyExists(TableNumber::new(4)).into();
        assert_eq!(duplicate.kind(), ErrorKind::Conflict);

        let timeout: DomainError = TableStoreError::Timeout {
            operation: "get",
            after: Duration::from_secs(5),
        }
        .into();
        assert_eq!(timeout.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn table_errors_keep_their_kind() {
        let closed: DomainError = TableError::ServiceClosed { action: "x" }.into();
        assert_eq!(closed.kind(), ErrorKind::InvalidState);
        let empty: DomainError = TableError::EmptyPatch.into();
        assert_eq!(empty.kind(), ErrorKind::Validation);
        assert_eq!(
            DomainError::from(TableError::NoServices).kind(),
            ErrorKind::NotFound
        );
    }
}
