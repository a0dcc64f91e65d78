//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod tables;

use axum::extract::Path;
use axum::extract::rejection::PathRejection;
use common::{OrderId, TableNumber};
use domain::{LifecycleManager, QueryEngine, Table};
use serde::{Deserialize, Serialize};
use table_store::TableStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: TableStore> {
    pub lifecycle: LifecycleManager<S>,
    pub queries: QueryEngine<S>,
}

/// Body returned by every operation that changes or reads one table.
#[derive(Serialize)]
pub struct TableResponse {
    pub table: Table,
}

impl From<Table> for TableResponse {
    fn from(table: Table) -> Self {
        Self { table }
    }
}

#[derive(Deserialize)]
pub struct TablePath {
    pub table_number: u32,
}

#[derive(Deserialize)]
pub struct OrderPath {
    pub table_number: u32,
    pub order_id: uuid::Uuid,
}

/// Validates a raw table number against the storable range.
pub(crate) fn checked_table_number(number: u32) -> Result<TableNumber, ApiError> {
    TableNumber::checked(number).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Invalid table number: {number} (must be at most {})",
            TableNumber::MAX
        ))
    })
}

pub(crate) fn table_number(
    path: Result<Path<TablePath>, PathRejection>,
) -> Result<TableNumber, ApiError> {
    let Path(path) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    checked_table_number(path.table_number)
}

pub(crate) fn order_path(
    path: Result<Path<OrderPath>, PathRejection>,
) -> Result<(TableNumber, OrderId), ApiError> {
    let Path(path) = path.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    Ok((
        checked_table_number(path.table_number)?,
        OrderId::from_uuid(path.order_id),
    ))
}
