//! Table registration and lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use table_store::TableStore;

use super::{AppState, TablePath, TableResponse, checked_table_number, table_number};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTableRequest {
    pub number: u32,
}

/// POST /tables — register a new table.
#[tracing::instrument(skip(state, caller, req))]
pub async fn create<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    ApiJson(req): ApiJson<CreateTableRequest>,
) -> Result<(StatusCode, Json<TableResponse>), ApiError> {
    let number = checked_table_number(req.number)?;
    let table = state.lifecycle.create_table(&caller, number).await?;
    Ok((StatusCode::CREATED, Json(table.into())))
}

/// GET /tables/{table_number} — load one table with its services.
#[tracing::instrument(skip(state, _caller, path))]
pub async fn get<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(_caller): Caller,
    path: Result<Path<TablePath>, PathRejection>,
) -> Result<Json<TableResponse>, ApiError> {
    let number = table_number(path)?;
    let table = state.lifecycle.get_table(number).await?;
    Ok(Json(table.into()))
}
