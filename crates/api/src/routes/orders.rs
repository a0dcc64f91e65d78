//! Order query and mutation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use common::{OrderId, TableNumber};
use domain::{
    AppendOrder, ItemPatch, NewOrder, OrderPatch, OrderQuery, OrderQueryResult, OrderType,
    PatchOrder, RemoveOrder,
};
use serde::Deserialize;
use table_store::TableStore;

use super::{AppState, OrderPath, TablePath, TableResponse, order_path, table_number};
use crate::error::ApiError;
use crate::extract::{ApiJson, Caller};

// -- Request types --

/// Query string accepted by the order listing endpoints.
///
/// Booleans are given as `1`/`0` or `true`/`false`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilterParams {
    pub service_done: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub processed: Option<String>,
    pub populate: Option<String>,
    pub order_id: Option<String>,
}

impl OrderFilterParams {
    /// Converts the raw parameters into a query, rejecting malformed values.
    pub fn into_query(self, table: Option<TableNumber>) -> Result<OrderQuery, ApiError> {
        let order_type = self
            .order_type
            .map(|t| {
                t.parse::<OrderType>()
                    .map_err(|e| ApiError::BadRequest(e.to_string()))
            })
            .transpose()?;
        let order_id = self
            .order_id
            .map(|id| {
                uuid::Uuid::parse_str(&id)
                    .map(OrderId::from_uuid)
                    .map_err(|e| ApiError::BadRequest(format!("Invalid orderId: {e}")))
            })
            .transpose()?;

        Ok(OrderQuery {
            table_number: table,
            service_done: parse_flag("serviceDone", self.service_done)?,
            order_type,
            processed: parse_flag("processed", self.processed)?,
            order_id,
            populate: parse_flag("populate", self.populate)?.unwrap_or(false),
        })
    }
}

fn parse_flag(name: &str, value: Option<String>) -> Result<Option<bool>, ApiError> {
    match value.as_deref() {
        None => Ok(None),
        Some("1") | Some("true") => Ok(Some(true)),
        Some("0") | Some("false") => Ok(Some(false)),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Invalid value for {name}: {other} (expected 1, 0, true or false)"
        ))),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendOrderRequest {
    /// Guests at the table; only used when a new service is opened.
    #[serde(default)]
    pub covers_number: Option<u32>,
    pub order: NewOrder,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatchOrderRequest {
    /// `{ "items": [...] }`, either inline or as a JSON-encoded string.
    #[serde(default)]
    pub updated_info: Option<serde_json::Value>,
    #[serde(default)]
    pub processed: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatedInfo {
    #[serde(default)]
    pub items: Vec<ItemPatch>,
}

impl PatchOrderRequest {
    pub fn into_patch(self) -> Result<OrderPatch, ApiError> {
        let info = match self.updated_info {
            None | Some(serde_json::Value::Null) => UpdatedInfo::default(),
            Some(serde_json::Value::String(encoded)) => serde_json::from_str(&encoded)
                .map_err(|e| ApiError::BadRequest(format!("Invalid updatedInfo: {e}")))?,
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ApiError::BadRequest(format!("Invalid updatedInfo: {e}")))?,
        };

        Ok(OrderPatch {
            items: info.items,
            processed: self.processed,
        })
    }
}

// -- Handlers --

/// GET /tables/orders — orders across every table.
#[tracing::instrument(skip(state, caller, params))]
pub async fn list_all<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    params: Result<Query<OrderFilterParams>, QueryRejection>,
) -> Result<Json<OrderQueryResult>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = params.into_query(None)?;
    Ok(Json(state.queries.query_orders(&caller, query).await?))
}

/// GET /tables/{table_number}/orders — orders of one table.
#[tracing::instrument(skip(state, caller, path, params))]
pub async fn list_for_table<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    path: Result<Path<TablePath>, PathRejection>,
    params: Result<Query<OrderFilterParams>, QueryRejection>,
) -> Result<Json<OrderQueryResult>, ApiError> {
    let number = table_number(path)?;
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let query = params.into_query(Some(number))?;
    Ok(Json(state.queries.query_orders(&caller, query).await?))
}

/// POST /tables/{table_number}/orders — append an order, opening a service if needed.
#[tracing::instrument(skip(state, caller, path, req))]
pub async fn append<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    path: Result<Path<TablePath>, PathRejection>,
    ApiJson(req): ApiJson<AppendOrderRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let number = table_number(path)?;
    let cmd = AppendOrder::new(number, req.order, req.covers_number.unwrap_or(0));
    let result = state.lifecycle.append_order(&caller, cmd).await?;
    Ok(Json(result.aggregate.into()))
}

/// PATCH /tables/{table_number}/orders/{order_id} — update items or the processed mark.
#[tracing::instrument(skip(state, caller, path, req))]
pub async fn patch<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    path: Result<Path<OrderPath>, PathRejection>,
    ApiJson(req): ApiJson<PatchOrderRequest>,
) -> Result<Json<TableResponse>, ApiError> {
    let (number, order_id) = order_path(path)?;
    let cmd = PatchOrder::new(number, order_id, req.into_patch()?);
    let result = state.lifecycle.patch_order(&caller, cmd).await?;
    Ok(Json(result.aggregate.into()))
}

/// DELETE /tables/{table_number}/orders/{order_id} — remove an order from the open service.
#[tracing::instrument(skip(state, caller, path))]
pub async fn remove<S: TableStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Caller(caller): Caller,
    path: Result<Path<OrderPath>, PathRejection>,
) -> Result<Json<TableResponse>, ApiError> {
    let (number, order_id) = order_path(path)?;
    let result = state
        .lifecycle
        .remove_order(&caller, RemoveOrder::new(number, order_id))
        .await?;
    Ok(Json(result.aggregate.into()))
}
