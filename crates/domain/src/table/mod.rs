//! Table aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;
mod value_objects;

pub use aggregate::Table;
pub use commands::*;
pub use events::{
    ItemsPatchedData, OrderAppendedData, OrderProcessedData, OrderReadyAgainData,
    OrderRemovedData, OrderUnprocessedData, ServiceClosedData, ServiceOpenedData, TableEvent,
};
pub use service::Service;
pub use state::ServiceState;
pub use value_objects::{Item, ItemPatch, NewItem, NewOrder, Order, OrderPatch, OrderType};

use common::{ItemId, OrderId};
use thiserror::Error;

use crate::error::ErrorKind;

/// Errors that can occur during table operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// The table has never hosted a service.
    #[error("Table has no services")]
    NoServices,

    /// The last service is closed, so nothing can be modified.
    #[error("Cannot {action}: the current service is closed")]
    ServiceClosed { action: &'static str },

    /// There is no open service to close.
    #[error("Table has no active service")]
    NoActiveService,

    /// Order not found in the active service.
    #[error("Order not found: {order_id}")]
    OrderNotFound { order_id: OrderId },

    /// Item not found in the order.
    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: ItemId },

    /// An order must carry at least one item.
    #[error("Order has no items")]
    EmptyOrder,

    #[error("Invalid quantity for {item}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item: String, quantity: u32 },

    #[error("Unknown order type: {value}")]
    UnknownOrderType { value: String },

    /// Neither item updates nor a processed flag were supplied.
    #[error("Nothing to update")]
    EmptyPatch,

    /// The patch would leave an item ending before it started.
    #[error("Item {item_id} would end before it starts")]
    InvalidTiming { item_id: ItemId },
}

impl TableError {
    /// Returns the error category this failure belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TableError::NoServices
            | TableError::OrderNotFound { .. }
            | TableError::ItemNotFound { .. } => ErrorKind::NotFound,
            TableError::ServiceClosed { .. } | TableError::NoActiveService => {
                ErrorKind::InvalidState
            }
            TableError::EmptyOrder
            | TableError::InvalidQuantity { .. }
            | TableError::UnknownOrderType { .. }
            | TableError::EmptyPatch
            | TableError::InvalidTiming { .. } => ErrorKind::Validation,
        }
    }
}
