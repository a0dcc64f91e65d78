//! Table domain events.

use chrono::{DateTime, Utc};
use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

use super::{Item, Order};

/// Events that can occur on a table aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TableEvent {
    /// A new service was opened at the table.
    ServiceOpened(ServiceOpenedData),

    /// An order was appended to the active service.
    OrderAppended(OrderAppendedData),

    /// Preparation fields of one or more items were updated.
    ItemsPatched(ItemsPatchedData),

    /// An order was marked as processed.
    OrderProcessed(OrderProcessedData),

    /// An already processed order was marked processed again. The stored
    /// timestamp is kept; the waiter is alerted once more.
    OrderReadyAgain(OrderReadyAgainData),

    /// The processed mark was cleared from an order.
    OrderUnprocessed(OrderUnprocessedData),

    /// An order was removed from the active service.
    OrderRemoved(OrderRemovedData),

    /// The active service was closed.
    ServiceClosed(ServiceClosedData),
}

impl DomainEvent for TableEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TableEvent::ServiceOpened(_) => "ServiceOpened",
            TableEvent::OrderAppended(_) => "OrderAppended",
            TableEvent::ItemsPatched(_) => "ItemsPatched",
            TableEvent::OrderProcessed(_) => "OrderProcessed",
            TableEvent::OrderReadyAgain(_) => "OrderReadyAgain",
            TableEvent::OrderUnprocessed(_) => "OrderUnprocessed",
            TableEvent::OrderRemoved(_) => "OrderRemoved",
            TableEvent::ServiceClosed(_) => "ServiceClosed",
        }
    }
}

/// Data for ServiceOpened event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOpenedData {
    /// Number of guests.
    pub covers: u32,

    /// The waiter in charge of the service.
    pub waiter: UserId,

    pub opened_at: DateTime<Utc>,
}

/// Data for OrderAppended event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAppendedData {
    /// The order, with its ids already assigned.
    pub order: Order,
}

/// Data for ItemsPatched event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsPatchedData {
    pub order_id: OrderId,

    /// The merged items, replacing the stored items with the same id.
    pub items: Vec<Item>,
}

/// Data for OrderProcessed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderProcessedData {
    pub order_id: OrderId,
    pub processed_at: DateTime<Utc>,

    /// The waiter of the owning service, who gets notified.
    pub waiter: UserId,

    /// The staff member who marked the order.
    pub processed_by: UserId,
}

/// Data for OrderReadyAgain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReadyAgainData {
    pub order_id: OrderId,
    pub waiter: UserId,
    pub requested_by: UserId,
}

/// Data for OrderUnprocessed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderUnprocessedData {
    pub order_id: OrderId,
}

/// Data for OrderRemoved event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRemovedData {
    pub order_id: OrderId,
}

/// Data for ServiceClosed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceClosedData {
    pub closed_at: DateTime<Utc>,
}

// Convenience constructors
impl TableEvent {
    pub fn service_opened(covers: u32, waiter: UserId) -> Self {
        TableEvent::ServiceOpened(ServiceOpenedData {
            covers,
            waiter,
            opened_at: Utc::now(),
        })
    }

    pub fn order_appended(order: Order) -> Self {
        TableEvent::OrderAppended(OrderAppendedData { order })
    }

    pub fn items_patched(order_id: OrderId, items: Vec<Item>) -> Self {
        TableEvent::ItemsPatched(ItemsPatchedData { order_id, items })
    }

    pub fn order_processed(order_id: OrderId, waiter: UserId, processed_by: UserId) -> Self {
        TableEvent::OrderProcessed(OrderProcessedData {
            order_id,
            processed_at: Utc::now(),
            waiter,
            processed_by,
        })
    }

    pub fn order_ready_again(order_id: OrderId, waiter: UserId, requested_by: UserId) -> Self {
        TableEvent::OrderReadyAgain(OrderReadyAgainData {
            order_id,
            waiter,
            requested_by,
        })
    }

    pub fn order_unprocessed(order_id: OrderId) -> Self {
        TableEvent::OrderUnprocessed(OrderUnprocessedData { order_id })
    }

    pub fn order_removed(order_id: OrderId) -> Self {
        TableEvent::OrderRemoved(OrderRemovedData { order_id })
    }

    pub fn service_closed() -> Self {
        TableEvent::ServiceClosed(ServiceClosedData {
            closed_at: Utc::now(),
        })
    }
}
