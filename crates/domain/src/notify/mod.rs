//! Outbound staff notifications.
//!
//! Delivery is best-effort and happens after the table document has been
//! committed, so a notifier outage never affects stored state.

mod memory;
mod relay;

pub use memory::{InMemoryNotifier, SentNotice};
pub use relay::NotificationRelay;

use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, TableNumber, UserId};
use thiserror::Error;

/// Event name emitted to the waiter when one of their orders is ready.
pub const ORDER_PROCESSED_EVENT: &str = "orderProcessed";

/// Errors a notifier can report. They are logged, never surfaced to callers.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notifier unavailable: {0}")]
    Unavailable(String),

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivery channel to connected staff members.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends a text message from one user to another.
    async fn notify(&self, from: &UserId, to: &UserId, message: &str) -> Result<(), NotifyError>;

    /// Emits a named event to a single user.
    async fn emit_to_user(&self, user: &UserId, event: &str) -> Result<(), NotifyError>;
}

/// Notifier that only writes to the log.
///
/// Used when no real-time channel is wired in.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, from: &UserId, to: &UserId, message: &str) -> Result<(), NotifyError> {
        tracing::info!(%from, %to, message, "staff notification");
        Ok(())
    }

    async fn emit_to_user(&self, user: &UserId, event: &str) -> Result<(), NotifyError> {
        tracing::info!(%user, event, "staff event");
        Ok(())
    }
}

/// Tells a waiter that an order for one of their tables is ready.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReadyNotice {
    pub table_number: TableNumber,
    pub order_id: OrderId,

    /// Who marked the order processed.
    pub from: UserId,

    /// The waiter of the service the order belongs to.
    pub to: UserId,
}

impl OrderReadyNotice {
    pub fn message(&self) -> String {
        format!(
            "One order for table number {} is ready to be served",
            self.table_number
        )
    }

    /// Delivers the notice: the message first, then the `orderProcessed`
    /// event.
    pub async fn deliver(&self, notifier: &dyn Notifier) -> Result<(), NotifyError> {
        notifier.notify(&self.from, &self.to, &self.message()).await?;
        notifier.emit_to_user(&self.to, ORDER_PROCESSED_EVENT).await
    }
}
