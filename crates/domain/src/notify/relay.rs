use std::sync::Arc;
use std::time::Duration;

use common::TableNumber;
use tokio::task::JoinHandle;

use crate::table::TableEvent;

use super::{Notifier, NotifyError, OrderReadyNotice};

/// Default bound on a single notice delivery.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

/// Turns committed table events into notifier calls.
///
/// Each publish spawns a background task; delivery failures and timeouts are
/// logged and counted but never reported back to the caller.
#[derive(Clone)]
pub struct NotificationRelay {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl NotificationRelay {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            notifier,
            timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Collects the notices the given events call for.
    pub fn notices(table_number: TableNumber, events: &[TableEvent]) -> Vec<OrderReadyNotice> {
        events
            .iter()
            .filter_map(|event| match event {
                TableEvent::OrderProcessed(data) => Some(OrderReadyNotice {
                    table_number,
                    order_id: data.order_id,
                    from: data.processed_by.clone(),
                    to: data.waiter.clone(),
                }),
                TableEvent::OrderReadyAgain(data) => Some(OrderReadyNotice {
                    table_number,
                    order_id: data.order_id,
                    from: data.requested_by.clone(),
                    to: data.waiter.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Dispatches notices for committed events on a background task.
    ///
    /// Returns the task handle, or None when no event needs a notice.
    pub fn publish(
        &self,
        table_number: TableNumber,
        events: &[TableEvent],
    ) -> Option<JoinHandle<()>> {
        let notices = Self::notices(table_number, events);
        if notices.is_empty() {
            return None;
        }

        let notifier = Arc::clone(&self.notifier);
        let limit = self.timeout;
        Some(tokio::spawn(async move {
            for notice in notices {
                let outcome = match tokio::time::timeout(limit, notice.deliver(notifier.as_ref()))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(NotifyError::Timeout(limit)),
                };

                match outcome {
                    Ok(()) => tracing::debug!(
                        table_number = %notice.table_number,
                        order_id = %notice.order_id,
                        waiter = %notice.to,
                        "order ready notice delivered"
                    ),
                    Err(e) => {
                        metrics::counter!("order_notifications_failed_total").increment(1);
                        tracing::warn!(
                            table_number = %notice.table_number,
                            order_id = %notice.order_id,
                            waiter = %notice.to,
                            error = %e,
                            "order ready notice failed"
                        );
                    }
                }
            }
        }))
    }
}
