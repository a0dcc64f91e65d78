use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::UserId;
use tokio::sync::Notify;

use super::{Notifier, NotifyError};

/// A message recorded by [`InMemoryNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotice {
    pub from: UserId,
    pub to: UserId,
    pub message: String,
}

#[derive(Debug, Default)]
struct Outbox {
    notices: Vec<SentNotice>,
    emitted: Vec<(UserId, String)>,
}

/// Notifier that records everything it is asked to deliver.
///
/// Can be switched into a failing mode to exercise the best-effort path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    outbox: Arc<Mutex<Outbox>>,
    fail: Arc<AtomicBool>,
    changed: Arc<Notify>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `Unavailable`.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns the messages delivered so far.
    pub fn notices(&self) -> Vec<SentNotice> {
        self.outbox
            .lock()
            .map(|o| o.notices.clone())
            .unwrap_or_default()
    }

    /// Returns the `(user, event)` pairs emitted so far.
    pub fn emitted(&self) -> Vec<(UserId, String)> {
        self.outbox
            .lock()
            .map(|o| o.emitted.clone())
            .unwrap_or_default()
    }

    /// Waits until at least `count` events have been emitted.
    ///
    /// Returns false if that doesn't happen within `limit`.
    pub async fn wait_for_emitted(&self, count: usize, limit: Duration) -> bool {
        tokio::time::timeout(limit, async {
            loop {
                let changed = self.changed.notified();
                if self.emitted().len() >= count {
                    return;
                }
                changed.await;
            }
        })
        .await
        .is_ok()
    }

    fn check(&self) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Unavailable("notifier switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn notify(&self, from: &UserId, to: &UserId, message: &str) -> Result<(), NotifyError> {
        self.check()?;
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.notices.push(SentNotice {
                from: from.clone(),
                to: to.clone(),
                message: message.to_string(),
            });
        }
        self.changed.notify_waiters();
        Ok(())
    }

    async fn emit_to_user(&self, user: &UserId, event: &str) -> Result<(), NotifyError> {
        self.check()?;
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.emitted.push((user.clone(), event.to_string()));
        }
        self.changed.notify_waiters();
        Ok(())
    }
}
