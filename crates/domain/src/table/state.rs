//! Service state machine.

use serde::{Deserialize, Serialize};

/// The state of a service (one customer visit at a table).
///
/// State transitions:
/// ```text
/// Open ──► Closed
/// ```
/// `Closed` is terminal. Closing is driven by the billing side; this crate
/// only refuses mutations once it has happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ServiceState {
    /// Orders can be appended, patched and removed.
    #[default]
    Open,

    /// Archived visit; its orders are read-only.
    Closed,
}

impl ServiceState {
    pub fn from_done(done: bool) -> Self {
        if done {
            ServiceState::Closed
        } else {
            ServiceState::Open
        }
    }

    /// Returns true if orders can be appended, patched or removed.
    pub fn can_modify_orders(&self) -> bool {
        matches!(self, ServiceState::Open)
    }

    /// Returns true if the service can be closed.
    pub fn can_close(&self) -> bool {
        matches!(self, ServiceState::Open)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Open => "Open",
            ServiceState::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
