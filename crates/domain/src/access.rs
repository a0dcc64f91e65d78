//! Staff roles and the capability check applied to every lifecycle operation.

use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Staff role of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Waiter,
    Cook,
    CashDesk,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Waiter => "waiter",
            Role::Cook => "cook",
            Role::CashDesk => "cash_desk",
        }
    }

    /// Returns true if this role may perform the given action.
    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::PlaceOrder => matches!(self, Role::Waiter),
            Capability::UpdateOrder => matches!(self, Role::Cook | Role::CashDesk),
            Capability::RemoveOrder => matches!(self, Role::Waiter | Role::CashDesk),
            Capability::ManageTables => matches!(self, Role::CashDesk),
            Capability::ViewOrders => true,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiter" => Ok(Role::Waiter),
            "cook" => Ok(Role::Cook),
            "cash_desk" => Ok(Role::CashDesk),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Actions guarded by a role check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    PlaceOrder,
    UpdateOrder,
    RemoveOrder,
    ManageTables,
    ViewOrders,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let action = match self {
            Capability::PlaceOrder => "place orders",
            Capability::UpdateOrder => "update orders",
            Capability::RemoveOrder => "remove orders",
            Capability::ManageTables => "manage tables",
            Capability::ViewOrders => "view orders",
        };
        f.write_str(action)
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn waiter(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::Waiter)
    }

    pub fn cook(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::Cook)
    }

    pub fn cash_desk(id: impl Into<UserId>) -> Self {
        Self::new(id, Role::CashDesk)
    }

    /// Fails with [`DomainError::Forbidden`] unless the actor's role grants
    /// the capability.
    pub fn authorize(&self, capability: Capability) -> Result<(), DomainError> {
        if self.role.can(capability) {
            Ok(())
        } else {
            Err(DomainError::Forbidden {
                role: self.role,
                capability,
            })
        }
    }
}
