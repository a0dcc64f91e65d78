//! A single customer visit at a table.

use common::{OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::{Order, ServiceState};

/// One customer visit: covers, the waiter in charge and the orders placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    covers: u32,
    waiter: UserId,
    #[serde(default)]
    orders: Vec<Order>,
    #[serde(default)]
    done: bool,
}

impl Service {
    pub(crate) fn open(covers: u32, waiter: UserId) -> Self {
        Self {
            covers,
            waiter,
            orders: Vec::new(),
            done: false,
        }
    }

    pub fn covers(&self) -> u32 {
        self.covers
    }

    pub fn waiter(&self) -> &UserId {
        &self.waiter
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id() == id)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn state(&self) -> ServiceState {
        ServiceState::from_done(self.done)
    }

    pub(crate) fn order_mut(&mut self, id: OrderId) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id() == id)
    }

    pub(crate) fn push_order(&mut self, order: Order) {
        self.orders.push(order);
    }

    /// Drops the order with the given id, keeping the others in place.
    pub(crate) fn remove_order(&mut self, id: OrderId) {
        self.orders.retain(|o| o.id() != id);
    }

    pub(crate) fn close(&mut self) {
        self.done = true;
    }
}
