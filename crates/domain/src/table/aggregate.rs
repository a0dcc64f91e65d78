//! Table aggregate implementation.

use std::collections::HashMap;

use common::{ItemId, OrderId, TableNumber, UserId};
use serde::{Deserialize, Serialize};
use table_store::Version;

use crate::aggregate::Aggregate;

use super::{
    Item, NewOrder, Order, OrderPatch, Service, TableError, TableEvent,
    events::{ItemsPatchedData, OrderProcessedData, ServiceOpenedData},
};

/// Table aggregate root.
///
/// A table owns an append-only sequence of services. At most one service is
/// open at any time, and when one is, it is the last element of `services`.
/// Only that active service can be modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    number: TableNumber,

    #[serde(default)]
    busy: bool,

    #[serde(default)]
    services: Vec<Service>,

    /// Document version the table was loaded at. Kept out of the stored state.
    #[serde(skip)]
    version: Version,
}

impl Aggregate for Table {
    type Event = TableEvent;
    type Error = TableError;

    fn aggregate_type() -> &'static str {
        "Table"
    }

    fn key(&self) -> TableNumber {
        self.number
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            TableEvent::ServiceOpened(data) => self.apply_service_opened(data),
            TableEvent::OrderAppended(data) => {
                if let Some(service) = self.active_service_mut() {
                    service.push_order(data.order);
                }
            }
            TableEvent::ItemsPatched(data) => self.apply_items_patched(data),
            TableEvent::OrderProcessed(data) => self.apply_order_processed(data),
            // Notice only, the stored timestamp stays.
            TableEvent::OrderReadyAgain(_) => {}
            TableEvent::OrderUnprocessed(data) => {
                if let Some(order) = self.active_order_mut(data.order_id) {
                    order.set_processed(None);
                }
            }
            TableEvent::OrderRemoved(data) => {
                if let Some(service) = self.active_service_mut() {
                    service.remove_order(data.order_id);
                }
            }
            TableEvent::ServiceClosed(_) => {
                if let Some(service) = self.active_service_mut() {
                    service.close();
                }
            }
        }
    }
}

// Query methods
impl Table {
    /// Creates an empty table that has never hosted a service.
    pub fn new(number: TableNumber) -> Self {
        Self {
            number,
            busy: false,
            services: Vec::new(),
            version: Version::initial(),
        }
    }

    /// Returns the table number.
    pub fn number(&self) -> TableNumber {
        self.number
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Returns all services, oldest first.
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Returns the last service, open or not.
    pub fn last_service(&self) -> Option<&Service> {
        self.services.last()
    }

    /// Returns the open service, if any.
    pub fn active_service(&self) -> Option<&Service> {
        self.services.last().filter(|s| !s.state().is_terminal())
    }

    /// Returns the number of services that are still open.
    pub fn open_service_count(&self) -> usize {
        self.services.iter().filter(|s| !s.is_done()).count()
    }

    /// Finds an order in any service of this table.
    pub fn find_order(&self, order_id: OrderId) -> Option<&Order> {
        self.services.iter().find_map(|s| s.order(order_id))
    }
}

// Command methods (return events)
impl Table {
    /// Appends an order, opening a new service when none is active.
    ///
    /// `covers` of zero falls back to the number of items in the order.
    pub fn append_order(
        &self,
        waiter: &UserId,
        order: NewOrder,
        covers: u32,
    ) -> Result<Vec<TableEvent>, TableError> {
        order.validate()?;

        let mut events = Vec::with_capacity(2);
        if self.active_service().is_none() {
            let covers = if covers > 0 {
                covers
            } else {
                order.items.len() as u32
            };
            events.push(TableEvent::service_opened(covers, waiter.clone()));
        }
        events.push(TableEvent::order_appended(Order::from_new(order)));

        Ok(events)
    }

    /// Updates item preparation fields and the processed mark of an order
    /// in the active service.
    pub fn patch_order(
        &self,
        order_id: OrderId,
        patch: &OrderPatch,
        actor: &UserId,
    ) -> Result<Vec<TableEvent>, TableError> {
        if patch.is_empty() {
            return Err(TableError::EmptyPatch);
        }

        let service = self.mutable_service("update order")?;
        let order = service
            .order(order_id)
            .ok_or(TableError::OrderNotFound { order_id })?;

        let mut merged: Vec<Item> = Vec::new();
        let mut positions: HashMap<ItemId, usize> = HashMap::new();
        for item_patch in &patch.items {
            let current = match positions.get(&item_patch.id) {
                Some(&idx) => &merged[idx],
                None => order.item(item_patch.id).ok_or(TableError::ItemNotFound {
                    item_id: item_patch.id,
                })?,
            };

            let next = current.merged(item_patch);
            if let (Some(start), Some(end)) = (next.start(), next.end()) {
                if end < start {
                    return Err(TableError::InvalidTiming {
                        item_id: item_patch.id,
                    });
                }
            }

            match positions.get(&item_patch.id) {
                Some(&idx) => merged[idx] = next,
                None => {
                    positions.insert(item_patch.id, merged.len());
                    merged.push(next);
                }
            }
        }

        let mut events = Vec::new();
        let changed: Vec<Item> = merged
            .into_iter()
            .filter(|item| order.item(item.id()) != Some(item))
            .collect();
        if !changed.is_empty() {
            events.push(TableEvent::items_patched(order_id, changed));
        }

        match patch.processed {
            Some(true) if !order.is_processed() => events.push(TableEvent::order_processed(
                order_id,
                service.waiter().clone(),
                actor.clone(),
            )),
            Some(true) => events.push(TableEvent::order_ready_again(
                order_id,
                service.waiter().clone(),
                actor.clone(),
            )),
            Some(false) if order.is_processed() => {
                events.push(TableEvent::order_unprocessed(order_id))
            }
            _ => {}
        }

        Ok(events)
    }

    /// Removes an order from the active service.
    ///
    /// An unknown order id produces no events.
    pub fn remove_order(&self, order_id: OrderId) -> Result<Vec<TableEvent>, TableError> {
        let service = self.mutable_service("remove order")?;
        if service.order(order_id).is_none() {
            return Ok(vec![]);
        }
        Ok(vec![TableEvent::order_removed(order_id)])
    }

    /// Closes the active service.
    pub fn close_active_service(&self) -> Result<Vec<TableEvent>, TableError> {
        match self.services.last() {
            Some(service) if service.state().can_close() => Ok(vec![TableEvent::service_closed()]),
            _ => Err(TableError::NoActiveService),
        }
    }

    fn mutable_service(&self, action: &'static str) -> Result<&Service, TableError> {
        let last = self.services.last().ok_or(TableError::NoServices)?;
        if !last.state().can_modify_orders() {
            return Err(TableError::ServiceClosed { action });
        }
        Ok(last)
    }
}

// Apply event helpers
impl Table {
    fn active_service_mut(&mut self) -> Option<&mut Service> {
        self.services.last_mut().filter(|s| !s.is_done())
    }

    fn active_order_mut(&mut self, order_id: OrderId) -> Option<&mut Order> {
        self.active_service_mut()?.order_mut(order_id)
    }

    fn apply_service_opened(&mut self, data: ServiceOpenedData) {
        self.services.push(Service::open(data.covers, data.waiter));
        self.busy = true;
    }

    fn apply_items_patched(&mut self, data: ItemsPatchedData) {
        if let Some(order) = self.active_order_mut(data.order_id) {
            for item in data.items {
                order.replace_item(item);
            }
        }
    }

    fn apply_order_processed(&mut self, data: OrderProcessedData) {
        if let Some(order) = self.active_order_mut(data.order_id) {
            order.set_processed(Some(data.processed_at));
        }
    }
}
