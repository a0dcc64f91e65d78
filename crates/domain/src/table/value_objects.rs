//! Value objects and entities nested inside the table aggregate.

use chrono::{DateTime, Utc};
use common::{ItemId, MenuItemId, OrderId, UserId};
use serde::{Deserialize, Serialize};

use super::TableError;

/// Which station prepares an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Prepared by the kitchen.
    Food,
    /// Prepared by the bar.
    Beverage,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Food => "food",
            OrderType::Beverage => "beverage",
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderType {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "food" => Ok(OrderType::Food),
            "beverage" => Ok(OrderType::Beverage),
            other => Err(TableError::UnknownOrderType {
                value: other.to_string(),
            }),
        }
    }
}

/// One menu-item line inside an order.
///
/// `item` and `quantity` are fixed at creation; only the preparation
/// fields (`cook`, `start`, `end`) change afterwards, through [`ItemPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    item: MenuItemId,
    quantity: u32,
    #[serde(default)]
    cook: Option<UserId>,
    #[serde(default)]
    start: Option<DateTime<Utc>>,
    #[serde(default)]
    end: Option<DateTime<Utc>>,
}

impl Item {
    fn from_new(new: NewItem) -> Self {
        Self {
            id: ItemId::new(),
            item: new.item,
            quantity: new.quantity,
            cook: None,
            start: None,
            end: None,
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn menu_item(&self) -> &MenuItemId {
        &self.item
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn cook(&self) -> Option<&UserId> {
        self.cook.as_ref()
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Returns a copy of this item with the supplied patch fields merged in.
    ///
    /// Fields the patch leaves out keep their stored value.
    pub fn merged(&self, patch: &ItemPatch) -> Item {
        let mut merged = self.clone();
        if let Some(cook) = &patch.cook {
            merged.cook = Some(cook.clone());
        }
        if let Some(start) = patch.start {
            merged.start = Some(start);
        }
        if let Some(end) = patch.end {
            merged.end = Some(end);
        }
        merged
    }
}

/// An order submitted during a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    #[serde(rename = "type")]
    order_type: OrderType,
    items: Vec<Item>,
    #[serde(default)]
    processed: Option<DateTime<Utc>>,
}

impl Order {
    /// Builds an order from a validated submission, assigning fresh ids.
    pub(crate) fn from_new(new: NewOrder) -> Self {
        Self {
            id: OrderId::new(),
            order_type: new.order_type,
            items: new.items.into_iter().map(Item::from_new).collect(),
            processed: None,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn processed(&self) -> Option<DateTime<Utc>> {
        self.processed
    }

    pub fn is_processed(&self) -> bool {
        self.processed.is_some()
    }

    pub(crate) fn replace_item(&mut self, item: Item) {
        if let Some(slot) = self.items.iter_mut().find(|i| i.id == item.id) {
            *slot = item;
        }
    }

    pub(crate) fn set_processed(&mut self, processed: Option<DateTime<Utc>>) {
        self.processed = processed;
    }
}

/// An item line as submitted by a waiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub item: MenuItemId,
    pub quantity: u32,
}

impl NewItem {
    pub fn new(item: impl Into<MenuItemId>, quantity: u32) -> Self {
        Self {
            item: item.into(),
            quantity,
        }
    }
}

/// An order as submitted by a waiter, before ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub items: Vec<NewItem>,
}

impl NewOrder {
    pub fn new(order_type: OrderType, items: Vec<NewItem>) -> Self {
        Self { order_type, items }
    }

    /// Checks that the order has at least one item and no zero quantities.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.items.is_empty() {
            return Err(TableError::EmptyOrder);
        }
        if let Some(bad) = self.items.iter().find(|i| i.quantity == 0) {
            return Err(TableError::InvalidQuantity {
                item: bad.item.to_string(),
                quantity: bad.quantity,
            });
        }
        Ok(())
    }
}

/// Preparation update for one item.
///
/// Only `cook`, `start` and `end` can be changed; any other key in the
/// incoming payload is rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemPatch {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl ItemPatch {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            cook: None,
            start: None,
            end: None,
        }
    }

    pub fn cook(mut self, cook: impl Into<UserId>) -> Self {
        self.cook = Some(cook.into());
        self
    }

    pub fn start(mut self, at: DateTime<Utc>) -> Self {
        self.start = Some(at);
        self
    }

    pub fn end(mut self, at: DateTime<Utc>) -> Self {
        self.end = Some(at);
        self
    }

    /// Returns true if the patch carries no field to change.
    pub fn is_empty(&self) -> bool {
        self.cook.is_none() && self.start.is_none() && self.end.is_none()
    }
}

/// Requested changes to one order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    /// Item preparation updates, applied in order.
    pub items: Vec<ItemPatch>,

    /// `Some(true)` marks the order processed, `Some(false)` clears the mark.
    pub processed: Option<bool>,
}

impl OrderPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, items: Vec<ItemPatch>) -> Self {
        self.items = items;
        self
    }

    pub fn processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.processed.is_none()
    }
}
