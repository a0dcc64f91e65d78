//! Cross-table order queries for kitchen, bar and floor views.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{ItemId, MenuItemId, OrderId, TableNumber, UserId};
use serde::Serialize;
use table_store::TableStore;

use crate::access::{Actor, Capability};
use crate::command::CommandHandler;
use crate::directory::{Directory, MenuItemSummary, StaffSummary};
use crate::error::DomainError;
use crate::table::{Item, Order, OrderType, Table};

/// Filter for [`QueryEngine::query_orders`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderQuery {
    pub table_number: Option<TableNumber>,
    pub service_done: Option<bool>,
    pub order_type: Option<OrderType>,
    pub processed: Option<bool>,
    pub order_id: Option<OrderId>,

    /// Resolve user and menu references through the directory.
    /// Never affects which orders match.
    pub populate: bool,
}

impl OrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(mut self, number: TableNumber) -> Self {
        self.table_number = Some(number);
        self
    }

    pub fn service_done(mut self, done: bool) -> Self {
        self.service_done = Some(done);
        self
    }

    pub fn order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn processed(mut self, processed: bool) -> Self {
        self.processed = Some(processed);
        self
    }

    pub fn order_id(mut self, id: OrderId) -> Self {
        self.order_id = Some(id);
        self
    }

    pub fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    fn matches(&self, order: &Order) -> bool {
        self.order_type.is_none_or(|t| t == order.order_type())
            && self.processed.is_none_or(|p| p == order.is_processed())
    }
}

/// A reference that is either a bare id or the resolved document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reference<Id, Doc> {
    Id(Id),
    Resolved(Doc),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemView {
    pub id: ItemId,
    pub item: Reference<MenuItemId, MenuItemSummary>,
    pub quantity: u32,
    pub cook: Option<Reference<UserId, StaffSummary>>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderView {
    pub id: OrderId,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub items: Vec<ItemView>,
    pub processed: Option<DateTime<Utc>>,
}

/// An order correlated with its service's waiter and its table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RichInfo {
    pub order: OrderView,
    pub waiter: Reference<UserId, StaffSummary>,
    pub table_number: TableNumber,
}

/// Outcome of an order query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderQueryResult {
    Many {
        orders: Vec<OrderView>,
        #[serde(rename = "richInfo")]
        rich_info: Vec<RichInfo>,
    },
    Single {
        order: OrderView,
        #[serde(rename = "richInfo")]
        rich_info: RichInfo,
    },
}

impl OrderQueryResult {
    /// Returns the matched orders in traversal order.
    pub fn orders(&self) -> Vec<&OrderView> {
        match self {
            OrderQueryResult::Many { orders, .. } => orders.iter().collect(),
            OrderQueryResult::Single { order, .. } => vec![order],
        }
    }
}

/// A matched order together with the context it was found in.
#[derive(Debug, Clone, Copy)]
pub struct OrderMatch<'a> {
    pub order: &'a Order,
    pub waiter: &'a UserId,
    pub table_number: TableNumber,
}

/// Walks tables, services and orders in stored order and keeps what the
/// query's filters accept. `order_id` and `populate` are not considered.
pub fn select_orders<'a>(tables: &'a [Table], query: &OrderQuery) -> Vec<OrderMatch<'a>> {
    let mut matches = Vec::new();
    for table in tables {
        if query.table_number.is_some_and(|n| n != table.number()) {
            continue;
        }
        for service in table.services() {
            if query.service_done.is_some_and(|done| done != service.is_done()) {
                continue;
            }
            for order in service.orders().iter().filter(|o| query.matches(o)) {
                matches.push(OrderMatch {
                    order,
                    waiter: service.waiter(),
                    table_number: table.number(),
                });
            }
        }
    }
    matches
}

/// Read side over the stored tables.
pub struct QueryEngine<S: TableStore> {
    tables: CommandHandler<S, Table>,
    directory: Option<Arc<dyn Directory>>,
}

impl<S: TableStore> QueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            tables: CommandHandler::new(store),
            directory: None,
        }
    }

    /// Sets the directory used to resolve references when a query asks to
    /// populate them.
    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Runs an order query.
    ///
    /// A `table_number` that doesn't exist yields an empty result. An
    /// `order_id` that matches nothing fails with
    /// [`DomainError::OrderNotFound`].
    /// Asking to populate references without a directory fails with
    /// [`DomainError::DirectoryUnavailable`].
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn query_orders(
        &self,
        actor: &Actor,
        query: OrderQuery,
    ) -> Result<OrderQueryResult, DomainError> {
        actor.authorize(Capability::ViewOrders)?;
        if query.populate && self.directory.is_none() {
            return Err(DomainError::DirectoryUnavailable);
        }

        let tables = match query.table_number {
            Some(number) => self.tables.load_existing(number).await?.into_iter().collect(),
            None => self.tables.load_all().await?,
        };
        let matches = select_orders(&tables, &query);
        tracing::debug!(matched = matches.len(), "orders selected");

        let mut resolver = Resolver::new(self.directory.as_deref().filter(|_| query.populate));

        if let Some(order_id) = query.order_id {
            let found = matches
                .iter()
                .find(|m| m.order.id() == order_id)
                .ok_or(DomainError::OrderNotFound(order_id))?;
            let rich_info = resolver.rich_info(found).await;
            return Ok(OrderQueryResult::Single {
                order: rich_info.order.clone(),
                rich_info,
            });
        }

        let mut orders = Vec::with_capacity(matches.len());
        let mut rich_info = Vec::with_capacity(matches.len());
        for found in &matches {
            let info = resolver.rich_info(found).await;
            orders.push(info.order.clone());
            rich_info.push(info);
        }
        Ok(OrderQueryResult::Many { orders, rich_info })
    }
}

/// Builds views, resolving references once per id.
struct Resolver<'d> {
    directory: Option<&'d dyn Directory>,
    staff: HashMap<UserId, Option<StaffSummary>>,
    menu: HashMap<MenuItemId, Option<MenuItemSummary>>,
}

impl<'d> Resolver<'d> {
    fn new(directory: Option<&'d dyn Directory>) -> Self {
        Self {
            directory,
            staff: HashMap::new(),
            menu: HashMap::new(),
        }
    }

    async fn rich_info(&mut self, found: &OrderMatch<'_>) -> RichInfo {
        RichInfo {
            order: self.order(found.order).await,
            waiter: self.user(found.waiter).await,
            table_number: found.table_number,
        }
    }

    async fn order(&mut self, order: &Order) -> OrderView {
        let mut items = Vec::with_capacity(order.items().len());
        for item in order.items() {
            items.push(self.item(item).await);
        }
        OrderView {
            id: order.id(),
            order_type: order.order_type(),
            items,
            processed: order.processed(),
        }
    }

    async fn item(&mut self, item: &Item) -> ItemView {
        let cook = match item.cook() {
            Some(cook) => Some(self.user(cook).await),
            None => None,
        };
        ItemView {
            id: item.id(),
            item: self.menu_item(item.menu_item()).await,
            quantity: item.quantity(),
            cook,
            start: item.start(),
            end: item.end(),
        }
    }

    async fn user(&mut self, id: &UserId) -> Reference<UserId, StaffSummary> {
        let Some(directory) = self.directory else {
            return Reference::Id(id.clone());
        };
        if !self.staff.contains_key(id) {
            let found = directory.staff(id).await;
            self.staff.insert(id.clone(), found);
        }
        match self.staff.get(id).cloned().flatten() {
            Some(summary) => Reference::Resolved(summary),
            None => Reference::Id(id.clone()),
        }
    }

    async fn menu_item(&mut self, id: &MenuItemId) -> Reference<MenuItemId, MenuItemSummary> {
        let Some(directory) = self.directory else {
            return Reference::Id(id.clone());
        };
        if !self.menu.contains_key(id) {
            let found = directory.menu_item(id).await;
            self.menu.insert(id.clone(), found);
        }
        match self.menu.get(id).cloned().flatten() {
            Some(summary) => Reference::Resolved(summary),
            None => Reference::Id(id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::table::{NewItem, NewOrder, OrderPatch};

    fn append(table: &mut Table, waiter: &str, order_type: OrderType, item: &str) -> OrderId {
        let order = NewOrder::new(order_type, vec![NewItem::new(item, 1)]);
        let events = table.append_order(&UserId::new(waiter), order, 2).unwrap();
        table.apply_events(events);
        table.active_service().unwrap().orders().last().unwrap().id()
    }

    /// Table 1: closed service (food), open service (beverage, processed food).
    /// Table 2: open service (food).
    fn fixture() -> Vec<Table> {
        let mut one = Table::new(TableNumber::new(1));
        append(&mut one, "W1", OrderType::Food, "soup");
        let events = one.close_active_service().unwrap();
        one.apply_events(events);
        append(&mut one, "W2", OrderType::Beverage, "wine");
        let ready = append(&mut one, "W2", OrderType::Food, "steak");
        let events = one
            .patch_order(ready, &OrderPatch::new().processed(true), &UserId::new("C1"))
            .unwrap();
        one.apply_events(events);

        let mut two = Table::new(TableNumber::new(2));
        append(&mut two, "W3", OrderType::Food, "pasta");

        vec![one, two]
    }

    fn menu_items(matches: &[OrderMatch<'_>]) -> Vec<String> {
        matches
            .iter()
            .map(|m| m.order.items()[0].menu_item().to_string())
            .collect()
    }

    #[test]
    fn no_filter_walks_everything_in_order() {
        let tables = fixture();
        let matches = select_orders(&tables, &OrderQuery::new());
        assert_eq!(menu_items(&matches), vec!["soup", "wine", "steak", "pasta"]);
        assert_eq!(matches[0].waiter, &UserId::new("W1"));
        assert_eq!(matches[3].table_number, TableNumber::new(2));
    }

    #[test]
    fn type_filter() {
        let tables = fixture();
        let matches = select_orders(&tables, &OrderQuery::new().order_type(OrderType::Beverage));
        assert_eq!(menu_items(&matches), vec!["wine"]);
    }

    #[test]
    fn service_done_filter() {
        let tables = fixture();
        let done = select_orders(&tables, &OrderQuery::new().service_done(true));
        assert_eq!(menu_items(&done), vec!["soup"]);

        let open = select_orders(&tables, &OrderQuery::new().service_done(false));
        assert_eq!(menu_items(&open), vec!["wine", "steak", "pasta"]);
    }

    #[test]
    fn processed_and_table_filters_combine() {
        let tables = fixture();
        let pending = select_orders(
            &tables,
            &OrderQuery::new()
                .table(TableNumber::new(1))
                .processed(false)
                .order_type(OrderType::Food),
        );
        assert_eq!(menu_items(&pending), vec!["soup"]);

        let ready = select_orders(&tables, &OrderQuery::new().processed(true));
        assert_eq!(menu_items(&ready), vec!["steak"]);
    }

    #[test]
    fn rich_info_serializes_camel_case() {
        let info = RichInfo {
            order: OrderView {
                id: OrderId::new(),
                order_type: OrderType::Food,
                items: vec![],
                processed: None,
            },
            waiter: Reference::Id(UserId::new("W1")),
            table_number: TableNumber::new(4),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["tableNumber"], 4);
        assert_eq!(json["waiter"], "W1");
        assert_eq!(json["order"]["type"], "food");
    }
}
