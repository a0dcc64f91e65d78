//! Table commands.

use common::{OrderId, TableNumber};

use crate::command::Command;

use super::{NewOrder, OrderPatch, Table};

/// Command to append an order to a table, opening a service if needed.
#[derive(Debug, Clone)]
pub struct AppendOrder {
    pub table_number: TableNumber,

    /// The order as submitted.
    pub order: NewOrder,

    /// Number of guests, used only when a new service is opened.
    /// Zero means "use the number of items".
    pub covers: u32,
}

impl AppendOrder {
    pub fn new(table_number: TableNumber, order: NewOrder, covers: u32) -> Self {
        Self {
            table_number,
            order,
            covers,
        }
    }
}

impl Command for AppendOrder {
    type Aggregate = Table;

    fn key(&self) -> TableNumber {
        self.table_number
    }
}

/// Command to update items and the processed mark of an order.
#[derive(Debug, Clone)]
pub struct PatchOrder {
    pub table_number: TableNumber,
    pub order_id: OrderId,
    pub patch: OrderPatch,
}

impl PatchOrder {
    pub fn new(table_number: TableNumber, order_id: OrderId, patch: OrderPatch) -> Self {
        Self {
            table_number,
            order_id,
            patch,
        }
    }
}

impl Command for PatchOrder {
    type Aggregate = Table;

    fn key(&self) -> TableNumber {
        self.table_number
    }
}

/// Command to remove an order from the active service.
#[derive(Debug, Clone)]
pub struct RemoveOrder {
    pub table_number: TableNumber,
    pub order_id: OrderId,
}

impl RemoveOrder {
    pub fn new(table_number: TableNumber, order_id: OrderId) -> Self {
        Self {
            table_number,
            order_id,
        }
    }
}

impl Command for RemoveOrder {
    type Aggregate = Table;

    fn key(&self) -> TableNumber {
        self.table_number
    }
}

/// Command to close the active service of a table.
#[derive(Debug, Clone)]
pub struct CloseService {
    pub table_number: TableNumber,
}

impl CloseService {
    pub fn new(table_number: TableNumber) -> Self {
        Self { table_number }
    }
}

impl Command for CloseService {
    type Aggregate = Table;

    fn key(&self) -> TableNumber {
        self.table_number
    }
}
