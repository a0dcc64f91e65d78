//! Domain layer for the dining service tracker.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits for document-backed entities
//! - Command trait and CommandHandler with optimistic write retries
//! - The Table aggregate with its services, orders and items
//! - LifecycleManager for order operations, guarded by staff roles
//! - QueryEngine for cross-table order views
//! - Post-commit notification of ready orders

pub mod access;
pub mod aggregate;
pub mod command;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod query;
pub mod table;

pub use access::{Actor, Capability, Role};
pub use aggregate::{Aggregate, DomainEvent};
pub use command::{
    Command, CommandHandler, CommandResult, DEFAULT_MAX_WRITE_RETRIES, DEFAULT_RETRY_BACKOFF,
};
pub use directory::{Directory, InMemoryDirectory, MenuItemSummary, StaffSummary};
pub use error::{DomainError, ErrorKind};
pub use lifecycle::LifecycleManager;
pub use notify::{
    InMemoryNotifier, NotificationRelay, Notifier, NotifyError, ORDER_PROCESSED_EVENT,
    OrderReadyNotice, TracingNotifier,
};
pub use query::{
    ItemView, OrderQuery, OrderQueryResult, OrderView, QueryEngine, Reference, RichInfo,
};
pub use table::{
    AppendOrder, CloseService, Item, ItemPatch, NewItem, NewOrder, Order, OrderPatch, OrderType,
    PatchOrder, RemoveOrder, Service, ServiceState, Table, TableError, TableEvent,
};
