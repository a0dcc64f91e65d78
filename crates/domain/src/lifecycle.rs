//! Lifecycle manager providing the order operations staff perform at a table.

use std::sync::Arc;
use std::time::Duration;

use common::TableNumber;
use table_store::TableStore;

use crate::access::{Actor, Capability};
use crate::command::{Command, CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::notify::{NotificationRelay, Notifier};
use crate::table::{AppendOrder, CloseService, PatchOrder, RemoveOrder, Table};

/// Service for managing tables and their orders.
///
/// Every operation checks the actor's role first, then runs through the
/// command handler so concurrent writers on one table are serialized by
/// version. Committed `OrderProcessed` events are handed to the
/// notification relay.
pub struct LifecycleManager<S: TableStore> {
    handler: CommandHandler<S, Table>,
    relay: NotificationRelay,
}

impl<S: TableStore> LifecycleManager<S> {
    /// Creates a new lifecycle manager over the given store.
    pub fn new(store: S, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            handler: CommandHandler::new(store),
            relay: NotificationRelay::new(notifier),
        }
    }

    /// Sets how many attempts a write gets before failing with a conflict.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.handler = self.handler.with_max_attempts(attempts);
        self
    }

    /// Sets the base delay between write attempts that lost a version race.
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.handler = self.handler.with_retry_backoff(base);
        self
    }

    /// Sets the bound on each notice delivery.
    pub fn with_notify_timeout(mut self, timeout: Duration) -> Self {
        self.relay = self.relay.with_timeout(timeout);
        self
    }

    pub fn relay(&self) -> &NotificationRelay {
        &self.relay
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, Table> {
        &self.handler
    }

    /// Registers a new, empty table.
    #[tracing::instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn create_table(
        &self,
        actor: &Actor,
        number: TableNumber,
    ) -> Result<Table, DomainError> {
        actor.authorize(Capability::ManageTables)?;
        let table = self.handler.create(Table::new(number)).await?;
        tracing::info!(table_number = %number, "table created");
        Ok(table)
    }

    /// Loads a table by number.
    #[tracing::instrument(skip(self))]
    pub async fn get_table(&self, number: TableNumber) -> Result<Table, DomainError> {
        self.handler.load(number).await
    }

    /// Appends an order for the acting waiter.
    #[tracing::instrument(skip(self, actor, cmd), fields(actor = %actor.id, table_number = %cmd.table_number))]
    pub async fn append_order(
        &self,
        actor: &Actor,
        cmd: AppendOrder,
    ) -> Result<CommandResult<Table>, DomainError> {
        actor.authorize(Capability::PlaceOrder)?;
        let key = cmd.key();
        let waiter = actor.id.clone();
        let order = cmd.order;
        let covers = cmd.covers;

        self.handler
            .execute(key, |table| {
                table.append_order(&waiter, order.clone(), covers)
            })
            .await
    }

    /// Updates item preparation fields and the processed mark of an order.
    ///
    /// Notices for newly processed orders are dispatched after the commit.
    #[tracing::instrument(skip(self, actor, cmd), fields(actor = %actor.id, table_number = %cmd.table_number, order_id = %cmd.order_id))]
    pub async fn patch_order(
        &self,
        actor: &Actor,
        cmd: PatchOrder,
    ) -> Result<CommandResult<Table>, DomainError> {
        actor.authorize(Capability::UpdateOrder)?;
        let order_id = cmd.order_id;
        let patch = cmd.patch;

        let result = self
            .handler
            .execute(cmd.table_number, |table| {
                table.patch_order(order_id, &patch, &actor.id)
            })
            .await?;

        self.relay.publish(cmd.table_number, &result.events);
        Ok(result)
    }

    /// Removes an order from the active service.
    #[tracing::instrument(skip(self, actor, cmd), fields(actor = %actor.id, table_number = %cmd.table_number, order_id = %cmd.order_id))]
    pub async fn remove_order(
        &self,
        actor: &Actor,
        cmd: RemoveOrder,
    ) -> Result<CommandResult<Table>, DomainError> {
        actor.authorize(Capability::RemoveOrder)?;
        let order_id = cmd.order_id;

        self.handler
            .execute(cmd.table_number, |table| table.remove_order(order_id))
            .await
    }

    /// Closes the active service of a table.
    ///
    /// Billing drives this transition; it has no HTTP route.
    #[tracing::instrument(skip(self, actor, cmd), fields(actor = %actor.id, table_number = %cmd.table_number))]
    pub async fn close_service(
        &self,
        actor: &Actor,
        cmd: CloseService,
    ) -> Result<CommandResult<Table>, DomainError> {
        actor.authorize(Capability::ManageTables)?;

        self.handler
            .execute(cmd.key(), |table| table.close_active_service())
            .await
    }
}
