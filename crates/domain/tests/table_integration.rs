//! Integration tests for the table lifecycle.
//!
//! These tests drive the lifecycle manager and query engine against the
//! in-memory store, including concurrent writers and store failures.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, TableNumber};
use domain::{
    Actor, Aggregate, AppendOrder, CloseService, DomainError, ErrorKind, InMemoryDirectory,
    InMemoryNotifier, ItemPatch, LifecycleManager, NewItem, NewOrder, OrderPatch, OrderQuery,
    OrderQueryResult, OrderType, PatchOrder, QueryEngine, RemoveOrder, Table,
};
use table_store::{
    InMemoryTableStore, SaveOptions, TableDocument, TableStore, TableStoreError,
    TimeoutTableStore, Version,
};

type Manager<S> = LifecycleManager<S>;

fn waiter() -> Actor {
    Actor::waiter("W1")
}

fn cook() -> Actor {
    Actor::cook("C1")
}

fn desk() -> Actor {
    Actor::cash_desk("D1")
}

fn order(order_type: OrderType, item: &str, quantity: u32) -> NewOrder {
    NewOrder::new(order_type, vec![NewItem::new(item, quantity)])
}

fn create_manager() -> (Manager<InMemoryTableStore>, InMemoryTableStore, InMemoryNotifier) {
    let store = InMemoryTableStore::new();
    let notifier = InMemoryNotifier::new();
    let manager = LifecycleManager::new(store.clone(), Arc::new(notifier.clone()));
    (manager, store, notifier)
}

async fn seat<S: TableStore>(manager: &Manager<S>, number: u32) -> (TableNumber, OrderId) {
    let number = TableNumber::new(number);
    manager.create_table(&desk(), number).await.unwrap();
    let result = manager
        .append_order(
            &waiter(),
            AppendOrder::new(number, order(OrderType::Food, "X", 2), 2),
        )
        .await
        .unwrap();
    let order_id = result.aggregate.services()[0].orders()[0].id();
    (number, order_id)
}

fn assert_single_open_service(table: &Table) {
    assert!(table.open_service_count() <= 1);
    if table.open_service_count() == 1 {
        assert!(!table.services().last().unwrap().is_done());
    }
}

mod service_lifecycle {
    use super::*;

    #[tokio::test]
    async fn first_order_opens_service() {
        let (manager, _, _) = create_manager();
        let (number, _) = seat(&manager, 5).await;

        let table = manager.get_table(number).await.unwrap();
        assert!(table.is_busy());
        assert_eq!(table.services().len(), 1);
        let service = &table.services()[0];
        assert_eq!(service.covers(), 2);
        assert_eq!(service.waiter().as_str(), "W1");
        assert_eq!(service.orders().len(), 1);
        assert!(!service.is_done());
        assert_eq!(table.version(), Version::new(2));
        assert_single_open_service(&table);
    }

    #[tokio::test]
    async fn append_to_open_service_reuses_it() {
        let (manager, _, _) = create_manager();
        let (number, _) = seat(&manager, 5).await;

        let result = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Beverage, "water", 1), 0),
            )
            .await
            .unwrap();

        assert_eq!(result.aggregate.services().len(), 1);
        assert_eq!(result.aggregate.services()[0].orders().len(), 2);
    }

    #[tokio::test]
    async fn append_after_close_opens_new_service() {
        let (manager, _, _) = create_manager();
        let (number, _) = seat(&manager, 5).await;
        manager
            .close_service(&desk(), CloseService::new(number))
            .await
            .unwrap();

        let result = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Food, "Y", 1), 4),
            )
            .await
            .unwrap();

        let table = result.aggregate;
        assert_eq!(table.services().len(), 2);
        assert!(table.services()[0].is_done());
        assert_eq!(table.services()[1].covers(), 4);
        assert_single_open_service(&table);
    }

    #[tokio::test]
    async fn invalid_order_is_validation_error() {
        let (manager, store, _) = create_manager();
        let (number, _) = seat(&manager, 5).await;
        let before = store.get(number).await.unwrap().unwrap().version;

        let err = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Food, "X", 0), 1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let after = store.get(number).await.unwrap().unwrap().version;
        assert_eq!(before, after);
    }
}

mod order_updates {
    use super::*;

    #[tokio::test]
    async fn processed_toggle_returns_to_null() {
        let (manager, _, _) = create_manager();
        let (number, order_id) = seat(&manager, 5).await;

        let result = manager
            .patch_order(
                &cook(),
                PatchOrder::new(number, order_id, OrderPatch::new().processed(true)),
            )
            .await
            .unwrap();
        let processed = result.aggregate.find_order(order_id).unwrap().processed();
        assert!(processed.is_some_and(|at| at.timestamp() > 0));

        let result = manager
            .patch_order(
                &cook(),
                PatchOrder::new(number, order_id, OrderPatch::new().processed(false)),
            )
            .await
            .unwrap();
        assert_eq!(
            result.aggregate.find_order(order_id).unwrap().processed(),
            None
        );
    }

    #[tokio::test]
    async fn item_patches_merge_preparation_fields() {
        let (manager, _, _) = create_manager();
        let (number, order_id) = seat(&manager, 5).await;
        let table = manager.get_table(number).await.unwrap();
        let item_id = table.find_order(order_id).unwrap().items()[0].id();
        let start = chrono::Utc::now();

        manager
            .patch_order(
                &cook(),
                PatchOrder::new(
                    number,
                    order_id,
                    OrderPatch::new().with_items(vec![ItemPatch::new(item_id).cook("C1").start(start)]),
                ),
            )
            .await
            .unwrap();

        let table = manager.get_table(number).await.unwrap();
        let item = &table.find_order(order_id).unwrap().items()[0];
        assert_eq!(item.cook().map(|c| c.as_str()), Some("C1"));
        assert_eq!(item.start(), Some(start));
        assert_eq!(item.end(), None);
        assert_eq!(item.quantity(), 2);
    }

    #[tokio::test]
    async fn closed_service_rejects_updates_and_removal() {
        let (manager, _, _) = create_manager();
        let (number, order_id) = seat(&manager, 5).await;
        manager
            .close_service(&desk(), CloseService::new(number))
            .await
            .unwrap();

        for flag in [true, false] {
            let err = manager
                .patch_order(
                    &cook(),
                    PatchOrder::new(number, order_id, OrderPatch::new().processed(flag)),
                )
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidState);
        }

        let err = manager
            .remove_order(&waiter(), RemoveOrder::new(number, order_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn patch_on_table_without_services_is_not_found() {
        let (manager, _, _) = create_manager();
        let number = TableNumber::new(8);
        manager.create_table(&desk(), number).await.unwrap();

        let err = manager
            .patch_order(
                &cook(),
                PatchOrder::new(number, OrderId::new(), OrderPatch::new().processed(true)),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_order_empties_service() {
        let (manager, _, _) = create_manager();
        let (number, order_id) = seat(&manager, 5).await;

        let result = manager
            .remove_order(&waiter(), RemoveOrder::new(number, order_id))
            .await
            .unwrap();
        assert!(result.aggregate.services()[0].orders().is_empty());
    }
}

mod notifications {
    use super::*;

    #[tokio::test]
    async fn notifier_invoked_once_with_waiter() {
        let (manager, _, notifier) = create_manager();
        let (number, order_id) = seat(&manager, 5).await;

        manager
            .patch_order(
                &cook(),
                PatchOrder::new(number, order_id, OrderPatch::new().processed(true)),
            )
            .await
            .unwrap();

        assert!(notifier.wait_for_emitted(1, Duration::from_secs(1)).await);
        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].to.as_str(), "W1");
        assert_eq!(
            notices[0].message,
            "One order for table number 5 is ready to be served"
        );
    }

    #[tokio::test]
    async fn marking_processed_twice_alerts_twice() {
        let (manager, _, notifier) = create_manager();
        let (number, order_id) = seat(&manager, 5).await;
        let mark = || PatchOrder::new(number, order_id, OrderPatch::new().processed(true));

        let first = manager.patch_order(&cook(), mark()).await.unwrap();
        assert!(notifier.wait_for_emitted(1, Duration::from_secs(1)).await);
        let processed_at = first.aggregate.find_order(order_id).unwrap().processed();
        assert!(processed_at.is_some());

        let second = manager.patch_order(&cook(), mark()).await.unwrap();
        assert_eq!(second.events.len(), 1);
        assert_eq!(
            second.aggregate.find_order(order_id).unwrap().processed(),
            processed_at
        );

        assert!(notifier.wait_for_emitted(2, Duration::from_secs(1)).await);
        let notices = notifier.notices();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.to.as_str() == "W1"));
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_patch() {
        let (manager, _, notifier) = create_manager();
        notifier.set_fail(true);
        let (number, order_id) = seat(&manager, 5).await;

        let result = manager
            .patch_order(
                &cook(),
                PatchOrder::new(number, order_id, OrderPatch::new().processed(true)),
            )
            .await;
        assert!(result.is_ok());

        let table = manager.get_table(number).await.unwrap();
        assert!(table.find_order(order_id).unwrap().is_processed());
    }
}

mod concurrency {
    use super::*;
    use futures_util::future::join_all;

    /// Store whose saves always lose the version race.
    struct AlwaysStale {
        inner: InMemoryTableStore,
    }

    #[async_trait]
    impl TableStore for AlwaysStale {
        async fn insert(&self, document: TableDocument) -> table_store::Result<Version> {
            self.inner.insert(document).await
        }

        async fn get(
            &self,
            number: TableNumber,
        ) -> table_store::Result<Option<TableDocument>> {
            self.inner.get(number).await
        }

        async fn save(
            &self,
            document: TableDocument,
            options: SaveOptions,
        ) -> table_store::Result<Version> {
            let expected = options.expected_version.unwrap_or_default();
            Err(TableStoreError::ConcurrencyConflict {
                table_number: document.number,
                expected,
                actual: expected.next(),
            })
        }

        async fn list(&self) -> table_store::Result<Vec<TableDocument>> {
            self.inner.list().await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_never_lose_orders() {
        let store = InMemoryTableStore::new();
        let manager = Arc::new(
            LifecycleManager::new(store.clone(), Arc::new(InMemoryNotifier::new()))
                .with_max_attempts(100),
        );
        let number = TableNumber::new(1);
        manager.create_table(&desk(), number).await.unwrap();

        let tasks = (0..16).map(|i| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                manager
                    .append_order(
                        &Actor::waiter(format!("W{i}")),
                        AppendOrder::new(number, order(OrderType::Food, "X", 1), 2),
                    )
                    .await
            })
        });
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        let table = manager.get_table(number).await.unwrap();
        assert_eq!(table.services().len(), 1);
        assert_eq!(table.services()[0].orders().len(), 16);
        assert_single_open_service(&table);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_conflict() {
        let inner = InMemoryTableStore::new();
        let manager = LifecycleManager::new(
            AlwaysStale {
                inner: inner.clone(),
            },
            Arc::new(InMemoryNotifier::new()),
        );
        let number = TableNumber::new(2);
        manager.create_table(&desk(), number).await.unwrap();

        let err = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Food, "X", 1), 1),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DomainError::WriteConflict { attempts: 3, .. }
        ));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            inner.get(number).await.unwrap().unwrap().version,
            Version::first()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_back_off_between_attempts() {
        let inner = InMemoryTableStore::new();
        let manager = LifecycleManager::new(
            AlwaysStale {
                inner: inner.clone(),
            },
            Arc::new(InMemoryNotifier::new()),
        )
        .with_retry_backoff(Duration::from_secs(1));
        let number = TableNumber::new(6);
        manager.create_table(&desk(), number).await.unwrap();

        let started = tokio::time::Instant::now();
        let err = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Food, "X", 1), 1),
            )
            .await
            .unwrap_err();
        let waited = started.elapsed();

        assert!(matches!(err, DomainError::WriteConflict { attempts: 3, .. }));
        // Two waits: 1s and 2s, each with up to 1s of jitter.
        assert!(waited >= Duration::from_secs(3), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(5), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn store_timeout_is_persistence_error() {
        let inner = InMemoryTableStore::new();
        let store = TimeoutTableStore::new(inner.clone(), Duration::from_millis(50));
        let manager = LifecycleManager::new(store, Arc::new(InMemoryNotifier::new()));
        let number = TableNumber::new(3);
        manager.create_table(&desk(), number).await.unwrap();

        inner.set_save_delay(Some(Duration::from_secs(10)));
        let err = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Food, "X", 1), 1),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[tokio::test]
    async fn store_failure_leaves_table_untouched() {
        let (manager, store, _) = create_manager();
        let (number, _) = seat(&manager, 4).await;
        store.set_fail_on_save(true);

        let err = manager
            .append_order(
                &waiter(),
                AppendOrder::new(number, order(OrderType::Food, "Y", 1), 1),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);

        store.set_fail_on_save(false);
        let table = manager.get_table(number).await.unwrap();
        assert_eq!(table.services()[0].orders().len(), 1);
    }
}

mod queries {
    use super::*;

    async fn populated_store() -> InMemoryTableStore {
        let (manager, store, _) = create_manager();
        let (five, _) = seat(&manager, 5).await;
        manager
            .append_order(
                &waiter(),
                AppendOrder::new(five, order(OrderType::Beverage, "wine", 1), 0),
            )
            .await
            .unwrap();
        manager
            .close_service(&desk(), CloseService::new(five))
            .await
            .unwrap();

        let (two, _) = seat(&manager, 2).await;
        manager
            .append_order(
                &Actor::waiter("W2"),
                AppendOrder::new(two, order(OrderType::Beverage, "beer", 1), 0),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn beverage_filter_returns_only_beverages() {
        let engine = QueryEngine::new(populated_store().await);
        let result = engine
            .query_orders(&cook(), OrderQuery::new().order_type(OrderType::Beverage))
            .await
            .unwrap();

        let orders = result.orders();
        assert_eq!(orders.len(), 2);
        assert!(orders.iter().all(|o| o.order_type == OrderType::Beverage));
    }

    #[tokio::test]
    async fn service_done_excludes_open_services() {
        let engine = QueryEngine::new(populated_store().await);
        let result = engine
            .query_orders(&waiter(), OrderQuery::new().service_done(true))
            .await
            .unwrap();

        let OrderQueryResult::Many { orders, rich_info } = result else {
            panic!("expected a list result");
        };
        assert_eq!(orders.len(), 2);
        assert!(
            rich_info
                .iter()
                .all(|info| info.table_number == TableNumber::new(5))
        );
    }

    #[tokio::test]
    async fn tables_are_walked_in_ascending_order() {
        let engine = QueryEngine::new(populated_store().await);
        let result = engine
            .query_orders(&waiter(), OrderQuery::new())
            .await
            .unwrap();

        let OrderQueryResult::Many { rich_info, .. } = result else {
            panic!("expected a list result");
        };
        let numbers: Vec<u32> = rich_info.iter().map(|i| i.table_number.get()).collect();
        assert_eq!(numbers, vec![2, 2, 5, 5]);
    }

    #[tokio::test]
    async fn unknown_table_is_empty() {
        let engine = QueryEngine::new(populated_store().await);
        let result = engine
            .query_orders(&waiter(), OrderQuery::new().table(TableNumber::new(99)))
            .await
            .unwrap();
        assert!(result.orders().is_empty());
    }

    #[tokio::test]
    async fn order_id_narrows_to_single_result() {
        let store = populated_store().await;
        let table = QueryEngine::new(store.clone())
            .query_orders(&waiter(), OrderQuery::new().table(TableNumber::new(2)))
            .await
            .unwrap();
        let wanted = table.orders()[1].id;

        let engine = QueryEngine::new(store);
        let result = engine
            .query_orders(&waiter(), OrderQuery::new().order_id(wanted))
            .await
            .unwrap();
        let OrderQueryResult::Single { order, rich_info } = result else {
            panic!("expected a single result");
        };
        assert_eq!(order.id, wanted);
        assert_eq!(rich_info.table_number, TableNumber::new(2));

        let err = engine
            .query_orders(&waiter(), OrderQuery::new().order_id(OrderId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn populate_requires_a_directory() {
        let store = populated_store().await;
        let err = QueryEngine::new(store.clone())
            .query_orders(&cook(), OrderQuery::new().populate(true))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::DirectoryUnavailable));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let directory = InMemoryDirectory::from_json(
            r#"{
                "staff": [{ "id": "W1", "username": "walter", "role": "waiter" }],
                "menuItems": [{ "id": "X", "name": "Carbonara" }]
            }"#,
        )
        .unwrap();
        let result = QueryEngine::new(store)
            .with_directory(Arc::new(directory))
            .query_orders(
                &cook(),
                OrderQuery::new().table(TableNumber::new(2)).populate(true),
            )
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["richInfo"][0]["waiter"]["username"], "walter");
        assert_eq!(json["orders"][0]["items"][0]["item"]["name"], "Carbonara");
        // Menu items missing from the directory stay bare ids.
        assert_eq!(json["orders"][1]["items"][0]["item"], "beer");
    }
}
