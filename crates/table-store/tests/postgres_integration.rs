//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p table-store --test postgres_integration
//! ```

use std::sync::Arc;

use serial_test::serial;
use sqlx::PgPool;
use table_store::{
    PostgresTableStore, SaveOptions, TableDocument, TableNumber, TableStore, TableStoreError,
    TableStoreExt, Version,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_dining_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and an empty table
async fn get_test_store() -> PostgresTableStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE dining_tables")
        .execute(&pool)
        .await
        .unwrap();

    PostgresTableStore::new(pool)
}

fn empty_table(number: u32) -> TableDocument {
    TableDocument::new(
        TableNumber::new(number),
        serde_json::json!({ "number": number, "busy": false, "services": [] }),
    )
}

#[tokio::test]
#[serial]
async fn insert_and_get_table() {
    let store = get_test_store().await;

    let version = store.insert(empty_table(5)).await.unwrap();
    assert_eq!(version, Version::first());

    let doc = store.get(TableNumber::new(5)).await.unwrap().unwrap();
    assert_eq!(doc.number, TableNumber::new(5));
    assert_eq!(doc.version, Version::first());
    assert_eq!(doc.state["busy"], false);
}

#[tokio::test]
#[serial]
async fn duplicate_insert_is_rejected() {
    let store = get_test_store().await;
    store.insert(empty_table(5)).await.unwrap();

    let result = store.insert(empty_table(5)).await;
    assert!(matches!(result, Err(TableStoreError::TableAlreadyExists(_))));
}

#[tokio::test]
#[serial]
async fn conditional_save_bumps_version() {
    let store = get_test_store().await;
    store.insert(empty_table(1)).await.unwrap();

    let mut doc = store.get(TableNumber::new(1)).await.unwrap().unwrap();
    doc.state["busy"] = serde_json::json!(true);
    let version = store
        .save(doc, SaveOptions::expect_version(Version::first()))
        .await
        .unwrap();
    assert_eq!(version, Version::new(2));

    let stored = store.get(TableNumber::new(1)).await.unwrap().unwrap();
    assert_eq!(stored.state["busy"], true);
    assert_eq!(stored.version, Version::new(2));
}

#[tokio::test]
#[serial]
async fn stale_save_reports_conflict() {
    let store = get_test_store().await;
    store.insert(empty_table(1)).await.unwrap();

    let first = store.get(TableNumber::new(1)).await.unwrap().unwrap();
    let second = first.clone();

    store
        .save(first, SaveOptions::expect_version(Version::first()))
        .await
        .unwrap();
    let result = store
        .save(second, SaveOptions::expect_version(Version::first()))
        .await;

    match result {
        Err(TableStoreError::ConcurrencyConflict {
            expected, actual, ..
        }) => {
            assert_eq!(expected, Version::first());
            assert_eq!(actual, Version::new(2));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn save_missing_table_reports_not_found() {
    let store = get_test_store().await;

    let result = store
        .save(empty_table(42), SaveOptions::expect_version(Version::first()))
        .await;
    assert!(matches!(result, Err(TableStoreError::TableNotFound(_))));
}

#[tokio::test]
#[serial]
async fn list_returns_tables_in_number_order() {
    let store = get_test_store().await;
    for n in [9, 3, 6] {
        store.insert(empty_table(n)).await.unwrap();
    }

    let numbers: Vec<u32> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.number.get())
        .collect();
    assert_eq!(numbers, vec![3, 6, 9]);
    assert!(store.table_exists(TableNumber::new(6)).await.unwrap());
}
