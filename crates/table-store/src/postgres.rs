use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Result, TableDocument, TableNumber, TableStoreError, Version,
    store::{SaveOptions, TableStore},
};

/// PostgreSQL-backed table store implementation.
///
/// Each table is one row holding the JSONB document and its version.
/// Conditional saves are a single `UPDATE ... WHERE version = $n`, so the
/// version check and the write are atomic.
#[derive(Clone)]
pub struct PostgresTableStore {
    pool: PgPool,
}

impl PostgresTableStore {
    /// Creates a new PostgreSQL table store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database and applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        let store = Self::new(pool);
        store.run_migrations().await?;
        Ok(store)
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_document(row: PgRow) -> Result<TableDocument> {
        let number: i32 = row.try_get("number")?;
        Ok(TableDocument {
            number: TableNumber::new(number as u32),
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
            state: row.try_get("state")?,
        })
    }
}

#[async_trait]
impl TableStore for PostgresTableStore {
    async fn insert(&self, document: TableDocument) -> Result<Version> {
        let result = sqlx::query(
            r#"
            INSERT INTO dining_tables (number, version, updated_at, state)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (number) DO NOTHING
            "#,
        )
        .bind(document.number.as_i32())
        .bind(Version::first().as_i64())
        .bind(Utc::now())
        .bind(&document.state)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TableStoreError::TableAlreadyExists(document.number));
        }

        Ok(Version::first())
    }

    async fn get(&self, number: TableNumber) -> Result<Option<TableDocument>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT number, version, updated_at, state
            FROM dining_tables
            WHERE number = $1
            "#,
        )
        .bind(number.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn save(&self, document: TableDocument, options: SaveOptions) -> Result<Version> {
        let number = document.number;

        let new_version: Option<i64> = match options.expected_version {
            Some(expected) => {
                sqlx::query_scalar(
                    r#"
                    UPDATE dining_tables
                    SET version = version + 1, updated_at = $3, state = $4
                    WHERE number = $1 AND version = $2
                    RETURNING version
                    "#,
                )
                .bind(number.as_i32())
                .bind(expected.as_i64())
                .bind(Utc::now())
                .bind(&document.state)
                .fetch_optional(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    UPDATE dining_tables
                    SET version = version + 1, updated_at = $2, state = $3
                    WHERE number = $1
                    RETURNING version
                    "#,
                )
                .bind(number.as_i32())
                .bind(Utc::now())
                .bind(&document.state)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        if let Some(version) = new_version {
            return Ok(Version::new(version));
        }

        // Nothing updated: either the row is gone or its version moved on.
        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM dining_tables WHERE number = $1")
                .bind(number.as_i32())
                .fetch_optional(&self.pool)
                .await?;

        match (actual, options.expected_version) {
            (Some(actual), Some(expected)) => Err(TableStoreError::ConcurrencyConflict {
                table_number: number,
                expected,
                actual: Version::new(actual),
            }),
            _ => Err(TableStoreError::TableNotFound(number)),
        }
    }

    async fn list(&self) -> Result<Vec<TableDocument>> {
        let rows = sqlx::query(
            r#"
            SELECT number, version, updated_at, state
            FROM dining_tables
            ORDER BY number ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_document).collect()
    }
}
