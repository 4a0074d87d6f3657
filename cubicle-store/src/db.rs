//! Request-scoped access to the relational store.
//!
//! [`Database`] owns the pool and applies the schema once at startup.
//! Every repository operation opens its own [`Connection`], which is a
//! transaction: writes become visible only after [`Connection::commit`], and a
//! connection dropped on any other path (validation failure, `?` early return,
//! panic) rolls back and goes back to the pool.

use std::str::FromStr;
use std::time::Duration;

use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::{FromRow, Sqlite, Transaction};

use crate::schema::SQLITE_INIT;
use crate::StoreError;

/// How long a request waits for a free pooled connection.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the SQLite pool. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if the URL is malformed, the file
    /// cannot be opened, or the schema cannot be applied.
    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        tracing::info!(%url, "database ready");
        Ok(db)
    }

    /// Open a private in-memory database.
    ///
    /// The pool holds exactly one connection that never expires, because an
    /// in-memory SQLite database lives only as long as its connection.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if the schema cannot be applied.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SQLITE_INIT).execute(&self.pool).await?;
        Ok(())
    }

    /// Acquire a connection and begin a transaction on it.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if no connection becomes available
    /// within the acquire timeout.
    pub async fn connect(&self) -> Result<Connection, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Connection { tx })
    }
}

/// One pooled connection with an open transaction.
///
/// All statements take parameterized [`sqlx::query`] / [`sqlx::query_as`]
/// values; values are bound with `.bind(..)`, never formatted into SQL.
pub struct Connection {
    tx: Transaction<'static, Sqlite>,
}

impl Connection {
    /// Run a query and map every returned row.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] on SQL or decode errors.
    pub async fn fetch_all<'q, O>(
        &mut self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Vec<O>, StoreError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        Ok(query.fetch_all(&mut *self.tx).await?)
    }

    /// Run a query expected to return at most one row.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] on SQL or decode errors.
    pub async fn fetch_optional<'q, O>(
        &mut self,
        query: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    ) -> Result<Option<O>, StoreError>
    where
        O: Send + Unpin + for<'r> FromRow<'r, SqliteRow>,
    {
        Ok(query.fetch_optional(&mut *self.tx).await?)
    }

    /// Run a write statement and return the number of affected rows.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] on SQL errors or constraint violations.
    pub async fn execute<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<u64, StoreError> {
        Ok(query.execute(&mut *self.tx).await?.rows_affected())
    }

    /// Run an `INSERT` and return the id of the new row.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] on SQL errors or constraint violations.
    pub async fn insert<'q>(
        &mut self,
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> Result<i64, StoreError> {
        Ok(query.execute(&mut *self.tx).await?.last_insert_rowid())
    }

    /// Make every write on this connection durable and release it.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] if the commit fails; the transaction
    /// is rolled back in that case.
    pub async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
