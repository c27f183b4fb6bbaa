//! Seams to the native Spanner client.
//!
//! The middleware never talks to the network itself. Everything it needs from the service is
//! expressed by the traits below and supplied by the caller (a gRPC client in production, the
//! recording doubles in `test_utils` for tests).

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::config::Credentials;
use crate::error::SqlMiddlewareDbError;
use crate::results::ResultSet;
use crate::types::{ColumnValues, RowValues};

/// Future returned by a unit of work running inside [`SpannerDatabase::run_transaction`].
pub type TxFuture<'t, R> =
    Pin<Box<dyn Future<Output = Result<R, SqlMiddlewareDbError>> + Send + 't>>;

/// Read/write transaction handed to a unit of work.
#[async_trait]
pub trait SpannerTransaction: Send {
    /// Execute a DML statement and return the number of rows it touched.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::RemoteExecution` when the service rejects the statement.
    async fn execute_update(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlMiddlewareDbError>;

    /// Commit the transaction.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::RemoteExecution` when the commit is aborted or fails.
    async fn commit(&mut self) -> Result<(), SqlMiddlewareDbError>;
}

/// Handle to a single Spanner database.
#[async_trait]
pub trait SpannerDatabase: Send + Sync + 'static {
    type Transaction: SpannerTransaction;

    /// Database name as selected on the instance.
    fn name(&self) -> &str;

    /// Run `work` inside an atomic read/write transaction.
    ///
    /// The work may commit the transaction itself; if it returns normally without doing so
    /// the implementation commits before returning. Errors from the work or from the commit
    /// are surfaced unchanged and the transaction is rolled back.
    ///
    /// # Errors
    /// Returns whatever `work` or the commit returned.
    async fn run_transaction<R, F>(&self, work: F) -> Result<R, SqlMiddlewareDbError>
    where
        F: for<'t> FnOnce(&'t mut Self::Transaction) -> TxFuture<'t, R> + Send,
        R: Send;

    /// Insert one row through the mutation API and return the commit timestamp.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::RemoteExecution` when the mutation fails.
    async fn insert(
        &self,
        table: &str,
        row: &ColumnValues,
    ) -> Result<NaiveDateTime, SqlMiddlewareDbError>;

    /// Execute a query and return its rows.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::RemoteExecution` when the query fails.
    async fn execute_sql(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlMiddlewareDbError>;
}

/// Authenticated client able to look up instances and databases.
#[async_trait]
pub trait SpannerClient: Send + Sync {
    type Database: SpannerDatabase;

    /// # Errors
    /// Returns `SqlMiddlewareDbError::RemoteExecution` when the lookup itself fails.
    async fn instance_exists(&self, instance: &str) -> Result<bool, SqlMiddlewareDbError>;

    /// Database names on `instance`, either bare or fully qualified
    /// (`projects/<p>/instances/<i>/databases/<d>`).
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::RemoteExecution` when the listing fails.
    async fn list_databases(&self, instance: &str) -> Result<Vec<String>, SqlMiddlewareDbError>;

    /// Handle to `database` on `instance`. No existence check is made here.
    fn database(&self, instance: &str, database: &str) -> Self::Database;
}

/// Builds a [`SpannerClient`] from credentials.
pub trait SpannerClientFactory: Send + Sync {
    type Client: SpannerClient;

    /// # Errors
    /// Returns an error when the credentials are rejected or the client cannot be built.
    fn create(&self, credentials: &Credentials) -> Result<Self::Client, SqlMiddlewareDbError>;
}
