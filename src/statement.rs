use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::client::SpannerDatabase;
use crate::error::SqlMiddlewareDbError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Execution state of a prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    /// Not executed yet.
    Pending,
    /// Executed at least once.
    Executed,
}

struct StatementInner {
    params: Vec<RowValues>,
    state: StatementState,
    result: Option<ResultSet>,
}

/// Statement bound to its SQL text and to the database it runs against.
///
/// Instances are shared through [`StatementCache`]: every `prepare` of the same text hands
/// out the same `Arc`, so parameters bound by one caller are visible to the next.
pub struct SpannerStatement<D: SpannerDatabase> {
    database: Arc<D>,
    sql: String,
    inner: Mutex<StatementInner>,
}

impl<D: SpannerDatabase> fmt::Debug for SpannerStatement<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpannerStatement")
            .field("database", &self.database.name())
            .field("sql", &self.sql)
            .finish_non_exhaustive()
    }
}

impl<D: SpannerDatabase> SpannerStatement<D> {
    #[must_use]
    pub fn new(database: Arc<D>, sql: impl Into<String>) -> Self {
        Self {
            database,
            sql: sql.into(),
            inner: Mutex::new(StatementInner {
                params: Vec::new(),
                state: StatementState::Pending,
                result: None,
            }),
        }
    }

    /// The SQL text this statement was prepared from.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Replace the parameters used by the next [`execute`](Self::execute).
    ///
    /// # Arguments
    ///
    /// * `params` - Positional values passed to `execute_sql`
    pub async fn bind(&self, params: Vec<RowValues>) {
        self.inner.lock().await.params = params;
    }

    pub async fn state(&self) -> StatementState {
        self.inner.lock().await.state
    }

    /// Run the statement with its bound parameters and keep the rows.
    ///
    /// # Returns
    ///
    /// The number of rows in the result
    ///
    /// # Errors
    /// Returns the remote error unchanged; the previous result, if any, is kept.
    pub async fn execute(&self) -> Result<usize, SqlMiddlewareDbError> {
        let mut inner = self.inner.lock().await;
        let result = self.database.execute_sql(&self.sql, &inner.params).await?;
        let rows = result.rows_affected;
        inner.result = Some(result);
        inner.state = StatementState::Executed;
        tracing::debug!(sql = %self.sql, rows, "statement executed");
        Ok(rows)
    }

    /// Rows from the last successful execution.
    pub async fn result(&self) -> Option<ResultSet> {
        self.inner.lock().await.result.clone()
    }

    /// Row count of the last successful execution.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ExecutionError` if the statement has not run yet.
    pub async fn rows_affected(&self) -> Result<usize, SqlMiddlewareDbError> {
        self.inner
            .lock()
            .await
            .result
            .as_ref()
            .map(|rs| rs.rows_affected)
            .ok_or_else(|| {
                SqlMiddlewareDbError::ExecutionError(format!(
                    "statement has not been executed: {}",
                    self.sql
                ))
            })
    }
}

/// Prepared statements keyed by their exact SQL text. Entries are never evicted.
pub struct StatementCache<D: SpannerDatabase> {
    statements: HashMap<String, Arc<SpannerStatement<D>>>,
}

impl<D: SpannerDatabase> Default for StatementCache<D> {
    fn default() -> Self {
        Self {
            statements: HashMap::new(),
        }
    }
}

impl<D: SpannerDatabase> fmt::Debug for StatementCache<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementCache")
            .field("statements", &self.statements.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<D: SpannerDatabase> StatementCache<D> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached statement for `sql`, creating it with `make` on a miss.
    ///
    /// An existing entry is never replaced, so every call with the same text returns the
    /// same `Arc`.
    ///
    /// # Arguments
    ///
    /// * `sql` - Exact statement text used as the key
    /// * `make` - Builds the statement when `sql` is not cached yet
    ///
    /// # Returns
    ///
    /// The shared statement for `sql`
    pub fn get_or_insert_with<F>(&mut self, sql: &str, make: F) -> Arc<SpannerStatement<D>>
    where
        F: FnOnce() -> SpannerStatement<D>,
    {
        if let Some(stmt) = self.statements.get(sql) {
            tracing::trace!(sql, "statement cache hit");
            return Arc::clone(stmt);
        }
        tracing::debug!(sql, "preparing statement");
        let stmt = Arc::new(make());
        self.statements.insert(sql.to_owned(), Arc::clone(&stmt));
        stmt
    }

    #[must_use]
    pub fn contains(&self, sql: &str) -> bool {
        self.statements.contains_key(sql)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
