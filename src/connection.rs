use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::clause::{build_set_clause, build_where_clause};
use crate::client::{SpannerDatabase, SpannerTransaction, TxFuture};
use crate::ddl::is_ddl_statement;
use crate::error::SqlMiddlewareDbError;
use crate::platform::{SpannerPlatform, SpannerValueEncoder, ValueEncoder};
use crate::statement::{SpannerStatement, StatementCache};
use crate::types::{ColumnValues, ParameterType, RowValues};

/// Result of a call that may have been skipped because it carried DDL.
///
/// `query` and `exec` both report a skipped schema change as [`StatementOutcome::SkippedDdl`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome<T> {
    Completed(T),
    SkippedDdl,
}

impl<T> StatementOutcome<T> {
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, StatementOutcome::SkippedDdl)
    }

    /// The completed value, or `None` for a skipped statement.
    pub fn completed(self) -> Option<T> {
        match self {
            StatementOutcome::Completed(value) => Some(value),
            StatementOutcome::SkippedDdl => None,
        }
    }
}

impl StatementOutcome<usize> {
    /// Rows affected, counting a skipped statement as zero.
    #[must_use]
    pub fn rows_affected(&self) -> usize {
        match self {
            StatementOutcome::Completed(rows) => *rows,
            StatementOutcome::SkippedDdl => 0,
        }
    }
}

/// Connection to one Spanner database.
///
/// Generic relational calls are rewritten here into the database's native primitives:
/// mutating SQL runs inside a single atomic transaction, inserts go through the mutation
/// API, and schema statements are not sent at all.
pub struct SpannerConnection<D: SpannerDatabase> {
    database: Arc<D>,
    statements: StatementCache<D>,
    encoder: Box<dyn ValueEncoder>,
    platform: SpannerPlatform,
    reject_unconditioned_writes: bool,
}

impl<D: SpannerDatabase> fmt::Debug for SpannerConnection<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpannerConnection")
            .field("database", &self.database.name())
            .field("statements", &self.statements)
            .field("reject_unconditioned_writes", &self.reject_unconditioned_writes)
            .finish_non_exhaustive()
    }
}

impl<D: SpannerDatabase> SpannerConnection<D> {
    #[must_use]
    pub fn new(database: D) -> Self {
        Self::from_shared(Arc::new(database))
    }

    #[must_use]
    pub fn from_shared(database: Arc<D>) -> Self {
        Self {
            database,
            statements: StatementCache::new(),
            encoder: Box::new(SpannerValueEncoder),
            platform: SpannerPlatform,
            reject_unconditioned_writes: true,
        }
    }

    /// Swap the encoder used by [`quote`](Self::quote) and the generated statements.
    #[must_use]
    pub fn with_encoder(mut self, encoder: impl ValueEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// When `false`, `update` with no identifiers sends an UPDATE with an empty condition.
    #[must_use]
    pub fn with_reject_unconditioned_writes(mut self, reject: bool) -> Self {
        self.reject_unconditioned_writes = reject;
        self
    }

    #[must_use]
    pub fn database(&self) -> &D {
        &self.database
    }

    #[must_use]
    pub fn platform(&self) -> &SpannerPlatform {
        &self.platform
    }

    #[must_use]
    pub fn statements(&self) -> &StatementCache<D> {
        &self.statements
    }

    #[must_use]
    pub fn cached_statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Statement for `sql`, reusing the cached one when the same text was prepared before.
    ///
    /// A cached statement is returned as-is, including any parameters bound to it earlier.
    pub fn prepare(&mut self, sql: &str) -> Arc<SpannerStatement<D>> {
        let database = Arc::clone(&self.database);
        self.statements
            .get_or_insert_with(sql, || SpannerStatement::new(database, sql))
    }

    /// Prepare and execute `sql`, returning the executed statement.
    ///
    /// DDL is skipped without contacting the service and without touching the cache.
    ///
    /// # Errors
    /// Returns the remote error unchanged if execution fails.
    pub async fn query(
        &mut self,
        sql: &str,
    ) -> Result<StatementOutcome<Arc<SpannerStatement<D>>>, SqlMiddlewareDbError> {
        if is_ddl_statement(sql) {
            tracing::warn!(sql, "schema change skipped; DDL is not sent to Spanner");
            return Ok(StatementOutcome::SkippedDdl);
        }

        let statement = self.prepare(sql);
        statement.execute().await?;
        Ok(StatementOutcome::Completed(statement))
    }

    /// Run `sql` as a parameterless update inside one atomic transaction.
    ///
    /// # Errors
    /// Returns the remote error unchanged if the transaction or its commit fails.
    pub async fn exec(&self, sql: &str) -> Result<StatementOutcome<usize>, SqlMiddlewareDbError> {
        if is_ddl_statement(sql) {
            // TODO: submit through a schema-change operation once long-running operation
            // polling exists.
            tracing::warn!(sql, "schema change skipped; DDL is not sent to Spanner");
            return Ok(StatementOutcome::SkippedDdl);
        }

        tracing::debug!(sql, "executing DML in transaction");
        let statement = sql.to_owned();
        let rows = self
            .database
            .run_transaction(move |txn| {
                Box::pin(async move {
                    let rows = txn.execute_update(&statement, &[]).await?;
                    txn.commit().await?;
                    Ok::<_, SqlMiddlewareDbError>(rows)
                })
            })
            .await?;
        Ok(StatementOutcome::Completed(rows))
    }

    /// Insert one row through the database's mutation API.
    ///
    /// No SQL text is built and no transaction is opened here; the mutation commits on its own.
    ///
    /// # Errors
    /// Returns the remote error unchanged.
    pub async fn insert(
        &self,
        table: &str,
        row: &ColumnValues,
    ) -> Result<NaiveDateTime, SqlMiddlewareDbError> {
        tracing::debug!(table, columns = row.len(), "inserting row");
        self.database.insert(table, row).await
    }

    /// `UPDATE <table> SET ... WHERE ...` routed through [`exec`](Self::exec).
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::EmptyCriteria` for an empty identifier map while
    /// unconditioned writes are rejected, otherwise the remote error unchanged.
    pub async fn update(
        &self,
        table: &str,
        data: &ColumnValues,
        identifiers: &ColumnValues,
    ) -> Result<usize, SqlMiddlewareDbError> {
        if identifiers.is_empty() && self.reject_unconditioned_writes {
            return Err(SqlMiddlewareDbError::EmptyCriteria);
        }

        let sql = format!(
            "UPDATE {table} SET {} WHERE {}",
            build_set_clause(data, self.encoder.as_ref()),
            build_where_clause(identifiers, self.encoder.as_ref(), &self.platform)
        );
        Ok(self.exec(&sql).await?.rows_affected())
    }

    /// `DELETE FROM <table> WHERE ...` routed through [`exec`](Self::exec).
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::EmptyCriteria` for an empty identifier map, otherwise
    /// the remote error unchanged.
    pub async fn delete(
        &self,
        table: &str,
        identifiers: &ColumnValues,
    ) -> Result<usize, SqlMiddlewareDbError> {
        if identifiers.is_empty() {
            return Err(SqlMiddlewareDbError::EmptyCriteria);
        }

        let sql = format!(
            "DELETE FROM {table} WHERE {}",
            build_where_clause(identifiers, self.encoder.as_ref(), &self.platform)
        );
        Ok(self.exec(&sql).await?.rows_affected())
    }

    /// Render `value` as a literal of the declared type.
    #[must_use]
    pub fn quote(&self, value: &RowValues, declared: ParameterType) -> String {
        self.encoder.encode(value, declared)
    }

    /// Render `value` as a literal, inferring the declared type from the value.
    #[must_use]
    pub fn quote_value(&self, value: &RowValues) -> String {
        self.encoder.encode(value, value.inferred_type())
    }

    /// Run `work` inside one atomic transaction.
    ///
    /// This is the only way to group several statements: Spanner transactions exist for the
    /// duration of the callback and cannot be opened and closed across calls.
    ///
    /// ```rust,ignore
    /// conn.transactional(|txn| {
    ///     Box::pin(async move {
    ///         let a = txn.execute_update("UPDATE a SET n = n + 1 WHERE id = 1", &[]).await?;
    ///         let b = txn.execute_update("UPDATE b SET n = n - 1 WHERE id = 1", &[]).await?;
    ///         Ok::<_, SqlMiddlewareDbError>(a + b)
    ///     })
    /// })
    /// .await?;
    /// ```
    ///
    /// # Errors
    /// Returns whatever `work` or the commit returned.
    pub async fn transactional<R, F>(&self, work: F) -> Result<R, SqlMiddlewareDbError>
    where
        F: for<'t> FnOnce(&'t mut D::Transaction) -> TxFuture<'t, R> + Send,
        R: Send,
    {
        self.database.run_transaction(work).await
    }

    /// # Errors
    /// Always returns `SqlMiddlewareDbError::Unimplemented`; Spanner has no auto-increment ids.
    pub fn last_insert_id(&self, _name: Option<&str>) -> Result<String, SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::unimplemented(
            "SpannerConnection::last_insert_id",
        ))
    }

    /// # Errors
    /// Always returns `SqlMiddlewareDbError::Unimplemented`; use [`transactional`](Self::transactional).
    pub fn begin_transaction(&mut self) -> Result<(), SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::unimplemented(
            "SpannerConnection::begin_transaction",
        ))
    }

    /// # Errors
    /// Always returns `SqlMiddlewareDbError::Unimplemented`; use [`transactional`](Self::transactional).
    pub fn commit(&mut self) -> Result<(), SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::unimplemented("SpannerConnection::commit"))
    }

    /// # Errors
    /// Always returns `SqlMiddlewareDbError::Unimplemented`; use [`transactional`](Self::transactional).
    pub fn roll_back(&mut self) -> Result<(), SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::unimplemented(
            "SpannerConnection::roll_back",
        ))
    }

    /// # Errors
    /// Always returns `SqlMiddlewareDbError::Unimplemented`.
    pub fn error_code(&self) -> Result<Option<String>, SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::unimplemented(
            "SpannerConnection::error_code",
        ))
    }

    /// # Errors
    /// Always returns `SqlMiddlewareDbError::Unimplemented`.
    pub fn error_info(&self) -> Result<Vec<String>, SqlMiddlewareDbError> {
        Err(SqlMiddlewareDbError::unimplemented(
            "SpannerConnection::error_info",
        ))
    }
}
