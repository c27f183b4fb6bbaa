//! In-memory stand-ins for the Spanner client traits.
//!
//! Every call is recorded so tests can assert exactly which SQL text, mutations and commits
//! reached the "service".

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};

use crate::client::{
    SpannerClient, SpannerClientFactory, SpannerDatabase, SpannerTransaction, TxFuture,
};
use crate::config::Credentials;
use crate::error::SqlMiddlewareDbError;
use crate::results::ResultSet;
use crate::types::{ColumnValues, RowValues};

/// Everything the recording database has seen.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub transactions: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub updates: Vec<String>,
    pub inserts: Vec<(String, ColumnValues)>,
    pub queries: Vec<(String, Vec<RowValues>)>,
}

#[derive(Debug, Default)]
struct Behaviour {
    rows_per_update: usize,
    fail_next_update: Option<String>,
    fail_next_commit: Option<String>,
    query_result: ResultSet,
}

#[derive(Debug, Default)]
struct Shared {
    recorded: Recorded,
    behaviour: Behaviour,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Database double recording transactions, updates, inserts and queries.
#[derive(Debug, Clone)]
pub struct RecordingDatabase {
    name: String,
    shared: Arc<Mutex<Shared>>,
}

impl RecordingDatabase {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let shared = Shared {
            behaviour: Behaviour {
                rows_per_update: 1,
                ..Behaviour::default()
            },
            ..Shared::default()
        };
        Self {
            name: name.into(),
            shared: Arc::new(Mutex::new(shared)),
        }
    }

    /// Snapshot of the calls seen so far. Clones share the same record.
    #[must_use]
    pub fn recorded(&self) -> Recorded {
        lock(&self.shared).recorded.clone()
    }

    /// Row count reported by every `execute_update`.
    pub fn set_rows_per_update(&self, rows: usize) {
        lock(&self.shared).behaviour.rows_per_update = rows;
    }

    /// Rows returned by every `execute_sql`.
    pub fn set_query_result(&self, result: ResultSet) {
        lock(&self.shared).behaviour.query_result = result;
    }

    /// Make the next `execute_update` fail with a remote error.
    pub fn fail_next_update(&self, message: impl Into<String>) {
        lock(&self.shared).behaviour.fail_next_update = Some(message.into());
    }

    /// Make the next commit fail with a remote error.
    pub fn fail_next_commit(&self, message: impl Into<String>) {
        lock(&self.shared).behaviour.fail_next_commit = Some(message.into());
    }

    /// Commit timestamp handed back for inserts.
    #[must_use]
    pub fn commit_timestamp() -> NaiveDateTime {
        DateTime::from_timestamp(1_700_000_000, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(NaiveDateTime::MIN)
    }
}

/// Transaction handed to work running in [`RecordingDatabase::run_transaction`].
#[derive(Debug)]
pub struct RecordingTransaction {
    shared: Arc<Mutex<Shared>>,
    committed: bool,
}

#[async_trait]
impl SpannerTransaction for RecordingTransaction {
    async fn execute_update(
        &mut self,
        sql: &str,
        _params: &[RowValues],
    ) -> Result<usize, SqlMiddlewareDbError> {
        let mut shared = lock(&self.shared);
        shared.recorded.updates.push(sql.to_owned());
        if let Some(message) = shared.behaviour.fail_next_update.take() {
            return Err(SqlMiddlewareDbError::RemoteExecution(message));
        }
        Ok(shared.behaviour.rows_per_update)
    }

    async fn commit(&mut self) -> Result<(), SqlMiddlewareDbError> {
        if self.committed {
            return Err(SqlMiddlewareDbError::RemoteExecution(
                "transaction already committed".into(),
            ));
        }
        let mut shared = lock(&self.shared);
        if let Some(message) = shared.behaviour.fail_next_commit.take() {
            return Err(SqlMiddlewareDbError::RemoteExecution(message));
        }
        shared.recorded.commits += 1;
        self.committed = true;
        Ok(())
    }
}

#[async_trait]
impl SpannerDatabase for RecordingDatabase {
    type Transaction = RecordingTransaction;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run_transaction<R, F>(&self, work: F) -> Result<R, SqlMiddlewareDbError>
    where
        F: for<'t> FnOnce(&'t mut Self::Transaction) -> TxFuture<'t, R> + Send,
        R: Send,
    {
        lock(&self.shared).recorded.transactions += 1;
        let mut txn = RecordingTransaction {
            shared: Arc::clone(&self.shared),
            committed: false,
        };

        let result = work(&mut txn).await;
        let outcome = match result {
            Ok(value) if txn.committed => Ok(value),
            Ok(value) => txn.commit().await.map(|()| value),
            Err(e) => Err(e),
        };
        if outcome.is_err() {
            lock(&self.shared).recorded.rollbacks += 1;
        }
        outcome
    }

    async fn insert(
        &self,
        table: &str,
        row: &ColumnValues,
    ) -> Result<NaiveDateTime, SqlMiddlewareDbError> {
        lock(&self.shared)
            .recorded
            .inserts
            .push((table.to_owned(), row.clone()));
        Ok(Self::commit_timestamp())
    }

    async fn execute_sql(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlMiddlewareDbError> {
        let mut shared = lock(&self.shared);
        shared
            .recorded
            .queries
            .push((sql.to_owned(), params.to_vec()));
        Ok(shared.behaviour.query_result.clone())
    }
}

/// Client double serving a fixed set of instances and databases.
#[derive(Debug, Clone, Default)]
pub struct RecordingClient {
    databases: HashMap<String, Vec<String>>,
    handles: Arc<Mutex<HashMap<String, RecordingDatabase>>>,
}

impl RecordingClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `instance` with the given database names (bare or fully qualified).
    #[must_use]
    pub fn with_instance(mut self, instance: &str, databases: &[&str]) -> Self {
        self.databases.insert(
            instance.to_owned(),
            databases.iter().map(|db| (*db).to_owned()).collect(),
        );
        self
    }

    /// The handle given out for `database` on `instance`; repeated calls share one record.
    #[must_use]
    pub fn handle(&self, instance: &str, database: &str) -> RecordingDatabase {
        let key = format!("{instance}/{database}");
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| RecordingDatabase::new(database))
            .clone()
    }
}

#[async_trait]
impl SpannerClient for RecordingClient {
    type Database = RecordingDatabase;

    async fn instance_exists(&self, instance: &str) -> Result<bool, SqlMiddlewareDbError> {
        Ok(self.databases.contains_key(instance))
    }

    async fn list_databases(&self, instance: &str) -> Result<Vec<String>, SqlMiddlewareDbError> {
        Ok(self.databases.get(instance).cloned().unwrap_or_default())
    }

    fn database(&self, instance: &str, database: &str) -> Self::Database {
        self.handle(instance, database)
    }
}

/// Factory double that hands out clones of one [`RecordingClient`].
#[derive(Debug, Clone, Default)]
pub struct RecordingClientFactory {
    client: RecordingClient,
    reject_with: Option<String>,
    seen_credentials: Arc<Mutex<Vec<Credentials>>>,
}

impl RecordingClientFactory {
    #[must_use]
    pub fn new(client: RecordingClient) -> Self {
        Self {
            client,
            ..Self::default()
        }
    }

    /// Fail every `create` with a remote error carrying `message`.
    #[must_use]
    pub fn rejecting(mut self, message: impl Into<String>) -> Self {
        self.reject_with = Some(message.into());
        self
    }

    #[must_use]
    pub fn client(&self) -> &RecordingClient {
        &self.client
    }

    /// Credentials passed to `create`, oldest first.
    #[must_use]
    pub fn seen_credentials(&self) -> Vec<Credentials> {
        self.seen_credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SpannerClientFactory for RecordingClientFactory {
    type Client = RecordingClient;

    fn create(&self, credentials: &Credentials) -> Result<Self::Client, SqlMiddlewareDbError> {
        self.seen_credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(credentials.clone());
        if let Some(message) = &self.reject_with {
            return Err(SqlMiddlewareDbError::RemoteExecution(message.clone()));
        }
        Ok(self.client.clone())
    }
}
