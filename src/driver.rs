use std::collections::HashMap;

use crate::client::{SpannerClient, SpannerClientFactory};
use crate::config::{Credentials, SpannerOptions};
use crate::connection::SpannerConnection;
use crate::error::SqlMiddlewareDbError;
use crate::platform::SpannerPlatform;

/// Database handle type produced by a factory's client.
pub type DatabaseOf<F> = <<F as SpannerClientFactory>::Client as SpannerClient>::Database;

/// Entry point that turns connection options into a [`SpannerConnection`].
///
/// The client is created on the first `connect` and reused afterwards.
pub struct SpannerDriver<F: SpannerClientFactory> {
    factory: F,
    client: Option<F::Client>,
    instance_name: Option<String>,
    database_name: Option<String>,
}

impl<F: SpannerClientFactory> SpannerDriver<F> {
    pub const NAME: &'static str = "gcp-spanner";

    #[must_use]
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            client: None,
            instance_name: None,
            database_name: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    #[must_use]
    pub fn platform(&self) -> SpannerPlatform {
        SpannerPlatform
    }

    #[must_use]
    pub fn instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    #[must_use]
    pub fn database_name(&self) -> Option<&str> {
        self.database_name.as_deref()
    }

    /// Connect using a DBAL-style parameter map (`instance`, `dbname`, optional `credentials`).
    ///
    /// # Errors
    /// See [`connect`](Self::connect).
    pub async fn connect_with_params(
        &mut self,
        params: &HashMap<String, String>,
    ) -> Result<SpannerConnection<DatabaseOf<F>>, SqlMiddlewareDbError> {
        let opts = SpannerOptions::from_params(params)?;
        self.connect(&opts).await
    }

    /// Validate `opts`, make sure the instance and database exist and open a connection.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` for missing parameters, unusable
    /// credentials, or an unknown instance or database.
    pub async fn connect(
        &mut self,
        opts: &SpannerOptions,
    ) -> Result<SpannerConnection<DatabaseOf<F>>, SqlMiddlewareDbError> {
        opts.validate()?;
        self.ensure_instance(opts).await?;
        let database = self.select_database(&opts.database).await?;
        self.database_name = Some(opts.database.clone());

        tracing::info!(
            instance = %opts.instance,
            database = %opts.database,
            "connected to Spanner"
        );
        Ok(SpannerConnection::new(database)
            .with_reject_unconditioned_writes(opts.reject_unconditioned_writes))
    }

    async fn ensure_instance(&mut self, opts: &SpannerOptions) -> Result<(), SqlMiddlewareDbError> {
        if self.client.is_some() && self.instance_name.as_deref() == Some(opts.instance.as_str()) {
            return Ok(());
        }

        let credentials = Credentials::for_options(opts)?;
        let client = self.factory.create(&credentials).map_err(|e| match e {
            SqlMiddlewareDbError::ConfigError(_) => e,
            other => SqlMiddlewareDbError::ConfigError(other.to_string()),
        })?;

        if !client.instance_exists(&opts.instance).await? {
            return Err(SqlMiddlewareDbError::ConfigError(format!(
                "Instance '{}' does not exist.",
                opts.instance
            )));
        }

        self.client = Some(client);
        self.instance_name = Some(opts.instance.clone());
        Ok(())
    }

    fn connected(&self) -> Result<(&F::Client, &str), SqlMiddlewareDbError> {
        match (&self.client, &self.instance_name) {
            (Some(client), Some(instance)) => Ok((client, instance.as_str())),
            _ => Err(SqlMiddlewareDbError::ConfigError(
                "Spanner driver is not connected to an instance".into(),
            )),
        }
    }

    /// Database handle for `name` if it exists on the connected instance.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` when not connected or when the database
    /// does not exist.
    pub async fn select_database(
        &self,
        name: &str,
    ) -> Result<DatabaseOf<F>, SqlMiddlewareDbError> {
        let (client, instance) = self.connected()?;
        if !self.list_databases().await?.iter().any(|db| db == name) {
            return Err(SqlMiddlewareDbError::ConfigError(format!(
                "Database '{name}' does not exist on instance '{instance}'."
            )));
        }
        Ok(client.database(instance, name))
    }

    /// Names of the databases on the connected instance, without their resource path.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` when not connected, or the remote error.
    pub async fn list_databases(&self) -> Result<Vec<String>, SqlMiddlewareDbError> {
        let (client, instance) = self.connected()?;
        let names = client.list_databases(instance).await?;
        Ok(names
            .iter()
            .map(|name| short_database_name(name).to_string())
            .collect())
    }
}

fn short_database_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::short_database_name;

    #[test]
    fn strips_resource_path() {
        assert_eq!(
            short_database_name("projects/p/instances/i/databases/orders"),
            "orders"
        );
        assert_eq!(short_database_name("orders"), "orders");
    }
}
