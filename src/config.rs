use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::SqlMiddlewareDbError;

/// Environment variable naming the service-account key file.
pub const KEY_FILE_ENV_VARIABLE: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Options for connecting to a Spanner database.
#[derive(Debug, Clone, Deserialize)]
pub struct SpannerOptions {
    pub instance: String,
    #[serde(alias = "dbname")]
    pub database: String,
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
    #[serde(default = "reject_unconditioned_writes_default")]
    pub reject_unconditioned_writes: bool,
}

fn reject_unconditioned_writes_default() -> bool {
    true
}

impl SpannerOptions {
    #[must_use]
    pub fn new(instance: String, database: String) -> Self {
        Self {
            instance,
            database,
            credentials_path: None,
            reject_unconditioned_writes: true,
        }
    }

    /// Build options from a DBAL-style parameter map (`instance`, `dbname`).
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` when either parameter is missing.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, SqlMiddlewareDbError> {
        let instance = params.get("instance").ok_or_else(|| {
            SqlMiddlewareDbError::ConfigError(
                "Missing parameter 'instance' to connect to Spanner instance.".into(),
            )
        })?;
        let database = params.get("dbname").ok_or_else(|| {
            SqlMiddlewareDbError::ConfigError(
                "Missing parameter 'dbname' to connect to Spanner database.".into(),
            )
        })?;

        let mut opts = SpannerOptions::new(instance.clone(), database.clone());
        opts.credentials_path = params.get("credentials").map(PathBuf::from);
        Ok(opts)
    }

    /// Parse options from a JSON document.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` when the document is malformed or a
    /// required field is missing.
    pub fn from_json(raw: &str) -> Result<Self, SqlMiddlewareDbError> {
        let opts: SpannerOptions = serde_json::from_str(raw).map_err(|e| {
            SqlMiddlewareDbError::ConfigError(format!("Invalid Spanner options: {e}"))
        })?;
        opts.validate()?;
        Ok(opts)
    }

    #[must_use]
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_reject_unconditioned_writes(mut self, reject: bool) -> Self {
        self.reject_unconditioned_writes = reject;
        self
    }

    /// Check that both identifiers are present.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` naming the first empty identifier.
    pub fn validate(&self) -> Result<(), SqlMiddlewareDbError> {
        if self.instance.trim().is_empty() {
            return Err(SqlMiddlewareDbError::ConfigError(
                "Missing parameter 'instance' to connect to Spanner instance.".into(),
            ));
        }
        if self.database.trim().is_empty() {
            return Err(SqlMiddlewareDbError::ConfigError(
                "Missing parameter 'dbname' to connect to Spanner database.".into(),
            ));
        }
        Ok(())
    }

    /// Key file to authenticate with: the configured path, else the
    /// `GOOGLE_APPLICATION_CREDENTIALS` environment variable.
    #[must_use]
    pub fn resolved_credentials_path(&self) -> Option<PathBuf> {
        self.credentials_path.clone().or_else(|| {
            std::env::var_os(KEY_FILE_ENV_VARIABLE)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
    }
}

/// Fluent builder for Spanner options.
#[derive(Debug, Clone)]
pub struct SpannerOptionsBuilder {
    opts: SpannerOptions,
}

impl SpannerOptionsBuilder {
    #[must_use]
    pub fn new(instance: String, database: String) -> Self {
        Self {
            opts: SpannerOptions::new(instance, database),
        }
    }

    #[must_use]
    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.opts.credentials_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn reject_unconditioned_writes(mut self, reject: bool) -> Self {
        self.opts.reject_unconditioned_writes = reject;
        self
    }

    #[must_use]
    pub fn finish(self) -> SpannerOptions {
        self.opts
    }
}

/// Service-account key handed to the client factory.
///
/// `key_file` is `None` when no key file is configured; the client then falls back to its
/// own ambient credential discovery.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    pub key_file: Option<JsonValue>,
}

impl Credentials {
    /// Read and parse a JSON key file.
    ///
    /// # Errors
    /// Returns `SqlMiddlewareDbError::ConfigError` when the file cannot be read or is not JSON.
    pub fn load(path: &Path) -> Result<Self, SqlMiddlewareDbError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SqlMiddlewareDbError::ConfigError(format!(
                "Cannot read credentials file '{}': {e}",
                path.display()
            ))
        })?;
        let key_file: JsonValue = serde_json::from_str(&raw).map_err(|e| {
            SqlMiddlewareDbError::ConfigError(format!(
                "Invalid credentials file '{}': {e}",
                path.display()
            ))
        })?;
        Ok(Self {
            key_file: Some(key_file),
        })
    }

    /// Credentials for `opts`, loading the key file when one is configured.
    ///
    /// # Errors
    /// Propagates errors from [`Credentials::load`].
    pub fn for_options(opts: &SpannerOptions) -> Result<Self, SqlMiddlewareDbError> {
        match opts.resolved_credentials_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}
