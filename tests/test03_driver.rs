use std::collections::HashMap;
use std::io::Write;

use spanner_middleware::prelude::*;
use spanner_middleware::test_utils::{RecordingClient, RecordingClientFactory};
use tempfile::NamedTempFile;

fn key_file() -> Result<NamedTempFile, Box<dyn std::error::Error>> {
    let mut file = NamedTempFile::new()?;
    file.write_all(br#"{"type": "service_account", "project_id": "fixture"}"#)?;
    Ok(file)
}

fn factory() -> RecordingClientFactory {
    RecordingClientFactory::new(
        RecordingClient::new()
            .with_instance(
                "inst",
                &["projects/p/instances/inst/databases/orders", "audit"],
            )
            .with_instance("empty", &[]),
    )
}

#[test]
fn connect_selects_existing_database() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let factory = factory();
        let mut driver = SpannerDriver::new(factory.clone());
        let opts = SpannerOptions::new("inst".into(), "orders".into())
            .with_credentials_path(key.path());

        let conn = driver.connect(&opts).await?;
        assert_eq!(conn.database().name(), "orders");
        assert_eq!(driver.name(), "gcp-spanner");
        assert_eq!(driver.instance_name(), Some("inst"));
        assert_eq!(driver.database_name(), Some("orders"));

        let seen = factory.seen_credentials();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].key_file.as_ref().and_then(|k| k.get("project_id")),
            Some(&serde_json::json!("fixture"))
        );

        // Writes land on the handle the client gave out.
        conn.delete("users", &ColumnValues::new().with("id", RowValues::Int(1)))
            .await?;
        let handle = factory.client().handle("inst", "orders");
        assert_eq!(
            handle.recorded().updates,
            vec!["DELETE FROM users WHERE id = 1".to_string()]
        );
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn list_databases_strips_resource_paths() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut driver = SpannerDriver::new(factory());
        assert!(matches!(
            driver.list_databases().await,
            Err(SqlMiddlewareDbError::ConfigError(_))
        ));

        let opts =
            SpannerOptions::new("inst".into(), "audit".into()).with_credentials_path(key.path());
        driver.connect(&opts).await?;
        assert_eq!(driver.list_databases().await?, vec!["orders", "audit"]);
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn connect_fails_for_unknown_instance() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut driver = SpannerDriver::new(factory());
        let opts =
            SpannerOptions::new("nope".into(), "orders".into()).with_credentials_path(key.path());

        let err = driver.connect(&opts).await.unwrap_err();
        assert!(
            matches!(err, SqlMiddlewareDbError::ConfigError(ref msg) if msg == "Instance 'nope' does not exist.")
        );
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn connect_fails_for_unknown_database() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut driver = SpannerDriver::new(factory());
        let opts =
            SpannerOptions::new("empty".into(), "orders".into()).with_credentials_path(key.path());

        let err = driver.connect(&opts).await.unwrap_err();
        assert!(matches!(
            err,
            SqlMiddlewareDbError::ConfigError(ref msg)
                if msg == "Database 'orders' does not exist on instance 'empty'."
        ));
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn connect_with_params_requires_both_identifiers() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let factory = factory();
        let mut driver = SpannerDriver::new(factory.clone());

        let mut params = HashMap::new();
        params.insert("instance".to_string(), "inst".to_string());
        let err = driver.connect_with_params(&params).await.unwrap_err();
        assert!(matches!(err, SqlMiddlewareDbError::ConfigError(ref msg) if msg.contains("'dbname'")));

        // Validation happens before any client is built.
        assert!(factory.seen_credentials().is_empty());
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn connect_with_params_reads_credentials_entry() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut driver = SpannerDriver::new(factory());
        let params: HashMap<String, String> = [
            ("instance", "inst".to_string()),
            ("dbname", "orders".to_string()),
            ("credentials", key.path().display().to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let conn = driver.connect_with_params(&params).await?;
        assert_eq!(conn.database().name(), "orders");
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn factory_failure_is_a_configuration_error() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut driver = SpannerDriver::new(factory().rejecting("invalid grant"));
        let opts =
            SpannerOptions::new("inst".into(), "orders".into()).with_credentials_path(key.path());

        let err = driver.connect(&opts).await.unwrap_err();
        assert!(matches!(err, SqlMiddlewareDbError::ConfigError(ref msg) if msg.contains("invalid grant")));
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn unreadable_credentials_file_is_a_configuration_error() -> Result<(), Box<dyn std::error::Error>>
{
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut driver = SpannerDriver::new(factory());
        let opts = SpannerOptions::new("inst".into(), "orders".into())
            .with_credentials_path("/definitely/not/here.json");

        let err = driver.connect(&opts).await.unwrap_err();
        assert!(matches!(err, SqlMiddlewareDbError::ConfigError(ref msg) if msg.contains("Cannot read credentials file")));
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}

#[test]
fn lenient_writes_option_reaches_connection() -> Result<(), Box<dyn std::error::Error>> {
    let key = key_file()?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let factory = factory();
        let mut driver = SpannerDriver::new(factory.clone());
        let opts = SpannerOptionsBuilder::new("inst".into(), "orders".into())
            .credentials_path(key.path())
            .reject_unconditioned_writes(false)
            .finish();

        let conn = driver.connect(&opts).await?;
        conn.update(
            "users",
            &ColumnValues::new().with("active", RowValues::Bool(false)),
            &ColumnValues::new(),
        )
        .await?;

        assert_eq!(
            factory.client().handle("inst", "orders").recorded().updates,
            vec!["UPDATE users SET active = false WHERE ".to_string()]
        );
        Ok::<(), SqlMiddlewareDbError>(())
    })?;
    Ok(())
}
