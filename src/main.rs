//! sqlframe - Main entry point.
//!
//! Runs one catalogued statement inside a transaction and prints its result
//! as JSON.

use sqlframe::config::{Config, StatementKind};
use sqlframe::db::{ExecutionContext, ParameterSet, PropertiesCatalog, Row, SqlRegistry, SqlxDriver};
use sqlframe::models::Value;
use sqlframe::transaction;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // Logs go to stderr, stdout carries the result
    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}

fn row_to_json(row: &Row) -> serde_json::Result<serde_json::Value> {
    let mut object = serde_json::Map::with_capacity(row.columns().len());
    for (label, value) in row.iter() {
        object.insert(label.to_string(), serde_json::to_value(value)?);
    }
    Ok(serde_json::Value::Object(object))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse_args();
    init_tracing(&config);

    info!(
        statement_id = %config.statement,
        kind = ?config.kind,
        "Starting sqlframe v{}",
        env!("CARGO_PKG_VERSION")
    );

    let settings = config.settings()?;
    let data_source = settings.resolve_data_source()?;
    let driver = Arc::new(SqlxDriver::connect(&data_source).await?);
    let catalog = Arc::new(PropertiesCatalog::open(&config.catalog)?);
    let registry = SqlRegistry::new(catalog, settings.retry.clone());

    let params: ParameterSet = config
        .params
        .iter()
        .map(|(name, value)| (name.clone(), Value::Text(value.clone())))
        .collect();

    let mut ctx = ExecutionContext::new(Arc::clone(&driver));
    let output = match config.kind {
        StatementKind::Query => {
            let statement = registry.select_rows::<ParameterSet>(config.statement.as_str());
            transaction::run(&mut ctx, move |ctx| {
                Box::pin(async move { statement.execute(ctx, &params).await })
            })
            .await
            .map(|rows| {
                rows.iter()
                    .map(row_to_json)
                    .collect::<serde_json::Result<Vec<_>>>()
                    .map(serde_json::Value::Array)
            })
        }
        StatementKind::Update => {
            let statement = registry.update::<ParameterSet>(config.statement.as_str());
            transaction::run(&mut ctx, move |ctx| {
                Box::pin(async move { statement.execute(ctx, &params).await })
            })
            .await
            .map(|affected| Ok(serde_json::json!({ "affected": affected })))
        }
    };

    driver.close().await;

    match output {
        Ok(json) => {
            println!("{}", serde_json::to_string_pretty(&json?)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, error_code = ?e.error_code(), "Statement failed");
            Err(e.into())
        }
    }
}
