mod cli;

use crate::cli::{Command, IdSchemeArg, LogFormatArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use jiff::Timestamp;
use serde::Serialize;
use serde_json::json;
use spito_core::{KvStore, RawSpitFields, SpitError, Storager};
use spito_generator::ShardedSettings;
use spito_service::{SpitService, SpitView};
use spito_storage::{
    IdScheme, InMemoryKvStore, KvStorager, MySqlKvStore, RedisKvStore, StoragerSettings,
};
use spito_telemetry::LogFormat;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = CLI::parse();

    spito_telemetry::init(match config.log_format {
        LogFormatArg::Text => LogFormat::Text,
        LogFormatArg::Json => LogFormat::Json,
    })?;

    info!(
        storage_backend = %config.storage,
        id_scheme = %config.id_scheme,
        "starting spito"
    );
    if config.reads_from_empty_store() {
        warn!("in-memory storage starts empty; pass --storage redis or mysql to reach saved spits");
    }

    match config.storage {
        StorageBackendArg::InMemory => run(InMemoryKvStore::new(), &config).await,
        StorageBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("redis url is required when storage backend is redis")?;
            let store = RedisKvStore::connect(url, config.key_prefix.as_str())
                .await
                .context("connecting to redis")?;
            run(store, &config).await
        }
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlKvStore::connect(dsn)
                .await
                .context("connecting to mysql")?;
            store.migrate().await.context("creating mysql tables")?;
            run(store, &config).await
        }
    }
}

/// Startup phase: bootstrap the storager once, then hand it to the service.
async fn run<K: KvStore>(store: K, config: &CLI) -> anyhow::Result<ExitCode> {
    let scheme = match config.id_scheme {
        IdSchemeArg::Single => IdScheme::Single,
        IdSchemeArg::Sharded => IdScheme::Sharded(
            ShardedSettings::builder()
                .shards(config.shards)
                .segment_width(config.segment_width)
                .build(),
        ),
    };
    let settings = StoragerSettings::builder()
        .scheme(scheme)
        .op_timeout(Duration::from_millis(config.store_timeout_ms))
        .build();

    let storager = KvStorager::init(store, settings)
        .await
        .context("initialising storage")?;
    let service = SpitService::new(Arc::new(storager));

    execute(&service, &config.command, &config.base_url).await
}

async fn execute<S: Storager>(
    service: &SpitService<S>,
    command: &Command,
    base_url: &str,
) -> anyhow::Result<ExitCode> {
    let outcome = match command {
        Command::Create {
            spit_type,
            exp,
            image_fmt,
            content,
        } => {
            let fields = RawSpitFields {
                exp: Some(exp.clone()),
                spit_type: Some(spit_type.clone()),
                content: Some(content.clone()),
                image_fmt: image_fmt.clone(),
            };
            service.create(&fields).await.map(Some)
        }
        Command::Show { id } => service.load(id).await.map(Some),
        Command::View { id } => service.load_with_click(id).await.map(Some),
        Command::Delete { id } => service.delete(id).await.map(|()| None),
        Command::CheckId { id } => {
            print_json(&json!({ "id": id, "valid": service.validate_id_format(id) }))?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    match outcome {
        Ok(Some(spit)) => {
            print_json(&SpitView::new(&spit, base_url, Timestamp::now()))?;
            Ok(ExitCode::SUCCESS)
        }
        Ok(None) => {
            print_json(&json!({ "deleted": true }))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(SpitError::Validation(errors)) => {
            print_json(&json!({ "errors": errors }))?;
            Ok(ExitCode::from(2))
        }
        Err(err) if err.is_not_found() || err.is_user_error() => {
            print_json(&json!({ "error": "not found" }))?;
            Ok(ExitCode::FAILURE)
        }
        Err(err) => {
            warn!(error = %err, "command failed");
            Err(err.into())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
