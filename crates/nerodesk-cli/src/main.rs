//! Nerodesk CLI
//!
//! Drives a Nerodesk document store from the command line: one operation per
//! invocation, acting as the identity given with `--identity`.

mod cli;

use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use nerodesk_store::{
    BackendConfig, Identity, PartitionedTransferEngine, RangeRequest, Registry, SessionState,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::cli::{Cli, Command};

/// Initializes stderr logging; stdout carries command output.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("nerodesk_store={level},nerodesk={level}"))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.store_config().await?;
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {e}");
        std::process::exit(1);
    }
    if matches!(config.backend, BackendConfig::Memory) {
        warn!("Using the in-memory backend; nothing outlives this command");
    }

    let registry = Registry::from_config(&config).context("creating backend")?;
    info!(
        backend = registry.backend().name(),
        identity = %cli.acting(),
        tenant = %cli.tenant(),
        "Starting nerodesk"
    );

    let acting = cli.acting();
    let tenant = cli.tenant();
    let collection = registry.tenant(tenant.clone());

    match cli.command {
        Command::Put { name, file } => {
            let content = read_input(&file).await?;
            collection.document(name).write(&acting, content).await?;
        }
        Command::Get { name, output } => {
            let content = collection.document(name).read(&acting).await?;
            write_output(output.as_deref(), &content).await?;
        }
        Command::Range {
            name,
            offset,
            length,
            strict,
        } => {
            let request = if strict {
                RangeRequest::strict(offset, length)
            } else {
                RangeRequest::new(offset, length)
            };
            let slice = collection.document(name).read_range(&acting, request).await?;
            info!(offset = slice.offset, end = slice.end(), total = slice.total, "Range served");
            write_output(None, &slice.bytes).await?;
        }
        Command::Delete { name } => {
            collection.document(name).delete(&acting).await?;
        }
        Command::AddFriend { name, friend } => {
            collection
                .document(name)
                .add_friend(&acting, Identity::new(friend))
                .await?;
        }
        Command::EjectFriend { name, friend } => {
            collection
                .document(name)
                .eject_friend(&acting, &Identity::new(friend))
                .await?;
        }
        Command::SetVisibility { name, visible } => {
            collection.document(name).set_visibility(&acting, visible).await?;
        }
        Command::Attributes { name } => {
            let attrs = collection.document(name).attributes(&acting).await?;
            println!("{}", serde_json::to_string_pretty(&attrs)?);
        }
        Command::List => {
            for name in collection.names().await? {
                println!("{name}");
            }
        }
        Command::Upload {
            name,
            file,
            chunk_size,
        } => {
            let engine = PartitionedTransferEngine::new(registry.clone(), &config.transfer);
            let state = upload(&engine, &tenant, &name, &file, chunk_size).await?;
            println!("{}", serde_json::to_string(&state)?);
        }
        Command::Health => {
            registry.backend().health_check().await?;
            println!("ok");
        }
    }

    Ok(())
}

/// Sends `file` chunk by chunk; the last chunk commits the document.
async fn upload(
    engine: &PartitionedTransferEngine,
    tenant: &Identity,
    name: &str,
    file: &Path,
    chunk_size: usize,
) -> anyhow::Result<SessionState> {
    anyhow::ensure!(chunk_size > 0, "chunk size must be > 0");

    let content = read_input(file).await?;
    let total = content.len() as u64;
    if total == 0 {
        return Ok(engine.begin_chunk(tenant, name, 0, 0, Bytes::new()).await?);
    }

    let mut state = SessionState::Abandoned;
    let mut offset = 0usize;
    while offset < content.len() {
        let end = (offset + chunk_size).min(content.len());
        state = engine
            .begin_chunk(tenant, name, offset as u64, total, content.slice(offset..end))
            .await?;
        info!(offset, end, total, "Chunk sent");
        offset = end;
    }
    Ok(state)
}

async fn read_input(path: &Path) -> anyhow::Result<Bytes> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        tokio::io::stdin().read_to_end(&mut buf).await?;
        return Ok(Bytes::from(buf));
    }
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Bytes::from(content))
}

async fn write_output(path: Option<&Path>, content: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => tokio::fs::write(path, content)
            .await
            .with_context(|| format!("writing {}", path.display())),
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(content).await?;
            stdout.flush().await?;
            Ok(())
        }
    }
}
