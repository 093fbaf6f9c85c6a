mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{Value, json};
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dms_callback_core::app::Resolution;
use dms_callback_core::impls::{JournalCallback, JsonFileTokenStore};
use dms_callback_core::ports::SystemClock;
use dms_callback_core::{EventHandler, HandlerOutcome, NotificationResolver};

use crate::cli::{Cli, Commands, Config, HandleArgs};

/// Read the event from a file, or stdin when no path is given.
async fn read_event(path: Option<&Path>) -> Result<Value> {
    let raw = match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading event file {}", path.display()))?,
        None => {
            let mut raw = String::new();
            tokio::io::stdin()
                .read_to_string(&mut raw)
                .await
                .context("reading event from stdin")?;
            raw
        }
    };
    serde_json::from_str(&raw).context("event is not valid JSON")
}

/// handle: event -> resolver -> store / journal
async fn handle(args: HandleArgs, config: &Config) -> Result<()> {
    let event = read_event(args.event.as_deref()).await?;

    let store = JsonFileTokenStore::new(&config.store_dir, SystemClock);
    let callback = JournalCallback::new(&config.journal);
    let resolver = NotificationResolver::new(store, callback, SystemClock);
    let handler = EventHandler::new(resolver, config.handler.clone());

    let summary = match handler.handle(&event).await? {
        HandlerOutcome::Registered(record) => json!({
            "outcome": "registered",
            "createdAt": record.created_at,
            "expireAt": record.expire_at,
        }),
        HandlerOutcome::Resolved(Resolution::Succeeded) => json!({ "outcome": "succeeded" }),
        HandlerOutcome::Resolved(Resolution::Failed { error }) => {
            json!({ "outcome": "failed", "error": error })
        }
    };
    println!("{summary}");
    Ok(())
}

async fn purge(config: &Config) -> Result<()> {
    let store = JsonFileTokenStore::new(&config.store_dir, SystemClock);
    let purged = store.purge_expired(&config.handler.table).await?;
    println!("{}", json!({ "purged": purged }));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the result document, logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = cli.config();
    tracing::debug!(?config, "resolved configuration");

    match cli.command {
        Commands::Handle(args) => handle(args, &config).await,
        Commands::Purge => purge(&config).await,
    }
}
