//! Command-line flags and the configuration they resolve to.
//!
//! Every setting can also come from the environment:
//!
//! - `DMS_CALLBACK_TABLE` - token table (default: `dpr-step-function-tokens`)
//! - `DMS_CALLBACK_KEY_ATTRIBUTE` - key attribute (default: `replicationTaskArn`)
//! - `DMS_CALLBACK_STORE_DIR` - directory of the JSON token store (default: `.dms-callback`)
//! - `DMS_CALLBACK_JOURNAL` - notification journal (default: `<store dir>/notifications.jsonl`)
//! - `DMS_CALLBACK_EXPIRY_DAYS` - default token expiry in days (default: 5)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dms_callback_core::HandlerConfig;
use dms_callback_core::app::DEFAULT_TABLE;
use dms_callback_core::domain::DEFAULT_KEY_ATTRIBUTE;
use dms_callback_core::domain::signal::DEFAULT_TOKEN_EXPIRY_DAYS;

const JOURNAL_FILE: &str = "notifications.jsonl";

#[derive(Debug, Parser)]
#[command(name = "dms-callback")]
#[command(version, about = "Relay DMS task outcomes to a suspended workflow step", long_about = None)]
pub struct Cli {
    /// Token table name.
    #[arg(long, env = "DMS_CALLBACK_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Attribute the task identifier is stored under.
    #[arg(long, env = "DMS_CALLBACK_KEY_ATTRIBUTE", default_value = DEFAULT_KEY_ATTRIBUTE)]
    pub key_attribute: String,

    /// Directory holding the token store files.
    #[arg(long, env = "DMS_CALLBACK_STORE_DIR", default_value = ".dms-callback")]
    pub store_dir: PathBuf,

    /// Notification journal path.
    #[arg(long, env = "DMS_CALLBACK_JOURNAL")]
    pub journal: Option<PathBuf>,

    /// Token expiry used when a registration carries none.
    #[arg(long, env = "DMS_CALLBACK_EXPIRY_DAYS", default_value_t = DEFAULT_TOKEN_EXPIRY_DAYS)]
    pub expiry_days: u32,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Handle one trigger event (registration, stoppage or failure).
    Handle(HandleArgs),
    /// Remove expired task records from the token table.
    Purge,
}

#[derive(Debug, Args)]
pub struct HandleArgs {
    /// JSON event file. Reads stdin when omitted.
    #[arg(long)]
    pub event: Option<PathBuf>,
}

/// Resolved settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub handler: HandlerConfig,
    pub store_dir: PathBuf,
    pub journal: PathBuf,
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            handler: HandlerConfig {
                table: self.table.clone(),
                key_attribute: self.key_attribute.clone(),
                default_expiry_days: self.expiry_days,
            },
            store_dir: self.store_dir.clone(),
            journal: self
                .journal
                .clone()
                .unwrap_or_else(|| self.store_dir.join(JOURNAL_FILE)),
        }
    }
}
