use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faturabia::config::{default_config_path, ResolvedConfig};
use faturabia::models::{Id, User};
use faturabia::nesten::NestenClientFactory;
use faturabia::stats::ReportService;
use faturabia::storage::{JsonFileStorage, Storage};
use faturabia::sync::InvoiceSyncService;
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "faturabia")]
#[command(about = "Nesten invoice synchronization and bookkeeping statistics")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    /// Register a user, or update the name, email or API key of an existing one
    AddUser {
        user_id: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        email: String,
        /// Nesten API key used for this user's synchronization
        #[arg(long, env = "NESTEN_API_KEY")]
        api_key: Option<String>,
    },

    /// Run one fetch-all pass and wait for customer extraction to finish
    Sync { user_id: String },

    /// Print cached (or recomputed) invoice statistics
    Stats { user_id: String },

    /// Print the dashboard payload
    Dashboard { user_id: String },

    /// Print API key and last synchronization status
    Status { user_id: String },
}

fn parse_user_id(raw: &str) -> Result<Id> {
    Id::from_string_checked(raw).with_context(|| format!("Invalid user id: {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    let cli = Cli::parse();
    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?
        .with_env_overrides();
    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));

    match cli.command {
        Some(Command::Config) => {
            println!("Config file: {}", cli.config.display());
            print_json(&config)?;
        }
        Some(Command::AddUser {
            user_id,
            name,
            email,
            api_key,
        }) => {
            let id = parse_user_id(&user_id)?;
            let mut user = match storage.get_user(&id).await? {
                Some(mut existing) => {
                    if !name.is_empty() {
                        existing.full_name = name;
                    }
                    if !email.is_empty() {
                        existing.email = email;
                    }
                    existing
                }
                None => User::new(id, name, email),
            };
            if let Some(key) = api_key {
                user = user.with_nes_api_key(key);
            }
            storage.save_user(&user).await?;
            println!(
                "Saved user {} (API key {})",
                user.id,
                if user.has_nes_api_key() { "set" } else { "missing" }
            );
        }
        Some(Command::Sync { user_id }) => {
            let id = parse_user_id(&user_id)?;
            let factory = NestenClientFactory::new(config.nesten.clone())?;
            let service =
                InvoiceSyncService::new(Arc::clone(&storage), Arc::new(factory), config.nesten);
            let summary = service.fetch_all(&id).await?;
            service.jobs().wait_idle().await;
            for failure in service.jobs().failures() {
                warn!(job = %failure.job, error = %failure.error, "background job failed");
            }
            print_json(&summary)?;
        }
        Some(Command::Stats { user_id }) => {
            let reports = ReportService::new(storage, config.display)?;
            print_json(&reports.statistics(&parse_user_id(&user_id)?).await?)?;
        }
        Some(Command::Dashboard { user_id }) => {
            let reports = ReportService::new(storage, config.display)?;
            print_json(&reports.dashboard(&parse_user_id(&user_id)?).await?)?;
        }
        Some(Command::Status { user_id }) => {
            let reports = ReportService::new(storage, config.display)?;
            print_json(&reports.status(&parse_user_id(&user_id)?).await?)?;
        }
        None => {
            println!("Faturabia - Nesten invoice sync");
            println!("===============================\n");
            println!("Config: {}", cli.config.display());
            println!("Data directory: {}\n", config.data_dir.display());
            println!("Commands:");
            println!("  config               Show current configuration");
            println!("  add-user <id>        Register a user and API key");
            println!("  sync <id>            Fetch all invoice collections");
            println!("  stats <id>           Invoice statistics");
            println!("  dashboard <id>       Dashboard payload");
            println!("  status <id>          Synchronization status\n");
            println!("Run 'faturabia --help' for more options.");
        }
    }

    Ok(())
}
