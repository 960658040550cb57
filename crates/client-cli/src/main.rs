use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use packdesk::config::Config;
use packdesk::credentials::CredentialStore;
use packdesk::tui::{self, App};
use packdesk::ApiClient;

mod auth;

const DEFAULT_LOG_FILTER: &str = "packdesk=info";
const LOG_FILE: &str = "packdesk.log";

#[derive(Parser)]
#[command(name = "packdesk")]
#[command(about = "Terminal client for the pack subscription service")]
#[command(version)]
struct Cli {
    /// API base URL (overrides config)
    #[arg(long, global = true)]
    api: Option<String>,

    /// Config file (overrides PACKDESK_CONFIG and the default location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Screen to start on, as a path such as /register. Dashboards still
    /// need a login first.
    #[arg(long, value_name = "PATH", default_value = "/login")]
    open: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a customer account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        password: String,
    },
    /// Delete the remembered login
    Forget,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. api.base_url
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

/// The TUI owns the terminal, so its logs go to a file in the data dir.
/// Everything else logs to stderr.
fn init_tracing(to_file: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    if to_file {
        let path = Config::data_dir()?.join(LOG_FILE);
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}

fn credential_store(config: &Config) -> Result<CredentialStore> {
    Ok(CredentialStore::new(
        config.credentials_path()?,
        config.credentials.store_password,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.command.is_none())?;

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::config_path()?,
    };

    match cli.command {
        Some(Commands::Config { action }) => handle_config_command(action, &config_path),
        Some(Commands::Register {
            email,
            name,
            phone,
            password,
        }) => {
            let config = load_config(&config_path, cli.api.as_deref())?;
            let api = ApiClient::new(&config.api)?;
            auth::register(&api, name, email, phone, password).await
        }
        Some(Commands::Forget) => {
            let config = load_config(&config_path, cli.api.as_deref())?;
            auth::forget(&credential_store(&config)?)
        }
        None => {
            let config = load_config(&config_path, cli.api.as_deref())?;
            let api = ApiClient::new(&config.api)?;
            let mut app = App::new(&config, api, credential_store(&config)?);
            app.open(&cli.open);
            tracing::info!(api = %config.api.base_url, "Starting packdesk");
            tui::run(&mut app).await?;
            tracing::info!("packdesk exited");
            Ok(())
        }
    }
}

/// Load the config file, then apply the `--api` override
fn load_config(path: &Path, api: Option<&str>) -> Result<Config> {
    let mut config = Config::load_from_path(path)?;
    if let Some(api) = api {
        config.api.base_url = api.trim_end_matches('/').to_string();
    }
    Ok(config)
}

fn handle_config_command(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from_path(path).unwrap_or_default();
            config.set(&key, &value)?;
            config.save_to_path(path)?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load_from_path(path)?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Show => {
            let config = Config::load_from_path(path)?;
            for key in Config::KEYS {
                println!("{}: {}", key, config.get(key)?);
            }
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
