use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wardbeds::config::Config;

mod commands;

use commands::ServeParams;

#[derive(Parser)]
#[command(
    name = "wardbeds",
    version,
    about = "Hospital bed availability and booking client with a reference registry server",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables are used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Bed registry base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for the registry
    #[arg(long, global = true)]
    token: Option<String>,

    /// Login email
    #[arg(long, global = true)]
    email: Option<String>,

    /// Login password
    #[arg(long, global = true, env = "WARDBEDS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference bed registry server
    Serve {
        /// Address to bind
        #[arg(short, long)]
        bind: Option<String>,

        /// Number of beds to create on initialization
        #[arg(long)]
        beds: Option<u32>,

        /// Static bearer token required by bed routes
        #[arg(long)]
        access_token: Option<String>,
    },

    /// Ask the registry to create its beds
    Init,

    /// List every bed
    List,

    /// List available beds
    Available,

    /// List booked beds
    Booked,

    /// Show availability counts
    Stats,

    /// Book an available bed
    Book {
        /// Bed number
        id: u32,

        /// Patient name
        #[arg(short, long)]
        patient: String,

        /// Booking time (HH:MM, 24-hour)
        #[arg(short, long)]
        time: String,
    },

    /// Release a booked bed
    Unbook {
        /// Bed number
        id: u32,
    },

    /// Log in and print the issued token
    Login,

    /// Interactive bed availability view
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    tracing::debug!(base_url = %config.registry.base_url, "Configuration loaded");

    match cli.command {
        Commands::Serve {
            bind,
            beds,
            access_token,
        } => {
            tracing::info!(bind = ?bind, beds = ?beds, "Starting serve command");
            commands::serve(
                &config,
                ServeParams {
                    bind,
                    beds,
                    access_token,
                },
            )
            .await?;
        }
        Commands::Init => commands::initialize(&config).await?,
        Commands::List => commands::list(&config).await?,
        Commands::Available => commands::available(&config).await?,
        Commands::Booked => commands::booked(&config).await?,
        Commands::Stats => commands::stats(&config).await?,
        Commands::Book { id, patient, time } => {
            tracing::info!(bed_id = id, time = %time, "Starting book command");
            commands::book(&config, id, patient, time).await?;
        }
        Commands::Unbook { id } => {
            tracing::info!(bed_id = id, "Starting unbook command");
            commands::unbook(&config, id).await?;
        }
        Commands::Login => commands::login(&config).await?,
        Commands::Watch => commands::watch(&config).await?,
    }

    Ok(())
}

/// File config when `--config` is given, environment otherwise; flags win
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env().context("Failed to load configuration from environment")?,
    };

    if let Some(base_url) = &cli.base_url {
        config.registry.base_url = base_url.clone();
    }
    if let Some(token) = &cli.token {
        config.registry.token = Some(token.clone());
    }
    if let Some(email) = &cli.email {
        config.registry.email = Some(email.clone());
    }
    if let Some(password) = &cli.password {
        config.registry.password = Some(password.clone());
    }

    config.validate()?;
    Ok(config)
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("wardbeds=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("wardbeds={level},warn"))
            .context("Invalid log level")?
    };

    // stdout belongs to command output and the watch view
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
