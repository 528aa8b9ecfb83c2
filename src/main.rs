use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gatecheck::checkin::BatchCoordinator;
use gatecheck::config::Config;

#[derive(Parser)]
#[command(
    name = "gatecheck",
    version,
    about = "Automated multi-account check-in for quota-based API gateways",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a check-in batch over all configured accounts
    ///
    /// Exits 0 when at least one account succeeded. Note that this does not
    /// distinguish partial from total success; the logs and notification
    /// carry the real success ratio.
    Run {
        /// Config file path (TOML); falls back to environment variables
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the balance fingerprint state file
        #[arg(long)]
        state_file: Option<PathBuf>,
    },

    /// Load and validate configuration, then print a summary
    Validate {
        /// Config file path (TOML); falls back to environment variables
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = setup_tracing(&cli.log_format, cli.verbose) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    tracing::info!("gatecheck starting");

    match cli.command {
        Commands::Run { config, state_file } => run(config, state_file).await,
        Commands::Validate { config } => match validate(config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                tracing::error!(error = %err, "Configuration invalid");
                ExitCode::FAILURE
            }
        },
    }
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("gatecheck=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("gatecheck=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path),
        None => Config::from_env(),
    }
}

async fn run(config_path: Option<PathBuf>, state_file: Option<PathBuf>) -> ExitCode {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "Unable to load configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Some(state_file) = state_file {
        config.run.state_file = state_file;
    }

    let coordinator = match BatchCoordinator::from_config(config) {
        Ok(coordinator) => coordinator,
        Err(err) => {
            tracing::error!(error = %err, "Unable to start batch");
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        report = coordinator.run() => {
            if report.success_count > 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted by signal");
            ExitCode::FAILURE
        }
    }
}

fn validate(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;

    println!("Configuration OK");
    println!("  Providers: {}", config.providers.len());
    for (name, provider) in &config.providers {
        println!(
            "    {name}: {} (waf: {}, explicit check-in: {})",
            provider.domain,
            provider.needs_waf_cookies(),
            provider.needs_explicit_check_in()
        );
    }
    println!("  Accounts: {}", config.accounts.len());
    for (index, account) in config.accounts.iter().enumerate() {
        println!(
            "    {} -> provider '{}'",
            account.display_name(index),
            account.provider
        );
    }
    println!("  State file: {}", config.run.state_file.display());

    Ok(())
}
