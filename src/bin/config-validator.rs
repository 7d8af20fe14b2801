//! # Status Cache Configuration Validator
//!
//! Command-line tool for validating status cache configuration across
//! environments before deploying a poller.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use status_cache_manager::config::{ConfigManager, StatusCacheConfig};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate status cache configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration for the environment
    Validate,

    /// Print the effective configuration as JSON
    Show,

    /// Print the built-in defaults as JSON
    Defaults,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Show) => show(&cli),
        Some(Commands::Defaults) => defaults(),
    };

    match result {
        Ok(()) => {
            info!("Configuration validation completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration validation failed: {}", e);
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<std::sync::Arc<ConfigManager>, Box<dyn std::error::Error>> {
    Ok(ConfigManager::load_from_directory_with_env(
        cli.config_dir.clone(),
        &cli.environment,
    )?)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating status cache configuration");
    println!("Environment: {}", cli.environment);

    let manager = load(cli)?;
    let config = manager.config();

    println!("Config Directory: {}", manager.config_directory().display());
    println!();
    println!("  enabled               {}", config.enabled);
    println!("  poll_interval_seconds {}", config.poll_interval_seconds);
    println!("  key_prefix            {}", config.key_prefix);
    println!("  poll_on_start         {}", config.poll_on_start);
    println!("  tick_failure_policy   {:?}", config.tick_failure_policy);
    println!("  shutdown_timeout      {}s", config.shutdown_timeout_seconds);
    println!();
    println!("Configuration is valid");
    Ok(())
}

fn show(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let manager = load(cli)?;
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);
    Ok(())
}

fn defaults() -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{}",
        serde_json::to_string_pretty(&StatusCacheConfig::default())?
    );
    Ok(())
}
