use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pelican_advertise::commands;
use pelican_advertise::config::Config;

#[derive(Parser)]
#[command(
    name = "pelican-advertise",
    version,
    about = "Advertise origin and cache servers to a federation director",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides logging.format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Advertise periodically and serve health status until Ctrl-C
    Run,

    /// Advertise every configured server once and exit
    Once,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
        config.validate()?;
    }

    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    tracing::info!(
        config = ?cli.config,
        servers = config.servers.len(),
        "pelican-advertise starting"
    );

    match cli.command {
        Commands::Run => commands::run(config).await?,
        Commands::Once => commands::once(config).await?,
    }

    tracing::info!("pelican-advertise completed successfully");
    Ok(())
}

/// Default filter: this crate at `level` (or `debug` when verbose),
/// everything else at `warn`
fn default_directives(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level };
    format!("pelican_advertise={level},warn")
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new(default_directives(level, true))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directives(level, false)))
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
