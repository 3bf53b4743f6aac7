//! Quarry CLI entry point.

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quarry::cli::{AppContext, Cli, Commands};
use quarry::domain::models::{LoggingConfig, QuarryConfig};
use quarry::infrastructure::config::ConfigLoader;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => quarry::cli::handle_error(err, cli.json),
    };

    // Held until exit so buffered file logs are flushed.
    let _guard = init_tracing(&config.logging);

    if let Err(err) = run(config, cli.command, cli.json).await {
        quarry::cli::handle_error(err, cli.json);
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<QuarryConfig> {
    let config = match path {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    Ok(config)
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level;
/// output goes to stderr, or to a daily-rotated file when a log directory is
/// configured.
fn init_tracing(config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    if let Some(directory) = &config.directory {
        let appender = tracing_appender::rolling::daily(directory, "quarry.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        if config.format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
        } else {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
        return Some(guard);
    }

    if config.format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
    None
}

async fn run(config: QuarryConfig, command: Commands, json_mode: bool) -> anyhow::Result<()> {
    let ctx = AppContext::from_config(config).await?;

    match command {
        Commands::Ingest(args) => quarry::cli::commands::ingest::execute(&ctx, args, json_mode).await,
        Commands::Query(args) => quarry::cli::commands::query::execute(&ctx, args, json_mode).await,
        Commands::Status(args) => quarry::cli::commands::status::execute(&ctx, args, json_mode).await,
        Commands::Forget(args) => quarry::cli::commands::forget::execute(&ctx, args, json_mode).await,
        Commands::Reindex(args) => {
            quarry::cli::commands::reindex::execute(&ctx, args, json_mode).await
        }
    }
}
