mod archive;
mod cli;
mod config;
mod error;
mod kubernetes;
mod matcher;
mod resolver;
mod sweep;
mod types;
mod utils;

use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use cli::Cli;
use config::Settings;
use kubernetes::{EventTrigger, initialize_client};
use sweep::run_sweep;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Arc::new(Settings::from_cli(&cli));

    info!(
        "podlog-keeper v{} | logs: {} | backup: {}",
        env!("CARGO_PKG_VERSION"),
        settings.log_root.display(),
        settings.backup_root.display()
    );
    if settings.patterns.is_match_all() {
        info!("Archiving pods of every namespace");
    } else {
        info!("Namespace patterns: {}", settings.patterns.patterns().join(","));
    }
    if settings.remove_after_copy {
        info!("Original log files are removed once archived");
    } else {
        info!("Original log files are preserved");
    }
    info!("Archive naming: {:?}", settings.naming);

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(()) => {
                    info!("Shutdown signal received");
                    shutdown.cancel();
                }
                Err(e) => error!("Failed to listen for shutdown signals: {}", e),
            }
        });
    }

    let sweep = tokio::spawn(run_sweep(settings.clone(), shutdown.clone()));

    if cli.no_watch {
        warn!("Pod watch disabled, relying on the periodic sweep only");
        shutdown.cancelled().await;
    } else {
        let client = initialize_client().await?;
        let trigger = EventTrigger::connect(client, settings.clone()).await?;
        trigger.run(shutdown.clone()).await;
        shutdown.cancel();
    }

    if let Err(e) = sweep.await {
        error!("Sweep task failed: {}", e);
    }
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
