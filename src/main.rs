//! lightmon - Main Entry Point
//!
//! Finds the gateway, starts the read loop and log aggregator, then acts as
//! an operator console: lines typed on stdin are forwarded to the gateway,
//! lines starting with `:` are handled locally.

use anyhow::Context;
use lightmon::{
    backend::{discover_port, Bridge},
    config::{default_config_path, AppConfig, LoggingConfig},
    console::{spawn_stdin_reader, Console},
    registry::{FileNodeStore, NodeRegistry},
    LogAggregator, MonitorController,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_logging(config: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "lightmon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.filter)),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(default_config_path);
    let config = match &config_path {
        Some(path) => AppConfig::load_or_default(path),
        None => AppConfig::default(),
    };

    let _log_guard = init_logging(&config.logging);
    tracing::info!("Starting lightmon");
    if let Some(path) = &config_path {
        tracing::debug!("Config path: {:?}", path);
    }

    let (link, writer, port) = discover_port(&config.serial, config.bridge.max_line_bytes)
        .context("No gateway found")?;
    tracing::info!("Using gateway on {}", port);

    let store = FileNodeStore::new(&config.storage.nodes_file);
    let registry = Arc::new(
        NodeRegistry::load(store)
            .with_context(|| format!("Failed to load {:?}", config.storage.nodes_file))?,
    );

    let (bridge, handle) = Bridge::new(Box::new(link), writer, registry.clone());
    let reader = bridge.spawn().context("Failed to spawn read loop")?;

    let aggregator = Arc::new(LogAggregator::new(handle.events.log.clone(), &config.aggregator));
    let aggregator_thread = {
        let aggregator = aggregator.clone();
        let running = handle.stop_handle();
        std::thread::Builder::new()
            .name("lightmon-aggregator".to_string())
            .spawn(move || aggregator.run(running))
            .context("Failed to spawn log aggregator")?
    };

    let controller = MonitorController::new(
        handle.writer.clone(),
        registry,
        config.bridge.command_spacing(),
    );
    if config.bridge.sync_nodes_on_start {
        if let Err(e) = controller.sync_nodes() {
            tracing::warn!("Failed to sync node list: {}", e);
        }
    }

    let input = spawn_stdin_reader().context("Failed to spawn stdin reader")?;
    let console = Console::new(handle.clone(), controller, aggregator);
    let exit = console.run(&input, &mut std::io::stdout());
    tracing::debug!("Console ended: {:?}", exit);

    tracing::info!("Shutting down...");
    handle.shutdown();
    let final_state = reader
        .join()
        .map_err(|_| anyhow::anyhow!("Read loop panicked"))?;
    aggregator_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Log aggregator panicked"))?;
    tracing::info!("Read loop {}", final_state);

    Ok(())
}
