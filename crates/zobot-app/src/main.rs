//! Zobot application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Initialize tracing
//! 3. Start the lead journal writer
//! 4. Build the chat engine and API state
//! 5. Serve the axum API until Ctrl+C, then flush the journal

mod cli;

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use zobot_api::routes;
use zobot_api::state::AppState;
use zobot_chat::{ChatEngine, CrmLeadNotifier, LeadNotifier, NoopLeadNotifier};
use zobot_core::config::ZobotConfig;
use zobot_core::journal::JsonJournal;
use zobot_core::ZobotError;

use crate::cli::CliArgs;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first so its log level can seed the filter. A present but
    // unreadable file is fatal.
    let config_file = args.resolve_config_path();
    let config_exists = config_file.exists();
    let mut config = if config_exists {
        ZobotConfig::load(&config_file)?
    } else {
        ZobotConfig::default()
    };

    // Tracing. RUST_LOG > --log-level > config.
    let level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)))
        .init();

    tracing::info!("Starting Zobot v{}", env!("CARGO_PKG_VERSION"));
    if config_exists {
        tracing::info!(path = %config_file.display(), "Configuration loaded");
    } else {
        tracing::warn!(path = %config_file.display(), "Config file not found, using defaults");
    }

    config.server.host = args.resolve_host(&config.server.host);
    config.server.port = args.resolve_port(config.server.port);

    // Lead journal.
    let mut journal_task = None;
    let notifier: Arc<dyn LeadNotifier> = if config.leads.enabled {
        let log_dir = args.resolve_log_dir(&config.leads.log_dir);
        let (journal, task) = JsonJournal::spawn(&log_dir);
        journal_task = Some(task);
        tracing::info!(dir = %log_dir.display(), "Lead journal enabled");
        Arc::new(CrmLeadNotifier::new(journal))
    } else {
        tracing::info!("Lead journal disabled");
        Arc::new(NoopLeadNotifier)
    };

    // Chat engine + API state.
    let engine = ChatEngine::new(config.chat.clone(), notifier);
    let host = config.server.host.clone();
    let port = config.server.port;
    let state = AppState::new(config, engine);
    let router = routes::create_router(state);

    // === API server ===

    let listener = match tokio::net::TcpListener::bind((host.as_str(), port)).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(host = %host, port, error = %e, "Failed to bind. Is another instance running?");
            tracing::error!("Try: zobot --port {}", port.saturating_add(1));
            return Err(ZobotError::Api(format!("Failed to bind {}:{}: {}", host, port, e)).into());
        }
    };

    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, "API server listening");
    tracing::info!("Chat endpoint at http://{}/api/chat", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ZobotError::Api(format!("Server error: {}", e)))?;

    // The router (and every journal handle it held) is gone; wait for the
    // writer to drain.
    if let Some(task) = journal_task {
        if let Err(e) = task.await {
            tracing::warn!(error = %e, "Journal writer ended abnormally");
        }
    }

    tracing::info!("Zobot stopped");
    Ok(())
}
