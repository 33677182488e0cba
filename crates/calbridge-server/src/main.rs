//! calbridge entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};

use calbridge_core::init_tracing;
use calbridge_providers::caldav::CalDavStore;
use calbridge_server::cli::Cli;
use calbridge_server::{
    AppState, BridgeConfig, BridgeError, BridgeResult, EventService, SignalHandler, router, serve,
};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match BridgeConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(config.tracing.clone()) {
        eprintln!("error: {e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "calbridge stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: BridgeConfig) -> BridgeResult<()> {
    info!(
        caldav = %config.caldav.url,
        timezone = %config.zone,
        bind = %config.bind,
        "Starting calbridge"
    );

    let store = CalDavStore::new(config.caldav)
        .map_err(|e| BridgeError::configuration(e.to_string()))?;
    let service = EventService::new(Arc::new(store), config.zone);
    info!(store = service.store_name(), "Calendar store ready");

    let listener = TcpListener::bind(config.bind).await?;

    let signals = SignalHandler::new();
    signals.spawn_listener();

    serve(listener, router(AppState::new(service)), signals.shutdown()).await?;
    Ok(())
}
