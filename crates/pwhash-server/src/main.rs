#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use pwhash::HashService;
use server::config::{CliArgs, ServerConfig};
use server::routes::router;
use server::telemetry::init_telemetry;
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let service = HashService::new(config.hash_config());
    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(&config);

    axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown_signal(service.clone()))
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Listener stopped, draining {} in-flight request(s)",
        service.in_flight()
    );

    match service.drain(config.drain_timeout).await {
        Ok(()) => {
            #[cfg(feature = "tracing")]
            tracing::info!("All accepted requests completed");
        }
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("Exiting with unfinished work: {_e}");
        }
    }

    providers.shutdown();

    #[cfg(feature = "tracing")]
    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(_config: &ServerConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting hash service on {} with full config: {:#?}",
            _config.server_addr,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting hash service on {} with a {:?} processing delay",
            _config.server_addr,
            _config.processing_delay
        );
    }
}

/// Resolves when the listener should stop: either the delayed `/shutdown`
/// trigger fired, or the process received Ctrl+C / SIGTERM.
async fn shutdown_signal(service: HashService) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to install SIGTERM handler: {_e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to install Ctrl+C handler: {_e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = service.shutdown_signal() => {
            #[cfg(feature = "tracing")]
            tracing::info!("Shutdown requested over HTTP");
        },
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
            service.shutdown_now();
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
            service.shutdown_now();
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Refusing new connections, letting in-flight work finish");
}
