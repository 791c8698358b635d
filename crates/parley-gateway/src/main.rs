use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

mod app;
mod engine;
mod http;
mod ws;

/// Realtime group-chat relay over WebSocket.
#[derive(Debug, Parser)]
#[command(name = "parley-gateway", version, about)]
struct Cli {
    /// Config file (default: ~/.parley/parley.toml).
    #[arg(long, env = "PARLEY_CONFIG")]
    config: Option<String>,

    /// Listen port, overriding the config file and environment.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config =
        parley_core::config::ParleyConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            parley_core::config::ParleyConfig::default()
        });
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    info!(
        history_limit = config.chat.history_limit,
        client_queue = config.gateway.client_queue,
        "broadcast engine ready"
    );

    let state = Arc::new(app::AppState::new(config));
    let router = app::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Parley gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await?;

    state.engine.shutdown();
    info!("Parley gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then tell every WS loop to stop.
async fn shutdown_signal(state: Arc<app::AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
    state.shutdown.cancel();
}
