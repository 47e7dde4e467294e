//! novel-cache HTTP facade server.

use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use novel_cache::server::{AppState, Config, CorsConfig, init_logging, router};

/// novel-cache HTTP facade server.
#[derive(Parser, Debug)]
#[command(name = "novel-cache-server")]
#[command(about = "HTTP facade over the chunked novel cache")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "novel-cache.toml")]
    config: PathBuf,

    /// KV store bearer token; overrides `[transport] token`.
    #[arg(long, env = "NOVEL_CACHE_KV_TOKEN", hide_env_values = true)]
    kv_token: Option<String>,

    /// Port to listen on; overrides `[server] port`.
    #[arg(short, long)]
    port: Option<u16>,
}

/// Build CORS layer from configuration.
fn build_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        // Deny all cross-origin requests by default
        return CorsLayer::new();
    }

    let mut cors = CorsLayer::new();

    if config.allow_origins.iter().any(|o| o == "*") {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<_> = config
        .allow_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    let headers: Vec<_> = config
        .allow_headers
        .iter()
        .filter_map(|h| h.parse().ok())
        .collect();
    cors = cors.allow_headers(headers);

    if config.allow_credentials {
        cors = cors.allow_credentials(true);
    }

    cors.max_age(Duration::from_secs(config.max_age))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration first (needed for logging setup)
    let mut config = Config::from_file(&args.config)?;
    if let Some(token) = args.kv_token {
        config.transport.token = Some(token);
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_logging(&config.logging)?;

    tracing::info!(
        backend = ?config.transport.backend,
        enabled = config.cache.enabled,
        max_value_bytes = config.cache.max_value_bytes,
        "configuring cache"
    );

    let state = AppState::from_config(&config)?;
    let app = router(state);

    let cors = build_cors_layer(&config.cors);
    if config.cors.enabled {
        tracing::info!(
            "CORS enabled with {} allowed origin(s)",
            config.cors.allow_origins.len()
        );
    } else {
        tracing::info!("CORS disabled (denying cross-origin requests)");
    }

    let app: Router = app.layer(cors).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.bind_addr().parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
