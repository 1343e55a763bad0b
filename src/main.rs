use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use turnstile::config::ServiceConfig;
use turnstile::http::HttpServer;
use turnstile::ratelimit::{spawn_sweeper, LimiterStore};

/// Log output format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Command line arguments. Flags override the configuration file and environment.
#[derive(Parser, Debug)]
#[command(name = "turnstile")]
#[command(about = "HTTP service with fixed-window request admission control")]
#[command(version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Address to serve HTTP on
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Requests admitted per caller per window
    #[arg(long)]
    requests_per_window: Option<u64>,

    /// Window length in seconds
    #[arg(long)]
    window_secs: Option<u64>,

    /// Admit every request without bookkeeping
    #[arg(long)]
    disable_rate_limit: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Args {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(addr) = self.http_addr {
            config.server.http_addr = addr;
        }
        if let Some(limit) = self.requests_per_window {
            config.rate_limiting.requests_per_window = limit;
        }
        if let Some(secs) = self.window_secs {
            config.rate_limiting.window_secs = secs;
        }
        if self.disable_rate_limit {
            config.rate_limiting.enabled = false;
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    info!("Starting Turnstile");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration, then let flags override it
    let mut config = ServiceConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;
    info!(
        http_addr = %config.server.http_addr,
        env = %config.server.env,
        "Configuration loaded"
    );

    // Initialize the limiter store; invalid limits fail here, before serving
    let limiter_config = config.rate_limiting.limiter_config();
    let store = Arc::new(LimiterStore::new(limiter_config)?);

    let sweeper = if store.is_enabled() {
        info!(
            requests_per_window = config.rate_limiting.requests_per_window,
            window_secs = config.rate_limiting.window_secs,
            identity_source = ?config.rate_limiting.identity_source,
            "Rate limiter initialized"
        );
        Some(spawn_sweeper(
            Arc::clone(&store),
            config.rate_limiting.sweep_interval(),
        ))
    } else {
        warn!("Rate limiting is disabled, every request will be admitted");
        None
    };

    let server = HttpServer::new(
        config.server.http_addr,
        Arc::clone(&store),
        config.rate_limiting.identity_source,
    )
    .with_env(config.server.env.clone());

    // Run the server with graceful shutdown on Ctrl+C
    let result = server.serve_with_shutdown(shutdown_signal()).await;

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    result?;

    info!("Turnstile stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
