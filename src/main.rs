//! Murph session billing service
//!
//! Pay-per-minute billing for live teaching and video sessions:
//! - Fund locks with an escrow gateway at session start
//! - Live elapsed-time and cost estimates while a session runs
//! - Settlement capped at the lock on end, full refund on cancel
//! - Background eviction of finished sessions

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use billing_core::{Clock, SystemClock};
use billing_engine::{BillingConfig, SessionEngine};
use payment_gateway::{FinternetClient, GatewayConfig, PaymentGateway};
use session_store::{StoreBackend, StoreConfig};
use telemetry::{health, init_tracing_from_env};
use worker::{probe_dependencies, WorkerConfig, WorkerScheduler};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    gateway: GatewayConfig,

    #[serde(default)]
    store: StoreConfig,

    #[serde(default)]
    billing: BillingConfig,

    #[serde(default)]
    worker: WorkerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            gateway: GatewayConfig::default(),
            store: StoreConfig::default(),
            billing: BillingConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Murph billing service v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config()?;

    info!(
        gateway = %config.gateway.trimmed_base_url(),
        store = ?config.store.backend,
        teaching_ceiling = config.billing.teaching_lock_ceiling_minutes,
        video_ceiling = config.billing.video_lock_ceiling_minutes,
        "Loaded configuration"
    );
    if config.gateway.api_key.is_empty() {
        warn!("No gateway API key configured; gateway calls will likely be rejected");
    }

    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        FinternetClient::new(config.gateway.clone()).context("Failed to create gateway client")?,
    );

    let store = session_store::connect(&config.store)
        .await
        .context("Failed to connect to session store")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Check health and update status
    probe_dependencies(gateway.as_ref(), store.as_ref()).await;
    log_health();

    let engine = Arc::new(SessionEngine::new(
        gateway.clone(),
        store.clone(),
        clock.clone(),
        config.billing.clone(),
    ));

    let retention = chrono::Duration::seconds(config.store.terminal_ttl_secs as i64);
    let worker_scheduler = Arc::new(WorkerScheduler::new(
        config.worker.clone(),
        store.clone(),
        gateway.clone(),
        clock.clone(),
        retention,
    ));
    let worker_handles = worker_scheduler.start();

    let app = router(AppState::new(engine));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");
    for handle in worker_handles {
        handle.abort();
    }

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        .add_source(config::Config::try_from(&Config::default())?)
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("MURPH")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Single-underscore names for the settings deployments set most often
    if let Ok(url) = std::env::var("MURPH_GATEWAY_BASE_URL") {
        config.gateway.base_url = url;
    }
    if let Ok(key) = std::env::var("MURPH_GATEWAY_API_KEY") {
        config.gateway.api_key = key;
    }
    if let Ok(backend) = std::env::var("MURPH_STORE_BACKEND") {
        config.store.backend = StoreBackend::parse(&backend)
            .with_context(|| format!("Unknown store backend: {}", backend))?;
    }
    if let Ok(url) = std::env::var("MURPH_STORE_REDIS_URL") {
        config.store.redis_url = url;
    }

    Ok(config)
}

fn log_health() {
    for (name, component) in [("Gateway", &health().gateway), ("Session store", &health().store)] {
        if component.is_healthy() {
            info!("{} connection: healthy", name);
        } else {
            error!("{} connection: unhealthy", name);
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
