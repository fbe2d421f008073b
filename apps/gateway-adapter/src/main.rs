//! Gateway Adapter Binary
//!
//! Connects to the brokerage gateway, keeps the session alive, mirrors
//! positions, open orders and account values locally, and serves health
//! and metrics over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin gateway-adapter
//! ```
//!
//! # Environment Variables
//!
//! - `GATEWAY_ENV`: PAPER | LIVE (default: PAPER)
//! - `GATEWAY_HOST` / `GATEWAY_PORT` / `GATEWAY_CLIENT_ID`: gateway address and client id
//! - `GATEWAY_TRANSPORT`: tcp | simulated (default: tcp)
//! - `GATEWAY_HEALTH_PORT`: Health check HTTP port (default: 8083)
//! - `GATEWAY_AUTO_RECONNECT`, `GATEWAY_MAX_RECONNECT_ATTEMPTS`, `GATEWAY_RECONNECT_*`: backoff
//! - `GATEWAY_RATE_LIMIT_<CATEGORY>_MAX` / `_WINDOW_SECS`: request quotas
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use gateway_adapter::application::ports::VenueTransport;
use gateway_adapter::application::services::{StateSyncConfig, StateSynchronizer};
use gateway_adapter::infrastructure::health::{HealthServer, HealthServerState};
use gateway_adapter::infrastructure::telemetry;
use gateway_adapter::infrastructure::venue::{SimulatedVenue, TcpBridgeTransport};
use gateway_adapter::{
    ConnectionManager, GatewayConfig, RateLimiterRegistry, StateManager, TransportKind,
    init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

type Synchronizer = StateSynchronizer<ConnectionManager, RateLimiterRegistry>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv_from_ancestors();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting gateway adapter");

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder unavailable, metrics disabled");
    }

    let config = GatewayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let rate_limiters = Arc::new(RateLimiterRegistry::new(|category| {
        config.rate_limits.quota(category)
    }));
    let state = Arc::new(StateManager::new());

    let transport: Arc<dyn VenueTransport> = match config.transport {
        TransportKind::Tcp => Arc::new(TcpBridgeTransport::default()),
        TransportKind::Simulated => Arc::new(SimulatedVenue::new()),
    };
    let connection = ConnectionManager::new(transport, config.connection.clone());

    let synchronizer: Arc<Synchronizer> = Arc::new(StateSynchronizer::new(
        Arc::new(connection.clone()),
        Arc::clone(&rate_limiters),
        Arc::clone(&state),
        StateSyncConfig {
            subscribe_account_updates: config.subscribe_account_updates,
        },
    ));
    register_observers(&connection, &synchronizer);

    // Spawn health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        connection.clone(),
        Arc::clone(&state),
        Arc::clone(&rate_limiters),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    let health_task = tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    match connection.connect_with_settings().await {
        Ok(()) => tracing::info!("Gateway adapter ready"),
        Err(e) if config.connection.auto_reconnect => {
            tracing::warn!(error = %e, "Initial connect failed, reconnecting in background");
            connection.manual_reconnect().await?;
        }
        Err(e) => return Err(e.into()),
    }

    await_shutdown(shutdown_token).await;

    connection.disconnect(true).await;
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, health_task).await.is_err() {
        tracing::warn!("Health server did not stop in time");
    }

    tracing::info!("Gateway adapter stopped");
    Ok(())
}

/// Log lifecycle transitions and keep the state cache in step with the venue.
fn register_observers(connection: &ConnectionManager, synchronizer: &Arc<Synchronizer>) {
    let sync = Arc::clone(synchronizer);
    connection.on_connected(move |session| {
        tracing::info!(
            accounts = ?session.managed_accounts,
            next_request_id = session.next_request_id,
            "Session ready, resyncing state"
        );
        let sync = Arc::clone(&sync);
        tokio::spawn(async move {
            if let Err(e) = sync.resync().await {
                tracing::warn!(error = %e, "State resync failed");
            }
        });
    });

    let sync = Arc::clone(synchronizer);
    connection.on_venue_event(move |event| {
        sync.handle_event(event);
    });

    connection.on_disconnected(|| tracing::warn!("Venue session ended"));
    connection.on_error(|error| {
        tracing::warn!(code = error.code, class = error.class.as_str(), "{error}");
    });
    connection.on_reconnecting(|attempt, max_attempts| {
        tracing::info!(attempt, max_attempts, "Venue reconnection attempt");
    });
    connection.on_reconnect_failed(|error| {
        tracing::error!(error = %error, "Venue reconnection gave up; manual reconnect required");
    });
}

fn log_config(config: &GatewayConfig) {
    tracing::info!(
        environment = config.environment.as_str(),
        endpoint = %config.connection.endpoint(),
        client_id = config.connection.client_id,
        transport = config.transport.as_str(),
        auto_reconnect = config.connection.auto_reconnect,
        max_reconnect_attempts = config.connection.max_reconnect_attempts,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(rate_limits = ?config.rate_limits, "Request quotas");
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
