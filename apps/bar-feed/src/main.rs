//! Bar Feed Binary
//!
//! Starts the realtime bar ingester.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin bar-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `TS_KEY`: TradeStation API key (OAuth client id)
//! - `TS_SECRET`: TradeStation API secret
//! - `TS_TICKERS`: Comma-separated instruments to stream
//!
//! ## Optional
//! - `TS_ENV`: SIMULATION | LIVE (default: SIMULATION)
//! - `TS_REDIRECT_URI`: OAuth redirect URI (default: <http://localhost:1234/>)
//! - `BAR_FEED_IDLE_TIMEOUT_SECS`: Idle-read timeout (default: 90)
//! - `BAR_FEED_RECONNECT_BACKOFF_MS`: Reconnect delay (default: 1000)
//! - `BAR_FEED_BARS_BACK`: History bars per (re)connect (default: 1)
//! - `BAR_FEED_MAX_CONSECUTIVE_TIMEOUTS`: Timeout budget, 0 = unlimited (default: 0)
//! - `BAR_FEED_REFRESH_INTERVAL_SECS`: Refresh cadence after success (default: 600)
//! - `BAR_FEED_REFRESH_RETRY_SECS`: Refresh cadence after failure (default: 120)
//! - `RUST_LOG`: Log level (default: bar_feed=info)

use std::sync::Arc;
use std::time::Duration;

use bar_feed::infrastructure::auth::{
    FileTokenCache, LoopbackCodeListener, RefreshScheduler, TokenClient, TokenStore, bootstrap,
};
use bar_feed::infrastructure::stream::{
    FeedEvent, SessionConfig, SessionEvent, SessionHandle, SessionSupervisor,
};
use bar_feed::infrastructure::telemetry;
use bar_feed::{FeedConfig, Ticker};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    telemetry::init();

    tracing::info!("Starting bar feed");

    let config = FeedConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    // Acquire the initial credential before anything streams.
    let token_client = Arc::new(TokenClient::new(
        config.credentials.clone(),
        config.redirect_uri.clone(),
        config.environment.host_v2(),
    )?);
    let token_store = Arc::new(TokenStore::default());
    let token_cache = FileTokenCache::default_location();
    let code_listener = LoopbackCodeListener::new(config.redirect_uri.clone());

    bootstrap(&token_client, &token_store, &token_cache, &code_listener).await?;

    // Keep the credential fresh for the process lifetime.
    let refresh = RefreshScheduler::new(
        Arc::clone(&token_client),
        Arc::clone(&token_store),
        config.refresh.clone(),
        shutdown_token.clone(),
    );
    tokio::spawn(refresh.run());

    // One streaming session per instrument, fanned into one channel.
    let (event_tx, event_rx) = mpsc::channel::<FeedEvent>(1024);
    tokio::spawn(handle_feed_events(event_rx));

    let supervisor = SessionSupervisor::new(
        SessionConfig {
            host_v3: config.environment.host_v3().to_string(),
            settings: config.stream.clone(),
        },
        Arc::clone(&token_store),
        event_tx,
        shutdown_token.clone(),
        std::env::current_dir()?,
    )?;

    let handles = supervisor.start_all(&config.tickers);
    let completions = watch_first_lines(handles);

    tracing::info!(sessions = completions.len(), "Bar feed ready");

    await_shutdown(shutdown_token).await;
    drain_sessions(completions).await;

    tracing::info!("Bar feed stopped");
    Ok(())
}

/// Consume session events and surface them as structured logs.
async fn handle_feed_events(mut rx: mpsc::Receiver<FeedEvent>) {
    while let Some(FeedEvent { ticker, event }) = rx.recv().await {
        match event {
            SessionEvent::Streaming => {
                tracing::info!(ticker = %ticker, "Feed streaming");
            }
            SessionEvent::Reconnecting { attempt } => {
                tracing::info!(ticker = %ticker, attempt, "Feed reconnecting");
            }
            SessionEvent::Bar { bar, suspect } => {
                if suspect {
                    tracing::warn!(ticker = %ticker, %bar, "Suspect bar (all prices zero)");
                } else {
                    tracing::info!(ticker = %ticker, %bar, "Bar");
                }
            }
            SessionEvent::Stopped => {
                tracing::info!(ticker = %ticker, "Feed stopped");
            }
            SessionEvent::Failed(reason) => {
                tracing::error!(ticker = %ticker, reason, "Feed failed permanently");
            }
        }
    }
}

/// Log per-session first-line liveness; returns the completion half
/// of each handle for the shutdown drain.
fn watch_first_lines(handles: Vec<SessionHandle>) -> Vec<SessionCompletion> {
    handles
        .into_iter()
        .map(|handle| {
            let SessionHandle {
                ticker,
                started,
                completed,
            } = handle;

            let started_ticker = ticker.clone();
            tokio::spawn(async move {
                if started.await.is_ok() {
                    tracing::info!(ticker = %started_ticker, "First line received");
                }
            });

            (ticker, completed)
        })
        .collect()
}

type SessionCompletion = (
    Ticker,
    tokio::sync::oneshot::Receiver<Result<(), bar_feed::SessionError>>,
);

/// Wait (bounded) for every session to acknowledge cancellation.
async fn drain_sessions(completions: Vec<SessionCompletion>) {
    let drain = async {
        for (ticker, completed) in completions {
            match completed.await {
                Ok(Ok(())) => {
                    tracing::debug!(ticker = %ticker, "Session drained");
                }
                Ok(Err(e)) => {
                    tracing::warn!(ticker = %ticker, error = %e, "Session ended in error");
                }
                Err(_) => {
                    tracing::warn!(ticker = %ticker, "Session task dropped its handle");
                }
            }
        }
    };

    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Shutdown timeout elapsed with sessions still running"
        );
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        environment = config.environment.as_str(),
        tickers = config.tickers.len(),
        idle_timeout_secs = config.stream.idle_timeout.as_secs(),
        reconnect_backoff_ms = u64::try_from(config.stream.reconnect_backoff.as_millis())
            .unwrap_or(u64::MAX),
        refresh_interval_secs = config.refresh.interval.as_secs(),
        "Configuration loaded"
    );
    tracing::debug!(
        host_v2 = config.environment.host_v2(),
        host_v3 = config.environment.host_v3(),
        redirect_uri = %config.redirect_uri,
        "API endpoints"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
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
