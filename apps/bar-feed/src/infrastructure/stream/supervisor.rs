//! Session Supervisor
//!
//! Spawns one [`StreamSession`] task per configured instrument, all
//! sharing one HTTP client, one token store, and one cancellation
//! token. Hands back a handle per session so the binary can await
//! first-line liveness and final completion.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::application::ports::SessionLog;
use crate::domain::instrument::Ticker;
use crate::infrastructure::auth::TokenStore;
use crate::infrastructure::logsink::{FileSessionLog, NullSessionLog};

use super::session::{FeedEvent, SessionConfig, SessionError, StreamSession};

/// Handle to one spawned session.
#[derive(Debug)]
pub struct SessionHandle {
    /// The instrument this session streams.
    pub ticker: Ticker,
    /// Resolves once, when the session receives its first line.
    pub started: oneshot::Receiver<()>,
    /// Resolves when the session task exits.
    pub completed: oneshot::Receiver<Result<(), SessionError>>,
}

/// Spawns and wires streaming sessions.
pub struct SessionSupervisor {
    config: SessionConfig,
    http: reqwest::Client,
    tokens: Arc<TokenStore>,
    events: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
    log_dir: PathBuf,
}

impl SessionSupervisor {
    /// Create a supervisor.
    ///
    /// The HTTP client carries no global timeout; the session bounds
    /// the header wait and every body read with the idle timeout.
    ///
    /// # Errors
    ///
    /// Returns the underlying error if the HTTP client cannot be
    /// constructed.
    pub fn new(
        config: SessionConfig,
        tokens: Arc<TokenStore>,
        events: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
        log_dir: PathBuf,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config,
            http,
            tokens,
            events,
            cancel,
            log_dir,
        })
    }

    /// Spawn one session per instrument.
    #[must_use]
    pub fn start_all(&self, tickers: &[Ticker]) -> Vec<SessionHandle> {
        tickers.iter().map(|t| self.start(t)).collect()
    }

    /// Spawn one session.
    fn start(&self, ticker: &Ticker) -> SessionHandle {
        let (started_tx, started_rx) = oneshot::channel();
        let (completed_tx, completed_rx) = oneshot::channel();

        let log = self.open_session_log(ticker);

        let session = StreamSession::new(
            ticker.clone(),
            self.config.clone(),
            self.http.clone(),
            Arc::clone(&self.tokens),
            log,
            self.events.clone(),
            self.cancel.clone(),
            started_tx,
        );

        tokio::spawn(async move {
            let result = session.run().await;
            let _ = completed_tx.send(result);
        });

        SessionHandle {
            ticker: ticker.clone(),
            started: started_rx,
            completed: completed_rx,
        }
    }

    /// Open the per-instrument log file, falling back to a discard
    /// sink when the file cannot be opened.
    fn open_session_log(&self, ticker: &Ticker) -> Arc<dyn SessionLog> {
        match FileSessionLog::create(&self.log_dir, ticker) {
            Ok(log) => Arc::new(log),
            Err(e) => {
                tracing::warn!(
                    ticker = %ticker,
                    error = %e,
                    "Session log unavailable, lines will not be persisted"
                );
                Arc::new(NullSessionLog)
            }
        }
    }
}

impl std::fmt::Debug for SessionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSupervisor")
            .field("config", &self.config)
            .field("log_dir", &self.log_dir)
            .finish_non_exhaustive()
    }
}
