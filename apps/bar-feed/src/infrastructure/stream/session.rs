//! Streaming Bar Session
//!
//! One session per instrument. Each session owns its connection to
//! the barchart stream endpoint, reads lines until the connection
//! dies, then reconnects after a fixed backoff. Sessions never share
//! fate: a dead connection on one instrument does not disturb the
//! others.
//!
//! ## Session Lifecycle
//!
//! ```text
//! Connecting -> Streaming -> Reconnecting -> Connecting -> ...
//!                   |
//!                   +-> Stopped  (cancellation)
//!                   +-> Failed   (timeout budget exhausted, or an
//!                                 unclassified fault)
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::application::ports::SessionLog;
use crate::domain::bar::StreamingBar;
use crate::domain::instrument::Ticker;
use crate::infrastructure::auth::TokenStore;
use crate::infrastructure::config::StreamSettings;

use super::classify::{LineKind, classify};
use super::lines::{LineStream, ReadOutcome};

// ============================================================================
// Types
// ============================================================================

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Building a connection to the stream endpoint.
    Connecting,
    /// Connected and consuming lines.
    Streaming,
    /// Connection lost; waiting out the backoff.
    Reconnecting,
    /// Cancelled; the session will not reconnect.
    Stopped,
    /// Permanently failed; the session will not reconnect.
    Failed,
}

impl SessionState {
    /// Lowercase name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

/// Event emitted by one session.
#[derive(Debug)]
pub enum SessionEvent {
    /// The session connected and entered the streaming state.
    Streaming,
    /// The session lost its connection and is about to retry.
    Reconnecting {
        /// Reconnect attempts so far, including this one.
        attempt: u64,
    },
    /// A bar was parsed off the stream.
    Bar {
        /// The parsed bar.
        bar: StreamingBar,
        /// All four prices were zero; consumers should not trade on
        /// this bar.
        suspect: bool,
    },
    /// The session observed cancellation and exited cleanly.
    Stopped,
    /// The session exited permanently with an error.
    Failed(String),
}

/// Session event tagged with its instrument.
#[derive(Debug)]
pub struct FeedEvent {
    /// The instrument the event belongs to.
    pub ticker: Ticker,
    /// What happened.
    pub event: SessionEvent,
}

/// Terminal session error.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The consecutive idle-timeout budget was exhausted.
    #[error("stream exceeded {limit} consecutive idle timeouts")]
    TooManyTimeouts {
        /// Configured limit.
        limit: u32,
    },

    /// A read failed in a way the retry taxonomy does not cover.
    #[error("unexpected stream fault: {0}")]
    Unexpected(String),
}

/// Endpoint and tuning shared by all sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the v3 API.
    pub host_v3: String,
    /// Connection tuning.
    pub settings: StreamSettings,
}

/// Outcome of one connection attempt, before retry policy.
enum ConnectionEnd {
    Reconnect,
    Cancelled,
}

// ============================================================================
// Session
// ============================================================================

/// A single instrument's streaming session.
pub struct StreamSession {
    ticker: Ticker,
    config: SessionConfig,
    http: reqwest::Client,
    tokens: Arc<TokenStore>,
    log: Arc<dyn SessionLog>,
    events: mpsc::Sender<FeedEvent>,
    cancel: CancellationToken,
    state: SessionState,
    consecutive_timeouts: u32,
    reconnect_attempts: u64,
    started: Option<oneshot::Sender<()>>,
}

impl StreamSession {
    /// Create a session; call [`run`](Self::run) to drive it.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ticker: Ticker,
        config: SessionConfig,
        http: reqwest::Client,
        tokens: Arc<TokenStore>,
        log: Arc<dyn SessionLog>,
        events: mpsc::Sender<FeedEvent>,
        cancel: CancellationToken,
        started: oneshot::Sender<()>,
    ) -> Self {
        Self {
            ticker,
            config,
            http,
            tokens,
            log,
            events,
            cancel,
            state: SessionState::Connecting,
            consecutive_timeouts: 0,
            reconnect_attempts: 0,
            started: Some(started),
        }
    }

    /// Drive the session until cancellation or permanent failure.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the session fails permanently;
    /// cancellation is a clean `Ok(())`.
    pub async fn run(mut self) -> Result<(), SessionError> {
        loop {
            if self.cancel.is_cancelled() {
                self.transition(SessionState::Stopped);
                self.emit(SessionEvent::Stopped).await;
                return Ok(());
            }

            self.transition(SessionState::Connecting);

            let end = match self.connect_and_stream().await {
                Ok(end) => end,
                Err(e) => {
                    self.transition(SessionState::Failed);
                    self.log.append(&format!("session failed: {e}"));
                    self.emit(SessionEvent::Failed(e.to_string())).await;
                    return Err(e);
                }
            };

            match end {
                ConnectionEnd::Cancelled => {
                    self.transition(SessionState::Stopped);
                    self.emit(SessionEvent::Stopped).await;
                    return Ok(());
                }
                ConnectionEnd::Reconnect => {
                    self.reconnect_attempts += 1;
                    self.transition(SessionState::Reconnecting);
                    self.emit(SessionEvent::Reconnecting {
                        attempt: self.reconnect_attempts,
                    })
                    .await;

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            self.transition(SessionState::Stopped);
                            self.emit(SessionEvent::Stopped).await;
                            return Ok(());
                        }
                        () = tokio::time::sleep(self.config.settings.reconnect_backoff) => {}
                    }
                }
            }
        }
    }

    /// Open one connection and consume it until it dies.
    async fn connect_and_stream(&mut self) -> Result<ConnectionEnd, SessionError> {
        // A malformed endpoint never becomes valid by retrying.
        let url = self.stream_url()?;

        let access_token = self.tokens.snapshot().access_token;
        let request = self.http.get(url).bearer_auth(access_token).send();

        // The idle timeout bounds the wait for response headers too;
        // a server that accepts TCP and then goes silent must not
        // stall the session past one idle window.
        let response = tokio::select! {
            () = self.cancel.cancelled() => return Ok(ConnectionEnd::Cancelled),
            result = tokio::time::timeout(self.config.settings.idle_timeout, request) => {
                match result {
                    Err(_) => return self.register_timeout().map(|()| ConnectionEnd::Reconnect),
                    Ok(Ok(response)) => response,
                    Ok(Err(e)) => {
                        self.log.append(&format!("connect failed: {e}"));
                        return Ok(ConnectionEnd::Reconnect);
                    }
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            self.log.append(&format!("connect rejected: HTTP {status}"));
            return Ok(ConnectionEnd::Reconnect);
        }

        self.transition(SessionState::Streaming);
        self.emit(SessionEvent::Streaming).await;

        let mut lines = LineStream::new(response, self.config.settings.idle_timeout);

        loop {
            let outcome = tokio::select! {
                () = self.cancel.cancelled() => return Ok(ConnectionEnd::Cancelled),
                outcome = lines.next_line() => outcome,
            };

            match outcome {
                ReadOutcome::Line(line) => {
                    if let Some(end) = self.handle_line(&line).await {
                        return Ok(end);
                    }
                }
                ReadOutcome::EndOfStream => {
                    self.log.append("stream ended");
                    return Ok(ConnectionEnd::Reconnect);
                }
                ReadOutcome::Timeout => {
                    return self.register_timeout().map(|()| ConnectionEnd::Reconnect);
                }
                ReadOutcome::ConnectionFault(detail) => {
                    self.log.append(&format!("connection fault: {detail}"));
                    return Ok(ConnectionEnd::Reconnect);
                }
                ReadOutcome::ProtocolFault(detail) => {
                    self.log.append(&format!("protocol fault: {detail}"));
                    return Ok(ConnectionEnd::Reconnect);
                }
                ReadOutcome::Fault(detail) => {
                    return Err(SessionError::Unexpected(detail));
                }
            }
        }
    }

    /// Count one idle timeout against the consecutive budget.
    ///
    /// Returns `Err` once the budget is exhausted; `Ok` means the
    /// caller may reconnect.
    fn register_timeout(&mut self) -> Result<(), SessionError> {
        self.consecutive_timeouts += 1;
        let limit = self.config.settings.max_consecutive_timeouts;
        if limit > 0 && self.consecutive_timeouts > limit {
            return Err(SessionError::TooManyTimeouts { limit });
        }
        self.log.append(&format!(
            "idle timeout ({} consecutive)",
            self.consecutive_timeouts
        ));
        Ok(())
    }

    /// Process one received line. Returns `Some` when the connection
    /// must end.
    async fn handle_line(&mut self, line: &str) -> Option<ConnectionEnd> {
        // First line of the first connection proves the feed is live.
        if let Some(started) = self.started.take() {
            let _ = started.send(());
        }

        self.log.append(line);

        match classify(line) {
            LineKind::StreamError(detail) => {
                tracing::warn!(ticker = %self.ticker, detail, "Server error on stream");
                Some(ConnectionEnd::Reconnect)
            }
            LineKind::Heartbeat => {
                self.consecutive_timeouts = 0;
                None
            }
            LineKind::Data(payload) => {
                match serde_json::from_str::<StreamingBar>(payload) {
                    Ok(bar) => {
                        self.consecutive_timeouts = 0;
                        let suspect = bar.is_suspect();
                        if suspect {
                            self.log.append("suspect bar: all prices zero");
                        }
                        self.emit(SessionEvent::Bar { bar, suspect }).await;
                    }
                    Err(e) => {
                        // Unparseable lines are dropped, never replayed
                        // as stale data.
                        self.log.append(&format!("bogus line skipped: {e}"));
                    }
                }
                None
            }
        }
    }

    /// Build the barchart stream URL for this instrument.
    fn stream_url(&self) -> Result<reqwest::Url, SessionError> {
        let mut url = reqwest::Url::parse(&self.config.host_v3)
            .map_err(|e| SessionError::Unexpected(format!("bad stream host: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| SessionError::Unexpected("stream host cannot be a base URL".to_string()))?
            .extend(["marketdata", "stream", "barcharts", self.ticker.as_str()]);
        url.query_pairs_mut()
            .append_pair("interval", "1")
            .append_pair("unit", "minute")
            .append_pair("barsback", &self.config.settings.bars_back.to_string());
        Ok(url)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        tracing::info!(
            ticker = %self.ticker,
            from = self.state.as_str(),
            to = next.as_str(),
            "Session state change"
        );
        self.log
            .append(&format!("state: {} -> {}", self.state.as_str(), next.as_str()));
        self.state = next;
    }

    async fn emit(&self, event: SessionEvent) {
        let _ = self
            .events
            .send(FeedEvent {
                ticker: self.ticker.clone(),
                event,
            })
            .await;
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("ticker", &self.ticker)
            .field("state", &self.state)
            .field("consecutive_timeouts", &self.consecutive_timeouts)
            .field("reconnect_attempts", &self.reconnect_attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_config() -> SessionConfig {
        SessionConfig {
            host_v3: "https://sim.api.tradestation.com/v3".to_string(),
            settings: StreamSettings::default(),
        }
    }

    fn test_session(ticker: &str) -> StreamSession {
        let (events, _rx) = mpsc::channel(16);
        let (started, _started_rx) = oneshot::channel();
        StreamSession::new(
            Ticker::new(ticker).unwrap(),
            session_config(),
            reqwest::Client::new(),
            Arc::new(TokenStore::default()),
            Arc::new(crate::infrastructure::logsink::NullSessionLog),
            events,
            CancellationToken::new(),
            started,
        )
    }

    #[test]
    fn stream_url_shape() {
        let session = test_session("ESZ24");
        let url = session.stream_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://sim.api.tradestation.com/v3/marketdata/stream/barcharts/ESZ24?interval=1&unit=minute&barsback=1"
        );
    }

    #[test]
    fn stream_url_encodes_symbol() {
        let session = test_session("@ES=107XN");
        let url = session.stream_url().unwrap();
        assert!(url.path().ends_with("/barcharts/@ES=107XN"));
    }

    #[tokio::test]
    async fn heartbeat_resets_timeout_counter() {
        let mut session = test_session("ESZ24");
        session.consecutive_timeouts = 4;
        let end = session.handle_line("{\"Heartbeat\":7}").await;
        assert!(end.is_none());
        assert_eq!(session.consecutive_timeouts, 0);
    }

    #[tokio::test]
    async fn parsed_bar_resets_timeout_counter_and_emits() {
        let (events, mut rx) = mpsc::channel(16);
        let (started, started_rx) = oneshot::channel();
        let mut session = StreamSession::new(
            Ticker::new("ESZ24").unwrap(),
            session_config(),
            reqwest::Client::new(),
            Arc::new(TokenStore::default()),
            Arc::new(crate::infrastructure::logsink::NullSessionLog),
            events,
            CancellationToken::new(),
            started,
        );
        session.consecutive_timeouts = 2;

        let end = session
            .handle_line(r#"{"High":5000.25,"Low":4999.0,"Open":4999.5,"Close":5000.0,"TotalVolume":"1200"}"#)
            .await;
        assert!(end.is_none());
        assert_eq!(session.consecutive_timeouts, 0);
        assert!(started_rx.await.is_ok());

        let FeedEvent { ticker, event } = rx.recv().await.unwrap();
        assert_eq!(ticker.as_str(), "ESZ24");
        match event {
            SessionEvent::Bar { bar, suspect } => {
                assert!(!suspect);
                assert!((bar.close - 5000.0).abs() < 1e-9);
            }
            other => panic!("expected bar event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn zero_price_bar_is_flagged_suspect() {
        let (events, mut rx) = mpsc::channel(16);
        let (started, _started_rx) = oneshot::channel();
        let mut session = StreamSession::new(
            Ticker::new("ESZ24").unwrap(),
            session_config(),
            reqwest::Client::new(),
            Arc::new(TokenStore::default()),
            Arc::new(crate::infrastructure::logsink::NullSessionLog),
            events,
            CancellationToken::new(),
            started,
        );

        session
            .handle_line(r#"{"High":0,"Low":0,"Open":0,"Close":0}"#)
            .await;

        let FeedEvent { event, .. } = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::Bar { suspect: true, .. }));
    }

    #[tokio::test]
    async fn malformed_line_is_skipped_without_event() {
        let (events, mut rx) = mpsc::channel(16);
        let (started, _started_rx) = oneshot::channel();
        let mut session = StreamSession::new(
            Ticker::new("ESZ24").unwrap(),
            session_config(),
            reqwest::Client::new(),
            Arc::new(TokenStore::default()),
            Arc::new(crate::infrastructure::logsink::NullSessionLog),
            events,
            CancellationToken::new(),
            started,
        );
        session.consecutive_timeouts = 3;

        let end = session.handle_line("{not json at all").await;
        assert!(end.is_none());
        // A bogus line proves nothing about liveness.
        assert_eq!(session.consecutive_timeouts, 3);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn server_error_line_forces_reconnect() {
        let mut session = test_session("ESZ24");
        let end = session.handle_line("ERROR: session expired").await;
        assert!(matches!(end, Some(ConnectionEnd::Reconnect)));
    }
}
