//! Feed Configuration Settings
//!
//! Configuration types for the bar feed, loaded from environment
//! variables.

use std::time::Duration;

use crate::domain::instrument::Ticker;

/// TradeStation environment (simulation vs live).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Simulation environment.
    #[default]
    Simulation,
    /// Live environment.
    Live,
}

impl Environment {
    /// Parse environment from string.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "LIVE" => Self::Live,
            _ => Self::Simulation,
        }
    }

    /// Check if this is the live environment.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Live)
    }

    /// Get the environment name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Simulation => "simulation",
            Self::Live => "live",
        }
    }

    /// Base URL of the v2 API (token and authorize endpoints).
    #[must_use]
    pub const fn host_v2(&self) -> &'static str {
        match self {
            Self::Simulation => "https://sim.api.tradestation.com/v2",
            Self::Live => "https://api.tradestation.com/v2",
        }
    }

    /// Base URL of the v3 API (streaming endpoints).
    #[must_use]
    pub const fn host_v3(&self) -> &'static str {
        match self {
            Self::Simulation => "https://sim.api.tradestation.com/v3",
            Self::Live => "https://api.tradestation.com/v3",
        }
    }
}

/// TradeStation API client credentials.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// Get the client id (API key).
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Get the client secret.
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &"[REDACTED]")
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// Streaming connection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Idle-read timeout; if no line (not even a heartbeat) arrives
    /// within this window the connection is considered dead.
    pub idle_timeout: Duration,
    /// Fixed delay between a failed connection and the next attempt.
    pub reconnect_backoff: Duration,
    /// Bars of history requested on each (re)connect.
    pub bars_back: u32,
    /// Consecutive idle timeouts tolerated before the session fails
    /// permanently (0 = unlimited).
    pub max_consecutive_timeouts: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(90),
            reconnect_backoff: Duration::from_secs(1),
            bars_back: 1,
            max_consecutive_timeouts: 0, // Unlimited
        }
    }
}

/// Background token refresh cadence.
#[derive(Debug, Clone)]
pub struct RefreshSettings {
    /// Delay after a successful refresh.
    pub interval: Duration,
    /// Shortened delay after a failed refresh.
    pub retry_interval: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10 * 60),
            retry_interval: Duration::from_secs(2 * 60),
        }
    }
}

/// Complete feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// TradeStation environment.
    pub environment: Environment,
    /// API credentials.
    pub credentials: Credentials,
    /// OAuth redirect URI captured by the loopback listener.
    pub redirect_uri: String,
    /// Instruments to stream.
    pub tickers: Vec<Ticker>,
    /// Streaming connection settings.
    pub stream: StreamSettings,
    /// Token refresh cadence.
    pub refresh: RefreshSettings,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing
    /// or empty, or if the ticker list contains an invalid symbol.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client_id =
            std::env::var("TS_KEY").map_err(|_| ConfigError::MissingEnvVar("TS_KEY".to_string()))?;
        let client_secret = std::env::var("TS_SECRET")
            .map_err(|_| ConfigError::MissingEnvVar("TS_SECRET".to_string()))?;

        if client_id.is_empty() {
            return Err(ConfigError::EmptyValue("TS_KEY".to_string()));
        }
        if client_secret.is_empty() {
            return Err(ConfigError::EmptyValue("TS_SECRET".to_string()));
        }

        let environment = std::env::var("TS_ENV")
            .map(|s| Environment::from_str_case_insensitive(&s))
            .unwrap_or_default();

        let redirect_uri = std::env::var("TS_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:1234/".to_string());

        let tickers_raw = std::env::var("TS_TICKERS")
            .map_err(|_| ConfigError::MissingEnvVar("TS_TICKERS".to_string()))?;
        let tickers = parse_ticker_list(&tickers_raw)?;
        if tickers.is_empty() {
            return Err(ConfigError::EmptyValue("TS_TICKERS".to_string()));
        }

        let stream = StreamSettings {
            idle_timeout: parse_env_duration_secs(
                "BAR_FEED_IDLE_TIMEOUT_SECS",
                StreamSettings::default().idle_timeout,
            ),
            reconnect_backoff: parse_env_duration_millis(
                "BAR_FEED_RECONNECT_BACKOFF_MS",
                StreamSettings::default().reconnect_backoff,
            ),
            bars_back: parse_env_u32("BAR_FEED_BARS_BACK", StreamSettings::default().bars_back),
            max_consecutive_timeouts: parse_env_u32(
                "BAR_FEED_MAX_CONSECUTIVE_TIMEOUTS",
                StreamSettings::default().max_consecutive_timeouts,
            ),
        };

        let refresh = RefreshSettings {
            interval: parse_env_duration_secs(
                "BAR_FEED_REFRESH_INTERVAL_SECS",
                RefreshSettings::default().interval,
            ),
            retry_interval: parse_env_duration_secs(
                "BAR_FEED_REFRESH_RETRY_SECS",
                RefreshSettings::default().retry_interval,
            ),
        };

        Ok(Self {
            environment,
            credentials: Credentials::new(client_id, client_secret),
            redirect_uri,
            tickers,
            stream,
            refresh,
        })
    }
}

/// Parse a comma-separated ticker list.
fn parse_ticker_list(raw: &str) -> Result<Vec<Ticker>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Ticker::new(s).map_err(|e| ConfigError::InvalidTicker(e.to_string())))
        .collect()
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Ticker list contains an unusable symbol.
    #[error("invalid ticker: {0}")]
    InvalidTicker(String),
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing() {
        assert_eq!(
            Environment::from_str_case_insensitive("live"),
            Environment::Live
        );
        assert_eq!(
            Environment::from_str_case_insensitive("LIVE"),
            Environment::Live
        );
        assert_eq!(
            Environment::from_str_case_insensitive("simulation"),
            Environment::Simulation
        );
        assert_eq!(
            Environment::from_str_case_insensitive("unknown"),
            Environment::Simulation
        );
    }

    #[test]
    fn environment_hosts() {
        assert_eq!(
            Environment::Simulation.host_v2(),
            "https://sim.api.tradestation.com/v2"
        );
        assert_eq!(
            Environment::Live.host_v3(),
            "https://api.tradestation.com/v3"
        );
        assert!(Environment::Live.is_live());
        assert!(!Environment::Simulation.is_live());
    }

    #[test]
    fn credentials_redacted_debug() {
        let creds = Credentials::new("key123".to_string(), "secret456".to_string());
        let debug = format!("{creds:?}");
        assert!(!debug.contains("key123"));
        assert!(!debug.contains("secret456"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn stream_settings_defaults() {
        let settings = StreamSettings::default();
        assert_eq!(settings.idle_timeout, Duration::from_secs(90));
        assert_eq!(settings.reconnect_backoff, Duration::from_secs(1));
        assert_eq!(settings.bars_back, 1);
        assert_eq!(settings.max_consecutive_timeouts, 0);
    }

    #[test]
    fn refresh_settings_defaults() {
        let settings = RefreshSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(600));
        assert_eq!(settings.retry_interval, Duration::from_secs(120));
    }

    #[test]
    fn ticker_list_parsing() {
        let tickers = parse_ticker_list("ESZ24, NQZ24,,YMZ24 ").unwrap();
        assert_eq!(
            tickers
                .iter()
                .map(Ticker::as_str)
                .collect::<Vec<_>>(),
            vec!["ESZ24", "NQZ24", "YMZ24"]
        );
    }
}
