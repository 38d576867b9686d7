#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Bar Feed - TradeStation Realtime Bar Ingester
//!
//! Maintains one long-lived streaming HTTP connection per configured
//! instrument to TradeStation's minute-barchart stream, and keeps the
//! OAuth2 bearer credential those connections depend on fresh in the
//! background.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: Core data types with no external dependencies
//!   - `instrument`: Validated ticker symbols
//!   - `bar`: The streamed bar payload and price sanity checks
//!   - `credential`: The OAuth credential and its cached form
//!
//! - **Application**: Port definitions
//!   - `ports`: Interfaces for the code receiver, token cache, and
//!     per-instrument log sink
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `auth`: Token endpoint client, store, bootstrap, refresh loop,
//!     loopback redirect listener, on-disk cache
//!   - `stream`: Line classifier, bounded line reads, per-instrument
//!     session state machine, session supervisor
//!   - `config`: Environment-driven configuration
//!   - `logsink`: Append-only `Log{TICKER}.txt` files
//!   - `telemetry`: Tracing initialization
//!
//! # Data Flow
//!
//! ```text
//! barchart stream (per ticker) ──► StreamSession ──┐
//! barchart stream (per ticker) ──► StreamSession ──┼──► FeedEvent channel ──► consumer
//!                                       ▲          │
//!                TokenStore (bearer) ───┘◄── RefreshScheduler
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core data types with no external dependencies.
pub mod domain;

/// Application layer - Port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::bar::StreamingBar;
pub use domain::credential::{CachedCredential, Credential, TokenRefresh};
pub use domain::instrument::Ticker;

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, Credentials, Environment, FeedConfig, RefreshSettings, StreamSettings,
};

// Token lifecycle
pub use infrastructure::auth::{
    BootstrapError, FileTokenCache, LoopbackCodeListener, RefreshScheduler, TokenClient,
    TokenStore, bootstrap,
};

// Streaming (for integration tests)
pub use infrastructure::stream::{
    FeedEvent, SessionConfig, SessionError, SessionEvent, SessionHandle, SessionSupervisor,
    SessionState, StreamSession,
};
