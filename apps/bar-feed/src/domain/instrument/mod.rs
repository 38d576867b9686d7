//! Instrument Identifiers
//!
//! A `Ticker` is the TradeStation symbol of one streamed instrument
//! (e.g. `ESZ24`). It doubles as the per-session log key and is
//! percent-encoded into the stream request path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error constructing a [`Ticker`].
#[derive(Debug, Clone, Error)]
pub enum InstrumentError {
    /// Symbol was empty or whitespace.
    #[error("ticker symbol cannot be empty")]
    EmptySymbol,
}

/// Immutable instrument symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Create a ticker from a symbol string.
    ///
    /// # Errors
    ///
    /// Returns [`InstrumentError::EmptySymbol`] if the symbol is empty
    /// after trimming.
    pub fn new(symbol: impl Into<String>) -> Result<Self, InstrumentError> {
        let symbol = symbol.into();
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err(InstrumentError::EmptySymbol);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_trims_whitespace() {
        let ticker = Ticker::new("  ESZ24 ").unwrap();
        assert_eq!(ticker.as_str(), "ESZ24");
    }

    #[test]
    fn empty_ticker_rejected() {
        assert!(Ticker::new("").is_err());
        assert!(Ticker::new("   ").is_err());
    }

    #[test]
    fn ticker_display() {
        let ticker = Ticker::new("NQZ24").unwrap();
        assert_eq!(ticker.to_string(), "NQZ24");
    }
}
