//! Streaming Bar Wire Types
//!
//! Wire format for TradeStation's barchart stream. One JSON object per
//! line; TradeStation quotes some numeric fields as strings
//! (`"TotalVolume": "42311777"`) and sends others bare, so every
//! numeric field accepts either form.
//!
//! # Data quality
//!
//! The stream occasionally delivers bars whose OHLC values are all
//! numerically zero. Those are almost certainly feed artifacts rather
//! than real prices; they are still emitted downstream, only flagged
//! as suspect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Tolerance for treating a floating-point price as zero.
pub const PRICE_EPSILON: f64 = 1e-4;

/// Loose equality for wire prices.
#[must_use]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < PRICE_EPSILON
}

/// Check whether a wire price is indistinguishable from zero.
#[must_use]
pub fn approx_zero(value: f64) -> bool {
    approx_eq(value, 0.0)
}

/// One OHLC bar as delivered by the barchart stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StreamingBar {
    /// Opening price.
    #[serde(deserialize_with = "lenient_f64")]
    pub open: f64,
    /// High price.
    #[serde(deserialize_with = "lenient_f64")]
    pub high: f64,
    /// Low price.
    #[serde(deserialize_with = "lenient_f64")]
    pub low: f64,
    /// Closing price.
    #[serde(deserialize_with = "lenient_f64")]
    pub close: f64,
    /// Bar timestamp (end of interval).
    pub time_stamp: Option<DateTime<Utc>>,
    /// Total traded volume.
    #[serde(deserialize_with = "lenient_i64")]
    pub total_volume: i64,
    /// Number of downticks.
    #[serde(deserialize_with = "lenient_i64")]
    pub down_ticks: i64,
    /// Volume traded on downticks.
    #[serde(deserialize_with = "lenient_i64")]
    pub down_volume: i64,
    /// Open interest (futures).
    #[serde(deserialize_with = "lenient_i64")]
    pub open_interest: i64,
    /// True once the stream has switched from history to realtime bars.
    pub is_realtime: bool,
    /// True on the last historical bar.
    pub is_end_of_history: bool,
    /// Total tick count.
    #[serde(deserialize_with = "lenient_i64")]
    pub total_ticks: i64,
    /// Ticks with no price change.
    #[serde(deserialize_with = "lenient_i64")]
    pub unchanged_ticks: i64,
    /// Volume on unchanged ticks.
    #[serde(deserialize_with = "lenient_i64")]
    pub unchanged_volume: i64,
    /// Number of upticks.
    #[serde(deserialize_with = "lenient_i64")]
    pub up_ticks: i64,
    /// Volume traded on upticks.
    #[serde(deserialize_with = "lenient_i64")]
    pub up_volume: i64,
    /// Bar timestamp as epoch milliseconds.
    #[serde(deserialize_with = "lenient_i64")]
    pub epoch: i64,
    /// Bar lifecycle tag (`Open` / `Closed`).
    pub bar_status: String,
}

impl Default for StreamingBar {
    fn default() -> Self {
        Self {
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            time_stamp: None,
            total_volume: 0,
            down_ticks: 0,
            down_volume: 0,
            open_interest: 0,
            is_realtime: false,
            is_end_of_history: false,
            total_ticks: 0,
            unchanged_ticks: 0,
            unchanged_volume: 0,
            up_ticks: 0,
            up_volume: 0,
            epoch: 0,
            bar_status: String::new(),
        }
    }
}

impl StreamingBar {
    /// A bar is suspect when all four OHLC values sit within
    /// [`PRICE_EPSILON`] of zero.
    #[must_use]
    pub fn is_suspect(&self) -> bool {
        approx_zero(self.open)
            && approx_zero(self.high)
            && approx_zero(self.low)
            && approx_zero(self.close)
    }
}

impl std::fmt::Display for StreamingBar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TimeStamp: {:?}, Open: {}, High: {}, Low: {}, Close: {}, TotalVolume: {}, \
             IsRealtime: {}, BarStatus: {}",
            self.time_stamp,
            self.open,
            self.high,
            self.low,
            self.close,
            self.total_volume,
            self.is_realtime,
            self.bar_status,
        )
    }
}

/// Deserialize an `f64` from either a JSON number or a quoted string.
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Deserialize an `i64` from either a JSON number or a quoted string.
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
