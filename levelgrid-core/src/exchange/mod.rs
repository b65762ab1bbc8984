//! Exchange trait and structured error types.
//!
//! The `Exchange` trait abstracts over trading venues so the bot can run
//! against a live connector or the in-memory [`PaperExchange`] used by tests,
//! benches and the `paper` CLI command.

pub mod paper;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CandleSeries, OrderHandle, OrderSide, OrderType};

pub use paper::{PaperExchange, RejectRule};

/// Errors a venue can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    #[error("order rejected: {reason}")]
    Rejected { reason: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("order not found: {order_id}")]
    OrderNotFound { order_id: String },

    #[error("exchange error: {0}")]
    Other(String),
}

/// Candle interval supported by the venue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[default]
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Length of one candle.
    pub fn duration(self) -> Duration {
        match self {
            Timeframe::M1 => Duration::minutes(1),
            Timeframe::M5 => Duration::minutes(5),
            Timeframe::M15 => Duration::minutes(15),
            Timeframe::M30 => Duration::minutes(30),
            Timeframe::H1 => Duration::hours(1),
            Timeframe::H4 => Duration::hours(4),
            Timeframe::D1 => Duration::days(1),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timeframe '{0}' (expected one of 1m, 5m, 15m, 30m, 1h, 4h, 1d)")]
pub struct ParseTimeframeError(pub String);

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ParseTimeframeError(s.to_string()))
    }
}

/// Candles returned by a venue.
///
/// The series is ascending and de-duplicated. `last_partial` flags that the
/// newest candle is still forming.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleBatch {
    pub series: CandleSeries,
    pub last_partial: bool,
}

impl CandleBatch {
    /// The series restricted to closed candles.
    pub fn closed(&self) -> CandleSeries {
        if self.last_partial {
            self.series.without_last()
        } else {
            self.series.clone()
        }
    }
}

/// Trait for trading venues.
///
/// All calls block the caller. Implementations are shared across bots through
/// `Arc<dyn Exchange>`.
pub trait Exchange: Send + Sync {
    /// Human-readable venue name.
    fn name(&self) -> &str;

    /// Up to `limit` candles for `symbol`, optionally starting at `since`.
    fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<CandleBatch, ExchangeError>;

    /// Last traded price.
    fn fetch_ticker(&self, symbol: &str) -> Result<f64, ExchangeError>;

    /// Free balance per currency.
    fn fetch_balance(&self) -> Result<HashMap<String, f64>, ExchangeError>;

    /// Submit an order. `price` is required for limit orders.
    fn create_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: OrderSide,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<OrderHandle, ExchangeError>;

    fn cancel_order(&self, order_id: &str, symbol: &str) -> Result<(), ExchangeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::make_series;

    #[test]
    fn timeframe_parses_and_displays() {
        for tf in Timeframe::ALL {
            assert_eq!(tf.as_str().parse::<Timeframe>(), Ok(tf));
            assert_eq!(tf.to_string(), tf.as_str());
        }
        assert_eq!(" 4H ".parse::<Timeframe>(), Ok(Timeframe::H4));
        assert!("2h".parse::<Timeframe>().is_err());
    }

    #[test]
    fn timeframe_durations() {
        assert_eq!(Timeframe::M15.duration(), Duration::minutes(15));
        assert_eq!(Timeframe::D1.duration(), Duration::hours(24));
        assert_eq!(Timeframe::default(), Timeframe::M5);
    }

    #[test]
    fn timeframe_serde_uses_short_names() {
        let json = serde_json::to_string(&Timeframe::H1).unwrap();
        assert_eq!(json, "\"1h\"");
        let back: Timeframe = serde_json::from_str("\"30m\"").unwrap();
        assert_eq!(back, Timeframe::M30);
    }

    #[test]
    fn closed_drops_partial_candle() {
        let series = make_series(&[
            (1.0, 2.0, 0.5, 1.5),
            (1.5, 2.5, 1.0, 2.0),
            (2.0, 3.0, 1.5, 2.5),
        ]);
        let batch = CandleBatch {
            series: series.clone(),
            last_partial: true,
        };
        assert_eq!(batch.closed().len(), 2);

        let batch = CandleBatch {
            series,
            last_partial: false,
        };
        assert_eq!(batch.closed().len(), 3);
    }
}
