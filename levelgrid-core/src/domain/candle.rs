//! Candles and the canonical, time-ordered series built from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV aggregate for one fixed-duration interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLC sanity check: positive prices, high >= low, open/close inside the range.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.low > 0.0
            && self.high >= self.low
            && self.open >= self.low
            && self.open <= self.high
            && self.close >= self.low
            && self.close <= self.high
            && self.volume >= 0.0
    }
}

/// Counts of what canonicalization removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CanonicalizeReport {
    pub duplicates_removed: usize,
    pub invalid_removed: usize,
}

/// Ordered candle sequence with strictly increasing, unique timestamps.
///
/// Built once per analysis call and never mutated afterwards. Column accessors
/// return owned vectors because every detector wants a contiguous slice of a
/// single field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Sort by timestamp, keep the first candle of each timestamp, drop insane candles.
    pub fn canonicalize(raw: Vec<Candle>) -> (Self, CanonicalizeReport) {
        let mut report = CanonicalizeReport::default();
        let before = raw.len();
        let mut candles: Vec<Candle> = raw.into_iter().filter(Candle::is_sane).collect();
        report.invalid_removed = before - candles.len();

        // Stable sort keeps the first occurrence ahead of later duplicates.
        candles.sort_by_key(|c| c.timestamp);
        let sane = candles.len();
        candles.dedup_by_key(|c| c.timestamp);
        report.duplicates_removed = sane - candles.len();

        if report.duplicates_removed > 0 || report.invalid_removed > 0 {
            tracing::debug!(
                duplicates = report.duplicates_removed,
                invalid = report.invalid_removed,
                "canonicalized candle series"
            );
        }

        (Self { candles }, report)
    }

    /// Convenience wrapper that discards the report.
    pub fn from_candles(raw: Vec<Candle>) -> Self {
        Self::canonicalize(raw).0
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    /// A new series without the most recent candle.
    pub fn without_last(&self) -> Self {
        let mut candles = self.candles.clone();
        candles.pop();
        Self { candles }
    }

    /// The most recent `n` candles (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[Candle] {
        let start = self.candles.len().saturating_sub(n);
        &self.candles[start..]
    }
}

/// Build a series from `(open, high, low, close)` tuples at one-minute spacing.
#[cfg(test)]
pub fn make_series(data: &[(f64, f64, f64, f64)]) -> CandleSeries {
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let candles = data
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            timestamp: base + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            volume: 1_000.0,
        })
        .collect();
    CandleSeries::from_candles(candles)
}
