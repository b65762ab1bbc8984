//! Touchpoint detection: price bins that price repeatedly reversed from.
//!
//! The observed range (padded by 0.5% on each side) is divided into 500 bins.
//! Every interior local low adds a support touch to its nearest bin and every
//! interior local high a resistance touch. Candles in the extreme 5% tails
//! add one more touch each. Bins with enough touches are ranked by touch
//! count; the recent-window and all-time extremes are then appended
//! regardless of touches.

use std::collections::BTreeMap;

use super::stats;
use super::{AnalysisError, DetectionMethod};
use crate::domain::{CandleSeries, LevelCandidates, PriceLevel};

/// Number of equal-width price bins.
pub const BIN_COUNT: usize = 500;

/// Candles considered for the recent ceiling/floor.
pub const RECENT_WINDOW: usize = 50;

/// At least one interior candle is needed for a local-extremum test.
pub const MIN_CANDLES: usize = 3;

/// Default minimum touch count for a bin to qualify.
pub const DEFAULT_MIN_TOUCHES: u32 = 2;

const RANGE_PADDING: f64 = 0.005;
const UPPER_TAIL: f64 = 0.95;
const LOWER_TAIL: f64 = 0.05;

/// Touch counts per bin index, before the `min_touches` cut.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TouchCounts {
    pub bin_size: f64,
    pub support: BTreeMap<i64, u32>,
    pub resistance: BTreeMap<i64, u32>,
}

impl TouchCounts {
    fn new(bin_size: f64) -> Self {
        Self {
            bin_size,
            ..Self::default()
        }
    }

    fn bin_of(&self, price: f64) -> i64 {
        (price / self.bin_size).round() as i64
    }

    fn touch_support(&mut self, price: f64) {
        *self.support.entry(self.bin_of(price)).or_default() += 1;
    }

    fn touch_resistance(&mut self, price: f64) {
        *self.resistance.entry(self.bin_of(price)).or_default() += 1;
    }

    /// Bins with at least `min_touches`, strongest first, ties by ascending price.
    fn ranked(&self, bins: &BTreeMap<i64, u32>, min_touches: u32) -> Vec<(f64, u32)> {
        let mut kept: Vec<(i64, u32)> = bins
            .iter()
            .filter(|(_, &touches)| touches >= min_touches)
            .map(|(&bin, &touches)| (bin, touches))
            .collect();
        kept.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        kept.into_iter()
            .map(|(bin, touches)| (bin as f64 * self.bin_size, touches))
            .collect()
    }
}

/// Count interior local-extremum touches only (no tail or extreme additions).
pub fn interior_touches(series: &CandleSeries, bin_size: f64) -> TouchCounts {
    let highs = series.highs();
    let lows = series.lows();
    let mut counts = TouchCounts::new(bin_size);

    for i in 1..series.len().saturating_sub(1) {
        if lows[i] <= lows[i - 1] && lows[i] <= lows[i + 1] {
            counts.touch_support(lows[i]);
        }
        if highs[i] >= highs[i - 1] && highs[i] >= highs[i + 1] {
            counts.touch_resistance(highs[i]);
        }
    }
    counts
}

/// Bin width for a series: padded observed range split into [`BIN_COUNT`] bins.
pub fn bin_size(series: &CandleSeries) -> f64 {
    let price_min = stats::min(series.lows()) * (1.0 - RANGE_PADDING);
    let price_max = stats::max(series.highs()) * (1.0 + RANGE_PADDING);
    (price_max - price_min) / BIN_COUNT as f64
}

/// Detect touchpoint support/resistance candidates.
pub fn detect(series: &CandleSeries, min_touches: u32) -> Result<LevelCandidates, AnalysisError> {
    if series.len() < MIN_CANDLES {
        return Err(AnalysisError::DataInsufficient {
            method: DetectionMethod::Touchpoint,
            needed: MIN_CANDLES,
            got: series.len(),
        });
    }

    let highs = series.highs();
    let lows = series.lows();
    let mut counts = interior_touches(series, bin_size(series));

    let high_cut = stats::quantile(&highs, UPPER_TAIL);
    let low_cut = stats::quantile(&lows, LOWER_TAIL);
    for (&high, &low) in highs.iter().zip(&lows) {
        if high > high_cut {
            counts.touch_resistance(high);
        }
        if low < low_cut {
            counts.touch_support(low);
        }
    }

    let mut supports: Vec<PriceLevel> = counts
        .ranked(&counts.support, min_touches)
        .into_iter()
        .map(|(price, touches)| PriceLevel::support(price, touches))
        .collect();
    let mut resistances: Vec<PriceLevel> = counts
        .ranked(&counts.resistance, min_touches)
        .into_iter()
        .map(|(price, touches)| PriceLevel::resistance(price, touches))
        .collect();

    let recent = series.tail(RECENT_WINDOW);
    let ceiling = stats::max(recent.iter().map(|c| c.high));
    let floor = stats::min(recent.iter().map(|c| c.low));
    push_new(&mut resistances, PriceLevel::resistance(ceiling, 1));
    push_new(&mut supports, PriceLevel::support(floor, 1));
    push_new(&mut resistances, PriceLevel::resistance(stats::max(highs), 1));
    push_new(&mut supports, PriceLevel::support(stats::min(lows), 1));

    Ok(LevelCandidates {
        supports,
        resistances,
    })
}

fn push_new(levels: &mut Vec<PriceLevel>, level: PriceLevel) {
    if !levels.iter().any(|l| l.price == level.price) {
        levels.push(level);
    }
}
