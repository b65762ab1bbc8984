//! Level validation: does price actually react at a candidate level?
//!
//! A candle "tests" a support when its low comes within 0.5% of the level; the
//! test is "respected" when the next candle closes above the testing candle's
//! open. Resistances mirror this with highs and a close below the open.
//! Untested extreme levels (beyond the 10th/90th percentile) are kept as-is.

use super::stats;
use crate::domain::{CandleSeries, LevelCandidates, LevelSide, PriceLevel};

/// Default minimum respected/tested ratio.
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// Relative distance within which a candle counts as testing a level.
pub const TEST_PROXIMITY: f64 = 0.005;

/// Below this many tests an extreme level is kept without a respect ratio.
const UNTESTED_LIMIT: usize = 3;

/// Number of raw candidates kept when validation empties a side.
pub const FALLBACK_KEEP: usize = 3;

const SUPPORT_EXTREME: f64 = 0.1;
const RESISTANCE_EXTREME: f64 = 0.9;

/// How price behaved around one level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelReaction {
    pub tests: usize,
    pub respects: usize,
}

impl LevelReaction {
    pub fn ratio(&self) -> f64 {
        if self.tests == 0 {
            0.0
        } else {
            self.respects as f64 / self.tests as f64
        }
    }
}

/// Count tests and respects of `level` across the series.
///
/// The first candle is never counted as a test: there is no prior approach.
pub fn reaction(series: &CandleSeries, level: &PriceLevel) -> LevelReaction {
    let candles = series.candles();
    let mut out = LevelReaction::default();

    for i in 1..candles.len() {
        let touch = match level.side {
            LevelSide::Support => candles[i].low,
            LevelSide::Resistance => candles[i].high,
        };
        if (touch - level.price).abs() / level.price >= TEST_PROXIMITY {
            continue;
        }
        out.tests += 1;
        if let Some(next) = candles.get(i + 1) {
            let reversed = match level.side {
                LevelSide::Support => next.close > candles[i].open,
                LevelSide::Resistance => next.close < candles[i].open,
            };
            if reversed {
                out.respects += 1;
            }
        }
    }
    out
}

/// Keep candidates that price respected, plus untested extremes.
///
/// A side that had candidates never comes back empty: if nothing passes, its
/// first [`FALLBACK_KEEP`] candidates are returned unvalidated.
pub fn validate(series: &CandleSeries, candidates: LevelCandidates, threshold: f64) -> LevelCandidates {
    let low_cut = stats::quantile(&series.lows(), SUPPORT_EXTREME);
    let high_cut = stats::quantile(&series.highs(), RESISTANCE_EXTREME);

    LevelCandidates {
        supports: validate_side(series, candidates.supports, threshold, |price| price < low_cut),
        resistances: validate_side(series, candidates.resistances, threshold, |price| {
            price > high_cut
        }),
    }
}

fn validate_side(
    series: &CandleSeries,
    candidates: Vec<PriceLevel>,
    threshold: f64,
    is_extreme: impl Fn(f64) -> bool,
) -> Vec<PriceLevel> {
    let kept: Vec<PriceLevel> = candidates
        .iter()
        .filter(|level| {
            let r = reaction(series, level);
            (r.tests > 0 && r.ratio() >= threshold)
                || (r.tests < UNTESTED_LIMIT && is_extreme(level.price))
        })
        .copied()
        .collect();

    if kept.is_empty() && !candidates.is_empty() {
        tracing::debug!(
            candidates = candidates.len(),
            "no level passed validation, keeping first unvalidated candidates"
        );
        return candidates.into_iter().take(FALLBACK_KEEP).collect();
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::make_series;

    /// Ten candles test 100.0; only the successors of candles 2 and 5 bounce.
    fn weak_support_series() -> CandleSeries {
        let mut data = vec![(105.0, 106.0, 104.0, 105.0)];
        for i in 1..=10 {
            let close = if i == 3 || i == 6 { 102.5 } else { 101.0 };
            data.push((102.0, 103.0, 100.0, close));
        }
        data.push((102.0, 103.0, 101.5, 102.0));
        make_series(&data)
    }

    #[test]
    fn counts_tests_and_respects() {
        let series = weak_support_series();
        let r = reaction(&series, &PriceLevel::support(100.0, 1));
        assert_eq!(r, LevelReaction { tests: 10, respects: 2 });
        assert!((r.ratio() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn drops_poorly_respected_support() {
        let series = weak_support_series();
        let candidates = LevelCandidates {
            supports: vec![PriceLevel::support(100.0, 5), PriceLevel::support(90.0, 1)],
            resistances: vec![],
        };
        let out = validate(&series, candidates, DEFAULT_THRESHOLD);
        let prices: Vec<f64> = out.supports.iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![90.0]);
    }

    #[test]
    fn keeps_untested_extreme_support() {
        let series = weak_support_series();
        let level = PriceLevel::support(90.0, 1);
        assert_eq!(reaction(&series, &level).tests, 0);
        let out = validate(
            &series,
            LevelCandidates {
                supports: vec![level],
                resistances: vec![],
            },
            DEFAULT_THRESHOLD,
        );
        assert_eq!(out.supports, vec![level]);
    }

    #[test]
    fn respected_resistance_passes() {
        // Each touch of 110 is followed by a candle closing below the touch's open.
        let mut data = vec![(100.0, 101.0, 99.0, 100.0)];
        for _ in 0..4 {
            data.push((108.0, 110.0, 107.0, 109.0));
            data.push((106.0, 107.0, 103.0, 104.0));
        }
        let series = make_series(&data);
        let level = PriceLevel::resistance(110.0, 4);
        let r = reaction(&series, &level);
        assert_eq!(r.tests, 4);
        assert_eq!(r.respects, 4);

        let out = validate(
            &series,
            LevelCandidates {
                supports: vec![],
                resistances: vec![level],
            },
            DEFAULT_THRESHOLD,
        );
        assert_eq!(out.resistances, vec![level]);
    }

    #[test]
    fn empty_side_falls_back_to_first_three() {
        let series = weak_support_series();
        let candidates: Vec<PriceLevel> = [100.0, 100.1, 100.2, 100.3]
            .iter()
            .map(|&p| PriceLevel::support(p, 1))
            .collect();
        let out = validate(
            &series,
            LevelCandidates {
                supports: candidates.clone(),
                resistances: vec![],
            },
            DEFAULT_THRESHOLD,
        );
        assert_eq!(out.supports, candidates[..3].to_vec());
        assert!(out.resistances.is_empty());
    }
}
