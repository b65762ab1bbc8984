//! Fractal detection: swing points confirmed by a symmetric window.
//!
//! A support fractal's low is strictly below the lows of `window` candles on
//! each side; a resistance fractal's high is strictly above. Fractals inside
//! the most recent `window * 10` candles carry double strength so they rank
//! ahead of older swings.

use super::{AnalysisError, DetectionMethod};
use crate::domain::{CandleSeries, LevelCandidates, PriceLevel};

/// Default number of confirming candles on each side.
pub const DEFAULT_WINDOW: usize = 2;

/// Recent region length, in multiples of the window.
const RECENT_SPAN: usize = 10;

/// Strength of a fractal inside the recent region.
pub const RECENT_STRENGTH: u32 = 2;

fn is_support(lows: &[f64], i: usize, window: usize) -> bool {
    (1..=window).all(|j| lows[i] < lows[i - j] && lows[i] < lows[i + j])
}

fn is_resistance(highs: &[f64], i: usize, window: usize) -> bool {
    (1..=window).all(|j| highs[i] > highs[i - j] && highs[i] > highs[i + j])
}

/// First index of the recent region, or `None` when the series is too short
/// for recency weighting to apply.
pub fn recent_start(len: usize, window: usize) -> Option<usize> {
    (len > window * 4).then(|| window.max(len.saturating_sub(window * RECENT_SPAN)))
}

/// Detect fractal support/resistance candidates, strongest first.
pub fn detect(series: &CandleSeries, window: usize) -> Result<LevelCandidates, AnalysisError> {
    let window = window.max(1);
    let n = series.len();
    let needed = 2 * window + 1;
    if n < needed {
        return Err(AnalysisError::DataInsufficient {
            method: DetectionMethod::Fractal,
            needed,
            got: n,
        });
    }

    let highs = series.highs();
    let lows = series.lows();
    let recent = recent_start(n, window);
    let strength_at = |i: usize| match recent {
        Some(start) if i >= start => RECENT_STRENGTH,
        _ => 1,
    };

    let mut found = LevelCandidates::default();
    for i in window..n - window {
        if is_support(&lows, i, window) {
            found.supports.push(PriceLevel::support(lows[i], strength_at(i)));
        }
        if is_resistance(&highs, i, window) {
            found
                .resistances
                .push(PriceLevel::resistance(highs[i], strength_at(i)));
        }
    }

    // Stable: equal strengths stay in time order.
    found.supports.sort_by(|a, b| b.strength.cmp(&a.strength));
    found.resistances.sort_by(|a, b| b.strength.cmp(&a.strength));
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::make_series;

    /// Triangle wave in lows/highs with troughs every `period` candles.
    fn zigzag(n: usize, period: usize) -> CandleSeries {
        let data: Vec<(f64, f64, f64, f64)> = (0..n)
            .map(|i| {
                let phase = (i % period) as f64;
                let half = period as f64 / 2.0;
                let dist = (phase - half).abs();
                let low = 100.0 + (half - dist) * 2.0 + (i / period) as f64 * 0.01;
                (low + 1.0, low + 3.0, low, low + 2.0)
            })
            .collect();
        make_series(&data)
    }

    #[test]
    fn finds_symmetric_swings() {
        let series = make_series(&[
            (11.0, 12.0, 10.0, 11.0),
            (10.0, 11.0, 9.0, 10.0),
            (8.0, 9.0, 7.0, 8.0), // trough
            (10.0, 11.0, 9.0, 10.0),
            (11.0, 12.0, 10.0, 11.0),
            (13.0, 15.0, 12.0, 14.0), // peak
            (11.0, 12.0, 10.0, 11.0),
            (10.0, 11.0, 9.5, 10.0),
        ]);
        let found = detect(&series, 2).unwrap();
        assert_eq!(found.supports.len(), 1);
        assert_eq!(found.supports[0].price, 7.0);
        assert_eq!(found.resistances.len(), 1);
        assert_eq!(found.resistances[0].price, 15.0);
    }

    #[test]
    fn equal_neighbour_is_not_a_fractal() {
        let series = make_series(&[
            (11.0, 12.0, 10.0, 11.0),
            (10.0, 11.0, 9.0, 10.0),
            (8.0, 9.0, 7.0, 8.0),
            (8.0, 9.0, 7.0, 8.0), // ties the trough
            (11.0, 12.0, 10.0, 11.0),
            (11.0, 12.0, 10.0, 11.0),
        ]);
        let found = detect(&series, 2).unwrap();
        assert!(found.supports.is_empty());
    }

    #[test]
    fn recent_fractals_rank_first_with_double_strength() {
        let series = zigzag(60, 6);
        let found = detect(&series, 2).unwrap();
        assert!(found.supports.len() > 3);

        let start = recent_start(60, 2).unwrap();
        assert_eq!(start, 40);
        let first = found.supports[0];
        let last = *found.supports.last().unwrap();
        assert_eq!(first.strength, RECENT_STRENGTH);
        assert_eq!(last.strength, 1);
    }

    #[test]
    fn short_series_has_no_recent_region() {
        assert_eq!(recent_start(8, 2), None);
        assert_eq!(recent_start(9, 2), Some(2));
    }

    #[test]
    fn too_few_candles_is_data_insufficient() {
        let series = make_series(&[(1.0, 2.0, 0.5, 1.5); 4]);
        assert!(matches!(
            detect(&series, 2),
            Err(AnalysisError::DataInsufficient { needed: 5, got: 4, .. })
        ));
    }
}
