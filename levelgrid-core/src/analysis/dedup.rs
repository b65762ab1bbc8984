//! Collapse price levels that sit within a relative tolerance of each other.

use crate::domain::PriceLevel;

/// Default relative tolerance (0.5%).
pub const DEFAULT_TOLERANCE: f64 = 0.005;

/// Sort ascending and keep a price only if it is more than `tolerance`
/// (relative) above the last kept price.
pub fn dedup_prices(prices: &[f64], tolerance: f64) -> Vec<f64> {
    let mut sorted = prices.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut kept: Vec<f64> = Vec::with_capacity(sorted.len());
    for price in sorted {
        match kept.last() {
            Some(&last) if (price - last) / last <= tolerance => {}
            _ => kept.push(price),
        }
    }
    kept
}

/// Same filter as [`dedup_prices`], folding the strength of every discarded
/// level into the kept level it collapsed onto.
pub fn dedup_levels(mut levels: Vec<PriceLevel>, tolerance: f64) -> Vec<PriceLevel> {
    levels.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut kept: Vec<PriceLevel> = Vec::with_capacity(levels.len());
    for level in levels {
        match kept.last_mut() {
            Some(last) if (level.price - last.price) / last.price <= tolerance => {
                last.strength = last.strength.saturating_add(level.strength);
            }
            _ => kept.push(level),
        }
    }
    kept
}
