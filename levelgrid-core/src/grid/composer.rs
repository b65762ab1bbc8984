//! Grid composition: blend detected levels into an exact-count price grid.
//!
//! Decision logic:
//! 1. Supports and resistances both present (after range filtering):
//!    a. at least `N - 1` key levels → pick `N - 1` of them at evenly spaced
//!       index positions and bracket them with the bounds;
//!    b. fewer → union bounds + key levels with a full synthetic grid and
//!       subsample `N + 1` points at evenly spaced index positions.
//! 2. Otherwise → pure synthetic grid.
//!
//! Subsampling always includes the first and last index, so both bounds are
//! retained exactly. Any result that still fails the snapshot invariant is
//! replaced by the synthetic grid.

use crate::domain::{GridConfig, GridError, GridLevelSet, GridSource, SpacingType};

/// `n + 1` prices with equal absolute spacing; endpoints exact.
pub fn arithmetic(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    let step = (upper - lower) / n as f64;
    let mut levels: Vec<f64> = (0..=n).map(|k| lower + k as f64 * step).collect();
    levels[n] = upper;
    levels
}

/// `n + 1` prices with equal ratio between neighbours; endpoints exact.
pub fn geometric(lower: f64, upper: f64, n: usize) -> Vec<f64> {
    let ratio = upper / lower;
    let mut levels: Vec<f64> = (0..=n)
        .map(|k| lower * ratio.powf(k as f64 / n as f64))
        .collect();
    levels[0] = lower;
    levels[n] = upper;
    levels
}

/// Full synthetic grid for a config.
pub fn synthetic(config: &GridConfig) -> Vec<f64> {
    match config.spacing {
        SpacingType::Arithmetic => {
            arithmetic(config.lower_bound, config.upper_bound, config.level_count)
        }
        SpacingType::Geometric => {
            geometric(config.lower_bound, config.upper_bound, config.level_count)
        }
    }
}

/// `count` indices spread evenly over `0..len`, rounded to nearest (half up).
///
/// With `count >= 2` the first index is 0 and the last is `len - 1`; with
/// `count <= len` the indices are distinct and ascending.
pub fn evenly_spaced_indices(len: usize, count: usize) -> Vec<usize> {
    match count {
        0 => Vec::new(),
        1 => vec![0],
        _ => {
            let span = len.saturating_sub(1);
            let denom = count - 1;
            (0..count)
                .map(|i| (2 * i * span + denom) / (2 * denom))
                .collect()
        }
    }
}

/// Compose the grid for `config` from detected support and resistance prices.
///
/// Levels outside `[lower_bound, upper_bound]` are ignored. Always returns
/// exactly `level_count + 1` strictly increasing prices for a valid config.
pub fn compose(
    config: &GridConfig,
    supports: &[f64],
    resistances: &[f64],
) -> Result<GridLevelSet, GridError> {
    config.validate()?;
    let (lower, upper, n) = (config.lower_bound, config.upper_bound, config.level_count);

    let in_range = |p: &&f64| p.is_finite() && **p >= lower && **p <= upper;
    let supports: Vec<f64> = supports.iter().filter(in_range).copied().collect();
    let resistances: Vec<f64> = resistances.iter().filter(in_range).copied().collect();

    if supports.is_empty() || resistances.is_empty() {
        tracing::debug!("no key levels inside range, using synthetic spacing");
        return synthetic_set(config);
    }

    // Bounds are re-added explicitly; equal prices would break strict ordering.
    let mut key: Vec<f64> = supports
        .into_iter()
        .chain(resistances)
        .filter(|&p| p > lower && p < upper)
        .collect();
    key.sort_by(f64::total_cmp);
    key.dedup();

    let (prices, source) = if key.len() >= n - 1 {
        let mut prices = Vec::with_capacity(n + 1);
        prices.push(lower);
        prices.extend(evenly_spaced_indices(key.len(), n - 1).into_iter().map(|i| key[i]));
        prices.push(upper);
        (prices, GridSource::KeyLevels)
    } else {
        let mut all = Vec::with_capacity(key.len() + n + 3);
        all.push(lower);
        all.extend_from_slice(&key);
        all.push(upper);
        all.extend(synthetic(config));
        all.sort_by(f64::total_cmp);
        all.dedup();
        let prices = evenly_spaced_indices(all.len(), n + 1)
            .into_iter()
            .map(|i| all[i])
            .collect();
        (prices, GridSource::Blended)
    };

    match GridLevelSet::new(prices, config, source) {
        Ok(set) => Ok(set),
        Err(e) => {
            tracing::warn!(error = %e, "composed grid rejected, using synthetic spacing");
            synthetic_set(config)
        }
    }
}

fn synthetic_set(config: &GridConfig) -> Result<GridLevelSet, GridError> {
    GridLevelSet::new(synthetic(config), config, GridSource::Synthetic)
}
