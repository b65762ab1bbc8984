//! Grid configuration and the immutable grid snapshot.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How synthetic grid points are spaced between the bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpacingType {
    /// Equal absolute price difference.
    #[default]
    Arithmetic,
    /// Equal ratio between neighbours (equal spacing in log-price).
    Geometric,
}

/// Which side(s) of the grid receive orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Neutral,
    Long,
    Short,
}

/// Errors raised before composition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("invalid grid bounds: lower={lower}, upper={upper} (need 0 < lower < upper)")]
    InvalidBound { lower: f64, upper: f64 },

    #[error("invalid level count {0}: need at least 1 grid interval")]
    InvalidLevelCount(usize),

    #[error("range {lower}..{upper} is too narrow for {level_count} distinct grid intervals")]
    RangeTooNarrow {
        lower: f64,
        upper: f64,
        level_count: usize,
    },

    #[error("grid snapshot violates its invariant: {0}")]
    Malformed(String),
}

/// Bounds, interval count and spacing for one grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Number of grid intervals `N`; the grid has `N + 1` prices.
    pub level_count: usize,
    pub spacing: SpacingType,
    pub direction: Direction,
}

impl GridConfig {
    /// Construct a config, rejecting bad bounds and a zero level count.
    pub fn new(
        lower_bound: f64,
        upper_bound: f64,
        level_count: usize,
        spacing: SpacingType,
        direction: Direction,
    ) -> Result<Self, GridError> {
        let config = Self {
            lower_bound,
            upper_bound,
            level_count,
            spacing,
            direction,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GridError> {
        let (lower, upper) = (self.lower_bound, self.upper_bound);
        if !lower.is_finite() || !upper.is_finite() || lower <= 0.0 || lower >= upper {
            return Err(GridError::InvalidBound { lower, upper });
        }
        if self.level_count == 0 {
            return Err(GridError::InvalidLevelCount(self.level_count));
        }
        // Bounds a few ulps apart collapse neighbouring synthetic points.
        let levels = crate::grid::synthetic(self);
        if levels.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GridError::RangeTooNarrow {
                lower,
                upper,
                level_count: self.level_count,
            });
        }
        Ok(())
    }
}

/// How a grid snapshot was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridSource {
    /// Bounds plus detected levels picked at even index positions.
    KeyLevels,
    /// Detected levels unioned with synthetic spacing, then subsampled.
    Blended,
    /// Pure arithmetic/geometric spacing.
    Synthetic,
}

/// Exactly `N + 1` strictly increasing prices from `lower_bound` to `upper_bound`.
///
/// Never mutated after construction; a recompute produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLevelSet {
    prices: Vec<f64>,
    lower_bound: f64,
    upper_bound: f64,
    spacing: SpacingType,
    source: GridSource,
}

impl GridLevelSet {
    /// Build a snapshot, checking count, ordering and exact endpoints.
    pub fn new(
        prices: Vec<f64>,
        config: &GridConfig,
        source: GridSource,
    ) -> Result<Self, GridError> {
        let expected = config.level_count + 1;
        if prices.len() != expected {
            return Err(GridError::Malformed(format!(
                "expected {expected} prices, got {}",
                prices.len()
            )));
        }
        if let Some(w) = prices.windows(2).find(|w| !(w[0] < w[1])) {
            return Err(GridError::Malformed(format!(
                "prices not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        let (first, last) = (prices[0], prices[expected - 1]);
        if first != config.lower_bound || last != config.upper_bound {
            return Err(GridError::Malformed(format!(
                "endpoints {first}..{last} differ from bounds {}..{}",
                config.lower_bound, config.upper_bound
            )));
        }
        Ok(Self {
            prices,
            lower_bound: config.lower_bound,
            upper_bound: config.upper_bound,
            spacing: config.spacing,
            source,
        })
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    /// Number of grid intervals `N` (one less than the number of prices).
    pub fn intervals(&self) -> usize {
        self.prices.len() - 1
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn spacing(&self) -> SpacingType {
        self.spacing
    }

    pub fn source(&self) -> GridSource {
        self.source
    }

    /// Deterministic BLAKE3 hash over the exact bit patterns of the prices.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for price in &self.prices {
            hasher.update(&price.to_bits().to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
