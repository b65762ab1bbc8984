//! Support/resistance analysis pipeline.
//!
//! `analyze()` runs one synchronous pass over a candle series:
//! touchpoint + fractal detection → validation → per-side deduplication →
//! proximity filtering around the reference price. Detection problems shrink
//! the candidate sets and are reported as warnings; they never abort the pass.

pub mod dedup;
pub mod fractal;
pub mod stats;
pub mod touchpoint;
pub mod validate;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{CandleSeries, LevelCandidates, LevelSide, PriceLevel};

pub use dedup::{dedup_levels, dedup_prices};
pub use validate::{reaction, LevelReaction};

/// Which detector produced (or failed to produce) candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    Touchpoint,
    Fractal,
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionMethod::Touchpoint => write!(f, "touchpoint"),
            DetectionMethod::Fractal => write!(f, "fractal"),
        }
    }
}

/// Errors from the analysis layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("{method} detection needs at least {needed} candles, got {got}")]
    DataInsufficient {
        method: DetectionMethod,
        needed: usize,
        got: usize,
    },

    #[error("reference price must be positive and finite, got {0}")]
    InvalidReferencePrice(f64),
}

/// Tunable parameters of one analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    /// Minimum touches for a touchpoint bin to qualify.
    pub min_touches: u32,
    /// Confirming candles on each side of a fractal.
    pub fractal_window: usize,
    /// Relative tolerance for collapsing near-duplicate levels.
    pub dedup_tolerance: f64,
    /// Maximum relative distance from the reference price.
    pub max_distance: f64,
    /// Minimum respected/tested ratio for validation.
    pub validation_threshold: f64,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            min_touches: touchpoint::DEFAULT_MIN_TOUCHES,
            fractal_window: fractal::DEFAULT_WINDOW,
            dedup_tolerance: dedup::DEFAULT_TOLERANCE,
            max_distance: 0.15,
            validation_threshold: validate::DEFAULT_THRESHOLD,
        }
    }
}

/// Result of one analysis pass.
///
/// Supports lie strictly below the reference price and resistances strictly
/// above it, each sorted nearest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelAnalysis {
    pub reference_price: f64,
    pub supports: Vec<PriceLevel>,
    pub resistances: Vec<PriceLevel>,
    /// Degradations encountered along the way (e.g. too little data).
    pub warnings: Vec<String>,
}

impl LevelAnalysis {
    /// An analysis with no levels, e.g. when no candles were available.
    pub fn empty(reference_price: f64, warning: impl Into<String>) -> Self {
        Self {
            reference_price,
            supports: Vec::new(),
            resistances: Vec::new(),
            warnings: vec![warning.into()],
        }
    }

    /// True when both sides have at least one level.
    pub fn has_levels(&self) -> bool {
        !self.supports.is_empty() && !self.resistances.is_empty()
    }

    pub fn support_prices(&self) -> Vec<f64> {
        self.supports.iter().map(|l| l.price).collect()
    }

    pub fn resistance_prices(&self) -> Vec<f64> {
        self.resistances.iter().map(|l| l.price).collect()
    }
}

/// Run both detectors, validate, dedup and filter around `reference_price`.
pub fn analyze(
    series: &CandleSeries,
    reference_price: f64,
    params: &AnalysisParams,
) -> Result<LevelAnalysis, AnalysisError> {
    if !reference_price.is_finite() || reference_price <= 0.0 {
        return Err(AnalysisError::InvalidReferencePrice(reference_price));
    }

    let mut warnings = Vec::new();
    let mut candidates = LevelCandidates::default();
    let detections = [
        touchpoint::detect(series, params.min_touches),
        fractal::detect(series, params.fractal_window),
    ];
    for detection in detections {
        match detection {
            Ok(found) => candidates.extend(found),
            Err(e) => {
                tracing::warn!(error = %e, "level detection degraded");
                warnings.push(e.to_string());
            }
        }
    }

    let validated = validate::validate(series, candidates, params.validation_threshold);
    let supports = dedup_levels(validated.supports, params.dedup_tolerance);
    let resistances = dedup_levels(validated.resistances, params.dedup_tolerance);

    let analysis = LevelAnalysis {
        reference_price,
        supports: near(supports, reference_price, params.max_distance, LevelSide::Support),
        resistances: near(
            resistances,
            reference_price,
            params.max_distance,
            LevelSide::Resistance,
        ),
        warnings,
    };

    tracing::info!(
        reference_price,
        supports = analysis.supports.len(),
        resistances = analysis.resistances.len(),
        "level analysis complete"
    );
    Ok(analysis)
}

/// Keep levels on the correct side of `price` within `max_distance`, nearest first.
fn near(levels: Vec<PriceLevel>, price: f64, max_distance: f64, side: LevelSide) -> Vec<PriceLevel> {
    let limit = price * max_distance;
    let mut kept: Vec<PriceLevel> = levels
        .into_iter()
        .filter(|l| match side {
            LevelSide::Support => l.price < price && price - l.price <= limit,
            LevelSide::Resistance => l.price > price && l.price - price <= limit,
        })
        .collect();
    kept.sort_by(|a, b| (a.price - price).abs().total_cmp(&(b.price - price).abs()));
    kept
}
