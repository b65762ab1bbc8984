//! Support/resistance price levels.

use serde::{Deserialize, Serialize};

/// Which side of price a level acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelSide {
    Support,
    Resistance,
}

/// A candidate or validated price level.
///
/// `strength` is a touch count (touchpoint method) or a recency weight
/// (fractal method); deduplication sums it into the surviving level. It is
/// reported with the analysis but never moves a grid price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub side: LevelSide,
    pub strength: u32,
}

impl PriceLevel {
    pub fn support(price: f64, strength: u32) -> Self {
        Self {
            price,
            side: LevelSide::Support,
            strength,
        }
    }

    pub fn resistance(price: f64, strength: u32) -> Self {
        Self {
            price,
            side: LevelSide::Resistance,
            strength,
        }
    }
}

/// Support and resistance candidates produced by one detection method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelCandidates {
    pub supports: Vec<PriceLevel>,
    pub resistances: Vec<PriceLevel>,
}

impl LevelCandidates {
    /// Append another method's candidates after this one's, preserving order.
    pub fn extend(&mut self, other: LevelCandidates) {
        self.supports.extend(other.supports);
        self.resistances.extend(other.resistances);
    }
}
