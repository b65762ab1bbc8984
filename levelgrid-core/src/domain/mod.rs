//! Domain types for levelgrid

pub mod candle;
pub mod grid;
pub mod level;
pub mod order;

pub use candle::{CanonicalizeReport, Candle, CandleSeries};
pub use grid::{Direction, GridConfig, GridError, GridLevelSet, GridSource, SpacingType};
pub use level::{LevelCandidates, LevelSide, PriceLevel};
pub use order::{OrderHandle, OrderInstruction, OrderSide, OrderType, PlacedOrder};

