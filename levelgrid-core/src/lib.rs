//! LevelGrid Core: level detection, grid composition and order planning.
//!
//! This crate contains the pure, synchronous half of the grid bot:
//! - Domain types (candles, price levels, grid configs, order instructions)
//! - Support/resistance detection (touchpoint bins and fractals)
//! - Level validation and near-duplicate collapsing
//! - Grid composition from key levels with synthetic fallback
//! - Direction-aware order planning
//! - The `Exchange` trait plus an in-memory paper venue

pub mod analysis;
pub mod domain;
pub mod exchange;
pub mod grid;

pub use analysis::{analyze, AnalysisError, AnalysisParams, LevelAnalysis};
pub use exchange::{CandleBatch, Exchange, ExchangeError, PaperExchange, Timeframe};
pub use grid::{compose, plan, OrderPlan};
