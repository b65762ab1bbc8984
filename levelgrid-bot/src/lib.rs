//! LevelGrid Bot: configuration, bot lifecycle, candle loading, batch previews.
//!
//! This crate builds on `levelgrid-core` to provide:
//! - TOML bot configuration with validation and content-addressed run ids
//! - The `GridBot` lifecycle (analyze → compose → plan → start/stop)
//! - CSV and synthetic candle loading for offline runs
//! - Parallel multi-config previews

pub mod batch;
pub mod bot;
pub mod config;
pub mod data_loader;

pub use batch::{preview_all, BatchEntry};
pub use bot::{resolve_range, BotError, GridBot, Preview, StartReport, StopReport};
pub use config::{BotConfig, ConfigError, RunId};
pub use data_loader::{load_candles, CandleSource, LoadError, LoadOptions, LoadedCandles};
