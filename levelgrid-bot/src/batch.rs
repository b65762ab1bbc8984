//! Parallel dry-run previews over many configurations.

use std::sync::Arc;

use levelgrid_core::exchange::Exchange;
use rayon::prelude::*;

use crate::bot::{BotError, GridBot, Preview};
use crate::config::BotConfig;

/// One configuration's preview outcome.
#[derive(Debug)]
pub struct BatchEntry {
    pub symbol: String,
    pub result: Result<Preview, BotError>,
}

/// Preview every config against the shared venue.
///
/// Each config gets its own bot; results come back in input order. A failing
/// config does not affect the others.
pub fn preview_all(configs: &[BotConfig], exchange: Arc<dyn Exchange>) -> Vec<BatchEntry> {
    configs
        .par_iter()
        .map(|config| BatchEntry {
            symbol: config.symbol.clone(),
            result: GridBot::new(config.clone(), Arc::clone(&exchange))
                .and_then(|mut bot| bot.preview()),
        })
        .collect()
}
