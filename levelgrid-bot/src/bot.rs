//! Grid bot lifecycle: analyze → compose → plan → start/stop.
//!
//! A `GridBot` owns the latest analysis, grid and active-order snapshot for one
//! symbol. Each is an `Arc` that a recompute replaces wholesale; readers holding
//! an older snapshot keep a consistent view. Lifecycle calls take `&mut self`,
//! so one instance is always driven sequentially, while several instances may
//! share one `Arc<dyn Exchange>`.

use std::sync::Arc;

use levelgrid_core::analysis::{analyze, AnalysisError, LevelAnalysis};
use levelgrid_core::domain::{
    Direction, GridError, GridLevelSet, OrderType, PlacedOrder, SpacingType,
};
use levelgrid_core::exchange::{Exchange, ExchangeError};
use levelgrid_core::grid::{compose, plan, OrderPlan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{BotConfig, ConfigError, RunId};

/// Band around the reference price used when no range can be derived.
const FALLBACK_BAND: (f64, f64) = (0.97, 1.03);

#[derive(Debug, Error)]
pub enum BotError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("analysis error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("grid error: {0}")]
    Grid(#[from] GridError),
    #[error("bot for '{symbol}' still has {orders} active orders; stop it first")]
    AlreadyRunning { symbol: String, orders: usize },
}

/// Everything a dry run computes, without touching the order book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub symbol: String,
    pub run_id: RunId,
    pub analysis: LevelAnalysis,
    pub grid: GridLevelSet,
    pub plan: OrderPlan,
}

/// Outcome of placing a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartReport {
    pub symbol: String,
    pub levels: usize,
    pub lower: f64,
    pub upper: f64,
    pub spacing: SpacingType,
    pub direction: Direction,
    pub placed: usize,
    pub rejected: usize,
}

impl StartReport {
    pub fn fully_placed(&self) -> bool {
        self.rejected == 0
    }
}

/// Outcome of cancelling the active orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopReport {
    pub cancelled: usize,
    /// Ids whose cancellation the venue did not acknowledge.
    pub failed: Vec<String>,
}

impl StopReport {
    pub fn all_cancelled(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Bounds for the grid: explicit when configured, otherwise derived.
///
/// Derived bounds span `[min support, max resistance]`; without levels on both
/// sides, or when that span is degenerate, a ±3% band around the reference
/// price is used.
pub fn resolve_range(config: &BotConfig, analysis: &LevelAnalysis) -> (f64, f64) {
    if let Some(range) = config.price_range.explicit() {
        return range;
    }

    let price = analysis.reference_price;
    let band = (price * FALLBACK_BAND.0, price * FALLBACK_BAND.1);
    if !analysis.has_levels() {
        return band;
    }

    let lower = analysis
        .supports
        .iter()
        .map(|l| l.price)
        .fold(f64::INFINITY, f64::min);
    let upper = analysis
        .resistances
        .iter()
        .map(|l| l.price)
        .fold(f64::NEG_INFINITY, f64::max);
    if lower.is_finite() && upper.is_finite() && lower > 0.0 && lower < upper {
        (lower, upper)
    } else {
        band
    }
}

pub struct GridBot {
    config: BotConfig,
    exchange: Arc<dyn Exchange>,
    analysis: Option<Arc<LevelAnalysis>>,
    grid: Option<Arc<GridLevelSet>>,
    active_orders: Arc<Vec<PlacedOrder>>,
}

impl GridBot {
    /// Validate `config` and bind it to a venue.
    pub fn new(config: BotConfig, exchange: Arc<dyn Exchange>) -> Result<Self, BotError> {
        config.validate()?;
        if let Ok(leverage) = config.investment.leverage_factor() {
            tracing::debug!(symbol = %config.symbol, leverage, "leverage is informational only");
        }
        Ok(Self {
            config,
            exchange,
            analysis: None,
            grid: None,
            active_orders: Arc::new(Vec::new()),
        })
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    pub fn analysis(&self) -> Option<Arc<LevelAnalysis>> {
        self.analysis.clone()
    }

    pub fn grid(&self) -> Option<Arc<GridLevelSet>> {
        self.grid.clone()
    }

    pub fn active_orders(&self) -> Arc<Vec<PlacedOrder>> {
        Arc::clone(&self.active_orders)
    }

    /// Fetch closed candles and the ticker, then detect levels.
    pub fn analyze_market(&mut self) -> Result<Arc<LevelAnalysis>, BotError> {
        let symbol = self.config.symbol.as_str();
        let settings = self.config.analysis;
        tracing::info!(
            symbol,
            venue = self.exchange.name(),
            timeframe = %settings.timeframe,
            limit = settings.limit,
            "analyzing market"
        );

        let batch = self
            .exchange
            .fetch_candles(symbol, settings.timeframe, None, settings.limit)?;
        let series = batch.closed();
        let price = self.exchange.fetch_ticker(symbol)?;

        let analysis = if series.is_empty() {
            tracing::warn!(symbol, "no candle data retrieved");
            LevelAnalysis::empty(price, "no candle data retrieved")
        } else {
            analyze(&series, price, &settings.params)?
        };
        if !analysis.has_levels() {
            tracing::warn!(symbol, price, "no support/resistance on both sides of price");
        }

        let analysis = Arc::new(analysis);
        self.analysis = Some(Arc::clone(&analysis));
        Ok(analysis)
    }

    /// Compose the grid from the current analysis, analyzing first if needed.
    pub fn compose_grid(&mut self) -> Result<Arc<GridLevelSet>, BotError> {
        let analysis = match self.analysis.clone() {
            Some(a) => a,
            None => self.analyze_market()?,
        };

        let (lower, upper) = resolve_range(&self.config, &analysis);
        let grid_config = self.config.grid_config(lower, upper)?;
        let grid = compose(
            &grid_config,
            &analysis.support_prices(),
            &analysis.resistance_prices(),
        )?;
        tracing::debug!(
            symbol = %self.config.symbol,
            source = ?grid.source(),
            fingerprint = %grid.fingerprint(),
            "grid composed"
        );

        let grid = Arc::new(grid);
        self.grid = Some(Arc::clone(&grid));
        Ok(grid)
    }

    /// Size orders over the current grid from the free balance.
    pub fn plan_orders(&mut self) -> Result<OrderPlan, BotError> {
        let grid = match self.grid.clone() {
            Some(g) => g,
            None => self.compose_grid()?,
        };
        let balance = self.exchange.fetch_balance()?;
        let free = balance
            .get(&self.config.investment.currency)
            .copied()
            .unwrap_or(0.0);

        Ok(plan(
            &grid,
            self.config.direction,
            free,
            self.config.investment.amount_percent,
        ))
    }

    /// Run a fresh analyze → compose → plan cycle without placing orders.
    pub fn preview(&mut self) -> Result<Preview, BotError> {
        let analysis = self.analyze_market()?;
        let grid = self.compose_grid()?;
        let plan = self.plan_orders()?;
        Ok(Preview {
            symbol: self.config.symbol.clone(),
            run_id: self.config.run_id(),
            analysis: (*analysis).clone(),
            grid: (*grid).clone(),
            plan,
        })
    }

    /// Recompute everything and submit the planned orders one by one.
    ///
    /// Rejected submissions are logged and skipped; accepted ones stay on the
    /// book. The accepted orders become the new active-order snapshot.
    pub fn try_start(&mut self) -> Result<StartReport, BotError> {
        if !self.active_orders.is_empty() {
            return Err(BotError::AlreadyRunning {
                symbol: self.config.symbol.clone(),
                orders: self.active_orders.len(),
            });
        }

        self.analyze_market()?;
        let grid = self.compose_grid()?;
        let order_plan = self.plan_orders()?;
        let symbol = self.config.symbol.as_str();

        let mut placed = Vec::with_capacity(order_plan.instructions.len());
        let mut rejected = 0;
        for instruction in &order_plan.instructions {
            match self.exchange.create_order(
                symbol,
                OrderType::Limit,
                instruction.side,
                instruction.quantity,
                Some(instruction.price),
            ) {
                Ok(handle) => placed.push(PlacedOrder {
                    handle,
                    instruction: *instruction,
                }),
                Err(e) => {
                    rejected += 1;
                    tracing::warn!(
                        symbol,
                        side = %instruction.side,
                        price = instruction.price,
                        quantity = instruction.quantity,
                        error = %e,
                        "order submission failed"
                    );
                }
            }
        }

        let report = StartReport {
            symbol: symbol.to_string(),
            levels: grid.prices().len(),
            lower: grid.lower_bound(),
            upper: grid.upper_bound(),
            spacing: grid.spacing(),
            direction: self.config.direction,
            placed: placed.len(),
            rejected,
        };
        tracing::info!(
            symbol,
            venue = self.exchange.name(),
            levels = report.levels,
            lower = report.lower,
            upper = report.upper,
            spacing = ?report.spacing,
            direction = ?report.direction,
            placed = report.placed,
            rejected = report.rejected,
            "grid bot started"
        );

        self.active_orders = Arc::new(placed);
        Ok(report)
    }

    /// Start and report only success or failure; details go to the log.
    pub fn start(&mut self) -> bool {
        match self.try_start() {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(symbol = %self.config.symbol, error = %e, "failed to start grid bot");
                false
            }
        }
    }

    /// Cancel every active order.
    ///
    /// The snapshot is replaced by the orders whose cancellation failed, so a
    /// later `try_start` keeps refusing until they are gone.
    pub fn stop_with_report(&mut self) -> StopReport {
        let orders = Arc::clone(&self.active_orders);
        let symbol = self.config.symbol.as_str();
        let mut report = StopReport::default();
        let mut still_open = Vec::new();

        for order in orders.iter() {
            match self.exchange.cancel_order(&order.handle.id, symbol) {
                Ok(()) => report.cancelled += 1,
                Err(e) => {
                    tracing::warn!(symbol, order_id = %order.handle.id, error = %e, "cancel failed");
                    report.failed.push(order.handle.id.clone());
                    still_open.push(order.clone());
                }
            }
        }
        self.active_orders = Arc::new(still_open);

        tracing::info!(
            symbol,
            cancelled = report.cancelled,
            failed = report.failed.len(),
            "grid bot stopped"
        );
        report
    }

    /// `true` when every cancellation was acknowledged.
    pub fn stop(&mut self) -> bool {
        self.stop_with_report().all_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levelgrid_core::domain::PriceLevel;

    fn config(toml: &str) -> BotConfig {
        BotConfig::from_toml_str(toml).unwrap()
    }

    fn auto_config() -> BotConfig {
        config(
            r#"
symbol = "BTC/USDT"
[investment]
currency = "USDT"
amount_percent = 10
"#,
        )
    }

    fn analysis(price: f64, supports: &[f64], resistances: &[f64]) -> LevelAnalysis {
        LevelAnalysis {
            reference_price: price,
            supports: supports.iter().map(|&p| PriceLevel::support(p, 1)).collect(),
            resistances: resistances
                .iter()
                .map(|&p| PriceLevel::resistance(p, 1))
                .collect(),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn explicit_range_wins() {
        let mut cfg = auto_config();
        cfg.price_range.lower = Some(10.0);
        cfg.price_range.upper = Some(20.0);
        let a = analysis(15.0, &[14.0], &[16.0]);
        assert_eq!(resolve_range(&cfg, &a), (10.0, 20.0));
    }

    #[test]
    fn auto_range_spans_detected_levels() {
        let a = analysis(100.0, &[98.0, 92.0, 95.0], &[103.0, 110.0]);
        assert_eq!(resolve_range(&auto_config(), &a), (92.0, 110.0));
    }

    #[test]
    fn auto_range_without_levels_uses_band() {
        let a = analysis(100.0, &[98.0], &[]);
        let (lower, upper) = resolve_range(&auto_config(), &a);
        assert!((lower - 97.0).abs() < 1e-9);
        assert!((upper - 103.0).abs() < 1e-9);
    }

    #[test]
    fn reports_summarize_outcome() {
        let stop = StopReport {
            cancelled: 3,
            failed: vec!["x".into()],
        };
        assert!(!stop.all_cancelled());
        assert!(StopReport::default().all_cancelled());
    }
}
