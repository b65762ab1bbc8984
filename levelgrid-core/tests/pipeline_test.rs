//! End-to-end: candles → analysis → grid → plan, against the paper venue.

use chrono::{DateTime, Duration, Utc};
use levelgrid_core::analysis::{analyze, AnalysisParams};
use levelgrid_core::domain::{
    Candle, CandleSeries, Direction, GridConfig, GridSource, OrderSide, OrderType, SpacingType,
};
use levelgrid_core::exchange::{Exchange, PaperExchange, RejectRule, Timeframe};
use levelgrid_core::grid::{compose, plan};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

/// Oscillates between roughly 95 and 105 with a five-candle cycle.
fn make_ranging_candles(n: usize) -> Vec<Candle> {
    let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    let cycle = [
        (100.0, 101.0, 99.0, 100.5),
        (100.5, 101.0, 95.0, 96.0),
        (96.0, 101.5, 95.5, 101.0),
        (101.0, 105.0, 100.5, 104.0),
        (104.0, 104.5, 99.5, 100.0),
    ];
    (0..n)
        .map(|i| {
            let (open, high, low, close) = cycle[i % cycle.len()];
            Candle {
                timestamp: base + Duration::minutes(5 * i as i64),
                open,
                high,
                low,
                close,
                volume: 10.0,
            }
        })
        .collect()
}

fn ranging_series(n: usize) -> CandleSeries {
    CandleSeries::from_candles(make_ranging_candles(n))
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn ranging_market_yields_levels_on_both_sides() {
    let series = ranging_series(120);
    let analysis = analyze(&series, 100.0, &AnalysisParams::default()).unwrap();

    assert!(analysis.has_levels(), "analysis: {analysis:?}");
    assert!(analysis.support_prices().iter().all(|p| *p < 100.0 && *p >= 85.0));
    assert!(analysis.resistance_prices().iter().all(|p| *p > 100.0 && *p <= 115.0));
}

#[test]
fn full_pipeline_produces_exact_grid_and_plan() {
    let series = ranging_series(120);
    let analysis = analyze(&series, 100.0, &AnalysisParams::default()).unwrap();

    let cfg = GridConfig::new(90.0, 110.0, 8, SpacingType::Arithmetic, Direction::Neutral).unwrap();
    let grid = compose(&cfg, &analysis.support_prices(), &analysis.resistance_prices()).unwrap();

    assert_ne!(grid.source(), GridSource::Synthetic);
    assert_eq!(grid.prices().len(), 9);
    assert_eq!(grid.prices()[0], 90.0);
    assert_eq!(grid.prices()[8], 110.0);

    let order_plan = plan(&grid, Direction::Neutral, 10_000.0, 10.0);
    assert_eq!(order_plan.per_grid_size, 125.0);
    assert_eq!(order_plan.instructions.len(), 16);
    assert_eq!(order_plan.instructions[0].side, OrderSide::Buy);
    assert_eq!(order_plan.instructions[15].side, OrderSide::Sell);
    assert_eq!(order_plan.instructions[15].price, 110.0);
}

#[test]
fn duplicate_and_unordered_candles_are_canonicalized() {
    let mut raw = make_ranging_candles(20);
    raw.push(raw[3]);
    raw.reverse();
    let (series, report) = CandleSeries::canonicalize(raw);

    assert_eq!(series.len(), 20);
    assert_eq!(report.duplicates_removed, 1);
    assert!(series
        .candles()
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn paper_venue_accepts_plan_except_rejected_orders() {
    let venue = PaperExchange::new()
        .with_candles("SOL/USDT", ranging_series(120))
        .with_balance("USDT", 5_000.0)
        .reject(RejectRule::PriceAbove(108.0));

    let batch = venue
        .fetch_candles("SOL/USDT", Timeframe::M5, None, 100)
        .unwrap();
    assert_eq!(batch.series.len(), 100);

    let price = venue.fetch_ticker("SOL/USDT").unwrap();
    let analysis = analyze(&batch.closed(), price, &AnalysisParams::default()).unwrap();
    let cfg = GridConfig::new(92.0, 110.0, 6, SpacingType::Geometric, Direction::Long).unwrap();
    let grid = compose(&cfg, &analysis.support_prices(), &analysis.resistance_prices()).unwrap();
    let order_plan = plan(&grid, Direction::Long, 5_000.0, 50.0);

    let accepted = order_plan
        .instructions
        .iter()
        .filter(|i| {
            venue
                .create_order(
                    "SOL/USDT",
                    OrderType::Limit,
                    i.side,
                    i.quantity,
                    Some(i.price),
                )
                .is_ok()
        })
        .count();

    let above = grid.prices().iter().filter(|p| **p > 108.0).count();
    assert!(above >= 1);
    assert_eq!(accepted, grid.prices().len() - above);
    assert_eq!(venue.open_orders().len(), accepted);
    assert_eq!(venue.submission_count(), grid.prices().len());
}
