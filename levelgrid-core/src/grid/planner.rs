//! Order planning: turn a grid into concrete buy/sell instructions.
//!
//! Every instruction risks the same quote amount (`per_grid_size`), so its
//! quantity is `per_grid_size / price`. Zero balance or zero percentage is not
//! guarded: it yields zero-quantity instructions for the venue to reject.

use serde::{Deserialize, Serialize};

use crate::domain::{Direction, GridLevelSet, OrderInstruction, OrderSide};

/// Instructions for one planning cycle plus the sizing they were derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlan {
    pub direction: Direction,
    pub investment_amount: f64,
    pub per_grid_size: f64,
    pub instructions: Vec<OrderInstruction>,
}

/// Size and lay out orders over `grid` for the given direction.
pub fn plan(
    grid: &GridLevelSet,
    direction: Direction,
    free_balance: f64,
    investment_percent: f64,
) -> OrderPlan {
    let investment_amount = free_balance * investment_percent / 100.0;
    let per_grid_size = investment_amount / grid.intervals() as f64;
    OrderPlan {
        direction,
        investment_amount,
        per_grid_size,
        instructions: instructions_for(grid.prices(), direction, per_grid_size),
    }
}

/// Lay out instructions over ascending `levels`.
///
/// Neutral pairs each interval: a buy at its lower level and a sell at its
/// upper level. Interior prices therefore carry one buy and one sell.
pub fn instructions_for(
    levels: &[f64],
    direction: Direction,
    per_grid_size: f64,
) -> Vec<OrderInstruction> {
    let at = |level_index: usize, side: OrderSide| {
        let price = levels[level_index];
        OrderInstruction {
            level_index,
            side,
            price,
            quantity: per_grid_size / price,
        }
    };

    match direction {
        Direction::Neutral => (0..levels.len().saturating_sub(1))
            .flat_map(|i| [at(i, OrderSide::Buy), at(i + 1, OrderSide::Sell)])
            .collect(),
        Direction::Long => (0..levels.len()).map(|i| at(i, OrderSide::Buy)).collect(),
        Direction::Short => (0..levels.len()).map(|i| at(i, OrderSide::Sell)).collect(),
    }
}
