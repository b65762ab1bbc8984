//! In-memory paper venue.
//!
//! Serves canned candles, tickers and balances, and keeps a ledger of the
//! orders it accepted and cancelled. Rejection behaviour is configured with
//! [`RejectRule`]s so tests can exercise partial placement.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{CandleBatch, Exchange, ExchangeError, Timeframe};
use crate::domain::{CandleSeries, OrderHandle, OrderSide, OrderType};

/// When the paper venue refuses an order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RejectRule {
    /// The n-th submission (1-based, counting rejected ones).
    NthSubmission(usize),
    /// Any order priced strictly above the threshold.
    PriceAbove(f64),
    /// Zero, negative or non-finite quantities. Installed by default.
    NonPositiveQuantity,
}

/// An order resting on the paper book.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperOrder {
    pub id: String,
    pub symbol: String,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: Option<f64>,
}

#[derive(Debug, Default)]
struct Ledger {
    submissions: usize,
    next_id: u64,
    open: BTreeMap<u64, PaperOrder>,
    cancelled: Vec<String>,
}

#[derive(Debug)]
pub struct PaperExchange {
    candles: HashMap<String, CandleSeries>,
    tickers: HashMap<String, f64>,
    balance: HashMap<String, f64>,
    partial_last: bool,
    rules: Vec<RejectRule>,
    fail_cancels: bool,
    ledger: Mutex<Ledger>,
}

impl Default for PaperExchange {
    fn default() -> Self {
        Self::new()
    }
}

impl PaperExchange {
    pub fn new() -> Self {
        Self {
            candles: HashMap::new(),
            tickers: HashMap::new(),
            balance: HashMap::new(),
            partial_last: false,
            rules: vec![RejectRule::NonPositiveQuantity],
            fail_cancels: false,
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn with_candles(mut self, symbol: impl Into<String>, series: CandleSeries) -> Self {
        self.candles.insert(symbol.into(), series);
        self
    }

    /// Fix the ticker. Without one, the last close of the symbol's candles is used.
    pub fn with_ticker(mut self, symbol: impl Into<String>, price: f64) -> Self {
        self.tickers.insert(symbol.into(), price);
        self
    }

    pub fn with_balance(mut self, currency: impl Into<String>, free: f64) -> Self {
        self.balance.insert(currency.into(), free);
        self
    }

    /// Flag the newest candle of every batch as still forming.
    pub fn with_partial_last(mut self) -> Self {
        self.partial_last = true;
        self
    }

    pub fn reject(mut self, rule: RejectRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Make every cancellation fail with a network error.
    pub fn with_cancel_failure(mut self) -> Self {
        self.fail_cancels = true;
        self
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Orders accepted and not yet cancelled, in submission order.
    pub fn open_orders(&self) -> Vec<PaperOrder> {
        self.ledger().open.values().cloned().collect()
    }

    pub fn cancelled_ids(&self) -> Vec<String> {
        self.ledger().cancelled.clone()
    }

    /// Every `create_order` call so far, rejected ones included.
    pub fn submission_count(&self) -> usize {
        self.ledger().submissions
    }

    fn rejection(&self, submission: usize, quantity: f64, price: Option<f64>) -> Option<String> {
        self.rules.iter().find_map(|rule| match *rule {
            RejectRule::NthSubmission(n) if n == submission => {
                Some(format!("submission #{submission} refused"))
            }
            RejectRule::PriceAbove(limit) if price.is_some_and(|p| p > limit) => {
                Some(format!("price above {limit}"))
            }
            RejectRule::NonPositiveQuantity if !(quantity.is_finite() && quantity > 0.0) => {
                Some(format!("quantity must be positive, got {quantity}"))
            }
            _ => None,
        })
    }
}

impl Exchange for PaperExchange {
    fn name(&self) -> &str {
        "paper"
    }

    fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<CandleBatch, ExchangeError> {
        let series = self
            .candles
            .get(symbol)
            .ok_or_else(|| ExchangeError::SymbolNotFound {
                symbol: symbol.to_string(),
            })?;

        let candles = series.candles();
        let selected = match since {
            Some(start) => candles
                .iter()
                .filter(|c| c.timestamp >= start)
                .take(limit)
                .copied()
                .collect(),
            None => candles[candles.len().saturating_sub(limit)..].to_vec(),
        };

        Ok(CandleBatch {
            series: CandleSeries::from_candles(selected),
            last_partial: self.partial_last,
        })
    }

    fn fetch_ticker(&self, symbol: &str) -> Result<f64, ExchangeError> {
        if let Some(&price) = self.tickers.get(symbol) {
            return Ok(price);
        }
        self.candles
            .get(symbol)
            .and_then(|s| s.last())
            .map(|c| c.close)
            .ok_or_else(|| ExchangeError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }

    fn fetch_balance(&self) -> Result<HashMap<String, f64>, ExchangeError> {
        Ok(self.balance.clone())
    }

    fn create_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: OrderSide,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<OrderHandle, ExchangeError> {
        let mut ledger = self.ledger();
        ledger.submissions += 1;

        if let Some(reason) = self.rejection(ledger.submissions, quantity, price) {
            return Err(ExchangeError::Rejected { reason });
        }
        if order_type == OrderType::Limit && price.is_none() {
            return Err(ExchangeError::Rejected {
                reason: "limit order without price".to_string(),
            });
        }

        ledger.next_id += 1;
        let seq = ledger.next_id;
        let id = format!("paper-{seq}");
        ledger.open.insert(
            seq,
            PaperOrder {
                id: id.clone(),
                symbol: symbol.to_string(),
                order_type,
                side,
                quantity,
                price,
            },
        );
        Ok(OrderHandle {
            id,
            symbol: symbol.to_string(),
        })
    }

    fn cancel_order(&self, order_id: &str, _symbol: &str) -> Result<(), ExchangeError> {
        if self.fail_cancels {
            return Err(ExchangeError::NetworkUnreachable(
                "paper venue configured to drop cancels".to_string(),
            ));
        }
        let mut ledger = self.ledger();
        let seq = ledger
            .open
            .iter()
            .find(|(_, o)| o.id == order_id)
            .map(|(&seq, _)| seq)
            .ok_or_else(|| ExchangeError::OrderNotFound {
                order_id: order_id.to_string(),
            })?;
        ledger.open.remove(&seq);
        ledger.cancelled.push(order_id.to_string());
        Ok(())
    }
}
