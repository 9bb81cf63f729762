use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A Polymarket event grouping one or more markets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub end_time: Option<DateTime<Utc>>,
    pub market_ids: Vec<String>,
    pub active: bool,
    pub closed: bool,
    pub archived: bool,
    pub restricted: bool,
}

impl Event {
    /// Events the agent is allowed to trade
    pub fn is_tradeable(&self) -> bool {
        self.active && !self.closed && !self.archived && !self.restricted
    }
}

/// One market (question) with its ordered outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub event_id: String,
    pub question: String,
    pub description: String,
    /// Outcome labels in venue order (e.g. ["Yes", "No"])
    pub outcomes: Vec<String>,
    /// CLOB token id per outcome, aligned with `outcomes`
    pub token_ids: Vec<String>,
    /// Last price per outcome, aligned with `outcomes`; `None` when unpriced
    pub prices: Vec<Option<Decimal>>,
    pub tick_size: Decimal,
    pub min_order_size: Decimal,
    pub neg_risk: bool,
    pub active: bool,
    pub closed: bool,
}

impl Market {
    pub fn outcome_index(&self, outcome: &str) -> Option<usize> {
        self.outcomes
            .iter()
            .position(|o| o.eq_ignore_ascii_case(outcome.trim()))
    }

    pub fn price_of(&self, outcome: &str) -> Option<Decimal> {
        self.outcome_index(outcome)
            .and_then(|i| self.prices.get(i).copied().flatten())
    }

    pub fn token_id(&self, outcome: &str) -> Option<&str> {
        self.outcome_index(outcome)
            .and_then(|i| self.token_ids.get(i))
            .map(String::as_str)
    }

    pub fn is_binary(&self) -> bool {
        self.outcomes.len() == 2
    }

    /// Sum of all outcome prices, `None` if any outcome is unpriced
    pub fn price_sum(&self) -> Option<Decimal> {
        self.prices.iter().try_fold(Decimal::ZERO, |acc, p| p.map(|p| acc + p))
    }

    /// Check the market can be traded; returns the reason when it cannot.
    ///
    /// Closed or inactive markets, unpriced outcomes, prices outside (0, 1)
    /// and binary markets whose prices do not sum to ~1 are all rejected.
    pub fn check_selectable(&self, price_sum_tolerance: Decimal) -> Result<(), String> {
        if self.closed {
            return Err("market closed".to_string());
        }
        if !self.active {
            return Err("market inactive".to_string());
        }
        if self.outcomes.is_empty() || self.outcomes.len() != self.prices.len() {
            return Err("outcomes and prices misaligned".to_string());
        }
        if self.token_ids.len() != self.outcomes.len() {
            return Err("outcomes and token ids misaligned".to_string());
        }
        for (label, price) in self.outcomes.iter().zip(&self.prices) {
            match price {
                None => return Err(format!("outcome {} unpriced", label)),
                Some(p) if *p <= Decimal::ZERO || *p >= Decimal::ONE => {
                    return Err(format!("outcome {} priced outside (0, 1): {}", label, p));
                }
                Some(_) => {}
            }
        }
        if self.is_binary() {
            if let Some(sum) = self.price_sum() {
                if (sum - Decimal::ONE).abs() > price_sum_tolerance {
                    return Err(format!("binary prices sum to {}", sum));
                }
            }
        }
        Ok(())
    }
}

/// Top of book for one outcome token
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookTop {
    pub best_bid: Option<Decimal>,
    pub best_ask: Option<Decimal>,
    /// Shares resting at the best bid, `None` when the venue did not report depth
    pub bid_size: Option<Decimal>,
    /// Shares resting at the best ask
    pub ask_size: Option<Decimal>,
}

impl BookTop {
    /// Book with a single last-trade price and no depth information
    pub fn from_price(price: Decimal) -> Self {
        Self {
            best_bid: Some(price),
            best_ask: Some(price),
            bid_size: None,
            ask_size: None,
        }
    }

    /// Get mid price
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::from(2)),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => None,
        }
    }
}
