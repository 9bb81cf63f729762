use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::{Market, OrderSide};

/// A (market, outcome) pair that survived relevance filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub market: Market,
    pub outcome: String,
    /// Similarity to the trading thesis in [0, 1]
    pub relevance: Decimal,
    /// Outcome price seen when the candidate was filtered
    pub observed_price: Decimal,
}

impl Candidate {
    pub fn market_id(&self) -> &str {
        &self.market.id
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.market.id, self.outcome)
    }
}

/// Calibrated probability for one candidate's outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEstimate {
    pub candidate: Candidate,
    /// Probability in (epsilon, 1 - epsilon)
    pub probability: Decimal,
    /// Agreement across signal passes in [0, 1]
    pub confidence: Decimal,
    /// Signals that contributed to the estimate
    pub sources: Vec<String>,
    pub rationale: String,
}

/// A positive expected-value trade against live prices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeProposal {
    pub estimate: ForecastEstimate,
    pub direction: OrderSide,
    /// Executable price the edge was measured against
    pub price: Decimal,
    pub edge: Decimal,
    /// Proposed size in shares
    pub size: Decimal,
    pub fee_estimate: Decimal,
    pub expected_value: Decimal,
}

impl TradeProposal {
    pub fn market(&self) -> &Market {
        &self.estimate.candidate.market
    }

    pub fn outcome(&self) -> &str {
        &self.estimate.candidate.outcome
    }

    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }

    /// Ranking order, best first: expected value desc, edge desc, size asc,
    /// then market id and outcome so equal proposals sort deterministically.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .expected_value
            .cmp(&self.expected_value)
            .then_with(|| other.edge.cmp(&self.edge))
            .then_with(|| self.size.cmp(&other.size))
            .then_with(|| self.market().id.cmp(&other.market().id))
            .then_with(|| self.outcome().cmp(other.outcome()))
    }
}
