use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A trade expressed in venue units. Immutable once signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub market_id: String,
    pub outcome: String,
    pub token_id: String,
    pub side: OrderSide,
    /// Limit price in whole ticks
    pub price_ticks: u64,
    pub tick_size: Decimal,
    /// Size in whole lots
    pub size_lots: u64,
    pub lot_size: Decimal,
    pub salt: u64,
    pub nonce: u64,
    /// Unix seconds after which the signature is void
    pub expiration: i64,
    pub neg_risk: bool,
}

impl Order {
    pub fn price(&self) -> Decimal {
        Decimal::from(self.price_ticks) * self.tick_size
    }

    /// Size in shares
    pub fn size(&self) -> Decimal {
        Decimal::from(self.size_lots) * self.lot_size
    }

    pub fn notional(&self) -> Decimal {
        self.price() * self.size()
    }
}

/// Executor state for one signed order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionState {
    Built,
    Submitted,
    Confirmed,
    Rejected,
    TimedOut,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionState::Confirmed | ExecutionState::Rejected | ExecutionState::TimedOut
        )
    }

    /// Legal moves of the executor state machine. A timed-out order may be
    /// re-submitted while retries remain, or settled by a late status report.
    pub fn can_transition_to(&self, next: ExecutionState) -> bool {
        use ExecutionState::*;
        matches!(
            (self, next),
            (Built, Submitted)
                | (Submitted, Confirmed)
                | (Submitted, Rejected)
                | (Submitted, TimedOut)
                | (TimedOut, Submitted)
                | (TimedOut, Confirmed)
                | (TimedOut, Rejected)
        )
    }
}

impl std::fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionState::Built => "BUILT",
            ExecutionState::Submitted => "SUBMITTED",
            ExecutionState::Confirmed => "CONFIRMED",
            ExecutionState::Rejected => "REJECTED",
            ExecutionState::TimedOut => "TIMED_OUT",
        };
        write!(f, "{}", s)
    }
}

/// Terminal outcome tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionOutcome {
    Confirmed,
    Rejected,
    TimedOut,
}

/// Final report for one signed order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub outcome: ExecutionOutcome,
    pub nonce: u64,
    /// Venue order id when the venue acknowledged the order
    pub order_id: Option<String>,
    /// Submission attempts consumed
    pub attempts: u32,
    /// Rejection reason or why retrying stopped
    pub reason: Option<String>,
    pub elapsed_ms: u64,
}

impl ExecutionResult {
    /// Re-submissions after the first attempt
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// A timed-out order whose retries were exhausted or cancelled
    pub fn is_abandoned(&self) -> bool {
        self.outcome == ExecutionOutcome::TimedOut
    }
}
