use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the trading agent
#[derive(Error, Debug)]
pub enum AugurError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Market data errors
    #[error("Market data unavailable: {0}")]
    MarketDataUnavailable(String),

    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    // Pipeline short-circuits (no trade this cycle)
    #[error("No candidate cleared the relevance threshold")]
    EmptyCandidateSet,

    #[error("No viable trade: {0}")]
    NoViableTrade(String),

    // Per-candidate conditions
    #[error("Invalid estimate for {market_id}/{outcome}: {reason}")]
    InvalidEstimate {
        market_id: String,
        outcome: String,
        reason: String,
    },

    #[error("Oracle error: {0}")]
    Oracle(String),

    // Order construction
    #[error("Quantized size {size} is below venue minimum {minimum}")]
    SizeBelowMinimum { size: Decimal, minimum: Decimal },

    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    // Crypto/signing errors
    #[error("Signing unavailable: {0}")]
    SigningUnavailable(String),

    #[error("Signature error: {0}")]
    Signature(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    // Order execution errors
    #[error("Order submission failed: {0}")]
    OrderSubmission(String),

    #[error("Order timeout: {0}")]
    OrderTimeout(String),

    #[error("Execution abandoned after {attempts} attempts")]
    ExecutionAbandoned { attempts: u32 },

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AugurError {
    /// Normal pipeline termination: report "no trade this cycle", not a failure.
    pub fn is_no_trade(&self) -> bool {
        matches!(self, AugurError::EmptyCandidateSet | AugurError::NoViableTrade(_))
    }

    /// Faults the executor may retry: timeouts, throttling, transport errors.
    pub fn is_transient(&self) -> bool {
        match self {
            AugurError::OrderTimeout(_) | AugurError::RateLimited(_) => true,
            AugurError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }

    /// Conditions that imply a credential or configuration problem.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AugurError::SigningUnavailable(_) | AugurError::Config(_) | AugurError::Auth(_)
        )
    }
}

/// Result type alias for AugurError
pub type Result<T> = std::result::Result<T, AugurError>;
