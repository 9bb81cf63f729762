use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub oracle: OracleConfig,
    pub relevance: RelevanceConfig,
    pub forecast: ForecastConfig,
    pub selection: SelectionConfig,
    pub order: OrderConfig,
    pub execution: ExecutionConfig,
    pub dry_run: DryRunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Gamma metadata API (events, markets)
    pub gamma_url: String,
    /// CLOB REST endpoint (books, orders)
    pub clob_url: String,
    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Upper bound on events pulled per run
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Gamma page size
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

fn default_request_timeout() -> u64 {
    10_000
}

fn default_max_events() -> usize {
    500
}

fn default_page_limit() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    /// Chat-completions base URL (OpenAI compatible)
    pub base_url: String,
    /// Model name
    pub model: String,
    /// Timeout for a single oracle call in milliseconds
    pub timeout_ms: u64,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: f32,
    /// Maximum concurrent oracle calls during scoring fan-out
    pub concurrency: usize,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    800
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceConfig {
    /// Free-text trading thesis used as the retrieval query
    pub thesis: String,
    /// Minimum similarity score in [0, 1]
    pub threshold: Decimal,
    /// Maximum candidates handed to the scorer
    pub max_candidates: usize,
    /// Allowed deviation of a binary market's price sum from 1
    pub price_sum_tolerance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    /// Independent oracle passes per candidate
    pub passes: u32,
    /// Probabilities are clamped to (epsilon, 1 - epsilon)
    pub probability_epsilon: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionConfig {
    /// Bankroll used for sizing when the venue cannot report a balance
    pub bankroll_usd: Decimal,
    /// Fraction of full Kelly to stake (e.g., 0.25)
    pub kelly_fraction: Decimal,
    /// Position-size cap per trade in USD
    pub max_position_usd: Decimal,
    /// Maximum fraction of displayed book depth taken by one trade
    pub max_liquidity_fraction: Decimal,
    /// Fee curve coefficient
    pub fee_rate: Decimal,
    /// Fee curve exponent applied to p * (1 - p)
    pub fee_exponent: u32,
    /// Maximum move of the live price versus the price seen at filtering time
    pub max_price_drift: Decimal,
    /// Permit selling an outcome when the estimate sits below the bid
    #[serde(default)]
    pub allow_sell: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfig {
    /// Size increment in shares
    pub lot_size: Decimal,
    /// Signature validity window in seconds
    pub order_ttl_secs: u64,
    /// Polygon chain id for the EIP-712 domain
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

fn default_chain_id() -> u64 {
    137
}

/// Upper bound for `order.order_ttl_secs`
pub const MAX_ORDER_TTL_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Window for a venue acknowledgment in milliseconds
    pub order_timeout_ms: u64,
    /// Maximum submission attempts of one signed order
    pub max_retries: u32,
    /// Backoff base in milliseconds (doubles per attempt)
    pub backoff_base_ms: u64,
    /// Backoff ceiling in milliseconds
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    /// Polling interval for order status in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_backoff_max() -> u64 {
    10_000
}

fn default_poll_interval() -> u64 {
    500
}

impl ExecutionConfig {
    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.order_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            order_timeout_ms: 5000,
            max_retries: 3,
            backoff_base_ms: 250,
            backoff_max_ms: 10_000,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DryRunConfig {
    /// Enable dry run mode (no real orders)
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Immutable per-run configuration threaded through every pipeline stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub relevance: RelevanceConfig,
    pub forecast: ForecastConfig,
    pub selection: SelectionConfig,
    pub order: OrderConfig,
    pub execution: ExecutionConfig,
    pub oracle_concurrency: usize,
    pub oracle_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("execution.poll_interval_ms", 500)?
            .set_default("dry_run.enabled", true)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Environment-specific overrides (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("AUGUR_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // AUGUR_SELECTION__MAX_POSITION_USD, etc.
            .add_source(
                Environment::with_prefix("AUGUR")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Built-in configuration matching `config/default.toml`
    pub fn default_config(dry_run: bool) -> Self {
        use rust_decimal_macros::dec;

        Self {
            catalog: CatalogConfig {
                gamma_url: "https://gamma-api.polymarket.com".to_string(),
                clob_url: "https://clob.polymarket.com".to_string(),
                request_timeout_ms: default_request_timeout(),
                max_events: default_max_events(),
                page_limit: default_page_limit(),
            },
            oracle: OracleConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_ms: 60_000,
                temperature: 0.0,
                concurrency: 4,
                max_tokens: default_max_tokens(),
            },
            relevance: RelevanceConfig {
                thesis: "Markets where careful research into public information gives an edge"
                    .to_string(),
                threshold: dec!(0.10),
                max_candidates: 8,
                price_sum_tolerance: dec!(0.05),
            },
            forecast: ForecastConfig {
                passes: 1,
                probability_epsilon: dec!(0.001),
            },
            selection: SelectionConfig {
                bankroll_usd: dec!(100),
                kelly_fraction: dec!(0.25),
                max_position_usd: dec!(10),
                max_liquidity_fraction: dec!(0.10),
                fee_rate: dec!(0.0175),
                fee_exponent: 1,
                max_price_drift: dec!(0.10),
                allow_sell: false,
            },
            order: OrderConfig {
                lot_size: dec!(0.01),
                order_ttl_secs: 1800,
                chain_id: default_chain_id(),
            },
            execution: ExecutionConfig::default(),
            dry_run: DryRunConfig { enabled: dry_run },
            logging: LoggingConfig::default(),
        }
    }

    /// Snapshot of everything a single pipeline run reads
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            relevance: self.relevance.clone(),
            forecast: self.forecast.clone(),
            selection: self.selection.clone(),
            order: self.order.clone(),
            execution: self.execution.clone(),
            oracle_concurrency: self.oracle.concurrency,
            oracle_timeout: Duration::from_millis(self.oracle.timeout_ms),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let unit = |v: Decimal| v >= Decimal::ZERO && v <= Decimal::ONE;

        if !unit(self.relevance.threshold) {
            errors.push("relevance.threshold must be within [0, 1]".to_string());
        }
        if self.relevance.max_candidates == 0 {
            errors.push("relevance.max_candidates must be at least 1".to_string());
        }
        if self.relevance.thesis.trim().is_empty() {
            errors.push("relevance.thesis must not be empty".to_string());
        }
        if !unit(self.relevance.price_sum_tolerance) {
            errors.push("relevance.price_sum_tolerance must be within [0, 1]".to_string());
        }

        if self.forecast.passes == 0 {
            errors.push("forecast.passes must be at least 1".to_string());
        }
        let eps = self.forecast.probability_epsilon;
        if eps <= Decimal::ZERO || eps >= Decimal::new(5, 1) {
            errors.push("forecast.probability_epsilon must be within (0, 0.5)".to_string());
        }
        if self.oracle.concurrency == 0 {
            errors.push("oracle.concurrency must be at least 1".to_string());
        }

        if self.selection.bankroll_usd <= Decimal::ZERO {
            errors.push("selection.bankroll_usd must be positive".to_string());
        }
        if self.selection.max_position_usd <= Decimal::ZERO {
            errors.push("selection.max_position_usd must be positive".to_string());
        }
        if self.selection.kelly_fraction <= Decimal::ZERO || self.selection.kelly_fraction > Decimal::ONE {
            errors.push("selection.kelly_fraction must be within (0, 1]".to_string());
        }
        if self.selection.max_liquidity_fraction <= Decimal::ZERO
            || self.selection.max_liquidity_fraction > Decimal::ONE
        {
            errors.push("selection.max_liquidity_fraction must be within (0, 1]".to_string());
        }
        if self.selection.fee_rate < Decimal::ZERO {
            errors.push("selection.fee_rate must not be negative".to_string());
        }
        if !unit(self.selection.max_price_drift) {
            errors.push("selection.max_price_drift must be within [0, 1]".to_string());
        }

        if self.order.lot_size <= Decimal::ZERO {
            errors.push("order.lot_size must be positive".to_string());
        }
        if self.order.order_ttl_secs == 0 || self.order.order_ttl_secs > MAX_ORDER_TTL_SECS {
            errors.push(format!(
                "order.order_ttl_secs must be within [1, {}]",
                MAX_ORDER_TTL_SECS
            ));
        }

        if self.execution.max_retries == 0 {
            errors.push("execution.max_retries must be at least 1".to_string());
        }
        if self.execution.order_timeout_ms == 0 {
            errors.push("execution.order_timeout_ms must be positive".to_string());
        }
        if self.execution.backoff_max_ms < self.execution.backoff_base_ms {
            errors.push("execution.backoff_max_ms must not be below backoff_base_ms".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config(true);
        assert!(config.validate().is_ok());
        assert!(config.dry_run.enabled);
    }

    #[test]
    fn test_validate_collects_every_violation() {
        let mut config = AppConfig::default_config(true);
        config.relevance.threshold = dec!(1.5);
        config.forecast.passes = 0;
        config.execution.max_retries = 0;
        config.order.order_ttl_secs = MAX_ORDER_TTL_SECS + 1;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("relevance.threshold")));
        assert!(errors.iter().any(|e| e.contains("order_ttl_secs")));
    }

    #[test]
    fn test_pipeline_snapshot_carries_limits() {
        let config = AppConfig::default_config(false);
        let pipeline = config.pipeline();

        assert_eq!(pipeline.selection.max_position_usd, dec!(10));
        assert_eq!(pipeline.execution.max_retries, 3);
        assert_eq!(pipeline.oracle_concurrency, 4);
        assert_eq!(pipeline.oracle_timeout, Duration::from_secs(60));
    }
}
