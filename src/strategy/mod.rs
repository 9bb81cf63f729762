//! Trade decision and execution stages
//!
//! ```text
//! RelevanceFilter -> ForecastScorer -> TradeSelector -> OrderBuilder -> Executor
//! ```
//!
//! `Trader` in `pipeline` wires the stages together for one cycle.

pub mod builder;
pub mod executor;
pub mod fee_model;
pub mod forecast;
pub mod pipeline;
pub mod relevance;
pub mod selector;

pub use builder::{quantize_price, quantize_size, OrderBuilder};
pub use executor::Executor;
pub use fee_model::FeeModel;
pub use forecast::{ForecastScorer, SINGLE_PASS_CONFIDENCE};
pub use pipeline::{CycleOutcome, TradeReport, Trader};
pub use relevance::RelevanceFilter;
pub use selector::TradeSelector;
