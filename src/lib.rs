pub mod adapters;
pub mod agent;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod retrieval;
pub mod signing;
pub mod strategy;

pub use config::{AppConfig, PipelineConfig};
pub use coordination::CancelToken;
pub use error::{AugurError, Result};
pub use exchange::{ExecutionVenue, MarketCatalog};
pub use signing::{OrderSigner, Wallet};
pub use strategy::{CycleOutcome, TradeReport, Trader};
