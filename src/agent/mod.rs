//! Forecast oracles: the trait the scorer calls and the LLM-backed superforecaster.

pub mod openai;
pub mod oracle;

pub use openai::{superforecaster_prompt, OpenAiOracle};
pub use oracle::{parse_likelihood, ForecastContext, ForecastOracle, OracleAnswer};
