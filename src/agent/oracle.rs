use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Everything the oracle may read besides the question itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastContext {
    /// Outcome whose probability is requested
    pub outcome: String,
    pub event_title: String,
    pub event_description: String,
    /// Market resolution text
    pub market_description: String,
    pub news: Vec<String>,
    pub base_rate: Option<Decimal>,
}

/// Raw oracle reply. The probability is unchecked; the scorer validates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleAnswer {
    pub probability: f64,
    pub rationale: String,
}

impl OracleAnswer {
    /// Wrap a free-text reply. A reply with no likelihood carries NaN so the
    /// scorer rejects it as an invalid estimate.
    pub fn from_reply(reply: String) -> Self {
        Self {
            probability: parse_likelihood(&reply).unwrap_or(f64::NAN),
            rationale: reply,
        }
    }
}

/// Probability source for a market outcome
#[async_trait]
pub trait ForecastOracle: Send + Sync {
    /// Short name recorded in `ForecastEstimate::sources`
    fn name(&self) -> &str;

    async fn estimate(&self, question: &str, context: &ForecastContext) -> Result<OracleAnswer>;
}

/// Extract the number that follows "likelihood" in a superforecaster reply.
///
/// Accepts backticks and a trailing percent sign. The value is not range
/// checked.
pub fn parse_likelihood(text: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    let start = lower.rfind("likelihood")? + "likelihood".len();
    let tail = &text[start..];

    let begin = tail.find(|c: char| c.is_ascii_digit() || c == '.' || c == '-')?;
    let number: String = tail[begin..]
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || *c == '.' || (*i == 0 && *c == '-'))
        .map(|(_, c)| c)
        .collect();
    let value: f64 = number.trim_end_matches('.').parse().ok()?;

    let rest = tail[begin + number.len()..].trim_start_matches('`').trim_start();
    if rest.starts_with('%') {
        Some(value / 100.0)
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formatted_statement() {
        let text = "Reasoning...\nI believe Will it rain? has a likelihood `0.72` for outcome of `Yes`.";
        assert_eq!(parse_likelihood(text), Some(0.72));
    }

    #[test]
    fn test_parse_percent_and_plain() {
        assert_eq!(parse_likelihood("a likelihood of 35% for Yes"), Some(0.35));
        assert_eq!(parse_likelihood("Likelihood: .4"), Some(0.4));
    }

    #[test]
    fn test_parse_keeps_out_of_range_values() {
        assert_eq!(parse_likelihood("has a likelihood `1.4` for outcome"), Some(1.4));
        assert_eq!(parse_likelihood("likelihood -0.2"), Some(-0.2));
    }

    #[test]
    fn test_parse_uses_last_statement() {
        let text = "The base likelihood is 0.1. Final: has a likelihood `0.3`";
        assert_eq!(parse_likelihood(text), Some(0.3));
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert_eq!(parse_likelihood("likelihood `high` for Yes"), None);
        assert_eq!(parse_likelihood("no number here"), None);
    }

    #[test]
    fn test_reply_without_likelihood_carries_nan() {
        let answer = OracleAnswer::from_reply("I cannot say.".to_string());
        assert!(answer.probability.is_nan());
        assert_eq!(answer.rationale, "I cannot say.");

        let answer = OracleAnswer::from_reply("has a likelihood `0.25` for outcome of `No`".to_string());
        assert_eq!(answer.probability, 0.25);
    }
}
