//! Chat-completions superforecaster.
//!
//! Works against any OpenAI-compatible endpoint; the key is read from
//! `OPENAI_API_KEY`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};

use super::oracle::{ForecastContext, ForecastOracle, OracleAnswer};
use crate::config::OracleConfig;
use crate::error::{AugurError, Result};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Superforecaster prompt: decompose, gather, base rates, weigh factors,
/// answer with a single likelihood statement.
pub fn superforecaster_prompt(question: &str, context: &ForecastContext) -> String {
    let mut prompt = format!(
        r#"You are a Superforecaster tasked with correctly predicting the likelihood of events.
Use the following systematic process to develop an accurate prediction for the question=`{question}`
from the event `{title}`.

Event description: {event_description}
Resolution details: {market_description}
"#,
        question = question,
        title = context.event_title,
        event_description = context.event_description,
        market_description = context.market_description,
    );

    if let Some(base_rate) = context.base_rate {
        let _ = writeln!(prompt, "Reference base rate: {}", base_rate);
    }
    if !context.news.is_empty() {
        prompt.push_str("\nRecent news:\n");
        for item in &context.news {
            let _ = writeln!(prompt, "- {}", item);
        }
    }

    let _ = write!(
        prompt,
        r#"
Here are the key steps to use in your analysis:

1. Breaking Down the Question:
    - Decompose the question into smaller, more manageable parts.
    - Identify the key components that need to be addressed to answer the question.
2. Gathering Information:
    - Seek out diverse sources of information.
    - Look for both quantitative data and qualitative insights.
3. Consider Base Rates:
    - Use statistical baselines or historical averages as a starting point.
    - Compare the current situation to similar past events to establish a benchmark probability.
4. Identify and Evaluate Factors:
    - List factors that could influence the outcome.
    - Weigh each factor on the evidence, without over-relying on a single source.
5. Think Probabilistically:
    - Express the prediction as a probability rather than a certainty.

Given these steps produce a statement on the probability of outcome=`{outcome}` occurring.

Give your response in the following format:

I believe {question} has a likelihood `{{float}}` for outcome of `{{str}}`.
"#,
        outcome = context.outcome,
        question = question,
    );

    prompt
}

/// Superforecaster over a chat-completions API
pub struct OpenAiOracle {
    config: OracleConfig,
    api_key: String,
    http: Client,
}

impl OpenAiOracle {
    pub fn new(config: OracleConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AugurError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    pub fn from_env(config: OracleConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| AugurError::Auth(format!("{} not set", API_KEY_ENV)))?;
        Self::new(config, api_key)
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AugurError::RateLimited(format!("oracle {}", url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Oracle API error: {} - {}", status, body);
            return Err(AugurError::Oracle(format!("{} - {}", status, body)));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AugurError::Oracle("empty completion".to_string()))?;

        debug!("Oracle response received: {} chars", content.len());
        Ok(content)
    }
}

#[async_trait]
impl ForecastOracle for OpenAiOracle {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn estimate(&self, question: &str, context: &ForecastContext) -> Result<OracleAnswer> {
        let reply = self.chat(&superforecaster_prompt(question, context)).await?;
        let answer = OracleAnswer::from_reply(reply);
        if answer.probability.is_nan() {
            warn!(question, "oracle reply has no numeric likelihood");
        }
        Ok(answer)
    }
}
