use futures::stream::{self, StreamExt};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::agent::{ForecastContext, ForecastOracle};
use crate::config::ForecastConfig;
use crate::coordination::CancelToken;
use crate::domain::{Candidate, ForecastEstimate};
use crate::error::{AugurError, Result};

/// Confidence reported when only one pass ran and agreement cannot be measured
pub const SINGLE_PASS_CONFIDENCE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Turns candidates into calibrated probability estimates.
pub struct ForecastScorer {
    oracle: Arc<dyn ForecastOracle>,
    config: ForecastConfig,
    concurrency: usize,
    timeout: Duration,
}

impl ForecastScorer {
    pub fn new(
        oracle: Arc<dyn ForecastOracle>,
        config: ForecastConfig,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            oracle,
            config,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    fn invalid(candidate: &Candidate, reason: impl Into<String>) -> AugurError {
        AugurError::InvalidEstimate {
            market_id: candidate.market.id.clone(),
            outcome: candidate.outcome.clone(),
            reason: reason.into(),
        }
    }

    /// Run every pass for one candidate. Any out-of-range pass invalidates
    /// the whole estimate.
    pub async fn score(&self, candidate: &Candidate, context: &ForecastContext) -> Result<ForecastEstimate> {
        let passes = self.config.passes.max(1);
        let mut values = Vec::with_capacity(passes as usize);
        let mut rationale = String::new();

        for pass in 0..passes {
            let answer = tokio::time::timeout(
                self.timeout,
                self.oracle.estimate(&candidate.market.question, context),
            )
            .await
            .map_err(|_| AugurError::Oracle(format!("pass {} timed out after {:?}", pass + 1, self.timeout)))??;

            let p = answer.probability;
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(Self::invalid(candidate, format!("pass {} returned {}", pass + 1, p)));
            }
            if pass == 0 {
                rationale = answer.rationale;
            }
            values.push(p);
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let confidence = if values.len() == 1 {
            SINGLE_PASS_CONFIDENCE
        } else {
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let spread = (variance.sqrt() / 0.5).min(1.0);
            Decimal::from_f64(1.0 - spread)
                .unwrap_or(Decimal::ZERO)
                .round_dp(6)
        };

        let eps = self.config.probability_epsilon;
        let probability = Decimal::from_f64(mean)
            .ok_or_else(|| Self::invalid(candidate, format!("mean {} not representable", mean)))?
            .round_dp(6)
            .clamp(eps, Decimal::ONE - eps);

        debug!(
            candidate = %candidate.label(),
            %probability,
            %confidence,
            passes,
            "scored candidate"
        );

        Ok(ForecastEstimate {
            candidate: candidate.clone(),
            probability,
            confidence,
            sources: vec![self.oracle.name().to_string()],
            rationale,
        })
    }

    /// Score candidates with bounded concurrency. Output order matches input
    /// order; each entry carries its own result.
    pub async fn score_all(
        &self,
        inputs: Vec<(Candidate, ForecastContext)>,
        cancel: &CancelToken,
    ) -> Vec<(Candidate, Result<ForecastEstimate>)> {
        stream::iter(inputs)
            .map(|(candidate, context)| async move {
                if cancel.is_cancelled() {
                    return (candidate, Err(AugurError::Cancelled));
                }
                let result = self.score(&candidate, &context).await;
                if let Err(e) = &result {
                    warn!(candidate = %candidate.label(), "dropping candidate: {}", e);
                }
                (candidate, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
