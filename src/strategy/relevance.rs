use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::RelevanceConfig;
use crate::domain::Candidate;
use crate::error::{AugurError, Result};
use crate::exchange::CatalogSnapshot;
use crate::retrieval::RetrievalIndex;

/// Hits requested per candidate slot; markets carry several outcomes and
/// some hits are filtered out as untradeable.
const RETRIEVAL_HEADROOM: usize = 4;

/// Narrows the catalog to markets related to the trading thesis.
pub struct RelevanceFilter {
    config: RelevanceConfig,
}

impl RelevanceFilter {
    pub fn new(config: RelevanceConfig) -> Self {
        Self { config }
    }

    /// One candidate per (market, outcome), most relevant first.
    ///
    /// Returns `EmptyCandidateSet` when nothing clears the threshold.
    pub async fn filter(
        &self,
        snapshot: &CatalogSnapshot,
        index: &dyn RetrievalIndex,
        thesis: &str,
    ) -> Result<Vec<Candidate>> {
        let top_k = self.config.max_candidates.saturating_mul(RETRIEVAL_HEADROOM).max(1);
        let mut hits: Vec<(String, Decimal)> = index
            .query(thesis, top_k)
            .await?
            .into_iter()
            .filter_map(|(id, score)| {
                let score = Decimal::from_f64(score)?.round_dp(6);
                Some((id, score.clamp(Decimal::ZERO, Decimal::ONE)))
            })
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut candidates = Vec::new();
        for (market_id, score) in hits {
            if score < self.config.threshold {
                continue;
            }
            let Some(market) = snapshot.market(&market_id) else {
                debug!(%market_id, "retrieval hit not in catalog snapshot");
                continue;
            };
            let tradeable_event = snapshot
                .event(&market.event_id)
                .map(|e| e.is_tradeable())
                .unwrap_or(false);
            if !tradeable_event {
                debug!(%market_id, "event not tradeable");
                continue;
            }
            if let Err(reason) = market.check_selectable(self.config.price_sum_tolerance) {
                debug!(%market_id, %reason, "market not selectable");
                continue;
            }

            for (outcome, price) in market.outcomes.iter().zip(&market.prices) {
                let Some(price) = *price else { continue };
                candidates.push(Candidate {
                    market: market.clone(),
                    outcome: outcome.clone(),
                    relevance: score,
                    observed_price: price,
                });
            }
            if candidates.len() >= self.config.max_candidates {
                break;
            }
        }
        candidates.truncate(self.config.max_candidates);

        if candidates.is_empty() {
            info!(threshold = %self.config.threshold, "no market cleared the relevance threshold");
            return Err(AugurError::EmptyCandidateSet);
        }

        info!(
            count = candidates.len(),
            top = %candidates[0].label(),
            "relevance filter produced candidates"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Event, Market};
    use crate::retrieval::LexicalIndex;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;

    struct FixedIndex(Vec<(String, f64)>);

    #[async_trait]
    impl RetrievalIndex for FixedIndex {
        async fn query(&self, _text: &str, top_k: usize) -> Result<Vec<(String, f64)>> {
            Ok(self.0.iter().take(top_k).cloned().collect())
        }
    }

    fn market(id: &str, yes: Decimal, no: Decimal) -> Market {
        Market {
            id: id.to_string(),
            event_id: "e1".to_string(),
            question: format!("Question {}?", id),
            description: String::new(),
            outcomes: vec!["Yes".to_string(), "No".to_string()],
            token_ids: vec!["1".to_string(), "2".to_string()],
            prices: vec![Some(yes), Some(no)],
            tick_size: dec!(0.01),
            min_order_size: dec!(1),
            neg_risk: false,
            active: true,
            closed: false,
        }
    }

    fn snapshot(markets: Vec<Market>) -> CatalogSnapshot {
        CatalogSnapshot {
            events: vec![Event {
                id: "e1".to_string(),
                title: "Event".to_string(),
                description: String::new(),
                end_time: None,
                market_ids: markets.iter().map(|m| m.id.clone()).collect(),
                active: true,
                closed: false,
                archived: false,
                restricted: false,
            }],
            markets,
        }
    }

    fn filter(threshold: Decimal, max_candidates: usize) -> RelevanceFilter {
        RelevanceFilter::new(RelevanceConfig {
            thesis: "t".to_string(),
            threshold,
            max_candidates,
            price_sum_tolerance: dec!(0.05),
        })
    }

    #[tokio::test]
    async fn test_one_candidate_per_outcome_in_relevance_order() {
        let snap = snapshot(vec![market("a", dec!(0.4), dec!(0.6)), market("b", dec!(0.3), dec!(0.7))]);
        let index = FixedIndex(vec![("b".into(), 0.9), ("a".into(), 0.5)]);

        let candidates = filter(dec!(0.1), 10).filter(&snap, &index, "t").await.unwrap();
        let labels: Vec<_> = candidates.iter().map(|c| c.label()).collect();
        assert_eq!(labels, vec!["b/Yes", "b/No", "a/Yes", "a/No"]);
        assert_eq!(candidates[0].observed_price, dec!(0.3));
        assert_eq!(candidates[0].relevance, dec!(0.9));
    }

    #[tokio::test]
    async fn test_threshold_and_untradeable_markets_excluded() {
        let mut closed = market("closed", dec!(0.4), dec!(0.6));
        closed.closed = true;
        let skewed = market("skewed", dec!(0.4), dec!(0.9));
        let snap = snapshot(vec![closed, skewed, market("low", dec!(0.5), dec!(0.5))]);
        let index = FixedIndex(vec![
            ("closed".into(), 0.9),
            ("skewed".into(), 0.8),
            ("low".into(), 0.05),
            ("ghost".into(), 0.7),
        ]);

        let err = filter(dec!(0.1), 10).filter(&snap, &index, "t").await.unwrap_err();
        assert!(matches!(err, AugurError::EmptyCandidateSet));
        assert!(err.is_no_trade());
    }

    #[tokio::test]
    async fn test_scores_clamped_and_truncated() {
        let snap = snapshot(vec![market("a", dec!(0.4), dec!(0.6)), market("b", dec!(0.3), dec!(0.7))]);
        let index = FixedIndex(vec![("a".into(), 1.7), ("b".into(), 0.9)]);

        let candidates = filter(dec!(0.1), 3).filter(&snap, &index, "t").await.unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].relevance, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_with_lexical_index() {
        let mut rain = market("rain", dec!(0.4), dec!(0.6));
        rain.question = "Will it rain in London on Friday?".to_string();
        let mut fed = market("fed", dec!(0.2), dec!(0.8));
        fed.question = "Will the Fed cut rates in March?".to_string();
        let snap = snapshot(vec![rain, fed]);
        let index = LexicalIndex::from_catalog(&snap.events, &snap.markets);

        let candidates = filter(dec!(0.1), 8)
            .filter(&snap, &index, "London rain forecast")
            .await
            .unwrap();
        assert!(candidates.iter().all(|c| c.market_id() == "rain"));
    }
}
