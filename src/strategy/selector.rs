use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::{debug, info};

use super::fee_model::FeeModel;
use crate::config::SelectionConfig;
use crate::domain::{BookTop, ForecastEstimate, Market, OrderSide, TradeProposal};
use crate::error::{AugurError, Result};
use crate::exchange::MarketCatalog;

/// Sizing against a live book
#[derive(Debug, Clone, Copy, PartialEq)]
struct Quote {
    direction: OrderSide,
    price: Decimal,
    edge: Decimal,
    /// Shares displayed at `price`, `None` when unknown
    depth: Option<Decimal>,
}

/// Picks the single best positive-EV trade against live prices.
pub struct TradeSelector {
    config: SelectionConfig,
    fees: FeeModel,
}

impl TradeSelector {
    pub fn new(config: SelectionConfig) -> Self {
        let fees = FeeModel::from_config(&config);
        Self { config, fees }
    }

    /// Best executable quote for the estimate, if any carries positive edge
    fn quote(&self, probability: Decimal, book: &BookTop) -> Option<Quote> {
        let buy = book.best_ask.map(|ask| Quote {
            direction: OrderSide::Buy,
            price: ask,
            edge: probability - ask,
            depth: book.ask_size,
        });
        let sell = book
            .best_bid
            .filter(|_| self.config.allow_sell)
            .map(|bid| Quote {
                direction: OrderSide::Sell,
                price: bid,
                edge: bid - probability,
                depth: book.bid_size,
            });

        [buy, sell]
            .into_iter()
            .flatten()
            .filter(|q| q.edge > Decimal::ZERO && q.price > Decimal::ZERO && q.price < Decimal::ONE)
            .max_by(|a, b| a.edge.cmp(&b.edge))
    }

    /// Price, size and score one estimate against a fresh book.
    ///
    /// Returns the reason when the estimate is dropped.
    pub fn propose(
        &self,
        estimate: &ForecastEstimate,
        book: &BookTop,
        bankroll: Decimal,
    ) -> std::result::Result<TradeProposal, String> {
        let observed = estimate.candidate.observed_price;
        let reference = book.mid_price().ok_or("no live quote")?;
        let drift = (reference - observed).abs();
        if drift > self.config.max_price_drift {
            return Err(format!("price drifted {} -> {}", observed, reference));
        }

        let quote = self
            .quote(estimate.probability, book)
            .ok_or_else(|| format!("no positive edge at p={}", estimate.probability))?;

        let kelly = match quote.direction {
            OrderSide::Buy => quote.edge / (Decimal::ONE - quote.price),
            OrderSide::Sell => quote.edge / quote.price,
        };
        let stake = kelly * self.config.kelly_fraction * bankroll;

        let depth = quote.depth.unwrap_or(Decimal::ZERO);
        let liquidity_cap = depth * quote.price * self.config.max_liquidity_fraction;
        if liquidity_cap <= Decimal::ZERO {
            return Err("no displayed depth".to_string());
        }

        let usd = stake.min(self.config.max_position_usd).min(liquidity_cap);
        if usd <= Decimal::ZERO {
            return Err("zero stake".to_string());
        }

        let size = (usd / quote.price).round_dp_with_strategy(6, RoundingStrategy::ToZero);
        let fee_estimate = self.fees.fee(size, quote.price).round_dp(6);
        let expected_value = quote.edge * size - fee_estimate;
        if expected_value <= Decimal::ZERO {
            return Err(format!("non-positive EV {}", expected_value));
        }

        Ok(TradeProposal {
            estimate: estimate.clone(),
            direction: quote.direction,
            price: quote.price,
            edge: quote.edge,
            size,
            fee_estimate,
            expected_value,
        })
    }

    /// Re-read the market and book for every estimate and keep the best proposal.
    pub async fn select(
        &self,
        estimates: &[ForecastEstimate],
        catalog: &dyn MarketCatalog,
        bankroll: Decimal,
    ) -> Result<TradeProposal> {
        let mut live_markets: HashMap<String, Vec<Market>> = HashMap::new();
        let mut proposals = Vec::new();

        for estimate in estimates {
            let candidate = &estimate.candidate;
            let event_id = &candidate.market.event_id;

            if !live_markets.contains_key(event_id) {
                let markets = catalog.list_markets(event_id).await?;
                live_markets.insert(event_id.clone(), markets);
            }
            let live = live_markets
                .get(event_id)
                .and_then(|ms| ms.iter().find(|m| m.id == candidate.market.id));

            let reason = match live {
                None => Some("market vanished".to_string()),
                Some(m) if m.closed || !m.active => Some("market closed or inactive".to_string()),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                debug!(candidate = %candidate.label(), %reason, "dropping estimate");
                continue;
            }

            let Some(book) = catalog.get_book(candidate.market_id(), &candidate.outcome).await? else {
                debug!(candidate = %candidate.label(), "no live quote, treating as inactive");
                continue;
            };

            match self.propose(estimate, &book, bankroll) {
                Ok(proposal) => {
                    debug!(
                        candidate = %candidate.label(),
                        edge = %proposal.edge,
                        ev = %proposal.expected_value,
                        "viable proposal"
                    );
                    proposals.push(proposal);
                }
                Err(reason) => debug!(candidate = %candidate.label(), %reason, "dropping estimate"),
            }
        }

        let viable = proposals.len();
        let best = proposals
            .into_iter()
            .min_by(|a, b| a.rank_cmp(b))
            .ok_or_else(|| AugurError::NoViableTrade(format!("0 of {} estimates viable", estimates.len())))?;

        info!(
            viable,
            market = %best.market().id,
            outcome = %best.outcome(),
            direction = %best.direction,
            edge = %best.edge,
            ev = %best.expected_value,
            "selected trade"
        );
        Ok(best)
    }
}
