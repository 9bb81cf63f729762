//! One-best-trade pipeline.
//!
//! Catalog snapshot → relevance filter → forecast scoring → trade selection
//! → order building → signing → execution. Every stage may short-circuit;
//! an empty stage ends the cycle with `CycleOutcome::NoTrade`.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{Executor, FeeModel, ForecastScorer, OrderBuilder, RelevanceFilter, TradeSelector};
use crate::agent::{ForecastContext, ForecastOracle};
use crate::config::PipelineConfig;
use crate::coordination::CancelToken;
use crate::domain::{Candidate, ExecutionOutcome, ExecutionResult, ForecastEstimate, TradeProposal};
use crate::error::{AugurError, Result};
use crate::exchange::{CatalogSnapshot, ExecutionVenue, MarketCatalog};
use crate::retrieval::{LexicalIndex, RetrievalIndex};
use crate::signing::{NonceAllocator, OrderSigner, SignedOrder};

/// Everything known about the order a cycle sent
#[derive(Debug, Clone)]
pub struct TradeReport {
    pub run_id: Uuid,
    pub proposal: TradeProposal,
    pub order: SignedOrder,
    pub result: ExecutionResult,
}

#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// A stage came up empty; nothing was sent
    NoTrade { reason: String },
    /// The venue confirmed or rejected the order
    Executed(TradeReport),
    /// Retries ran out or the run was cancelled after signing
    Abandoned(TradeReport),
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&TradeReport> {
        match self {
            CycleOutcome::NoTrade { .. } => None,
            CycleOutcome::Executed(r) | CycleOutcome::Abandoned(r) => Some(r),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.report()
            .map(|r| r.result.outcome == ExecutionOutcome::Confirmed)
            .unwrap_or(false)
    }
}

/// Drives one trade decision end to end.
pub struct Trader {
    catalog: Arc<dyn MarketCatalog>,
    oracle: Arc<dyn ForecastOracle>,
    venue: Arc<dyn ExecutionVenue>,
    signer: OrderSigner,
    nonces: Arc<NonceAllocator>,
    index: Option<Arc<dyn RetrievalIndex>>,
    config: PipelineConfig,
}

impl Trader {
    pub fn new(
        catalog: Arc<dyn MarketCatalog>,
        oracle: Arc<dyn ForecastOracle>,
        venue: Arc<dyn ExecutionVenue>,
        signer: OrderSigner,
        config: PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            oracle,
            venue,
            signer,
            nonces: Arc::new(NonceAllocator::new()),
            index: None,
            config,
        }
    }

    /// Use an external retrieval index instead of one built from the snapshot
    pub fn with_index(mut self, index: Arc<dyn RetrievalIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_nonces(mut self, nonces: Arc<NonceAllocator>) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Snapshot the catalog and run the relevance filter for `thesis`.
    pub async fn candidates(&self, thesis: &str) -> Result<(CatalogSnapshot, Vec<Candidate>)> {
        let snapshot = self.catalog.snapshot().await?;
        info!(
            events = snapshot.events.len(),
            markets = snapshot.markets.len(),
            "catalog snapshot"
        );

        let index: Arc<dyn RetrievalIndex> = match &self.index {
            Some(index) => index.clone(),
            None => Arc::new(LexicalIndex::from_catalog(&snapshot.events, &snapshot.markets)),
        };

        let candidates = RelevanceFilter::new(self.config.relevance.clone())
            .filter(&snapshot, index.as_ref(), thesis)
            .await?;
        Ok((snapshot, candidates))
    }

    /// Oracle input for a candidate, taken from the snapshot it came from
    pub fn context_for(snapshot: &CatalogSnapshot, candidate: &Candidate) -> ForecastContext {
        let event = snapshot.event(&candidate.market.event_id);
        ForecastContext {
            outcome: candidate.outcome.clone(),
            event_title: event.map(|e| e.title.clone()).unwrap_or_default(),
            event_description: event.map(|e| e.description.clone()).unwrap_or_default(),
            market_description: candidate.market.description.clone(),
            news: Vec::new(),
            base_rate: None,
        }
    }

    pub fn scorer(&self) -> ForecastScorer {
        ForecastScorer::new(
            self.oracle.clone(),
            self.config.forecast.clone(),
            self.config.oracle_concurrency,
            self.config.oracle_timeout,
        )
    }

    /// Score every candidate, keeping only valid estimates in candidate order.
    pub async fn forecast(
        &self,
        snapshot: &CatalogSnapshot,
        candidates: Vec<Candidate>,
        cancel: &CancelToken,
    ) -> Result<Vec<ForecastEstimate>> {
        let total = candidates.len();
        let inputs = candidates
            .into_iter()
            .map(|c| {
                let context = Self::context_for(snapshot, &c);
                (c, context)
            })
            .collect();

        let scored = self.scorer().score_all(inputs, cancel).await;
        if cancel.is_cancelled() {
            return Err(AugurError::Cancelled);
        }

        let estimates: Vec<ForecastEstimate> = scored.into_iter().filter_map(|(_, r)| r.ok()).collect();
        info!(valid = estimates.len(), total, "forecast scoring complete");

        if estimates.is_empty() {
            return Err(AugurError::NoViableTrade(format!(
                "none of {} candidates produced a valid estimate",
                total
            )));
        }
        Ok(estimates)
    }

    /// Venue balance when reported, else the configured bankroll
    async fn bankroll(&self) -> Decimal {
        match self.venue.usdc_balance().await {
            Ok(Some(balance)) => {
                info!(%balance, "using venue balance as bankroll");
                balance
            }
            Ok(None) => self.config.selection.bankroll_usd,
            Err(e) => {
                warn!("balance lookup failed, using configured bankroll: {}", e);
                self.config.selection.bankroll_usd
            }
        }
    }

    /// Run one full cycle for the configured thesis.
    ///
    /// Empty stages resolve to `NoTrade`. `Err` means the cycle aborted:
    /// cancelled before submission, below-minimum size, missing key
    /// material or an infrastructure fault.
    pub async fn one_best_trade(&self, cancel: &CancelToken) -> Result<CycleOutcome> {
        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            dry_run = self.venue.is_dry_run(),
            thesis = %self.config.relevance.thesis,
            "starting trade cycle"
        );

        match self.run(run_id, cancel).await {
            Ok(outcome) => Ok(outcome),
            Err(e) if e.is_no_trade() => {
                info!(%run_id, "no trade this cycle: {}", e);
                Ok(CycleOutcome::NoTrade { reason: e.to_string() })
            }
            Err(e) => {
                if e.is_fatal() {
                    error!(%run_id, "trade cycle aborted: {}", e);
                } else {
                    warn!(%run_id, "trade cycle aborted: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn run(&self, run_id: Uuid, cancel: &CancelToken) -> Result<CycleOutcome> {
        let check = || {
            if cancel.is_cancelled() {
                Err(AugurError::Cancelled)
            } else {
                Ok(())
            }
        };

        check()?;
        let (snapshot, candidates) = self.candidates(&self.config.relevance.thesis).await?;

        check()?;
        let estimates = self.forecast(&snapshot, candidates, cancel).await?;

        check()?;
        let bankroll = self.bankroll().await;
        let proposal = TradeSelector::new(self.config.selection.clone())
            .select(&estimates, self.catalog.as_ref(), bankroll)
            .await?;

        // Last exit before an order exists; from here on it ends in a report.
        check()?;
        let order = OrderBuilder::new(self.config.order.clone(), self.nonces.clone())
            .with_fees(FeeModel::from_config(&self.config.selection))
            .build(&proposal)?;
        let signed = self.signer.sign(&order)?;
        info!(
            %run_id,
            nonce = signed.nonce(),
            order_hash = %signed.order_hash,
            "order signed"
        );

        let result = Executor::new(self.venue.clone(), self.config.execution.clone())
            .execute(&signed, cancel)
            .await?;

        info!(
            %run_id,
            outcome = ?result.outcome,
            attempts = result.attempts,
            elapsed_ms = result.elapsed_ms,
            "trade cycle finished"
        );

        let report = TradeReport {
            run_id,
            proposal,
            order: signed,
            result,
        };
        Ok(match report.result.outcome {
            ExecutionOutcome::TimedOut => CycleOutcome::Abandoned(report),
            _ => CycleOutcome::Executed(report),
        })
    }
}
