use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::config::ExecutionConfig;
use crate::coordination::CancelToken;
use crate::domain::{ExecutionOutcome, ExecutionResult, ExecutionState};
use crate::error::{AugurError, Result};
use crate::exchange::{ExecutionVenue, VenueAck, VenueOrderState};
use crate::signing::SignedOrder;

/// Outcome of one submission
#[derive(Debug)]
enum Attempt {
    Confirmed(String),
    Rejected(String),
    TimedOut(String),
}

/// Guards the executor state machine for one order
struct StateTracker {
    nonce: u64,
    state: ExecutionState,
}

impl StateTracker {
    fn new(nonce: u64) -> Self {
        Self {
            nonce,
            state: ExecutionState::Built,
        }
    }

    fn advance(&mut self, next: ExecutionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(AugurError::InvalidStateTransition {
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        debug!(nonce = self.nonce, "{} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Drives a signed order to a terminal result with bounded re-submission.
pub struct Executor {
    venue: Arc<dyn ExecutionVenue>,
    config: ExecutionConfig,
}

impl Executor {
    pub fn new(venue: Arc<dyn ExecutionVenue>, config: ExecutionConfig) -> Self {
        Self { venue, config }
    }

    pub fn is_dry_run(&self) -> bool {
        self.venue.is_dry_run()
    }

    /// Submit `order` until it is confirmed, rejected or retries run out.
    ///
    /// `Err` is reserved for state machine violations; every venue outcome,
    /// including abandonment, is reported as an `ExecutionResult`.
    pub async fn execute(&self, order: &SignedOrder, cancel: &CancelToken) -> Result<ExecutionResult> {
        let start = Instant::now();
        let nonce = order.nonce();
        let max_attempts = self.config.max_retries.max(1);
        let mut tracker = StateTracker::new(nonce);
        let mut attempts = 0u32;

        let finish = |outcome, order_id, attempts, reason: Option<String>| ExecutionResult {
            outcome,
            nonce,
            order_id,
            attempts,
            reason,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        loop {
            if attempts > 0 {
                match self.settle(nonce, cancel).await {
                    Some(Attempt::Confirmed(order_id)) => {
                        tracker.advance(ExecutionState::Confirmed)?;
                        info!(nonce, %order_id, attempts, "late confirmation from status check");
                        return Ok(finish(ExecutionOutcome::Confirmed, Some(order_id), attempts, None));
                    }
                    Some(Attempt::Rejected(reason)) => {
                        tracker.advance(ExecutionState::Rejected)?;
                        error!(nonce, attempts, %reason, "order rejected after timeout");
                        return Ok(finish(ExecutionOutcome::Rejected, None, attempts, Some(reason)));
                    }
                    _ => {}
                }
            }
            if cancel.is_cancelled() {
                return Ok(self.abandon(finish(ExecutionOutcome::TimedOut, None, attempts, None), true));
            }

            attempts += 1;
            tracker.advance(ExecutionState::Submitted)?;
            debug!(nonce, attempt = attempts, max_attempts, "submitting order");

            match self.submit_once(order).await {
                Attempt::Confirmed(order_id) => {
                    tracker.advance(ExecutionState::Confirmed)?;
                    info!(
                        nonce,
                        %order_id,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "order confirmed"
                    );
                    return Ok(finish(ExecutionOutcome::Confirmed, Some(order_id), attempts, None));
                }
                Attempt::Rejected(reason) => {
                    tracker.advance(ExecutionState::Rejected)?;
                    error!(
                        nonce,
                        market = %order.order.market_id,
                        outcome = %order.order.outcome,
                        side = %order.order.side,
                        price = %order.order.price(),
                        size = %order.order.size(),
                        %reason,
                        "order rejected by venue"
                    );
                    return Ok(finish(ExecutionOutcome::Rejected, None, attempts, Some(reason)));
                }
                Attempt::TimedOut(reason) => {
                    tracker.advance(ExecutionState::TimedOut)?;
                    warn!(nonce, attempt = attempts, max_attempts, %reason, "submission timed out");
                }
            }

            if attempts >= max_attempts {
                return Ok(self.abandon(finish(ExecutionOutcome::TimedOut, None, attempts, None), false));
            }

            let delay = self.backoff(attempts);
            debug!(nonce, delay_ms = delay.as_millis() as u64, "backing off before re-submission");
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return Ok(self.abandon(finish(ExecutionOutcome::TimedOut, None, attempts, None), true));
                }
            }
        }
    }

    fn abandon(&self, mut result: ExecutionResult, cancelled: bool) -> ExecutionResult {
        let reason = if cancelled && result.attempts == 0 {
            "cancelled before submission".to_string()
        } else if cancelled {
            format!("cancelled after {} attempts", result.attempts)
        } else {
            AugurError::ExecutionAbandoned {
                attempts: result.attempts,
            }
            .to_string()
        };
        warn!(nonce = result.nonce, attempts = result.attempts, %reason, "order abandoned");
        result.reason = Some(reason);
        result
    }

    async fn submit_once(&self, order: &SignedOrder) -> Attempt {
        let window = self.config.order_timeout();
        match timeout(window, self.venue.submit(order)).await {
            Err(_) => Attempt::TimedOut(format!("no acknowledgment within {}ms", window.as_millis())),
            Ok(Ok(VenueAck::Accepted { nonce, order_id })) if nonce == order.nonce() => {
                Attempt::Confirmed(order_id)
            }
            Ok(Ok(VenueAck::Accepted { nonce, .. })) => {
                Attempt::TimedOut(format!("acknowledgment for foreign nonce {}", nonce))
            }
            Ok(Ok(VenueAck::Rejected { reason })) => Attempt::Rejected(reason),
            Ok(Err(AugurError::Auth(msg))) => Attempt::Rejected(format!("authentication failed: {}", msg)),
            Ok(Err(e)) => {
                if !e.is_transient() {
                    debug!("non-transient submit error treated as timeout: {}", e);
                }
                Attempt::TimedOut(e.to_string())
            }
        }
    }

    /// Ask the venue what became of the nonce before re-sending it. Pending
    /// orders are polled for up to one order timeout.
    async fn settle(&self, nonce: u64, cancel: &CancelToken) -> Option<Attempt> {
        let deadline = Instant::now() + self.config.order_timeout();

        loop {
            let state = match timeout(self.config.order_timeout(), self.venue.status(nonce)).await {
                Ok(Ok(state)) => state,
                Ok(Err(e)) => {
                    debug!(nonce, "status lookup failed: {}", e);
                    return None;
                }
                Err(_) => {
                    debug!(nonce, "status lookup timed out");
                    return None;
                }
            };

            match state {
                VenueOrderState::Confirmed { order_id } => return Some(Attempt::Confirmed(order_id)),
                VenueOrderState::Rejected { reason } => return Some(Attempt::Rejected(reason)),
                VenueOrderState::Unknown => return None,
                VenueOrderState::Pending => {
                    if Instant::now() + self.config.poll_interval() > deadline {
                        debug!(nonce, "still pending after polling window");
                        return None;
                    }
                    tokio::select! {
                        _ = sleep(self.config.poll_interval()) => {}
                        _ = cancel.cancelled() => return None,
                    }
                }
            }
        }
    }

    /// `min(base * 2^(n-1), max)` plus up to a quarter of that in jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        let delay = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(self.config.backoff_max_ms);
        let jitter = if delay >= 4 {
            rand::thread_rng().gen_range(0..=delay / 4)
        } else {
            0
        };
        Duration::from_millis(delay + jitter)
    }
}
