use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::exchange::{ExecutionVenue, VenueAck, VenueOrderState};
use crate::signing::SignedOrder;

/// Paper venue: accepts every order immediately and remembers it.
#[derive(Default)]
pub struct DryRunVenue {
    accepted: Mutex<HashMap<u64, String>>,
}

impl DryRunVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted_count(&self) -> usize {
        self.accepted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl ExecutionVenue for DryRunVenue {
    fn is_dry_run(&self) -> bool {
        true
    }

    async fn submit(&self, order: &SignedOrder) -> Result<VenueAck> {
        let o = &order.order;
        let order_id = format!("dry-run-{}", order.order_hash.trim_start_matches("0x"));

        info!(
            "DRY RUN: Would submit {} {} shares of {}/{} @ {} (nonce {})",
            o.side,
            o.size(),
            o.market_id,
            o.outcome,
            o.price(),
            o.nonce
        );

        self.accepted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(o.nonce, order_id.clone());

        Ok(VenueAck::Accepted {
            nonce: o.nonce,
            order_id,
        })
    }

    async fn status(&self, nonce: u64) -> Result<VenueOrderState> {
        let accepted = self
            .accepted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        Ok(match accepted.get(&nonce) {
            Some(order_id) => VenueOrderState::Confirmed {
                order_id: order_id.clone(),
            },
            None => VenueOrderState::Unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Order, OrderSide};
    use crate::signing::{OrderSigner, StaticKeySource};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn signed(nonce: u64) -> SignedOrder {
        let signer = OrderSigner::new(
            Arc::new(StaticKeySource::new(
                "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            )),
            137,
        );
        signer
            .sign(&Order {
                market_id: "m1".to_string(),
                outcome: "Yes".to_string(),
                token_id: "1".to_string(),
                side: OrderSide::Buy,
                price_ticks: 40,
                tick_size: dec!(0.01),
                size_lots: 500,
                lot_size: dec!(0.01),
                salt: 1,
                nonce,
                expiration: 1_900_000_000,
                neg_risk: false,
            })
            .unwrap()
    }

    #[tokio::test]
    async fn test_dry_run_accepts_and_confirms() {
        let venue = DryRunVenue::new();
        assert!(venue.is_dry_run());

        let ack = venue.submit(&signed(9)).await.unwrap();
        assert!(matches!(ack, VenueAck::Accepted { nonce: 9, .. }));
        assert!(matches!(venue.status(9).await.unwrap(), VenueOrderState::Confirmed { .. }));
        assert_eq!(venue.status(10).await.unwrap(), VenueOrderState::Unknown);
        assert_eq!(venue.accepted_count(), 1);
        assert_eq!(venue.usdc_balance().await.unwrap(), None);
    }
}
