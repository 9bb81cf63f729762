use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

use super::FeeModel;
use crate::config::OrderConfig;
use crate::domain::{Order, OrderSide, TradeProposal};
use crate::error::{AugurError, Result};
use crate::signing::NonceAllocator;

/// Snap a price onto the tick grid: buys round down, sells round up.
pub fn quantize_price(price: Decimal, tick: Decimal, side: OrderSide) -> Decimal {
    let ticks = price / tick;
    let ticks = match side {
        OrderSide::Buy => ticks.floor(),
        OrderSide::Sell => ticks.ceil(),
    };
    (ticks * tick).normalize()
}

/// Snap a size down to whole lots
pub fn quantize_size(size: Decimal, lot: Decimal) -> Decimal {
    ((size / lot).floor() * lot).normalize()
}

/// Turns a proposal into a venue-valid order with fresh nonce and salt.
pub struct OrderBuilder {
    config: OrderConfig,
    nonces: Arc<NonceAllocator>,
    fees: FeeModel,
}

impl OrderBuilder {
    pub fn new(config: OrderConfig, nonces: Arc<NonceAllocator>) -> Self {
        Self {
            config,
            nonces,
            fees: FeeModel::zero(),
        }
    }

    /// Fee curve used to recheck expected value at the quantized price and size
    pub fn with_fees(mut self, fees: FeeModel) -> Self {
        self.fees = fees;
        self
    }

    pub fn build(&self, proposal: &TradeProposal) -> Result<Order> {
        let market = proposal.market();
        let outcome = proposal.outcome();
        let tick = market.tick_size;
        let lot = self.config.lot_size;

        if tick <= Decimal::ZERO || tick >= Decimal::ONE {
            return Err(AugurError::InvalidOrder(format!("tick size {} out of range", tick)));
        }
        if lot <= Decimal::ZERO {
            return Err(AugurError::InvalidOrder(format!("lot size {} out of range", lot)));
        }
        let token_id = market
            .token_id(outcome)
            .ok_or_else(|| AugurError::InvalidOrder(format!("no token id for outcome {}", outcome)))?;

        let side = proposal.direction;
        let price = quantize_price(proposal.price, tick, side).clamp(tick, Decimal::ONE - tick);
        let p = proposal.estimate.probability;
        let edge = match side {
            OrderSide::Buy => p - price,
            OrderSide::Sell => price - p,
        };
        if edge <= Decimal::ZERO {
            return Err(AugurError::NoViableTrade(format!(
                "edge lost at quantized price {}",
                price
            )));
        }

        let size = quantize_size(proposal.size, lot);
        let minimum = market.min_order_size.max(lot);
        if size < minimum {
            info!(%size, %minimum, market = %market.id, "quantized size below venue minimum");
            return Err(AugurError::SizeBelowMinimum { size, minimum });
        }

        let fee = self.fees.fee(size, price);
        let expected_value = edge * size - fee;
        if expected_value <= Decimal::ZERO {
            return Err(AugurError::NoViableTrade(format!(
                "expected value {} after fee {} at quantized {} x {}",
                expected_value, fee, size, price
            )));
        }

        let price_ticks = (price / tick)
            .to_u64()
            .ok_or_else(|| AugurError::InvalidOrder(format!("price {} not representable", price)))?;
        let size_lots = (size / lot)
            .to_u64()
            .ok_or_else(|| AugurError::InvalidOrder(format!("size {} not representable", size)))?;

        let expiration = chrono::Utc::now().timestamp() + self.config.order_ttl_secs as i64;
        let order = Order {
            market_id: market.id.clone(),
            outcome: outcome.to_string(),
            token_id: token_id.to_string(),
            side,
            price_ticks,
            tick_size: tick,
            size_lots,
            lot_size: lot,
            salt: rand::random::<u64>(),
            nonce: self.nonces.allocate(),
            expiration,
            neg_risk: market.neg_risk,
        };

        debug!(
            nonce = order.nonce,
            price = %order.price(),
            size = %order.size(),
            "built {} order for {}/{}",
            side,
            order.market_id,
            order.outcome
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candidate, ForecastEstimate, Market};
    use rust_decimal_macros::dec;

    fn proposal(side: OrderSide, p: Decimal, price: Decimal, size: Decimal) -> TradeProposal {
        TradeProposal {
            estimate: ForecastEstimate {
                candidate: Candidate {
                    market: Market {
                        id: "m".to_string(),
                        event_id: "e".to_string(),
                        question: "q".to_string(),
                        description: String::new(),
                        outcomes: vec!["Yes".to_string(), "No".to_string()],
                        token_ids: vec!["111".to_string(), "222".to_string()],
                        prices: vec![Some(price), Some(Decimal::ONE - price)],
                        tick_size: dec!(0.01),
                        min_order_size: dec!(5),
                        neg_risk: true,
                        active: true,
                        closed: false,
                    },
                    outcome: "Yes".to_string(),
                    relevance: dec!(1),
                    observed_price: price,
                },
                probability: p,
                confidence: dec!(0.5),
                sources: vec![],
                rationale: String::new(),
            },
            direction: side,
            price,
            edge: (p - price).abs(),
            size,
            fee_estimate: Decimal::ZERO,
            expected_value: dec!(1),
        }
    }

    fn builder() -> OrderBuilder {
        OrderBuilder::new(
            OrderConfig {
                lot_size: dec!(0.01),
                order_ttl_secs: 1800,
                chain_id: 137,
            },
            Arc::new(NonceAllocator::starting_at(100)),
        )
    }

    #[test]
    fn test_price_rounding_direction() {
        assert_eq!(quantize_price(dec!(0.4567), dec!(0.01), OrderSide::Buy), dec!(0.45));
        assert_eq!(quantize_price(dec!(0.4567), dec!(0.01), OrderSide::Sell), dec!(0.46));
        assert_eq!(quantize_price(dec!(0.45), dec!(0.01), OrderSide::Sell), dec!(0.45));
    }

    #[test]
    fn test_quantization_is_idempotent() {
        for raw in [dec!(0.123456), dec!(0.999), dec!(0.5), dec!(0.0149)] {
            for side in [OrderSide::Buy, OrderSide::Sell] {
                let once = quantize_price(raw, dec!(0.001), side);
                assert_eq!(quantize_price(once, dec!(0.001), side), once);
            }
            let size = quantize_size(raw * dec!(100), dec!(0.01));
            assert_eq!(quantize_size(size, dec!(0.01)), size);
        }
    }

    #[test]
    fn test_size_never_rounds_up() {
        assert_eq!(quantize_size(dec!(12.349), dec!(0.01)), dec!(12.34));
        assert_eq!(quantize_size(dec!(0.009), dec!(0.01)), Decimal::ZERO);
    }

    #[test]
    fn test_build_buy_order() {
        let order = builder()
            .build(&proposal(OrderSide::Buy, dec!(0.70), dec!(0.403), dec!(24.816)))
            .unwrap();

        assert_eq!(order.price(), dec!(0.40));
        assert_eq!(order.price_ticks, 40);
        assert_eq!(order.size(), dec!(24.81));
        assert_eq!(order.size_lots, 2481);
        assert_eq!(order.token_id, "111");
        assert_eq!(order.nonce, 100);
        assert!(order.neg_risk);
        assert!(order.expiration > chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_nonces_and_salts_are_fresh() {
        let builder = builder();
        let p = proposal(OrderSide::Buy, dec!(0.70), dec!(0.40), dec!(25));
        let a = builder.build(&p).unwrap();
        let b = builder.build(&p).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_eq!(a.price_ticks, b.price_ticks);
    }

    #[test]
    fn test_below_minimum_is_terminal() {
        let err = builder()
            .build(&proposal(OrderSide::Buy, dec!(0.70), dec!(0.40), dec!(4.999)))
            .unwrap_err();
        match err {
            AugurError::SizeBelowMinimum { size, minimum } => {
                assert_eq!(size, dec!(4.99));
                assert_eq!(minimum, dec!(5));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_fees_recheck_after_quantization() {
        // edge 0.01 on 10 shares at 0.49; fee 10 x 0.05 x 0.2499 > 0.1
        let p = proposal(OrderSide::Buy, dec!(0.50), dec!(0.495), dec!(10));
        let err = builder()
            .with_fees(FeeModel::new(dec!(0.05), 1))
            .build(&p)
            .unwrap_err();
        assert!(matches!(err, AugurError::NoViableTrade(_)), "{:?}", err);

        let order = builder().with_fees(FeeModel::new(dec!(0.001), 1)).build(&p).unwrap();
        assert_eq!(order.price(), dec!(0.49));
    }

    #[test]
    fn test_sell_edge_lost_after_rounding() {
        // 0.991 rounds up to 1.00 and is clamped back to 0.99, below p
        let err = builder()
            .build(&proposal(OrderSide::Sell, dec!(0.995), dec!(0.991), dec!(10)))
            .unwrap_err();
        assert!(err.is_no_trade());
    }
}
