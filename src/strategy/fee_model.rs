//! Parabolic taker fee curve for binary markets.
//!
//! `fee = shares * fee_rate * (p * (1 - p))^exponent`
//!
//! Zero at p=0 and p=1, maximal at p=0.50.

use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::config::SelectionConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeModel {
    /// Base fee rate coefficient
    pub fee_rate: Decimal,
    /// Exponent applied to `p * (1 - p)`
    pub exponent: u32,
}

impl FeeModel {
    pub fn new(fee_rate: Decimal, exponent: u32) -> Self {
        Self { fee_rate, exponent }
    }

    pub fn from_config(config: &SelectionConfig) -> Self {
        Self::new(config.fee_rate, config.fee_exponent)
    }

    /// Fee-free model
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO, 1)
    }

    /// Effective fee per share at price `p`
    pub fn rate_at(&self, price: Decimal) -> Decimal {
        let p_factor = price * (Decimal::ONE - price);
        let p_powered = match self.exponent {
            0 => Decimal::ONE,
            1 => p_factor,
            2 => p_factor * p_factor,
            n => p_factor.powd(Decimal::from(n)),
        };
        self.fee_rate * p_powered
    }

    /// Fee in USDC for trading `shares` at price `p`
    pub fn fee(&self, shares: Decimal, price: Decimal) -> Decimal {
        if price <= Decimal::ZERO || price >= Decimal::ONE {
            return Decimal::ZERO;
        }
        shares * self.rate_at(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_peaks_at_midpoint() {
        let model = FeeModel::new(dec!(0.0175), 1);
        // 100 * 0.0175 * 0.25
        assert_eq!(model.fee(dec!(100), dec!(0.5)), dec!(0.4375));
        assert!(model.fee(dec!(100), dec!(0.9)) < model.fee(dec!(100), dec!(0.5)));
    }

    #[test]
    fn test_fee_zero_at_bounds_and_for_zero_model() {
        let model = FeeModel::new(dec!(0.25), 2);
        assert_eq!(model.fee(dec!(100), Decimal::ZERO), Decimal::ZERO);
        assert_eq!(model.fee(dec!(100), Decimal::ONE), Decimal::ZERO);
        assert_eq!(FeeModel::zero().fee(dec!(100), dec!(0.5)), Decimal::ZERO);
    }

    #[test]
    fn test_squared_exponent() {
        let model = FeeModel::new(dec!(0.25), 2);
        // 0.25 * (0.25)^2
        assert_eq!(model.rate_at(dec!(0.5)), dec!(0.015625));
    }
}
