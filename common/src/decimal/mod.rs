//! Decimal type utilities for precise financial calculations

use rust_decimal::{Decimal, RoundingStrategy};
pub use rust_decimal_macros::dec;

/// Unit price of the traded asset in fiat
pub type Price = Decimal;

/// Crypto quantity
pub type Quantity = Decimal;

/// Fiat amount (typically Price * Quantity)
pub type Amount = Decimal;

/// Precision helpers for common operations
pub mod precision {
    use super::*;

    /// Price precision as stored (2 decimal places)
    pub const PRICE_PRECISION: u32 = 2;

    /// Crypto quantity precision as stored (8 decimal places)
    pub const QUANTITY_PRECISION: u32 = 8;

    /// Fiat amount precision (kopecks)
    pub const AMOUNT_PRECISION: u32 = 2;

    /// Round price to standard precision
    pub fn round_price(price: Price) -> Price {
        price.round_dp_with_strategy(PRICE_PRECISION, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Round quantity to standard precision
    pub fn round_quantity(qty: Quantity) -> Quantity {
        qty.round_dp_with_strategy(QUANTITY_PRECISION, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Round a fiat amount to kopecks
    pub fn round_amount(amount: Amount) -> Amount {
        amount.round_dp_with_strategy(AMOUNT_PRECISION, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::precision::*;
    use super::*;

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(round_price(dec!(2.345)), dec!(2.35));
        assert_eq!(round_amount(dec!(0.125)), dec!(0.13));
        assert_eq!(round_quantity(dec!(1.000000005)), dec!(1.00000001));
    }
}
