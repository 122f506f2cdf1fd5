//! Plan prices using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Currency used when the backend omits one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// A price with its ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code, uppercase.
    pub currency: String,
}

impl Price {
    /// Create a new price. The currency code is uppercased.
    #[must_use]
    pub fn new(amount: Decimal, currency: &str) -> Self {
        let currency = currency.trim();
        let currency = if currency.is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            currency.to_ascii_uppercase()
        };
        Self { amount, currency }
    }

    /// Whether the plan costs nothing.
    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", self.amount.round_dp(2), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimals() {
        let price = Price::new(Decimal::new(999, 2), "usd");
        assert_eq!(price.to_string(), "9.99 USD");

        let price = Price::new(Decimal::new(15, 0), "PEN");
        assert_eq!(price.to_string(), "15.00 PEN");
    }

    #[test]
    fn test_blank_currency_defaults() {
        let price = Price::new(Decimal::ONE, "  ");
        assert_eq!(price.currency, DEFAULT_CURRENCY);
    }

    #[test]
    fn test_is_free() {
        assert!(Price::new(Decimal::ZERO, "USD").is_free());
        assert!(!Price::new(Decimal::ONE, "USD").is_free());
    }
}
