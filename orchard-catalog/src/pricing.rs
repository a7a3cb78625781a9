use serde::{Deserialize, Serialize};
use orchard_shared::format_cents;

/// Pricing configuration for tree adoptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Price of one adoption year, in euro cents
    pub adoption_price_cents: i64,

    /// Longest adoption term that can be bought in one go
    pub max_years: i32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            adoption_price_cents: 5000,
            max_years: 5,
        }
    }
}

/// Computes adoption prices and applies percentage discounts
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Base price for adopting a tree for `years` years
    pub fn adoption_price(&self, years: i32) -> Result<i64, PricingError> {
        if years < 1 || years > self.config.max_years {
            return Err(PricingError::InvalidTerm {
                years,
                max: self.config.max_years,
            });
        }
        Ok(self.config.adoption_price_cents * years as i64)
    }

    pub fn display(&self, cents: i64) -> String {
        format_cents(cents)
    }
}

/// `base × (100 − percent) / 100`, rounded half-up to the nearest cent.
pub fn apply_discount(base_cents: i64, discount_percent: i32) -> Result<i64, PricingError> {
    validate_percent(discount_percent)?;
    if base_cents < 0 {
        return Err(PricingError::NegativePrice(base_cents));
    }
    let kept = (100 - discount_percent) as i64;
    Ok((base_cents * kept + 50) / 100)
}

pub fn validate_percent(discount_percent: i32) -> Result<(), PricingError> {
    if !(0..=100).contains(&discount_percent) {
        return Err(PricingError::InvalidPercent(discount_percent));
    }
    Ok(())
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PricingError {
    #[error("Discount must be between 0 and 100 percent, got {0}")]
    InvalidPercent(i32),

    #[error("Price cannot be negative: {0}")]
    NegativePrice(i64),

    #[error("Adoption term must be between 1 and {max} years, got {years}")]
    InvalidTerm {
        years: i32,
        max: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_discount() {
        assert_eq!(apply_discount(6000, 10).unwrap(), 5400);
        assert_eq!(apply_discount(12000, 100).unwrap(), 0);
        assert_eq!(apply_discount(12000, 0).unwrap(), 12000);
        // 33% off €0.99 = 66.33 cents, rounds to 66
        assert_eq!(apply_discount(99, 33).unwrap(), 66);
        // 50% off €0.25 = 12.5 cents, rounds half-up
        assert_eq!(apply_discount(25, 50).unwrap(), 13);
    }

    #[test]
    fn test_invalid_discount() {
        assert_eq!(apply_discount(1000, 101), Err(PricingError::InvalidPercent(101)));
        assert_eq!(apply_discount(1000, -5), Err(PricingError::InvalidPercent(-5)));
        assert_eq!(apply_discount(-1, 10), Err(PricingError::NegativePrice(-1)));
    }

    #[test]
    fn test_adoption_price() {
        let engine = PricingEngine::new(PricingConfig::default());

        assert_eq!(engine.adoption_price(1).unwrap(), 5000);
        assert_eq!(engine.adoption_price(3).unwrap(), 15000);
        assert!(engine.adoption_price(0).is_err());
        assert!(engine.adoption_price(6).is_err());
        assert_eq!(engine.display(15000), "€150.00");
    }
}
