use chrono::{DateTime, Utc};
use orchard_catalog::pricing::validate_percent;
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

pub const GIFT_CODE_PREFIX: &str = "GIFT";

/// A string entitling the holder to a percentage price reduction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromoCode {
    pub code: String,
    pub discount_percent: i32,
    pub one_time: bool,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn new(code: &str, discount_percent: i32, one_time: bool) -> CoreResult<Self> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(CoreError::ValidationError("promo code cannot be empty".to_string()));
        }
        if code.len() > 64 || !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(CoreError::ValidationError(format!("promo code '{}' has invalid characters", code)));
        }
        validate_percent(discount_percent).map_err(|e| CoreError::ValidationError(e.to_string()))?;

        Ok(Self {
            code,
            discount_percent,
            one_time,
            used: false,
            created_at: Utc::now(),
        })
    }

    /// One-time, 100% code handed to the recipient of a gifted adoption.
    pub fn gift(customer_id: i64, suffix: u32) -> Self {
        Self {
            code: format!("{}-{}-{}", GIFT_CODE_PREFIX, customer_id, suffix),
            discount_percent: 100,
            one_time: true,
            used: false,
            created_at: Utc::now(),
        }
    }

    /// One-time codes stop reducing prices once used; repeatable codes never do.
    pub fn is_redeemable(&self) -> bool {
        !(self.one_time && self.used)
    }
}

/// Codes are matched case-insensitively and without surrounding whitespace.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
