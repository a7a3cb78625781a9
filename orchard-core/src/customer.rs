use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Adoption progress, advanced by payment confirmation and the mocked automation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Interested,
    Paid,
    EmailSent,
    Subscribed,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Interested => "interested",
            CustomerStatus::Paid => "paid",
            CustomerStatus::EmailSent => "email_sent",
            CustomerStatus::Subscribed => "subscribed",
        }
    }

    /// Anything past `interested` counts as a paying customer.
    pub fn has_paid(&self) -> bool {
        !matches!(self, CustomerStatus::Interested)
    }
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interested" => Ok(CustomerStatus::Interested),
            "paid" => Ok(CustomerStatus::Paid),
            "email_sent" => Ok(CustomerStatus::EmailSent),
            "subscribed" => Ok(CustomerStatus::Subscribed),
            other => Err(CoreError::ValidationError(format!("unknown customer status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewsletterStage {
    None,
    Welcome,
    Monthly,
}

impl NewsletterStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            NewsletterStage::None => "none",
            NewsletterStage::Welcome => "welcome",
            NewsletterStage::Monthly => "monthly",
        }
    }
}

impl fmt::Display for NewsletterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NewsletterStage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(NewsletterStage::None),
            "welcome" => Ok(NewsletterStage::Welcome),
            "monthly" => Ok(NewsletterStage::Monthly),
            other => Err(CoreError::ValidationError(format!("unknown newsletter stage '{}'", other))),
        }
    }
}

/// A tree adopter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub country: String,
    pub tree_type: String,
    pub years: i32,
    pub promo_code: Option<String>,
    pub is_gift: bool,
    pub amount_cents: i64,
    pub status: CustomerStatus,
    pub newsletter_stage: NewsletterStage,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub country: String,
    pub tree_type: String,
    pub years: i32,
    pub promo_code: Option<String>,
    pub is_gift: bool,
    pub amount_cents: i64,
}

/// Dashboard counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerStats {
    pub total_customers: i64,
    pub paid_customers: i64,
    pub newsletter_subscribers: i64,
}

impl CustomerStats {
    pub fn from_customers(customers: &[Customer]) -> Self {
        Self {
            total_customers: customers.len() as i64,
            paid_customers: customers.iter().filter(|c| c.status.has_paid()).count() as i64,
            newsletter_subscribers: customers
                .iter()
                .filter(|c| c.newsletter_stage != NewsletterStage::None)
                .count() as i64,
        }
    }
}
