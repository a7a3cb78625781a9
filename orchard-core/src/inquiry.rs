use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    Pending,
    Accepted,
    Declined,
}

impl InquiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InquiryStatus::Pending => "pending",
            InquiryStatus::Accepted => "accepted",
            InquiryStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for InquiryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InquiryStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InquiryStatus::Pending),
            "accepted" => Ok(InquiryStatus::Accepted),
            "declined" => Ok(InquiryStatus::Declined),
            other => Err(CoreError::ValidationError(format!("unknown inquiry status '{}'", other))),
        }
    }
}

/// A request for a visit at a time no slot covers. Holds no capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Inquiry {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub activity: String,
    pub proposed_date: String,
    pub message: String,
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInquiry {
    pub name: String,
    pub email: String,
    pub activity: String,
    pub proposed_date: String,
    pub message: String,
}

impl NewInquiry {
    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("activity", &self.activity),
            ("proposedDate", &self.proposed_date),
        ] {
            if value.trim().is_empty() {
                return Err(CoreError::ValidationError(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}
