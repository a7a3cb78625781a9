use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mocked newsletter dispatch, recorded for the back office
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Newsletter {
    pub id: i64,
    pub subject: String,
    pub body: String,
    pub recipients: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNewsletter {
    pub subject: String,
    pub body: String,
    pub recipients: i64,
}
