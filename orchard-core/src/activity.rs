use chrono::{DateTime, Utc};
use orchard_shared::ActivityEvent;
use serde::{Deserialize, Serialize};

/// One line of the append-only activity log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub action: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub customer_id: Option<i64>,
    pub action: String,
    pub message: String,
}

impl From<&ActivityEvent> for NewActivity {
    fn from(event: &ActivityEvent) -> Self {
        Self {
            customer_id: event.customer_id(),
            action: event.action().to_string(),
            message: event.message(),
        }
    }
}
