use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use orchard_catalog::SlotInventory;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A bookable time window for a farm activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: i64,
    pub activity: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
    pub booked: i32,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn inventory(&self) -> SlotInventory {
        SlotInventory::new(self.capacity, self.booked)
    }

    pub fn remaining(&self) -> i32 {
        self.inventory().remaining()
    }

    /// Slots stop taking reservations once they have started.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.start_time > now
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSlot {
    pub activity: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub capacity: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Paid,
    Confirmed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Paid => "paid",
            BookingStatus::Confirmed => "confirmed",
        }
    }

    /// pending → paid → confirmed, nothing else
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Paid) | (BookingStatus::Paid, BookingStatus::Confirmed)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "paid" => Ok(BookingStatus::Paid),
            "confirmed" => Ok(BookingStatus::Confirmed),
            other => Err(CoreError::ValidationError(format!("unknown booking status '{}'", other))),
        }
    }
}

/// A customer's claim on some of a slot's capacity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: i64,
    pub slot_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub quantity: i32,
    pub status: BookingStatus,
    pub payment_token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub slot_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub quantity: i32,
    pub payment_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_booking_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Paid));
        assert!(BookingStatus::Paid.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Paid.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Paid.can_transition_to(BookingStatus::Paid));
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [BookingStatus::Pending, BookingStatus::Paid, BookingStatus::Confirmed] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("cancelled".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_slot_open_only_before_start() {
        let now = Utc::now();
        let slot = Slot {
            id: 1,
            activity: "safari".to_string(),
            start_time: now + Duration::hours(2),
            end_time: now + Duration::hours(4),
            capacity: 10,
            booked: 3,
            created_at: now,
        };
        assert!(slot.is_open_at(now));
        assert!(!slot.is_open_at(now + Duration::hours(2)));
        assert_eq!(slot.remaining(), 7);

        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["startTime"], serde_json::to_value(slot.start_time).unwrap());
        assert_eq!(json["booked"], 3);
    }
}
