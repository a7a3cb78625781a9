use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest series an admin can create in one request
pub const MAX_OCCURRENCES: u32 = 52;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl Frequency {
    fn step(&self) -> Duration {
        match self {
            Frequency::Daily => Duration::days(1),
            Frequency::Weekly => Duration::weeks(1),
        }
    }
}

/// Repeat rule for a slot series; `count` includes the first occurrence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub count: u32,
}

/// One concrete time window produced from a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotWindow {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Expands a start/end template into the windows of a (possibly recurring) series.
pub fn expand(
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    recurrence: Option<Recurrence>,
) -> Result<Vec<SlotWindow>, ScheduleError> {
    if end_time <= start_time {
        return Err(ScheduleError::EmptyWindow);
    }

    let (step, count) = match recurrence {
        None => (Duration::zero(), 1),
        Some(rule) => {
            if rule.count == 0 || rule.count > MAX_OCCURRENCES {
                return Err(ScheduleError::InvalidCount(rule.count));
            }
            (rule.frequency.step(), rule.count)
        }
    };

    (0..count)
        .map(|i| {
            let offset = step * i as i32;
            match (
                start_time.checked_add_signed(offset),
                end_time.checked_add_signed(offset),
            ) {
                (Some(start_time), Some(end_time)) => Ok(SlotWindow { start_time, end_time }),
                _ => Err(ScheduleError::OutOfRange),
            }
        })
        .collect()
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ScheduleError {
    #[error("Slot must end after it starts")]
    EmptyWindow,

    #[error("Repeat count must be between 1 and {max}, got {0}", max = MAX_OCCURRENCES)]
    InvalidCount(u32),

    #[error("Series runs past the latest representable date")]
    OutOfRange,
}
