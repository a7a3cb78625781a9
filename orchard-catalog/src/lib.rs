pub mod pricing;
pub mod inventory;
pub mod schedule;

pub use pricing::{apply_discount, PricingEngine, PricingConfig, PricingError};
pub use inventory::{CapacityShortfall, SlotInventory};
pub use schedule::{expand as expand_schedule, Frequency, Recurrence, ScheduleError, SlotWindow};
