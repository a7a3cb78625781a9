pub mod activity;
pub mod content;
pub mod customer;
pub mod feedback;
pub mod inquiry;
pub mod ledger;
pub mod newsletter;
pub mod notifier;
pub mod promo;
pub mod repository;
pub mod slot;

pub use ledger::{
    AdoptionReceipt, LedgerError, LedgerResult, NewAdoption, NotAppliedReason, Redemption,
    Reservation, ReservationLedger, ReserveSlot,
};
pub use notifier::Notifier;
pub use repository::{StoreError, StoreResult};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
