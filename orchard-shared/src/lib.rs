pub mod models;
pub mod pii;

pub use models::events::{ActivityEvent, WebhookChannel};
pub use models::money::format_cents;
pub use pii::Masked;
