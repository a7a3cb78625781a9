pub mod app_config;
pub mod customer_repo;
pub mod database;
pub mod feedback_repo;
pub mod ledger_repo;
pub mod memory;
pub mod notifier;
pub mod promo_repo;
pub mod redis_repo;
pub mod slot_repo;

pub use app_config::Config;
pub use database::{DbClient, PgStore};
pub use memory::MemoryStore;
pub use notifier::ActivityNotifier;
pub use redis_repo::RateLimiter;
