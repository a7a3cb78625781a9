use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use orchard_catalog::PricingEngine;
use orchard_core::repository::{
    ActivityRepository, ContentRepository, CustomerRepository, FeedbackRepository, InquiryRepository,
    LedgerStore, NewsletterRepository, PromoRepository, SlotRepository,
};
use orchard_core::{Notifier, ReservationLedger};
use orchard_store::app_config::{Config, StorageBackend};
use orchard_store::{ActivityNotifier, DbClient, MemoryStore, RateLimiter};

#[derive(Clone)]
pub struct AppState {
    pub customers: Arc<dyn CustomerRepository>,
    pub activity: Arc<dyn ActivityRepository>,
    pub slots: Arc<dyn SlotRepository>,
    pub promos: Arc<dyn PromoRepository>,
    pub feedback: Arc<dyn FeedbackRepository>,
    pub content: Arc<dyn ContentRepository>,
    pub inquiries: Arc<dyn InquiryRepository>,
    pub newsletters: Arc<dyn NewsletterRepository>,
    pub ledger: Arc<ReservationLedger>,
    pub notifier: Arc<dyn Notifier>,
    pub pricing: Arc<PricingEngine>,
    pub config: Arc<Config>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Present only for the Postgres backend; used by `/health`.
    pub db: Option<Arc<DbClient>>,
}

impl AppState {
    fn with_store<S>(store: S, config: Config) -> Self
    where
        S: CustomerRepository
            + ActivityRepository
            + SlotRepository
            + PromoRepository
            + FeedbackRepository
            + ContentRepository
            + InquiryRepository
            + NewsletterRepository
            + LedgerStore
            + 'static,
    {
        let store = Arc::new(store);
        let notifier: Arc<dyn Notifier> =
            Arc::new(ActivityNotifier::new(store.clone(), config.automation.clone()));
        let ledger = Arc::new(ReservationLedger::new(store.clone(), notifier.clone()));

        Self {
            customers: store.clone(),
            activity: store.clone(),
            slots: store.clone(),
            promos: store.clone(),
            feedback: store.clone(),
            content: store.clone(),
            inquiries: store.clone(),
            newsletters: store,
            ledger,
            notifier,
            pricing: Arc::new(PricingEngine::new(config.defaults.pricing())),
            config: Arc::new(config),
            rate_limiter: None,
            db: None,
        }
    }

    /// Process-local state; nothing survives a restart.
    pub fn in_memory(config: Config) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }

    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let mut state = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage");
                Self::in_memory(config.clone())
            }
            StorageBackend::Postgres => {
                let db = DbClient::new(&config.storage.database_url, config.storage.max_connections)
                    .await
                    .context("Failed to connect to Postgres")?;
                db.migrate().await.context("Failed to run migrations")?;

                let mut state = Self::with_store(db.store(), config.clone());
                state.db = Some(Arc::new(db));
                state
            }
        };

        if let Some(url) = &config.redis.url {
            let limiter = RateLimiter::new(
                url,
                config.redis.rate_limit_per_window,
                config.redis.rate_limit_window_seconds,
            )
            .context("Invalid Redis URL")?;
            state.rate_limiter = Some(Arc::new(limiter));
        }

        Ok(state)
    }
}
