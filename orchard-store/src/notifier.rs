use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use orchard_core::activity::NewActivity;
use orchard_core::repository::ActivityRepository;
use orchard_core::Notifier;
use orchard_shared::{ActivityEvent, WebhookChannel};

use crate::app_config::AutomationConfig;

/// Writes every event to the activity log and logs the webhook it would be forwarded to.
pub struct ActivityNotifier {
    activity: Arc<dyn ActivityRepository>,
    automation: AutomationConfig,
}

impl ActivityNotifier {
    pub fn new(activity: Arc<dyn ActivityRepository>, automation: AutomationConfig) -> Self {
        Self { activity, automation }
    }

    fn webhook_for(&self, channel: WebhookChannel) -> Option<&str> {
        let url = match channel {
            WebhookChannel::Adoption => &self.automation.webhook_on_adoption,
            WebhookChannel::Payment => &self.automation.webhook_on_payment,
            WebhookChannel::Feedback => &self.automation.webhook_on_feedback,
        };
        url.as_deref().filter(|url| !url.is_empty())
    }
}

#[async_trait]
impl Notifier for ActivityNotifier {
    async fn notify(&self, event: ActivityEvent) {
        info!(action = event.action(), customer_id = ?event.customer_id(), "{:?}", event);

        if let Err(e) = self.activity.record_activity(&NewActivity::from(&event)).await {
            error!("Failed to record activity {}: {}", event.action(), e);
        }

        if let Some(url) = event.channel().and_then(|channel| self.webhook_for(channel)) {
            info!(action = event.action(), webhook = url, "Would notify webhook");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use orchard_shared::Masked;

    #[tokio::test]
    async fn test_events_land_in_activity_log() {
        let store = MemoryStore::new();
        let notifier = ActivityNotifier::new(
            Arc::new(store.clone()),
            AutomationConfig {
                webhook_on_payment: Some("https://hooks.example.com/payment".to_string()),
                ..AutomationConfig::default()
            },
        );

        notifier
            .notify(ActivityEvent::EmailSent {
                customer_id: Some(3),
                email: Masked::from("ana@example.com"),
                kind: "Confirmation".to_string(),
            })
            .await;
        notifier
            .notify(ActivityEvent::PaymentCompleted { customer_id: 3, amount_cents: 5000 })
            .await;

        let log = store.list_activity(50).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action, "payment_completed");
        assert_eq!(log[0].message, "Payment of €50.00 received (simulated)");
        assert_eq!(log[1].customer_id, Some(3));
        assert_eq!(log[1].message, "Confirmation email sent to ana@example.com (simulated)");
    }

    #[test]
    fn test_blank_webhook_is_ignored() {
        let notifier = ActivityNotifier::new(
            Arc::new(MemoryStore::new()),
            AutomationConfig {
                webhook_on_feedback: Some(String::new()),
                webhook_on_adoption: Some("https://hooks.example.com/adoption".to_string()),
                ..AutomationConfig::default()
            },
        );
        assert_eq!(notifier.webhook_for(WebhookChannel::Feedback), None);
        assert_eq!(
            notifier.webhook_for(WebhookChannel::Adoption),
            Some("https://hooks.example.com/adoption")
        );
    }
}
