//! Mocked follow-up after a payment: a confirmation email and, for adoptions,
//! the newsletter signup. Runs detached from the request; failures are logged.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use orchard_core::customer::{Customer, CustomerStatus, NewsletterStage};
use orchard_core::repository::CustomerRepository;
use orchard_core::slot::Booking;
use orchard_core::Notifier;
use orchard_shared::{ActivityEvent, Masked};

use crate::state::AppState;

#[derive(Clone)]
pub struct FollowUp {
    customers: Arc<dyn CustomerRepository>,
    notifier: Arc<dyn Notifier>,
    email_delay: Duration,
    newsletter_delay: Duration,
    newsletter_enabled: bool,
}

impl FollowUp {
    pub fn from_state(state: &AppState) -> Self {
        Self {
            customers: state.customers.clone(),
            notifier: state.notifier.clone(),
            email_delay: Duration::from_millis(state.config.automation.email_delay_ms),
            newsletter_delay: Duration::from_millis(state.config.automation.newsletter_delay_ms),
            newsletter_enabled: state.config.features.newsletter_enabled,
        }
    }

    pub fn after_adoption_payment(self, customer: Customer) -> JoinHandle<()> {
        tokio::spawn(async move { self.run_adoption(customer).await })
    }

    pub fn after_visit_payment(self, booking: Booking) -> JoinHandle<()> {
        tokio::spawn(async move {
            sleep(self.email_delay).await;
            self.notifier
                .notify(ActivityEvent::EmailSent {
                    customer_id: None,
                    email: Masked(booking.customer_email.clone()),
                    kind: "Visit confirmation".to_string(),
                })
                .await;
        })
    }

    async fn run_adoption(&self, customer: Customer) {
        sleep(self.email_delay).await;
        if !self
            .advance(&customer, CustomerStatus::Paid, CustomerStatus::EmailSent, None)
            .await
        {
            return;
        }
        self.notifier
            .notify(ActivityEvent::EmailSent {
                customer_id: Some(customer.id),
                email: Masked(customer.email.clone()),
                kind: "Confirmation".to_string(),
            })
            .await;

        if !self.newsletter_enabled {
            return;
        }

        sleep(self.newsletter_delay).await;
        if !self
            .advance(
                &customer,
                CustomerStatus::EmailSent,
                CustomerStatus::Subscribed,
                Some(NewsletterStage::Welcome),
            )
            .await
        {
            return;
        }
        self.notifier
            .notify(ActivityEvent::NewsletterSubscribed {
                customer_id: customer.id,
                name: customer.name.clone(),
            })
            .await;
        info!(customer_id = customer.id, "Post-payment automation finished");
    }

    async fn advance(
        &self,
        customer: &Customer,
        from: CustomerStatus,
        to: CustomerStatus,
        stage: Option<NewsletterStage>,
    ) -> bool {
        match self.customers.transition_customer(customer.id, from, to, stage).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                warn!(customer_id = customer.id, "Customer is no longer {}, skipping {}", from, to);
                false
            }
            Err(e) => {
                error!(customer_id = customer.id, "Automation step {} -> {} failed: {}", from, to, e);
                false
            }
        }
    }
}
