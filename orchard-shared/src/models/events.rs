use crate::models::money::format_cents;
use crate::pii::Masked;

/// Outbound integration a given event is forwarded to, if one is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookChannel {
    Adoption,
    Payment,
    Feedback,
}

/// Something worth recording in the activity log.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActivityEvent {
    AdoptionStarted {
        customer_id: i64,
        name: String,
        email: Masked<String>,
        tree_type: String,
    },
    PaymentCompleted {
        customer_id: i64,
        amount_cents: i64,
    },
    EmailSent {
        customer_id: Option<i64>,
        email: Masked<String>,
        kind: String,
    },
    NewsletterSubscribed {
        customer_id: i64,
        name: String,
    },
    FeedbackReceived {
        survey_type: String,
        rating: i32,
        email: Option<Masked<String>>,
    },
    VisitBooked {
        booking_id: i64,
        slot_id: i64,
        quantity: i32,
        customer_name: String,
    },
    VisitPaymentCompleted {
        booking_id: i64,
        slot_id: i64,
    },
    PromoRedeemed {
        code: String,
        discount_percent: i32,
        customer_id: Option<i64>,
    },
    GiftCodeIssued {
        customer_id: i64,
        code: String,
    },
    InquiryReceived {
        inquiry_id: i64,
        activity: String,
        proposed_date: String,
    },
    NewsletterSent {
        newsletter_id: i64,
        subject: String,
        recipients: i64,
    },
}

impl ActivityEvent {
    pub fn action(&self) -> &'static str {
        match self {
            ActivityEvent::AdoptionStarted { .. } => "adoption_started",
            ActivityEvent::PaymentCompleted { .. } => "payment_completed",
            ActivityEvent::EmailSent { .. } => "email_sent",
            ActivityEvent::NewsletterSubscribed { .. } => "newsletter_subscribed",
            ActivityEvent::FeedbackReceived { .. } => "feedback_received",
            ActivityEvent::VisitBooked { .. } => "visit_booked",
            ActivityEvent::VisitPaymentCompleted { .. } => "visit_payment_completed",
            ActivityEvent::PromoRedeemed { .. } => "promo_redeemed",
            ActivityEvent::GiftCodeIssued { .. } => "gift_code_issued",
            ActivityEvent::InquiryReceived { .. } => "inquiry_received",
            ActivityEvent::NewsletterSent { .. } => "newsletter_sent",
        }
    }

    /// Customer the activity row is attached to. Feedback and visits are anonymous.
    pub fn customer_id(&self) -> Option<i64> {
        match self {
            ActivityEvent::AdoptionStarted { customer_id, .. }
            | ActivityEvent::PaymentCompleted { customer_id, .. }
            | ActivityEvent::NewsletterSubscribed { customer_id, .. }
            | ActivityEvent::GiftCodeIssued { customer_id, .. } => Some(*customer_id),
            ActivityEvent::EmailSent { customer_id, .. }
            | ActivityEvent::PromoRedeemed { customer_id, .. } => *customer_id,
            _ => None,
        }
    }

    pub fn channel(&self) -> Option<WebhookChannel> {
        match self {
            ActivityEvent::AdoptionStarted { .. } => Some(WebhookChannel::Adoption),
            ActivityEvent::PaymentCompleted { .. }
            | ActivityEvent::VisitPaymentCompleted { .. } => Some(WebhookChannel::Payment),
            ActivityEvent::FeedbackReceived { .. } => Some(WebhookChannel::Feedback),
            _ => None,
        }
    }

    /// Message stored in the activity log, shown to farm staff in the back-office.
    pub fn message(&self) -> String {
        match self {
            ActivityEvent::AdoptionStarted { name, email, tree_type, .. } => format!(
                "Customer {} ({}) started adoption process for {} tree",
                name,
                email.expose(),
                tree_type
            ),
            ActivityEvent::PaymentCompleted { amount_cents, .. } => {
                format!("Payment of {} received (simulated)", format_cents(*amount_cents))
            }
            ActivityEvent::EmailSent { email, kind, .. } => {
                format!("{} email sent to {} (simulated)", kind, email.expose())
            }
            ActivityEvent::NewsletterSubscribed { name, .. } => {
                format!("{} added to Apple Tree Newsletter - Welcome series", name)
            }
            ActivityEvent::FeedbackReceived { survey_type, rating, email } => {
                let mut message = format!("New {} feedback received (Rating: {}/5)", survey_type, rating);
                if let Some(email) = email {
                    message.push_str(&format!(" from {}", email.expose()));
                }
                message
            }
            ActivityEvent::VisitBooked { booking_id, slot_id, quantity, customer_name } => format!(
                "{} booked {} place(s) on slot #{} (booking #{})",
                customer_name, quantity, slot_id, booking_id
            ),
            ActivityEvent::VisitPaymentCompleted { booking_id, slot_id } => format!(
                "Payment for booking #{} on slot #{} received (simulated)",
                booking_id, slot_id
            ),
            ActivityEvent::PromoRedeemed { code, discount_percent, .. } => {
                format!("Promo code {} redeemed ({}% off)", code, discount_percent)
            }
            ActivityEvent::GiftCodeIssued { code, .. } => {
                format!("Gift code {} issued", code)
            }
            ActivityEvent::InquiryReceived { inquiry_id, activity, proposed_date } => format!(
                "Inquiry #{} for {} on {}",
                inquiry_id, activity, proposed_date
            ),
            ActivityEvent::NewsletterSent { subject, recipients, .. } => format!(
                "Newsletter \"{}\" sent to {} subscriber(s) (simulated)",
                subject, recipients
            ),
        }
    }
}
