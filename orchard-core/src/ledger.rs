use std::sync::Arc;

use chrono::Utc;
use orchard_catalog::apply_discount;
use orchard_shared::{ActivityEvent, Masked};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::customer::{Customer, NewCustomer};
use crate::notifier::Notifier;
use crate::promo::{normalize_code, PromoCode};
use crate::repository::{LedgerStore, LedgerTransaction, StoreError};
use crate::slot::{Booking, NewBooking};

/// How many suffixes a gift code tries before giving up.
pub const GIFT_CODE_ATTEMPTS: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Every suffix tried was taken. The adoption itself is already stored.
    #[error("No free gift code for customer {customer_id} after {attempts} attempts")]
    GiftCodeUnavailable { customer_id: i64, attempts: u32 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq)]
pub struct ReserveSlot {
    pub slot_id: i64,
    pub quantity: i32,
    pub customer_name: String,
    pub customer_email: String,
}

/// Outcome of a reservation attempt. Only `Reserved` wrote anything.
#[derive(Debug, Clone, PartialEq)]
pub enum Reservation {
    Reserved(Booking),
    CapacityExceeded { requested: i32, remaining: i32 },
    SlotNotFound,
    SlotClosed,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotAppliedReason {
    UnknownCode,
    AlreadyUsed,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Redemption {
    Applied {
        code: String,
        discount_percent: i32,
        base_price_cents: i64,
        final_price_cents: i64,
        /// The code was one-time and is now used.
        consumed: bool,
    },
    NotApplied {
        reason: NotAppliedReason,
        price_cents: i64,
    },
}

impl Redemption {
    pub fn final_price_cents(&self) -> i64 {
        match self {
            Redemption::Applied { final_price_cents, .. } => *final_price_cents,
            Redemption::NotApplied { price_cents, .. } => *price_cents,
        }
    }

    pub fn applied_code(&self) -> Option<&str> {
        match self {
            Redemption::Applied { code, .. } => Some(code.as_str()),
            Redemption::NotApplied { .. } => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Redemption::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAdoption {
    pub name: String,
    pub email: String,
    pub country: String,
    pub tree_type: String,
    pub years: i32,
    pub promo_code: Option<String>,
    pub is_gift: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdoptionReceipt {
    pub customer: Customer,
    pub redemption: Option<Redemption>,
    pub gift_code: Option<PromoCode>,
}

/// The only writer of `Slot.booked` and `PromoCode.used`.
///
/// Each operation runs in one store transaction and locks the slot or code row
/// before reading it, so concurrent callers on the same key are serialized.
pub struct ReservationLedger {
    store: Arc<dyn LedgerStore>,
    notifier: Arc<dyn Notifier>,
}

impl ReservationLedger {
    pub fn new(store: Arc<dyn LedgerStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    pub async fn reserve_slot(&self, request: ReserveSlot) -> LedgerResult<Reservation> {
        if request.quantity < 1 {
            return Err(LedgerError::InvalidQuantity(request.quantity));
        }
        require("customerName", &request.customer_name)?;
        require("customerEmail", &request.customer_email)?;

        let mut tx = self.store.begin().await?;

        let slot = match tx.lock_slot(request.slot_id).await? {
            Some(slot) => slot,
            None => return Ok(Reservation::SlotNotFound),
        };
        if !slot.is_open_at(Utc::now()) {
            return Ok(Reservation::SlotClosed);
        }

        let after = match slot.inventory().reserve(request.quantity) {
            Ok(after) => after,
            Err(shortfall) => {
                debug!(
                    slot_id = slot.id,
                    requested = shortfall.requested,
                    remaining = shortfall.remaining,
                    "Reservation does not fit"
                );
                return Ok(Reservation::CapacityExceeded {
                    requested: shortfall.requested,
                    remaining: shortfall.remaining,
                });
            }
        };

        tx.add_booked(slot.id, request.quantity).await?;
        let booking = tx
            .insert_booking(&NewBooking {
                slot_id: slot.id,
                customer_name: request.customer_name.trim().to_string(),
                customer_email: request.customer_email.trim().to_string(),
                quantity: request.quantity,
                payment_token: Uuid::new_v4().to_string(),
            })
            .await?;
        tx.commit().await?;

        info!(
            slot_id = slot.id,
            booking_id = booking.id,
            booked = after.booked,
            capacity = after.capacity,
            "Slot reserved"
        );

        self.notifier
            .notify(ActivityEvent::VisitBooked {
                booking_id: booking.id,
                slot_id: slot.id,
                quantity: booking.quantity,
                customer_name: booking.customer_name.clone(),
            })
            .await;

        Ok(Reservation::Reserved(booking))
    }

    pub async fn redeem_promo_code(&self, code: &str, base_price_cents: i64) -> LedgerResult<Redemption> {
        check_redemption_input(code, base_price_cents)?;

        let mut tx = self.store.begin().await?;
        let redemption = redeem_within(tx.as_mut(), code, base_price_cents).await?;
        if !redemption.is_applied() {
            return Ok(redemption);
        }
        tx.commit().await?;

        self.notify_redeemed(&redemption, None).await;
        Ok(redemption)
    }

    /// Applies the optional code and creates the customer in one transaction,
    /// then issues a gift code when the adoption is a gift.
    pub async fn sign_up_adoption(
        &self,
        adoption: NewAdoption,
        base_price_cents: i64,
    ) -> LedgerResult<AdoptionReceipt> {
        require("name", &adoption.name)?;
        require("email", &adoption.email)?;
        require("treeType", &adoption.tree_type)?;
        if adoption.years < 1 {
            return Err(LedgerError::InvalidInput(format!(
                "years must be at least 1, got {}",
                adoption.years
            )));
        }
        if base_price_cents <= 0 {
            return Err(LedgerError::InvalidInput(format!(
                "base price must be positive, got {}",
                base_price_cents
            )));
        }

        let code = adoption
            .promo_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty());

        let mut tx = self.store.begin().await?;

        let redemption = match code {
            Some(code) => Some(redeem_within(tx.as_mut(), code, base_price_cents).await?),
            None => None,
        };
        let amount_cents = redemption
            .as_ref()
            .map(Redemption::final_price_cents)
            .unwrap_or(base_price_cents);

        let customer = tx
            .insert_customer(&NewCustomer {
                name: adoption.name.trim().to_string(),
                email: adoption.email.trim().to_string(),
                country: adoption.country.trim().to_string(),
                tree_type: adoption.tree_type.trim().to_string(),
                years: adoption.years,
                promo_code: redemption
                    .as_ref()
                    .and_then(Redemption::applied_code)
                    .map(str::to_string),
                is_gift: adoption.is_gift,
                amount_cents,
            })
            .await?;
        tx.commit().await?;

        self.notifier
            .notify(ActivityEvent::AdoptionStarted {
                customer_id: customer.id,
                name: customer.name.clone(),
                email: Masked(customer.email.clone()),
                tree_type: customer.tree_type.clone(),
            })
            .await;
        if let Some(redemption) = &redemption {
            self.notify_redeemed(redemption, Some(customer.id)).await;
        }

        let gift_code = if customer.is_gift {
            Some(self.generate_gift_code(customer.id).await?)
        } else {
            None
        };

        Ok(AdoptionReceipt {
            customer,
            redemption,
            gift_code,
        })
    }

    /// Issues `GIFT-{customer_id}-{nnn}`, a one-time 100% code.
    ///
    /// `nnn` starts from the millisecond clock and advances on collision; the
    /// store's unique key decides whether a code is new.
    pub async fn generate_gift_code(&self, customer_id: i64) -> LedgerResult<PromoCode> {
        let seed = Utc::now().timestamp_millis().rem_euclid(900) as u32;

        for attempt in 0..GIFT_CODE_ATTEMPTS {
            let gift = PromoCode::gift(customer_id, (seed + attempt) % 900 + 100);
            if self.store.insert_promo_code(&gift).await? {
                info!(customer_id, code = %gift.code, "Gift code issued");
                self.notifier
                    .notify(ActivityEvent::GiftCodeIssued {
                        customer_id,
                        code: gift.code.clone(),
                    })
                    .await;
                return Ok(gift);
            }
            debug!(customer_id, code = %gift.code, "Gift code collision, retrying");
        }

        warn!(customer_id, "Could not find a free gift code");
        Err(LedgerError::GiftCodeUnavailable {
            customer_id,
            attempts: GIFT_CODE_ATTEMPTS,
        })
    }

    async fn notify_redeemed(&self, redemption: &Redemption, customer_id: Option<i64>) {
        if let Redemption::Applied { code, discount_percent, .. } = redemption {
            self.notifier
                .notify(ActivityEvent::PromoRedeemed {
                    code: code.clone(),
                    discount_percent: *discount_percent,
                    customer_id,
                })
                .await;
        }
    }
}

fn require(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} is required", field)));
    }
    Ok(())
}

fn check_redemption_input(code: &str, base_price_cents: i64) -> LedgerResult<()> {
    require("code", code)?;
    if base_price_cents <= 0 {
        return Err(LedgerError::InvalidInput(format!(
            "base price must be positive, got {}",
            base_price_cents
        )));
    }
    Ok(())
}

/// Looks up and, when it applies, consumes `code` inside an open transaction.
async fn redeem_within(
    tx: &mut dyn LedgerTransaction,
    code: &str,
    base_price_cents: i64,
) -> LedgerResult<Redemption> {
    let code = normalize_code(code);

    let promo = match tx.lock_promo(&code).await? {
        Some(promo) => promo,
        None => {
            return Ok(Redemption::NotApplied {
                reason: NotAppliedReason::UnknownCode,
                price_cents: base_price_cents,
            })
        }
    };
    if !promo.is_redeemable() {
        return Ok(Redemption::NotApplied {
            reason: NotAppliedReason::AlreadyUsed,
            price_cents: base_price_cents,
        });
    }

    let final_price_cents = apply_discount(base_price_cents, promo.discount_percent)
        .map_err(|e| LedgerError::InvalidInput(e.to_string()))?;
    if promo.one_time {
        tx.mark_promo_used(&promo.code).await?;
    }

    Ok(Redemption::Applied {
        code: promo.code,
        discount_percent: promo.discount_percent,
        base_price_cents,
        final_price_cents,
        consumed: promo.one_time,
    })
}
