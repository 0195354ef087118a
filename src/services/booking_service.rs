use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::errors::BookingError;
use crate::models::bookings::{
    Actor, Booking, BookingDraft, BookingStatus, CustomerInfo, PaymentFields, PaymentMethod,
    PaymentStatus, SubjectKind, MAX_PARTY_SIZE, MIN_PARTY_SIZE,
};
use crate::models::catalog::CatalogItem;
use crate::models::pricing::{PartyComposition, PriceQuote, RoomPreference};
use crate::services::booking_store::BookingStore;
use crate::services::catalog_service::CatalogLookup;
use crate::services::notification_service::{dispatch, NotificationKind, Notifier};
use crate::services::payment::reconciliation::{
    captured_but_not_recorded, payment_fields, PaymentConfirmation,
};
use crate::services::pricing_service::{PricingConfig, PricingService};
use crate::services::refund_service::{days_until, RefundPolicy};

pub const DEFAULT_REFERENCE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateBookingRequest {
    #[serde(default)]
    pub tour_id: Option<String>,
    #[serde(default)]
    pub destination_id: Option<String>,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub party: PartyComposition,
    #[serde(default)]
    pub room_preference: RoomPreference,
    pub customer_info: CustomerInfo,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment: Option<PaymentConfirmation>,
    /// Client-side estimate. Logged when it disagrees, never used.
    #[serde(default)]
    pub quoted_total: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuoteRequest {
    #[serde(default)]
    pub tour_id: Option<String>,
    #[serde(default)]
    pub destination_id: Option<String>,
    #[serde(flatten)]
    pub party: PartyComposition,
    #[serde(default)]
    pub room_preference: RoomPreference,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteResponse {
    pub subject: CatalogItem,
    pub currency: String,
    #[serde(flatten)]
    pub quote: PriceQuote,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReconcilePaymentRequest {
    pub payment_method: PaymentMethod,
    pub payment: PaymentConfirmation,
}

pub struct BookingService {
    store: BookingStore,
    catalog: Arc<dyn CatalogLookup>,
    notifier: Arc<dyn Notifier>,
    pricing: PricingConfig,
    refunds: RefundPolicy,
    currency: String,
    max_reference_attempts: u32,
}

impl BookingService {
    pub fn new(
        store: BookingStore,
        catalog: Arc<dyn CatalogLookup>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingConfig,
        refunds: RefundPolicy,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            store,
            catalog,
            notifier,
            pricing,
            refunds,
            currency: currency.into().to_lowercase(),
            max_reference_attempts: DEFAULT_REFERENCE_ATTEMPTS,
        }
    }

    pub fn with_max_reference_attempts(mut self, attempts: u32) -> Self {
        self.max_reference_attempts = attempts.max(1);
        self
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Exactly one of tour or destination, and it has to exist.
    pub async fn resolve_subject(
        &self,
        tour_id: Option<&str>,
        destination_id: Option<&str>,
    ) -> Result<CatalogItem, BookingError> {
        let (kind, id) = match (non_blank(tour_id), non_blank(destination_id)) {
            (Some(_), Some(_)) => return Err(BookingError::AmbiguousSubject),
            (None, None) => {
                return Err(BookingError::Validation(
                    "a tour or a destination is required".to_string(),
                ))
            }
            (Some(id), None) => (SubjectKind::Tour, id),
            (None, Some(id)) => (SubjectKind::Destination, id),
        };

        self.catalog
            .get_by_id(kind, id)
            .await?
            .ok_or_else(|| BookingError::SubjectNotFound(format!("{} {}", kind, id)))
    }

    pub async fn quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, BookingError> {
        validate_party(&request.party)?;
        let subject = self
            .resolve_subject(request.tour_id.as_deref(), request.destination_id.as_deref())
            .await?;
        let quote = PricingService::quote(
            &self.pricing,
            subject.unit_price,
            &request.party,
            request.room_preference,
        )?;

        Ok(QuoteResponse {
            subject,
            currency: self.currency.clone(),
            quote,
        })
    }

    /// Prices and records a booking. Card bookings must carry a successful
    /// gateway authorisation; a failure after that point is reported as a
    /// reconciliation error so the client does not charge again.
    pub async fn create_booking(
        &self,
        user_id: &str,
        request: CreateBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        validate_party(&request.party)?;
        let start_date = parse_instant(&request.start_date, "start date")?;
        let requested_end = request
            .end_date
            .as_deref()
            .map(|end| parse_instant(end, "end date"))
            .transpose()?;
        request
            .customer_info
            .validate()
            .map_err(|e| BookingError::Validation(format!("invalid customer info: {}", e)))?;

        let confirmation = match (request.payment_method.requires_gateway(), &request.payment) {
            (true, Some(c)) if c.succeeded() && c.reference().is_some() => Some(c.clone()),
            (true, _) => {
                return Err(BookingError::Validation(
                    "card payments require a successful gateway authorization".to_string(),
                ))
            }
            (false, Some(_)) => {
                return Err(BookingError::Validation(
                    "cash bookings do not take a gateway payment".to_string(),
                ))
            }
            (false, None) => None,
        };

        let subject = self
            .resolve_subject(request.tour_id.as_deref(), request.destination_id.as_deref())
            .await?;

        // A resubmitted charge gets the booking it already paid for.
        let payment_reference = confirmation.as_ref().and_then(|c| c.reference());
        if let Some(reference) = payment_reference {
            let existing = self
                .store
                .find_by_payment_reference(reference)
                .await
                .map_err(|err| captured_but_not_recorded(reference, err))?;
            if let Some(existing) = existing {
                return replayed_payment(user_id, &subject, reference, existing);
            }
        }

        let end_date = match requested_end {
            Some(end) => end,
            None => start_date + Duration::days(effective_duration(subject.duration_days)),
        };
        if end_date <= start_date {
            return Err(BookingError::Validation(
                "end date must be after start date".to_string(),
            ));
        }

        let quote = PricingService::quote(
            &self.pricing,
            subject.unit_price,
            &request.party,
            request.room_preference,
        )?;
        if let Some(estimate) = request.quoted_total {
            if !PricingService::matches_estimate(&quote, estimate) {
                log::warn!(
                    "Client estimate {} differs from server total {} for user {}",
                    estimate,
                    quote.total,
                    user_id
                );
            }
        }

        let payment = match &confirmation {
            Some(c) => payment_fields(c, quote.total)?,
            None => PaymentFields {
                payment_status: PaymentStatus::Pending,
                payment_reference: None,
                amount: None,
                currency: self.currency.clone(),
            },
        };
        // A captured charge skips straight past pending.
        let status = if payment.payment_status == PaymentStatus::Paid {
            BookingStatus::Confirmed
        } else {
            BookingStatus::Pending
        };

        let (tour_id, destination_id) = match subject.kind {
            SubjectKind::Tour => (Some(subject.id.clone()), None),
            SubjectKind::Destination => (None, Some(subject.id.clone())),
        };

        let draft = BookingDraft {
            user_id: user_id.to_string(),
            tour_id,
            destination_id,
            subject_title: subject.title.clone(),
            start_date,
            end_date,
            party: request.party,
            room_preference: request.room_preference,
            base_price: subject.unit_price,
            taxes: quote.taxes_and_fees(),
            discounts: quote.party_discount(&request.party),
            price_breakdown: Some(quote.breakdown.clone()),
            status,
            payment_method: request.payment_method,
            payment,
            customer_info: request.customer_info,
            booking_reference: None,
        };

        let booking = match (self.persist(draft, now).await, payment_reference) {
            (Ok(booking), _) => booking,
            // Lost a race with a concurrent submission of the same charge.
            (Err(BookingError::DuplicatePayment(_)), Some(reference)) => {
                return match self.store.find_by_payment_reference(reference).await {
                    Ok(Some(existing)) => replayed_payment(user_id, &subject, reference, existing),
                    Ok(None) => Err(captured_but_not_recorded(
                        reference,
                        BookingError::DuplicatePayment(reference.to_string()),
                    )),
                    Err(err) => Err(captured_but_not_recorded(reference, err)),
                };
            }
            (Err(err), Some(reference)) => return Err(captured_but_not_recorded(reference, err)),
            (Err(err), None) => return Err(err),
        };

        self.notify(&booking, NotificationKind::BookingConfirmation);
        Ok(booking)
    }

    /// Retries reference collisions up to the configured bound.
    async fn persist(&self, draft: BookingDraft, now: DateTime<Utc>) -> Result<Booking, BookingError> {
        for attempt in 1..=self.max_reference_attempts {
            match self.store.create(draft.clone(), now).await {
                Ok(booking) => return Ok(booking),
                Err(err) if err.is_retryable() => {
                    log::warn!(
                        "Reference collision on attempt {}/{}: {}",
                        attempt,
                        self.max_reference_attempts,
                        err
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Err(BookingError::BookingCreationFailed {
            attempts: self.max_reference_attempts,
        })
    }

    pub async fn list_own_bookings(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        self.store.find_owned_by(user_id).await
    }

    /// Other users' bookings look missing rather than forbidden.
    pub async fn get_own_booking(
        &self,
        user_id: &str,
        id: &ObjectId,
    ) -> Result<Booking, BookingError> {
        match self.store.find(id).await? {
            Some(booking) if booking.user_id == user_id => Ok(booking),
            _ => Err(BookingError::NotFound),
        }
    }

    /// Cancels a confirmed booking with more than the cutoff of lead time
    /// left and records the refund it earns. Cancelling twice is a no-op.
    pub async fn cancel_booking(
        &self,
        actor: &Actor,
        id: &ObjectId,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        if let Actor::Traveler(user_id) = actor {
            self.get_own_booking(user_id, id).await?;
        }

        let refunds = &self.refunds;
        let mut cancelled_now = false;
        let booking = self
            .store
            .update_with(id, now, |booking| {
                if matches!(
                    booking.status,
                    BookingStatus::Cancelled | BookingStatus::Refunded
                ) {
                    return Ok(false);
                }
                if booking.status != BookingStatus::Confirmed {
                    return Err(BookingError::NotCancellable(format!(
                        "only confirmed bookings can be cancelled (booking is {})",
                        booking.status
                    )));
                }

                let lead_days = days_until(booking.start_date, now);
                if !refunds.allows_cancellation(lead_days) {
                    return Err(BookingError::NotCancellable(format!(
                        "bookings can only be cancelled more than {} day(s) before the start date",
                        refunds.cancellation_cutoff_days
                    )));
                }

                booking.status = BookingStatus::Cancelled;
                booking.refund_amount =
                    refunds.refund_amount(booking.status, booking.total_price, lead_days);
                booking.cancellation_reason = reason.clone();
                cancelled_now = true;
                Ok(true)
            })
            .await?;

        if cancelled_now {
            log::info!(
                "Booking {} cancelled by {}, refund {}",
                booking.booking_reference,
                actor,
                booking.refund_amount
            );
            self.notify(&booking, NotificationKind::BookingCancellation);
        }
        Ok(booking)
    }

    /// Records a gateway outcome against a booking that was created unpaid.
    pub async fn reconcile_payment(
        &self,
        user_id: &str,
        id: &ObjectId,
        request: ReconcilePaymentRequest,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        self.get_own_booking(user_id, id).await?;
        if !request.payment_method.requires_gateway() {
            return Err(BookingError::Validation(
                "only gateway payments can be reconciled".to_string(),
            ));
        }

        let confirmation = &request.payment;
        let result = self
            .store
            .update_with(id, now, |booking| {
                if booking.payment_status == PaymentStatus::Paid
                    && booking.payment_reference.as_deref() == confirmation.reference()
                {
                    return Ok(false);
                }
                let refusal = if booking.payment_status == PaymentStatus::Paid {
                    Some("booking is already paid".to_string())
                } else if booking.status != BookingStatus::Pending {
                    Some(format!(
                        "only pending bookings accept a payment (booking is {})",
                        booking.status
                    ))
                } else {
                    None
                };
                if let Some(reason) = refusal {
                    // A captured charge the booking cannot take still needs support.
                    return Err(match (confirmation.succeeded(), confirmation.reference()) {
                        (true, Some(reference)) => BookingError::PaymentReconciliation {
                            payment_reference: reference.to_string(),
                            reason,
                        },
                        _ => BookingError::Validation(reason),
                    });
                }

                let fields = payment_fields(confirmation, booking.total_price)?;
                booking.payment_status = fields.payment_status;
                booking.payment_reference = fields.payment_reference;
                booking.amount = fields.amount;
                booking.currency = fields.currency;
                if booking.payment_status == PaymentStatus::Paid {
                    booking.payment_method = request.payment_method;
                    booking.status = BookingStatus::Confirmed;
                }
                Ok(true)
            })
            .await;

        match (result, confirmation.succeeded(), confirmation.reference()) {
            (Ok(booking), _, _) => Ok(booking),
            (Err(err), true, Some(reference)) if !err.is_validation() => {
                Err(captured_but_not_recorded(reference, err))
            }
            (Err(err), _, _) => Err(err),
        }
    }

    /// Operator-driven status change. Cancellation and refunds go through
    /// their dedicated paths so the refund bookkeeping stays consistent.
    pub async fn transition_status(
        &self,
        id: &ObjectId,
        next: BookingStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        match next {
            BookingStatus::Cancelled => self.cancel_booking(actor, id, None, now).await,
            BookingStatus::Refunded => self.issue_refund(id, actor, now).await,
            _ => self.store.transition_status(id, next, actor, now).await,
        }
    }

    /// Marks a cancelled booking as refunded, keeping the amount computed at
    /// cancellation.
    pub async fn issue_refund(
        &self,
        id: &ObjectId,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .store
            .update_with(id, now, |booking| {
                if booking.status == BookingStatus::Refunded {
                    return Ok(false);
                }
                if !booking.status.can_transition_to(BookingStatus::Refunded) {
                    return Err(BookingError::InvalidTransition {
                        from: booking.status,
                        to: BookingStatus::Refunded,
                    });
                }

                booking.status = BookingStatus::Refunded;
                if booking.payment_status == PaymentStatus::Paid
                    && booking.refund_amount > Decimal::ZERO
                {
                    booking.payment_status = if booking.refund_amount >= booking.total_price {
                        PaymentStatus::Refunded
                    } else {
                        PaymentStatus::Partial
                    };
                }
                Ok(true)
            })
            .await?;

        log::info!(
            "Booking {} refunded {} by {}",
            booking.booking_reference,
            booking.refund_amount,
            actor
        );
        Ok(booking)
    }

    pub async fn has_completed_booking(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<bool, BookingError> {
        self.store.has_completed_booking(user_id, subject_id).await
    }

    fn notify(&self, booking: &Booking, kind: NotificationKind) {
        let data = json!({
            "booking_reference": booking.booking_reference,
            "subject_title": booking.subject_title,
            "start_date": booking.start_date.to_rfc3339(),
            "total_price": booking.total_price,
            "refund_amount": booking.refund_amount,
            "currency": booking.currency,
        });
        dispatch(
            self.notifier.clone(),
            booking.customer_info.email.clone(),
            kind,
            data,
        );
    }
}

/// Same traveler and subject means the client is retrying; anything else
/// is a charge this service cannot attach to the request.
fn replayed_payment(
    user_id: &str,
    subject: &CatalogItem,
    reference: &str,
    existing: Booking,
) -> Result<Booking, BookingError> {
    if existing.user_id == user_id && existing.subject_id() == Some(subject.id.as_str()) {
        log::info!(
            "Payment {} already recorded as booking {}",
            reference,
            existing.booking_reference
        );
        return Ok(existing);
    }
    Err(captured_but_not_recorded(
        reference,
        BookingError::DuplicatePayment(reference.to_string()),
    ))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn validate_party(party: &PartyComposition) -> Result<(), BookingError> {
    if party.adults == 0 {
        return Err(BookingError::Validation(
            "at least one adult is required".to_string(),
        ));
    }
    let total = party
        .checked_total()
        .ok_or_else(|| BookingError::Validation("party size is out of range".to_string()))?;
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&total) {
        return Err(BookingError::Validation(format!(
            "number of people must be between {} and {}",
            MIN_PARTY_SIZE, MAX_PARTY_SIZE
        )));
    }
    Ok(())
}

/// Subject durations that are missing or not positive count as one day.
fn effective_duration(duration_days: Option<i64>) -> i64 {
    duration_days.filter(|d| *d > 0).unwrap_or(1)
}

/// Accepts RFC 3339 instants or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_instant(value: &str, field: &str) -> Result<DateTime<Utc>, BookingError> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| BookingError::Validation(format!("{} is not a valid date: {}", field, value)))
}
