use std::fmt;

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::BookingError;
use crate::models::pricing::{PartyComposition, PriceBreakdown, RoomPreference};

pub const MIN_PARTY_SIZE: u32 = 1;
pub const MAX_PARTY_SIZE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
    Refunded,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Forward-only lifecycle. Administrative rollback is not modelled.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Cancelled, BookingStatus::Refunded)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Cash,
    /// Wallets and other methods settled through the gateway.
    Wallet,
}

impl PaymentMethod {
    pub fn requires_gateway(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }
}

/// Contact details captured at booking time.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Validate)]
pub struct CustomerInfo {
    #[validate(length(min = 1, message = "contact person is required"))]
    pub contact_person: String,
    #[validate(length(min = 5, message = "a contact phone number is required"))]
    pub phone: String,
    #[validate(email(message = "a valid contact email is required"))]
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Tour,
    Destination,
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectKind::Tour => f.write_str("tour"),
            SubjectKind::Destination => f.write_str("destination"),
        }
    }
}

/// Who asked for a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Traveler(String),
    Operator(String),
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Traveler(id) => write!(f, "traveler:{}", id),
            Actor::Operator(id) => write!(f, "operator:{}", id),
            Actor::System => f.write_str("system"),
        }
    }
}

/// Payment columns of a booking, as recorded from a gateway outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFields {
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: String,
}

/// Everything needed to write a new booking. The store assigns identity,
/// reference, timestamps and the derived total.
#[derive(Debug, Clone)]
pub struct BookingDraft {
    pub user_id: String,
    pub tour_id: Option<String>,
    pub destination_id: Option<String>,
    pub subject_title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub party: PartyComposition,
    pub room_preference: RoomPreference,
    pub base_price: Decimal,
    pub taxes: Decimal,
    pub discounts: Decimal,
    pub price_breakdown: Option<PriceBreakdown>,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub payment: PaymentFields,
    pub customer_info: CustomerInfo,
    pub booking_reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub booking_reference: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tour_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_id: Option<String>,
    pub subject_title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub number_of_people: u32,
    pub party: PartyComposition,
    pub room_preference: RoomPreference,
    pub base_price: Decimal,
    #[serde(default)]
    pub taxes: Decimal,
    #[serde(default)]
    pub discounts: Decimal,
    pub total_price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_breakdown: Option<PriceBreakdown>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    pub customer_info: CustomerInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(default)]
    pub refund_amount: Decimal,
    // Epoch millis so the store can sort on them.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

pub fn compute_total_price(
    base_price: Decimal,
    number_of_people: u32,
    taxes: Decimal,
    discounts: Decimal,
) -> Decimal {
    base_price * Decimal::from(number_of_people) + taxes - discounts
}

impl Booking {
    /// Materialises a draft into a record ready for its first write.
    pub fn from_draft(
        draft: BookingDraft,
        booking_reference: String,
        now: DateTime<Utc>,
    ) -> Result<Self, BookingError> {
        let number_of_people = draft.party.total();
        let mut booking = Booking {
            id: ObjectId::new(),
            booking_reference,
            user_id: draft.user_id,
            tour_id: draft.tour_id,
            destination_id: draft.destination_id,
            subject_title: draft.subject_title,
            start_date: draft.start_date,
            end_date: draft.end_date,
            number_of_people,
            party: draft.party,
            room_preference: draft.room_preference,
            base_price: draft.base_price,
            taxes: draft.taxes,
            discounts: draft.discounts,
            total_price: Decimal::ZERO,
            price_breakdown: draft.price_breakdown,
            amount: draft.payment.amount,
            currency: draft.payment.currency,
            status: draft.status,
            payment_status: draft.payment.payment_status,
            payment_method: draft.payment_method,
            payment_reference: draft.payment.payment_reference,
            customer_info: draft.customer_info,
            cancellation_reason: None,
            refund_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        booking.recompute_total();
        booking.check_invariants()?;
        Ok(booking)
    }

    pub fn recompute_total(&mut self) {
        self.total_price = compute_total_price(
            self.base_price,
            self.number_of_people,
            self.taxes,
            self.discounts,
        );
    }

    pub fn subject_id(&self) -> Option<&str> {
        self.tour_id
            .as_deref()
            .or(self.destination_id.as_deref())
    }

    /// Checks every rule a record must satisfy before it is committed.
    pub fn check_invariants(&self) -> Result<(), BookingError> {
        match (&self.tour_id, &self.destination_id) {
            (Some(_), None) | (None, Some(_)) => {}
            (Some(_), Some(_)) => {
                return Err(BookingError::Validation(
                    "a booking must reference exactly one of tour or destination, not both"
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(BookingError::Validation(
                    "a booking must reference a tour or a destination".to_string(),
                ))
            }
        }

        if self.end_date <= self.start_date {
            return Err(BookingError::Validation(
                "end date must be after start date".to_string(),
            ));
        }

        if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&self.number_of_people) {
            return Err(BookingError::Validation(format!(
                "number of people must be between {} and {}",
                MIN_PARTY_SIZE, MAX_PARTY_SIZE
            )));
        }

        if self.party.total() != self.number_of_people {
            return Err(BookingError::Validation(
                "party composition does not match number of people".to_string(),
            ));
        }

        if self.base_price.is_sign_negative()
            || self.taxes.is_sign_negative()
            || self.discounts.is_sign_negative()
        {
            return Err(BookingError::Validation(
                "prices, taxes and discounts cannot be negative".to_string(),
            ));
        }

        let expected = compute_total_price(
            self.base_price,
            self.number_of_people,
            self.taxes,
            self.discounts,
        );
        if self.total_price != expected {
            return Err(BookingError::Validation(format!(
                "total price {} does not match its inputs (expected {})",
                self.total_price, expected
            )));
        }

        if self.booking_reference.trim().is_empty() {
            return Err(BookingError::Validation(
                "booking reference is required".to_string(),
            ));
        }

        if self.payment_status == PaymentStatus::Paid
            && self
                .payment_reference
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
        {
            return Err(BookingError::Validation(
                "a paid booking requires the gateway payment reference".to_string(),
            ));
        }

        if self.status == BookingStatus::Refunded
            && (self.refund_amount.is_sign_negative() || self.refund_amount > self.total_price)
        {
            return Err(BookingError::Validation(
                "refund amount must be between 0 and the total price".to_string(),
            ));
        }

        self.customer_info
            .validate()
            .map_err(|e| BookingError::Validation(format!("invalid customer info: {}", e)))?;

        Ok(())
    }
}
