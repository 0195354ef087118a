use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;

use crate::errors::BookingError;
use crate::models::bookings::{Actor, Booking, BookingDraft, BookingStatus};
use crate::services::reference_service::ReferenceGenerator;

const MAX_UPDATE_ATTEMPTS: u32 = 3;

/// Raw persistence for booking records. Implementations must enforce
/// `booking_reference` uniqueness themselves and report a clash as
/// `BookingError::ReferenceCollision`. A gateway `payment_reference` may be
/// held by one booking only; a second holder is `DuplicatePayment`.
#[async_trait]
pub trait BookingPersistence: Send + Sync {
    async fn insert(&self, booking: &Booking) -> Result<(), BookingError>;

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Booking>, BookingError>;

    async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Booking>, BookingError>;

    /// Most recent first, ties broken by insertion order.
    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<Booking>, BookingError>;

    /// Compare-and-set write: succeeds only while the stored record still has
    /// `expected_status` and the same reference. Returns whether it matched.
    async fn replace_if_status(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
    ) -> Result<bool, BookingError>;

    async fn has_completed_booking(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<bool, BookingError>;
}

/// Booking records with their invariants enforced on every write.
#[derive(Clone)]
pub struct BookingStore {
    persistence: Arc<dyn BookingPersistence>,
    references: Arc<dyn ReferenceGenerator>,
}

impl BookingStore {
    pub fn new(
        persistence: Arc<dyn BookingPersistence>,
        references: Arc<dyn ReferenceGenerator>,
    ) -> Self {
        Self {
            persistence,
            references,
        }
    }

    /// Validates and writes a new booking, assigning its reference when the
    /// draft carries none. A clash surfaces as `ReferenceCollision`.
    pub async fn create(
        &self,
        draft: BookingDraft,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let reference = match &draft.booking_reference {
            Some(reference) => reference.clone(),
            None => self.references.generate(now),
        };
        let booking = Booking::from_draft(draft, reference, now)?;

        self.persistence.insert(&booking).await?;
        log::info!(
            "Stored booking {} ({}) for user {}",
            booking.booking_reference,
            booking.id,
            booking.user_id
        );
        Ok(booking)
    }

    pub async fn find(&self, id: &ObjectId) -> Result<Option<Booking>, BookingError> {
        self.persistence.find_by_id(id).await
    }

    pub async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Booking>, BookingError> {
        self.persistence
            .find_by_payment_reference(payment_reference)
            .await
    }

    pub async fn find_owned_by(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        self.persistence.find_owned_by(user_id).await
    }

    pub async fn has_completed_booking(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<bool, BookingError> {
        self.persistence
            .has_completed_booking(user_id, subject_id)
            .await
    }

    /// Moves a booking along its lifecycle. Re-applying `cancelled` to a
    /// cancelled booking is a no-op. A booking only completes once its
    /// service date has passed.
    pub async fn transition_status(
        &self,
        id: &ObjectId,
        next: BookingStatus,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Booking, BookingError> {
        let booking = self
            .update_with(id, now, |booking| {
                if booking.status == next && next == BookingStatus::Cancelled {
                    return Ok(false);
                }
                if !booking.status.can_transition_to(next)
                    || (next == BookingStatus::Completed && now < booking.start_date)
                {
                    return Err(BookingError::InvalidTransition {
                        from: booking.status,
                        to: next,
                    });
                }
                booking.status = next;
                Ok(true)
            })
            .await?;

        log::info!(
            "Booking {} is now {} (by {})",
            booking.booking_reference,
            booking.status,
            actor
        );
        Ok(booking)
    }

    /// Loads a booking, lets `apply` mutate it and commits the result if
    /// `apply` reports a change. Lost races are retried against fresh state.
    pub async fn update_with<F>(
        &self,
        id: &ObjectId,
        now: DateTime<Utc>,
        mut apply: F,
    ) -> Result<Booking, BookingError>
    where
        F: FnMut(&mut Booking) -> Result<bool, BookingError> + Send,
    {
        for _ in 0..MAX_UPDATE_ATTEMPTS {
            let current = self
                .persistence
                .find_by_id(id)
                .await?
                .ok_or(BookingError::NotFound)?;

            let mut updated = current.clone();
            if !apply(&mut updated)? {
                return Ok(current);
            }

            if updated.booking_reference != current.booking_reference {
                return Err(BookingError::Validation(
                    "booking reference cannot be changed".to_string(),
                ));
            }
            updated.recompute_total();
            updated.updated_at = now;
            updated.check_invariants()?;

            if self
                .persistence
                .replace_if_status(&updated, current.status)
                .await?
            {
                return Ok(updated);
            }
            log::warn!(
                "Booking {} changed while updating, retrying",
                current.booking_reference
            );
        }

        Err(BookingError::Database(format!(
            "booking {} kept changing during update",
            id
        )))
    }
}
