use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use crate::errors::BookingError;
use crate::models::bookings::{Booking, BookingStatus};
use crate::services::booking_store::BookingPersistence;

/// Process-local booking storage with the same guarantees as the MongoDB
/// store. Used for local runs and tests.
#[derive(Default)]
pub struct InMemoryBookingStore {
    // Insertion order doubles as the tie-breaker for equal timestamps.
    bookings: RwLock<Vec<Booking>>,
}

impl InMemoryBookingStore {
    pub async fn len(&self) -> usize {
        self.bookings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.bookings.read().await.is_empty()
    }
}

/// The payment reference `booking` carries, if another booking already holds it.
fn payment_taken(bookings: &[Booking], booking: &Booking) -> Option<String> {
    let reference = booking.payment_reference.as_deref()?;
    bookings
        .iter()
        .any(|b| b.id != booking.id && b.payment_reference.as_deref() == Some(reference))
        .then(|| reference.to_string())
}

#[async_trait]
impl BookingPersistence for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), BookingError> {
        let mut bookings = self.bookings.write().await;
        if bookings
            .iter()
            .any(|b| b.booking_reference == booking.booking_reference)
        {
            return Err(BookingError::ReferenceCollision(
                booking.booking_reference.clone(),
            ));
        }
        if let Some(reference) = payment_taken(&bookings, booking) {
            return Err(BookingError::DuplicatePayment(reference));
        }
        bookings.push(booking.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().find(|b| &b.id == id).cloned())
    }

    async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .iter()
            .find(|b| b.payment_reference.as_deref() == Some(payment_reference))
            .cloned())
    }

    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        let bookings = self.bookings.read().await;
        let mut owned: Vec<Booking> = bookings
            .iter()
            .rev()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn replace_if_status(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
    ) -> Result<bool, BookingError> {
        let mut bookings = self.bookings.write().await;
        if let Some(reference) = payment_taken(&bookings, booking) {
            return Err(BookingError::DuplicatePayment(reference));
        }
        match bookings.iter_mut().find(|b| {
            b.id == booking.id
                && b.status == expected_status
                && b.booking_reference == booking.booking_reference
        }) {
            Some(stored) => {
                *stored = booking.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn has_completed_booking(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<bool, BookingError> {
        let bookings = self.bookings.read().await;
        Ok(bookings.iter().any(|b| {
            b.user_id == user_id
                && b.status == BookingStatus::Completed
                && b.subject_id() == Some(subject_id)
        }))
    }
}
