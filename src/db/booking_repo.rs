use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, to_document, Document},
    options::IndexOptions,
    Client, Collection, IndexModel,
};

use crate::errors::{duplicate_key_message, BookingError};
use crate::models::bookings::{Booking, BookingStatus};
use crate::services::booking_store::BookingPersistence;

pub const BOOKINGS_COLLECTION: &str = "Bookings";

const REFERENCE_INDEX: &str = "booking_reference_unique";
const PAYMENT_INDEX: &str = "payment_reference_unique";

pub struct MongoBookingStore {
    collection: Collection<Document>,
}

impl MongoBookingStore {
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            collection: client.database(database).collection(BOOKINGS_COLLECTION),
        }
    }

    /// The unique indexes are what reject concurrent duplicates; they have to
    /// exist before the first insert.
    pub async fn ensure_indexes(&self) -> Result<(), BookingError> {
        let reference_index = IndexModel::builder()
            .keys(doc! { "booking_reference": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name(REFERENCE_INDEX.to_string())
                    .build(),
            )
            .build();
        // Unpaid bookings have no payment_reference field at all.
        let payment_index = IndexModel::builder()
            .keys(doc! { "payment_reference": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "payment_reference": { "$type": "string" } })
                    .name(PAYMENT_INDEX.to_string())
                    .build(),
            )
            .build();
        let owner_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1, "_id": -1 })
            .build();

        self.collection
            .create_indexes(vec![reference_index, payment_index, owner_index])
            .await?;
        Ok(())
    }
}

/// Money is stored as decimal strings so it round-trips exactly.
fn to_stored(booking: &Booking) -> Result<Document, BookingError> {
    let mut document = to_document(booking)?;

    document.insert("base_price", booking.base_price.to_string());
    document.insert("taxes", booking.taxes.to_string());
    document.insert("discounts", booking.discounts.to_string());
    document.insert("total_price", booking.total_price.to_string());
    document.insert("refund_amount", booking.refund_amount.to_string());
    if let Some(amount) = booking.amount {
        document.insert("amount", amount.to_string());
    }

    if let Some(breakdown) = &booking.price_breakdown {
        let mut stored = to_document(breakdown)?;
        for (key, value) in [
            ("unit_price", breakdown.unit_price),
            ("adults_cost", breakdown.adults_cost),
            ("child_price", breakdown.child_price),
            ("children_cost", breakdown.children_cost),
            ("infant_price", breakdown.infant_price),
            ("infants_cost", breakdown.infants_cost),
            ("room_surcharge", breakdown.room_surcharge),
            ("tax_rate", breakdown.tax_rate),
        ] {
            stored.insert(key, value.to_string());
        }
        document.insert("price_breakdown", stored);
    }

    Ok(document)
}

fn from_stored(document: Document) -> Result<Booking, BookingError> {
    Ok(from_document(document)?)
}

fn write_error(err: mongodb::error::Error, booking: &Booking) -> BookingError {
    match duplicate_key_message(&err) {
        Some(message) if message.contains(PAYMENT_INDEX) => {
            let reference = booking.payment_reference.clone().unwrap_or_default();
            log::warn!("Payment {} is already recorded", reference);
            BookingError::DuplicatePayment(reference)
        }
        Some(_) => {
            log::warn!(
                "Booking reference {} already exists",
                booking.booking_reference
            );
            BookingError::ReferenceCollision(booking.booking_reference.clone())
        }
        None => err.into(),
    }
}

#[async_trait]
impl BookingPersistence for MongoBookingStore {
    async fn insert(&self, booking: &Booking) -> Result<(), BookingError> {
        let document = to_stored(booking)?;
        self.collection
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(|err| write_error(err, booking))
    }

    async fn find_by_id(&self, id: &ObjectId) -> Result<Option<Booking>, BookingError> {
        self.collection
            .find_one(doc! { "_id": *id })
            .await?
            .map(from_stored)
            .transpose()
    }

    async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Booking>, BookingError> {
        self.collection
            .find_one(doc! { "payment_reference": payment_reference })
            .await?
            .map(from_stored)
            .transpose()
    }

    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<Booking>, BookingError> {
        let cursor = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?;
        let documents = cursor.try_collect::<Vec<Document>>().await?;
        documents.into_iter().map(from_stored).collect()
    }

    async fn replace_if_status(
        &self,
        booking: &Booking,
        expected_status: BookingStatus,
    ) -> Result<bool, BookingError> {
        let filter = doc! {
            "_id": booking.id,
            "status": expected_status.as_str(),
            "booking_reference": &booking.booking_reference,
        };
        let result = self
            .collection
            .replace_one(filter, to_stored(booking)?)
            .await
            .map_err(|err| write_error(err, booking))?;
        Ok(result.matched_count == 1)
    }

    async fn has_completed_booking(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<bool, BookingError> {
        let filter = doc! {
            "user_id": user_id,
            "status": BookingStatus::Completed.as_str(),
            "$or": [
                { "tour_id": subject_id },
                { "destination_id": subject_id },
            ],
        };
        let count = self.collection.count_documents(filter).await?;
        Ok(count > 0)
    }
}
