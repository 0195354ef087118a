use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use mongodb::error::{ErrorKind, WriteError, WriteFailure};
use serde::Serialize;

use crate::models::bookings::BookingStatus;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("no tour or destination found for {0}")]
    SubjectNotFound(String),

    #[error("a booking must reference either a tour or a destination, not both")]
    AmbiguousSubject,

    #[error("booking reference {0} is already taken")]
    ReferenceCollision(String),

    #[error("could not assign a unique booking reference after {attempts} attempts")]
    BookingCreationFailed { attempts: u32 },

    #[error("payment {payment_reference} was captured but the booking was not recorded: {reason}")]
    PaymentReconciliation {
        payment_reference: String,
        reason: String,
    },

    #[error("payment {0} is already recorded against a booking")]
    DuplicatePayment(String),

    #[error("{0}")]
    NotCancellable(String),

    #[error("cannot move a booking from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("booking not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("database error: {0}")]
    Database(String),

    #[error("payment gateway error: {0}")]
    Gateway(String),
}

impl BookingError {
    /// Stable identifier clients can switch on.
    pub fn kind(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "validation_error",
            BookingError::SubjectNotFound(_) => "subject_not_found",
            BookingError::AmbiguousSubject => "ambiguous_subject",
            BookingError::ReferenceCollision(_) => "reference_collision",
            BookingError::BookingCreationFailed { .. } => "booking_creation_failed",
            BookingError::PaymentReconciliation { .. } => "payment_reconciliation_error",
            BookingError::DuplicatePayment(_) => "duplicate_payment",
            BookingError::NotCancellable(_) => "not_cancellable",
            BookingError::InvalidTransition { .. } => "invalid_transition",
            BookingError::NotFound => "not_found",
            BookingError::Forbidden => "forbidden",
            BookingError::Database(_) | BookingError::Gateway(_) => "internal_error",
        }
    }

    /// Malformed input the caller has to correct. Ambiguous subjects count.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BookingError::Validation(_) | BookingError::AmbiguousSubject
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::ReferenceCollision(_))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    support_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_reference: Option<String>,
}

impl ResponseError for BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) | BookingError::AmbiguousSubject => {
                StatusCode::BAD_REQUEST
            }
            BookingError::SubjectNotFound(_) | BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::NotCancellable(_)
            | BookingError::InvalidTransition { .. }
            | BookingError::DuplicatePayment(_) => StatusCode::CONFLICT,
            BookingError::PaymentReconciliation { .. } => StatusCode::BAD_GATEWAY,
            BookingError::ReferenceCollision(_)
            | BookingError::BookingCreationFailed { .. }
            | BookingError::Database(_)
            | BookingError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            BookingError::PaymentReconciliation {
                payment_reference, ..
            } => ErrorBody {
                error: self.kind(),
                message: "Your payment was captured but the booking could not be recorded. \
                          Do not retry the payment; contact support with the payment reference."
                    .to_string(),
                support_required: Some(true),
                payment_reference: Some(payment_reference.clone()),
            },
            BookingError::ReferenceCollision(_)
            | BookingError::BookingCreationFailed { .. }
            | BookingError::Database(_)
            | BookingError::Gateway(_) => {
                log::error!("Booking request failed: {}", self);
                ErrorBody {
                    error: self.kind(),
                    message: "Something went wrong while processing the booking".to_string(),
                    support_required: None,
                    payment_reference: None,
                }
            }
            _ => ErrorBody {
                error: self.kind(),
                message: self.to_string(),
                support_required: None,
                payment_reference: None,
            },
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<mongodb::error::Error> for BookingError {
    fn from(err: mongodb::error::Error) -> Self {
        BookingError::Database(err.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for BookingError {
    fn from(err: mongodb::bson::ser::Error) -> Self {
        BookingError::Database(err.to_string())
    }
}

impl From<mongodb::bson::de::Error> for BookingError {
    fn from(err: mongodb::bson::de::Error) -> Self {
        BookingError::Database(err.to_string())
    }
}

/// Server message of a duplicate-key write error. It names the violated index.
pub fn duplicate_key_message(err: &mongodb::error::Error) -> Option<&str> {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(WriteError {
            code: DUPLICATE_KEY_CODE,
            message,
            ..
        })) => Some(message.as_str()),
        _ => None,
    }
}
