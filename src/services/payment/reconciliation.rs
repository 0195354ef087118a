use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::BookingError;
use crate::models::bookings::{PaymentFields, PaymentStatus};
use crate::services::pricing_service::round_money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

/// What the client reports after talking to the gateway itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PaymentConfirmation {
    pub outcome: PaymentOutcome,
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: Decimal,
    pub currency: String,
}

impl PaymentConfirmation {
    pub fn succeeded(&self) -> bool {
        self.outcome == PaymentOutcome::Succeeded
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

/// Maps a gateway outcome onto a booking's payment fields. The recorded
/// amount is always the authorised one; it is compared with, never replaced
/// by, the booking total.
pub fn payment_fields(
    confirmation: &PaymentConfirmation,
    total_price: Decimal,
) -> Result<PaymentFields, BookingError> {
    let currency = confirmation.currency.trim().to_lowercase();

    if !confirmation.succeeded() {
        return Ok(PaymentFields {
            payment_status: PaymentStatus::Failed,
            payment_reference: confirmation.reference().map(str::to_string),
            amount: None,
            currency,
        });
    }

    let reference = confirmation.reference().ok_or_else(|| {
        BookingError::Validation(
            "a successful payment must carry the gateway reference".to_string(),
        )
    })?;

    if round_money(confirmation.amount) != round_money(total_price) {
        return Err(BookingError::PaymentReconciliation {
            payment_reference: reference.to_string(),
            reason: format!(
                "authorized amount {} does not match booking total {}",
                confirmation.amount, total_price
            ),
        });
    }

    Ok(PaymentFields {
        payment_status: PaymentStatus::Paid,
        payment_reference: Some(reference.to_string()),
        amount: Some(confirmation.amount),
        currency,
    })
}

/// A charge went through but the booking could not be written. Anything the
/// caller might retry is turned into the do-not-retry error.
pub fn captured_but_not_recorded(payment_reference: &str, err: BookingError) -> BookingError {
    match err {
        BookingError::PaymentReconciliation { .. } => err,
        other => {
            log::error!(
                "Payment {} captured but booking was not recorded: {}",
                payment_reference,
                other
            );
            BookingError::PaymentReconciliation {
                payment_reference: payment_reference.to_string(),
                reason: other.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confirmation(outcome: PaymentOutcome, amount: Decimal) -> PaymentConfirmation {
        PaymentConfirmation {
            outcome,
            reference: Some("pi_3Nx".to_string()),
            amount,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_successful_payment_is_paid() {
        let fields = payment_fields(
            &confirmation(PaymentOutcome::Succeeded, Decimal::new(4095, 1)),
            Decimal::new(40950, 2),
        )
        .unwrap();

        assert_eq!(fields.payment_status, PaymentStatus::Paid);
        assert_eq!(fields.payment_reference.as_deref(), Some("pi_3Nx"));
        assert_eq!(fields.amount, Some(Decimal::new(4095, 1)));
        assert_eq!(fields.currency, "usd");
    }

    #[test]
    fn test_success_without_reference_is_rejected() {
        let mut c = confirmation(PaymentOutcome::Succeeded, Decimal::from(100));
        c.reference = Some("  ".to_string());
        assert!(matches!(
            payment_fields(&c, Decimal::from(100)),
            Err(BookingError::Validation(_))
        ));
    }

    #[test]
    fn test_amount_mismatch_needs_support() {
        let result = payment_fields(
            &confirmation(PaymentOutcome::Succeeded, Decimal::from(100)),
            Decimal::from(120),
        );
        assert!(matches!(
            result,
            Err(BookingError::PaymentReconciliation { ref payment_reference, .. })
                if payment_reference == "pi_3Nx"
        ));
    }

    #[test]
    fn test_failed_payment() {
        let fields = payment_fields(
            &confirmation(PaymentOutcome::Failed, Decimal::from(100)),
            Decimal::from(120),
        )
        .unwrap();
        assert_eq!(fields.payment_status, PaymentStatus::Failed);
        assert_eq!(fields.amount, None);
    }

    #[test]
    fn test_wraps_persistence_failures() {
        let err = captured_but_not_recorded("pi_1", BookingError::Database("down".into()));
        assert!(matches!(
            err,
            BookingError::PaymentReconciliation { ref payment_reference, .. } if payment_reference == "pi_1"
        ));
    }
}
