use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::services::payment::interface::{
    GatewayError, IntentRequest, PaymentGateway, PaymentIntentHandle,
};

pub struct StripeProvider {
    pub client: stripe::Client,
}

impl StripeProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: stripe::Client::new(api_key.into()),
        }
    }
}

/// Stripe wants integer minor units.
pub fn to_minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(GatewayError::InvalidRequest(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| GatewayError::InvalidRequest(format!("amount {} is out of range", amount)))
}

#[async_trait]
impl PaymentGateway for StripeProvider {
    async fn create_intent(
        &self,
        request: IntentRequest,
    ) -> Result<PaymentIntentHandle, GatewayError> {
        let amount = to_minor_units(request.amount)?;
        let currency = stripe::Currency::from_str(&request.currency.to_lowercase())
            .map_err(|_| {
                GatewayError::InvalidRequest(format!("unsupported currency {}", request.currency))
            })?;

        let mut create_intent = stripe::CreatePaymentIntent::new(amount, currency);
        // Manual, the client confirms and we record the outcome
        create_intent.capture_method = Some(stripe::PaymentIntentCaptureMethod::Manual);
        create_intent.metadata = Some(request.metadata.clone());

        let intent = stripe::PaymentIntent::create(&self.client, create_intent)
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        log::info!("Created payment intent {} for {}", intent.id, amount);

        Ok(PaymentIntentHandle {
            payment_intent_id: intent.id.to_string(),
            client_secret: intent.client_secret,
            amount: request.amount,
            currency: request.currency.to_lowercase(),
        })
    }
}
