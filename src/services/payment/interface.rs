use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment gateway is not configured")]
    NotConfigured,
    #[error("invalid payment request: {0}")]
    InvalidRequest(String),
    #[error("gateway request failed: {0}")]
    Upstream(String),
}

/// Amount the server wants authorised, in major currency units.
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub amount: Decimal,
    pub currency: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntentHandle {
    pub payment_intent_id: String,
    pub client_secret: Option<String>,
    pub amount: Decimal,
    pub currency: String,
}

/// The external gateway as seen from the server: it only prepares a charge
/// the client then authorises directly.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_intent(&self, request: IntentRequest)
        -> Result<PaymentIntentHandle, GatewayError>;
}

/// Stand-in used when no gateway credentials are configured.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn create_intent(
        &self,
        _request: IntentRequest,
    ) -> Result<PaymentIntentHandle, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}
