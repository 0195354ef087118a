use std::collections::HashMap;

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::errors::BookingError;
use crate::middleware::{auth::AuthMiddleware, auth_context::AuthenticatedUser};
use crate::services::booking_service::{BookingService, QuoteRequest, QuoteResponse};
use crate::services::payment::interface::{IntentRequest, PaymentGateway, PaymentIntentHandle};

#[derive(Serialize)]
pub struct PaymentIntentResponse {
    pub payment_intent: PaymentIntentHandle,
    pub pricing: QuoteResponse,
}

pub fn config(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(
        web::scope("/payments")
            .wrap(AuthMiddleware::new(jwt_secret))
            .route("/intent", web::post().to(create_payment_intent)),
    );
}

/*
    POST /api/payments/intent
    The amount is always the server quote; clients only pick the subject and party.
*/
pub async fn create_payment_intent(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    gateway: web::Data<dyn PaymentGateway>,
    input: web::Json<QuoteRequest>,
) -> Result<HttpResponse, BookingError> {
    let pricing = service.quote(&input).await?;

    let metadata = HashMap::from([
        ("user_id".to_string(), user.user_id.clone()),
        ("subject_kind".to_string(), pricing.subject.kind.to_string()),
        ("subject_id".to_string(), pricing.subject.id.clone()),
        ("travelers".to_string(), input.party.total().to_string()),
    ]);

    let payment_intent = gateway
        .create_intent(IntentRequest {
            amount: pricing.quote.total,
            currency: pricing.currency.clone(),
            metadata,
        })
        .await
        .map_err(|e| BookingError::Gateway(e.to_string()))?;

    Ok(HttpResponse::Ok().json(PaymentIntentResponse {
        payment_intent,
        pricing,
    }))
}
