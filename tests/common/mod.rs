#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use actix_cors::Cors;
use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::{middleware::Logger, test, web, App};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use wayfare_api::errors::BookingError;
use wayfare_api::middleware::auth::generate_token;
use wayfare_api::models::bookings::{Booking, BookingStatus};
use wayfare_api::routes;
use wayfare_api::routes::health::HealthInfo;
use wayfare_api::services::booking_service::BookingService;
use wayfare_api::services::booking_store::{BookingPersistence, BookingStore};
use wayfare_api::services::catalog_service::InMemoryCatalog;
use wayfare_api::services::notification_service::{NotificationError, NotificationKind, Notifier};
use wayfare_api::services::payment::interface::{
    GatewayError, IntentRequest, PaymentGateway, PaymentIntentHandle,
};
use wayfare_api::services::pricing_service::PricingConfig;
use wayfare_api::services::reference_service::{ReferenceGenerator, TimestampReferenceGenerator};
use wayfare_api::services::refund_service::RefundPolicy;
use wayfare_api::db::memory::InMemoryBookingStore;

pub const JWT_SECRET: &str = "test-jwt-secret";

pub const TOUR_ID: &str = "64b000000000000000000001";
pub const DESTINATION_ID: &str = "64b000000000000000000002";
pub const PRICEY_TOUR_ID: &str = "64b000000000000000000003";

pub fn get_test_user_id() -> String {
    "user-traveler-1".to_string()
}

pub fn get_other_user_id() -> String {
    "user-traveler-2".to_string()
}

pub fn user_token(user_id: &str) -> String {
    let token = generate_token(JWT_SECRET, &format!("{}@example.com", user_id), user_id, None)
        .expect("token");
    format!("Bearer {}", token)
}

pub fn admin_token() -> String {
    let token = generate_token(JWT_SECRET, "ops@example.com", "ops-1", Some("admin"))
        .expect("token");
    format!("Bearer {}", token)
}

/// Remembers every notification instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, NotificationKind)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        recipient: &str,
        kind: NotificationKind,
        _data: Value,
    ) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), kind));
        Ok(())
    }
}

pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(
        &self,
        _recipient: &str,
        _kind: NotificationKind,
        _data: Value,
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Api("Status: 503".to_string()))
    }
}

pub struct FakeGateway;

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        request: IntentRequest,
    ) -> Result<PaymentIntentHandle, GatewayError> {
        Ok(PaymentIntentHandle {
            payment_intent_id: "pi_test_123".to_string(),
            client_secret: Some("pi_test_123_secret".to_string()),
            amount: request.amount,
            currency: request.currency,
        })
    }
}

/// Always hands out the same reference, so every insert after the first collides.
pub struct StuckReference;

impl ReferenceGenerator for StuckReference {
    fn generate(&self, _now: chrono::DateTime<chrono::Utc>) -> String {
        "WF-STUCK-000000".to_string()
    }
}

/// Storage that is down for writes.
pub struct UnavailablePersistence;

#[async_trait]
impl BookingPersistence for UnavailablePersistence {
    async fn insert(&self, _booking: &Booking) -> Result<(), BookingError> {
        Err(BookingError::Database("connection reset".to_string()))
    }

    async fn find_by_id(&self, _id: &ObjectId) -> Result<Option<Booking>, BookingError> {
        Ok(None)
    }

    async fn find_by_payment_reference(
        &self,
        _payment_reference: &str,
    ) -> Result<Option<Booking>, BookingError> {
        Ok(None)
    }

    async fn find_owned_by(&self, _user_id: &str) -> Result<Vec<Booking>, BookingError> {
        Ok(Vec::new())
    }

    async fn replace_if_status(
        &self,
        _booking: &Booking,
        _expected_status: BookingStatus,
    ) -> Result<bool, BookingError> {
        Err(BookingError::Database("connection reset".to_string()))
    }

    async fn has_completed_booking(
        &self,
        _user_id: &str,
        _subject_id: &str,
    ) -> Result<bool, BookingError> {
        Ok(false)
    }
}

pub fn test_catalog() -> InMemoryCatalog {
    InMemoryCatalog::default()
        .with_tour(TOUR_ID, "Fjord Kayaking", Decimal::from(100), Some(3))
        .with_destination(DESTINATION_ID, "Lisbon", Decimal::from(80), None)
        .with_tour(PRICEY_TOUR_ID, "Patagonia Trek", Decimal::from(1000), Some(7))
}

pub struct TestApp {
    pub persistence: Arc<InMemoryBookingStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: web::Data<BookingService>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_pricing(PricingConfig::default())
    }

    /// Tax-free pricing keeps totals equal to the catalog price.
    pub fn untaxed() -> Self {
        Self::with_pricing(PricingConfig {
            tax_rate: Decimal::ZERO,
            ..PricingConfig::default()
        })
    }

    pub fn with_pricing(pricing: PricingConfig) -> Self {
        let persistence = Arc::new(InMemoryBookingStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let store = BookingStore::new(persistence.clone(), Arc::new(TimestampReferenceGenerator));
        let service = BookingService::new(
            store,
            Arc::new(test_catalog()),
            notifier.clone(),
            pricing,
            RefundPolicy::default(),
            "usd",
        );

        Self {
            persistence,
            notifier,
            service: web::Data::new(service),
        }
    }

    pub fn with_service(service: BookingService) -> Self {
        Self {
            persistence: Arc::new(InMemoryBookingStore::default()),
            notifier: Arc::new(RecordingNotifier::default()),
            service: web::Data::new(service),
        }
    }

    pub fn create_app(
        &self,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse<impl actix_web::body::MessageBody>,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let gateway: Arc<dyn PaymentGateway> = Arc::new(FakeGateway);

        App::new()
            .app_data(self.service.clone())
            .app_data(web::Data::from(gateway))
            .app_data(web::Data::new(HealthInfo {
                environment: "test".to_string(),
                stripe_configured: true,
                notifications_configured: false,
            }))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::health::config)
            .configure(|cfg| routes::api(cfg, JWT_SECRET))
    }
}

pub fn customer_info() -> Value {
    json!({
        "contact_person": "Ana Silva",
        "phone": "+351 912 345 678",
        "email": "ana@example.com"
    })
}

/// Cash booking of the 100/person tour for two adults and a child in a double room.
pub fn cash_booking_body(start_date: &str) -> Value {
    json!({
        "tour_id": TOUR_ID,
        "start_date": start_date,
        "adults": 2,
        "children": 1,
        "room_preference": "double",
        "customer_info": customer_info(),
        "payment_method": "cash"
    })
}

pub fn card_booking_body(tour_id: &str, start_date: &str, amount: f64, reference: &str) -> Value {
    json!({
        "tour_id": tour_id,
        "start_date": start_date,
        "adults": 1,
        "customer_info": customer_info(),
        "payment_method": "card",
        "payment": {
            "outcome": "succeeded",
            "reference": reference,
            "amount": amount,
            "currency": "usd"
        }
    })
}

pub fn booking_id(body: &Value) -> String {
    body["_id"]["$oid"]
        .as_str()
        .expect("booking id")
        .to_string()
}

/// Status of a call that may be rejected by middleware before reaching a handler.
pub async fn call_status<S, B>(app: &S, req: Request) -> StatusCode
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    match test::try_call_service(app, req).await {
        Ok(resp) => resp.status(),
        Err(err) => err.as_response_error().status_code(),
    }
}

pub fn days_from_now(days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(days)).to_rfc3339()
}
