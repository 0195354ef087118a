use actix_web::{web, HttpResponse};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::BookingError;
use crate::middleware::{auth::AuthMiddleware, auth_context::AuthenticatedUser};
use crate::services::booking_service::{
    BookingService, CreateBookingRequest, QuoteRequest, ReconcilePaymentRequest,
};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CancelBookingInput {
    pub reason: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(
        web::scope("/bookings")
            .wrap(AuthMiddleware::new(jwt_secret))
            .route("", web::post().to(create_booking))
            .route("", web::get().to(list_own_bookings))
            .route("/quote", web::post().to(quote))
            .route("/{id}", web::get().to(get_booking))
            .route("/{id}/cancel", web::patch().to(cancel_booking))
            .route("/{id}/payment", web::patch().to(reconcile_payment)),
    );
}

pub fn parse_booking_id(raw: &str) -> Result<ObjectId, BookingError> {
    ObjectId::parse_str(raw)
        .map_err(|_| BookingError::Validation("Invalid booking ID format".to_string()))
}

/*
    POST /api/bookings
*/
pub async fn create_booking(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    input: web::Json<CreateBookingRequest>,
) -> Result<HttpResponse, BookingError> {
    let booking = service
        .create_booking(&user.user_id, input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Created().json(booking))
}

/*
    GET /api/bookings
*/
pub async fn list_own_bookings(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
) -> Result<HttpResponse, BookingError> {
    let bookings = service.list_own_bookings(&user.user_id).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/*
    POST /api/bookings/quote
*/
pub async fn quote(
    _user: AuthenticatedUser,
    service: web::Data<BookingService>,
    input: web::Json<QuoteRequest>,
) -> Result<HttpResponse, BookingError> {
    let quote = service.quote(&input).await?;
    Ok(HttpResponse::Ok().json(quote))
}

/*
    GET /api/bookings/{id}
*/
pub async fn get_booking(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let id = parse_booking_id(&path.into_inner())?;
    let booking = service.get_own_booking(&user.user_id, &id).await?;
    Ok(HttpResponse::Ok().json(booking))
}

/*
    PATCH /api/bookings/{id}/cancel
*/
pub async fn cancel_booking(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    path: web::Path<String>,
    input: Option<web::Json<CancelBookingInput>>,
) -> Result<HttpResponse, BookingError> {
    let id = parse_booking_id(&path.into_inner())?;
    let reason = input.and_then(|i| i.into_inner().reason);
    let booking = service
        .cancel_booking(&user.traveler(), &id, reason, Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}

/*
    PATCH /api/bookings/{id}/payment
*/
pub async fn reconcile_payment(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    path: web::Path<String>,
    input: web::Json<ReconcilePaymentRequest>,
) -> Result<HttpResponse, BookingError> {
    let id = parse_booking_id(&path.into_inner())?;
    let booking = service
        .reconcile_payment(&user.user_id, &id, input.into_inner(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}
