use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::errors::BookingError;
use crate::middleware::auth_context::AuthenticatedUser;
use crate::models::bookings::BookingStatus;
use crate::routes::bookings::parse_booking_id;
use crate::services::booking_service::BookingService;

#[derive(Deserialize)]
pub struct StatusUpdateInput {
    pub status: BookingStatus,
}

/*
    PATCH /api/admin/bookings/{id}/status
*/
pub async fn update_status(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    path: web::Path<String>,
    input: web::Json<StatusUpdateInput>,
) -> Result<HttpResponse, BookingError> {
    let id = parse_booking_id(&path.into_inner())?;
    let booking = service
        .transition_status(&id, input.status, &user.operator(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}

/*
    POST /api/admin/bookings/{id}/refund
*/
pub async fn issue_refund(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let id = parse_booking_id(&path.into_inner())?;
    let booking = service
        .issue_refund(&id, &user.operator(), Utc::now())
        .await?;
    Ok(HttpResponse::Ok().json(booking))
}
