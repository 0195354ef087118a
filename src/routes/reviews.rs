use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::errors::BookingError;
use crate::middleware::{auth::AuthMiddleware, auth_context::AuthenticatedUser};
use crate::services::booking_service::BookingService;

#[derive(Serialize)]
struct ReviewEligibility {
    subject_id: String,
    eligible: bool,
}

pub fn config(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(
        web::scope("/reviews")
            .wrap(AuthMiddleware::new(jwt_secret))
            .route("/eligibility/{subject_id}", web::get().to(eligibility)),
    );
}

/*
    GET /api/reviews/eligibility/{subject_id}
    A review is verified only when the caller has a completed booking for the subject.
*/
pub async fn eligibility(
    user: AuthenticatedUser,
    service: web::Data<BookingService>,
    path: web::Path<String>,
) -> Result<HttpResponse, BookingError> {
    let subject_id = path.into_inner();
    let eligible = service
        .has_completed_booking(&user.user_id, &subject_id)
        .await?;
    Ok(HttpResponse::Ok().json(ReviewEligibility {
        subject_id,
        eligible,
    }))
}
