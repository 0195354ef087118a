use actix_web::web;

use crate::middleware::auth::AuthMiddleware;
use crate::middleware::role_auth::RequireRole;
use crate::models::account::UserRole;

pub mod bookings;

pub fn config(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    // Registered last runs first: authenticate, then check the role.
    cfg.service(
        web::scope("/admin")
            .wrap(RequireRole::new(UserRole::Admin))
            .wrap(AuthMiddleware::new(jwt_secret))
            .route(
                "/bookings/{id}/status",
                web::patch().to(bookings::update_status),
            )
            .route(
                "/bookings/{id}/refund",
                web::post().to(bookings::issue_refund),
            ),
    );
}
