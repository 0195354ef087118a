use actix_web::web;

pub mod admin;
pub mod bookings;
pub mod health;
pub mod payment;
pub mod reviews;

/// Everything under `/api`. Shared by the server and the integration tests.
pub fn api(cfg: &mut web::ServiceConfig, jwt_secret: &str) {
    cfg.service(
        web::scope("/api")
            .configure(|c| bookings::config(c, jwt_secret))
            .configure(|c| payment::config(c, jwt_secret))
            .configure(|c| reviews::config(c, jwt_secret))
            .configure(|c| admin::config(c, jwt_secret)),
    );
}
