use actix_web::{web, HttpResponse, Responder};
use mongodb::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::db::mongo::ping;

/// Static facts the health report needs about the running configuration.
#[derive(Clone)]
pub struct HealthInfo {
    pub environment: String,
    pub stripe_configured: bool,
    pub notifications_configured: bool,
}

#[derive(Serialize)]
struct HealthStatus {
    status: String,
    services: HashMap<String, ServiceStatus>,
    environment: String,
    version: String,
}

#[derive(Serialize, Clone)]
struct ServiceStatus {
    status: String,
    details: Option<String>,
}

impl ServiceStatus {
    fn ok(details: &str) -> Self {
        Self {
            status: "ok".to_string(),
            details: Some(details.to_string()),
        }
    }

    fn error(details: String) -> Self {
        Self {
            status: "error".to_string(),
            details: Some(details),
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check));
}

pub async fn health_check(
    client: Option<web::Data<Arc<Client>>>,
    info: web::Data<HealthInfo>,
) -> impl Responder {
    let mut health = HealthStatus {
        status: "ok".to_string(),
        services: HashMap::new(),
        environment: info.environment.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let mongo_result = match client {
        Some(client) => check_mongodb(&client).await,
        None => ServiceStatus::error("MongoDB client not configured".to_string()),
    };
    health
        .services
        .insert("mongodb".to_string(), mongo_result.clone());

    let stripe_result = if info.stripe_configured {
        ServiceStatus::ok("Stripe API key configured")
    } else {
        ServiceStatus::error("STRIPE_SECRET_KEY not configured".to_string())
    };
    health
        .services
        .insert("stripe".to_string(), stripe_result.clone());

    // Notifications fall back to the log, so a missing key is not degraded
    let notifications = if info.notifications_configured {
        ServiceStatus::ok("SendGrid configured")
    } else {
        ServiceStatus::ok("Logging notifications only")
    };
    health
        .services
        .insert("notifications".to_string(), notifications);

    if mongo_result.status != "ok" || stripe_result.status != "ok" {
        health.status = "degraded".to_string();
    }

    HttpResponse::Ok().json(health)
}

async fn check_mongodb(client: &web::Data<Arc<Client>>) -> ServiceStatus {
    match ping(client).await {
        Ok(()) => ServiceStatus::ok("Connected successfully to MongoDB"),
        Err(e) => {
            log::error!("MongoDB health check failed: {}", e);
            ServiceStatus::error(format!("Failed to connect: {}", e))
        }
    }
}
