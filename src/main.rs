use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;

use wayfare_api::config::AppConfig;
use wayfare_api::db::{booking_repo::MongoBookingStore, mongo::create_mongo_client};
use wayfare_api::routes;
use wayfare_api::routes::health::HealthInfo;
use wayfare_api::services::booking_service::BookingService;
use wayfare_api::services::booking_store::BookingStore;
use wayfare_api::services::catalog_service::{CatalogLookup, MongoCatalog};
use wayfare_api::services::notification_service::{LogNotifier, Notifier, SendGridNotifier};
use wayfare_api::services::payment::interface::{PaymentGateway, UnconfiguredGateway};
use wayfare_api::services::reference_service::TimestampReferenceGenerator;
use wayfare_api::services::stripe::provider::StripeProvider;

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if cfg!(debug_assertions) {
        dotenv::dotenv().ok();
    }
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        startup_error(e)
    })?;

    let client = create_mongo_client(&config.mongodb_uri)
        .await
        .map_err(startup_error)?;

    let persistence = MongoBookingStore::new(&client, &config.database);
    persistence.ensure_indexes().await.map_err(|e| {
        log::error!("Failed to create booking indexes: {}", e);
        startup_error(e)
    })?;

    let store = BookingStore::new(Arc::new(persistence), Arc::new(TimestampReferenceGenerator));
    let catalog: Arc<dyn CatalogLookup> =
        Arc::new(MongoCatalog::new(&client, &config.catalog_database));

    let notifier: Arc<dyn Notifier> = match &config.sendgrid_api_key {
        Some(key) => Arc::new(SendGridNotifier::new(
            key.clone(),
            config.notification_from_email.clone(),
        )),
        None => {
            log::warn!("SENDGRID_API_KEY not set, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let gateway: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
        Some(key) => Arc::new(StripeProvider::new(key.clone())),
        None => {
            log::warn!("STRIPE_SECRET_KEY not set, card payments are disabled");
            Arc::new(UnconfiguredGateway)
        }
    };

    let service = web::Data::new(
        BookingService::new(
            store,
            catalog,
            notifier,
            config.pricing.clone(),
            config.refunds.clone(),
            config.currency.clone(),
        )
        .with_max_reference_attempts(config.max_reference_attempts),
    );
    let gateway = web::Data::from(gateway);
    let health = web::Data::new(HealthInfo {
        environment: config.environment.clone(),
        stripe_configured: config.stripe_secret_key.is_some(),
        notifications_configured: config.sendgrid_api_key.is_some(),
    });
    let client = web::Data::new(client);
    let jwt_secret = config.jwt_secret.clone();

    log::info!("Starting HTTP server on {}:{}", config.host, config.port);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .app_data(client.clone())
            .app_data(service.clone())
            .app_data(gateway.clone())
            .app_data(health.clone())
            .configure(routes::health::config)
            .configure(|cfg| routes::api(cfg, &jwt_secret))
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await
}
