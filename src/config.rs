use std::env;

use rust_decimal::Decimal;

use crate::services::booking_service::DEFAULT_REFERENCE_ATTEMPTS;
use crate::services::pricing_service::PricingConfig;
use crate::services::refund_service::RefundPolicy;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub mongodb_uri: String,
    pub database: String,
    pub catalog_database: String,
    pub jwt_secret: String,
    pub stripe_secret_key: Option<String>,
    pub sendgrid_api_key: Option<String>,
    pub notification_from_email: String,
    pub currency: String,
    pub pricing: PricingConfig,
    pub refunds: RefundPolicy,
    pub max_reference_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source; `from_env` passes
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => PORT,
        };

        let mut pricing = PricingConfig::default();
        if let Some(raw) = var("BOOKING_TAX_RATE") {
            let rate: Decimal = raw.parse().map_err(|_| ConfigError::Invalid {
                name: "BOOKING_TAX_RATE",
                value: raw.clone(),
            })?;
            if rate.is_sign_negative() || rate >= Decimal::ONE {
                return Err(ConfigError::Invalid {
                    name: "BOOKING_TAX_RATE",
                    value: raw,
                });
            }
            pricing.tax_rate = rate;
        }

        let max_reference_attempts = match var("REFERENCE_MAX_ATTEMPTS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "REFERENCE_MAX_ATTEMPTS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_REFERENCE_ATTEMPTS,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| HOST.to_string()),
            port,
            environment: var("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            mongodb_uri: var("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?,
            database: var("MONGODB_DATABASE").unwrap_or_else(|| "Account".to_string()),
            catalog_database: var("CATALOG_DATABASE").unwrap_or_else(|| "Itineraries".to_string()),
            jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            stripe_secret_key: var("STRIPE_SECRET_KEY"),
            sendgrid_api_key: var("SENDGRID_API_KEY"),
            notification_from_email: var("NOTIFICATION_FROM_EMAIL")
                .unwrap_or_else(|| "bookings@wayfare.travel".to_string()),
            currency: var("BOOKING_CURRENCY")
                .unwrap_or_else(|| "usd".to_string())
                .to_lowercase(),
            pricing,
            refunds: RefundPolicy::default(),
            max_reference_attempts,
        })
    }
}
