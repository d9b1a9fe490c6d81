//! Application settings loaded from `config.toml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! The path can be overridden with the `CINEMA_CONFIG` environment variable.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub booking: BookingPolicy,
    pub pricing: PricingConfig,
    pub payment: PaymentConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the API binds to
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
        }
    }
}

/// Timeouts and limits governing the reservation lifecycle
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingPolicy {
    /// Pending transactions older than this are rolled back
    pub payment_timeout_minutes: i64,
    /// How often the expiry sweep runs
    pub sweep_interval_seconds: u64,
    /// How often film/showtime statuses are reconciled
    pub reconcile_interval_seconds: u64,
    /// How long a seat hold lasts
    pub seat_hold_minutes: i64,
    /// Refunds must be requested at least this long before the showtime
    pub refund_cutoff_hours: i64,
    pub max_seats_per_invoice: usize,
    /// Distinct combo lines allowed on one invoice
    pub max_combo_lines: usize,
    /// Units of a single combo allowed on one invoice
    pub max_combo_quantity: i32,
    /// Cleaning gap enforced between two showtimes in one room
    pub showtime_turnaround_minutes: i64,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            payment_timeout_minutes: 10,
            sweep_interval_seconds: 60,
            reconcile_interval_seconds: 300,
            seat_hold_minutes: 5,
            refund_cutoff_hours: 24,
            max_seats_per_invoice: 8,
            max_combo_lines: 10,
            max_combo_quantity: 20,
            showtime_turnaround_minutes: 15,
        }
    }
}

/// Surcharges added to a showtime's base price per seat type
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub vip_surcharge: i64,
    pub couple_surcharge: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            vip_surcharge: 20_000,
            couple_surcharge: 50_000,
        }
    }
}

/// Hosted checkout settings for the payment provider
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Checkout links are `{checkout_base_url}/{reference}?amount={amount}`
    pub checkout_base_url: String,
    /// Shared HMAC secret for webhook signatures; webhooks are refused without one
    pub webhook_secret: Option<String>,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            checkout_base_url: "https://pay.example.com/checkout".to_string(),
            webhook_secret: None,
        }
    }
}

/// Loads the configuration from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path.as_ref().display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the configuration from `CINEMA_CONFIG` (default `./config.toml`).
///
/// A missing file yields the defaults; an unreadable or invalid one is an error.
pub fn load_app_config() -> Result<AppConfig> {
    let path = std::env::var("CINEMA_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if !Path::new(&path).exists() {
        tracing::warn!(%path, "Config file not found, using defaults");
        return Ok(AppConfig::default());
    }
    let config = load_config(&path)?;
    tracing::info!(%path, "Loaded configuration");
    Ok(config)
}
