//! Orchestration configuration loaded from environment variables.

use std::time::Duration;

/// Checkout configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `GATEWAY_NAME` — display name stored on ledger rows (default: `"authnet"`)
/// - `GATEWAY_TIMEOUT_MS` — gateway call budget (default: `10000`)
/// - `RATE_TIMEOUT_MS` — carrier rate call budget (default: `5000`)
/// - `DUPLICATE_WINDOW_SECS` — duplicate-charge lookback (default: `300`)
/// - `LOW_STOCK_ALERT` — threshold for lazily created inventory rows
///   (default: `5`)
#[derive(Debug, Clone)]
pub struct Config {
    pub gateway_name: String,
    pub gateway_timeout: Duration,
    pub rate_timeout: Duration,
    pub duplicate_window_secs: i64,
    pub low_stock_alert: i64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            gateway_name: std::env::var("GATEWAY_NAME").unwrap_or_else(|_| "authnet".to_string()),
            gateway_timeout: Duration::from_millis(
                std::env::var("GATEWAY_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10_000),
            ),
            rate_timeout: Duration::from_millis(
                std::env::var("RATE_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5_000),
            ),
            duplicate_window_secs: std::env::var("DUPLICATE_WINDOW_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            low_stock_alert: std::env::var("LOW_STOCK_ALERT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway_name: "authnet".to_string(),
            gateway_timeout: Duration::from_millis(10_000),
            rate_timeout: Duration::from_millis(5_000),
            duplicate_window_secs: 300,
            low_stock_alert: 5,
        }
    }
}
