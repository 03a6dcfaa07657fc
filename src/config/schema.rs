//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::chain::wallet::FeePriority;

/// Root configuration for the record publisher.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PublisherConfig {
    /// Pending submission tracking.
    pub registry: RegistryConfig,

    /// Fee policy for publishing transactions.
    pub fees: FeeConfig,

    /// Submission pricing.
    pub pricing: PricingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Pending submission registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Unpaid submissions older than this are evicted.
    pub retention_secs: u64,

    /// Interval between eviction sweeps.
    pub sweep_interval_secs: u64,

    /// Capacity of the transaction notification channel.
    pub notification_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            retention_secs: 600,
            sweep_interval_secs: 60,
            notification_buffer: 256,
        }
    }
}

/// Fee configuration for publishing transactions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Fee-rate tier requested from the wallet.
    pub priority: FeePriority,

    /// Relay fee used by the dust rule, satoshis per kilobyte.
    pub relay_fee_per_kb: u64,

    /// Maximum fee rate in satoshis per byte (protection against spikes).
    pub max_fee_rate_per_byte: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            priority: FeePriority::Economic,
            relay_fee_per_kb: 1000,
            max_fee_rate_per_byte: 1000,
        }
    }
}

/// Submission pricing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Price of one submission in US cents.
    pub submission_fee_cents: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            submission_fee_cents: 2.0,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
