//! Gateway configuration

use crate::gateway::GatewayOptions;
use crate::policy::{DelayOutboundPolicy, TtlInboundPolicy};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Gateway configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Gateway ID (storage namespace)
    pub id: String,

    /// Inbound cache settings
    pub inbound: InboundConfig,

    /// Outbound queue settings
    pub outbound: OutboundConfig,

    /// Cache cacheable live responses
    pub write_through: bool,
}

/// Inbound cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundConfig {
    /// Seconds a cached response stays actual; 0 = forever
    pub ttl_seconds: i64,
}

/// Outbound queue settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutboundConfig {
    /// Resend queued requests at all
    pub resend_enabled: bool,

    /// Seconds before a queued request may be resent
    pub resend_delay_seconds: i64,

    /// Re-enqueue requests whose resend failed
    pub requeue_failed: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            inbound: InboundConfig::default(),
            outbound: OutboundConfig::default(),
            write_through: false,
        }
    }
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self { ttl_seconds: 0 }
    }
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            resend_enabled: true,
            resend_delay_seconds: 0,
            requeue_failed: false,
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: GatewayConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `<PREFIX>_*` environment variables
    ///
    /// Recognized: `ID`, `TTL_SECONDS`, `RESEND_DELAY_SECONDS` (`never`
    /// disables resending), `REQUEUE_FAILED`, `WRITE_THROUGH`.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    fn from_lookup(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(&format!("{}_{}", prefix, name));
        let mut config = GatewayConfig::default();

        if let Some(id) = var("ID") {
            config.id = id;
        }

        if let Some(ttl) = var("TTL_SECONDS") {
            config.inbound.ttl_seconds = parse_number(&ttl, "TTL_SECONDS")?;
        }

        if let Some(delay) = var("RESEND_DELAY_SECONDS") {
            if delay.trim().eq_ignore_ascii_case("never") {
                config.outbound.resend_enabled = false;
            } else {
                config.outbound.resend_delay_seconds = parse_number(&delay, "RESEND_DELAY_SECONDS")?;
            }
        }

        if let Some(flag) = var("REQUEUE_FAILED") {
            config.outbound.requeue_failed = parse_flag(&flag, "REQUEUE_FAILED")?;
        }

        if let Some(flag) = var("WRITE_THROUGH") {
            config.write_through = parse_flag(&flag, "WRITE_THROUGH")?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::Config("Gateway ID can not be empty".to_string()));
        }
        if self.inbound.ttl_seconds < 0 {
            return Err(Error::Config(format!(
                "inbound.ttl_seconds can not be negative, got {}",
                self.inbound.ttl_seconds
            )));
        }
        if self.outbound.resend_delay_seconds < 0 {
            return Err(Error::Config(format!(
                "outbound.resend_delay_seconds can not be negative, got {}",
                self.outbound.resend_delay_seconds
            )));
        }
        Ok(())
    }

    /// Inbound policy described by this configuration
    pub fn inbound_policy<R>(&self, default: Option<R>) -> Result<TtlInboundPolicy<R>> {
        TtlInboundPolicy::new(default, self.inbound.ttl_seconds)
    }

    /// Outbound policy described by this configuration
    pub fn outbound_policy(&self) -> Result<DelayOutboundPolicy> {
        if self.outbound.resend_enabled {
            DelayOutboundPolicy::new(self.outbound.resend_delay_seconds)
        } else {
            Ok(DelayOutboundPolicy::never())
        }
    }

    /// Gateway behavior switches described by this configuration
    pub fn options(&self) -> GatewayOptions {
        GatewayOptions {
            write_through: self.write_through,
            requeue_failed: self.outbound.requeue_failed,
        }
    }
}

fn parse_number(value: &str, name: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be an integer, got {:?}", name, value)))
}

fn parse_flag(value: &str, name: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{} must be a boolean, got {:?}",
            name, value
        ))),
    }
}
