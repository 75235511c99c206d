//! Outbound policy: whether and when queued requests are resent

use crate::storage::DataContainer;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// Governs resending of queued outbound requests
pub trait OutboundPolicy: Send + Sync {
    /// Global switch; when false queued requests are discarded on drain
    fn is_resend_allowed(&self) -> bool;

    /// Whether a queued entry is due for resend at `now`
    fn is_ready_to_resend(&self, container: &DataContainer, now: DateTime<Utc>) -> bool;
}

/// Delay-based outbound policy
///
/// - no delay: resending disabled
/// - zero delay: every entry is ready
/// - positive delay: ready once strictly more than `delay` has passed since
///   the entry was queued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayOutboundPolicy {
    delay: Option<Duration>,
}

impl DelayOutboundPolicy {
    /// Create a policy resending after `delay_secs`; must not be negative
    pub fn new(delay_secs: i64) -> Result<Self> {
        if delay_secs < 0 {
            return Err(Error::InvalidArgument(format!(
                "Resend delay can not be negative, got {}",
                delay_secs
            )));
        }

        Ok(Self {
            delay: Some(Duration::seconds(delay_secs)),
        })
    }

    /// Build from an optional delay; `None` disables resending
    pub fn from_secs(delay_secs: Option<i64>) -> Result<Self> {
        match delay_secs {
            Some(secs) => Self::new(secs),
            None => Ok(Self::never()),
        }
    }

    /// Policy that never resends
    pub fn never() -> Self {
        Self { delay: None }
    }

    /// Policy that resends on every drain
    pub fn immediate() -> Self {
        Self {
            delay: Some(Duration::zero()),
        }
    }

    /// Configured delay
    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }
}

impl Default for DelayOutboundPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl OutboundPolicy for DelayOutboundPolicy {
    fn is_resend_allowed(&self) -> bool {
        self.delay.is_some()
    }

    fn is_ready_to_resend(&self, container: &DataContainer, now: DateTime<Utc>) -> bool {
        match self.delay {
            None => false,
            Some(delay) if delay == Duration::zero() => true,
            Some(delay) => now.signed_duration_since(container.created_at()) > delay,
        }
    }
}
