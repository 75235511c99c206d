//! Inbound policy: what a gateway may answer when the live transfer fails

use crate::storage::DataContainer;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};

/// Decides the fallback default and the freshness of cached responses
pub trait InboundPolicy<R>: Send + Sync {
    /// Value to answer with when no usable cache entry exists
    fn default_value(&self) -> Option<R>;

    /// Whether a cached entry may still be served at `now`
    fn is_actual(&self, container: &DataContainer, now: DateTime<Utc>) -> bool;
}

/// TTL-based inbound policy
///
/// A TTL of zero means cached entries never go stale. Otherwise an entry is
/// actual while `now - created_at <= ttl`, so an entry is still served at
/// exactly its TTL.
#[derive(Debug, Clone)]
pub struct TtlInboundPolicy<R> {
    default: Option<R>,
    ttl: Option<Duration>,
}

impl<R> TtlInboundPolicy<R> {
    /// Create a policy; `ttl_secs` must not be negative
    pub fn new(default: Option<R>, ttl_secs: i64) -> Result<Self> {
        if ttl_secs < 0 {
            return Err(Error::InvalidArgument(format!(
                "TTL can not be negative, got {}",
                ttl_secs
            )));
        }

        Ok(Self {
            default,
            ttl: (ttl_secs > 0).then(|| Duration::seconds(ttl_secs)),
        })
    }

    /// Never-stale policy answering `default` when nothing is cached
    pub fn with_default(default: R) -> Self {
        Self {
            default: Some(default),
            ttl: None,
        }
    }

    /// Configured TTL in seconds, zero when entries never expire
    pub fn ttl_secs(&self) -> i64 {
        self.ttl.map(|ttl| ttl.num_seconds()).unwrap_or(0)
    }
}

impl<R> Default for TtlInboundPolicy<R> {
    fn default() -> Self {
        Self {
            default: None,
            ttl: None,
        }
    }
}

impl<R> InboundPolicy<R> for TtlInboundPolicy<R>
where
    R: Clone + Send + Sync,
{
    fn default_value(&self) -> Option<R> {
        self.default.clone()
    }

    fn is_actual(&self, container: &DataContainer, now: DateTime<Utc>) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => now.signed_duration_since(container.created_at()) <= ttl,
        }
    }
}
