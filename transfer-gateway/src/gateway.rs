//! Fault-tolerant gateway
//!
//! A [`Gateway`] wraps a [`Transport`] and masks its failures:
//!
//! 1. try the live transfer
//! 2. on failure, queue the request for a later resend
//! 3. answer from the inbound cache if the entry is still actual
//! 4. otherwise answer with the inbound policy default
//! 5. otherwise fail with [`Error::InboundUnavailable`]
//!
//! Queued requests are resent by [`Gateway::drain_queue`], usually driven by a
//! [`crate::QueueRunner`].

use crate::clock::{Clock, SystemClock};
use crate::metrics;
use crate::policy::{DelayOutboundPolicy, InboundPolicy, OutboundPolicy, TtlInboundPolicy};
use crate::serializer::{BincodeSerializer, DataSerializer};
use crate::storage::{DataContainer, Storage};
use crate::transport::Transport;
use crate::{Error, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Behavior switches of a gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Cache cacheable live responses under the request hash
    pub write_through: bool,
    /// Put requests whose resend failed back on the queue once a drain ends
    pub requeue_failed: bool,
}

/// Where an inbound value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound<R> {
    /// Live transfer succeeded
    Live(R),
    /// Served from the inbound cache
    Cached(R),
    /// Inbound policy default
    Default(R),
}

impl<R> Inbound<R> {
    /// The value, whatever its source
    pub fn into_inner(self) -> R {
        match self {
            Inbound::Live(value) | Inbound::Cached(value) | Inbound::Default(value) => value,
        }
    }

    /// True if the live transfer succeeded
    pub fn is_live(&self) -> bool {
        matches!(self, Inbound::Live(_))
    }

    /// Outcome label used in logs and metrics
    pub fn source(&self) -> &'static str {
        match self {
            Inbound::Live(_) => "live",
            Inbound::Cached(_) => "cached",
            Inbound::Default(_) => "default",
        }
    }
}

/// Counters of one queue drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries taken off the queue
    pub dequeued: usize,
    /// Entries transferred successfully
    pub resent: usize,
    /// Entries dropped because resending is disabled
    pub discarded: usize,
    /// Entries consumed before their resend delay elapsed
    pub not_ready: usize,
    /// Entries whose resend failed
    pub failed: usize,
    /// Failed entries put back on the queue
    pub requeued: usize,
}

enum EntryOutcome {
    Resent,
    Discarded,
    NotReady,
    Failed,
}

/// Fault-tolerant wrapper around one transport
pub struct Gateway<T, S = BincodeSerializer>
where
    T: Transport,
{
    id: String,
    storage: Arc<dyn Storage>,
    serializer: S,
    transport: T,
    inbound_policy: RwLock<Arc<dyn InboundPolicy<T::Response>>>,
    outbound_policy: RwLock<Arc<dyn OutboundPolicy>>,
    clock: Arc<dyn Clock>,
    options: GatewayOptions,
}

impl<T> Gateway<T, BincodeSerializer>
where
    T: Transport,
    T::Request: serde::Serialize + serde::de::DeserializeOwned,
    T::Response: serde::Serialize + serde::de::DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a gateway using the default serializer
    pub fn new(id: impl Into<String>, storage: Arc<dyn Storage>, transport: T) -> Result<Self> {
        Self::with_serializer(id, storage, transport, BincodeSerializer)
    }
}

impl<T, S> Gateway<T, S>
where
    T: Transport,
    T::Response: Clone + Send + Sync + 'static,
    S: DataSerializer<T::Request> + DataSerializer<T::Response>,
{
    /// Create a gateway with an explicit serializer
    ///
    /// Fails with [`Error::InvalidArgument`] when `id` is empty.
    pub fn with_serializer(
        id: impl Into<String>,
        storage: Arc<dyn Storage>,
        transport: T,
        serializer: S,
    ) -> Result<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(Error::InvalidArgument(
                "Gateway ID can not be empty".to_string(),
            ));
        }

        Ok(Self {
            id,
            storage,
            serializer,
            transport,
            inbound_policy: RwLock::new(Arc::new(TtlInboundPolicy::default())),
            outbound_policy: RwLock::new(Arc::new(DelayOutboundPolicy::default())),
            clock: Arc::new(SystemClock),
            options: GatewayOptions::default(),
        })
    }

    /// Use `clock` when judging freshness and resend timing
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the behavior switches
    pub fn with_options(mut self, options: GatewayOptions) -> Self {
        self.options = options;
        self
    }

    /// Gateway ID, also the storage namespace
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Behavior switches
    pub fn options(&self) -> GatewayOptions {
        self.options
    }

    /// The wrapped transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Current inbound policy
    pub fn inbound_policy(&self) -> Arc<dyn InboundPolicy<T::Response>> {
        self.inbound_policy.read().clone()
    }

    /// Replace the inbound policy; applies from the next operation
    pub fn set_inbound_policy(&self, policy: impl InboundPolicy<T::Response> + 'static) {
        *self.inbound_policy.write() = Arc::new(policy);
    }

    /// Current outbound policy
    pub fn outbound_policy(&self) -> Arc<dyn OutboundPolicy> {
        self.outbound_policy.read().clone()
    }

    /// Replace the outbound policy; applies from the next operation
    pub fn set_outbound_policy(&self, policy: impl OutboundPolicy + 'static) {
        *self.outbound_policy.write() = Arc::new(policy);
    }

    /// Transfer `request`, falling back to cached or default data on failure
    pub fn perform_transfer(&self, request: &T::Request) -> Result<T::Response> {
        self.transfer(request).map(Inbound::into_inner)
    }

    /// Like [`Gateway::perform_transfer`], reporting where the value came from
    pub fn transfer(&self, request: &T::Request) -> Result<Inbound<T::Response>> {
        self.transport.validate(request)?;
        // Unhashable requests fail before the live call
        let hash = self.transport.hash(request)?;

        let err = match self.transport.transfer(request) {
            Ok(response) => {
                if self.options.write_through {
                    self.write_through(request, &response);
                }
                metrics::record_transfer(&self.id, "live");
                return Ok(Inbound::Live(response));
            }
            Err(err) => err,
        };

        warn!(gateway_id = %self.id, error = %err, "Live transfer failed, falling back");

        let raw = self.encode_request(request)?;
        self.storage.enqueue(&self.id, raw)?;
        metrics::record_enqueued(&self.id);

        match self.fallback(&hash) {
            Ok(inbound) => {
                metrics::record_transfer(&self.id, inbound.source());
                Ok(inbound)
            }
            Err(e) => {
                if matches!(e, Error::InboundUnavailable { .. }) {
                    metrics::record_transfer(&self.id, "unavailable");
                }
                Err(e)
            }
        }
    }

    /// Queue `request` for a later resend without trying it now
    pub fn send_later(&self, request: &T::Request) -> Result<()> {
        self.transport.validate(request)?;
        let raw = self.encode_request(request)?;
        self.storage.enqueue(&self.id, raw)?;
        metrics::record_enqueued(&self.id);
        debug!(gateway_id = %self.id, "Request queued for resend");
        Ok(())
    }

    /// Write `response` to the inbound cache under the hash of `request`
    pub fn store_inbound(&self, request: &T::Request, response: &T::Response) -> Result<()> {
        let hash = self.transport.hash(request)?;
        let raw = self.encode_response(response)?;
        self.storage.put(&self.id, &hash, raw)?;
        debug!(gateway_id = %self.id, hash = %hash, "Inbound data cached");
        Ok(())
    }

    /// Cached value for `request` if present and actual, else the default
    pub fn cached_data(&self, request: &T::Request) -> Result<Inbound<T::Response>> {
        self.transport.validate(request)?;
        let hash = self.transport.hash(request)?;
        self.fallback(&hash)
    }

    /// Resend queued requests until the queue reports empty
    ///
    /// Every dequeued entry is consumed. Entries are dropped when resending is
    /// disabled or their delay has not elapsed yet. A failed resend is never
    /// retried within the same drain; with `requeue_failed` it goes back on
    /// the queue after the queue was observed empty.
    pub fn drain_queue(&self) -> Result<DrainReport> {
        let policy = self.outbound_policy();
        let mut report = DrainReport::default();
        let mut failed = Vec::new();

        loop {
            let container = match self.storage.dequeue(&self.id) {
                Ok(Some(container)) => container,
                Ok(None) => break,
                Err(e) => {
                    self.requeue(failed, &mut report)?;
                    return Err(e);
                }
            };
            report.dequeued += 1;

            match self.drain_entry(&container, policy.as_ref()) {
                Ok(EntryOutcome::Resent) => report.resent += 1,
                Ok(EntryOutcome::Discarded) => report.discarded += 1,
                Ok(EntryOutcome::NotReady) => report.not_ready += 1,
                Ok(EntryOutcome::Failed) => {
                    report.failed += 1;
                    if self.options.requeue_failed {
                        failed.push(container.into_data());
                    }
                }
                Err(e) => {
                    self.requeue(failed, &mut report)?;
                    return Err(e);
                }
            }
        }

        self.requeue(failed, &mut report)?;
        self.record_drain(&report);

        if report.dequeued > 0 {
            info!(
                gateway_id = %self.id,
                dequeued = report.dequeued,
                resent = report.resent,
                discarded = report.discarded,
                not_ready = report.not_ready,
                failed = report.failed,
                requeued = report.requeued,
                "Queue drained"
            );
        }

        Ok(report)
    }

    fn drain_entry(
        &self,
        container: &DataContainer,
        policy: &dyn OutboundPolicy,
    ) -> Result<EntryOutcome> {
        let request = self.decode_request(container.data())?;

        if !policy.is_resend_allowed() {
            debug!(gateway_id = %self.id, "Resend disabled, discarding queued request");
            return Ok(EntryOutcome::Discarded);
        }

        if !policy.is_ready_to_resend(container, self.clock.now()) {
            warn!(
                gateway_id = %self.id,
                queued_at = %container.created_at(),
                "Queued request consumed before its resend delay elapsed"
            );
            return Ok(EntryOutcome::NotReady);
        }

        match self.transport.transfer(&request) {
            Ok(response) => {
                if self.options.write_through {
                    self.write_through(&request, &response);
                }
                Ok(EntryOutcome::Resent)
            }
            Err(err) => {
                warn!(gateway_id = %self.id, error = %err, "Resend failed");
                Ok(EntryOutcome::Failed)
            }
        }
    }

    fn requeue(&self, failed: Vec<Vec<u8>>, report: &mut DrainReport) -> Result<()> {
        for raw in failed {
            self.storage.enqueue(&self.id, raw)?;
            report.requeued += 1;
        }
        Ok(())
    }

    fn record_drain(&self, report: &DrainReport) {
        metrics::record_drained(&self.id, "resent", report.resent);
        metrics::record_drained(&self.id, "discarded", report.discarded);
        metrics::record_drained(&self.id, "not_ready", report.not_ready);
        metrics::record_drained(&self.id, "failed", report.failed);
        metrics::record_drained(&self.id, "requeued", report.requeued);
    }

    fn fallback(&self, hash: &str) -> Result<Inbound<T::Response>> {
        let policy = self.inbound_policy();

        if let Some(container) = self.storage.get(&self.id, hash)? {
            if policy.is_actual(&container, self.clock.now()) {
                debug!(gateway_id = %self.id, hash = %hash, "Serving cached inbound data");
                return self.decode_response(container.data()).map(Inbound::Cached);
            }
            debug!(gateway_id = %self.id, hash = %hash, "Cached inbound data is stale");
        }

        if let Some(default) = policy.default_value() {
            debug!(gateway_id = %self.id, "Serving default inbound data");
            return Ok(Inbound::Default(default));
        }

        Err(Error::InboundUnavailable {
            gateway_id: self.id.clone(),
        })
    }

    fn write_through(&self, request: &T::Request, response: &T::Response) {
        if !self.transport.is_cacheable(response) {
            return;
        }
        if let Err(e) = self.store_inbound(request, response) {
            warn!(gateway_id = %self.id, error = %e, "Failed to cache inbound data");
        }
    }

    fn encode_request(&self, request: &T::Request) -> Result<Vec<u8>> {
        DataSerializer::<T::Request>::serialize(&self.serializer, request)
    }

    fn decode_request(&self, raw: &[u8]) -> Result<T::Request> {
        DataSerializer::<T::Request>::deserialize(&self.serializer, raw)
    }

    fn encode_response(&self, response: &T::Response) -> Result<Vec<u8>> {
        DataSerializer::<T::Response>::serialize(&self.serializer, response)
    }

    fn decode_response(&self, raw: &[u8]) -> Result<T::Response> {
        DataSerializer::<T::Response>::deserialize(&self.serializer, raw)
    }
}

impl<T, S> std::fmt::Debug for Gateway<T, S>
where
    T: Transport,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
