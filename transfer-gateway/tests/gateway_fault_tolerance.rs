//! Gateway behavior against a scripted transport
//!
//! Covers the fallback chain (live → cache → default → unavailable), the
//! resend queue drain and the queue runner.

use chrono::Duration;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use transfer_gateway::{
    DataContainer, DelayOutboundPolicy, DrainReport, Error, Gateway, GatewayOptions, Inbound,
    ManualClock, MemoryStorage, QueueDrain, QueueRunner, Storage, TransferError, Transport,
    TtlInboundPolicy,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Lookup {
    key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Answer {
    value: String,
}

fn lookup(key: &str) -> Lookup {
    Lookup {
        key: key.to_string(),
    }
}

fn answer(value: &str) -> Answer {
    Answer {
        value: value.to_string(),
    }
}

/// Transport answering from a script; an exhausted script means failure
#[derive(Clone, Default)]
struct ScriptedTransport {
    script: Arc<Mutex<VecDeque<std::result::Result<Answer, TransferError>>>>,
    calls: Arc<Mutex<Vec<Lookup>>>,
}

impl ScriptedTransport {
    fn push_ok(&self, value: &str) {
        self.script.lock().push_back(Ok(answer(value)));
    }

    fn push_err(&self) {
        self.script
            .lock()
            .push_back(Err(TransferError::new("connection refused")));
    }

    fn calls(&self) -> Vec<Lookup> {
        self.calls.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    type Request = Lookup;
    type Response = Answer;

    fn validate(&self, request: &Lookup) -> transfer_gateway::Result<()> {
        if request.key.is_empty() {
            return Err(Error::InvalidArgument("lookup key is empty".to_string()));
        }
        Ok(())
    }

    fn transfer(&self, request: &Lookup) -> std::result::Result<Answer, TransferError> {
        self.calls.lock().push(request.clone());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransferError::new("remote unavailable")))
    }

    fn hash(&self, request: &Lookup) -> transfer_gateway::Result<String> {
        if request.key.contains('/') {
            return Err(Error::InvalidArgument("unhashable key".to_string()));
        }
        Ok(format!("k:{}", request.key))
    }
}

/// Storage wrapper counting reads and enqueues
struct CountingStorage {
    inner: MemoryStorage,
    gets: AtomicUsize,
    enqueues: AtomicUsize,
}

impl Storage for CountingStorage {
    fn put(&self, namespace: &str, key: &str, data: Vec<u8>) -> transfer_gateway::Result<()> {
        self.inner.put(namespace, key, data)
    }

    fn get(&self, namespace: &str, key: &str) -> transfer_gateway::Result<Option<DataContainer>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(namespace, key)
    }

    fn enqueue(&self, namespace: &str, data: Vec<u8>) -> transfer_gateway::Result<()> {
        self.enqueues.fetch_add(1, Ordering::SeqCst);
        self.inner.enqueue(namespace, data)
    }

    fn dequeue(&self, namespace: &str) -> transfer_gateway::Result<Option<DataContainer>> {
        self.inner.dequeue(namespace)
    }
}

struct Fixture {
    clock: Arc<ManualClock>,
    storage: Arc<MemoryStorage>,
    transport: ScriptedTransport,
    gateway: Gateway<ScriptedTransport>,
}

fn fixture(options: GatewayOptions) -> Fixture {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let clock = Arc::new(ManualClock::default());
    let storage = Arc::new(MemoryStorage::with_clock(clock.clone()));
    let transport = ScriptedTransport::default();
    let gateway = Gateway::new("geo", storage.clone(), transport.clone())
        .unwrap()
        .with_clock(clock.clone())
        .with_options(options);

    Fixture {
        clock,
        storage,
        transport,
        gateway,
    }
}

#[test]
fn empty_id_is_rejected() {
    let storage = Arc::new(MemoryStorage::new());
    let transport = ScriptedTransport::default();

    let err = Gateway::new("", storage.clone(), transport.clone()).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    for id in ["a", "geo", "billing-v2", " "] {
        let gateway = Gateway::new(id, storage.clone(), transport.clone()).unwrap();
        assert_eq!(gateway.id(), id);
    }
}

#[test]
fn live_success_touches_neither_queue_nor_cache() {
    let storage = Arc::new(CountingStorage {
        inner: MemoryStorage::new(),
        gets: AtomicUsize::new(0),
        enqueues: AtomicUsize::new(0),
    });
    let transport = ScriptedTransport::default();
    transport.push_ok("52.37,4.89");
    let gateway = Gateway::new("geo", storage.clone(), transport.clone()).unwrap();

    let result = gateway.transfer(&lookup("amsterdam")).unwrap();

    assert_eq!(result, Inbound::Live(answer("52.37,4.89")));
    assert_eq!(storage.gets.load(Ordering::SeqCst), 0);
    assert_eq!(storage.enqueues.load(Ordering::SeqCst), 0);
    assert_eq!(storage.inner.cache_len(), 0);
    assert_eq!(transport.calls(), vec![lookup("amsterdam")]);
}

#[test]
fn failure_serves_fresh_cache_and_queues_request() {
    let f = fixture(GatewayOptions::default());
    f.gateway
        .set_inbound_policy(TtlInboundPolicy::new(None, 60).unwrap());
    f.gateway
        .store_inbound(&lookup("paris"), &answer("48.85,2.35"))
        .unwrap();
    f.transport.push_err();

    let result = f.gateway.transfer(&lookup("paris")).unwrap();

    assert_eq!(result, Inbound::Cached(answer("48.85,2.35")));
    assert_eq!(f.storage.queue_len("geo"), 1);
}

#[test]
fn stale_cache_falls_back_to_default() {
    let f = fixture(GatewayOptions::default());
    f.gateway
        .set_inbound_policy(TtlInboundPolicy::new(Some(answer("0,0")), 5).unwrap());
    f.gateway
        .store_inbound(&lookup("rome"), &answer("41.90,12.49"))
        .unwrap();

    f.clock.advance_secs(5);
    assert_eq!(
        f.gateway.perform_transfer(&lookup("rome")).unwrap(),
        answer("41.90,12.49")
    );

    f.clock.advance_secs(1);
    assert_eq!(
        f.gateway.transfer(&lookup("rome")).unwrap(),
        Inbound::Default(answer("0,0"))
    );
    assert_eq!(f.storage.queue_len("geo"), 2);
}

#[test]
fn no_cache_no_default_is_unavailable() {
    let f = fixture(GatewayOptions::default());

    let err = f.gateway.perform_transfer(&lookup("oslo")).unwrap_err();

    assert!(matches!(err, Error::InboundUnavailable { ref gateway_id } if gateway_id == "geo"));
    assert_eq!(f.storage.queue_len("geo"), 1);
}

#[test]
fn invalid_request_has_no_side_effects() {
    let f = fixture(GatewayOptions::default());

    let err = f.gateway.perform_transfer(&lookup("")).unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.storage.queue_len("geo"), 0);
}

#[test]
fn unhashable_request_is_neither_sent_nor_queued() {
    let f = fixture(GatewayOptions::default());

    let err = f.gateway.perform_transfer(&lookup("a/b")).unwrap_err();

    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.storage.queue_len("geo"), 0);
}

#[test]
fn draining_empty_queue_is_noop() {
    let f = fixture(GatewayOptions::default());
    assert_eq!(f.gateway.drain_queue().unwrap(), DrainReport::default());
    assert_eq!(f.gateway.drain_queue().unwrap(), DrainReport::default());
    assert!(f.transport.calls().is_empty());
}

#[test]
fn entries_not_due_are_consumed_without_resend() {
    let f = fixture(GatewayOptions::default());
    f.gateway
        .set_outbound_policy(DelayOutboundPolicy::new(10).unwrap());
    f.gateway.send_later(&lookup("berlin")).unwrap();

    f.clock.advance_secs(10);
    let report = f.gateway.drain_queue().unwrap();

    assert_eq!(report.dequeued, 1);
    assert_eq!(report.not_ready, 1);
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.storage.queue_len("geo"), 0);
}

#[test]
fn due_entries_are_resent_in_fifo_order() {
    let f = fixture(GatewayOptions::default());
    f.gateway
        .set_outbound_policy(DelayOutboundPolicy::new(10).unwrap());
    for city in ["lisbon", "madrid", "vienna"] {
        f.transport.push_err();
        let _ = f.gateway.perform_transfer(&lookup(city));
    }
    for _ in 0..3 {
        f.transport.push_ok("ok");
    }

    f.clock.advance_secs(11);
    let report = f.gateway.drain_queue().unwrap();

    assert_eq!(report.resent, 3);
    let resent: Vec<Lookup> = f.transport.calls().into_iter().skip(3).collect();
    assert_eq!(
        resent,
        vec![lookup("lisbon"), lookup("madrid"), lookup("vienna")]
    );
}

#[test]
fn disabled_resend_discards_entries() {
    let f = fixture(GatewayOptions::default());
    f.gateway.set_outbound_policy(DelayOutboundPolicy::never());
    f.gateway.send_later(&lookup("prague")).unwrap();
    f.gateway.send_later(&lookup("warsaw")).unwrap();

    let report = f.gateway.drain_queue().unwrap();

    assert_eq!(report.discarded, 2);
    assert!(f.transport.calls().is_empty());
    assert_eq!(f.storage.queue_len("geo"), 0);
}

#[test]
fn failed_resend_is_dropped_by_default() {
    let f = fixture(GatewayOptions::default());
    f.gateway.send_later(&lookup("dublin")).unwrap();

    let report = f.gateway.drain_queue().unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.requeued, 0);
    assert_eq!(f.storage.queue_len("geo"), 0);
}

#[test]
fn failed_resend_is_requeued_once_when_enabled() {
    let f = fixture(GatewayOptions {
        requeue_failed: true,
        ..Default::default()
    });
    f.gateway.send_later(&lookup("dublin")).unwrap();
    f.gateway.send_later(&lookup("cork")).unwrap();
    f.transport.push_err();
    f.transport.push_ok("ok");

    let report = f.gateway.drain_queue().unwrap();

    assert_eq!(report.dequeued, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.resent, 1);
    assert_eq!(report.requeued, 1);
    assert_eq!(f.transport.calls().len(), 2);
    assert_eq!(f.storage.queue_len("geo"), 1);

    f.transport.push_ok("ok");
    let report = f.gateway.drain_queue().unwrap();
    assert_eq!(report.resent, 1);
    assert_eq!(f.transport.calls().last(), Some(&lookup("dublin")));
}

#[test]
fn corrupt_queue_entry_surfaces_unserialize_error() {
    let f = fixture(GatewayOptions::default());
    f.storage.enqueue("geo", vec![0xff, 0x01]).unwrap();

    let err = f.gateway.drain_queue().unwrap_err();

    assert!(matches!(err, Error::Unserialize(_)));
    assert_eq!(f.storage.queue_len("geo"), 0);
}

#[test]
fn write_through_feeds_later_fallbacks() {
    let f = fixture(GatewayOptions {
        write_through: true,
        ..Default::default()
    });
    f.transport.push_ok("59.91,10.75");
    assert!(f.gateway.transfer(&lookup("oslo")).unwrap().is_live());

    f.transport.push_err();
    assert_eq!(
        f.gateway.transfer(&lookup("oslo")).unwrap(),
        Inbound::Cached(answer("59.91,10.75"))
    );
}

#[test]
fn policy_replacement_applies_to_next_operation() {
    let f = fixture(GatewayOptions::default());
    f.gateway
        .store_inbound(&lookup("bern"), &answer("46.94,7.44"))
        .unwrap();
    f.clock.advance(Duration::hours(1));

    assert_eq!(
        f.gateway.perform_transfer(&lookup("bern")).unwrap(),
        answer("46.94,7.44")
    );

    f.gateway
        .set_inbound_policy(TtlInboundPolicy::new(None, 60).unwrap());
    assert!(matches!(
        f.gateway.perform_transfer(&lookup("bern")),
        Err(Error::InboundUnavailable { .. })
    ));
}

#[test]
fn runner_drains_real_gateways() {
    let first = fixture(GatewayOptions::default());
    let clock = first.clock.clone();
    let storage = first.storage.clone();

    let other_transport = ScriptedTransport::default();
    let second = Gateway::new("billing", storage.clone(), other_transport.clone())
        .unwrap()
        .with_clock(clock);

    first.gateway.send_later(&lookup("athens")).unwrap();
    second.send_later(&lookup("invoice-7")).unwrap();
    first.transport.push_ok("ok");
    other_transport.push_ok("ok");

    let first: Arc<dyn QueueDrain> = Arc::new(first.gateway);
    let second: Arc<dyn QueueDrain> = Arc::new(second);
    let mut runner = QueueRunner::new();
    runner.register(first);
    runner.register(second);

    let drained = runner.run().into_result().unwrap();

    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].0, "geo");
    assert_eq!(drained[0].1.resent, 1);
    assert_eq!(drained[1].0, "billing");
    assert_eq!(drained[1].1.resent, 1);
    assert_eq!(storage.queue_len("geo"), 0);
    assert_eq!(storage.queue_len("billing"), 0);
}
