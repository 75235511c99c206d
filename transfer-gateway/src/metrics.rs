//! Gateway metrics
//!
//! - `gateway_transfers_total` - Transfers by outcome (live, cached, default, unavailable)
//! - `gateway_enqueued_total` - Requests queued for resend
//! - `gateway_drained_total` - Queue entries processed by drain result

use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static::lazy_static! {
    /// Transfers by outcome
    pub static ref GATEWAY_TRANSFERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_transfers_total",
        "Gateway transfers by outcome",
        &["gateway_id", "outcome"]
    )
    .expect("gateway_transfers_total registers once");

    /// Requests queued for resend
    pub static ref GATEWAY_ENQUEUED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_enqueued_total",
        "Requests queued for resend",
        &["gateway_id"]
    )
    .expect("gateway_enqueued_total registers once");

    /// Drained queue entries by result
    pub static ref GATEWAY_DRAINED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gateway_drained_total",
        "Queue entries processed by drain",
        &["gateway_id", "result"]
    )
    .expect("gateway_drained_total registers once");
}

pub(crate) fn record_transfer(gateway_id: &str, outcome: &str) {
    GATEWAY_TRANSFERS_TOTAL
        .with_label_values(&[gateway_id, outcome])
        .inc();
}

pub(crate) fn record_enqueued(gateway_id: &str) {
    GATEWAY_ENQUEUED_TOTAL.with_label_values(&[gateway_id]).inc();
}

pub(crate) fn record_drained(gateway_id: &str, result: &str, count: usize) {
    if count > 0 {
        GATEWAY_DRAINED_TOTAL
            .with_label_values(&[gateway_id, result])
            .inc_by(count as u64);
    }
}
