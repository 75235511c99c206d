//! # Transfer Gateway
//!
//! Fault-tolerance layer for unreliable outbound transfers:
//! - Inbound response cache with TTL-based staleness
//! - Resend queue for failed outbound requests
//! - Pluggable inbound/outbound policies
//! - Queue runner draining many gateways
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     QueueRunner                      │
//! └────────────┬─────────────────────────────────────────┘
//!              │ drain_queue()
//! ┌────────────▼─────────────────────────────────────────┐
//! │ Gateway ── InboundPolicy / OutboundPolicy            │
//! │    │                                                 │
//! │    ├── Transport (live transfer, request hash)       │
//! │    ├── DataSerializer (payload <-> bytes)            │
//! │    └── Storage (cache + FIFO queue per gateway ID)   │
//! └──────────────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod policy;
pub mod runner;
pub mod serializer;
pub mod storage;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::GatewayConfig;
pub use error::{Error, Result, TransferError};
pub use gateway::{DrainReport, Gateway, GatewayOptions, Inbound};
pub use policy::{DelayOutboundPolicy, InboundPolicy, OutboundPolicy, TtlInboundPolicy};
pub use runner::{QueueDrain, QueueRunner, RunReport};
pub use serializer::{BincodeSerializer, DataSerializer, JsonSerializer};
pub use storage::{DataContainer, MemoryStorage, Storage};
pub use transport::Transport;
