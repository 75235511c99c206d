//! Inbound and outbound transfer policies

pub mod inbound;
pub mod outbound;

pub use inbound::{InboundPolicy, TtlInboundPolicy};
pub use outbound::{DelayOutboundPolicy, OutboundPolicy};
