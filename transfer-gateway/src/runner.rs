//! Queue runner: drives the resend queues of registered gateways

use crate::gateway::{DrainReport, Gateway};
use crate::serializer::DataSerializer;
use crate::transport::Transport;
use crate::{Error, Result};
use std::sync::Arc;
use tracing::{error, info};

/// Anything with a resend queue that can be drained
pub trait QueueDrain {
    /// Registry key
    fn id(&self) -> &str;

    /// Drain the resend queue once
    fn drain_queue(&self) -> Result<DrainReport>;
}

impl<T, S> QueueDrain for Gateway<T, S>
where
    T: Transport,
    T::Response: Clone + Send + Sync + 'static,
    S: DataSerializer<T::Request> + DataSerializer<T::Response>,
{
    fn id(&self) -> &str {
        Gateway::id(self)
    }

    fn drain_queue(&self) -> Result<DrainReport> {
        Gateway::drain_queue(self)
    }
}

/// Outcome of one [`QueueRunner::run`]
#[derive(Debug, Default)]
pub struct RunReport {
    /// Drain reports of gateways that drained cleanly, in run order
    pub drained: Vec<(String, DrainReport)>,
    /// Errors of gateways whose drain failed, in run order
    pub failed: Vec<(String, Error)>,
}

impl RunReport {
    /// True if every gateway drained cleanly
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }

    /// Collapse into an error naming every failed gateway
    pub fn into_result(self) -> Result<Vec<(String, DrainReport)>> {
        if self.failed.is_empty() {
            Ok(self.drained)
        } else {
            Err(Error::QueueRun {
                failed: self.failed.into_iter().map(|(id, _)| id).collect(),
            })
        }
    }
}

/// Ordered registry of gateways whose queues are drained together
///
/// Registering a gateway whose ID is already present replaces the earlier
/// registration in place.
#[derive(Default)]
pub struct QueueRunner {
    gateways: Vec<Arc<dyn QueueDrain>>,
}

impl QueueRunner {
    /// Create an empty runner
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a gateway, replacing any registered under the same ID
    pub fn register(&mut self, gateway: Arc<dyn QueueDrain>) {
        match self.gateways.iter().position(|g| g.id() == gateway.id()) {
            Some(index) => self.gateways[index] = gateway,
            None => self.gateways.push(gateway),
        }
    }

    /// Remove the gateway registered under `id`; returns whether one was found
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.gateways.len();
        self.gateways.retain(|g| g.id() != id);
        self.gateways.len() != before
    }

    /// Registered gateway IDs in run order
    pub fn ids(&self) -> Vec<&str> {
        self.gateways.iter().map(|g| g.id()).collect()
    }

    /// Number of registered gateways
    pub fn len(&self) -> usize {
        self.gateways.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Drain every registered gateway in registration order
    ///
    /// A failing gateway does not stop the others; its error is kept in the
    /// report.
    pub fn run(&self) -> RunReport {
        let mut report = RunReport::default();

        for gateway in &self.gateways {
            let id = gateway.id().to_string();
            match gateway.drain_queue() {
                Ok(drain) => report.drained.push((id, drain)),
                Err(e) => {
                    error!(gateway_id = %id, error = %e, "Queue drain failed");
                    report.failed.push((id, e));
                }
            }
        }

        info!(
            drained = report.drained.len(),
            failed = report.failed.len(),
            "Queue run finished"
        );
        report
    }
}

impl std::fmt::Debug for QueueRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueRunner")
            .field("gateways", &self.ids())
            .finish()
    }
}
