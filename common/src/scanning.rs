//! Seam between the scan coordinator and the link-layer discovery engine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::network::host::DiscoveryReply;
use crate::network::range::Subnet;

/// Cooperative cancellation flag shared between the terminal and the engine.
///
/// Cloning yields a handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Finds live hosts on a directly attached subnet.
#[async_trait]
pub trait NetworkScanner: Send + Sync {
    /// Sweeps `subnet` once and collects replies for `window`.
    ///
    /// Returns one reply per host, in arrival order. An empty list is a
    /// valid outcome. Collection ends early when every swept address has
    /// answered or `stop` fires.
    async fn discover(
        &self,
        subnet: &Subnet,
        window: Duration,
        stop: &StopSignal,
    ) -> Result<Vec<DiscoveryReply>, TransportError>;
}
