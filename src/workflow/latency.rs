//! Simulated payment latency.
//!
//! The execution sequencer awaits a [`Latency`] between starting and
//! completing each payment. Production uses a random delay in the
//! configured range; tests inject [`NoLatency`] or their own gate.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::config::WorkflowConfig;
use crate::models::ContractorPayment;

/// Awaited once per payment while it is processing.
#[async_trait]
pub trait Latency: Send + Sync {
    /// Suspends until the simulated bank round-trip for `payment` is done.
    async fn wait(&self, payment: &ContractorPayment);
}

/// Uniformly random delay between two bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomLatency {
    min_ms: u64,
    max_ms: u64,
}

impl RandomLatency {
    /// Creates a latency drawn from `min..=max`. Swapped bounds are reordered.
    pub fn new(min: Duration, max: Duration) -> Self {
        let (a, b) = (min.as_millis() as u64, max.as_millis() as u64);
        Self {
            min_ms: a.min(b),
            max_ms: a.max(b),
        }
    }

    /// Uses the execution latency range from configuration.
    pub fn from_config(config: &WorkflowConfig) -> Self {
        let (min, max) = config.latency_range();
        Self::new(min, max)
    }

    /// Draws one delay.
    pub fn sample(&self) -> Duration {
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

#[async_trait]
impl Latency for RandomLatency {
    async fn wait(&self, _payment: &ContractorPayment) {
        let delay = self.sample();
        tokio::time::sleep(delay).await;
    }
}

/// The same delay for every payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLatency(pub Duration);

#[async_trait]
impl Latency for FixedLatency {
    async fn wait(&self, _payment: &ContractorPayment) {
        tokio::time::sleep(self.0).await;
    }
}

/// Completes immediately after yielding once to the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoLatency;

#[async_trait]
impl Latency for NoLatency {
    async fn wait(&self, _payment: &ContractorPayment) {
        tokio::task::yield_now().await;
    }
}
