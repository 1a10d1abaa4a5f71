//! Application state for the Payroll Cycle API.
//!
//! This module defines the shared application state that is available
//! to all request handlers. Each store sits behind its own
//! `tokio::sync::Mutex`, so writes to the cycle and to the batch are
//! serialized across concurrent requests.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigLoader, WorkflowConfig};
use crate::error::{WorkflowError, WorkflowResult};
use crate::workflow::{Clock, Latency, PayCycle, PayrollBatch, RandomLatency, SystemClock};

/// Shared handle to the current batch; the execution task holds a clone.
pub type SharedBatch = Arc<Mutex<PayrollBatch>>;

/// Shared application state.
///
/// Contains resources that are shared across all request handlers: the
/// loaded configuration, the injected clock and latency, and the current
/// pay cycle and batch.
#[derive(Clone)]
pub struct AppState {
    config: Arc<WorkflowConfig>,
    clock: Arc<dyn Clock>,
    latency: Arc<dyn Latency>,
    cycle: Arc<Mutex<Option<PayCycle>>>,
    batch: Arc<Mutex<Option<SharedBatch>>>,
    running: Arc<Mutex<Option<CancellationToken>>>,
}

impl AppState {
    /// Creates a state using the system clock and the configured latency range.
    pub fn new(config: WorkflowConfig) -> Self {
        let latency = RandomLatency::from_config(&config);
        Self {
            config: Arc::new(config),
            clock: Arc::new(SystemClock),
            latency: Arc::new(latency),
            cycle: Arc::new(Mutex::new(None)),
            batch: Arc::new(Mutex::new(None)),
            running: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a state from a loaded configuration directory.
    pub fn from_loader(loader: ConfigLoader) -> Self {
        Self::new(loader.into_config())
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the per-payment latency.
    pub fn with_latency(mut self, latency: Arc<dyn Latency>) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the workflow configuration.
    pub fn config(&self) -> &Arc<WorkflowConfig> {
        &self.config
    }

    /// Returns the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Returns the per-payment latency.
    pub fn latency(&self) -> &Arc<dyn Latency> {
        &self.latency
    }

    /// The current pay cycle slot.
    pub fn cycle(&self) -> &Mutex<Option<PayCycle>> {
        &self.cycle
    }

    /// Returns the current batch or `NotFound`.
    pub async fn current_batch(&self) -> WorkflowResult<SharedBatch> {
        self.batch
            .lock()
            .await
            .clone()
            .ok_or_else(|| WorkflowError::not_found("PayrollBatch", "current"))
    }

    /// Installs a new batch. Rejected while an execution run is active.
    pub async fn replace_batch(&self, batch: PayrollBatch) -> WorkflowResult<SharedBatch> {
        let running = self.running.lock().await;
        if running.is_some() {
            return Err(WorkflowError::invalid_state(
                "create_batch",
                "an execution run is in progress",
            ));
        }
        let shared = Arc::new(Mutex::new(batch));
        *self.batch.lock().await = Some(shared.clone());
        Ok(shared)
    }

    /// Registers a new execution run against the current batch.
    ///
    /// The run slot and the batch lookup are taken in one critical section,
    /// in the same lock order as [`replace_batch`](Self::replace_batch), so
    /// the returned handle is the batch every later request will see until
    /// the run finishes.
    pub async fn start_run(&self) -> WorkflowResult<(SharedBatch, CancellationToken)> {
        let mut running = self.running.lock().await;
        if running.is_some() {
            return Err(WorkflowError::invalid_state(
                "execute_batch",
                "an execution run is already in progress",
            ));
        }
        let batch = self.current_batch().await?;
        let token = CancellationToken::new();
        *running = Some(token.clone());
        Ok((batch, token))
    }

    /// Clears the run slot once a run ended.
    pub async fn finish_run(&self) {
        self.running.lock().await.take();
    }

    /// Cancels the active execution run.
    pub async fn cancel_run(&self) -> WorkflowResult<()> {
        let running = self.running.lock().await;
        match running.as_ref() {
            Some(token) => {
                token.cancel();
                Ok(())
            }
            None => Err(WorkflowError::invalid_state(
                "cancel_execution",
                "no execution run is in progress",
            )),
        }
    }

    /// Returns true while an execution run is active.
    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}
