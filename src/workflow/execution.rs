//! Execution sequencer.
//!
//! Pays a fixed list of payments strictly one after another. Each item moves
//! `pending → processing → complete`, and the next item may only start once
//! the previous one completed. The sequencer holds no timers; the runner
//! awaits latency between [`ExecutionSequencer::begin_next`] and
//! [`ExecutionSequencer::complete_current`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::ContractorPayment;

/// Progress of one payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting its turn.
    Pending,
    /// Awaiting the bank round-trip.
    Processing,
    /// Done.
    Complete,
}

/// One payment in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionItem {
    /// The payment.
    pub payment: ContractorPayment,
    /// Current status.
    pub status: ItemStatus,
    /// When processing started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the payment completed.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Counts per status. `pending + processing + complete == total` always.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionProgress {
    /// Items not started.
    pub pending: usize,
    /// Items in flight (0 or 1).
    pub processing: usize,
    /// Items done.
    pub complete: usize,
    /// All items.
    pub total: usize,
}

/// Sequential runner state for one batch.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use payroll_cycle::workflow::ExecutionSequencer;
///
/// let mut sequencer = ExecutionSequencer::new(vec![]);
/// assert!(sequencer.is_complete());
/// assert!(sequencer.begin_next(Utc::now()).unwrap().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSequencer {
    items: Vec<ExecutionItem>,
}

impl ExecutionSequencer {
    /// Queues payments in input order.
    pub fn new(payments: Vec<ContractorPayment>) -> Self {
        let items = payments
            .into_iter()
            .map(|payment| ExecutionItem {
                payment,
                status: ItemStatus::Pending,
                started_at: None,
                completed_at: None,
            })
            .collect();
        Self { items }
    }

    /// Items in input order.
    pub fn items(&self) -> &[ExecutionItem] {
        &self.items
    }

    /// Counts per status.
    pub fn progress(&self) -> ExecutionProgress {
        let mut progress = ExecutionProgress {
            total: self.items.len(),
            ..ExecutionProgress::default()
        };
        for item in &self.items {
            match item.status {
                ItemStatus::Pending => progress.pending += 1,
                ItemStatus::Processing => progress.processing += 1,
                ItemStatus::Complete => progress.complete += 1,
            }
        }
        progress
    }

    /// Returns true when every item is complete.
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|i| i.status == ItemStatus::Complete)
    }

    /// The item currently processing.
    pub fn current(&self) -> Option<&ExecutionItem> {
        self.items.iter().find(|i| i.status == ItemStatus::Processing)
    }

    /// Starts the first pending item.
    ///
    /// Returns `Ok(None)` when nothing is left. Fails while another item is
    /// still processing.
    pub fn begin_next(&mut self, at: DateTime<Utc>) -> WorkflowResult<Option<&ExecutionItem>> {
        if let Some(current) = self.current() {
            return Err(WorkflowError::invalid_state(
                "begin_next",
                format!("payment '{}' is still processing", current.payment.id),
            ));
        }

        let Some(item) = self
            .items
            .iter_mut()
            .find(|i| i.status == ItemStatus::Pending)
        else {
            return Ok(None);
        };

        item.status = ItemStatus::Processing;
        item.started_at = Some(at);
        debug!(payee_id = %item.payment.id, "Payment processing");
        Ok(Some(item))
    }

    /// Completes the processing item.
    pub fn complete_current(&mut self, at: DateTime<Utc>) -> WorkflowResult<&ExecutionItem> {
        let item = self.processing_mut("complete_current")?;
        item.status = ItemStatus::Complete;
        item.completed_at = Some(at);
        debug!(payee_id = %item.payment.id, "Payment complete");
        Ok(item)
    }

    /// Returns the processing item to pending so a later run retakes it.
    pub fn requeue_current(&mut self) -> WorkflowResult<&ExecutionItem> {
        let item = self.processing_mut("requeue_current")?;
        item.status = ItemStatus::Pending;
        item.started_at = None;
        debug!(payee_id = %item.payment.id, "Payment requeued");
        Ok(item)
    }

    fn processing_mut(&mut self, operation: &str) -> WorkflowResult<&mut ExecutionItem> {
        self.items
            .iter_mut()
            .find(|i| i.status == ItemStatus::Processing)
            .ok_or_else(|| WorkflowError::invalid_state(operation, "no payment is processing"))
    }
}
