//! Async drivers for the batch's suspension points.
//!
//! The runner never holds the batch lock across an await: it locks to move a
//! payment into `processing`, releases the lock while the latency elapses,
//! then locks again to complete it. Readers therefore see the mid-run state
//! of the sequencer, with exactly one payment processing.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::WorkflowResult;
use crate::models::PaymentReceipt;

use super::approval::ApprovalStatus;
use super::batch::{BatchStage, PayrollBatch};
use super::latency::Latency;

/// How an execution run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Every payment completed; receipts in execution order.
    Completed {
        /// Receipts produced by this run.
        receipts: Vec<PaymentReceipt>,
    },
    /// The token was cancelled; the in-flight payment went back to pending.
    Cancelled {
        /// Payments completed by this run.
        completed: usize,
        /// Payments still pending.
        remaining: usize,
    },
}

/// Executes every pending payment of `batch` in order.
///
/// Begins execution when the batch is still in `Approval`, and resumes a
/// previously cancelled run when it is already in `Execution`. A
/// cancellation observed while a payment awaits its latency returns that
/// payment to pending.
pub async fn execute_batch(
    batch: &Mutex<PayrollBatch>,
    latency: &dyn Latency,
    cancel: &CancellationToken,
) -> WorkflowResult<ExecutionOutcome> {
    {
        let mut guard = batch.lock().await;
        if guard.stage() == BatchStage::Approval {
            guard.begin_execution()?;
        }
        info!(batch_id = %guard.id(), payments = guard.payments().len(), "Execution run started");
    }

    let mut receipts = Vec::new();
    loop {
        let next = batch.lock().await.start_next_payment()?;
        let Some(payment) = next else {
            break;
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                let mut guard = batch.lock().await;
                guard.requeue_current_payment()?;
                let remaining = guard
                    .execution()
                    .map_or(0, |s| s.progress().pending);
                info!(
                    batch_id = %guard.id(),
                    payee_id = %payment.id,
                    completed = receipts.len(),
                    remaining,
                    "Execution run cancelled"
                );
                return Ok(ExecutionOutcome::Cancelled {
                    completed: receipts.len(),
                    remaining,
                });
            }
            _ = latency.wait(&payment) => {
                let mut guard = batch.lock().await;
                let receipt = guard.complete_current_payment()?;
                debug!(payee_id = %receipt.payee_id, reference = %receipt.reference, "Payment settled");
                receipts.push(receipt);
                if guard.stage() == BatchStage::Reconciliation {
                    break;
                }
            }
        }
    }

    info!(receipts = receipts.len(), "Execution run completed");
    Ok(ExecutionOutcome::Completed { receipts })
}

/// Marks a requested approval as viewed once `delay` elapsed.
///
/// Stands in for the approver opening the request. If the approval moved on
/// in the meantime (for example through an admin override) the view is
/// skipped.
pub async fn mark_viewed_after(batch: &Mutex<PayrollBatch>, delay: Duration) -> WorkflowResult<bool> {
    tokio::time::sleep(delay).await;
    let mut guard = batch.lock().await;
    if guard.approval().status() != ApprovalStatus::Requested {
        debug!(batch_id = %guard.id(), "Approval no longer awaiting view");
        return Ok(false);
    }
    guard.mark_approval_viewed()?;
    Ok(true)
}
