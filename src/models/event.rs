//! Workflow events.
//!
//! Every mutating operation records a [`WorkflowEvent`]. The stores queue
//! them and callers drain the queue to notify users or write logs; the
//! state machines themselves have no side effects.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ExceptionType, RescheduleReason, SubmissionStatus, WindowState};

/// A state change reported by the payroll cycle or batch stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEvent {
    /// The pay period window moved forward.
    WindowTransitioned {
        /// Previous state.
        from: WindowState,
        /// New state.
        to: WindowState,
    },
    /// An adjustment was filed.
    AdjustmentAdded {
        /// The new adjustment.
        id: Uuid,
    },
    /// A pending adjustment was withdrawn.
    AdjustmentWithdrawn {
        /// The removed adjustment.
        id: Uuid,
    },
    /// A leave request was filed.
    LeaveRequested {
        /// The new leave request.
        id: Uuid,
    },
    /// A pending leave request was withdrawn.
    LeaveWithdrawn {
        /// The removed leave request.
        id: Uuid,
    },
    /// An admin decided on a submission.
    SubmissionReviewed {
        /// The reviewed adjustment or leave request.
        id: Uuid,
        /// The decision.
        status: SubmissionStatus,
    },
    /// The employee confirmed their pay for the period.
    PayConfirmed {
        /// True when confirmed through the no-changes fast path.
        no_changes: bool,
    },
    /// Batch FX rates were locked and review is complete.
    FxRatesLocked,
    /// An exception was resolved.
    ExceptionResolved {
        /// The exception.
        id: String,
        /// Its type.
        exception_type: ExceptionType,
    },
    /// An exception was snoozed.
    ExceptionSnoozed {
        /// The exception.
        id: String,
        /// Its type.
        exception_type: ExceptionType,
    },
    /// The batch cleared exceptions and entered approval.
    ApprovalStageEntered {
        /// Whether elevated approval is needed.
        requires_approval: bool,
    },
    /// Elevated approval was requested.
    ApprovalRequested,
    /// The approver opened the request.
    ApprovalViewed,
    /// The approver approved the batch.
    Approved,
    /// An admin approved the batch directly.
    ApprovalOverridden {
        /// The admin who overrode.
        actor: String,
    },
    /// The batch entered execution.
    ExecutionStarted {
        /// Number of payments queued.
        payments: usize,
    },
    /// A payment started processing.
    PaymentProcessing {
        /// The payee.
        payee_id: String,
    },
    /// A payment completed and produced a receipt.
    PaymentCompleted {
        /// The payee.
        payee_id: String,
        /// The receipt reference.
        reference: String,
    },
    /// A processing payment was returned to pending after cancellation.
    PaymentRequeued {
        /// The payee.
        payee_id: String,
    },
    /// Every payment completed; reconciliation is unlocked.
    BatchCompleted,
    /// A receipt's ETA moved.
    ReceiptRescheduled {
        /// The payee.
        payee_id: String,
        /// New expected settlement date.
        eta: NaiveDate,
        /// Why it moved.
        reason: RescheduleReason,
        /// Whether the payee should be notified.
        notify: bool,
    },
}
