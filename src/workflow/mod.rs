//! Payroll cycle workflow.
//!
//! The employee side is a [`PayCycle`]: one pay period's window controller
//! and submission ledger. The admin side is a [`PayrollBatch`]: exception
//! engine, approval gate, execution sequencer and reconciliation ledger in
//! a strictly ordered pipeline. Both are single-owner stores mutated through
//! `&mut self`; the async [`runner`] functions drive the batch's suspension
//! points through a shared `tokio::sync::Mutex`.

pub mod approval;
pub mod batch;
pub mod clock;
pub mod cycle;
pub mod exceptions;
pub mod execution;
pub mod latency;
pub mod ledger;
pub mod reconciliation;
pub mod runner;
mod scenarios;
pub mod window;

pub use approval::{
    Actor, ApprovalGate, ApprovalStatus, ApprovalTimeline, Role, employee_total_cost,
    requires_approval,
};
pub use batch::{BatchStage, BatchSummary, PaymentLine, PayrollBatch};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cycle::{CycleSummary, PayCycle};
pub use exceptions::{ExceptionEngine, detect_exceptions};
pub use execution::{ExecutionItem, ExecutionProgress, ExecutionSequencer, ItemStatus};
pub use latency::{FixedLatency, Latency, NoLatency, RandomLatency};
pub use ledger::{MIN_LEAVE_DAYS, SubmissionLedger, validate_adjustment, validate_leave_request};
pub use reconciliation::{CSV_HEADERS, ReconciliationLedger, build_receipt, total_fees};
pub use runner::{ExecutionOutcome, execute_batch, mark_viewed_after};
pub use window::WindowController;
