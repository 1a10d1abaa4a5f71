//! Admin-side payroll batch.
//!
//! [`PayrollBatch`] owns the exception engine, approval gate, execution
//! sequencer and reconciliation ledger of one payout, and enforces the
//! strict stage order:
//!
//! ```text
//! FxReview --lock_fx_rates--> Exceptions --advance_to_approval--> Approval
//!     --begin_execution--> Execution --(all complete)--> Reconciliation
//! ```
//!
//! Every stage change requires the clearing condition of the stage before
//! it. Rejected operations leave the batch untouched.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{
    ContractorPayment, PaymentReceipt, PayrollException, RescheduleReason, WorkflowEvent,
};

use super::approval::{Actor, ApprovalGate, ApprovalStatus, ApprovalTimeline};
use super::clock::Clock;
use super::exceptions::{ExceptionEngine, detect_exceptions};
use super::execution::{ExecutionProgress, ExecutionSequencer, ItemStatus};
use super::reconciliation::{ReconciliationLedger, build_receipt, total_fees};

/// Position of the batch in the admin pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    /// FX rates are shown for review and not yet locked.
    FxReview,
    /// Exceptions must be resolved or snoozed.
    Exceptions,
    /// Waiting for approval when it is required.
    Approval,
    /// Payments are being executed.
    Execution,
    /// Every payment completed; receipts can be reconciled.
    Reconciliation,
}

impl fmt::Display for BatchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BatchStage::FxReview => "fx_review",
            BatchStage::Exceptions => "exceptions",
            BatchStage::Approval => "approval",
            BatchStage::Execution => "execution",
            BatchStage::Reconciliation => "reconciliation",
        };
        f.write_str(name)
    }
}

/// Status of one payment in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentLine {
    /// The payee.
    pub payee_id: String,
    /// The payee's name.
    pub name: String,
    /// Amount in the payee's currency.
    pub net_pay: Decimal,
    /// Payout currency.
    pub currency: String,
    /// Execution status; pending until execution begins.
    pub status: ItemStatus,
}

/// Read-only projection of a batch for admin views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Batch identifier.
    pub id: String,
    /// Scheduled payout date.
    pub pay_date: NaiveDate,
    /// Current stage.
    pub stage: BatchStage,
    /// When FX rates were locked.
    pub fx_locked_at: Option<DateTime<Utc>>,
    /// Payments in execution order.
    pub payments: Vec<PaymentLine>,
    /// Active exceptions in display order.
    pub active_exceptions: Vec<PayrollException>,
    /// Every exception, including resolved and snoozed ones.
    pub exceptions: Vec<PayrollException>,
    /// Whether elevated approval is required.
    pub requires_approval: bool,
    /// Employee cost base compared against the threshold.
    pub employee_total_cost: Decimal,
    /// Approval threshold.
    pub approval_threshold: Decimal,
    /// Approval display status.
    pub approval_status: ApprovalStatus,
    /// Approval timestamps.
    pub approval_timeline: ApprovalTimeline,
    /// Whether execution may begin now.
    pub can_execute: bool,
    /// Execution counts once execution began.
    pub progress: Option<ExecutionProgress>,
    /// Receipts of completed payments.
    pub receipts: Vec<PaymentReceipt>,
    /// FX and processing fees across the receipts.
    pub total_fees: Decimal,
}

/// One payout batch moving through the admin pipeline.
pub struct PayrollBatch {
    id: String,
    pay_date: NaiveDate,
    config: Arc<WorkflowConfig>,
    clock: Arc<dyn Clock>,
    stage: BatchStage,
    fx_locked_at: Option<DateTime<Utc>>,
    payments: Vec<ContractorPayment>,
    exceptions: ExceptionEngine,
    approval: ApprovalGate,
    execution: Option<ExecutionSequencer>,
    reconciliation: ReconciliationLedger,
    events: Vec<WorkflowEvent>,
}

impl fmt::Debug for PayrollBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayrollBatch")
            .field("id", &self.id)
            .field("pay_date", &self.pay_date)
            .field("stage", &self.stage)
            .field("payments", &self.payments.len())
            .field("exceptions", &self.exceptions)
            .field("approval", &self.approval)
            .finish_non_exhaustive()
    }
}

impl PayrollBatch {
    /// Creates a batch in the `FxReview` stage.
    ///
    /// Payment ids must be unique and every exception must reference one
    /// of the payments. The approval requirement is evaluated here, since
    /// the payment list never changes afterwards.
    pub fn new(
        id: impl Into<String>,
        pay_date: NaiveDate,
        payments: Vec<ContractorPayment>,
        exceptions: Vec<PayrollException>,
        config: Arc<WorkflowConfig>,
        clock: Arc<dyn Clock>,
    ) -> WorkflowResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(WorkflowError::validation("id", "batch id must not be empty"));
        }
        if payments.is_empty() {
            return Err(WorkflowError::validation(
                "payments",
                "a batch needs at least one payment",
            ));
        }

        let mut payee_ids = HashSet::new();
        for payment in &payments {
            if !payee_ids.insert(payment.id.as_str()) {
                return Err(WorkflowError::validation(
                    "payments",
                    format!("duplicate payment id '{}'", payment.id),
                ));
            }
            if payment.net_pay <= Decimal::ZERO {
                return Err(WorkflowError::validation(
                    "net_pay",
                    format!("payment '{}' must have a positive net pay", payment.id),
                ));
            }
            if payment.est_fees < Decimal::ZERO || payment.fx_rate <= Decimal::ZERO {
                return Err(WorkflowError::validation(
                    "payments",
                    format!("payment '{}' has a negative fee or non-positive FX rate", payment.id),
                ));
            }
        }
        if let Some(orphan) = exceptions
            .iter()
            .find(|e| !payee_ids.contains(e.contractor_id.as_str()))
        {
            return Err(WorkflowError::validation(
                "exceptions",
                format!(
                    "exception '{}' references unknown payee '{}'",
                    orphan.id, orphan.contractor_id
                ),
            ));
        }

        let exceptions = ExceptionEngine::new(exceptions)?;
        let approval = ApprovalGate::evaluate(&payments, config.approval_threshold());

        info!(
            batch_id = %id,
            %pay_date,
            payments = payments.len(),
            exceptions = exceptions.all().len(),
            requires_approval = approval.requires_approval(),
            "Payroll batch created"
        );

        Ok(Self {
            id,
            pay_date,
            config,
            clock,
            stage: BatchStage::FxReview,
            fx_locked_at: None,
            payments,
            exceptions,
            approval,
            execution: None,
            reconciliation: ReconciliationLedger::new(),
            events: Vec::new(),
        })
    }

    /// Creates a batch whose exceptions are derived from the payments.
    pub fn with_detected_exceptions(
        id: impl Into<String>,
        pay_date: NaiveDate,
        payments: Vec<ContractorPayment>,
        config: Arc<WorkflowConfig>,
        clock: Arc<dyn Clock>,
    ) -> WorkflowResult<Self> {
        let exceptions = detect_exceptions(&payments, pay_date, &config);
        Self::new(id, pay_date, payments, exceptions, config, clock)
    }

    /// Batch identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Scheduled payout date.
    pub fn pay_date(&self) -> NaiveDate {
        self.pay_date
    }

    /// Current stage.
    pub fn stage(&self) -> BatchStage {
        self.stage
    }

    /// Payments in execution order.
    pub fn payments(&self) -> &[ContractorPayment] {
        &self.payments
    }

    /// The exception engine.
    pub fn exceptions(&self) -> &ExceptionEngine {
        &self.exceptions
    }

    /// The approval gate.
    pub fn approval(&self) -> &ApprovalGate {
        &self.approval
    }

    /// The execution sequencer, once execution began.
    pub fn execution(&self) -> Option<&ExecutionSequencer> {
        self.execution.as_ref()
    }

    /// The reconciliation ledger.
    pub fn reconciliation(&self) -> &ReconciliationLedger {
        &self.reconciliation
    }

    /// `FxReview → Exceptions`: locks the displayed FX rates.
    pub fn lock_fx_rates(&mut self) -> WorkflowResult<()> {
        self.expect_stage("lock_fx_rates", BatchStage::FxReview)?;
        self.fx_locked_at = Some(self.clock.now());
        self.enter(BatchStage::Exceptions);
        self.record(WorkflowEvent::FxRatesLocked);
        Ok(())
    }

    /// Resolves an exception. Only legal before execution begins.
    pub fn resolve_exception(&mut self, id: &str) -> WorkflowResult<PayrollException> {
        self.ensure_before_execution("resolve_exception")?;
        let exception = self.exceptions.resolve(id)?.clone();
        self.record(WorkflowEvent::ExceptionResolved {
            id: exception.id.clone(),
            exception_type: exception.exception_type,
        });
        Ok(exception)
    }

    /// Snoozes an exception. Only legal before execution begins.
    pub fn snooze_exception(&mut self, id: &str) -> WorkflowResult<PayrollException> {
        self.ensure_before_execution("snooze_exception")?;
        let exception = self.exceptions.snooze(id)?.clone();
        self.record(WorkflowEvent::ExceptionSnoozed {
            id: exception.id.clone(),
            exception_type: exception.exception_type,
        });
        Ok(exception)
    }

    /// `Exceptions → Approval`: requires zero active exceptions.
    pub fn advance_to_approval(&mut self) -> WorkflowResult<()> {
        self.expect_stage("advance_to_approval", BatchStage::Exceptions)?;
        let active = self.exceptions.active_count();
        if active > 0 {
            return Err(WorkflowError::invalid_state(
                "advance_to_approval",
                format!("{} exceptions are still active", active),
            ));
        }

        self.enter(BatchStage::Approval);
        self.record(WorkflowEvent::ApprovalStageEntered {
            requires_approval: self.approval.requires_approval(),
        });
        Ok(())
    }

    /// Sends the batch to the approver.
    pub fn request_approval(&mut self) -> WorkflowResult<()> {
        self.expect_stage("request_approval", BatchStage::Approval)?;
        self.approval.request_approval(self.clock.now())?;
        self.record(WorkflowEvent::ApprovalRequested);
        Ok(())
    }

    /// Records that the approver opened the request.
    pub fn mark_approval_viewed(&mut self) -> WorkflowResult<()> {
        self.expect_stage("mark_approval_viewed", BatchStage::Approval)?;
        self.approval.mark_viewed(self.clock.now())?;
        self.record(WorkflowEvent::ApprovalViewed);
        Ok(())
    }

    /// Approves the batch through the normal timeline.
    pub fn approve(&mut self) -> WorkflowResult<()> {
        self.expect_stage("approve", BatchStage::Approval)?;
        self.approval.approve(self.clock.now())?;
        info!(batch_id = %self.id, "Batch approved");
        self.record(WorkflowEvent::Approved);
        Ok(())
    }

    /// Approves the batch directly. `actor` must be an admin.
    pub fn admin_override(&mut self, actor: &Actor) -> WorkflowResult<()> {
        self.expect_stage("admin_override", BatchStage::Approval)?;
        self.approval.admin_override(actor, self.clock.now())?;
        info!(batch_id = %self.id, actor = %actor.name, "Batch approval overridden");
        self.record(WorkflowEvent::ApprovalOverridden {
            actor: actor.name.clone(),
        });
        Ok(())
    }

    /// Returns true when execution may begin now.
    pub fn can_execute(&self) -> bool {
        self.stage == BatchStage::Approval
            && self.exceptions.is_clear()
            && self.approval.is_cleared()
    }

    /// `Approval → Execution`: queues every payment as pending.
    pub fn begin_execution(&mut self) -> WorkflowResult<()> {
        self.expect_stage("begin_execution", BatchStage::Approval)?;
        if !self.exceptions.is_clear() {
            return Err(WorkflowError::invalid_state(
                "begin_execution",
                format!("{} exceptions are still active", self.exceptions.active_count()),
            ));
        }
        if !self.approval.is_cleared() {
            return Err(WorkflowError::invalid_state(
                "begin_execution",
                "approval is required and has not been given",
            ));
        }

        self.execution = Some(ExecutionSequencer::new(self.payments.clone()));
        self.enter(BatchStage::Execution);
        self.record(WorkflowEvent::ExecutionStarted {
            payments: self.payments.len(),
        });
        Ok(())
    }

    /// Starts the next pending payment and returns it.
    ///
    /// Returns `Ok(None)` when no payment is pending.
    pub fn start_next_payment(&mut self) -> WorkflowResult<Option<ContractorPayment>> {
        let now = self.clock.now();
        let sequencer = self.sequencer_mut("start_next_payment")?;
        let Some(item) = sequencer.begin_next(now)? else {
            return Ok(None);
        };

        let payment = item.payment.clone();
        self.record(WorkflowEvent::PaymentProcessing {
            payee_id: payment.id.clone(),
        });
        Ok(Some(payment))
    }

    /// Completes the processing payment and records its receipt.
    ///
    /// Completing the last payment moves the batch to `Reconciliation`.
    pub fn complete_current_payment(&mut self) -> WorkflowResult<PaymentReceipt> {
        let now = self.clock.now();
        let reference = format!("PAY-{}-{:03}", self.id, self.reconciliation.len() + 1);

        let sequencer = self.sequencer_mut("complete_current_payment")?;
        let payment = sequencer.complete_current(now)?.payment.clone();
        let all_done = sequencer.is_complete();

        let receipt = build_receipt(&payment, reference, now, &self.config);
        let receipt = self.reconciliation.record(receipt)?.clone();
        self.record(WorkflowEvent::PaymentCompleted {
            payee_id: receipt.payee_id.clone(),
            reference: receipt.reference.clone(),
        });

        if all_done {
            self.enter(BatchStage::Reconciliation);
            info!(batch_id = %self.id, receipts = self.reconciliation.len(), "Batch completed");
            self.record(WorkflowEvent::BatchCompleted);
        }
        Ok(receipt)
    }

    /// Returns the processing payment to pending.
    pub fn requeue_current_payment(&mut self) -> WorkflowResult<ContractorPayment> {
        let sequencer = self.sequencer_mut("requeue_current_payment")?;
        let payment = sequencer.requeue_current()?.payment.clone();
        self.record(WorkflowEvent::PaymentRequeued {
            payee_id: payment.id.clone(),
        });
        Ok(payment)
    }

    /// Moves the ETA of a payee's receipt.
    pub fn reschedule_receipt(
        &mut self,
        payee_id: &str,
        new_date: NaiveDate,
        reason: RescheduleReason,
        notify: bool,
    ) -> WorkflowResult<PaymentReceipt> {
        let today = self.clock.today();
        let receipt = self
            .reconciliation
            .reschedule(payee_id, new_date, reason, today)?
            .clone();
        self.record(WorkflowEvent::ReceiptRescheduled {
            payee_id: receipt.payee_id.clone(),
            eta: receipt.eta,
            reason,
            notify,
        });
        Ok(receipt)
    }

    /// Renders the receipts as CSV.
    pub fn export_csv(&self) -> WorkflowResult<String> {
        self.reconciliation.export_csv()
    }

    /// Builds the admin projection.
    pub fn summary(&self) -> BatchSummary {
        let payments = self
            .payments
            .iter()
            .enumerate()
            .map(|(i, payment)| PaymentLine {
                payee_id: payment.id.clone(),
                name: payment.name.clone(),
                net_pay: payment.net_pay,
                currency: payment.currency.clone(),
                status: self
                    .execution
                    .as_ref()
                    .map_or(ItemStatus::Pending, |s| s.items()[i].status),
            })
            .collect();

        BatchSummary {
            id: self.id.clone(),
            pay_date: self.pay_date,
            stage: self.stage,
            fx_locked_at: self.fx_locked_at,
            payments,
            active_exceptions: self
                .exceptions
                .active_for_display(&self.config)
                .into_iter()
                .cloned()
                .collect(),
            exceptions: self.exceptions.all().to_vec(),
            requires_approval: self.approval.requires_approval(),
            employee_total_cost: self.approval.employee_total_cost(),
            approval_threshold: self.approval.threshold(),
            approval_status: self.approval.status(),
            approval_timeline: self.approval.timeline().clone(),
            can_execute: self.can_execute(),
            progress: self.execution.as_ref().map(ExecutionSequencer::progress),
            receipts: self.reconciliation.receipts().to_vec(),
            total_fees: total_fees(self.reconciliation.receipts()),
        }
    }

    /// Drains the queued events.
    pub fn take_events(&mut self) -> Vec<WorkflowEvent> {
        std::mem::take(&mut self.events)
    }

    fn expect_stage(&self, operation: &str, expected: BatchStage) -> WorkflowResult<()> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(WorkflowError::invalid_state(
                operation,
                format!("batch is in {}, expected {}", self.stage, expected),
            ))
        }
    }

    fn ensure_before_execution(&self, operation: &str) -> WorkflowResult<()> {
        if self.stage >= BatchStage::Execution {
            return Err(WorkflowError::invalid_state(
                operation,
                format!("batch is already in {}", self.stage),
            ));
        }
        Ok(())
    }

    fn sequencer_mut(&mut self, operation: &str) -> WorkflowResult<&mut ExecutionSequencer> {
        if self.stage != BatchStage::Execution {
            return Err(WorkflowError::invalid_state(
                operation,
                format!("batch is in {}, expected execution", self.stage),
            ));
        }
        self.execution
            .as_mut()
            .ok_or_else(|| WorkflowError::invalid_state(operation, "execution has not begun"))
    }

    fn enter(&mut self, stage: BatchStage) {
        debug!(batch_id = %self.id, from = %self.stage, to = %stage, "Batch stage changed");
        self.stage = stage;
    }

    fn record(&mut self, event: WorkflowEvent) {
        self.events.push(event);
    }
}
