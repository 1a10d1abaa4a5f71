//! Employee-side pay cycle.
//!
//! [`PayCycle`] is the single owner of one pay period's window controller
//! and submission ledger. Consumers mutate it only through its typed
//! operations and read it through projections such as [`CycleSummary`].

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{
    Adjustment, AdjustmentInput, LeaveRequest, LeaveRequestInput, PayPeriod, SubmissionStatus,
    WindowState, WorkflowEvent,
};

use super::clock::Clock;
use super::ledger::SubmissionLedger;
use super::window::WindowController;

/// Read-only projection of a pay cycle for dashboard views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    /// The pay period.
    pub period: PayPeriod,
    /// Current window state.
    pub window_state: WindowState,
    /// Whether the employee confirmed their pay.
    pub confirmed: bool,
    /// Adjustments in insertion order.
    pub adjustments: Vec<Adjustment>,
    /// Leave requests overlapping the period.
    pub leave_this_period: Vec<LeaveRequest>,
    /// Leave requests outside the period.
    pub leave_upcoming: Vec<LeaveRequest>,
    /// Sum of pending adjustment amounts.
    pub pending_adjustment_total: Decimal,
}

/// One employee's submission lifecycle for one pay period.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use chrono::NaiveDate;
/// use payroll_cycle::models::{LeaveRequestInput, LeaveType, PayPeriod};
/// use payroll_cycle::workflow::{PayCycle, SystemClock};
/// use rust_decimal::Decimal;
///
/// let period = PayPeriod::new(
///     "2026-03",
///     "March 2026",
///     NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
/// )
/// .unwrap();
/// let mut cycle = PayCycle::new(period, Arc::new(SystemClock));
/// cycle.open_window().unwrap();
///
/// let leave = cycle
///     .add_leave_request(LeaveRequestInput {
///         leave_type: LeaveType::Annual,
///         start_date: NaiveDate::from_ymd_opt(2026, 3, 12).unwrap(),
///         end_date: NaiveDate::from_ymd_opt(2026, 3, 13).unwrap(),
///         total_days: Decimal::new(2, 0),
///         reason: None,
///     })
///     .unwrap();
///
/// cycle.withdraw_leave_request(leave.id).unwrap();
/// assert!(cycle.leave_requests().is_empty());
/// ```
pub struct PayCycle {
    period: PayPeriod,
    window: WindowController,
    ledger: SubmissionLedger,
    clock: Arc<dyn Clock>,
    events: Vec<WorkflowEvent>,
}

impl fmt::Debug for PayCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayCycle")
            .field("period", &self.period)
            .field("window", &self.window)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl PayCycle {
    /// Creates a cycle for `period` with its window in `NONE`.
    pub fn new(period: PayPeriod, clock: Arc<dyn Clock>) -> Self {
        Self {
            period,
            window: WindowController::new(),
            ledger: SubmissionLedger::new(),
            clock,
            events: Vec::new(),
        }
    }

    /// The pay period this cycle belongs to.
    pub fn period(&self) -> &PayPeriod {
        &self.period
    }

    /// Current window state.
    pub fn window_state(&self) -> WindowState {
        self.window.state()
    }

    /// Returns true while the window is `OPEN`.
    pub fn is_window_open(&self) -> bool {
        self.window.is_open()
    }

    /// Returns true once pay was confirmed.
    pub fn is_confirmed(&self) -> bool {
        self.window.is_confirmed()
    }

    /// Adjustments in insertion order.
    pub fn adjustments(&self) -> &[Adjustment] {
        self.ledger.adjustments()
    }

    /// Leave requests in insertion order.
    pub fn leave_requests(&self) -> &[LeaveRequest] {
        self.ledger.leave_requests()
    }

    /// Leave requests whose dates overlap the period.
    pub fn leave_this_period(&self) -> Vec<&LeaveRequest> {
        self.ledger
            .leave_requests()
            .iter()
            .filter(|r| self.period.overlaps(r.start_date, r.end_date))
            .collect()
    }

    /// Leave requests that do not overlap the period.
    pub fn leave_upcoming(&self) -> Vec<&LeaveRequest> {
        self.ledger
            .leave_requests()
            .iter()
            .filter(|r| !self.period.overlaps(r.start_date, r.end_date))
            .collect()
    }

    /// Opens the submission window.
    pub fn open_window(&mut self) -> WorkflowResult<()> {
        let event = self.window.open()?;
        self.record(event);
        Ok(())
    }

    /// Closes the submission window.
    pub fn close_window(&mut self) -> WorkflowResult<()> {
        let event = self.window.close()?;
        self.record(event);
        Ok(())
    }

    /// Marks the period as paid. No ledger mutation is legal afterwards.
    pub fn mark_paid(&mut self) -> WorkflowResult<()> {
        let event = self.window.mark_paid()?;
        self.record(event);
        Ok(())
    }

    /// Files a new adjustment. The window must be `OPEN`.
    pub fn add_adjustment(&mut self, input: AdjustmentInput) -> WorkflowResult<Adjustment> {
        self.window.ensure_open("add_adjustment")?;
        let adjustment = self.ledger.add_adjustment(input, self.clock.now())?;

        debug!(
            period = %self.period.id,
            adjustment_id = %adjustment.id,
            adjustment_type = adjustment.adjustment_type.display_name(),
            "Adjustment added"
        );
        self.record(WorkflowEvent::AdjustmentAdded { id: adjustment.id });
        Ok(adjustment)
    }

    /// Files a new leave request. The window must be `OPEN`.
    pub fn add_leave_request(&mut self, input: LeaveRequestInput) -> WorkflowResult<LeaveRequest> {
        self.window.ensure_open("add_leave_request")?;
        let request = self.ledger.add_leave_request(input, self.clock.now())?;

        debug!(
            period = %self.period.id,
            leave_id = %request.id,
            total_days = %request.total_days,
            "Leave request added"
        );
        self.record(WorkflowEvent::LeaveRequested { id: request.id });
        Ok(request)
    }

    /// Withdraws a pending adjustment while the window is `OPEN`.
    pub fn withdraw_adjustment(&mut self, id: Uuid) -> WorkflowResult<Adjustment> {
        self.window.ensure_open("withdraw_adjustment")?;
        let adjustment = self.ledger.withdraw_adjustment(id)?;
        self.record(WorkflowEvent::AdjustmentWithdrawn { id });
        Ok(adjustment)
    }

    /// Withdraws a pending leave request while the window is `OPEN`.
    pub fn withdraw_leave_request(&mut self, id: Uuid) -> WorkflowResult<LeaveRequest> {
        self.window.ensure_open("withdraw_leave_request")?;
        let request = self.ledger.withdraw_leave_request(id)?;
        self.record(WorkflowEvent::LeaveWithdrawn { id });
        Ok(request)
    }

    /// Records an admin decision on a pending adjustment. Illegal once `PAID`.
    pub fn review_adjustment(
        &mut self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> WorkflowResult<Adjustment> {
        self.ensure_reviewable("review_adjustment")?;
        let adjustment = self.ledger.review_adjustment(id, status)?;
        self.record(WorkflowEvent::SubmissionReviewed { id, status });
        Ok(adjustment)
    }

    /// Records an admin decision on a pending leave request. Illegal once `PAID`.
    pub fn review_leave_request(
        &mut self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> WorkflowResult<LeaveRequest> {
        self.ensure_reviewable("review_leave_request")?;
        let request = self.ledger.review_leave_request(id, status)?;
        self.record(WorkflowEvent::SubmissionReviewed { id, status });
        Ok(request)
    }

    /// Confirms pay for the period. Only legal while `OPEN`.
    pub fn confirm_pay(&mut self) -> WorkflowResult<()> {
        self.window.confirm()?;
        info!(period = %self.period.id, "Pay confirmed");
        self.record(WorkflowEvent::PayConfirmed { no_changes: false });
        Ok(())
    }

    /// Confirms pay with nothing filed. Same transition as [`confirm_pay`](Self::confirm_pay).
    pub fn submit_no_changes(&mut self) -> WorkflowResult<()> {
        self.window.ensure_open("submit_no_changes")?;
        if !self.ledger.is_empty() {
            return Err(WorkflowError::invalid_state(
                "submit_no_changes",
                format!("{} submissions are filed this period", self.ledger.len()),
            ));
        }

        self.window.confirm()?;
        info!(period = %self.period.id, "Pay confirmed with no changes");
        self.record(WorkflowEvent::PayConfirmed { no_changes: true });
        Ok(())
    }

    /// Builds the dashboard projection.
    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            period: self.period.clone(),
            window_state: self.window.state(),
            confirmed: self.window.is_confirmed(),
            adjustments: self.ledger.adjustments().to_vec(),
            leave_this_period: self.leave_this_period().into_iter().cloned().collect(),
            leave_upcoming: self.leave_upcoming().into_iter().cloned().collect(),
            pending_adjustment_total: self.ledger.pending_adjustment_total(),
        }
    }

    /// Drains the queued events.
    pub fn take_events(&mut self) -> Vec<WorkflowEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_reviewable(&self, operation: &str) -> WorkflowResult<()> {
        self.window.ensure_not_paid(operation)?;
        if self.window.state() == WindowState::None {
            return Err(WorkflowError::invalid_state(
                operation,
                "window has not been opened",
            ));
        }
        Ok(())
    }

    fn record(&mut self, event: WorkflowEvent) {
        self.events.push(event);
    }
}
