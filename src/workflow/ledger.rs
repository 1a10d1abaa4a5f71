//! Submission ledger.
//!
//! Holds the adjustments and leave requests filed against one pay period,
//! in insertion order. The ledger validates input and enforces the status
//! rules; window gating is applied by [`PayCycle`](super::PayCycle) before
//! any ledger call.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{
    Adjustment, AdjustmentInput, AdjustmentType, LeaveRequest, LeaveRequestInput, LeaveType,
    SubmissionStatus,
};

/// Smallest leave request accepted, in days.
pub const MIN_LEAVE_DAYS: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Validates an adjustment before it is filed.
///
/// # Rules
///
/// - `description` must not be blank
/// - Overtime carries positive `hours` and no `amount`
/// - Expense and Bonus carry a positive `amount`
/// - Correction carries a non-zero `amount` (negative corrections claw back pay)
///
/// # Example
///
/// ```
/// use payroll_cycle::models::{AdjustmentInput, AdjustmentType};
/// use payroll_cycle::workflow::validate_adjustment;
/// use rust_decimal::Decimal;
///
/// let input = AdjustmentInput {
///     adjustment_type: AdjustmentType::Bonus,
///     label: String::new(),
///     amount: Some(Decimal::new(-100, 0)),
///     description: "Spot bonus".to_string(),
///     hours: None,
///     receipt_ref: None,
/// };
/// assert!(validate_adjustment(&input).is_err());
/// ```
pub fn validate_adjustment(input: &AdjustmentInput) -> WorkflowResult<()> {
    if input.description.trim().is_empty() {
        return Err(WorkflowError::validation("description", "is required"));
    }

    match input.adjustment_type {
        AdjustmentType::Overtime => {
            if input.amount.is_some() {
                return Err(WorkflowError::validation(
                    "amount",
                    "overtime is valued from hours and must not carry an amount",
                ));
            }
            match input.hours {
                Some(hours) if hours > Decimal::ZERO => Ok(()),
                Some(hours) => Err(WorkflowError::validation(
                    "hours",
                    format!("must be positive, got {}", hours),
                )),
                None => Err(WorkflowError::validation(
                    "hours",
                    "is required for overtime",
                )),
            }
        }
        AdjustmentType::Expense | AdjustmentType::Bonus => match input.amount {
            Some(amount) if amount > Decimal::ZERO => Ok(()),
            Some(amount) => Err(WorkflowError::validation(
                "amount",
                format!("must be positive, got {}", amount),
            )),
            None => Err(WorkflowError::validation("amount", "is required")),
        },
        AdjustmentType::Correction => match input.amount {
            Some(amount) if !amount.is_zero() => Ok(()),
            Some(_) => Err(WorkflowError::validation("amount", "must not be zero")),
            None => Err(WorkflowError::validation("amount", "is required")),
        },
    }
}

/// Validates a leave request before it is filed.
///
/// # Rules
///
/// - `end_date` is not before `start_date`
/// - `total_days` is at least 0.5, in half-day steps, and fits in the date range
/// - [`LeaveType::Other`] carries a non-blank reason
pub fn validate_leave_request(input: &LeaveRequestInput) -> WorkflowResult<()> {
    if input.end_date < input.start_date {
        return Err(WorkflowError::validation(
            "end_date",
            format!(
                "{} is before start date {}",
                input.end_date, input.start_date
            ),
        ));
    }

    if input.total_days < MIN_LEAVE_DAYS {
        return Err(WorkflowError::validation(
            "total_days",
            format!("must be at least {}, got {}", MIN_LEAVE_DAYS, input.total_days),
        ));
    }

    if !(input.total_days * Decimal::TWO).fract().is_zero() {
        return Err(WorkflowError::validation(
            "total_days",
            format!("must be in half-day increments, got {}", input.total_days),
        ));
    }

    let calendar_days = Decimal::from((input.end_date - input.start_date).num_days() + 1);
    if input.total_days > calendar_days {
        return Err(WorkflowError::validation(
            "total_days",
            format!(
                "{} days do not fit between {} and {}",
                input.total_days, input.start_date, input.end_date
            ),
        ));
    }

    if input.leave_type == LeaveType::Other
        && input
            .reason
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .is_empty()
    {
        return Err(WorkflowError::validation(
            "reason",
            "is required for other leave",
        ));
    }

    Ok(())
}

/// Insertion-ordered store of one period's submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionLedger {
    adjustments: Vec<Adjustment>,
    leave_requests: Vec<LeaveRequest>,
}

impl SubmissionLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjustments in insertion order.
    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    /// Leave requests in insertion order.
    pub fn leave_requests(&self) -> &[LeaveRequest] {
        &self.leave_requests
    }

    /// Returns true if nothing has been filed.
    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty() && self.leave_requests.is_empty()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.adjustments.len() + self.leave_requests.len()
    }

    /// Validates and appends a new `Pending` adjustment.
    ///
    /// Duplicates of the same type are accepted.
    pub fn add_adjustment(
        &mut self,
        input: AdjustmentInput,
        submitted_at: DateTime<Utc>,
    ) -> WorkflowResult<Adjustment> {
        validate_adjustment(&input)?;

        let label = if input.label.trim().is_empty() {
            input.adjustment_type.display_name().to_string()
        } else {
            input.label
        };

        let adjustment = Adjustment {
            id: Uuid::new_v4(),
            adjustment_type: input.adjustment_type,
            label,
            amount: input.amount,
            description: input.description,
            status: SubmissionStatus::Pending,
            hours: input.hours,
            receipt_ref: input.receipt_ref,
            submitted_at,
        };
        self.adjustments.push(adjustment.clone());
        Ok(adjustment)
    }

    /// Validates and appends a new `Pending` leave request.
    pub fn add_leave_request(
        &mut self,
        input: LeaveRequestInput,
        submitted_at: DateTime<Utc>,
    ) -> WorkflowResult<LeaveRequest> {
        validate_leave_request(&input)?;

        let request = LeaveRequest {
            id: Uuid::new_v4(),
            leave_type: input.leave_type,
            start_date: input.start_date,
            end_date: input.end_date,
            total_days: input.total_days,
            status: SubmissionStatus::Pending,
            reason: input.reason,
            submitted_at,
        };
        self.leave_requests.push(request.clone());
        Ok(request)
    }

    /// Removes a `Pending` adjustment.
    pub fn withdraw_adjustment(&mut self, id: Uuid) -> WorkflowResult<Adjustment> {
        let index = self
            .adjustments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| WorkflowError::not_found("Adjustment", id))?;
        ensure_pending("withdraw_adjustment", self.adjustments[index].status)?;
        Ok(self.adjustments.remove(index))
    }

    /// Removes a `Pending` leave request.
    pub fn withdraw_leave_request(&mut self, id: Uuid) -> WorkflowResult<LeaveRequest> {
        let index = self
            .leave_requests
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| WorkflowError::not_found("Leave request", id))?;
        ensure_pending("withdraw_leave_request", self.leave_requests[index].status)?;
        Ok(self.leave_requests.remove(index))
    }

    /// Records an admin decision on a `Pending` adjustment.
    pub fn review_adjustment(
        &mut self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> WorkflowResult<Adjustment> {
        ensure_decision(status)?;
        let adjustment = self
            .adjustments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| WorkflowError::not_found("Adjustment", id))?;
        ensure_pending("review_adjustment", adjustment.status)?;
        adjustment.status = status;
        Ok(adjustment.clone())
    }

    /// Records an admin decision on a `Pending` leave request.
    pub fn review_leave_request(
        &mut self,
        id: Uuid,
        status: SubmissionStatus,
    ) -> WorkflowResult<LeaveRequest> {
        ensure_decision(status)?;
        let request = self
            .leave_requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| WorkflowError::not_found("Leave request", id))?;
        ensure_pending("review_leave_request", request.status)?;
        request.status = status;
        Ok(request.clone())
    }

    /// Sum of amounts on pending adjustments (overtime contributes nothing).
    pub fn pending_adjustment_total(&self) -> Decimal {
        self.adjustments
            .iter()
            .filter(|a| a.status.is_pending())
            .filter_map(|a| a.amount)
            .sum()
    }
}

fn ensure_pending(operation: &str, status: SubmissionStatus) -> WorkflowResult<()> {
    if status.is_pending() {
        Ok(())
    } else {
        Err(WorkflowError::invalid_state(
            operation,
            format!("status is '{}', expected 'Pending'", status),
        ))
    }
}

fn ensure_decision(status: SubmissionStatus) -> WorkflowResult<()> {
    if status.is_pending() {
        Err(WorkflowError::validation(
            "status",
            "a review decision cannot be 'Pending'",
        ))
    } else {
        Ok(())
    }
}
