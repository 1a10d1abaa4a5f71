//! Employee submission models.
//!
//! This module defines the [`Adjustment`] and [`LeaveRequest`] entries an
//! employee files against a pay period, the [`SubmissionStatus`] they share,
//! and the input types used to create them.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review status shared by adjustments and leave requests.
///
/// Only `Pending` entries can be withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Filed and awaiting an admin decision.
    #[serde(rename = "Pending")]
    Pending,
    /// Accepted by an admin for this cycle.
    #[serde(rename = "Admin approved")]
    AdminApproved,
    /// Declined by an admin.
    #[serde(rename = "Admin rejected")]
    AdminRejected,
    /// Accepted but deferred to the next pay cycle.
    #[serde(rename = "Queued for next cycle")]
    QueuedForNextCycle,
}

impl SubmissionStatus {
    /// Returns true if the entry is still awaiting review.
    pub fn is_pending(self) -> bool {
        self == SubmissionStatus::Pending
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::AdminApproved => "Admin approved",
            SubmissionStatus::AdminRejected => "Admin rejected",
            SubmissionStatus::QueuedForNextCycle => "Queued for next cycle",
        };
        f.write_str(label)
    }
}

/// The kind of pay change an adjustment requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdjustmentType {
    /// Reimbursement of an out-of-pocket expense.
    Expense,
    /// Extra hours worked; valued from hours, not an amount.
    Overtime,
    /// One-off bonus payment.
    Bonus,
    /// Correction of a previous pay run (may be negative).
    Correction,
}

impl AdjustmentType {
    /// The label used when the employee leaves the label empty.
    pub fn display_name(self) -> &'static str {
        match self {
            AdjustmentType::Expense => "Expense",
            AdjustmentType::Overtime => "Overtime",
            AdjustmentType::Bonus => "Bonus",
            AdjustmentType::Correction => "Correction",
        }
    }
}

/// An employee-submitted, non-leave pay change.
///
/// `amount` is `None` for [`AdjustmentType::Overtime`], which carries `hours` instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Generated identifier.
    pub id: Uuid,
    /// The kind of adjustment.
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    /// Short label shown in lists.
    pub label: String,
    /// Requested amount, absent for overtime.
    pub amount: Option<Decimal>,
    /// Free-text justification.
    pub description: String,
    /// Current review status.
    pub status: SubmissionStatus,
    /// Overtime hours claimed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<Decimal>,
    /// Reference to an uploaded receipt for expenses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
    /// When the adjustment was filed.
    pub submitted_at: DateTime<Utc>,
}

/// Input for filing a new adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustmentInput {
    /// The kind of adjustment.
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    /// Optional label; defaults to the type name.
    #[serde(default)]
    pub label: String,
    /// Requested amount (required except for overtime).
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Free-text justification.
    pub description: String,
    /// Overtime hours (required for overtime only).
    #[serde(default)]
    pub hours: Option<Decimal>,
    /// Optional receipt reference.
    #[serde(default)]
    pub receipt_ref: Option<String>,
}

/// The kind of leave being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveType {
    /// Paid annual leave.
    #[serde(rename = "Annual leave")]
    Annual,
    /// Paid sick leave.
    #[serde(rename = "Sick leave")]
    Sick,
    /// Leave without pay.
    #[serde(rename = "Unpaid leave")]
    Unpaid,
    /// Any other leave; requires a reason.
    #[serde(rename = "Other")]
    Other,
}

/// A leave request attached to a pay period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Generated identifier.
    pub id: Uuid,
    /// The kind of leave.
    pub leave_type: LeaveType,
    /// First day of leave (inclusive).
    pub start_date: NaiveDate,
    /// Last day of leave (inclusive), never before `start_date`.
    pub end_date: NaiveDate,
    /// Days requested, at least 0.5 and in half-day steps.
    pub total_days: Decimal,
    /// Current review status.
    pub status: SubmissionStatus,
    /// Optional reason, required for [`LeaveType::Other`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the request was filed.
    pub submitted_at: DateTime<Utc>,
}

/// Input for filing a new leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequestInput {
    /// The kind of leave.
    pub leave_type: LeaveType,
    /// First day of leave (inclusive).
    pub start_date: NaiveDate,
    /// Last day of leave (inclusive).
    pub end_date: NaiveDate,
    /// Days requested.
    pub total_days: Decimal,
    /// Optional reason.
    #[serde(default)]
    pub reason: Option<String>,
}
