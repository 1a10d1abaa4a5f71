//! Request types for the Payroll Cycle API.
//!
//! Submission bodies reuse the model input types directly
//! ([`AdjustmentInput`](crate::models::AdjustmentInput),
//! [`LeaveRequestInput`](crate::models::LeaveRequestInput)); the types here
//! cover the remaining endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::WorkflowResult;
use crate::models::{
    ContractorPayment, PayPeriod, PayrollException, RescheduleReason, SubmissionStatus,
};
use crate::workflow::{Actor, Role};

/// Request body for `POST /cycle`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartCycleRequest {
    /// Identifier of the pay period (e.g. "2026-03").
    pub id: String,
    /// Display label.
    pub label: String,
    /// First day of the period (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive).
    pub end_date: NaiveDate,
    /// Open the window right away.
    #[serde(default)]
    pub open: bool,
}

impl StartCycleRequest {
    /// Validates and converts into a pay period.
    pub fn to_period(&self) -> WorkflowResult<PayPeriod> {
        PayPeriod::new(
            self.id.clone(),
            self.label.clone(),
            self.start_date,
            self.end_date,
        )
    }
}

/// Request body for the submission review endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// The admin decision.
    pub status: SubmissionStatus,
}

/// Request body for `POST /batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    /// Batch identifier; used in receipt references.
    pub id: String,
    /// Scheduled payout date.
    pub pay_date: NaiveDate,
    /// Payments in execution order.
    pub payments: Vec<ContractorPayment>,
    /// Explicit exceptions. Detected from the payments when omitted.
    #[serde(default)]
    pub exceptions: Option<Vec<PayrollException>>,
}

/// Request body for `POST /batch/approval/override`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideRequest {
    /// Name of the caller.
    pub actor: String,
    /// Role of the caller.
    pub role: Role,
}

impl From<OverrideRequest> for Actor {
    fn from(req: OverrideRequest) -> Self {
        Actor::new(req.actor, req.role)
    }
}

/// Request body for `POST /batch/receipts/:payee_id/reschedule`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleRequest {
    /// New expected settlement date.
    pub new_date: NaiveDate,
    /// Why the ETA moves.
    pub reason: RescheduleReason,
    /// Notify the payee.
    #[serde(default)]
    pub notify: bool,
}
