//! Approval gate.
//!
//! Elevated approval is needed when the employee cost base of a batch
//! exceeds the configured threshold. Contractor payments never count toward
//! that base. The timeline advances `requested → viewed → approved`; an
//! admin override sets `approved` directly and is recorded as such.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::ContractorPayment;

/// Display status of the approval timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Nothing requested yet.
    Pending,
    /// Sent to the approver.
    Requested,
    /// The approver opened the request.
    Viewed,
    /// Approved through the normal timeline.
    Approved,
    /// Approved by an admin override.
    Overridden,
}

/// Timestamps of the approval timeline.
///
/// On the normal path a later timestamp implies the earlier ones are set.
/// An override may set `approved` alone; `overridden_by` marks that case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTimeline {
    /// When approval was requested.
    pub requested: Option<DateTime<Utc>>,
    /// When the approver opened the request.
    pub viewed: Option<DateTime<Utc>>,
    /// When the batch was approved by either path.
    pub approved: Option<DateTime<Utc>>,
    /// The admin who overrode, if the override path was used.
    pub overridden_by: Option<String>,
}

/// Role of the caller performing an approval action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Payroll administrator; may override.
    Admin,
    /// Elevated approver (for example the CFO).
    Approver,
    /// Read-only user.
    Viewer,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Approver => "approver",
            Role::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

/// The caller of a privileged action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    pub fn new(name: impl Into<String>, role: Role) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// Sum of `net_pay + employer_taxes` over employee payments only.
///
/// # Example
///
/// ```
/// use payroll_cycle::models::{ContractorPayment, EmploymentType};
/// use payroll_cycle::workflow::employee_total_cost;
/// use rust_decimal::Decimal;
///
/// let employee = ContractorPayment {
///     id: "emp_001".into(),
///     name: "Ana".into(),
///     country: "PT".into(),
///     currency: "EUR".into(),
///     net_pay: Decimal::new(25_000, 0),
///     est_fees: Decimal::ZERO,
///     fx_rate: Decimal::ONE,
///     employment_type: EmploymentType::Employee,
///     employer_taxes: Some(Decimal::new(5_000, 0)),
///     bank_details_on_file: true,
///     documents_expire_on: None,
/// };
/// let mut contractor = employee.clone();
/// contractor.id = "ctr_001".into();
/// contractor.employment_type = EmploymentType::Contractor;
/// contractor.employer_taxes = None;
///
/// assert_eq!(employee_total_cost(&[employee, contractor]), Decimal::new(30_000, 0));
/// ```
pub fn employee_total_cost(payments: &[ContractorPayment]) -> Decimal {
    payments.iter().filter_map(ContractorPayment::employer_cost).sum()
}

/// Returns true when the employee cost base strictly exceeds `threshold`.
pub fn requires_approval(payments: &[ContractorPayment], threshold: Decimal) -> bool {
    employee_total_cost(payments) > threshold
}

/// Approval state of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalGate {
    requires_approval: bool,
    employee_total_cost: Decimal,
    threshold: Decimal,
    status: ApprovalStatus,
    timeline: ApprovalTimeline,
}

impl ApprovalGate {
    /// Evaluates the gate for a batch's payments.
    pub fn evaluate(payments: &[ContractorPayment], threshold: Decimal) -> Self {
        let employee_total_cost = employee_total_cost(payments);
        Self {
            requires_approval: employee_total_cost > threshold,
            employee_total_cost,
            threshold,
            status: ApprovalStatus::Pending,
            timeline: ApprovalTimeline::default(),
        }
    }

    /// Whether elevated approval is needed before execution.
    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    /// The employee cost base used for the decision.
    pub fn employee_total_cost(&self) -> Decimal {
        self.employee_total_cost
    }

    /// The threshold the cost base was compared against.
    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Current display status.
    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// The recorded timeline.
    pub fn timeline(&self) -> &ApprovalTimeline {
        &self.timeline
    }

    /// Returns true once the batch is approved by either path.
    pub fn is_approved(&self) -> bool {
        self.timeline.approved.is_some()
    }

    /// Execution may start when approved or when approval is not required.
    pub fn is_cleared(&self) -> bool {
        self.is_approved() || !self.requires_approval
    }

    /// `pending → requested`.
    pub fn request_approval(&mut self, at: DateTime<Utc>) -> WorkflowResult<()> {
        self.expect_status("request_approval", ApprovalStatus::Pending)?;
        self.timeline.requested = Some(at);
        self.status = ApprovalStatus::Requested;
        debug!(%at, "Approval requested");
        Ok(())
    }

    /// `requested → viewed`.
    pub fn mark_viewed(&mut self, at: DateTime<Utc>) -> WorkflowResult<()> {
        self.expect_status("mark_viewed", ApprovalStatus::Requested)?;
        self.timeline.viewed = Some(at);
        self.status = ApprovalStatus::Viewed;
        debug!(%at, "Approval viewed");
        Ok(())
    }

    /// `viewed → approved`.
    pub fn approve(&mut self, at: DateTime<Utc>) -> WorkflowResult<()> {
        self.expect_status("approve", ApprovalStatus::Viewed)?;
        self.timeline.approved = Some(at);
        self.status = ApprovalStatus::Approved;
        debug!(%at, "Batch approved");
        Ok(())
    }

    /// Sets `approved` directly from any unapproved status.
    ///
    /// Only an [`Role::Admin`] may override. `requested` and `viewed` are
    /// left as they were.
    pub fn admin_override(&mut self, actor: &Actor, at: DateTime<Utc>) -> WorkflowResult<()> {
        if actor.role != Role::Admin {
            return Err(WorkflowError::Forbidden {
                actor: format!("{} ({})", actor.name, actor.role),
                action: "admin_override".to_string(),
            });
        }
        if self.is_approved() {
            return Err(WorkflowError::invalid_state(
                "admin_override",
                "batch is already approved",
            ));
        }

        self.timeline.approved = Some(at);
        self.timeline.overridden_by = Some(actor.name.clone());
        self.status = ApprovalStatus::Overridden;
        debug!(actor = %actor.name, %at, "Approval overridden");
        Ok(())
    }

    fn expect_status(&self, operation: &str, expected: ApprovalStatus) -> WorkflowResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(WorkflowError::invalid_state(
                operation,
                format!("approval is {:?}, expected {:?}", self.status, expected),
            ))
        }
    }
}
