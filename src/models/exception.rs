//! Payroll exception model.
//!
//! Exceptions are per-contractor conditions that block the batch from
//! moving into approval until they are resolved or snoozed.

use serde::{Deserialize, Serialize};

/// The condition an exception reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExceptionType {
    /// No bank details on file for the payee.
    MissingBank,
    /// The pay date is a bank holiday on the payee's rail.
    HolidayRails,
    /// Identity or tax documents are about to expire.
    DocExpiry,
    /// The payment amount exceeds the per-payment review amount.
    OverThreshold,
}

/// How urgently an exception should be looked at.
///
/// Severity orders the display only; it never affects gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Needs attention before anything else.
    High,
    /// Needs attention this cycle.
    Medium,
    /// Informational.
    Low,
}

/// A single exception raised against a contractor in the batch.
///
/// An exception is active iff it is neither resolved nor snoozed. The two
/// flags are terminal and mutually exclusive.
///
/// # Example
///
/// ```
/// use payroll_cycle::models::{ExceptionType, PayrollException, Severity};
///
/// let exception = PayrollException::new(
///     "exc_001",
///     "ctr_004",
///     ExceptionType::MissingBank,
///     Severity::High,
/// );
/// assert!(exception.is_active());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollException {
    /// Unique identifier for the exception.
    pub id: String,
    /// The contractor or employee the exception concerns.
    pub contractor_id: String,
    /// The condition being reported.
    #[serde(rename = "type")]
    pub exception_type: ExceptionType,
    /// Display severity.
    pub severity: Severity,
    /// Set once an admin fixed the underlying condition.
    #[serde(default)]
    pub resolved: bool,
    /// Set once an admin deferred the exception.
    #[serde(default)]
    pub snoozed: bool,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PayrollException {
    /// Creates an active exception with no detail.
    pub fn new(
        id: impl Into<String>,
        contractor_id: impl Into<String>,
        exception_type: ExceptionType,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            contractor_id: contractor_id.into(),
            exception_type,
            severity,
            resolved: false,
            snoozed: false,
            detail: None,
        }
    }

    /// Attaches a human-readable detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Returns true while the exception still blocks the batch.
    pub fn is_active(&self) -> bool {
        !self.resolved && !self.snoozed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_uses_kebab_case_type() {
        let exception = PayrollException::new(
            "exc_001",
            "ctr_001",
            ExceptionType::HolidayRails,
            Severity::Low,
        );
        let json = serde_json::to_string(&exception).unwrap();
        assert!(json.contains("\"type\":\"holiday-rails\""));
        assert!(json.contains("\"severity\":\"low\""));
        assert!(!json.contains("detail"));
    }

    #[test]
    fn test_deserialize_defaults_flags_to_false() {
        let json = r#"{
            "id": "exc_002",
            "contractor_id": "ctr_002",
            "type": "doc-expiry",
            "severity": "medium"
        }"#;
        let exception: PayrollException = serde_json::from_str(json).unwrap();
        assert_eq!(exception.exception_type, ExceptionType::DocExpiry);
        assert!(exception.is_active());
    }

    #[test]
    fn test_resolved_or_snoozed_is_inactive() {
        let mut resolved =
            PayrollException::new("a", "ctr", ExceptionType::MissingBank, Severity::High);
        resolved.resolved = true;
        let mut snoozed =
            PayrollException::new("b", "ctr", ExceptionType::MissingBank, Severity::High);
        snoozed.snoozed = true;

        assert!(!resolved.is_active());
        assert!(!snoozed.is_active());
    }
}
