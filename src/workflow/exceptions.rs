//! Exception engine.
//!
//! Holds the batch's payroll exceptions. An exception is active until it is
//! resolved or snoozed; the batch cannot enter approval while any exception
//! is active. Severity only drives display order.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::debug;

use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{ContractorPayment, ExceptionType, PayrollException, Severity};

/// Which terminal flag an action sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Resolve,
    Snooze,
}

/// The set of exceptions raised for one batch.
///
/// # Example
///
/// ```
/// use payroll_cycle::models::{ExceptionType, PayrollException, Severity};
/// use payroll_cycle::workflow::ExceptionEngine;
///
/// let mut engine = ExceptionEngine::new(vec![
///     PayrollException::new("exc_001", "ctr_001", ExceptionType::MissingBank, Severity::High),
///     PayrollException::new("exc_002", "ctr_002", ExceptionType::DocExpiry, Severity::Medium),
/// ])
/// .unwrap();
///
/// engine.resolve("exc_001").unwrap();
/// engine.snooze("exc_002").unwrap();
/// assert!(engine.is_clear());
/// assert!(engine.resolve("exc_002").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionEngine {
    exceptions: Vec<PayrollException>,
}

impl ExceptionEngine {
    /// Creates an engine, rejecting duplicate exception ids.
    pub fn new(exceptions: Vec<PayrollException>) -> WorkflowResult<Self> {
        let mut seen = HashSet::new();
        for exception in &exceptions {
            if !seen.insert(exception.id.as_str()) {
                return Err(WorkflowError::validation(
                    "exceptions",
                    format!("duplicate exception id '{}'", exception.id),
                ));
            }
            if exception.resolved && exception.snoozed {
                return Err(WorkflowError::validation(
                    "exceptions",
                    format!("exception '{}' is both resolved and snoozed", exception.id),
                ));
            }
        }
        Ok(Self { exceptions })
    }

    /// All exceptions in the order they were raised.
    pub fn all(&self) -> &[PayrollException] {
        &self.exceptions
    }

    /// Looks up an exception by id.
    pub fn get(&self, id: &str) -> Option<&PayrollException> {
        self.exceptions.iter().find(|e| e.id == id)
    }

    /// Exceptions that are neither resolved nor snoozed.
    pub fn active(&self) -> Vec<&PayrollException> {
        self.exceptions.iter().filter(|e| e.is_active()).collect()
    }

    /// Number of active exceptions.
    pub fn active_count(&self) -> usize {
        self.exceptions.iter().filter(|e| e.is_active()).count()
    }

    /// Returns true when nothing blocks approval.
    pub fn is_clear(&self) -> bool {
        self.active_count() == 0
    }

    /// Active exceptions ordered by the configured severity order.
    ///
    /// The sort is stable, so exceptions of equal severity keep raise order.
    pub fn active_for_display(&self, config: &WorkflowConfig) -> Vec<&PayrollException> {
        let mut active = self.active();
        active.sort_by_key(|e| config.severity_rank(e.severity));
        active
    }

    /// Marks an active exception as resolved.
    pub fn resolve(&mut self, id: &str) -> WorkflowResult<&PayrollException> {
        self.dispose(id, Disposition::Resolve)
    }

    /// Marks an active exception as snoozed.
    pub fn snooze(&mut self, id: &str) -> WorkflowResult<&PayrollException> {
        self.dispose(id, Disposition::Snooze)
    }

    fn dispose(
        &mut self,
        id: &str,
        disposition: Disposition,
    ) -> WorkflowResult<&PayrollException> {
        let operation = match disposition {
            Disposition::Resolve => "resolve_exception",
            Disposition::Snooze => "snooze_exception",
        };

        let exception = self
            .exceptions
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| WorkflowError::not_found("Exception", id))?;

        if exception.resolved {
            return Err(WorkflowError::invalid_state(
                operation,
                format!("exception '{}' is already resolved", id),
            ));
        }
        if exception.snoozed {
            return Err(WorkflowError::invalid_state(
                operation,
                format!("exception '{}' is already snoozed", id),
            ));
        }

        match disposition {
            Disposition::Resolve => exception.resolved = true,
            Disposition::Snooze => exception.snoozed = true,
        }
        debug!(exception_id = %id, ?disposition, "Exception disposed");
        Ok(exception)
    }
}

/// Derives exceptions from batch payments and policy.
///
/// One payee can raise several exceptions. Ids are assigned as `exc_001`,
/// `exc_002`, … in payment order.
///
/// | Condition | Type | Severity |
/// |---|---|---|
/// | no bank details on file | `missing-bank` | high |
/// | net pay, in the reference currency, above the review amount | `over-threshold` | medium |
/// | documents expire within the warning window | `doc-expiry` | medium |
/// | pay date is a bank holiday in the payee's country | `holiday-rails` | low |
pub fn detect_exceptions(
    payments: &[ContractorPayment],
    pay_date: NaiveDate,
    config: &WorkflowConfig,
) -> Vec<PayrollException> {
    let policy = &config.policy().exceptions;
    let reference_currency = config.reference_currency();
    let mut found: Vec<(String, ExceptionType, Severity, String)> = Vec::new();

    for payment in payments {
        if !payment.bank_details_on_file {
            found.push((
                payment.id.clone(),
                ExceptionType::MissingBank,
                Severity::High,
                format!("{} has no bank details on file", payment.name),
            ));
        }

        // Non-positive rates fail batch validation; compare those unconverted.
        let reference_pay = payment.reference_net_pay().unwrap_or(payment.net_pay);
        if reference_pay > policy.review_amount {
            found.push((
                payment.id.clone(),
                ExceptionType::OverThreshold,
                Severity::Medium,
                format!(
                    "Net pay {} {} ({} {}) exceeds review amount {} {}",
                    payment.net_pay,
                    payment.currency,
                    reference_pay,
                    reference_currency,
                    policy.review_amount,
                    reference_currency
                ),
            ));
        }

        if let Some(expires) = payment.documents_expire_on {
            let days_left = (expires - pay_date).num_days();
            if days_left <= policy.doc_expiry_warning_days {
                found.push((
                    payment.id.clone(),
                    ExceptionType::DocExpiry,
                    Severity::Medium,
                    format!("Documents for {} expire on {}", payment.name, expires),
                ));
            }
        }

        if let Some(holiday) = config.bank_holiday(&payment.country, pay_date) {
            found.push((
                payment.id.clone(),
                ExceptionType::HolidayRails,
                Severity::Low,
                format!("{} is {} in {}", pay_date, holiday.name, payment.country),
            ));
        }
    }

    found
        .into_iter()
        .enumerate()
        .map(|(i, (contractor_id, exception_type, severity, detail))| {
            PayrollException::new(
                format!("exc_{:03}", i + 1),
                contractor_id,
                exception_type,
                severity,
            )
            .with_detail(detail)
        })
        .collect()
}
