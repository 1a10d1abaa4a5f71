//! Configuration types for the payroll cycle workflow.
//!
//! This module contains the strongly-typed policy structures that are
//! deserialized from YAML configuration files. Everything here is policy
//! (thresholds, orderings, rails), never structural workflow logic.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::Severity;

/// Approval gate policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalPolicy {
    /// Employee cost above which elevated approval is required.
    pub threshold: Decimal,
    /// Currency the approval threshold and the exception review amount are
    /// expressed in. Payment `fx_rate`s are quoted against it.
    pub reference_currency: String,
    /// Simulated delay before an approver opens a request, in milliseconds.
    pub view_delay_ms: u64,
}

/// Exception engine policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ExceptionPolicy {
    /// Display order of severities, most urgent first.
    pub severity_order: Vec<Severity>,
    /// Net pay, converted to the reference currency, above which a single
    /// payment raises an over-threshold exception.
    pub review_amount: Decimal,
    /// Documents expiring within this many days of the pay date raise an exception.
    pub doc_expiry_warning_days: i64,
}

/// Execution sequencer policy.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionPolicy {
    /// Lower bound of simulated per-payment latency, in milliseconds.
    pub latency_min_ms: u64,
    /// Upper bound of simulated per-payment latency, in milliseconds.
    pub latency_max_ms: u64,
}

/// Policy configuration from policy.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Approval gate policy.
    pub approval: ApprovalPolicy,
    /// Exception engine policy.
    pub exceptions: ExceptionPolicy,
    /// Execution sequencer policy.
    pub execution: ExecutionPolicy,
}

/// A payment rail used for one or more currencies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RailConfig {
    /// Rail display name (e.g., "SEPA Instant").
    pub name: String,
    /// Business days to settle; zero means the rail is instant.
    pub settlement_days: u32,
}

impl RailConfig {
    /// Returns true if payments on this rail settle immediately.
    pub fn is_instant(&self) -> bool {
        self.settlement_days == 0
    }
}

/// Rail configuration from rails.yaml.
#[derive(Debug, Clone, Deserialize)]
pub struct RailsConfig {
    /// FX spread applied to every payment, as a fraction.
    pub default_fx_spread: Decimal,
    /// Rail used when a currency has no dedicated entry.
    pub default_rail: RailConfig,
    /// Map of currency code to rail.
    #[serde(default)]
    pub currencies: HashMap<String, RailConfig>,
}

/// A bank holiday in a given country.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BankHoliday {
    /// The holiday date.
    pub date: NaiveDate,
    /// The holiday name.
    pub name: String,
}

/// Bank holiday configuration from holidays.yaml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HolidaysConfig {
    /// Map of country code to holidays.
    #[serde(default)]
    pub holidays: HashMap<String, Vec<BankHoliday>>,
}

/// The complete workflow configuration.
///
/// Aggregates the policy, rail and holiday files of a configuration
/// directory. [`WorkflowConfig::default`] carries the same policy values
/// as the shipped `config/payroll` directory, without holidays.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    policy: PolicyConfig,
    rails: RailsConfig,
    holidays: HolidaysConfig,
}

impl WorkflowConfig {
    /// Creates a new WorkflowConfig from its component parts.
    pub fn new(policy: PolicyConfig, rails: RailsConfig, holidays: HolidaysConfig) -> Self {
        Self {
            policy,
            rails,
            holidays,
        }
    }

    /// Returns the policy configuration.
    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Returns the rail configuration.
    pub fn rails(&self) -> &RailsConfig {
        &self.rails
    }

    /// Returns the approval threshold.
    pub fn approval_threshold(&self) -> Decimal {
        self.policy.approval.threshold
    }

    /// Returns the currency policy amounts are expressed in.
    pub fn reference_currency(&self) -> &str {
        &self.policy.approval.reference_currency
    }

    /// Position of a severity in the configured display order.
    ///
    /// Severities missing from the order sort last.
    pub fn severity_rank(&self, severity: Severity) -> usize {
        self.policy
            .exceptions
            .severity_order
            .iter()
            .position(|s| *s == severity)
            .unwrap_or(usize::MAX)
    }

    /// Returns the rail for a currency, falling back to the default rail.
    pub fn rail_for(&self, currency: &str) -> &RailConfig {
        self.rails
            .currencies
            .get(&currency.to_uppercase())
            .unwrap_or(&self.rails.default_rail)
    }

    /// Returns the bank holiday on `date` in `country`, if any.
    pub fn bank_holiday(&self, country: &str, date: NaiveDate) -> Option<&BankHoliday> {
        self.holidays
            .holidays
            .get(&country.to_uppercase())
            .and_then(|days| days.iter().find(|h| h.date == date))
    }

    /// Simulated per-payment latency bounds.
    pub fn latency_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.policy.execution.latency_min_ms),
            Duration::from_millis(self.policy.execution.latency_max_ms),
        )
    }

    /// Simulated delay before an approver views a request.
    pub fn view_delay(&self) -> Duration {
        Duration::from_millis(self.policy.approval.view_delay_ms)
    }

    /// Replaces the approval threshold.
    pub fn with_approval_threshold(mut self, threshold: Decimal) -> Self {
        self.policy.approval.threshold = threshold;
        self
    }

    /// Replaces the approver view delay. Zero disables the simulated view.
    pub fn with_view_delay(mut self, delay: Duration) -> Self {
        self.policy.approval.view_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Replaces the holiday calendar.
    pub fn with_holidays(mut self, holidays: HolidaysConfig) -> Self {
        self.holidays = holidays;
        self
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let rail = |name: &str, settlement_days: u32| RailConfig {
            name: name.to_string(),
            settlement_days,
        };

        let currencies = HashMap::from([
            ("USD".to_string(), rail("ACH", 1)),
            ("EUR".to_string(), rail("SEPA Instant", 0)),
            ("GBP".to_string(), rail("Faster Payments", 0)),
            ("BRL".to_string(), rail("PIX", 0)),
            ("MXN".to_string(), rail("SPEI", 0)),
            ("INR".to_string(), rail("IMPS", 0)),
            ("PHP".to_string(), rail("InstaPay", 0)),
            ("CAD".to_string(), rail("EFT", 1)),
        ]);

        Self {
            policy: PolicyConfig {
                approval: ApprovalPolicy {
                    threshold: Decimal::new(50_000, 0),
                    reference_currency: "USD".to_string(),
                    view_delay_ms: 1_500,
                },
                exceptions: ExceptionPolicy {
                    severity_order: vec![Severity::High, Severity::Medium, Severity::Low],
                    review_amount: Decimal::new(20_000, 0),
                    doc_expiry_warning_days: 30,
                },
                execution: ExecutionPolicy {
                    latency_min_ms: 800,
                    latency_max_ms: 2_000,
                },
            },
            rails: RailsConfig {
                default_fx_spread: Decimal::new(5, 3),
                default_rail: rail("SWIFT", 2),
                currencies,
            },
            holidays: HolidaysConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold_is_fifty_thousand() {
        let config = WorkflowConfig::default();
        assert_eq!(config.approval_threshold(), Decimal::new(50_000, 0));
    }

    #[test]
    fn test_default_severity_rank_high_first() {
        let config = WorkflowConfig::default();
        assert!(config.severity_rank(Severity::High) < config.severity_rank(Severity::Medium));
        assert!(config.severity_rank(Severity::Medium) < config.severity_rank(Severity::Low));
    }

    #[test]
    fn test_rail_lookup_is_case_insensitive_with_fallback() {
        let config = WorkflowConfig::default();
        assert_eq!(config.rail_for("eur").name, "SEPA Instant");
        assert!(config.rail_for("EUR").is_instant());
        assert_eq!(config.rail_for("NGN").name, "SWIFT");
    }

    #[test]
    fn test_bank_holiday_lookup() {
        let christmas = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        let holidays = HolidaysConfig {
            holidays: HashMap::from([(
                "GB".to_string(),
                vec![BankHoliday {
                    date: christmas,
                    name: "Christmas Day".to_string(),
                }],
            )]),
        };
        let config = WorkflowConfig::default().with_holidays(holidays);

        assert_eq!(
            config.bank_holiday("gb", christmas).map(|h| h.name.as_str()),
            Some("Christmas Day")
        );
        assert!(config.bank_holiday("US", christmas).is_none());
    }

    #[test]
    fn test_latency_range_in_milliseconds() {
        let (min, max) = WorkflowConfig::default().latency_range();
        assert_eq!(min, Duration::from_millis(800));
        assert_eq!(max, Duration::from_millis(2_000));
    }
}
