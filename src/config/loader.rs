//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading workflow
//! policy from YAML files.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::Severity;

use super::types::{HolidaysConfig, PolicyConfig, RailsConfig, WorkflowConfig};

/// Loads and provides access to workflow configuration.
///
/// # Directory Structure
///
/// The configuration directory should have the following structure:
/// ```text
/// config/payroll/
/// ├── policy.yaml    # Approval threshold, severity order, latency range
/// ├── rails.yaml     # FX spread and payment rail per currency
/// └── holidays.yaml  # Bank holidays per country (optional)
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_cycle::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/payroll").unwrap();
/// println!("Approval threshold: {}", loader.config().approval_threshold());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: WorkflowConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `policy.yaml` or `rails.yaml` is missing
    /// - Any file contains invalid YAML
    /// - The policy is inconsistent (severity order incomplete, latency bounds inverted,
    ///   negative threshold)
    pub fn load<P: AsRef<Path>>(path: P) -> WorkflowResult<Self> {
        let path = path.as_ref();

        let policy_path = path.join("policy.yaml");
        let policy = Self::load_yaml::<PolicyConfig>(&policy_path)?;
        Self::validate_policy(&policy, &policy_path)?;

        let rails_path = path.join("rails.yaml");
        let rails = Self::load_yaml::<RailsConfig>(&rails_path)?;

        // Holidays are optional; a missing file means no holiday calendar.
        let holidays_path = path.join("holidays.yaml");
        let holidays = if holidays_path.exists() {
            Self::load_yaml::<HolidaysConfig>(&holidays_path)?
        } else {
            HolidaysConfig::default()
        };

        debug!(
            path = %path.display(),
            threshold = %policy.approval.threshold,
            rails = rails.currencies.len(),
            "Loaded workflow configuration"
        );

        Ok(Self {
            config: WorkflowConfig::new(policy, rails, holidays),
        })
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> WorkflowResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| WorkflowError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| WorkflowError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    fn validate_policy(policy: &PolicyConfig, path: &Path) -> WorkflowResult<()> {
        let fail = |message: String| WorkflowError::ConfigParseError {
            path: path.display().to_string(),
            message,
        };

        let order = &policy.exceptions.severity_order;
        for severity in [Severity::High, Severity::Medium, Severity::Low] {
            if order.iter().filter(|s| **s == severity).count() != 1 {
                return Err(fail(format!(
                    "severity_order must list {:?} exactly once",
                    severity
                )));
            }
        }

        if policy.execution.latency_min_ms > policy.execution.latency_max_ms {
            return Err(fail(format!(
                "latency_min_ms ({}) exceeds latency_max_ms ({})",
                policy.execution.latency_min_ms, policy.execution.latency_max_ms
            )));
        }

        if policy.approval.threshold.is_sign_negative() {
            return Err(fail("approval threshold must not be negative".to_string()));
        }

        Ok(())
    }

    /// Returns the underlying workflow configuration.
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Consumes the loader and returns the configuration.
    pub fn into_config(self) -> WorkflowConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn config_path() -> &'static str {
        "./config/payroll"
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "payroll-cycle-{}-{}",
            name,
            uuid::Uuid::new_v4()
        ));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_valid_configuration() {
        let result = ConfigLoader::load(config_path());
        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());

        let loader = result.unwrap();
        assert_eq!(loader.config().approval_threshold(), dec("50000"));
        assert_eq!(loader.config().policy().approval.reference_currency, "USD");
    }

    #[test]
    fn test_loaded_severity_order() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let config = loader.config();
        assert_eq!(config.severity_rank(Severity::High), 0);
        assert_eq!(config.severity_rank(Severity::Medium), 1);
        assert_eq!(config.severity_rank(Severity::Low), 2);
    }

    #[test]
    fn test_loaded_rails() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let config = loader.config();
        assert_eq!(config.rail_for("GBP").name, "Faster Payments");
        assert_eq!(config.rail_for("USD").settlement_days, 1);
        assert_eq!(config.rails().default_fx_spread, dec("0.005"));
    }

    #[test]
    fn test_loaded_holidays() {
        let loader = ConfigLoader::load(config_path()).unwrap();
        let christmas = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        assert!(loader.config().bank_holiday("GB", christmas).is_some());
    }

    #[test]
    fn test_load_missing_directory_returns_error() {
        let result = ConfigLoader::load("/nonexistent/path");

        match result {
            Err(WorkflowError::ConfigNotFound { path }) => {
                assert!(path.contains("policy.yaml"));
            }
            _ => panic!("Expected ConfigNotFound error"),
        }
    }

    #[test]
    fn test_load_rejects_incomplete_severity_order() {
        let dir = scratch_dir("severity");
        fs::write(
            dir.join("policy.yaml"),
            r#"
approval:
  threshold: 50000
  reference_currency: USD
  view_delay_ms: 10
exceptions:
  severity_order: [high, low]
  review_amount: 20000
  doc_expiry_warning_days: 30
execution:
  latency_min_ms: 1
  latency_max_ms: 2
"#,
        )
        .unwrap();
        fs::write(
            dir.join("rails.yaml"),
            "default_fx_spread: 0.005\ndefault_rail:\n  name: SWIFT\n  settlement_days: 2\n",
        )
        .unwrap();

        let result = ConfigLoader::load(&dir);
        match result {
            Err(WorkflowError::ConfigParseError { message, .. }) => {
                assert!(message.contains("Medium"), "unexpected message: {}", message);
            }
            other => panic!("Expected ConfigParseError, got {:?}", other),
        }

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_without_holidays_file() {
        let dir = scratch_dir("no-holidays");
        fs::copy(
            Path::new(config_path()).join("policy.yaml"),
            dir.join("policy.yaml"),
        )
        .unwrap();
        fs::copy(
            Path::new(config_path()).join("rails.yaml"),
            dir.join("rails.yaml"),
        )
        .unwrap();

        let loader = ConfigLoader::load(&dir).unwrap();
        let christmas = NaiveDate::from_ymd_opt(2026, 12, 25).unwrap();
        assert!(loader.config().bank_holiday("GB", christmas).is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_load_invalid_yaml_returns_parse_error() {
        let dir = scratch_dir("bad-yaml");
        fs::write(dir.join("policy.yaml"), "approval: [unclosed").unwrap();

        let result = ConfigLoader::load(&dir);
        assert!(matches!(
            result,
            Err(WorkflowError::ConfigParseError { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
