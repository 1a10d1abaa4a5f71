//! Configuration loading and management for the payroll cycle engine.
//!
//! This module provides functionality to load workflow policy from YAML
//! files: the approval threshold, exception severity order, simulated
//! execution latency, payment rails and bank holidays.
//!
//! # Example
//!
//! ```no_run
//! use payroll_cycle::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/payroll").unwrap().into_config();
//! println!("Threshold: {}", config.approval_threshold());
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    ApprovalPolicy, BankHoliday, ExceptionPolicy, ExecutionPolicy, HolidaysConfig, PolicyConfig,
    RailConfig, RailsConfig, WorkflowConfig,
};
