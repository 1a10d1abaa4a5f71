//! Core data models for the payroll cycle engine.
//!
//! This module contains all the domain models used throughout the engine.

mod event;
mod exception;
mod pay_period;
mod payment;
mod receipt;
mod submission;
mod window_state;

pub use event::WorkflowEvent;
pub use exception::{ExceptionType, PayrollException, Severity};
pub use pay_period::PayPeriod;
pub use payment::{ContractorPayment, EmploymentType};
pub use receipt::{PaymentReceipt, ReceiptStatus, RescheduleReason};
pub use submission::{
    Adjustment, AdjustmentInput, AdjustmentType, LeaveRequest, LeaveRequestInput, LeaveType,
    SubmissionStatus,
};
pub use window_state::WindowState;
