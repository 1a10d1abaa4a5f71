//! Pay period window controller.
//!
//! Tracks the submission window of one pay period and the employee's
//! `confirmed` flag. The state only moves forward:
//!
//! ```text
//! NONE --open--> OPEN --close--> CLOSED --mark_paid--> PAID
//! ```
//!
//! A new pay period gets a new controller; a controller is never reset.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{WindowState, WorkflowEvent};

/// State machine for one pay period's submission window.
///
/// # Example
///
/// ```
/// use payroll_cycle::models::WindowState;
/// use payroll_cycle::workflow::WindowController;
///
/// let mut window = WindowController::new();
/// window.open().unwrap();
/// window.confirm().unwrap();
/// window.close().unwrap();
///
/// assert_eq!(window.state(), WindowState::Closed);
/// assert!(window.is_confirmed());
/// assert!(window.confirm().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowController {
    state: WindowState,
    confirmed: bool,
}

impl Default for WindowController {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowController {
    /// Creates a controller in the `NONE` state.
    pub fn new() -> Self {
        Self {
            state: WindowState::None,
            confirmed: false,
        }
    }

    /// Returns the current window state.
    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Returns true while submissions are accepted.
    pub fn is_open(&self) -> bool {
        self.state == WindowState::Open
    }

    /// Returns true once the employee confirmed their pay.
    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    /// `NONE → OPEN`: the period is activated.
    pub fn open(&mut self) -> WorkflowResult<WorkflowEvent> {
        self.transition("open_window", WindowState::None, WindowState::Open)
    }

    /// `OPEN → CLOSED`: the submission deadline passed.
    pub fn close(&mut self) -> WorkflowResult<WorkflowEvent> {
        self.transition("close_window", WindowState::Open, WindowState::Closed)
    }

    /// `CLOSED → PAID`: payout was executed.
    pub fn mark_paid(&mut self) -> WorkflowResult<WorkflowEvent> {
        self.transition("mark_paid", WindowState::Closed, WindowState::Paid)
    }

    /// Sets `confirmed`. Only legal while `OPEN`; repeated calls are no-ops.
    pub fn confirm(&mut self) -> WorkflowResult<()> {
        self.ensure_open("confirm_pay")?;
        self.confirmed = true;
        Ok(())
    }

    /// Rejects `operation` unless the window is `OPEN`.
    pub fn ensure_open(&self, operation: &str) -> WorkflowResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(WorkflowError::invalid_state(
                operation,
                format!("window is {}, expected OPEN", self.state),
            ))
        }
    }

    /// Rejects `operation` once the window is `PAID`.
    pub fn ensure_not_paid(&self, operation: &str) -> WorkflowResult<()> {
        if self.state == WindowState::Paid {
            Err(WorkflowError::invalid_state(
                operation,
                "window is PAID; the period is final",
            ))
        } else {
            Ok(())
        }
    }

    fn transition(
        &mut self,
        operation: &str,
        expected: WindowState,
        to: WindowState,
    ) -> WorkflowResult<WorkflowEvent> {
        if self.state != expected {
            return Err(WorkflowError::invalid_state(
                operation,
                format!("window is {}, expected {}", self.state, expected),
            ));
        }

        let from = self.state;
        self.state = to;
        debug!(%from, %to, "Window transitioned");
        Ok(WorkflowEvent::WindowTransitioned { from, to })
    }
}
