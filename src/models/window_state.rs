//! Pay period window state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The lifecycle stage of a pay period's submission window.
///
/// Transitions only move forward: `NONE → OPEN → CLOSED → PAID`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WindowState {
    /// The period has not been activated yet.
    None,
    /// Submissions and confirmation are accepted.
    Open,
    /// The submission deadline has passed.
    Closed,
    /// Payout has been executed.
    Paid,
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WindowState::None => "NONE",
            WindowState::Open => "OPEN",
            WindowState::Closed => "CLOSED",
            WindowState::Paid => "PAID",
        };
        f.write_str(label)
    }
}
