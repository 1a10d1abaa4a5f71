//! Payment receipt models for reconciliation.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement status of an executed payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptStatus {
    /// Funds have settled with the payee.
    Paid,
    /// Funds are travelling on a non-instant rail.
    InTransit,
}

impl ReceiptStatus {
    /// Stable name used in exports.
    pub fn as_str(self) -> &'static str {
        match self {
            ReceiptStatus::Paid => "Paid",
            ReceiptStatus::InTransit => "InTransit",
        }
    }
}

/// Why a receipt's ETA was moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RescheduleReason {
    /// A bank holiday on the receiving rail.
    Holiday,
    /// The receiving bank reported a delay.
    BankDelay,
}

/// Record of one executed payment.
///
/// Created when the execution sequencer completes a payment. Only `eta`
/// changes afterwards (through a reschedule).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The payee this receipt belongs to.
    pub payee_id: String,
    /// Payee display name.
    pub payee_name: String,
    /// Amount sent, in `currency`.
    pub amount: Decimal,
    /// Currency the payee receives.
    pub currency: String,
    /// Settlement status.
    pub status: ReceiptStatus,
    /// Payment rail used (e.g., "SEPA Instant").
    pub rail: String,
    /// Batch-scoped payment reference.
    pub reference: String,
    /// When execution completed.
    pub paid_at: DateTime<Utc>,
    /// FX rate applied.
    pub fx_rate: Decimal,
    /// FX spread applied as a fraction (0.005 = 0.5%).
    pub fx_spread: Decimal,
    /// FX fee charged.
    pub fx_fee: Decimal,
    /// Processing fee charged.
    pub processing_fee: Decimal,
    /// Expected settlement date.
    pub eta: NaiveDate,
}
