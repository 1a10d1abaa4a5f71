//! Reconciliation ledger.
//!
//! One receipt per executed payment. After creation only the ETA moves, and
//! only through [`ReconciliationLedger::reschedule`]. The CSV export keeps a
//! fixed column order with plain numbers for machine consumption.

use std::io;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::WorkflowConfig;
use crate::error::{WorkflowError, WorkflowResult};
use crate::models::{ContractorPayment, PaymentReceipt, ReceiptStatus, RescheduleReason};

/// Export column order.
pub const CSV_HEADERS: [&str; 13] = [
    "payee_id",
    "payee_name",
    "amount",
    "currency",
    "status",
    "rail",
    "reference",
    "paid_at",
    "fx_rate",
    "fx_fee",
    "processing_fee",
    "fx_spread",
    "eta",
];

/// Builds the receipt for a payment that just completed.
///
/// The rail comes from the currency's configured rail. Instant rails settle
/// on the paid date; others settle after their settlement days, counted in
/// business days that skip weekends and the payee country's bank holidays.
pub fn build_receipt(
    payment: &ContractorPayment,
    reference: impl Into<String>,
    paid_at: DateTime<Utc>,
    config: &WorkflowConfig,
) -> PaymentReceipt {
    let rail = config.rail_for(&payment.currency);
    let paid_on = paid_at.date_naive();
    let fx_spread = config.rails().default_fx_spread;

    let (status, eta) = if rail.is_instant() {
        (ReceiptStatus::Paid, paid_on)
    } else {
        (
            ReceiptStatus::InTransit,
            add_business_days(paid_on, rail.settlement_days, |d| {
                config.bank_holiday(&payment.country, d).is_some()
            }),
        )
    };

    PaymentReceipt {
        payee_id: payment.id.clone(),
        payee_name: payment.name.clone(),
        amount: payment.net_pay,
        currency: payment.currency.clone(),
        status,
        rail: rail.name.clone(),
        reference: reference.into(),
        paid_at,
        fx_rate: payment.fx_rate,
        fx_spread,
        fx_fee: (payment.net_pay * fx_spread)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        processing_fee: payment.est_fees,
        eta,
    }
}

/// Advances `start` by `days` business days.
fn add_business_days(
    start: NaiveDate,
    days: u32,
    is_holiday: impl Fn(NaiveDate) -> bool,
) -> NaiveDate {
    let mut date = start;
    let mut remaining = days;
    while remaining > 0 {
        date += Duration::days(1);
        let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
        if !weekend && !is_holiday(date) {
            remaining -= 1;
        }
    }
    date
}

/// Receipts of one executed batch, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLedger {
    receipts: Vec<PaymentReceipt>,
}

impl ReconciliationLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a receipt. A payee can only be paid once per batch.
    pub fn record(&mut self, receipt: PaymentReceipt) -> WorkflowResult<&PaymentReceipt> {
        if self.get(&receipt.payee_id).is_some() {
            return Err(WorkflowError::invalid_state(
                "record_receipt",
                format!("payee '{}' already has a receipt", receipt.payee_id),
            ));
        }
        self.receipts.push(receipt);
        Ok(&self.receipts[self.receipts.len() - 1])
    }

    /// All receipts.
    pub fn receipts(&self) -> &[PaymentReceipt] {
        &self.receipts
    }

    /// Number of receipts.
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    /// Returns true when no payment was recorded.
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    /// Looks up the receipt of a payee.
    pub fn get(&self, payee_id: &str) -> Option<&PaymentReceipt> {
        self.receipts.iter().find(|r| r.payee_id == payee_id)
    }

    /// Moves the ETA of a payee's receipt.
    ///
    /// The new date may not precede the payment date or `today`. Nothing
    /// but `eta` changes; `reason` and `notify` are reported to the caller
    /// through the batch's event.
    pub fn reschedule(
        &mut self,
        payee_id: &str,
        new_date: NaiveDate,
        reason: RescheduleReason,
        today: NaiveDate,
    ) -> WorkflowResult<&PaymentReceipt> {
        let receipt = self
            .receipts
            .iter_mut()
            .find(|r| r.payee_id == payee_id)
            .ok_or_else(|| WorkflowError::not_found("Receipt", payee_id))?;

        let paid_on = receipt.paid_at.date_naive();
        if new_date < paid_on {
            return Err(WorkflowError::validation(
                "new_date",
                format!("{} is before the payment date {}", new_date, paid_on),
            ));
        }
        if new_date < today {
            return Err(WorkflowError::validation(
                "new_date",
                format!("{} is in the past", new_date),
            ));
        }

        receipt.eta = new_date;
        debug!(payee_id = %payee_id, eta = %new_date, ?reason, "Receipt rescheduled");
        Ok(receipt)
    }

    /// Writes the header and one row per receipt to `writer`.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> WorkflowResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(CSV_HEADERS)?;
        for r in &self.receipts {
            csv.write_record([
                r.payee_id.clone(),
                r.payee_name.clone(),
                r.amount.to_string(),
                r.currency.clone(),
                r.status.as_str().to_string(),
                r.rail.clone(),
                r.reference.clone(),
                r.paid_at.to_rfc3339(),
                r.fx_rate.to_string(),
                r.fx_fee.to_string(),
                r.processing_fee.to_string(),
                r.fx_spread.to_string(),
                r.eta.to_string(),
            ])?;
        }
        csv.flush().map_err(|e| WorkflowError::Export {
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Renders the export as a string.
    ///
    /// # Example
    ///
    /// ```
    /// use payroll_cycle::workflow::ReconciliationLedger;
    ///
    /// let csv = ReconciliationLedger::new().export_csv().unwrap();
    /// assert!(csv.starts_with("payee_id,payee_name,amount,currency,status"));
    /// assert_eq!(csv.lines().count(), 1);
    /// ```
    pub fn export_csv(&self) -> WorkflowResult<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| WorkflowError::Export {
            message: e.to_string(),
        })
    }
}

/// Total of the FX fees and processing fees across receipts.
pub fn total_fees(receipts: &[PaymentReceipt]) -> Decimal {
    receipts.iter().map(|r| r.fx_fee + r.processing_fee).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BankHoliday, HolidaysConfig};
    use crate::models::EmploymentType;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(id: &str, country: &str, currency: &str, net_pay: &str) -> ContractorPayment {
        ContractorPayment {
            id: id.to_string(),
            name: format!("Payee {}", id),
            country: country.to_string(),
            currency: currency.to_string(),
            net_pay: dec(net_pay),
            est_fees: dec("3.50"),
            fx_rate: dec("0.92"),
            employment_type: EmploymentType::Contractor,
            employer_taxes: None,
            bank_details_on_file: true,
            documents_expire_on: None,
        }
    }

    // Thursday
    fn paid_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 12, 24, 15, 30, 0).unwrap()
    }

    fn ledger_with_three() -> ReconciliationLedger {
        let config = WorkflowConfig::default();
        let mut ledger = ReconciliationLedger::new();
        for (i, (id, country, currency)) in [
            ("ctr_001", "PT", "EUR"),
            ("ctr_002", "US", "USD"),
            ("ctr_003", "JP", "JPY"),
        ]
        .into_iter()
        .enumerate()
        {
            let receipt = build_receipt(
                &payment(id, country, currency, "1234.50"),
                format!("PAY-B1-{:03}", i + 1),
                paid_at(),
                &config,
            );
            ledger.record(receipt).unwrap();
        }
        ledger
    }

    #[test]
    fn test_instant_rail_is_paid_same_day() {
        let receipt = build_receipt(
            &payment("ctr_001", "PT", "EUR", "2000"),
            "PAY-B1-001",
            paid_at(),
            &WorkflowConfig::default(),
        );

        assert_eq!(receipt.status, ReceiptStatus::Paid);
        assert_eq!(receipt.rail, "SEPA Instant");
        assert_eq!(receipt.eta, date(2026, 12, 24));
        assert_eq!(receipt.fx_fee, dec("10.00"));
        assert_eq!(receipt.processing_fee, dec("3.50"));
    }

    #[test]
    fn test_fx_fee_rounds_to_cents() {
        let receipt = build_receipt(
            &payment("ctr_001", "PT", "EUR", "1234.50"),
            "PAY-B1-001",
            paid_at(),
            &WorkflowConfig::default(),
        );
        // 1234.50 * 0.005 = 6.1725
        assert_eq!(receipt.fx_fee, dec("6.17"));
    }

    #[test]
    fn test_slow_rail_skips_weekend() {
        // SWIFT default rail, 2 business days from Thursday.
        let receipt = build_receipt(
            &payment("ctr_003", "JP", "JPY", "100000"),
            "PAY-B1-001",
            paid_at(),
            &WorkflowConfig::default(),
        );
        assert_eq!(receipt.status, ReceiptStatus::InTransit);
        assert_eq!(receipt.rail, "SWIFT");
        assert_eq!(receipt.eta, date(2026, 12, 28));
    }

    #[test]
    fn test_slow_rail_skips_bank_holidays() {
        let holidays = HolidaysConfig {
            holidays: HashMap::from([(
                "US".to_string(),
                vec![BankHoliday {
                    date: date(2026, 12, 25),
                    name: "Christmas Day".to_string(),
                }],
            )]),
        };
        let config = WorkflowConfig::default().with_holidays(holidays);

        // ACH settles in 1 business day; Friday is a holiday.
        let receipt = build_receipt(
            &payment("ctr_002", "US", "USD", "500"),
            "PAY-B1-002",
            paid_at(),
            &config,
        );
        assert_eq!(receipt.eta, date(2026, 12, 28));
    }

    #[test]
    fn test_record_rejects_duplicate_payee() {
        let mut ledger = ledger_with_three();
        let duplicate = ledger.receipts()[0].clone();
        assert!(matches!(
            ledger.record(duplicate),
            Err(WorkflowError::InvalidState { .. })
        ));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_reschedule_changes_only_eta() {
        let mut ledger = ledger_with_three();
        let before = ledger.get("ctr_002").unwrap().clone();

        ledger
            .reschedule("ctr_002", date(2027, 1, 4), RescheduleReason::Holiday, date(2026, 12, 24))
            .unwrap();

        let after = ledger.get("ctr_002").unwrap();
        assert_eq!(after.eta, date(2027, 1, 4));
        assert_eq!(
            PaymentReceipt {
                eta: before.eta,
                ..after.clone()
            },
            before
        );
    }

    #[test]
    fn test_reschedule_rejects_invalid_dates() {
        let mut ledger = ledger_with_three();
        let before_payment = ledger.reschedule(
            "ctr_002",
            date(2026, 12, 23),
            RescheduleReason::BankDelay,
            date(2026, 12, 20),
        );
        assert!(matches!(before_payment, Err(WorkflowError::Validation { .. })));

        let in_past = ledger.reschedule(
            "ctr_002",
            date(2026, 12, 26),
            RescheduleReason::BankDelay,
            date(2026, 12, 30),
        );
        assert!(matches!(in_past, Err(WorkflowError::Validation { .. })));
    }

    #[test]
    fn test_reschedule_unknown_payee() {
        let mut ledger = ledger_with_three();
        let result = ledger.reschedule(
            "ctr_999",
            date(2027, 1, 4),
            RescheduleReason::Holiday,
            date(2026, 12, 24),
        );
        assert!(matches!(result, Err(WorkflowError::NotFound { .. })));
    }

    #[test]
    fn test_export_has_header_and_one_row_per_receipt() {
        let csv = ledger_with_three().export_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADERS.join(","));
        assert!(lines[1].starts_with("ctr_001,Payee ctr_001,1234.50,EUR,Paid,SEPA Instant,PAY-B1-001,"));
        assert!(!csv.contains('$'));
        assert!(!csv.contains('€'));
    }

    #[test]
    fn test_export_columns_parse_back() {
        let csv = ledger_with_three().export_csv().unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), CSV_HEADERS.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert_eq!(row.len(), CSV_HEADERS.len());
            assert!(Decimal::from_str(&row[2]).is_ok());
            assert!(Decimal::from_str(&row[9]).is_ok());
        }
        assert_eq!(&rows[2][4], "InTransit");
    }

    #[test]
    fn test_total_fees() {
        let ledger = ledger_with_three();
        // 3 * (6.17 + 3.50)
        assert_eq!(total_fees(ledger.receipts()), dec("29.01"));
    }
}
