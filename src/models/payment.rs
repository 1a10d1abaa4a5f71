//! Batch payment model.
//!
//! This module defines the [`ContractorPayment`] struct and [`EmploymentType`]
//! enum for the people paid by an admin payroll batch.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Represents how a payee is engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    /// On payroll; the employer also owes employer taxes.
    Employee,
    /// Independent contractor; no employer taxes.
    Contractor,
}

fn default_bank_details_on_file() -> bool {
    true
}

/// A single payment queued in an admin batch.
///
/// `employer_taxes` is only meaningful for [`EmploymentType::Employee`] and
/// feeds the approval threshold. Contractors never contribute to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractorPayment {
    /// Unique identifier for the payee.
    pub id: String,
    /// Payee display name.
    pub name: String,
    /// ISO country code of the payee's bank.
    pub country: String,
    /// ISO currency the payee is paid in.
    pub currency: String,
    /// Net amount paid to the payee, in `currency`.
    pub net_pay: Decimal,
    /// Estimated processing fees.
    pub est_fees: Decimal,
    /// Locked FX rate from the reference currency.
    pub fx_rate: Decimal,
    /// How the payee is engaged.
    pub employment_type: EmploymentType,
    /// Employer-side taxes, employees only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_taxes: Option<Decimal>,
    /// Whether bank details are on file.
    #[serde(default = "default_bank_details_on_file")]
    pub bank_details_on_file: bool,
    /// When the payee's documents expire, if tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents_expire_on: Option<NaiveDate>,
}

impl ContractorPayment {
    /// Returns true if the payee is on payroll.
    pub fn is_employee(&self) -> bool {
        self.employment_type == EmploymentType::Employee
    }

    /// Total employer cost of an employee (`net_pay + employer_taxes`).
    ///
    /// Returns `None` for contractors.
    ///
    /// ```
    /// use payroll_cycle::models::{ContractorPayment, EmploymentType};
    /// use rust_decimal::Decimal;
    ///
    /// let payment = ContractorPayment {
    ///     id: "emp_001".to_string(),
    ///     name: "Ana Costa".to_string(),
    ///     country: "PT".to_string(),
    ///     currency: "EUR".to_string(),
    ///     net_pay: Decimal::new(25000, 0),
    ///     est_fees: Decimal::new(5, 0),
    ///     fx_rate: Decimal::ONE,
    ///     employment_type: EmploymentType::Employee,
    ///     employer_taxes: Some(Decimal::new(5000, 0)),
    ///     bank_details_on_file: true,
    ///     documents_expire_on: None,
    /// };
    /// assert_eq!(payment.employer_cost(), Some(Decimal::new(30000, 0)));
    /// ```
    pub fn employer_cost(&self) -> Option<Decimal> {
        if self.is_employee() {
            Some(self.net_pay + self.employer_taxes.unwrap_or(Decimal::ZERO))
        } else {
            None
        }
    }

    /// Net pay converted to the reference currency, rounded to cents.
    ///
    /// `fx_rate` is quoted as local units per reference unit, so the
    /// conversion is `net_pay / fx_rate`. Returns `None` for a rate that is
    /// not positive.
    pub fn reference_net_pay(&self) -> Option<Decimal> {
        if self.fx_rate <= Decimal::ZERO {
            return None;
        }
        self.net_pay
            .checked_div(self.fx_rate)
            .map(|amount| amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}
