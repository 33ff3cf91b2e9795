//! Booking money relations.
//!
//! `grand_total = sub_total - discount` and `balance_due = grand_total - deposit`.
//! How strictly they hold is decided by [`TotalsPolicy`].

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::TotalsPolicy;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub sub_total: Decimal,
    pub discount: Decimal,
    pub grand_total: Decimal,
    pub deposit: Decimal,
    pub balance_due: Decimal,
}

impl Totals {
    /// Fills in `grand_total` and `balance_due` when they were not supplied.
    pub fn derive(
        sub_total: Decimal,
        discount: Decimal,
        grand_total: Option<Decimal>,
        deposit: Decimal,
        balance_due: Option<Decimal>,
    ) -> Result<Self, ServiceError> {
        let grand_total = match grand_total {
            Some(value) => value,
            None => difference("grand_total", sub_total, discount)?,
        };
        let balance_due = match balance_due {
            Some(value) => value,
            None => difference("balance_due", grand_total, deposit)?,
        };
        Ok(Self {
            sub_total,
            discount,
            grand_total,
            deposit,
            balance_due,
        })
    }

    fn grand_total_consistent(&self) -> bool {
        self.sub_total.checked_sub(self.discount) == Some(self.grand_total)
    }

    fn balance_due_consistent(&self) -> bool {
        self.grand_total.checked_sub(self.deposit) == Some(self.balance_due)
    }

    pub fn check_non_negative(&self) -> Result<(), ServiceError> {
        for (field, value) in [
            ("sub_total", self.sub_total),
            ("discount", self.discount),
            ("grand_total", self.grand_total),
            ("deposit", self.deposit),
            ("balance_due", self.balance_due),
        ] {
            if value < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "{} must not be negative (got {})",
                    field, value
                )));
            }
        }
        Ok(())
    }

    /// Applies `policy` for the given stage.
    pub fn enforce(&self, policy: TotalsPolicy, stage: Stage) -> Result<(), ServiceError> {
        match (policy, stage) {
            (TotalsPolicy::Off, _) | (TotalsPolicy::EnforceOnCreate, Stage::Update) => Ok(()),
            (TotalsPolicy::EnforceOnCreate, Stage::Create) => {
                self.require_grand_total()?;
                if !self.balance_due_consistent() {
                    warn!(
                        grand_total = %self.grand_total,
                        deposit = %self.deposit,
                        balance_due = %self.balance_due,
                        "balance_due does not equal grand_total - deposit"
                    );
                }
                Ok(())
            }
            (TotalsPolicy::Always, _) => {
                self.require_grand_total()?;
                if !self.balance_due_consistent() {
                    return Err(ServiceError::ValidationError(format!(
                        "balance_due {} must equal grand_total {} - deposit {}",
                        self.balance_due, self.grand_total, self.deposit
                    )));
                }
                Ok(())
            }
        }
    }

    fn require_grand_total(&self) -> Result<(), ServiceError> {
        if self.grand_total_consistent() {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(format!(
                "grand_total {} must equal sub_total {} - discount {}",
                self.grand_total, self.sub_total, self.discount
            )))
        }
    }
}

fn difference(field: &str, lhs: Decimal, rhs: Decimal) -> Result<Decimal, ServiceError> {
    lhs.checked_sub(rhs).ok_or_else(|| {
        ServiceError::ValidationError(format!("{} of {} - {} overflows", field, lhs, rhs))
    })
}
