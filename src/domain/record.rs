//! Tournament records and the rules they must satisfy.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::schema::LedgerSchema;
use crate::errors::{LedgerError, Result};

/// Textual form dates take on disk.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const ACCEPTED_DATE_FORMATS: [&str; 2] = [DATE_FORMAT, "%Y/%m/%d"];
const ACCEPTED_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// How a tournament result was recorded.
pub enum Outcome {
    /// Signed net result.
    ProfitLoss(f64),
    /// Total returned, before subtracting the entry fee.
    CashOut(f64),
}

impl Outcome {
    pub fn amount(&self) -> f64 {
        match self {
            Outcome::ProfitLoss(value) | Outcome::CashOut(value) => *value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One tournament entry.
pub struct Record {
    pub date: NaiveDate,
    pub tournament_name: String,
    pub entry_fee: f64,
    pub outcome: Outcome,
}

impl Record {
    pub fn profit_loss(
        date: NaiveDate,
        tournament_name: impl Into<String>,
        entry_fee: f64,
        profit_loss: f64,
    ) -> Self {
        Self {
            date,
            tournament_name: tournament_name.into(),
            entry_fee,
            outcome: Outcome::ProfitLoss(profit_loss),
        }
    }

    pub fn cash_out(
        date: NaiveDate,
        tournament_name: impl Into<String>,
        entry_fee: f64,
        cash_out: f64,
    ) -> Self {
        Self {
            date,
            tournament_name: tournament_name.into(),
            entry_fee,
            outcome: Outcome::CashOut(cash_out),
        }
    }

    /// Record for the minimal layout, which keeps only a date and a result.
    pub fn minimal(date: NaiveDate, profit_loss: f64) -> Self {
        Self::profit_loss(date, String::new(), 0.0, profit_loss)
    }

    /// Builds a record for `schema` from a raw outcome amount.
    pub fn for_schema(
        schema: LedgerSchema,
        date: NaiveDate,
        tournament_name: impl Into<String>,
        entry_fee: f64,
        amount: f64,
    ) -> Self {
        match schema {
            LedgerSchema::Minimal => Self::minimal(date, amount),
            LedgerSchema::ProfitLoss => Self::profit_loss(date, tournament_name, entry_fee, amount),
            LedgerSchema::CashOut => Self::cash_out(date, tournament_name, entry_fee, amount),
        }
    }

    /// Net result of the tournament.
    pub fn profit(&self) -> f64 {
        match self.outcome {
            Outcome::ProfitLoss(value) => value,
            Outcome::CashOut(value) => value - self.entry_fee,
        }
    }

    pub fn in_the_money(&self) -> bool {
        self.profit() > 0.0
    }

    /// Checks the field invariants and that the record fits `schema`.
    pub fn validate(&self, schema: LedgerSchema) -> Result<()> {
        if !self.entry_fee.is_finite() || !self.outcome.amount().is_finite() {
            return Err(LedgerError::Validation(
                "amounts must be finite numbers".into(),
            ));
        }
        if self.entry_fee < 0.0 {
            return Err(LedgerError::Validation(format!(
                "entry fee must not be negative (got {})",
                self.entry_fee
            )));
        }
        match (schema, self.outcome) {
            (LedgerSchema::CashOut, Outcome::CashOut(value)) => {
                if value < 0.0 {
                    return Err(LedgerError::Validation(format!(
                        "cash out must not be negative (got {value})"
                    )));
                }
            }
            (LedgerSchema::CashOut, Outcome::ProfitLoss(_)) => {
                return Err(LedgerError::Validation(
                    "ledger records cash outs, not profit/loss".into(),
                ));
            }
            (_, Outcome::CashOut(_)) => {
                return Err(LedgerError::Validation(
                    "ledger records profit/loss, not cash outs".into(),
                ));
            }
            (LedgerSchema::Minimal, Outcome::ProfitLoss(_)) => {
                if self.entry_fee != 0.0 || !self.tournament_name.is_empty() {
                    return Err(LedgerError::Validation(
                        "minimal ledgers keep neither tournament names nor entry fees".into(),
                    ));
                }
            }
            (LedgerSchema::ProfitLoss, Outcome::ProfitLoss(_)) => {}
        }
        Ok(())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.date.format(DATE_FORMAT))?;
        if !self.tournament_name.is_empty() {
            write!(f, " {}", self.tournament_name)?;
        }
        write!(f, " ({:+})", self.profit())
    }
}

/// Parses a date in any accepted textual form.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, and either of those followed by a
/// `HH:MM:SS` time part, which is discarded.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            ACCEPTED_DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn cash_out_profit_subtracts_entry_fee() {
        let record = Record::cash_out(day(1), "Daily", 1000.0, 1000.0);
        assert_eq!(record.profit(), 0.0);
        assert!(!record.in_the_money(), "break-even is not in the money");
    }

    #[test]
    fn negative_fee_is_rejected() {
        let record = Record::profit_loss(day(1), "Daily", -5.0, 10.0);
        let err = record.validate(LedgerSchema::ProfitLoss).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn negative_cash_out_is_rejected() {
        let record = Record::cash_out(day(1), "Daily", 5.0, -1.0);
        assert!(record.validate(LedgerSchema::CashOut).is_err());
    }

    #[test]
    fn outcome_kind_must_match_schema() {
        let record = Record::cash_out(day(1), "Daily", 5.0, 10.0);
        assert!(record.validate(LedgerSchema::ProfitLoss).is_err());
        let record = Record::profit_loss(day(1), "Daily", 5.0, 10.0);
        assert!(record.validate(LedgerSchema::CashOut).is_err());
        assert!(record.validate(LedgerSchema::Minimal).is_err());
        assert!(Record::minimal(day(1), -20.0)
            .validate(LedgerSchema::Minimal)
            .is_ok());
    }

    #[test]
    fn non_finite_amounts_are_rejected() {
        let record = Record::profit_loss(day(1), "Daily", 5.0, f64::NAN);
        assert!(record.validate(LedgerSchema::ProfitLoss).is_err());
    }

    #[test]
    fn parse_date_accepts_slash_and_time_forms() {
        assert_eq!(parse_date("2024/07/05"), Some(day(5)));
        assert_eq!(parse_date(" 2024-07-05 "), Some(day(5)));
        assert_eq!(parse_date("2024-07-05 00:00:00"), Some(day(5)));
        assert_eq!(parse_date("05.07.2024"), None);
    }
}
