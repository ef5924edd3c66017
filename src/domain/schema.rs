//! Column layouts a ledger sink may use.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

pub const COL_DATE: &str = "Date";
pub const COL_TOURNAMENT: &str = "Tournament Name";
pub const COL_ENTRY_FEE: &str = "Entry Fee";
pub const COL_PROFIT_LOSS: &str = "Profit/Loss";
pub const COL_CASH_OUT: &str = "Cash Out";

/// Versioned schema descriptor. Each variant enumerates the exact column set
/// its sink carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSchema {
    /// `Date, Profit/Loss`
    Minimal,
    /// `Date, Tournament Name, Entry Fee, Profit/Loss`
    #[default]
    ProfitLoss,
    /// `Date, Tournament Name, Entry Fee, Cash Out`
    CashOut,
}

impl LedgerSchema {
    pub const ALL: [LedgerSchema; 3] = [
        LedgerSchema::Minimal,
        LedgerSchema::ProfitLoss,
        LedgerSchema::CashOut,
    ];

    /// Canonical column order used when writing.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            LedgerSchema::Minimal => &[COL_DATE, COL_PROFIT_LOSS],
            LedgerSchema::ProfitLoss => &[COL_DATE, COL_TOURNAMENT, COL_ENTRY_FEE, COL_PROFIT_LOSS],
            LedgerSchema::CashOut => &[COL_DATE, COL_TOURNAMENT, COL_ENTRY_FEE, COL_CASH_OUT],
        }
    }

    pub fn has_details(self) -> bool {
        !matches!(self, LedgerSchema::Minimal)
    }

    pub fn uses_cash_out(self) -> bool {
        matches!(self, LedgerSchema::CashOut)
    }

    /// Label of the column holding the outcome amount.
    pub fn outcome_column(self) -> &'static str {
        if self.uses_cash_out() {
            COL_CASH_OUT
        } else {
            COL_PROFIT_LOSS
        }
    }

    /// Identifies the schema whose column set equals `headers`, ignoring order.
    pub fn negotiate<S: AsRef<str>>(headers: &[S]) -> Option<LedgerSchema> {
        let found = header_set(headers);
        if found.len() != headers.len() {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|schema| found == schema.columns().iter().copied().collect::<BTreeSet<_>>())
    }

    /// Checks that `headers` is exactly this schema's column set.
    ///
    /// The error names the missing and unexpected columns, and the layout the
    /// headers do match when they belong to another known schema.
    pub fn ensure_headers<S: AsRef<str>>(self, headers: &[S]) -> Result<()> {
        let found = header_set(headers);
        let expected: BTreeSet<&str> = self.columns().iter().copied().collect();
        if found == expected && found.len() == headers.len() {
            return Ok(());
        }

        let missing: Vec<&str> = expected.difference(&found).copied().collect();
        let unexpected: Vec<&str> = found.difference(&expected).copied().collect();
        let mut message = format!("expected columns [{}]", self.columns().join(", "));
        if !missing.is_empty() {
            message.push_str(&format!("; missing [{}]", missing.join(", ")));
        }
        if !unexpected.is_empty() {
            message.push_str(&format!("; unexpected [{}]", unexpected.join(", ")));
        }
        if found.len() != headers.len() {
            message.push_str("; duplicate column names");
        }
        if let Some(other) = Self::negotiate(headers) {
            message.push_str(&format!(" (file uses the {other} layout)"));
        }
        Err(LedgerError::Schema(message))
    }
}

fn header_set<S: AsRef<str>>(headers: &[S]) -> BTreeSet<&str> {
    headers.iter().map(|h| h.as_ref().trim()).collect()
}

impl fmt::Display for LedgerSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LedgerSchema::Minimal => "minimal",
            LedgerSchema::ProfitLoss => "profit_loss",
            LedgerSchema::CashOut => "cash_out",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for LedgerSchema {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "minimal" => Ok(LedgerSchema::Minimal),
            "profit_loss" | "profit" => Ok(LedgerSchema::ProfitLoss),
            "cash_out" | "cashout" => Ok(LedgerSchema::CashOut),
            other => Err(LedgerError::Config(format!("unknown schema `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_ignores_column_order() {
        let headers = ["Cash Out", "Date", "Entry Fee", "Tournament Name"];
        assert_eq!(LedgerSchema::negotiate(&headers), Some(LedgerSchema::CashOut));
        assert_eq!(
            LedgerSchema::negotiate(&["Profit/Loss", " Date "]),
            Some(LedgerSchema::Minimal)
        );
    }

    #[test]
    fn negotiate_rejects_extra_columns() {
        let headers = ["Date", "Profit/Loss", "Notes"];
        assert_eq!(LedgerSchema::negotiate(&headers), None);
    }

    #[test]
    fn ensure_headers_names_missing_and_unexpected_columns() {
        let err = LedgerSchema::ProfitLoss
            .ensure_headers(&["Date", "Tournament Name", "Entry Fee", "Cash Out"])
            .expect_err("cash out layout must not satisfy profit/loss");
        let message = err.to_string();
        assert!(message.contains("missing [Profit/Loss]"), "{message}");
        assert!(message.contains("unexpected [Cash Out]"), "{message}");
        assert!(message.contains("cash_out layout"), "{message}");
    }

    #[test]
    fn ensure_headers_rejects_duplicates() {
        let err = LedgerSchema::Minimal
            .ensure_headers(&["Date", "Profit/Loss", "Date"])
            .expect_err("duplicate header");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn parses_schema_names() {
        assert_eq!("cash-out".parse::<LedgerSchema>().unwrap(), LedgerSchema::CashOut);
        assert!("bogus".parse::<LedgerSchema>().is_err());
    }
}
