//! The per-identity record table and its display views.

use std::{cmp::Ordering, fmt};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{record::Record, schema::LedgerSchema};
use crate::errors::{LedgerError, Result};

/// Ordered collection of records owned by a single identity.
///
/// Records are kept descending by date; ties keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub owner: String,
    pub schema: LedgerSchema,
    pub records: Vec<Record>,
}

impl Ledger {
    pub fn new(owner: impl Into<String>, schema: LedgerSchema) -> Self {
        Self {
            owner: owner.into(),
            schema,
            records: Vec::new(),
        }
    }

    pub fn with_records(
        owner: impl Into<String>,
        schema: LedgerSchema,
        records: Vec<Record>,
    ) -> Self {
        let mut ledger = Self {
            owner: owner.into(),
            schema,
            records,
        };
        ledger.sort_canonical();
        ledger
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<&Record> {
        self.records.get(index)
    }

    /// Stable sort into storage order: newest date first.
    pub fn sort_canonical(&mut self) {
        self.records.sort_by(|a, b| b.date.cmp(&a.date));
    }

    /// Appends `record` and restores canonical order.
    pub fn push(&mut self, record: Record) -> Result<()> {
        record.validate(self.schema)?;
        self.records.push(record);
        self.sort_canonical();
        Ok(())
    }

    /// Removes the record at `index` (canonical position).
    pub fn remove(&mut self, index: usize) -> Result<Record> {
        if index >= self.records.len() {
            return Err(LedgerError::NotFound(format!(
                "row {} does not exist (ledger has {} records)",
                index,
                self.records.len()
            )));
        }
        let removed = self.records.remove(index);
        self.sort_canonical();
        Ok(removed)
    }

    /// Records ordered ascending by date, ties in current ledger order.
    pub fn chronological(&self) -> Vec<&Record> {
        let mut ordered: Vec<&Record> = self.records.iter().collect();
        ordered.sort_by(|a, b| a.date.cmp(&b.date));
        ordered
    }

    /// Retains records inside `range`, then sorts descending by `key`.
    ///
    /// Every row keeps the canonical index of its record so a caller can
    /// delete from a filtered or re-sorted view.
    pub fn filter_and_sort(&self, range: &DateRange, key: SortKey) -> Vec<DisplayRow> {
        let mut rows: Vec<DisplayRow> = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| range.contains(record.date))
            .map(|(index, record)| DisplayRow {
                index,
                record: record.clone(),
            })
            .collect();
        rows.sort_by(|a, b| key.compare(&b.record, &a.record));
        rows
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A record as shown in a view, paired with its ledger position.
pub struct DisplayRow {
    pub index: usize,
    pub record: Record,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Inclusive date filter; a missing bound is open.
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(Some(start), Some(end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Column a display view is ordered by.
pub enum SortKey {
    #[default]
    Date,
    TournamentName,
    EntryFee,
    /// The stored outcome amount: profit/loss or cash out.
    Outcome,
    Profit,
}

impl SortKey {
    fn compare(self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortKey::Date => a.date.cmp(&b.date),
            SortKey::TournamentName => a.tournament_name.cmp(&b.tournament_name),
            SortKey::EntryFee => a.entry_fee.total_cmp(&b.entry_fee),
            SortKey::Outcome => a.outcome.amount().total_cmp(&b.outcome.amount()),
            SortKey::Profit => a.profit().total_cmp(&b.profit()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortKey::Date => "date",
            SortKey::TournamentName => "name",
            SortKey::EntryFee => "fee",
            SortKey::Outcome => "outcome",
            SortKey::Profit => "profit",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for SortKey {
    type Err = LedgerError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortKey::Date),
            "name" | "tournament" | "tournament_name" => Ok(SortKey::TournamentName),
            "fee" | "entry_fee" => Ok(SortKey::EntryFee),
            "outcome" | "cash_out" | "profit_loss" | "amount" => Ok(SortKey::Outcome),
            "profit" => Ok(SortKey::Profit),
            other => Err(LedgerError::Validation(format!("unknown sort key `{other}`"))),
        }
    }
}
