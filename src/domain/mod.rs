//! Domain types for tournament ledgers.

pub mod ledger;
pub mod record;
pub mod schema;
pub mod stats;

pub use ledger::{DateRange, DisplayRow, Ledger, SortKey};
pub use record::{format_date, parse_date, Outcome, Record, DATE_FORMAT};
pub use schema::LedgerSchema;
pub use stats::{DerivedStats, ProfitPoint};
