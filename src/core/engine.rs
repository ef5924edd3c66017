//! Ledger engine: every mutation goes through here and is persisted before
//! the new state is handed back.
//!
//! Each mutation rewrites the whole sink, so persistence cost grows linearly
//! with ledger size. Ledgers are personal-scale; there is no incremental
//! append path.

use crate::{
    domain::{DateRange, DerivedStats, DisplayRow, Ledger, LedgerSchema, Record, SortKey},
    errors::Result,
    storage::{codec, LedgerSink},
};

use super::session::{demo_records, Session};

pub struct LedgerEngine {
    storage: Box<dyn LedgerSink>,
    schema: LedgerSchema,
    seed_demo: bool,
}

impl LedgerEngine {
    pub fn new(storage: Box<dyn LedgerSink>, schema: LedgerSchema) -> Self {
        Self {
            storage,
            schema,
            seed_demo: false,
        }
    }

    /// Seeds empty ephemeral ledgers with example rows on load.
    pub fn with_demo_seed(mut self, enabled: bool) -> Self {
        self.seed_demo = enabled;
        self
    }

    pub fn schema(&self) -> LedgerSchema {
        self.schema
    }

    pub fn storage(&self) -> &dyn LedgerSink {
        self.storage.as_ref()
    }

    /// Reads the session's ledger. A missing sink is an empty ledger.
    pub fn load(&self, session: &Session) -> Result<Ledger> {
        let identity = session.identity();
        let Some(bytes) = self.storage.read(identity)? else {
            let ledger = if session.is_ephemeral() && self.seed_demo {
                let today = session.started_at().date_naive();
                Ledger::with_records(identity, self.schema, demo_records(self.schema, today))
            } else {
                Ledger::new(identity, self.schema)
            };
            tracing::info!(%identity, records = ledger.len(), "no ledger on disk; starting fresh");
            return Ok(ledger);
        };
        let records = codec::decode(self.schema, &bytes)?;
        let ledger = Ledger::with_records(identity, self.schema, records);
        tracing::info!(%identity, records = ledger.len(), "ledger loaded");
        Ok(ledger)
    }

    /// Validates and appends `record`, persists, and returns the new state.
    pub fn add_record(&self, ledger: &Ledger, record: Record) -> Result<Ledger> {
        let mut next = ledger.clone();
        next.push(record)?;
        self.persist(&next)?;
        tracing::info!(identity = %next.owner, records = next.len(), "record added");
        Ok(next)
    }

    /// Removes the record at canonical position `index`, persists, and returns
    /// the new state.
    pub fn delete_record(&self, ledger: &Ledger, index: usize) -> Result<Ledger> {
        let mut next = ledger.clone();
        let removed = next.remove(index)?;
        self.persist(&next)?;
        tracing::info!(identity = %next.owner, %removed, "record deleted");
        Ok(next)
    }

    /// Replaces the session's ledger with the rows in `bytes`.
    ///
    /// All or nothing: the payload must carry exactly the declared columns and
    /// every row must decode and validate, otherwise the sink is not touched.
    pub fn import(&self, session: &Session, bytes: &[u8]) -> Result<Ledger> {
        let records = codec::decode(self.schema, bytes).map_err(|err| {
            tracing::warn!(identity = %session.identity(), error = %err, "import rejected");
            err
        })?;
        let ledger = Ledger::with_records(session.identity(), self.schema, records);
        self.persist(&ledger)?;
        tracing::info!(identity = %ledger.owner, records = ledger.len(), "ledger imported");
        Ok(ledger)
    }

    /// Serializes `ledger` in the sink format. No side effects.
    pub fn export(ledger: &Ledger) -> Result<Vec<u8>> {
        codec::encode(ledger.schema, &ledger.records)
    }

    pub fn compute_stats(ledger: &Ledger) -> DerivedStats {
        DerivedStats::compute(ledger)
    }

    pub fn filter_and_sort(ledger: &Ledger, range: &DateRange, key: SortKey) -> Vec<DisplayRow> {
        ledger.filter_and_sort(range, key)
    }

    /// Ends `session`, deleting its sink when the session is ephemeral.
    pub fn end_session(&self, session: &Session) -> Result<bool> {
        if !session.is_ephemeral() {
            return Ok(false);
        }
        let removed = self.storage.remove(session.identity())?;
        tracing::info!(identity = %session.identity(), removed, "ephemeral ledger discarded");
        Ok(removed)
    }

    fn persist(&self, ledger: &Ledger) -> Result<()> {
        let bytes = Self::export(ledger)?;
        self.storage.write(&ledger.owner, &bytes)
    }
}
