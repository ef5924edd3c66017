//! CSV encoding of ledgers.
//!
//! Header row is mandatory. Dates are written `YYYY-MM-DD`, amounts as plain
//! decimal text.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Terminator, Trim, WriterBuilder};

use crate::{
    domain::{
        format_date, parse_date,
        schema::{COL_DATE, COL_ENTRY_FEE, COL_TOURNAMENT},
        LedgerSchema, Outcome, Record,
    },
    errors::{LedgerError, Result},
};

/// Serializes `records` under `schema`'s column layout.
pub fn encode(schema: LedgerSchema, records: &[Record]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(schema.columns())?;
    for record in records {
        let amount = format_amount(record.outcome.amount());
        if schema.has_details() {
            writer.write_record([
                format_date(record.date),
                record.tournament_name.clone(),
                format_amount(record.entry_fee),
                amount,
            ])?;
        } else {
            writer.write_record([format_date(record.date), amount])?;
        }
    }

    writer
        .into_inner()
        .map_err(|err| LedgerError::Io(err.into_error()))
}

/// Parses CSV bytes that must carry exactly `schema`'s columns, in any order.
///
/// Headers, dates and amounts are trimmed; tournament names are kept verbatim.
///
/// Unparseable cells fail with [`LedgerError::Schema`]; rows that parse but
/// break a record invariant fail with [`LedgerError::Validation`]. Nothing is
/// skipped.
pub fn decode(schema: LedgerSchema, bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::Headers)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let names: Vec<&str> = headers.iter().collect();
    schema.ensure_headers(&names)?;
    let columns = ColumnMap::new(&headers);

    let mut records = Vec::new();
    for (offset, row) in reader.records().enumerate() {
        // Header occupies line 1.
        let line = offset + 2;
        let row = row?;
        let record = columns.record(schema, &row, line)?;
        record
            .validate(schema)
            .map_err(|err| LedgerError::Validation(format!("line {line}: {err}")))?;
        records.push(record);
    }
    tracing::debug!(rows = records.len(), %schema, "decoded ledger rows");
    Ok(records)
}

struct ColumnMap {
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    fn new(headers: &StringRecord) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { positions }
    }

    fn cell<'r>(&self, row: &'r StringRecord, column: &str, line: usize) -> Result<&'r str> {
        self.positions
            .get(column)
            .and_then(|idx| row.get(*idx))
            .ok_or_else(|| LedgerError::Schema(format!("line {line}: missing `{column}` value")))
    }

    fn amount(&self, row: &StringRecord, column: &str, line: usize) -> Result<f64> {
        let raw = self.cell(row, column, line)?.trim();
        raw.parse::<f64>().map_err(|_| {
            LedgerError::Schema(format!("line {line}: `{column}` is not a number: `{raw}`"))
        })
    }

    fn record(&self, schema: LedgerSchema, row: &StringRecord, line: usize) -> Result<Record> {
        let raw_date = self.cell(row, COL_DATE, line)?.trim();
        let date = parse_date(raw_date).ok_or_else(|| {
            LedgerError::Schema(format!("line {line}: unrecognised date `{raw_date}`"))
        })?;
        let amount = self.amount(row, schema.outcome_column(), line)?;
        if !schema.has_details() {
            return Ok(Record::minimal(date, amount));
        }

        let tournament_name = self.cell(row, COL_TOURNAMENT, line)?.to_string();
        let entry_fee = self.amount(row, COL_ENTRY_FEE, line)?;
        let outcome = if schema.uses_cash_out() {
            Outcome::CashOut(amount)
        } else {
            Outcome::ProfitLoss(amount)
        };
        Ok(Record {
            date,
            tournament_name,
            entry_fee,
            outcome,
        })
    }
}

/// Plain decimal text; `-0` is written as `0`.
pub fn format_amount(value: f64) -> String {
    if value == 0.0 {
        "0".into()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn encode_writes_header_and_plain_numbers() {
        let records = vec![
            Record::profit_loss(day(5), "Sunday Major", 1500.0, 4500.0),
            Record::profit_loss(day(1), "Turbo, late reg", 12.5, -12.5),
        ];
        let bytes = encode(LedgerSchema::ProfitLoss, &records).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(
            text,
            "Date,Tournament Name,Entry Fee,Profit/Loss\n\
             2024-07-05,Sunday Major,1500,4500\n\
             2024-07-01,\"Turbo, late reg\",12.5,-12.5\n"
        );
    }

    #[test]
    fn encode_minimal_has_two_columns() {
        let bytes = encode(LedgerSchema::Minimal, &[Record::minimal(day(2), -0.0)]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "Date,Profit/Loss\n2024-07-02,0\n"
        );
    }

    #[test]
    fn decode_accepts_reordered_columns_and_slash_dates() {
        let input = b"Cash Out,Entry Fee,Date,Tournament Name\n800,200,2024/07/03,Nightly\n";
        let records = decode(LedgerSchema::CashOut, input).unwrap();
        assert_eq!(records, vec![Record::cash_out(day(3), "Nightly", 200.0, 800.0)]);
    }

    #[test]
    fn decode_trims_values_but_not_names() {
        let input = b" Date , Tournament Name ,Entry Fee,Profit/Loss\n 2024-07-04 ,  Padded  , 100 , -5 \n";
        let records = decode(LedgerSchema::ProfitLoss, input).unwrap();
        assert_eq!(records, vec![Record::profit_loss(day(4), "  Padded  ", 100.0, -5.0)]);
    }

    #[test]
    fn decode_reports_bad_numbers_with_line() {
        let input = b"Date,Profit/Loss\n2024-07-01,10\n2024-07-02,lots\n";
        let err = decode(LedgerSchema::Minimal, input).unwrap_err();
        match err {
            LedgerError::Schema(message) => assert!(message.contains("line 3"), "{message}"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn decode_rejects_short_rows() {
        let input = b"Date,Tournament Name,Entry Fee,Profit/Loss\n2024-07-01,Daily,100\n";
        let err = decode(LedgerSchema::ProfitLoss, input).unwrap_err();
        assert!(matches!(err, LedgerError::Schema(_)), "{err:?}");
    }

    #[test]
    fn decode_rejects_negative_fee_rows() {
        let input = b"Date,Tournament Name,Entry Fee,Profit/Loss\n2024-07-01,Daily,-100,5\n";
        let err = decode(LedgerSchema::ProfitLoss, input).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)), "{err:?}");
    }

    #[test]
    fn decode_empty_payload_reports_missing_columns() {
        let err = decode(LedgerSchema::ProfitLoss, b"").unwrap_err();
        assert!(err.to_string().contains("missing"), "{err}");
    }
}
