//! Summary figures derived from a ledger. Never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ledger::Ledger;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
/// One point of the cumulative profit series.
pub struct ProfitPoint {
    pub date: NaiveDate,
    pub profit: f64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedStats {
    pub total_records: usize,
    pub total_profit: f64,
    pub total_entry_fees: f64,
    /// Percent; zero when no fees were paid.
    pub roi: f64,
    pub in_the_money_count: usize,
    /// Percent; zero for an empty ledger.
    pub itm_rate: f64,
    /// Running profit in ascending date order.
    pub cumulative_profit_series: Vec<ProfitPoint>,
}

impl DerivedStats {
    pub fn compute(ledger: &Ledger) -> Self {
        let total_records = ledger.len();
        let total_profit: f64 = ledger.records.iter().map(|r| r.profit()).sum();
        let total_entry_fees: f64 = ledger.records.iter().map(|r| r.entry_fee).sum();
        let in_the_money_count = ledger.records.iter().filter(|r| r.in_the_money()).count();

        let roi = if total_entry_fees != 0.0 {
            total_profit / total_entry_fees * 100.0
        } else {
            0.0
        };
        let itm_rate = if total_records != 0 {
            in_the_money_count as f64 / total_records as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_records,
            total_profit,
            total_entry_fees,
            roi,
            in_the_money_count,
            itm_rate,
            cumulative_profit_series: cumulative_series(ledger),
        }
    }

    /// Cumulative values only, in series order.
    pub fn series_values(&self) -> Vec<f64> {
        self.cumulative_profit_series
            .iter()
            .map(|point| point.cumulative)
            .collect()
    }
}

fn cumulative_series(ledger: &Ledger) -> Vec<ProfitPoint> {
    let mut running = 0.0;
    ledger
        .chronological()
        .into_iter()
        .map(|record| {
            let profit = record.profit();
            running += profit;
            ProfitPoint {
                date: record.date,
                profit,
                cumulative: running,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{record::Record, schema::LedgerSchema};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
    }

    #[test]
    fn two_record_scenario() {
        let ledger = Ledger::with_records(
            "alice",
            LedgerSchema::ProfitLoss,
            vec![
                Record::profit_loss(day(1), "", 1000.0, -1000.0),
                Record::profit_loss(day(5), "", 1500.0, 4500.0),
            ],
        );
        let stats = DerivedStats::compute(&ledger);
        assert_eq!(stats.total_profit, 3500.0);
        assert_eq!(stats.total_entry_fees, 2500.0);
        assert!((stats.roi - 140.0).abs() < 1e-9);
        assert!((stats.itm_rate - 50.0).abs() < 1e-9);
        assert_eq!(stats.series_values(), vec![-1000.0, 3500.0]);
        assert_eq!(stats.cumulative_profit_series[0].date, day(1));
    }

    #[test]
    fn empty_ledger_yields_zeroes() {
        let stats = DerivedStats::compute(&Ledger::new("bob", LedgerSchema::CashOut));
        assert_eq!(stats.roi, 0.0);
        assert_eq!(stats.itm_rate, 0.0);
        assert_eq!(stats.total_profit, 0.0);
        assert!(stats.cumulative_profit_series.is_empty());
    }

    #[test]
    fn zero_fees_yield_zero_roi() {
        let ledger = Ledger::with_records(
            "carol",
            LedgerSchema::Minimal,
            vec![Record::minimal(day(2), 250.0), Record::minimal(day(3), -50.0)],
        );
        let stats = DerivedStats::compute(&ledger);
        assert_eq!(stats.roi, 0.0);
        assert_eq!(stats.itm_rate, 50.0);
        assert_eq!(stats.total_profit, 200.0);
    }

    #[test]
    fn cash_out_break_even_is_not_in_the_money() {
        let ledger = Ledger::with_records(
            "dave",
            LedgerSchema::CashOut,
            vec![
                Record::cash_out(day(1), "Turbo", 500.0, 500.0),
                Record::cash_out(day(2), "Deep", 500.0, 1200.0),
            ],
        );
        let stats = DerivedStats::compute(&ledger);
        assert_eq!(stats.in_the_money_count, 1);
        assert_eq!(stats.total_profit, 700.0);
        assert!((stats.roi - 70.0).abs() < 1e-9);
    }

    #[test]
    fn series_ends_at_total_profit_regardless_of_order() {
        let records = vec![
            Record::profit_loss(day(9), "", 10.0, 30.0),
            Record::profit_loss(day(2), "", 10.0, -10.0),
            Record::profit_loss(day(4), "", 10.0, 5.5),
            Record::profit_loss(day(4), "", 10.0, -2.5),
        ];
        let mut reversed = records.clone();
        reversed.reverse();
        let a = DerivedStats::compute(&Ledger::with_records("x", LedgerSchema::ProfitLoss, records));
        let b =
            DerivedStats::compute(&Ledger::with_records("x", LedgerSchema::ProfitLoss, reversed));
        assert_eq!(a.total_profit, b.total_profit);
        let last = a.cumulative_profit_series.last().unwrap().cumulative;
        assert!((last - a.total_profit).abs() < 1e-9);
        for pair in a.cumulative_profit_series.windows(2) {
            assert_eq!(pair[1].cumulative >= pair[0].cumulative, pair[1].profit >= 0.0);
        }
    }
}
