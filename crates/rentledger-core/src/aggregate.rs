//! Status aggregation
//!
//! Pure roll-up of schedule rows into contract totals, and of contract
//! summaries into tenant or property totals. Cancelled rows never count.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::ScheduleRow;
use super::types::{RowStatus, ScheduleStatus};

/// Totals and status for a set of schedule rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub total_due: Decimal,
    pub total_paid: Decimal,
    pub outstanding: Decimal,
    pub overpaid: Decimal,
    /// Non-cancelled rows
    pub row_count: usize,
    pub pending_count: usize,
    pub partially_paid_count: usize,
    pub paid_count: usize,
    pub overdue_count: usize,
    pub cancelled_count: usize,
    /// Rows due before the as-of date that still owe money
    pub past_due_count: usize,
    pub past_due_amount: Decimal,
    pub status: ScheduleStatus,
    pub as_of: Option<NaiveDate>,
}

/// Roll rows up into a summary as of the given date
pub fn aggregate(rows: &[ScheduleRow], as_of: NaiveDate) -> ScheduleSummary {
    let mut summary = ScheduleSummary {
        as_of: Some(as_of),
        ..Default::default()
    };

    for row in rows {
        if row.status == RowStatus::Cancelled {
            summary.cancelled_count += 1;
            continue;
        }

        summary.row_count += 1;
        summary.total_due += row.amount_due;
        summary.total_paid += row.amount_paid;

        match row.status {
            RowStatus::Pending => summary.pending_count += 1,
            RowStatus::PartiallyPaid => summary.partially_paid_count += 1,
            RowStatus::Paid => summary.paid_count += 1,
            RowStatus::Overdue => summary.overdue_count += 1,
            RowStatus::Cancelled => {}
        }

        if row.due_date < as_of && row.outstanding > Decimal::ZERO {
            summary.past_due_count += 1;
            summary.past_due_amount += row.outstanding;
        }
    }

    finish(&mut summary);
    summary
}

/// Combine several summaries, e.g. every contract of a tenant
pub fn aggregate_many<'a, I>(summaries: I) -> ScheduleSummary
where
    I: IntoIterator<Item = &'a ScheduleSummary>,
{
    let mut total = ScheduleSummary::default();

    for s in summaries {
        total.total_due += s.total_due;
        total.total_paid += s.total_paid;
        total.row_count += s.row_count;
        total.pending_count += s.pending_count;
        total.partially_paid_count += s.partially_paid_count;
        total.paid_count += s.paid_count;
        total.overdue_count += s.overdue_count;
        total.cancelled_count += s.cancelled_count;
        total.past_due_count += s.past_due_count;
        total.past_due_amount += s.past_due_amount;
        total.as_of = match (total.as_of, s.as_of) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    finish(&mut total);
    total
}

fn finish(summary: &mut ScheduleSummary) {
    summary.outstanding = (summary.total_due - summary.total_paid).max(Decimal::ZERO);
    summary.overpaid = (summary.total_paid - summary.total_due).max(Decimal::ZERO);
    summary.status = if summary.row_count > 0 && summary.outstanding <= Decimal::ZERO {
        ScheduleStatus::Completed
    } else if summary.past_due_count > 0 {
        ScheduleStatus::Overdue
    } else {
        ScheduleStatus::Active
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentAllocation;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(id: &str, due: NaiveDate, amount: i64) -> ScheduleRow {
        ScheduleRow::new(id.to_string(), "RC-00001".to_string(), due, Decimal::new(amount, 0))
    }

    fn pay(row: &mut ScheduleRow, amount: i64) {
        row.allocate(PaymentAllocation {
            payment_id: Some("PAY-00001".to_string()),
            amount: Decimal::new(amount, 0),
            date: row.due_date,
            reference: None,
            mode: None,
        });
    }

    #[test]
    fn test_active_when_nothing_past_due() {
        let rows = vec![row("1", date(2025, 4, 5), 1000), row("2", date(2025, 5, 5), 1000)];
        let summary = aggregate(&rows, date(2025, 4, 1));

        assert_eq!(summary.status, ScheduleStatus::Active);
        assert_eq!(summary.total_due, Decimal::new(2000, 0));
        assert_eq!(summary.outstanding, Decimal::new(2000, 0));
        assert_eq!(summary.pending_count, 2);
    }

    #[test]
    fn test_overdue_when_past_due_outstanding() {
        let mut rows = vec![row("1", date(2025, 3, 5), 1000), row("2", date(2025, 4, 5), 1000)];
        pay(&mut rows[0], 400);
        let summary = aggregate(&rows, date(2025, 3, 20));

        assert_eq!(summary.status, ScheduleStatus::Overdue);
        assert_eq!(summary.past_due_count, 1);
        assert_eq!(summary.past_due_amount, Decimal::new(600, 0));
        assert_eq!(summary.partially_paid_count, 1);
    }

    #[test]
    fn test_completed_and_cancelled_excluded() {
        let mut rows = vec![row("1", date(2025, 3, 5), 1000), row("2", date(2025, 4, 5), 1000)];
        pay(&mut rows[0], 1000);
        rows[1].status = RowStatus::Cancelled;
        let summary = aggregate(&rows, date(2025, 6, 1));

        assert_eq!(summary.status, ScheduleStatus::Completed);
        assert_eq!(summary.row_count, 1);
        assert_eq!(summary.cancelled_count, 1);
        assert!(summary.outstanding.is_zero());
    }

    #[test]
    fn test_empty_rows_are_active() {
        let summary = aggregate(&[], date(2025, 1, 1));
        assert_eq!(summary.status, ScheduleStatus::Active);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let mut rows = vec![row("1", date(2025, 3, 5), 1000)];
        pay(&mut rows[0], 250);
        let first = aggregate(&rows, date(2025, 3, 10));
        let second = aggregate(&rows, date(2025, 3, 10));
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_many() {
        let mut paid = vec![row("1", date(2025, 1, 5), 1000)];
        pay(&mut paid[0], 1000);
        let late = vec![row("2", date(2025, 2, 5), 800)];

        let a = aggregate(&paid, date(2025, 3, 1));
        let b = aggregate(&late, date(2025, 3, 1));
        let total = aggregate_many([&a, &b]);

        assert_eq!(total.status, ScheduleStatus::Overdue);
        assert_eq!(total.total_due, Decimal::new(1800, 0));
        assert_eq!(total.outstanding, Decimal::new(800, 0));
        assert_eq!(total.row_count, 2);
        assert_eq!(total.as_of, Some(date(2025, 3, 1)));

        let only_paid = aggregate_many([&a]);
        assert_eq!(only_paid.status, ScheduleStatus::Completed);
    }
}
