//! Late-fee and overdue marking, fee waivers and reminder selection

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::error::{CoreError, CoreResult};
use super::models::ScheduleRow;
use super::types::RowStatus;

/// Mark Pending rows past their grace period as Overdue.
///
/// The late fee is applied once per row; running the pass again on the same
/// rows changes nothing. Returns the ids of newly marked rows.
pub fn mark_overdue(
    rows: &mut [ScheduleRow],
    late_fee: Decimal,
    grace_days: u32,
    today: NaiveDate,
) -> Vec<String> {
    let mut marked = Vec::new();

    for row in rows.iter_mut() {
        if row.status != RowStatus::Pending || today <= row.grace_end(grace_days) {
            continue;
        }

        row.marked_overdue_on = Some(today);
        if late_fee > Decimal::ZERO && row.late_fee.is_zero() {
            row.late_fee = late_fee;
        }
        row.recalculate();

        log::info!(
            "Row {} due {} marked overdue ({} days past grace)",
            row.id,
            row.due_date,
            overdue_days(row, grace_days, today)
        );
        marked.push(row.id.clone());
    }

    marked
}

/// Days past the end of the grace period, zero when not yet late
pub fn overdue_days(row: &ScheduleRow, grace_days: u32, today: NaiveDate) -> i64 {
    (today - row.grace_end(grace_days)).num_days().max(0)
}

/// Waive part or all of the late fee applied to a row
pub fn waive_late_fee(row: &mut ScheduleRow, amount: Decimal, reason: &str) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::NonPositiveAmount {
            field: "waived_amount".to_string(),
        });
    }
    if row.status == RowStatus::Cancelled {
        return Err(CoreError::InvalidTransition {
            action: "waive the late fee of".to_string(),
            status: row.status.to_string(),
        });
    }
    if amount > row.late_fee {
        return Err(CoreError::validation(format!(
            "Waived amount {} cannot exceed the late fee {}",
            amount, row.late_fee
        )));
    }

    row.waived_late_fee = amount;
    row.waiver_reason = Some(reason.to_string());
    row.recalculate();
    Ok(())
}

/// Rows that should get a payment reminder today
pub fn due_reminders(rows: &[ScheduleRow], today: NaiveDate, interval_days: i64) -> Vec<&ScheduleRow> {
    rows.iter()
        .filter(|r| matches!(r.status, RowStatus::Overdue | RowStatus::PartiallyPaid))
        .filter(|r| match r.last_reminder_date {
            Some(last) => (today - last).num_days() > interval_days,
            None => true,
        })
        .collect()
}

/// Note that a reminder went out for a row
pub fn record_reminder(row: &mut ScheduleRow, today: NaiveDate) {
    row.reminder_count += 1;
    row.last_reminder_date = Some(today);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentAllocation;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn march_row() -> ScheduleRow {
        ScheduleRow::new("RC-00001-003".into(), "RC-00001".into(), date(2025, 3, 5), Decimal::new(1000, 0))
    }

    #[test]
    fn test_grace_period_boundaries() {
        let mut rows = vec![march_row()];

        assert!(mark_overdue(&mut rows, Decimal::ZERO, 5, date(2025, 3, 9)).is_empty());
        assert_eq!(rows[0].status, RowStatus::Pending);

        assert!(mark_overdue(&mut rows, Decimal::ZERO, 5, date(2025, 3, 10)).is_empty());
        assert_eq!(rows[0].status, RowStatus::Pending);

        let marked = mark_overdue(&mut rows, Decimal::ZERO, 5, date(2025, 3, 15));
        assert_eq!(marked, vec!["RC-00001-003".to_string()]);
        assert_eq!(rows[0].status, RowStatus::Overdue);
        assert_eq!(rows[0].marked_overdue_on, Some(date(2025, 3, 15)));
    }

    #[test]
    fn test_late_fee_applied_once() {
        let mut rows = vec![march_row()];
        mark_overdue(&mut rows, Decimal::new(50, 0), 5, date(2025, 3, 15));
        assert_eq!(rows[0].amount_due, Decimal::new(1050, 0));
        assert_eq!(rows[0].outstanding, Decimal::new(1050, 0));

        let again = mark_overdue(&mut rows, Decimal::new(50, 0), 5, date(2025, 3, 20));
        assert!(again.is_empty());
        assert_eq!(rows[0].amount_due, Decimal::new(1050, 0));
        assert_eq!(rows[0].marked_overdue_on, Some(date(2025, 3, 15)));
    }

    #[test]
    fn test_partially_paid_rows_not_marked() {
        let mut rows = vec![march_row()];
        rows[0].allocate(PaymentAllocation {
            payment_id: None,
            amount: Decimal::new(500, 0),
            date: date(2025, 3, 5),
            reference: None,
            mode: None,
        });
        assert!(mark_overdue(&mut rows, Decimal::new(50, 0), 5, date(2025, 4, 1)).is_empty());
        assert_eq!(rows[0].status, RowStatus::PartiallyPaid);
    }

    #[test]
    fn test_overdue_days() {
        let row = march_row();
        assert_eq!(overdue_days(&row, 5, date(2025, 3, 9)), 0);
        assert_eq!(overdue_days(&row, 5, date(2025, 3, 15)), 5);
    }

    #[test]
    fn test_huge_grace_period_never_overdue() {
        let mut rows = vec![march_row()];
        assert_eq!(rows[0].grace_end(u32::MAX), NaiveDate::MAX);
        assert!(mark_overdue(&mut rows, Decimal::new(50, 0), u32::MAX, date(2025, 3, 15)).is_empty());
        assert_eq!(overdue_days(&rows[0], u32::MAX, date(2025, 3, 15)), 0);
        assert_eq!(rows[0].status, RowStatus::Pending);
    }

    #[test]
    fn test_waive_late_fee() {
        let mut rows = vec![march_row()];
        mark_overdue(&mut rows, Decimal::new(50, 0), 5, date(2025, 3, 15));

        assert!(waive_late_fee(&mut rows[0], Decimal::new(60, 0), "goodwill").is_err());
        waive_late_fee(&mut rows[0], Decimal::new(50, 0), "goodwill").unwrap();

        assert_eq!(rows[0].amount_due, Decimal::new(1000, 0));
        assert_eq!(rows[0].waiver_reason.as_deref(), Some("goodwill"));
        assert_eq!(rows[0].status, RowStatus::Overdue);
    }

    #[test]
    fn test_due_reminders_respect_interval() {
        let mut rows = vec![march_row()];
        mark_overdue(&mut rows, Decimal::ZERO, 5, date(2025, 3, 15));

        assert_eq!(due_reminders(&rows, date(2025, 3, 15), 7).len(), 1);
        record_reminder(&mut rows[0], date(2025, 3, 15));
        assert_eq!(rows[0].reminder_count, 1);

        assert!(due_reminders(&rows, date(2025, 3, 22), 7).is_empty());
        assert_eq!(due_reminders(&rows, date(2025, 3, 23), 7).len(), 1);
    }
}
