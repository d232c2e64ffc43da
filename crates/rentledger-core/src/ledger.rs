//! Schedule ledger: the mutable rows of a contract and the allocations that pay them

use rust_decimal::Decimal;

use super::error::{CoreError, CoreResult};
use super::models::{PaymentAllocation, ScheduleRow};
use super::schedule::ScheduleEntry;
use super::types::RowStatus;

/// Row id for the n-th installment of a contract (1-based)
pub fn row_id(contract_id: &str, index: usize) -> String {
    format!("{}-{:03}", contract_id, index)
}

/// Create Pending rows from generated schedule entries
pub fn build_rows(contract_id: &str, entries: &[ScheduleEntry]) -> Vec<ScheduleRow> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            ScheduleRow::new(
                row_id(contract_id, i + 1),
                contract_id.to_string(),
                entry.due_date,
                entry.amount,
            )
        })
        .collect()
}

/// Apply a payment to a row.
///
/// Without `allow_overpayment` the allocation is capped at the outstanding
/// amount, and anything beyond outstanding + tolerance is rejected. Returns the
/// amount actually allocated.
pub fn apply_payment(
    row: &mut ScheduleRow,
    mut allocation: PaymentAllocation,
    tolerance: Decimal,
    allow_overpayment: bool,
) -> CoreResult<Decimal> {
    if allocation.amount <= Decimal::ZERO {
        return Err(CoreError::NonPositiveAmount {
            field: "amount".to_string(),
        });
    }

    if !row.is_outstanding() {
        return Err(CoreError::InvalidTransition {
            action: "pay".to_string(),
            status: row.status.to_string(),
        });
    }

    if allocation.amount > row.outstanding + tolerance && !allow_overpayment {
        return Err(CoreError::AmountExceedsOutstanding {
            amount: allocation.amount,
            outstanding: row.outstanding,
            due_date: row.due_date,
        });
    }

    if !allow_overpayment {
        allocation.amount = allocation.amount.min(row.outstanding);
    }
    let allocated = allocation.amount;

    log::debug!(
        "Allocating {} to row {} (outstanding {})",
        allocated,
        row.id,
        row.outstanding
    );
    row.allocate(allocation);

    Ok(allocated)
}

/// Revert every allocation of a payment; returns (row id, amount reverted) per touched row
pub fn revert_payment(rows: &mut [ScheduleRow], payment_id: &str) -> Vec<(String, Decimal)> {
    rows.iter_mut()
        .filter(|r| r.has_payment(payment_id))
        .map(|r| {
            let amount = r.revert_payment(payment_id);
            (r.id.clone(), amount)
        })
        .collect()
}

/// Cancel rows that were never paid; paid history stays
pub fn cancel_open_rows(rows: &mut [ScheduleRow]) -> usize {
    let mut cancelled = 0;
    for row in rows.iter_mut() {
        if matches!(row.status, RowStatus::Pending | RowStatus::Overdue) {
            row.status = RowStatus::Cancelled;
            cancelled += 1;
        }
    }
    cancelled
}

/// Total still owed across rows
pub fn total_outstanding<'a>(rows: impl IntoIterator<Item = &'a ScheduleRow>) -> Decimal {
    rows.into_iter()
        .filter(|r| r.status != RowStatus::Cancelled)
        .map(|r| r.outstanding)
        .sum()
}
