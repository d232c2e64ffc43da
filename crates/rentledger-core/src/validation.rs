//! Incoming payment validation and cancellation impact

use chrono::NaiveDate;
use rentledger_config::ValidationConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::models::{Contract, NewPayment, Payment, Tenant};
use super::types::RowStatus;

/// Kind of a validation finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    NonPositiveAmount,
    DuplicateReference,
    NoOutstandingRows,
    UnknownPayer,
    ExceedsTotalOutstanding,
    NoExactAmountMatch,
    FutureDate,
    OutsideContractPeriod,
    FarFromDueDate,
    SimilarRecentPayment,
}

impl IssueKind {
    /// Findings that stop a payment from being recorded at all
    pub fn blocks_receipt(&self) -> bool {
        matches!(self, IssueKind::NonPositiveAmount | IssueKind::DuplicateReference)
    }
}

/// One validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: IssueKind, message: String) -> Self {
        Self { kind, message }
    }
}

/// Errors block the payment; warnings are for the operator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// First error that prevents recording the payment
    pub fn blocking_error(&self) -> Option<&ValidationIssue> {
        self.errors.iter().find(|i| i.kind.blocks_receipt())
    }
}

/// What the validator knows about the payer
#[derive(Debug, Clone, Default)]
pub struct PayerContext<'a> {
    pub tenant: Option<&'a Tenant>,
    /// Payer's active contracts
    pub contracts: Vec<&'a Contract>,
    /// Payer's earlier received payments
    pub payments: Vec<&'a Payment>,
}

/// Check an incoming payment against the payer's contracts and history
pub fn validate_payment(
    payment: &NewPayment,
    context: &PayerContext<'_>,
    config: &ValidationConfig,
    amount_tolerance: Decimal,
    today: NaiveDate,
) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if payment.amount <= Decimal::ZERO {
        errors.push(ValidationIssue::new(
            IssueKind::NonPositiveAmount,
            "Payment amount must be greater than 0".to_string(),
        ));
    }

    if let Some(reference) = payment.reference_no.as_deref().filter(|r| !r.trim().is_empty()) {
        if let Some(existing) = context
            .payments
            .iter()
            .find(|p| p.is_received() && p.reference_no.as_deref() == Some(reference))
        {
            errors.push(ValidationIssue::new(
                IssueKind::DuplicateReference,
                format!("Reference {} is already used by payment {}", reference, existing.id),
            ));
        }
    }

    if context.tenant.is_none() {
        warnings.push(ValidationIssue::new(
            IssueKind::UnknownPayer,
            format!("Payer '{}' does not match any tenant", payment.payer),
        ));
    }

    let outstanding_rows: Vec<_> = context
        .contracts
        .iter()
        .flat_map(|c| c.outstanding_rows())
        .collect();

    if outstanding_rows.is_empty() {
        errors.push(ValidationIssue::new(
            IssueKind::NoOutstandingRows,
            "No outstanding rent schedules found for this payer".to_string(),
        ));
    } else {
        let total: Decimal = outstanding_rows.iter().map(|r| r.outstanding).sum();
        if payment.amount > total + config.overpayment_tolerance {
            warnings.push(ValidationIssue::new(
                IssueKind::ExceedsTotalOutstanding,
                format!(
                    "Payment amount {} exceeds total outstanding {}",
                    payment.amount, total
                ),
            ));
        }

        if context.contracts.len() > 1
            && !outstanding_rows
                .iter()
                .any(|r| (r.outstanding - payment.amount).abs() <= amount_tolerance)
        {
            warnings.push(ValidationIssue::new(
                IssueKind::NoExactAmountMatch,
                "No single schedule row matches the payment amount exactly".to_string(),
            ));
        }

        if let Some(closest) = outstanding_rows
            .iter()
            .map(|r| (r.due_date - payment.date).num_days().abs())
            .min()
        {
            if closest > config.due_date_distance_days {
                warnings.push(ValidationIssue::new(
                    IssueKind::FarFromDueDate,
                    format!("Closest outstanding due date is {} days away", closest),
                ));
            }
        }
    }

    if payment.date > today {
        warnings.push(ValidationIssue::new(
            IssueKind::FutureDate,
            format!("Payment date {} is in the future", payment.date),
        ));
    }

    for contract in &context.contracts {
        if payment.date < contract.start_date || payment.date > contract.end_date {
            warnings.push(ValidationIssue::new(
                IssueKind::OutsideContractPeriod,
                format!(
                    "Payment date {} is outside contract {} ({} to {})",
                    payment.date, contract.id, contract.start_date, contract.end_date
                ),
            ));
        }
    }

    if let Some(similar) = context.payments.iter().find(|p| {
        p.is_received()
            && (p.amount - payment.amount).abs() <= config.duplicate_amount_tolerance
            && (payment.date - p.date).num_days().abs() <= config.duplicate_window_days
    }) {
        warnings.push(ValidationIssue::new(
            IssueKind::SimilarRecentPayment,
            format!(
                "Similar payment {} of {} on {} found",
                similar.id, similar.amount, similar.date
            ),
        ));
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Effect of cancelling one row allocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowImpact {
    pub contract_id: String,
    pub row_id: String,
    pub due_date: NaiveDate,
    pub amount_reverted: Decimal,
    pub current_status: RowStatus,
    pub status_after: RowStatus,
}

/// What cancelling a payment would change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationImpact {
    pub payment_id: String,
    pub rows: Vec<RowImpact>,
    pub total_reverted: Decimal,
    pub warnings: Vec<String>,
}

/// Preview the effect of cancelling a payment without changing anything
pub fn cancellation_impact<'a>(
    payment: &Payment,
    contracts: impl IntoIterator<Item = &'a Contract>,
    payments: &[&Payment],
) -> CancellationImpact {
    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    if !payment.is_received() {
        warnings.push(format!("Payment {} is already cancelled", payment.id));
    }

    for contract in contracts {
        for row in contract.rows.iter().filter(|r| r.has_payment(&payment.id)) {
            let mut after = row.clone();
            let amount_reverted = after.revert_payment(&payment.id);
            rows.push(RowImpact {
                contract_id: contract.id.clone(),
                row_id: row.id.clone(),
                due_date: row.due_date,
                amount_reverted,
                current_status: row.status,
                status_after: after.status,
            });
        }

        let later: Vec<&str> = payments
            .iter()
            .filter(|p| p.id != payment.id && p.is_received() && p.date > payment.date)
            .filter(|p| {
                p.matched
                    .as_ref()
                    .map_or(false, |m| m.contract_id == contract.id)
            })
            .map(|p| p.id.as_str())
            .collect();
        if !later.is_empty() && rows.iter().any(|r| r.contract_id == contract.id) {
            warnings.push(format!(
                "Contract {} has later payments ({}) that may need review",
                contract.id,
                later.join(", ")
            ));
        }
    }

    if rows.is_empty() && payment.is_received() {
        warnings.push(format!("Payment {} is not linked to any schedule row", payment.id));
    }

    let total_reverted = rows.iter().map(|r| r.amount_reverted).sum();
    CancellationImpact {
        payment_id: payment.id.clone(),
        rows,
        total_reverted,
        warnings,
    }
}
