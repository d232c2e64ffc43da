//! Report structures for API responses

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::aggregate::{aggregate, aggregate_many, ScheduleSummary};
use super::models::{Contract, Payment, Property, RentalUnit, Tenant};
use super::time::ReportPeriod;
use super::types::{ContractStatus, PaymentStatus, RowStatus, ScheduleStatus, UnitStatus};

/// Payment position of one contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub contract_id: String,
    pub tenant_id: String,
    pub total_rows: usize,
    pub completed: usize,
    pub overdue: usize,
    pub upcoming: usize,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub overdue_amount: Decimal,
    pub next_payment_date: Option<NaiveDate>,
    pub next_payment_amount: Option<Decimal>,
    pub status: ScheduleStatus,
}

pub fn payment_summary(contract: &Contract, today: NaiveDate) -> PaymentSummary {
    let summary = aggregate(&contract.rows, today);
    let open: Vec<_> = contract.outstanding_rows().collect();

    let overdue: Vec<_> = open.iter().filter(|r| r.due_date < today).collect();
    let next = open
        .iter()
        .filter(|r| r.due_date >= today)
        .min_by_key(|r| r.due_date);

    PaymentSummary {
        contract_id: contract.id.clone(),
        tenant_id: contract.tenant.clone(),
        total_rows: summary.row_count,
        completed: summary.paid_count,
        overdue: overdue.len(),
        upcoming: open.len() - overdue.len(),
        total_amount: summary.total_due,
        paid_amount: summary.total_paid,
        outstanding_amount: summary.outstanding,
        overdue_amount: overdue.iter().map(|r| r.outstanding).sum(),
        next_payment_date: next.map(|r| r.due_date),
        next_payment_amount: next.map(|r| r.outstanding),
        status: summary.status,
    }
}

/// Per-row detail line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowDetail {
    pub row_id: String,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub amount_paid: Decimal,
    pub outstanding: Decimal,
    pub late_fee: Decimal,
    pub status: RowStatus,
    pub days_overdue: i64,
    pub payment_id: Option<String>,
    pub invoice_reference: Option<String>,
}

/// Row counts by status plus every row of a contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleStatusReport {
    pub contract_id: String,
    pub counts: BTreeMap<RowStatus, usize>,
    pub summary: ScheduleSummary,
    pub rows: Vec<RowDetail>,
}

pub fn schedule_status(contract: &Contract, today: NaiveDate) -> ScheduleStatusReport {
    let mut counts = BTreeMap::new();
    for row in &contract.rows {
        *counts.entry(row.status).or_insert(0) += 1;
    }

    let rows = contract
        .rows
        .iter()
        .map(|r| RowDetail {
            row_id: r.id.clone(),
            due_date: r.due_date,
            amount_due: r.amount_due,
            amount_paid: r.amount_paid,
            outstanding: r.outstanding,
            late_fee: r.late_fee - r.waived_late_fee,
            status: r.status,
            days_overdue: if r.is_outstanding() {
                (today - r.due_date).num_days().max(0)
            } else {
                0
            },
            payment_id: r.payment_id.clone(),
            invoice_reference: r.invoice_reference.clone(),
        })
        .collect();

    ScheduleStatusReport {
        contract_id: contract.id.clone(),
        counts,
        summary: aggregate(&contract.rows, today),
        rows,
    }
}

/// Count and amount of overdue rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgingBucket {
    pub count: usize,
    pub amount: Decimal,
}

impl AgingBucket {
    fn add(&mut self, amount: Decimal) {
        self.count += 1;
        self.amount += amount;
    }
}

/// Overdue amounts by days past due
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgingBuckets {
    pub days_1_30: AgingBucket,
    pub days_31_60: AgingBucket,
    pub days_61_90: AgingBucket,
    pub days_over_90: AgingBucket,
}

/// Overdue total for one tenant or property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueGroup {
    pub id: String,
    pub name: String,
    pub count: usize,
    pub amount: Decimal,
}

/// Overdue rows across all contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueAnalysis {
    pub as_of: NaiveDate,
    pub total_overdue_amount: Decimal,
    pub total_overdue_count: usize,
    pub aging: AgingBuckets,
    pub by_tenant: Vec<OverdueGroup>,
    pub by_property: Vec<OverdueGroup>,
}

pub fn overdue_analysis<'a>(
    contracts: impl IntoIterator<Item = &'a Contract>,
    tenants: &[Tenant],
    properties: &BTreeMap<String, Property>,
    today: NaiveDate,
) -> OverdueAnalysis {
    let mut aging = AgingBuckets::default();
    let mut by_tenant: HashMap<String, AgingBucket> = HashMap::new();
    let mut by_property: HashMap<String, AgingBucket> = HashMap::new();
    let mut total = AgingBucket::default();

    for contract in contracts {
        for row in contract.outstanding_rows().filter(|r| r.due_date < today) {
            let days = (today - row.due_date).num_days();
            let bucket = match days {
                0..=30 => &mut aging.days_1_30,
                31..=60 => &mut aging.days_31_60,
                61..=90 => &mut aging.days_61_90,
                _ => &mut aging.days_over_90,
            };
            bucket.add(row.outstanding);
            total.add(row.outstanding);
            by_tenant
                .entry(contract.tenant.clone())
                .or_default()
                .add(row.outstanding);
            if let Some(property) = &contract.property {
                by_property.entry(property.clone()).or_default().add(row.outstanding);
            }
        }
    }

    let tenant_name = |id: &str| {
        tenants
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.display_name())
            .unwrap_or_else(|| id.to_string())
    };
    let property_name = |id: &str| {
        properties
            .get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| id.to_string())
    };

    OverdueAnalysis {
        as_of: today,
        total_overdue_amount: total.amount,
        total_overdue_count: total.count,
        aging,
        by_tenant: ranked(by_tenant, tenant_name),
        by_property: ranked(by_property, property_name),
    }
}

fn ranked(groups: HashMap<String, AgingBucket>, name: impl Fn(&str) -> String) -> Vec<OverdueGroup> {
    let mut out: Vec<OverdueGroup> = groups
        .into_iter()
        .map(|(id, bucket)| OverdueGroup {
            name: name(&id),
            id,
            count: bucket.count,
            amount: bucket.amount,
        })
        .collect();
    out.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.id.cmp(&b.id)));
    out
}

/// Portfolio-wide totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioDashboard {
    pub as_of: NaiveDate,
    pub property_count: usize,
    pub unit_count: usize,
    pub occupied_units: usize,
    pub tenant_count: usize,
    pub contract_count: usize,
    pub draft_contracts: usize,
    pub active_contracts: usize,
    pub cancelled_contracts: usize,
    /// Active contracts by aggregated status
    pub schedules_active: usize,
    pub schedules_overdue: usize,
    pub schedules_completed: usize,
    pub unmatched_payments: usize,
    pub open_errors: usize,
    pub totals: ScheduleSummary,
}

/// Inputs for the dashboard
pub struct DashboardInput<'a> {
    pub properties: usize,
    pub units: &'a BTreeMap<String, RentalUnit>,
    pub tenants: usize,
    pub contracts: &'a BTreeMap<String, Contract>,
    pub payments: &'a BTreeMap<String, Payment>,
    pub open_errors: usize,
}

pub fn dashboard(input: DashboardInput<'_>, today: NaiveDate) -> PortfolioDashboard {
    let contracts: Vec<&Contract> = input.contracts.values().collect();
    let count = |status: ContractStatus| contracts.iter().filter(|c| c.status == status).count();

    let summaries: Vec<(&Contract, ScheduleSummary)> = contracts
        .iter()
        .filter(|c| c.status != ContractStatus::Draft)
        .map(|c| (*c, aggregate(&c.rows, today)))
        .collect();
    let by_status = |status: ScheduleStatus| {
        summaries
            .iter()
            .filter(|(c, s)| c.is_active() && s.status == status)
            .count()
    };

    PortfolioDashboard {
        as_of: today,
        property_count: input.properties,
        unit_count: input.units.len(),
        occupied_units: input
            .units
            .values()
            .filter(|u| u.status == UnitStatus::Occupied)
            .count(),
        tenant_count: input.tenants,
        contract_count: contracts.len(),
        draft_contracts: count(ContractStatus::Draft),
        active_contracts: count(ContractStatus::Active),
        cancelled_contracts: count(ContractStatus::Cancelled),
        schedules_active: by_status(ScheduleStatus::Active),
        schedules_overdue: by_status(ScheduleStatus::Overdue),
        schedules_completed: by_status(ScheduleStatus::Completed),
        unmatched_payments: input
            .payments
            .values()
            .filter(|p| p.is_received() && p.matched.is_none())
            .count(),
        open_errors: input.open_errors,
        totals: aggregate_many(summaries.iter().map(|(_, s)| s)),
    }
}

/// Occupancy and income of one property
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyPerformance {
    pub property_id: String,
    pub name: String,
    pub total_units: usize,
    pub occupied_units: usize,
    pub available_units: usize,
    /// Percent, two decimals
    pub occupancy_rate: Decimal,
    pub vacancy_rate: Decimal,
    /// Monthly rent of active contracts
    pub monthly_income: Decimal,
    /// Base rent of every unit
    pub potential_income: Decimal,
    pub annual_income: Decimal,
    pub summary: ScheduleSummary,
}

pub fn property_performance<'a>(
    property: &Property,
    units: impl IntoIterator<Item = &'a RentalUnit>,
    contracts: impl IntoIterator<Item = &'a Contract>,
    today: NaiveDate,
) -> PropertyPerformance {
    let units: Vec<&RentalUnit> = units
        .into_iter()
        .filter(|u| u.property_id == property.id)
        .collect();
    let contracts: Vec<&Contract> = contracts
        .into_iter()
        .filter(|c| c.property.as_deref() == Some(property.id.as_str()))
        .collect();

    let total_units = units.len();
    let occupied_units = units
        .iter()
        .filter(|u| u.status == UnitStatus::Occupied)
        .count();
    let occupancy_rate = if total_units == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(occupied_units as u64) * Decimal::ONE_HUNDRED / Decimal::from(total_units as u64))
            .round_dp(2)
    };
    let monthly_income: Decimal = contracts
        .iter()
        .filter(|c| c.is_active())
        .map(|c| c.monthly_rent)
        .sum();
    let summaries: Vec<ScheduleSummary> = contracts
        .iter()
        .filter(|c| c.status != ContractStatus::Draft)
        .map(|c| aggregate(&c.rows, today))
        .collect();

    PropertyPerformance {
        property_id: property.id.clone(),
        name: property.name.clone(),
        total_units,
        occupied_units,
        available_units: total_units - occupied_units,
        occupancy_rate,
        vacancy_rate: if total_units == 0 {
            Decimal::ZERO
        } else {
            Decimal::ONE_HUNDRED - occupancy_rate
        },
        monthly_income,
        potential_income: units.iter().map(|u| u.base_rent).sum(),
        annual_income: monthly_income * Decimal::from(12),
        summary: aggregate_many(&summaries),
    }
}

/// Matched and unmatched payments within a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkingReport {
    pub period: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_payments: usize,
    pub matched_count: usize,
    pub matched_amount: Decimal,
    pub unmatched_count: usize,
    pub unmatched_amount: Decimal,
    pub cancelled_count: usize,
    pub unmatched_payments: Vec<String>,
}

pub fn linking_report<'a>(
    payments: impl IntoIterator<Item = &'a Payment>,
    period: &ReportPeriod,
    today: NaiveDate,
) -> LinkingReport {
    let mut report = LinkingReport {
        period: period.description(),
        start_date: period.start_date(today),
        end_date: period.end_date(today),
        total_payments: 0,
        matched_count: 0,
        matched_amount: Decimal::ZERO,
        unmatched_count: 0,
        unmatched_amount: Decimal::ZERO,
        cancelled_count: 0,
        unmatched_payments: Vec::new(),
    };

    for payment in payments.into_iter().filter(|p| period.contains(p.date, today)) {
        report.total_payments += 1;
        match (payment.status, &payment.matched) {
            (PaymentStatus::Cancelled, _) => report.cancelled_count += 1,
            (PaymentStatus::Received, Some(_)) => {
                report.matched_count += 1;
                report.matched_amount += payment.amount;
            }
            (PaymentStatus::Received, None) => {
                report.unmatched_count += 1;
                report.unmatched_amount += payment.amount;
                report.unmatched_payments.push(payment.id.clone());
            }
        }
    }

    report
}
