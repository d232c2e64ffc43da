//! Core rental processing and business logic
//!
//! [`RentalManager`] owns every record (properties, units, tenants,
//! contracts, payments and the error log) and exposes the lifecycle
//! operations. Each operation calls the pure modules below and then
//! re-aggregates the contracts it touched.

pub mod aggregate;
pub mod error;
pub mod integrations;
pub mod ledger;
pub mod matcher;
pub mod models;
pub mod overdue;
pub mod reports;
pub mod schedule;
pub mod time;
pub mod types;
pub mod validation;

use chrono::{NaiveDate, Utc};
use rentledger_config::Config;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

pub use aggregate::{aggregate, aggregate_many, ScheduleSummary};
pub use error::{CoreError, CoreResult, ErrorContext, ErrorDetails, ErrorLogger, ErrorSeverity};
pub use integrations::{InvoiceRequest, InvoiceSink, LogReminderSink, MemoryInvoiceSink, Reminder, ReminderSink};
pub use matcher::{MatchOutcome, NoMatchReason, PaymentMatcher};
pub use models::{
    Contract, ContractUpdate, ErrorLogEntry, NewContract, NewPayment, Payment, PaymentAllocation,
    Property, RentalUnit, RowRef, ScheduleRow, Tenant,
};
pub use time::ReportPeriod;
pub use types::{
    ContractStatus, ErrorLogStatus, PaymentFrequency, PaymentOperation, PaymentStatus, RowStatus,
    ScheduleStatus, TenantType, UnitStatus,
};
pub use validation::{CancellationImpact, IssueKind, ValidationReport};

use error::DefaultErrorLogger;
use matcher::MatchCandidate;
use schedule::ScheduleTerms;
use validation::PayerContext;

// ==================== Record Store ====================

/// Every record the manager holds; serialisable as a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManagerData {
    #[serde(default)]
    pub properties: BTreeMap<String, Property>,
    #[serde(default)]
    pub units: BTreeMap<String, RentalUnit>,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
    #[serde(default)]
    pub contracts: BTreeMap<String, Contract>,
    #[serde(default)]
    pub payments: BTreeMap<String, Payment>,
    #[serde(default)]
    pub error_log: Vec<ErrorLogEntry>,
    /// Last number handed out per id prefix
    #[serde(default)]
    pub sequences: BTreeMap<String, u64>,
}

impl ManagerData {
    /// Parse a JSON snapshot
    pub fn from_json(content: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a JSON snapshot from disk
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn id_taken(&self, id: &str) -> bool {
        self.properties.contains_key(id)
            || self.units.contains_key(id)
            || self.tenants.iter().any(|t| t.id == id)
            || self.contracts.contains_key(id)
            || self.payments.contains_key(id)
            || self.error_log.iter().any(|e| e.id == id)
    }

    fn next_id(&mut self, prefix: &str) -> String {
        loop {
            let sequence = self.sequences.entry(prefix.to_string()).or_insert(0);
            *sequence += 1;
            let id = rentledger_utils::series_name(prefix, *sequence);
            if !self.id_taken(&id) {
                return id;
            }
        }
    }
}

// ==================== Operation Results ====================

/// Manual payment against a row due on a given date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPayment {
    pub due_date: NaiveDate,
    pub amount: Decimal,
    /// Defaults to the current day
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    /// Accept more than outstanding and flag the excess
    #[serde(default)]
    pub allow_overpayment: bool,
}

/// State of a row after money was applied to it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    pub contract_id: String,
    pub row: ScheduleRow,
    pub allocated: Decimal,
    pub summary: ScheduleSummary,
    /// Downstream failures; the payment itself was kept
    pub integration_errors: Vec<ErrorDetails>,
}

/// Outcome of receiving a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptResult {
    pub payment: Payment,
    pub outcome: MatchOutcome,
    pub validation: ValidationReport,
    pub allocation: Option<PaymentResult>,
}

/// Rows touched by cancelling or unlinking a payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlinkResult {
    pub payment: Payment,
    pub rows: Vec<RowRef>,
    pub total_reverted: Decimal,
}

/// Outcome of a manual retry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryResult {
    pub payment_id: String,
    pub operation: PaymentOperation,
    pub success: bool,
    pub message: String,
    /// Error log entries closed by this retry
    pub resolved_errors: Vec<String>,
}

/// Result of one overdue pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueRunResult {
    pub as_of: NaiveDate,
    pub contracts_checked: usize,
    pub rows_marked: usize,
    pub marked: Vec<RowRef>,
}

/// Result of one reminder run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderRunResult {
    pub as_of: NaiveDate,
    pub sent: usize,
    pub failed: usize,
    pub rows: Vec<RowRef>,
}

// ==================== Manager ====================

/// Owns all rental records and runs the lifecycle operations
pub struct RentalManager {
    config: Config,
    data: ManagerData,
    matcher: PaymentMatcher,
    invoices: Arc<dyn InvoiceSink>,
    error_logger: Arc<dyn ErrorLogger>,
}

impl RentalManager {
    /// Create an empty manager
    pub fn new(config: Config) -> CoreResult<Self> {
        let matcher = PaymentMatcher::new(config.matching.clone())?;
        Ok(Self {
            config,
            data: ManagerData::default(),
            matcher,
            invoices: Arc::new(MemoryInvoiceSink::new()),
            error_logger: Arc::new(DefaultErrorLogger),
        })
    }

    /// Replace the record store, e.g. with a loaded snapshot
    pub fn with_data(mut self, data: ManagerData) -> Self {
        self.data = data;
        self
    }

    pub fn with_invoice_sink(mut self, sink: Arc<dyn InvoiceSink>) -> Self {
        self.invoices = sink;
        self
    }

    pub fn with_error_logger(mut self, logger: Arc<dyn ErrorLogger>) -> Self {
        self.error_logger = logger;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data(&self) -> &ManagerData {
        &self.data
    }

    /// Amount formatted with the configured currency, for log lines
    fn money(&self, amount: Decimal) -> String {
        let currency = &self.config.currency;
        rentledger_utils::format_amount(
            amount,
            currency.decimal_places,
            &currency.thousands_separator,
            &currency.default_currency,
        )
    }

    // ---------- Registry ----------

    /// Register a property
    pub fn add_property(&mut self, mut property: Property) -> CoreResult<Property> {
        property.validate()?;
        property.id = self.assign_id(&property.id, "PROP")?;

        log::info!("Added property {} ({})", property.id, property.name);
        self.data.properties.insert(property.id.clone(), property.clone());
        Ok(property)
    }

    /// Register a unit; unit numbers are unique within a property
    pub fn add_unit(&mut self, mut unit: RentalUnit) -> CoreResult<RentalUnit> {
        unit.validate()?;
        if !self.data.properties.contains_key(&unit.property_id) {
            return Err(CoreError::not_found("Property", &unit.property_id));
        }
        if self
            .data
            .units
            .values()
            .any(|u| u.property_id == unit.property_id && u.unit_number == unit.unit_number)
        {
            return Err(CoreError::DuplicateEntry {
                entry: format!("unit {} in property {}", unit.unit_number, unit.property_id),
            });
        }
        unit.id = self.assign_id(&unit.id, "UNIT")?;

        log::info!("Added unit {} to property {}", unit.unit_number, unit.property_id);
        self.data.units.insert(unit.id.clone(), unit.clone());
        Ok(unit)
    }

    /// Register a tenant
    pub fn add_tenant(&mut self, mut tenant: Tenant) -> CoreResult<Tenant> {
        tenant.validate()?;
        tenant.id = self.assign_id(&tenant.id, "TENANT")?;

        log::info!("Added tenant {} ({})", tenant.id, tenant.display_name());
        self.data.tenants.push(tenant.clone());
        Ok(tenant)
    }

    fn assign_id(&mut self, requested: &str, prefix: &str) -> CoreResult<String> {
        let requested = requested.trim();
        if requested.is_empty() {
            return Ok(self.data.next_id(prefix));
        }
        if self.data.id_taken(requested) {
            return Err(CoreError::DuplicateEntry {
                entry: requested.to_string(),
            });
        }
        Ok(requested.to_string())
    }

    pub fn property(&self, id: &str) -> CoreResult<&Property> {
        self.data
            .properties
            .get(id)
            .ok_or_else(|| CoreError::not_found("Property", id))
    }

    pub fn unit(&self, id: &str) -> CoreResult<&RentalUnit> {
        self.data
            .units
            .get(id)
            .ok_or_else(|| CoreError::not_found("Rental unit", id))
    }

    pub fn tenant(&self, id: &str) -> CoreResult<&Tenant> {
        self.data
            .tenants
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| CoreError::not_found("Tenant", id))
    }

    pub fn tenants(&self) -> &[Tenant] {
        &self.data.tenants
    }

    // ---------- Contracts ----------

    pub fn contract(&self, id: &str) -> CoreResult<&Contract> {
        self.data
            .contracts
            .get(id)
            .ok_or_else(|| CoreError::not_found("Contract", id))
    }

    fn contract_mut(&mut self, id: &str) -> CoreResult<&mut Contract> {
        self.data
            .contracts
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found("Contract", id))
    }

    pub fn contracts(&self) -> Vec<&Contract> {
        self.data.contracts.values().collect()
    }

    /// Create a Draft contract
    pub fn create_contract(&mut self, new: NewContract) -> CoreResult<Contract> {
        self.tenant(&new.tenant)?;

        let mut property = new.property.clone();
        if let Some(unit_id) = &new.rental_unit {
            let unit = self.unit(unit_id)?;
            match &property {
                Some(p) if *p != unit.property_id => {
                    return Err(CoreError::validation(format!(
                        "Unit {} does not belong to property {}",
                        unit_id, p
                    )))
                }
                Some(_) => {}
                None => property = Some(unit.property_id.clone()),
            }
        }
        if let Some(p) = &property {
            self.property(p)?;
        }

        let terms = ScheduleTerms {
            start_date: new.start_date,
            end_date: new.end_date,
            monthly_rent: new.monthly_rent,
            frequency: new.frequency,
            due_day: new.due_day,
        };
        schedule::validate_terms(&terms, &self.config.schedule)?;
        let grace_period_days = self.config.grace_period_or_default(new.grace_period_days);
        schedule::validate_grace_period(grace_period_days, &self.config.schedule)?;
        check_late_fee(new.late_fee_amount)?;

        let contract = Contract {
            id: self.data.next_id("RC"),
            tenant: new.tenant,
            rental_unit: new.rental_unit,
            property,
            start_date: new.start_date,
            end_date: new.end_date,
            monthly_rent: new.monthly_rent,
            frequency: new.frequency,
            due_day: new.due_day,
            grace_period_days,
            late_fee_amount: new.late_fee_amount,
            status: ContractStatus::Draft,
            rows: Vec::new(),
            summary: ScheduleSummary::default(),
        };

        log::info!(
            "Created contract {} for tenant {} ({} to {})",
            contract.id,
            contract.tenant,
            contract.start_date,
            contract.end_date
        );
        self.data.contracts.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }

    /// Change the terms of a Draft contract
    pub fn update_contract(&mut self, id: &str, update: ContractUpdate) -> CoreResult<Contract> {
        let schedule_config = self.config.schedule.clone();
        let contract = self.contract_mut(id)?;
        if contract.status != ContractStatus::Draft {
            return Err(CoreError::InvalidTransition {
                action: "update".to_string(),
                status: contract.status.to_string(),
            });
        }

        let mut updated = contract.clone();
        if let Some(v) = update.start_date {
            updated.start_date = v;
        }
        if let Some(v) = update.end_date {
            updated.end_date = v;
        }
        if let Some(v) = update.monthly_rent {
            updated.monthly_rent = v;
        }
        if let Some(v) = update.frequency {
            updated.frequency = v;
        }
        if let Some(v) = update.due_day {
            updated.due_day = v;
        }
        if let Some(v) = update.grace_period_days {
            updated.grace_period_days = v;
        }
        if let Some(v) = update.late_fee_amount {
            updated.late_fee_amount = v;
        }

        schedule::validate_terms(&terms_of(&updated), &schedule_config)?;
        schedule::validate_grace_period(updated.grace_period_days, &schedule_config)?;
        check_late_fee(updated.late_fee_amount)?;

        *contract = updated.clone();
        Ok(updated)
    }

    /// Draft -> Active: generate the schedule and occupy the unit
    pub fn activate_contract(&mut self, id: &str, today: NaiveDate) -> CoreResult<Contract> {
        let contract = self.contract(id)?;
        if contract.status != ContractStatus::Draft {
            return Err(CoreError::InvalidTransition {
                action: "activate".to_string(),
                status: contract.status.to_string(),
            });
        }

        if let Some(unit) = &contract.rental_unit {
            if let Some(conflict) = self.data.contracts.values().find(|c| {
                c.id != contract.id
                    && c.is_active()
                    && c.rental_unit.as_deref() == Some(unit.as_str())
                    && c.overlaps(contract.start_date, contract.end_date)
            }) {
                return Err(CoreError::PeriodOverlap {
                    unit: unit.clone(),
                    conflicting: conflict.id.clone(),
                });
            }
        }

        let entries = schedule::generate(
            &terms_of(contract),
            &self.config.schedule,
            self.config.currency.decimal_places,
        )?;
        let rows = ledger::build_rows(id, &entries);
        let unit = contract.rental_unit.clone();

        let contract = self.contract_mut(id)?;
        contract.rows = rows;
        contract.status = ContractStatus::Active;
        contract.summary = aggregate(&contract.rows, today);
        let activated = contract.clone();

        if let Some(unit) = unit.and_then(|u| self.data.units.get_mut(&u)) {
            unit.status = UnitStatus::Occupied;
        }

        log::info!(
            "Activated contract {} with {} schedule rows",
            activated.id,
            activated.rows.len()
        );
        Ok(activated)
    }

    /// Active -> Cancelled: cancel unpaid rows and free the unit
    pub fn cancel_contract(&mut self, id: &str, today: NaiveDate) -> CoreResult<Contract> {
        let contract = self.contract_mut(id)?;
        if contract.status != ContractStatus::Active {
            return Err(CoreError::InvalidTransition {
                action: "cancel".to_string(),
                status: contract.status.to_string(),
            });
        }

        let cancelled_rows = ledger::cancel_open_rows(&mut contract.rows);
        contract.status = ContractStatus::Cancelled;
        contract.summary = aggregate(&contract.rows, today);
        let cancelled = contract.clone();

        if let Some(unit_id) = &cancelled.rental_unit {
            let still_let = self
                .data
                .contracts
                .values()
                .any(|c| c.is_active() && c.rental_unit.as_deref() == Some(unit_id.as_str()));
            if let (false, Some(unit)) = (still_let, self.data.units.get_mut(unit_id)) {
                unit.status = UnitStatus::Available;
            }
        }

        log::info!(
            "Cancelled contract {} ({} open rows cancelled)",
            cancelled.id,
            cancelled_rows
        );
        Ok(cancelled)
    }

    /// Re-aggregate a contract as of a date and store the summary
    pub fn refresh_summary(&mut self, id: &str, today: NaiveDate) -> CoreResult<ScheduleSummary> {
        let contract = self.contract_mut(id)?;
        contract.summary = aggregate(&contract.rows, today);
        Ok(contract.summary.clone())
    }

    /// Roll-up of every non-draft contract of a tenant
    pub fn tenant_summary(&self, tenant_id: &str, today: NaiveDate) -> CoreResult<ScheduleSummary> {
        self.tenant(tenant_id)?;
        Ok(self.rollup(|c| c.tenant == tenant_id, today))
    }

    /// Roll-up of every non-draft contract on a property
    pub fn property_summary(&self, property_id: &str, today: NaiveDate) -> CoreResult<ScheduleSummary> {
        self.property(property_id)?;
        Ok(self.rollup(|c| c.property.as_deref() == Some(property_id), today))
    }

    fn rollup(&self, include: impl Fn(&Contract) -> bool, today: NaiveDate) -> ScheduleSummary {
        let summaries: Vec<ScheduleSummary> = self
            .data
            .contracts
            .values()
            .filter(|c| c.status != ContractStatus::Draft && include(c))
            .map(|c| aggregate(&c.rows, today))
            .collect();
        aggregate_many(&summaries)
    }

    // ---------- Payments ----------

    pub fn payment(&self, id: &str) -> CoreResult<&Payment> {
        self.data
            .payments
            .get(id)
            .ok_or_else(|| CoreError::not_found("Payment", id))
    }

    pub fn payments(&self) -> Vec<&Payment> {
        self.data.payments.values().collect()
    }

    /// Apply money by hand to the row due on a given date
    pub fn record_payment(
        &mut self,
        contract_id: &str,
        request: RecordPayment,
        today: NaiveDate,
    ) -> CoreResult<PaymentResult> {
        let tolerance = self.config.matching.amount_tolerance;
        let contract = self.contract_mut(contract_id)?;
        if !contract.is_active() {
            return Err(CoreError::InvalidTransition {
                action: "record a payment on".to_string(),
                status: contract.status.to_string(),
            });
        }

        let row = contract
            .row_by_due_date_mut(request.due_date)
            .ok_or_else(|| CoreError::not_found("Schedule row due", &request.due_date.to_string()))?;
        let allocated = ledger::apply_payment(
            row,
            PaymentAllocation {
                payment_id: None,
                amount: request.amount,
                date: request.date.unwrap_or(today),
                reference: request.reference,
                mode: request.mode,
            },
            tolerance,
            request.allow_overpayment,
        )?;
        if row.overpaid > Decimal::ZERO {
            log::warn!("Row {} overpaid by {}", row.id, row.overpaid);
        }
        let row_ref = RowRef {
            contract_id: contract_id.to_string(),
            row_id: row.id.clone(),
        };
        contract.summary = aggregate(&contract.rows, today);

        self.after_allocation(&row_ref, allocated, None, today)
    }

    /// Check a payment without storing it
    pub fn validate_payment(&self, payment: &NewPayment, today: NaiveDate) -> ValidationReport {
        let tenant = matcher::resolve_payer(&payment.payer, &self.data.tenants);
        let context = self.payer_context(tenant, &payment.payer);
        validation::validate_payment(
            payment,
            &context,
            &self.config.validation,
            self.config.matching.amount_tolerance,
            today,
        )
    }

    fn payer_context<'a>(&'a self, tenant: Option<&'a Tenant>, payer: &str) -> PayerContext<'a> {
        let contracts = match tenant {
            Some(t) => self
                .data
                .contracts
                .values()
                .filter(|c| c.is_active() && c.tenant == t.id)
                .collect(),
            None => Vec::new(),
        };
        let payments = self
            .data
            .payments
            .values()
            .filter(|p| match tenant {
                Some(t) => {
                    matcher::resolve_payer(&p.payer, &self.data.tenants).map(|pt| pt.id.as_str())
                        == Some(t.id.as_str())
                }
                None => p.payer == payer,
            })
            .collect();
        PayerContext {
            tenant,
            contracts,
            payments,
        }
    }

    /// Store an incoming payment and try to match it.
    ///
    /// Only a non-positive amount or a reused reference stops the payment;
    /// matching failures leave it stored and unmatched.
    pub fn receive_payment(&mut self, new: NewPayment, today: NaiveDate) -> CoreResult<ReceiptResult> {
        let report = self.validate_payment(&new, today);
        if let Some(issue) = report.blocking_error() {
            return Err(match issue.kind {
                IssueKind::NonPositiveAmount => CoreError::NonPositiveAmount {
                    field: "amount".to_string(),
                },
                _ => CoreError::DuplicateEntry {
                    entry: issue.message.clone(),
                },
            });
        }
        for warning in &report.warnings {
            log::warn!("Payment from {}: {}", new.payer, warning.message);
        }

        let payment = Payment {
            id: self.data.next_id("PAY"),
            payer: new.payer,
            amount: new.amount,
            date: new.date,
            memo: new.memo,
            reference_no: new.reference_no,
            mode: new.mode,
            status: PaymentStatus::Received,
            matched: None,
        };
        log::info!(
            "Received payment {} of {} from {}",
            payment.id,
            self.money(payment.amount),
            payment.payer
        );
        self.data.payments.insert(payment.id.clone(), payment.clone());

        let (outcome, allocation) = self.auto_match(&payment.id, today)?;
        Ok(ReceiptResult {
            payment: self.payment(&payment.id)?.clone(),
            outcome,
            validation: report,
            allocation,
        })
    }

    fn auto_match(
        &mut self,
        payment_id: &str,
        today: NaiveDate,
    ) -> CoreResult<(MatchOutcome, Option<PaymentResult>)> {
        let payment = self.payment(payment_id)?.clone();

        let outcome = match matcher::resolve_payer(&payment.payer, &self.data.tenants) {
            None => MatchOutcome::NoMatch {
                reason: NoMatchReason::UnknownPayer,
            },
            Some(tenant) => {
                let candidates: Vec<MatchCandidate<'_>> = self
                    .data
                    .contracts
                    .values()
                    .filter(|c| c.is_active() && c.tenant == tenant.id)
                    .flat_map(|c| {
                        c.rows.iter().map(move |row| MatchCandidate {
                            contract_id: &c.id,
                            row,
                        })
                    })
                    .collect();
                self.matcher.find_match(&payment, &candidates)
            }
        };

        match &outcome {
            MatchOutcome::Matched { row } => {
                let result = self.allocate(&payment, row, today)?;
                log::info!("Payment {} matched to row {}", payment.id, row.row_id);
                Ok((outcome, Some(result)))
            }
            MatchOutcome::NoMatch { reason } => {
                let context = ErrorContext::new("auto_match").with_record(&payment.id);
                self.error_logger
                    .log_warning(&format!("Payment left unmatched: {}", reason), &context);
                Ok((outcome, None))
            }
            MatchOutcome::Ambiguous { rows } => {
                let ids: Vec<&str> = rows.iter().map(|r| r.row_id.as_str()).collect();
                let context = ErrorContext::new("auto_match")
                    .with_record(&payment.id)
                    .with_data("rows", serde_json::json!(ids));
                self.error_logger.log_warning(
                    "Payment matches several contracts equally well; left unmatched",
                    &context,
                );
                Ok((outcome, None))
            }
        }
    }

    fn allocate(&mut self, payment: &Payment, row_ref: &RowRef, today: NaiveDate) -> CoreResult<PaymentResult> {
        let tolerance = self.config.matching.amount_tolerance;
        let contract = self.contract_mut(&row_ref.contract_id)?;
        let row = contract
            .row_mut(&row_ref.row_id)
            .ok_or_else(|| CoreError::not_found("Schedule row", &row_ref.row_id))?;

        let allocated = ledger::apply_payment(
            row,
            PaymentAllocation {
                payment_id: Some(payment.id.clone()),
                amount: payment.amount,
                date: payment.date,
                reference: payment.reference_no.clone(),
                mode: payment.mode.clone(),
            },
            tolerance,
            false,
        )?;
        contract.summary = aggregate(&contract.rows, today);

        if let Some(stored) = self.data.payments.get_mut(&payment.id) {
            stored.matched = Some(row_ref.clone());
        }

        self.after_allocation(row_ref, allocated, Some(&payment.id), today)
    }

    fn after_allocation(
        &mut self,
        row_ref: &RowRef,
        allocated: Decimal,
        payment_id: Option<&str>,
        today: NaiveDate,
    ) -> CoreResult<PaymentResult> {
        let paid = self.row(row_ref)?.status == RowStatus::Paid;
        let integration_errors = if paid {
            self.issue_invoice(row_ref, payment_id, today).into_iter().collect()
        } else {
            Vec::new()
        };

        let contract = self.contract(&row_ref.contract_id)?;
        Ok(PaymentResult {
            contract_id: contract.id.clone(),
            row: self.row(row_ref)?.clone(),
            allocated,
            summary: contract.summary.clone(),
            integration_errors,
        })
    }

    fn row(&self, row_ref: &RowRef) -> CoreResult<&ScheduleRow> {
        self.contract(&row_ref.contract_id)?
            .row(&row_ref.row_id)
            .ok_or_else(|| CoreError::not_found("Schedule row", &row_ref.row_id))
    }

    /// Link a payment to a chosen row, skipping the memo and amount heuristics
    pub fn link_payment(
        &mut self,
        payment_id: &str,
        contract_id: &str,
        row_id: &str,
        today: NaiveDate,
    ) -> CoreResult<PaymentResult> {
        let payment = self.payment(payment_id)?.clone();
        if !payment.is_received() {
            return Err(CoreError::InvalidTransition {
                action: "link".to_string(),
                status: "cancelled".to_string(),
            });
        }
        if let Some(existing) = &payment.matched {
            return Err(CoreError::DuplicateEntry {
                entry: format!("payment {} is already linked to row {}", payment_id, existing.row_id),
            });
        }

        let contract = self.contract(contract_id)?;
        if !contract.is_active() {
            return Err(CoreError::InvalidTransition {
                action: "link a payment to".to_string(),
                status: contract.status.to_string(),
            });
        }

        let row_ref = RowRef {
            contract_id: contract_id.to_string(),
            row_id: row_id.to_string(),
        };
        self.row(&row_ref)?;
        let result = self.allocate(&payment, &row_ref, today)?;
        log::info!("Payment {} linked by hand to row {}", payment_id, row_id);
        Ok(result)
    }

    /// Preview what cancelling a payment would revert
    pub fn cancellation_impact(&self, payment_id: &str) -> CoreResult<CancellationImpact> {
        let payment = self.payment(payment_id)?;
        let payments: Vec<&Payment> = self.data.payments.values().collect();
        Ok(validation::cancellation_impact(
            payment,
            self.data.contracts.values(),
            &payments,
        ))
    }

    /// Cancel a payment and revert everything it paid
    pub fn cancel_payment(&mut self, payment_id: &str, today: NaiveDate) -> CoreResult<UnlinkResult> {
        let payment = self.payment(payment_id)?;
        if !payment.is_received() {
            return Err(CoreError::InvalidTransition {
                action: "cancel".to_string(),
                status: "cancelled".to_string(),
            });
        }

        let (rows, total_reverted) = self.unlink(payment_id, today);
        let payment = self
            .data
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| CoreError::not_found("Payment", payment_id))?;
        payment.status = PaymentStatus::Cancelled;

        let payment = payment.clone();
        log::info!(
            "Cancelled payment {} ({} reverted from {} rows)",
            payment_id,
            self.money(total_reverted),
            rows.len()
        );
        Ok(UnlinkResult {
            payment,
            rows,
            total_reverted,
        })
    }

    fn unlink(&mut self, payment_id: &str, today: NaiveDate) -> (Vec<RowRef>, Decimal) {
        let mut rows = Vec::new();
        let mut total = Decimal::ZERO;

        for contract in self.data.contracts.values_mut() {
            let reverted = ledger::revert_payment(&mut contract.rows, payment_id);
            if reverted.is_empty() {
                continue;
            }
            for (row_id, amount) in reverted {
                total += amount;
                rows.push(RowRef {
                    contract_id: contract.id.clone(),
                    row_id,
                });
            }
            contract.summary = aggregate(&contract.rows, today);
        }

        if let Some(payment) = self.data.payments.get_mut(payment_id) {
            payment.matched = None;
        }
        (rows, total)
    }

    /// Re-run a payment operation by hand and close its open error log entries
    pub fn retry_operation(
        &mut self,
        payment_id: &str,
        operation: PaymentOperation,
        today: NaiveDate,
    ) -> CoreResult<RetryResult> {
        let attempt = self.run_operation(payment_id, operation, today);
        let (success, message) = match attempt {
            Ok(outcome) => outcome,
            Err(error) => {
                let context = ErrorContext::new("retry_operation")
                    .with_record(payment_id)
                    .with_data("operation", serde_json::json!(operation.to_string()));
                self.record_error(&error, Some(payment_id), operation, &context);
                return Err(error);
            }
        };

        let mut resolved_errors = Vec::new();
        if success {
            for entry in self.data.error_log.iter_mut().filter(|e| {
                e.status == ErrorLogStatus::Open
                    && e.operation == operation
                    && e.payment_id.as_deref() == Some(payment_id)
            }) {
                entry.status = ErrorLogStatus::Resolved;
                entry.resolution_notes = Some(format!("Resolved by retry on {}", today));
                resolved_errors.push(entry.id.clone());
            }
        }

        Ok(RetryResult {
            payment_id: payment_id.to_string(),
            operation,
            success,
            message,
            resolved_errors,
        })
    }

    fn run_operation(
        &mut self,
        payment_id: &str,
        operation: PaymentOperation,
        today: NaiveDate,
    ) -> CoreResult<(bool, String)> {
        let payment = self.payment(payment_id)?.clone();

        match operation {
            PaymentOperation::Link => {
                if !payment.is_received() || payment.matched.is_some() {
                    return Err(CoreError::InvalidTransition {
                        action: "re-link".to_string(),
                        status: if payment.is_received() { "linked" } else { "cancelled" }.to_string(),
                    });
                }
                let (outcome, _) = self.auto_match(payment_id, today)?;
                Ok(match outcome {
                    MatchOutcome::Matched { row } => (true, format!("Linked to row {}", row.row_id)),
                    MatchOutcome::NoMatch { reason } => (false, format!("Still unmatched: {}", reason)),
                    MatchOutcome::Ambiguous { rows } => {
                        (false, format!("Still ambiguous across {} rows", rows.len()))
                    }
                })
            }
            PaymentOperation::Unlink => {
                let (rows, total) = self.unlink(payment_id, today);
                Ok((
                    !rows.is_empty(),
                    format!("Reverted {} from {} rows", total, rows.len()),
                ))
            }
            PaymentOperation::Invoice => {
                let row_ref = payment.matched.ok_or_else(|| {
                    CoreError::validation(format!("Payment {} is not linked to a row", payment_id))
                })?;
                let row = self.row(&row_ref)?;
                if row.status != RowStatus::Paid {
                    return Ok((false, format!("Row {} is not fully paid", row.id)));
                }
                if let Some(reference) = &row.invoice_reference {
                    return Ok((true, format!("Invoice {} already exists", reference)));
                }
                match self.issue_invoice(&row_ref, Some(payment_id), today) {
                    None => Ok((true, format!("Invoice created for row {}", row_ref.row_id))),
                    Some(details) => Ok((false, details.message)),
                }
            }
        }
    }

    fn issue_invoice(
        &mut self,
        row_ref: &RowRef,
        payment_id: Option<&str>,
        today: NaiveDate,
    ) -> Option<ErrorDetails> {
        let request = {
            let contract = self.data.contracts.get(&row_ref.contract_id)?;
            let row = contract.row(&row_ref.row_id)?;
            if row.invoice_reference.is_some() {
                return None;
            }
            let tenant = self.data.tenants.iter().find(|t| t.id == contract.tenant);
            InvoiceRequest {
                contract_id: contract.id.clone(),
                row_id: row.id.clone(),
                tenant_id: contract.tenant.clone(),
                customer: tenant.and_then(|t| t.customer.clone()),
                due_date: row.due_date,
                posting_date: today,
                amount: row.amount_due,
                description: format!("Rent for {} due {}", contract.id, row.due_date),
            }
        };

        match self.invoices.create_invoice(&request) {
            Ok(reference) => {
                if let Some(row) = self
                    .data
                    .contracts
                    .get_mut(&row_ref.contract_id)
                    .and_then(|c| c.row_mut(&row_ref.row_id))
                {
                    row.invoice_reference = Some(reference);
                }
                None
            }
            Err(error) => {
                let error = match error {
                    CoreError::IntegrationError { .. } => error,
                    other => CoreError::IntegrationError {
                        message: other.to_string(),
                    },
                };
                let context = ErrorContext::new("create_invoice")
                    .with_record(&row_ref.row_id)
                    .with_data("contract", serde_json::json!(row_ref.contract_id));
                Some(self.record_error(&error, payment_id, PaymentOperation::Invoice, &context))
            }
        }
    }

    fn record_error(
        &mut self,
        error: &CoreError,
        payment_id: Option<&str>,
        operation: PaymentOperation,
        context: &ErrorContext,
    ) -> ErrorDetails {
        self.error_logger.log_error(error, context);

        let entry = ErrorLogEntry {
            id: self.data.next_id("ERR"),
            payment_id: payment_id.map(String::from),
            operation,
            error_code: error.code(),
            message: error.to_string(),
            timestamp: Utc::now().naive_utc(),
            status: ErrorLogStatus::Open,
            resolution_notes: None,
        };
        self.data.error_log.push(entry);
        error.to_details()
    }

    // ---------- Error log ----------

    /// Error log entries, optionally filtered by status
    pub fn error_logs(&self, status: Option<ErrorLogStatus>) -> Vec<&ErrorLogEntry> {
        self.data
            .error_log
            .iter()
            .filter(|e| status.map_or(true, |s| e.status == s))
            .collect()
    }

    /// Close an error log entry
    pub fn resolve_error(
        &mut self,
        id: &str,
        status: ErrorLogStatus,
        notes: &str,
    ) -> CoreResult<ErrorLogEntry> {
        if status == ErrorLogStatus::Open {
            return Err(CoreError::validation("Resolution status must be resolved or ignored"));
        }
        let entry = self
            .data
            .error_log
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| CoreError::not_found("Error log entry", id))?;
        entry.status = status;
        entry.resolution_notes = Some(notes.to_string());
        Ok(entry.clone())
    }

    // ---------- Periodic tasks ----------

    /// Waive part or all of a row's late fee
    pub fn waive_late_fee(
        &mut self,
        contract_id: &str,
        row_id: &str,
        amount: Decimal,
        reason: &str,
        today: NaiveDate,
    ) -> CoreResult<ScheduleRow> {
        let contract = self.contract_mut(contract_id)?;
        let row = contract
            .row_mut(row_id)
            .ok_or_else(|| CoreError::not_found("Schedule row", row_id))?;
        overdue::waive_late_fee(row, amount, reason)?;
        let row = row.clone();
        contract.summary = aggregate(&contract.rows, today);

        log::info!(
            "Waived {} of the late fee on row {}: {}",
            self.money(amount),
            row_id,
            reason
        );
        Ok(row)
    }

    /// Mark late rows overdue on every active contract
    pub fn mark_overdue(&mut self, today: NaiveDate) -> OverdueRunResult {
        let mut result = OverdueRunResult {
            as_of: today,
            contracts_checked: 0,
            rows_marked: 0,
            marked: Vec::new(),
        };

        for contract in self.data.contracts.values_mut().filter(|c| c.is_active()) {
            result.contracts_checked += 1;
            let marked = overdue::mark_overdue(
                &mut contract.rows,
                contract.late_fee_amount,
                contract.grace_period_days,
                today,
            );
            result.rows_marked += marked.len();
            result.marked.extend(marked.into_iter().map(|row_id| RowRef {
                contract_id: contract.id.clone(),
                row_id,
            }));
            contract.summary = aggregate(&contract.rows, today);
        }

        log::info!(
            "Overdue pass for {}: {} contracts checked, {} rows marked",
            today,
            result.contracts_checked,
            result.rows_marked
        );
        result
    }

    /// Send reminders for overdue and partially paid rows
    pub fn send_reminders(&mut self, today: NaiveDate, sink: &dyn ReminderSink) -> ReminderRunResult {
        let interval = self.config.reminders.interval_days;
        let mut result = ReminderRunResult {
            as_of: today,
            sent: 0,
            failed: 0,
            rows: Vec::new(),
        };

        let tenants = &self.data.tenants;
        for contract in self.data.contracts.values_mut().filter(|c| c.is_active()) {
            let contract_id = contract.id.clone();
            let tenant_id = contract.tenant.clone();
            let grace = contract.grace_period_days;
            let tenant = tenants.iter().find(|t| t.id == tenant_id);
            let due: Vec<String> = overdue::due_reminders(&contract.rows, today, interval)
                .into_iter()
                .map(|r| r.id.clone())
                .collect();

            for row_id in due {
                let Some(row) = contract.row_mut(&row_id) else {
                    continue;
                };
                let reminder = Reminder {
                    contract_id: contract_id.clone(),
                    row_id: row.id.clone(),
                    tenant_id: tenant_id.clone(),
                    tenant_name: tenant
                        .map(|t| t.display_name())
                        .unwrap_or_else(|| tenant_id.clone()),
                    email: tenant.and_then(|t| t.email.clone()),
                    due_date: row.due_date,
                    outstanding: row.outstanding,
                    days_overdue: overdue::overdue_days(row, grace, today),
                    sequence: row.reminder_count + 1,
                };

                match sink.send_reminder(&reminder) {
                    Ok(()) => {
                        overdue::record_reminder(row, today);
                        result.sent += 1;
                        result.rows.push(RowRef {
                            contract_id: contract_id.clone(),
                            row_id,
                        });
                    }
                    Err(e) => {
                        log::warn!("Failed to send reminder for row {}: {}", row_id, e);
                        result.failed += 1;
                    }
                }
            }
        }

        log::info!(
            "Reminder run for {}: {} sent, {} failed",
            today,
            result.sent,
            result.failed
        );
        result
    }

    // ---------- Reports ----------

    pub fn payment_summary(&self, contract_id: &str, today: NaiveDate) -> CoreResult<reports::PaymentSummary> {
        Ok(reports::payment_summary(self.contract(contract_id)?, today))
    }

    pub fn schedule_status(
        &self,
        contract_id: &str,
        today: NaiveDate,
    ) -> CoreResult<reports::ScheduleStatusReport> {
        Ok(reports::schedule_status(self.contract(contract_id)?, today))
    }

    pub fn overdue_analysis(&self, today: NaiveDate) -> reports::OverdueAnalysis {
        reports::overdue_analysis(
            self.data.contracts.values().filter(|c| c.is_active()),
            &self.data.tenants,
            &self.data.properties,
            today,
        )
    }

    pub fn dashboard(&self, today: NaiveDate) -> reports::PortfolioDashboard {
        reports::dashboard(
            reports::DashboardInput {
                properties: self.data.properties.len(),
                units: &self.data.units,
                tenants: self.data.tenants.len(),
                contracts: &self.data.contracts,
                payments: &self.data.payments,
                open_errors: self.error_logs(Some(ErrorLogStatus::Open)).len(),
            },
            today,
        )
    }

    pub fn property_performance(
        &self,
        property_id: &str,
        today: NaiveDate,
    ) -> CoreResult<reports::PropertyPerformance> {
        let property = self.property(property_id)?;
        Ok(reports::property_performance(
            property,
            self.data.units.values(),
            self.data.contracts.values(),
            today,
        ))
    }

    pub fn linking_report(&self, period: &ReportPeriod, today: NaiveDate) -> reports::LinkingReport {
        reports::linking_report(self.data.payments.values(), period, today)
    }
}

fn terms_of(contract: &Contract) -> ScheduleTerms {
    ScheduleTerms {
        start_date: contract.start_date,
        end_date: contract.end_date,
        monthly_rent: contract.monthly_rent,
        frequency: contract.frequency,
        due_day: contract.due_day,
    }
}

fn check_late_fee(amount: Decimal) -> CoreResult<()> {
    if amount < Decimal::ZERO {
        return Err(CoreError::validation("Late fee amount cannot be negative"));
    }
    Ok(())
}

// ==================== Tests ====================
