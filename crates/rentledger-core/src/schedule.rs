//! Rent schedule generation
//!
//! Turns contract terms into an ordered list of due dates and per-period
//! amounts. Month-based frequencies land on the contract's due day (capped so
//! it exists in every month); day-based frequencies step from the start date.

use chrono::{Datelike, Duration, NaiveDate};
use rentledger_config::ScheduleConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::{CoreError, CoreResult};
use super::types::PaymentFrequency;

/// Inputs that determine a schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleTerms {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monthly_rent: Decimal,
    pub frequency: PaymentFrequency,
    pub due_day: u32,
}

/// One generated installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Check contract terms, including that they produce at least one due date
pub fn validate_terms(terms: &ScheduleTerms, config: &ScheduleConfig) -> CoreResult<()> {
    check_fields(terms, config)?;
    due_dates(terms, config).map(|_| ())
}

/// Reject grace periods longer than the configured maximum
pub fn validate_grace_period(days: u32, config: &ScheduleConfig) -> CoreResult<()> {
    if days > config.max_grace_period_days {
        return Err(CoreError::validation(format!(
            "Grace period of {} days exceeds the maximum of {} days",
            days, config.max_grace_period_days
        )));
    }
    Ok(())
}

fn check_fields(terms: &ScheduleTerms, config: &ScheduleConfig) -> CoreResult<()> {
    if terms.end_date <= terms.start_date {
        return Err(CoreError::InvalidDateRange {
            start: terms.start_date,
            end: terms.end_date,
        });
    }

    let days = (terms.end_date - terms.start_date).num_days();
    if days < config.min_duration_days {
        return Err(CoreError::DurationTooShort {
            days,
            min_days: config.min_duration_days,
        });
    }

    if terms.monthly_rent <= Decimal::ZERO {
        return Err(CoreError::NonPositiveAmount {
            field: "monthly_rent".to_string(),
        });
    }

    if !(1..=31).contains(&terms.due_day) {
        return Err(CoreError::validation(format!(
            "Due day {} must be between 1 and 31",
            terms.due_day
        )));
    }

    Ok(())
}

/// Amount charged per period for a monthly rent
pub fn period_amount(
    monthly_rent: Decimal,
    frequency: PaymentFrequency,
    config: &ScheduleConfig,
    decimal_places: u32,
) -> Decimal {
    let amount = match frequency {
        PaymentFrequency::Monthly => monthly_rent,
        PaymentFrequency::Quarterly => monthly_rent * Decimal::from(3),
        PaymentFrequency::Annually => monthly_rent * Decimal::from(12),
        PaymentFrequency::Weekly => monthly_rent / config.weekly_periods_per_month,
        PaymentFrequency::BiWeekly => monthly_rent / config.biweekly_periods_per_month,
    };
    amount.round_dp(decimal_places)
}

/// Generate the ordered due dates and amounts for a contract, end date inclusive
pub fn generate(
    terms: &ScheduleTerms,
    config: &ScheduleConfig,
    decimal_places: u32,
) -> CoreResult<Vec<ScheduleEntry>> {
    check_fields(terms, config)?;

    let amount = period_amount(terms.monthly_rent, terms.frequency, config, decimal_places);
    let dates = due_dates(terms, config)?;

    log::debug!(
        "Generated {} {} installments of {} between {} and {}",
        dates.len(),
        terms.frequency,
        amount,
        terms.start_date,
        terms.end_date
    );

    Ok(dates
        .into_iter()
        .map(|due_date| ScheduleEntry { due_date, amount })
        .collect())
}

/// Due dates for already checked terms; an empty schedule is an error
fn due_dates(terms: &ScheduleTerms, config: &ScheduleConfig) -> CoreResult<Vec<NaiveDate>> {
    let dates = match (terms.frequency.months(), terms.frequency.days()) {
        (Some(months), _) => month_based_dates(terms, months, config.due_day_cap)?,
        (None, Some(days)) => day_based_dates(terms, days),
        (None, None) => {
            return Err(CoreError::InternalError {
                message: format!("Frequency {} has no step", terms.frequency),
            })
        }
    };

    if dates.is_empty() {
        return Err(CoreError::validation(format!(
            "Contract terms produce no due dates between {} and {}",
            terms.start_date, terms.end_date
        )));
    }
    Ok(dates)
}

fn month_based_dates(terms: &ScheduleTerms, step: u32, due_day_cap: u32) -> CoreResult<Vec<NaiveDate>> {
    let day = terms.due_day.min(due_day_cap);
    // A due day earlier than the start day belongs to the next interval
    let shift = if day < terms.start_date.day() { 1 } else { 0 };
    let base = terms.start_date.year() * 12 + terms.start_date.month0() as i32;

    let mut dates = Vec::new();
    let mut k: i32 = 0;
    loop {
        let index = base + (k + shift) * step as i32;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) as u32 + 1;
        let due = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| CoreError::InternalError {
            message: format!("Cannot build due date {}-{}-{}", year, month, day),
        })?;
        if due > terms.end_date {
            break;
        }
        if due >= terms.start_date {
            dates.push(due);
        }
        k += 1;
    }
    Ok(dates)
}

fn day_based_dates(terms: &ScheduleTerms, step: i64) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let mut due = terms.start_date;
    while due <= terms.end_date {
        dates.push(due);
        due = match due.checked_add_signed(Duration::days(step)) {
            Some(next) => next,
            None => break,
        };
    }
    dates
}

// ==================== Tests ====================
