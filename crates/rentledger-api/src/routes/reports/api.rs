//! Report API endpoints

use crate::error::{ApiError, ApiResult};
use crate::routes::AsOf;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use rentledger_config::TimeRange;
use rentledger_core::reports::{LinkingReport, OverdueAnalysis, PortfolioDashboard, PropertyPerformance};
use rentledger_core::{ReportPeriod, ScheduleSummary};
use serde::Deserialize;

pub async fn api_dashboard(
    State(state): State<AppState>,
    Query(as_of): Query<AsOf>,
) -> Json<PortfolioDashboard> {
    let manager = state.manager.read().await;
    Json(manager.dashboard(as_of.date()))
}

pub async fn api_overdue_analysis(
    State(state): State<AppState>,
    Query(as_of): Query<AsOf>,
) -> Json<OverdueAnalysis> {
    let manager = state.manager.read().await;
    Json(manager.overdue_analysis(as_of.date()))
}

/// Linking report period; falls back to `reports.default_range`
#[derive(Debug, Default, Deserialize)]
pub struct LinkingQuery {
    pub range: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub today: Option<NaiveDate>,
}

impl LinkingQuery {
    fn period(&self, default_range: TimeRange) -> Result<ReportPeriod, ApiError> {
        let range = match &self.range {
            Some(r) => r.parse::<TimeRange>().map_err(ApiError::bad_request)?,
            None if self.start.is_some() || self.end.is_some() => TimeRange::Custom,
            None => default_range,
        };
        if range != TimeRange::Custom {
            return Ok(ReportPeriod::new(range));
        }
        match (self.start, self.end) {
            (Some(start), Some(end)) if start <= end => Ok(ReportPeriod::custom(start, end)),
            (Some(_), Some(_)) => Err(ApiError::bad_request("start must not be after end")),
            _ => Err(ApiError::bad_request("custom range needs both start and end")),
        }
    }
}

pub async fn api_linking_report(
    State(state): State<AppState>,
    Query(query): Query<LinkingQuery>,
) -> ApiResult<LinkingReport> {
    let period = query.period(state.config.reports.default_range)?;
    let today = AsOf { today: query.today }.date();
    let manager = state.manager.read().await;
    Ok(Json(manager.linking_report(&period, today)))
}

pub async fn api_property_performance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<PropertyPerformance> {
    let manager = state.manager.read().await;
    Ok(Json(manager.property_performance(&id, as_of.date())?))
}

pub async fn api_tenant_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<ScheduleSummary> {
    let manager = state.manager.read().await;
    Ok(Json(manager.tenant_summary(&id, as_of.date())?))
}

pub async fn api_property_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<ScheduleSummary> {
    let manager = state.manager.read().await;
    Ok(Json(manager.property_summary(&id, as_of.date())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_linking_query_period() {
        let default = LinkingQuery::default().period(TimeRange::Year).unwrap();
        assert_eq!(default.range, TimeRange::Year);

        let implied = LinkingQuery {
            start: Some(date(2025, 1, 1)),
            end: Some(date(2025, 1, 31)),
            ..Default::default()
        };
        assert_eq!(
            implied.period(TimeRange::Month).unwrap(),
            ReportPeriod::custom(date(2025, 1, 1), date(2025, 1, 31))
        );

        let reversed = LinkingQuery {
            start: Some(date(2025, 2, 1)),
            end: Some(date(2025, 1, 1)),
            ..Default::default()
        };
        assert!(reversed.period(TimeRange::Month).is_err());

        let bogus = LinkingQuery {
            range: Some("fortnight".into()),
            ..Default::default()
        };
        assert!(bogus.period(TimeRange::Month).is_err());
    }
}
