//! Contract API endpoints

use crate::error::ApiResult;
use crate::routes::AsOf;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use rentledger_core::reports::{PaymentSummary, ScheduleStatusReport};
use rentledger_core::{
    Contract, ContractStatus, ContractUpdate, NewContract, PaymentResult, RecordPayment,
    ScheduleRow,
};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Contract list filters
#[derive(Debug, Default, Deserialize)]
pub struct ContractQuery {
    pub status: Option<ContractStatus>,
    pub tenant: Option<String>,
}

pub async fn api_contracts(
    State(state): State<AppState>,
    Query(query): Query<ContractQuery>,
) -> Json<Vec<Contract>> {
    let manager = state.manager.read().await;
    let contracts = manager
        .contracts()
        .into_iter()
        .filter(|c| query.status.map_or(true, |s| c.status == s))
        .filter(|c| query.tenant.as_deref().map_or(true, |t| c.tenant == t))
        .cloned()
        .collect();
    Json(contracts)
}

pub async fn api_create_contract(
    State(state): State<AppState>,
    Json(contract): Json<NewContract>,
) -> ApiResult<Contract> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.create_contract(contract)?))
}

pub async fn api_contract_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Contract> {
    let manager = state.manager.read().await;
    Ok(Json(manager.contract(&id)?.clone()))
}

pub async fn api_update_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<ContractUpdate>,
) -> ApiResult<Contract> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.update_contract(&id, update)?))
}

pub async fn api_activate_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<Contract> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.activate_contract(&id, as_of.date())?))
}

pub async fn api_cancel_contract(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<Contract> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.cancel_contract(&id, as_of.date())?))
}

pub async fn api_contract_summary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<PaymentSummary> {
    let manager = state.manager.read().await;
    Ok(Json(manager.payment_summary(&id, as_of.date())?))
}

pub async fn api_contract_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<ScheduleStatusReport> {
    let manager = state.manager.read().await;
    Ok(Json(manager.schedule_status(&id, as_of.date())?))
}

pub async fn api_record_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
    Json(request): Json<RecordPayment>,
) -> ApiResult<PaymentResult> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.record_payment(&id, request, as_of.date())?))
}

/// Late fee waiver request
#[derive(Debug, Deserialize)]
pub struct WaiveRequest {
    pub amount: Decimal,
    #[serde(default)]
    pub reason: String,
}

pub async fn api_waive_late_fee(
    State(state): State<AppState>,
    Path((id, row)): Path<(String, String)>,
    Query(as_of): Query<AsOf>,
    Json(request): Json<WaiveRequest>,
) -> ApiResult<ScheduleRow> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.waive_late_fee(
        &id,
        &row,
        request.amount,
        &request.reason,
        as_of.date(),
    )?))
}
