//! Payment API endpoints

use crate::error::ApiResult;
use crate::routes::AsOf;
use crate::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use rentledger_core::{
    CancellationImpact, NewPayment, Payment, PaymentOperation, PaymentResult, PaymentStatus,
    ReceiptResult, RetryResult, UnlinkResult, ValidationReport,
};
use serde::Deserialize;

/// Payment list filters
#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    pub status: Option<PaymentStatus>,
    /// Only payments not linked to any row
    #[serde(default)]
    pub unmatched: bool,
}

pub async fn api_payments(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> Json<Vec<Payment>> {
    let manager = state.manager.read().await;
    let payments = manager
        .payments()
        .into_iter()
        .filter(|p| query.status.map_or(true, |s| p.status == s))
        .filter(|p| !query.unmatched || (p.is_received() && p.matched.is_none()))
        .cloned()
        .collect();
    Json(payments)
}

pub async fn api_payment_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Payment> {
    let manager = state.manager.read().await;
    Ok(Json(manager.payment(&id)?.clone()))
}

/// Store a payment and try to match it to a schedule row
pub async fn api_receive_payment(
    State(state): State<AppState>,
    Query(as_of): Query<AsOf>,
    Json(payment): Json<NewPayment>,
) -> ApiResult<ReceiptResult> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.receive_payment(payment, as_of.date())?))
}

pub async fn api_validate_payment(
    State(state): State<AppState>,
    Query(as_of): Query<AsOf>,
    Json(payment): Json<NewPayment>,
) -> Json<ValidationReport> {
    let manager = state.manager.read().await;
    Json(manager.validate_payment(&payment, as_of.date()))
}

/// Manual link target
#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub contract_id: String,
    pub row_id: String,
}

pub async fn api_link_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
    Json(request): Json<LinkRequest>,
) -> ApiResult<PaymentResult> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.link_payment(
        &id,
        &request.contract_id,
        &request.row_id,
        as_of.date(),
    )?))
}

pub async fn api_cancel_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
) -> ApiResult<UnlinkResult> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.cancel_payment(&id, as_of.date())?))
}

pub async fn api_cancellation_impact(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CancellationImpact> {
    let manager = state.manager.read().await;
    Ok(Json(manager.cancellation_impact(&id)?))
}

#[derive(Debug, Deserialize)]
pub struct RetryRequest {
    pub operation: PaymentOperation,
}

pub async fn api_retry_operation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(as_of): Query<AsOf>,
    Json(request): Json<RetryRequest>,
) -> ApiResult<RetryResult> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.retry_operation(&id, request.operation, as_of.date())?))
}
