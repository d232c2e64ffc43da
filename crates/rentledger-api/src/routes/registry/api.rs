//! Registry API endpoints

use crate::error::ApiResult;
use crate::AppState;
use axum::extract::State;
use axum::Json;
use rentledger_core::{Property, RentalUnit, Tenant};

pub async fn api_properties(State(state): State<AppState>) -> Json<Vec<Property>> {
    let manager = state.manager.read().await;
    Json(manager.data().properties.values().cloned().collect())
}

pub async fn api_create_property(
    State(state): State<AppState>,
    Json(property): Json<Property>,
) -> ApiResult<Property> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.add_property(property)?))
}

pub async fn api_units(State(state): State<AppState>) -> Json<Vec<RentalUnit>> {
    let manager = state.manager.read().await;
    Json(manager.data().units.values().cloned().collect())
}

pub async fn api_create_unit(
    State(state): State<AppState>,
    Json(unit): Json<RentalUnit>,
) -> ApiResult<RentalUnit> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.add_unit(unit)?))
}

pub async fn api_tenants(State(state): State<AppState>) -> Json<Vec<Tenant>> {
    let manager = state.manager.read().await;
    Json(manager.tenants().to_vec())
}

pub async fn api_create_tenant(
    State(state): State<AppState>,
    Json(tenant): Json<Tenant>,
) -> ApiResult<Tenant> {
    let mut manager = state.manager.write().await;
    Ok(Json(manager.add_tenant(tenant)?))
}
