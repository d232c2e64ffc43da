//! HTTP API server for rentledger
//!
//! Routes are organized into modules:
//! - routes::registry: Properties, units and tenants
//! - routes::contracts: Contract lifecycle and schedule rows
//! - routes::payments: Receiving, linking and cancelling payments
//! - routes::tasks: Overdue pass and reminders
//! - routes::reports: Dashboard and analysis reports
//! - routes::errors: Integration error log
//! - routes::settings: Configuration display

pub mod error;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use rentledger_config::Config;
use rentledger_core::RentalManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

pub use error::ApiError;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<RwLock<RentalManager>>,
    pub config: Config,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    use routes::contracts::{
        api_activate_contract, api_cancel_contract, api_contract_detail, api_contract_status,
        api_contract_summary, api_contracts, api_create_contract, api_record_payment,
        api_update_contract, api_waive_late_fee,
    };
    use routes::errors::{api_error_logs, api_resolve_error};
    use routes::payments::{
        api_cancel_payment, api_cancellation_impact, api_link_payment, api_payment_detail,
        api_payments, api_receive_payment, api_retry_operation, api_validate_payment,
    };
    use routes::registry::{
        api_create_property, api_create_tenant, api_create_unit, api_properties, api_tenants,
        api_units,
    };
    use routes::reports::{
        api_dashboard, api_linking_report, api_overdue_analysis, api_property_performance,
        api_property_summary, api_tenant_summary,
    };
    use routes::settings::{api_settings, api_settings_metadata};
    use routes::tasks::{api_mark_overdue, api_send_reminders};

    let prefix = state.config.server.api_prefix.trim_end_matches('/').to_string();

    let api = Router::new()
        .route("/health", get(health_check))
        // Registry
        .route("/properties", get(api_properties).post(api_create_property))
        .route("/units", get(api_units).post(api_create_unit))
        .route("/tenants", get(api_tenants).post(api_create_tenant))
        .route("/tenants/:id/summary", get(api_tenant_summary))
        // Contracts
        .route("/contracts", get(api_contracts).post(api_create_contract))
        .route("/contracts/:id", get(api_contract_detail).put(api_update_contract))
        .route("/contracts/:id/activate", post(api_activate_contract))
        .route("/contracts/:id/cancel", post(api_cancel_contract))
        .route("/contracts/:id/summary", get(api_contract_summary))
        .route("/contracts/:id/status", get(api_contract_status))
        .route("/contracts/:id/payments", post(api_record_payment))
        .route("/contracts/:id/rows/:row/waive", post(api_waive_late_fee))
        // Payments
        .route("/payments", get(api_payments).post(api_receive_payment))
        .route("/payments/validate", post(api_validate_payment))
        .route("/payments/:id", get(api_payment_detail))
        .route("/payments/:id/link", post(api_link_payment))
        .route("/payments/:id/cancel", post(api_cancel_payment))
        .route("/payments/:id/cancellation-impact", get(api_cancellation_impact))
        .route("/payments/:id/retry", post(api_retry_operation))
        // Tasks
        .route("/tasks/mark-overdue", post(api_mark_overdue))
        .route("/tasks/send-reminders", post(api_send_reminders))
        // Reports
        .route("/reports/dashboard", get(api_dashboard))
        .route("/reports/overdue", get(api_overdue_analysis))
        .route("/reports/linking", get(api_linking_report))
        .route("/reports/properties/:id", get(api_property_performance))
        .route("/reports/properties/:id/summary", get(api_property_summary))
        // Error log
        .route("/errors", get(api_error_logs))
        .route("/errors/:id/resolve", post(api_resolve_error))
        // Settings
        .route("/settings", get(api_settings))
        .route("/settings/metadata", get(api_settings_metadata));

    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    router.layer(CorsLayer::permissive()).with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Start the HTTP server
///
/// Binds to `server.host:server.port` and serves until Ctrl-C.
pub async fn start_server(config: Config, manager: Arc<RwLock<RentalManager>>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let prefix = config.server.api_prefix.clone();
    let state = AppState { manager, config };

    let router = create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting rentledger server on http://{}", addr);
    log::info!("JSON API available under {}", if prefix.is_empty() { "/" } else { &prefix });

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("Server stopped gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::default();
        let manager = RentalManager::new(config.clone()).unwrap();
        create_router(AppState {
            manager: Arc::new(RwLock::new(manager)),
            config,
        })
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn seed(router: &Router) -> String {
        let (status, property) = send(router, Method::POST, "/api/properties", Some(json!({"name": "Elm Court"}))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, unit) = send(
            router,
            Method::POST,
            "/api/units",
            Some(json!({"property_id": property["id"], "unit_number": "1A", "base_rent": "1000"})),
        )
        .await;
        let (_, tenant) = send(
            router,
            Method::POST,
            "/api/tenants",
            Some(json!({"name": "Jane Doe", "email": "jane@example.com"})),
        )
        .await;

        let (status, contract) = send(
            router,
            Method::POST,
            "/api/contracts",
            Some(json!({
                "tenant": tenant["id"],
                "rental_unit": unit["id"],
                "start_date": "2025-01-01",
                "end_date": "2025-12-31",
                "monthly_rent": "1000",
                "frequency": "monthly",
                "due_day": 5,
                "late_fee_amount": "50"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(contract["status"], "draft");

        let id = contract["id"].as_str().unwrap().to_string();
        let (status, active) = send(
            router,
            Method::POST,
            &format!("/api/contracts/{}/activate?today=2025-01-01", id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(active["rows"].as_array().unwrap().len(), 12);
        id
    }

    #[tokio::test]
    async fn test_health() {
        let router = app();
        let response = router
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_payment_flow() {
        let router = app();
        let contract = seed(&router).await;

        let (status, receipt) = send(
            &router,
            Method::POST,
            "/api/payments?today=2025-01-05",
            Some(json!({
                "payer": "jane@example.com",
                "amount": "1000",
                "date": "2025-01-05",
                "memo": "January rent",
                "reference_no": "TX-1"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(receipt["outcome"]["outcome"], "matched");
        assert_eq!(receipt["allocation"]["row"]["status"], "paid");

        let (status, summary) = send(
            &router,
            Method::GET,
            &format!("/api/contracts/{}/summary?today=2025-01-06", contract),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["completed"], 1);

        let payment = receipt["payment"]["id"].as_str().unwrap();
        let (status, cancelled) = send(
            &router,
            Method::POST,
            &format!("/api/payments/{}/cancel?today=2025-01-06", payment),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["payment"]["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let router = app();
        let contract = seed(&router).await;

        let (status, body) = send(&router, Method::GET, "/api/contracts/RC-09999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/contracts/{}/activate", contract),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "INVALID_TRANSITION");

        let (status, body) = send(
            &router,
            Method::POST,
            &format!("/api/contracts/{}/payments?today=2025-02-05", contract),
            Some(json!({"due_date": "2025-02-05", "amount": "1500"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], "AMOUNT_EXCEEDS_OUTSTANDING");
    }

    #[tokio::test]
    async fn test_overdue_task_and_reports() {
        let router = app();
        seed(&router).await;

        let (status, run) = send(&router, Method::POST, "/api/tasks/mark-overdue?today=2025-01-15", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["rows_marked"], 1);

        let (_, reminders) = send(&router, Method::POST, "/api/tasks/send-reminders?today=2025-01-15", None).await;
        assert_eq!(reminders["sent"], 1);

        let (status, dashboard) = send(&router, Method::GET, "/api/reports/dashboard?today=2025-01-15", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(dashboard["schedules_overdue"], 1);

        let (status, _) = send(&router, Method::GET, "/api/reports/linking?range=fortnight", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, errors) = send(&router, Method::GET, "/api/errors?status=open", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(errors.as_array().unwrap().is_empty());
    }
}
