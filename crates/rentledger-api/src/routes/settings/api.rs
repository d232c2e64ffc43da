//! Settings API endpoints - JSON API

use crate::AppState;
use axum::extract::State;
use axum::Json;
use rentledger_config::Config;

pub async fn api_settings(State(state): State<AppState>) -> Json<Config> {
    Json(state.config.clone())
}

pub async fn api_settings_metadata() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "server": {
            "host": "string",
            "port": "number",
            "api_prefix": "string"
        },
        "data": {
            "snapshot": "path | null"
        },
        "schedule": {
            "min_duration_days": "number",
            "due_day_cap": "number",
            "default_grace_period_days": "number",
            "max_grace_period_days": "number",
            "weekly_periods_per_month": "decimal",
            "biweekly_periods_per_month": "decimal"
        },
        "matching": {
            "amount_tolerance": "decimal",
            "date_window_days": "number",
            "amount_match_ratio": "decimal",
            "keywords": "string[]"
        },
        "validation": {
            "overpayment_tolerance": "decimal",
            "duplicate_window_days": "number",
            "duplicate_amount_tolerance": "decimal",
            "due_date_distance_days": "number"
        },
        "reminders": {
            "enable": "bool",
            "interval_days": "number"
        },
        "scheduler": {
            "enable": "bool",
            "interval_secs": "number"
        },
        "reports": {
            "default_range": "month | quarter | year | all | custom"
        },
        "currency": {
            "default_currency": "string",
            "decimal_places": "number",
            "thousands_separator": "string"
        },
        "logging": {
            "level": "string"
        }
    }))
}
