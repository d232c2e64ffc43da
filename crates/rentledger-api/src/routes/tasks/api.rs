//! Task API endpoints

use crate::routes::AsOf;
use crate::AppState;
use axum::extract::{Query, State};
use axum::Json;
use rentledger_core::{LogReminderSink, OverdueRunResult, ReminderRunResult};

pub async fn api_mark_overdue(
    State(state): State<AppState>,
    Query(as_of): Query<AsOf>,
) -> Json<OverdueRunResult> {
    let mut manager = state.manager.write().await;
    Json(manager.mark_overdue(as_of.date()))
}

pub async fn api_send_reminders(
    State(state): State<AppState>,
    Query(as_of): Query<AsOf>,
) -> Json<ReminderRunResult> {
    let mut manager = state.manager.write().await;
    Json(manager.send_reminders(as_of.date(), &LogReminderSink))
}
