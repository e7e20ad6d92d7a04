use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use ibdash_core::status::{HealthLevel, RefreshStatus};
use serde::Serialize;

use crate::main_lib::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: HealthLevel,
    #[serde(flatten)]
    pub refresh: RefreshStatus,
}

/// Health of the refresh loop in this process.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let refresh = state.status_reporter.snapshot();
    let stale_after = chrono::Duration::from_std(state.stale_after)
        .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
    let status = refresh.health(Utc::now(), stale_after);
    Json(StatusResponse { status, refresh })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(get_status))
}
