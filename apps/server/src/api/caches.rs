use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use ibdash_core::cache::CachedPayload;

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

/// Last account summary; 404 until the first successful fetch.
async fn get_account(State(state): State<Arc<AppState>>) -> ApiResult<Json<CachedPayload>> {
    let cached = state.dashboard_service.get_account_cache()?;
    cached.map(Json).ok_or(ApiError::NotFound)
}

async fn get_portfolio(State(state): State<Arc<AppState>>) -> ApiResult<Json<CachedPayload>> {
    let cached = state.dashboard_service.get_portfolio_cache()?;
    cached.map(Json).ok_or(ApiError::NotFound)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/account", get(get_account))
        .route("/portfolio", get(get_portfolio))
}
