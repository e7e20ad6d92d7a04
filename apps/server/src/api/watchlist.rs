use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use ibdash_core::watchlist::{AddSymbolOutcome, WatchlistItem};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddSymbolRequest {
    symbol: String,
    name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddSymbolResponse {
    outcome: AddSymbolOutcome,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveSymbolsRequest {
    symbols: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoveSymbolsResponse {
    removed: usize,
}

async fn get_watchlist(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<WatchlistItem>>> {
    let items = state.dashboard_service.get_watchlist_with_latest_prices()?;
    Ok(Json(items))
}

async fn add_symbol(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddSymbolRequest>,
) -> ApiResult<(StatusCode, Json<AddSymbolResponse>)> {
    let outcome = state
        .dashboard_service
        .add_symbol(&body.symbol, body.name.as_deref())
        .await?;
    let status = match outcome {
        AddSymbolOutcome::Added => StatusCode::CREATED,
        AddSymbolOutcome::AlreadyPresent => StatusCode::OK,
    };
    Ok((status, Json(AddSymbolResponse { outcome })))
}

async fn remove_symbols(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RemoveSymbolsRequest>,
) -> ApiResult<Json<RemoveSymbolsResponse>> {
    if body.symbols.is_empty() {
        return Err(ApiError::BadRequest("No symbols given".to_string()));
    }
    let removed = state.dashboard_service.remove_symbols(&body.symbols).await?;
    Ok(Json(RemoveSymbolsResponse { removed }))
}

async fn remove_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> ApiResult<StatusCode> {
    let removed = state.dashboard_service.remove_symbols(&[symbol]).await?;
    if removed == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/watchlist",
            get(get_watchlist).post(add_symbol).delete(remove_symbols),
        )
        .route("/watchlist/{symbol}", delete(remove_symbol))
}
