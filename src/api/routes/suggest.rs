//! Suggest Routes
//!
//! - GET /suggest/metrics - Query string form
//! - POST /suggest/metrics - JSON body form, an empty body lists the root

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{from_json_body, SuggestRequest};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::catalog::SuggestEntry;

/// GET /suggest/metrics
pub async fn suggest_get(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<Vec<SuggestEntry>>> {
    let request = SuggestRequest::from_pairs(&pairs)?;
    run(&state, request).await
}

/// POST /suggest/metrics
pub async fn suggest_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<Vec<SuggestEntry>>> {
    let request: SuggestRequest = from_json_body(&body)?;
    run(&state, request).await
}

async fn run(state: &AppState, request: SuggestRequest) -> ApiResult<Json<Vec<SuggestEntry>>> {
    let entries = state
        .catalog
        .suggest(&request.query, request.recursive, request.withds)
        .await?;
    Ok(Json(entries))
}
