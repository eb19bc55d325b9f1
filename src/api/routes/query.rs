//! Query Routes
//!
//! - GET /query - Query string form, repeated `query`/`hidden` keys
//! - POST /query - JSON body form

use axum::{
    body::Bytes,
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{from_json_body, QueryRequest, QueryResponse};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /query
pub async fn query_get(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<QueryResponse>> {
    let request = QueryRequest::from_pairs(&pairs)?;
    run(&state, request).await
}

/// POST /query
pub async fn query_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<QueryResponse>> {
    let request: QueryRequest = from_json_body(&body)?;
    run(&state, request).await
}

async fn run(state: &AppState, request: QueryRequest) -> ApiResult<Json<QueryResponse>> {
    let spec = request.into_spec(&state.times)?;
    let output = state.executor.execute(&spec).await?;
    Ok(Json(QueryResponse::from(output)))
}
