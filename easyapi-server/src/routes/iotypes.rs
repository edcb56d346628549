//! IOType catalogue endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ServerContext;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::routes::{default_limit, page};

pub fn router() -> Router<ServerContext> {
    Router::new()
        .route("/", get(list))
        .route("/{io_id}", get(schema))
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    #[serde(default)]
    full: bool,
}

async fn list(
    State(ctx): State<ServerContext>,
    _caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let total = ctx.iotypes.len();
    let skip = query.skip.max(0) as usize;
    if skip > total {
        return Err(ApiError::BadRequest(format!(
            "skip({skip}) is larger than total number ({total})"
        )));
    }
    let (limit, limit_field) = page(query.limit);
    let records = if query.full {
        json!(ctx.iotypes.list_schemas(skip, limit))
    } else {
        json!(ctx.iotypes.list_ids(skip, limit))
    };
    Ok(Json(json!({
        "total": total,
        "skip": skip,
        "limit": limit_field,
        "records": records,
    })))
}

async fn schema(
    State(ctx): State<ServerContext>,
    _caller: Caller,
    Path(io_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let io_type = ctx
        .iotypes
        .lookup(&io_id)
        .map_err(|_| ApiError::NotFound(format!("IO type {io_id} not found")))?;
    Ok(Json(json!(io_type)))
}
