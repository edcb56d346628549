//! Algorithm catalogue and job submission endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use axum::routing::get;
use axum::Router;
use easyapi_core::{Algorithm, Task};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::ServerContext;
use crate::error::ApiError;
use crate::extract::Caller;
use crate::routes::{default_limit, page};

pub fn router() -> Router<ServerContext> {
    Router::new()
        .route("/", get(list))
        .route("/{entry}", get(doc).post(submit))
        .route("/{entry}/name", get(facet_name))
        .route("/{entry}/version", get(facet_version))
        .route("/{entry}/desc", get(facet_desc))
        .route("/{entry}/ref", get(facet_ref))
        .route("/{entry}/in", get(facet_in))
        .route("/{entry}/out", get(facet_out))
}

fn get_entry(ctx: &ServerContext, entry: &str) -> Result<Arc<Algorithm>, ApiError> {
    ctx.algorithms
        .get(entry)
        .map_err(|_| ApiError::NotFound(format!("{entry} not found")))
}

fn check_access(ctx: &ServerContext, caller: &Caller, entry: &str) -> Result<(), ApiError> {
    if ctx.auth.allows(&caller.access_id, entry) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!("no access to {entry}")))
    }
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
    /// Include algorithm names alongside ids.
    #[serde(default)]
    name: bool,
}

/// List the algorithms the caller may see. Access filtering happens before
/// pagination, so `total` reflects the caller's view.
async fn list(
    State(ctx): State<ServerContext>,
    caller: Caller,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let entries = ctx.auth.access_filter(&caller.access_id, ctx.algorithms.ids());
    let total = entries.len();
    let skip = query.skip.max(0) as usize;
    if skip > total {
        return Err(ApiError::BadRequest(format!(
            "skip({skip}) is larger than total number ({total})"
        )));
    }
    let (limit, limit_field) = page(query.limit);
    let records: Vec<Value> = entries
        .iter()
        .skip(skip)
        .take(limit.unwrap_or(usize::MAX))
        .map(|id| {
            if query.name {
                let name = ctx
                    .algorithms
                    .get(id)
                    .map(|a| a.name.clone())
                    .unwrap_or_default();
                json!({ "id": id, "name": name })
            } else {
                json!(id)
            }
        })
        .collect();
    Ok(Json(json!({
        "total": total,
        "skip": skip,
        "limit": limit_field,
        "records": records,
    })))
}

#[derive(Deserialize)]
struct DocQuery {
    /// Include the input/output parameter schemas.
    #[serde(default)]
    io: bool,
}

async fn doc(
    State(ctx): State<ServerContext>,
    caller: Caller,
    Path(entry): Path<String>,
    Query(query): Query<DocQuery>,
) -> Result<Json<Value>, ApiError> {
    let algorithm = get_entry(&ctx, &entry)?;
    check_access(&ctx, &caller, &entry)?;
    let mut response = algorithm.descriptor_json();
    if query.io {
        response["inputs"] = Algorithm::params_json(&algorithm.in_params);
        response["outputs"] = Algorithm::params_json(&algorithm.out_params);
    }
    Ok(Json(response))
}

/// Submit a job. The body is the raw input map; it is validated against the
/// algorithm's input schema when the task reaches its lane head, so a bad
/// value surfaces as a task failure rather than a rejected submit.
async fn submit(
    State(ctx): State<ServerContext>,
    caller: Caller,
    Path(entry): Path<String>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let algorithm = get_entry(&ctx, &entry)?;
    check_access(&ctx, &caller, &entry)?;
    let params = match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(map)) => map,
        _ => {
            return Err(ApiError::Forbidden(
                "request body must be a JSON object".to_string(),
            ))
        }
    };
    let task = Task::new(
        caller.access_id,
        algorithm.id.clone(),
        params,
        algorithm.required_resources.clone(),
    );
    let task = ctx.runner.submit(task)?;
    tracing::info!(task_id = %task.task_id, algorithm = %algorithm.id, "task accepted");
    Ok(Json(json!({
        "task_id": task.task_id,
        "create_time": task.create_time,
    })))
}

macro_rules! facet {
    ($name:ident, |$algorithm:ident| $value:expr) => {
        async fn $name(
            State(ctx): State<ServerContext>,
            caller: Caller,
            Path(entry): Path<String>,
        ) -> Result<Json<Value>, ApiError> {
            let $algorithm = get_entry(&ctx, &entry)?;
            check_access(&ctx, &caller, &entry)?;
            Ok(Json($value))
        }
    };
}

facet!(facet_name, |algorithm| json!(algorithm.name));
facet!(facet_version, |algorithm| json!(algorithm.version));
facet!(facet_desc, |algorithm| json!(algorithm.description));
facet!(facet_ref, |algorithm| json!(algorithm.references));
facet!(facet_in, |algorithm| Algorithm::params_json(&algorithm.in_params));
facet!(facet_out, |algorithm| Algorithm::params_json(&algorithm.out_params));
