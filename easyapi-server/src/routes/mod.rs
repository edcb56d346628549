//! Route assembly.

pub mod entries;
pub mod iotypes;
pub mod tasks;

use axum::extract::State;
use axum::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::context::ServerContext;
use crate::extract::Caller;

pub fn router(ctx: ServerContext) -> Router {
    Router::new()
        .route("/", get(banner))
        .nest("/io/", iotypes::router())
        .nest("/entries/", entries::router())
        .nest("/tasks/", tasks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Server banner: the configured name and the caller's own id.
async fn banner(State(ctx): State<ServerContext>, caller: Caller) -> Json<Value> {
    Json(json!({ "server": ctx.server_name, "id": caller.access_id }))
}

pub(crate) fn default_limit() -> i64 {
    10
}

/// A non-positive limit means "to the end", mirrored as `limit: null` in the
/// response envelope.
pub(crate) fn page(limit: i64) -> (Option<usize>, Value) {
    if limit > 0 {
        (Some(limit as usize), json!(limit))
    } else {
        (None, Value::Null)
    }
}
