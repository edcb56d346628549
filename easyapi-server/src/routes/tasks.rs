//! Task status, cancellation and the per-task WebSocket stream.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use axum::routing::{get, post};
use axum::Router;
use easyapi_core::{Task, TaskPhase};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::ServerContext;
use crate::error::ApiError;
use crate::extract::Caller;

pub fn router() -> Router<ServerContext> {
    Router::new()
        .route("/{task_id}", get(status))
        .route("/{task_id}/cancel", post(cancel))
        .route("/{task_id}/ws", get(stream))
}

fn not_found(task_id: &str) -> ApiError {
    ApiError::NotFound(format!("Task {task_id} not found"))
}

/// Look a task up for a caller. Tasks owned by other callers are reported as
/// missing, not forbidden.
fn find_task(ctx: &ServerContext, caller: &Caller, task_id: &str) -> Result<Arc<Task>, ApiError> {
    let id = Uuid::parse_str(task_id).map_err(|_| not_found(task_id))?;
    let task = ctx
        .runner
        .queue()
        .lookup(id)
        .ok_or_else(|| not_found(task_id))?;
    if task.access_id != caller.access_id {
        return Err(not_found(task_id));
    }
    Ok(task)
}

/// Build one of the three status frames. A `done` frame evicts the task from
/// the done buffer: a terminal response is delivered exactly once.
fn status_frame(ctx: &ServerContext, task: &Arc<Task>) -> Value {
    let snapshot = task.snapshot();
    match snapshot.phase {
        TaskPhase::Done => {
            let output = match (&snapshot.output, &snapshot.error) {
                (Some(output), None) => json!(output),
                (_, Some(error)) => json!(error),
                (None, None) => Value::Null,
            };
            let frame = json!({
                "task_id": snapshot.task_id,
                "algorithm": snapshot.algorithm_id,
                "create_time": snapshot.create_time,
                "start_time": snapshot.start_time,
                "done_time": snapshot.done_time,
                "success": snapshot.success(),
                "output": output,
            });
            ctx.runner.queue().take_done(snapshot.task_id);
            frame
        }
        TaskPhase::Running => json!({
            "task_id": snapshot.task_id,
            "status": "in-progress",
            "create_time": snapshot.create_time,
            "start_time": snapshot.start_time,
        }),
        TaskPhase::Queued => json!({
            "task_id": snapshot.task_id,
            "status": "in-queue",
            "create_time": snapshot.create_time,
            "queue_length": ctx.runner.queue().position_of(snapshot.task_id).unwrap_or(1),
        }),
    }
}

async fn status(
    State(ctx): State<ServerContext>,
    caller: Caller,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = find_task(&ctx, &caller, &task_id)?;
    Ok(Json(status_frame(&ctx, &task)))
}

async fn cancel(
    State(ctx): State<ServerContext>,
    caller: Caller,
    Path(task_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task = find_task(&ctx, &caller, &task_id)?;
    ctx.runner
        .queue()
        .remove(task.task_id)
        .map_err(|_| not_found(&task_id))?;
    tracing::info!(task_id = %task.task_id, "task cancelled");
    Ok(Json(json!({ "task_id": task.task_id, "success": true })))
}

/// Streaming poll: the client sends the text command `get`, the server
/// replies with one status frame. Unknown tasks get a not-found frame rather
/// than a close, so a client may keep polling a task that is yet to appear.
async fn stream(
    State(ctx): State<ServerContext>,
    caller: Caller,
    Path(task_id): Path<String>,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| ws_loop(ctx, caller, task_id, socket))
}

async fn ws_loop(ctx: ServerContext, caller: Caller, task_id: String, mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        let command = match message {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };
        let frame = if command.trim().eq_ignore_ascii_case("get") {
            match find_task(&ctx, &caller, &task_id) {
                Ok(task) => status_frame(&ctx, &task),
                Err(_) => json!({ "status": format!("Task {task_id} not found"), "success": false }),
            }
        } else {
            json!({ "status": format!("{command} not supported"), "success": false })
        };
        let Ok(payload) = serde_json::to_string(&frame) else {
            break;
        };
        if socket.send(Message::Text(payload.into())).await.is_err() {
            break;
        }
    }
}
