//! The task record: one submitted job and its lifecycle state.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::algorithm::ResourceVector;
use crate::error::CoreError;
use crate::iotype::IoMap;

/// Observable lifecycle phase. Progresses monotonically
/// queued -> running -> done; cancellation folds into done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Queued,
    Running,
    Done,
}

#[derive(Debug, Default)]
struct TaskState {
    running: bool,
    done: bool,
    start_time: Option<DateTime<Utc>>,
    done_time: Option<DateTime<Utc>>,
    output: Option<IoMap>,
    error: Option<String>,
    cancelled: bool,
}

/// A submitted job. The identity fields are immutable; lifecycle state lives
/// behind a mutex and is only ever advanced forward.
pub struct Task {
    pub task_id: Uuid,
    pub access_id: String,
    pub algorithm_id: String,
    pub input_data: serde_json::Map<String, Value>,
    pub required_resources: ResourceVector,
    pub create_time: DateTime<Utc>,
    cancel: CancellationToken,
    state: Mutex<TaskState>,
}

impl Task {
    pub fn new(
        access_id: impl Into<String>,
        algorithm_id: impl Into<String>,
        input_data: serde_json::Map<String, Value>,
        required_resources: ResourceVector,
    ) -> Self {
        Task {
            task_id: Uuid::new_v4(),
            access_id: access_id.into(),
            algorithm_id: algorithm_id.into(),
            input_data,
            required_resources,
            create_time: Utc::now(),
            cancel: CancellationToken::new(),
            state: Mutex::new(TaskState::default()),
        }
    }

    pub fn phase(&self) -> TaskPhase {
        let state = self.state.lock().unwrap();
        if state.done {
            TaskPhase::Done
        } else if state.running {
            TaskPhase::Running
        } else {
            TaskPhase::Queued
        }
    }

    pub fn in_progress(&self) -> bool {
        self.phase() == TaskPhase::Running
    }

    pub fn is_done(&self) -> bool {
        self.phase() == TaskPhase::Done
    }

    /// Token observed by the waiter and offered to the entry point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Mark cancellation requested. The waiter unblocks immediately; a
    /// running entry point sees the token and may return early.
    pub fn request_cancel(&self) {
        self.state.lock().unwrap().cancelled = true;
        self.cancel.cancel();
    }

    pub fn cancel_requested(&self) -> bool {
        self.state.lock().unwrap().cancelled
    }

    /// Transition queued -> running, stamping `start_time`.
    pub fn mark_running(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.done && !state.running {
            state.running = true;
            state.start_time = Some(Utc::now());
        }
    }

    /// Terminal transition, stamping `done_time`. A requested cancellation
    /// takes precedence over whatever the entry point produced.
    pub fn mark_done(&self, result: Result<IoMap, CoreError>) {
        let mut state = self.state.lock().unwrap();
        if state.done {
            return;
        }
        state.running = false;
        state.done = true;
        state.done_time = Some(Utc::now());
        if state.cancelled {
            state.error = Some(CoreError::Cancelled.to_string());
            return;
        }
        match result {
            Ok(output) => state.output = Some(output),
            Err(e) => state.error = Some(e.to_string()),
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let state = self.state.lock().unwrap();
        let phase = if state.done {
            TaskPhase::Done
        } else if state.running {
            TaskPhase::Running
        } else {
            TaskPhase::Queued
        };
        TaskSnapshot {
            task_id: self.task_id,
            access_id: self.access_id.clone(),
            algorithm_id: self.algorithm_id.clone(),
            create_time: self.create_time,
            phase,
            start_time: state.start_time,
            done_time: state.done_time,
            output: state.output.clone(),
            error: state.error.clone(),
        }
    }
}

/// A point-in-time copy of a task's observable state, used to build status
/// frames without holding the task lock.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub task_id: Uuid,
    pub access_id: String,
    pub algorithm_id: String,
    pub create_time: DateTime<Utc>,
    pub phase: TaskPhase,
    pub start_time: Option<DateTime<Utc>>,
    pub done_time: Option<DateTime<Utc>>,
    pub output: Option<IoMap>,
    pub error: Option<String>,
}

impl TaskSnapshot {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}
