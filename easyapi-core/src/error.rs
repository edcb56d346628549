/// Errors produced by the execution fabric.
///
/// Algorithm execution recovers locally: everything that goes wrong while a
/// task runs is recorded on the task and surfaced through its terminal frame
/// rather than propagated upward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value failed IOType validation; carries the offending field path.
    Validation { field: String, reason: String },
    /// A required parameter was absent from the incoming map.
    MissingParameter(String),
    /// Unknown algorithm, IO type or task.
    NotFound(String),
    /// The same IOType id was re-registered with different fields while the
    /// registry is in strict conflict mode.
    SchemaConflict(String),
    /// No lane offers a resource the task requires.
    NoEligibleLane(String),
    /// The algorithm entry point returned an error or panicked.
    AlgorithmFailure(String),
    /// The task was removed while queued or running.
    Cancelled,
    /// The execution deadline elapsed before the entry point returned.
    DeadlineExceeded,
    /// A named algorithm module could not be registered.
    LoadFailure(String),
}

impl CoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Validation { field, reason } => {
                write!(f, "validation failed for '{field}': {reason}")
            }
            CoreError::MissingParameter(name) => write!(f, "missing parameter '{name}'"),
            CoreError::NotFound(what) => write!(f, "{what} not found"),
            CoreError::SchemaConflict(id) => {
                write!(f, "IO type '{id}' re-registered with a different definition")
            }
            CoreError::NoEligibleLane(detail) => write!(f, "no eligible lane: {detail}"),
            CoreError::AlgorithmFailure(msg) => write!(f, "algorithm failed: {msg}"),
            CoreError::Cancelled => write!(f, "cancelled"),
            CoreError::DeadlineExceeded => write!(f, "execution deadline exceeded"),
            CoreError::LoadFailure(module) => write!(f, "failed to load module '{module}'"),
        }
    }
}

impl std::error::Error for CoreError {}
