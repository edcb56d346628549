//! Execution fabric for EasyAPI: the typed IO model, algorithm registry,
//! resource-partitioned task queue and the per-task lifecycle runner.

pub mod algorithm;
pub mod error;
pub mod iotype;
pub mod parameter;
pub mod queue;
pub mod runner;
pub mod task;

pub use algorithm::{
    Algorithm, AlgorithmBuilder, AlgorithmDescriptor, AlgorithmRegistry, Entry, EntryOutput,
    ExecContext, ResourceVector,
};
pub use error::CoreError;
pub use iotype::{ConflictMode, IoCondition, IoMap, IoMeta, IoType, IoTypeRegistry, IoValue};
pub use parameter::{decode_map, Parameter, ParameterSpec};
pub use queue::TaskQueue;
pub use runner::TaskRunner;
pub use task::{Task, TaskPhase, TaskSnapshot};
