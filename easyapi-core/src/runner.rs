//! The task lifecycle runner.
//!
//! One waiter per submitted task: it suspends until the task reaches its
//! lane head, then dispatches the algorithm onto a blocking worker so that
//! CPU-bound routines never starve the event loop. The cache is consulted
//! before invocation and populated afterwards. Whatever goes wrong during
//! execution is recorded on the task; the waiter itself never fails.

use std::sync::Arc;
use std::time::Duration;

use easyapi_cache::CachePool;
use serde_json::Value;

use crate::algorithm::{AlgorithmRegistry, ExecContext};
use crate::error::CoreError;
use crate::iotype::{IoMap, IoTypeRegistry};
use crate::queue::TaskQueue;
use crate::task::Task;

pub struct TaskRunner {
    queue: Arc<TaskQueue>,
    algorithms: Arc<AlgorithmRegistry>,
    iotypes: Arc<IoTypeRegistry>,
    cache: Arc<CachePool>,
    deadline: Option<Duration>,
}

impl TaskRunner {
    pub fn new(
        queue: Arc<TaskQueue>,
        algorithms: Arc<AlgorithmRegistry>,
        iotypes: Arc<IoTypeRegistry>,
        cache: Arc<CachePool>,
    ) -> Self {
        TaskRunner {
            queue,
            algorithms,
            iotypes,
            cache,
            deadline: None,
        }
    }

    /// Bound every execution by `deadline`. On expiry the task's token fires
    /// and the task fails once the entry point returns.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    /// Enqueue a task and attach its lifecycle waiter. Returns promptly; the
    /// caller observes progress through the queue.
    pub fn submit(self: &Arc<Self>, task: Task) -> Result<Arc<Task>, CoreError> {
        let task = Arc::new(task);
        let lane = self.queue.enqueue(task.clone())?;
        let runner = self.clone();
        let handle = task.clone();
        tokio::spawn(async move { runner.run(lane, handle).await });
        Ok(task)
    }

    async fn run(&self, lane: usize, task: Arc<Task>) {
        if self.queue.wait_until_head(lane, &task).await.is_err() {
            // Removed while queued; the queue already recorded the terminal
            // state and moved the task to the done buffer.
            return;
        }
        let resources = match self.queue.begin_execution(lane, &task) {
            Ok(resources) => resources,
            Err(_) => return,
        };
        let result = self.execute(&task, resources).await;
        if let Err(e) = &result {
            tracing::info!(task_id = %task.task_id, error = %e, "task failed");
        }
        task.mark_done(result);
        self.queue.finish(lane, &task);
    }

    async fn execute(
        &self,
        task: &Arc<Task>,
        resources: crate::algorithm::ResourceVector,
    ) -> Result<IoMap, CoreError> {
        let algorithm = self.algorithms.get(&task.algorithm_id)?;
        let inputs = algorithm.decode_inputs(&task.input_data, &self.iotypes)?;
        let canonical = canonical_map(&inputs)?;

        if !algorithm.cache_disable {
            if let Some(hit) = self.cache.fetch(&algorithm.id, &canonical).await {
                match serde_json::from_value::<IoMap>(hit) {
                    Ok(outputs) => {
                        tracing::debug!(task_id = %task.task_id, algorithm = %algorithm.id, "cache hit");
                        return Ok(outputs);
                    }
                    Err(e) => {
                        tracing::warn!(algorithm = %algorithm.id, error = %e, "discarding malformed cache entry");
                    }
                }
            }
        }

        let ctx = ExecContext {
            resources,
            cancel: task.cancel_token(),
        };
        let iotypes = self.iotypes.clone();
        let algo = algorithm.clone();
        let worker_inputs = inputs.clone();
        let mut handle =
            tokio::task::spawn_blocking(move || algo.run(&worker_inputs, &ctx, &iotypes));

        let joined = match self.deadline {
            None => (&mut handle).await,
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    // Cooperative deadline: fire the token, then wait for the
                    // entry point to return before advancing the lane.
                    task.cancel_token().cancel();
                    let _ = (&mut handle).await;
                    return Err(CoreError::DeadlineExceeded);
                }
            },
        };
        let outputs = match joined {
            Ok(result) => result?,
            Err(e) => return Err(CoreError::AlgorithmFailure(format!("panicked: {e}"))),
        };

        if !algorithm.cache_disable {
            let value = serde_json::to_value(&outputs)
                .map_err(|e| CoreError::AlgorithmFailure(e.to_string()))?;
            self.cache.record(&algorithm.id, &canonical, value).await;
        }
        Ok(outputs)
    }
}

/// Serialise a decoded input map to the canonical JSON object used for cache
/// keying. `BTreeMap` ordering makes the key order lexicographic.
fn canonical_map(inputs: &IoMap) -> Result<serde_json::Map<String, Value>, CoreError> {
    match serde_json::to_value(inputs) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(serde_json::Map::new()),
        Err(e) => Err(CoreError::AlgorithmFailure(e.to_string())),
    }
}
