//! The resource-partitioned task queue.
//!
//! N lanes, each a strict FIFO tagged with a resource vector. Routing picks
//! the lane with the smallest L1 distance to a task's requested resources;
//! lanes offering none of a positively-requested resource are ineligible.
//! Within a lane at most one task runs at a time and it is always the lane
//! head. Completed tasks move to a done buffer where they wait for the
//! owning client to fetch them.
//!
//! All queue mutations happen under one mutex. Each lane carries a
//! [`Notify`] signalled on every head advance, which the per-task waiters
//! block on instead of polling.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;
use uuid::Uuid;

use crate::algorithm::ResourceVector;
use crate::error::CoreError;
use crate::task::Task;

struct Lane {
    resources: ResourceVector,
    advance: Notify,
}

struct QueueState {
    queues: Vec<VecDeque<Arc<Task>>>,
    done: Vec<Arc<Task>>,
}

pub struct TaskQueue {
    lanes: Vec<Lane>,
    state: Mutex<QueueState>,
}

impl TaskQueue {
    /// Build a queue from lane resource vectors. An empty layout falls back
    /// to a single lane offering every host CPU.
    pub fn new(layouts: Vec<ResourceVector>) -> Self {
        let layouts = if layouts.is_empty() {
            let cpus = std::thread::available_parallelism()
                .map(|n| n.get() as i64)
                .unwrap_or(1);
            vec![ResourceVector::from([("cpu".to_string(), cpus), ("cuda".to_string(), 0)])]
        } else {
            layouts
        };
        let queues = layouts.iter().map(|_| VecDeque::new()).collect();
        let lanes = layouts
            .into_iter()
            .map(|resources| Lane {
                resources,
                advance: Notify::new(),
            })
            .collect();
        TaskQueue {
            lanes,
            state: Mutex::new(QueueState {
                queues,
                done: Vec::new(),
            }),
        }
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    pub fn lane_resources(&self, lane: usize) -> &ResourceVector {
        &self.lanes[lane].resources
    }

    /// The largest quantity of `resource` offered by any lane.
    fn max_available(&self, resource: &str) -> i64 {
        self.lanes
            .iter()
            .map(|lane| lane.resources.get(resource).copied().unwrap_or(0))
            .max()
            .unwrap_or(0)
    }

    /// Pick the lane for a resource request: substitute `-1` with the
    /// largest lane offering, drop lanes that offer zero of a
    /// positively-requested resource, then take the smallest L1 distance,
    /// ties to the lowest index.
    pub fn route(&self, request: &ResourceVector) -> Result<usize, CoreError> {
        let mut best: Option<(usize, i64)> = None;
        for (idx, lane) in self.lanes.iter().enumerate() {
            let mut distance = 0i64;
            let mut eligible = true;
            for (name, &quantity) in request {
                let wanted = if quantity == -1 {
                    self.max_available(name)
                } else {
                    quantity
                };
                let offered = lane.resources.get(name).copied().unwrap_or(0);
                if wanted > 0 && offered == 0 {
                    eligible = false;
                    break;
                }
                distance += (wanted - offered).abs();
            }
            if eligible && best.map_or(true, |(_, d)| distance < d) {
                best = Some((idx, distance));
            }
        }
        best.map(|(idx, _)| idx).ok_or_else(|| {
            CoreError::NoEligibleLane(format!("no lane satisfies {request:?}"))
        })
    }

    /// Route and append. Returns the lane index the task landed in.
    pub fn enqueue(&self, task: Arc<Task>) -> Result<usize, CoreError> {
        let lane = self.route(&task.required_resources)?;
        let mut state = self.state.lock().unwrap();
        state.queues[lane].push_back(task.clone());
        tracing::debug!(task_id = %task.task_id, lane, "task enqueued");
        Ok(lane)
    }

    /// Whether `task` is at the head of any lane.
    pub fn is_head(&self, task: &Task) -> bool {
        let state = self.state.lock().unwrap();
        state
            .queues
            .iter()
            .any(|queue| queue.front().is_some_and(|t| t.task_id == task.task_id))
    }

    fn is_head_of(&self, lane: usize, task: &Task) -> bool {
        let state = self.state.lock().unwrap();
        state.queues[lane]
            .front()
            .is_some_and(|t| t.task_id == task.task_id)
    }

    /// 1-based position of a queued task within its lane.
    pub fn position_of(&self, task_id: Uuid) -> Option<usize> {
        let state = self.state.lock().unwrap();
        for queue in &state.queues {
            if let Some(pos) = queue.iter().position(|t| t.task_id == task_id) {
                return Some(pos + 1);
            }
        }
        None
    }

    /// Find a task in the active lanes or the done buffer.
    pub fn lookup(&self, task_id: Uuid) -> Option<Arc<Task>> {
        let state = self.state.lock().unwrap();
        for queue in &state.queues {
            if let Some(task) = queue.iter().find(|t| t.task_id == task_id) {
                return Some(task.clone());
            }
        }
        state.done.iter().find(|t| t.task_id == task_id).cloned()
    }

    /// Evict a completed task from the done buffer, if present.
    pub fn take_done(&self, task_id: Uuid) -> Option<Arc<Task>> {
        let mut state = self.state.lock().unwrap();
        let pos = state.done.iter().position(|t| t.task_id == task_id)?;
        Some(state.done.remove(pos))
    }

    /// Cancel and evict a task from either side of the queue.
    ///
    /// Completed tasks are simply dropped from the done buffer. Queued tasks
    /// are unlinked, marked cancelled and moved to the done buffer. A
    /// running task is only signalled: its lane advances once the entry
    /// point returns.
    pub fn remove(&self, task_id: Uuid) -> Result<(), CoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.done.iter().position(|t| t.task_id == task_id) {
            state.done.remove(pos);
            return Ok(());
        }
        for lane in 0..self.lanes.len() {
            let Some(pos) = state.queues[lane].iter().position(|t| t.task_id == task_id) else {
                continue;
            };
            let task = state.queues[lane][pos].clone();
            if pos == 0 && task.in_progress() {
                task.request_cancel();
                tracing::debug!(task_id = %task_id, lane, "cancellation signalled to running task");
                return Ok(());
            }
            state.queues[lane].remove(pos);
            task.request_cancel();
            task.mark_done(Err(CoreError::Cancelled));
            state.done.push(task);
            if pos == 0 {
                // A new head emerged, wake its waiter.
                self.lanes[lane].advance.notify_waiters();
            }
            tracing::debug!(task_id = %task_id, lane, "queued task cancelled");
            return Ok(());
        }
        Err(CoreError::NotFound(format!("task '{task_id}'")))
    }

    /// Suspend until `task` reaches the head of its lane, or until its
    /// cancellation fires.
    pub async fn wait_until_head(&self, lane: usize, task: &Task) -> Result<(), CoreError> {
        let cancel = task.cancel_token();
        loop {
            let mut notified = pin!(self.lanes[lane].advance.notified());
            // Register interest before checking, so a head advance between
            // the check and the await is not lost.
            notified.as_mut().enable();
            if task.cancel_requested() {
                return Err(CoreError::Cancelled);
            }
            if self.is_head_of(lane, task) {
                return Ok(());
            }
            tokio::select! {
                _ = notified => {}
                _ = cancel.cancelled() => return Err(CoreError::Cancelled),
            }
        }
    }

    /// Atomically confirm `task` is still the lane head and mark it running.
    /// Returns the lane's resource vector for the execution context.
    pub fn begin_execution(&self, lane: usize, task: &Task) -> Result<ResourceVector, CoreError> {
        let state = self.state.lock().unwrap();
        let is_head = state.queues[lane]
            .front()
            .is_some_and(|t| t.task_id == task.task_id);
        if !is_head || task.cancel_requested() {
            return Err(CoreError::Cancelled);
        }
        task.mark_running();
        Ok(self.lanes[lane].resources.clone())
    }

    /// Move a finished head task to the done buffer and wake the lane's
    /// next waiter.
    pub fn finish(&self, lane: usize, task: &Arc<Task>) {
        let mut state = self.state.lock().unwrap();
        if let Some(pos) = state.queues[lane].iter().position(|t| t.task_id == task.task_id) {
            state.queues[lane].remove(pos);
        }
        state.done.push(task.clone());
        self.lanes[lane].advance.notify_waiters();
    }

    /// Number of tasks currently waiting in the done buffer.
    pub fn done_len(&self) -> usize {
        self.state.lock().unwrap().done.len()
    }
}
