use std::sync::Arc;

use easyapi_core::{CoreError, ResourceVector, Task, TaskQueue};

fn resources(pairs: &[(&str, i64)]) -> ResourceVector {
    pairs
        .iter()
        .map(|(name, quantity)| (name.to_string(), *quantity))
        .collect()
}

fn queue_s2() -> TaskQueue {
    TaskQueue::new(vec![
        resources(&[("cpu", 1), ("cuda", 0)]),
        resources(&[("cpu", 7), ("cuda", 0)]),
        resources(&[("cpu", 0), ("cuda", 1)]),
    ])
}

fn task(req: ResourceVector) -> Arc<Task> {
    Arc::new(Task::new("caller", "algo", serde_json::Map::new(), req))
}

// ── Routing ──────────────────────────────────────────────────────────────

#[test]
fn light_tasks_route_to_light_lanes() {
    let queue = queue_s2();
    assert_eq!(queue.route(&resources(&[("cpu", 1), ("cuda", 0)])).unwrap(), 0);
}

#[test]
fn max_requests_route_to_the_largest_lane() {
    let queue = queue_s2();
    assert_eq!(queue.route(&resources(&[("cpu", -1), ("cuda", 0)])).unwrap(), 1);
}

#[test]
fn cuda_tasks_route_to_the_cuda_lane() {
    let queue = queue_s2();
    assert_eq!(queue.route(&resources(&[("cpu", 0), ("cuda", 1)])).unwrap(), 2);
    // A positive request never lands on a lane offering zero of it.
    assert_eq!(queue.route(&resources(&[("cuda", 1)])).unwrap(), 2);
}

#[test]
fn ties_break_to_the_lowest_lane_index() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 2)]), resources(&[("cpu", 2)])]);
    assert_eq!(queue.route(&resources(&[("cpu", 2)])).unwrap(), 0);
}

#[test]
fn unsatisfiable_requests_are_rejected() {
    let queue = queue_s2();
    assert!(matches!(
        queue.route(&resources(&[("fpga", 1)])),
        Err(CoreError::NoEligibleLane(_))
    ));
}

#[test]
fn max_of_an_unknown_resource_is_zero() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 1)])]);
    // -1 resolves to the largest lane offering, which is zero here, so the
    // request degenerates to "none needed".
    assert_eq!(queue.route(&resources(&[("cuda", -1)])).unwrap(), 0);
}

#[test]
fn empty_layout_defaults_to_one_cpu_lane() {
    let queue = TaskQueue::new(Vec::new());
    assert_eq!(queue.lane_count(), 1);
    assert!(queue.lane_resources(0).get("cpu").copied().unwrap_or(0) >= 1);
}

// ── FIFO bookkeeping ─────────────────────────────────────────────────────

#[test]
fn enqueue_positions_are_one_based_fifo() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 1)])]);
    let first = task(resources(&[("cpu", 1)]));
    let second = task(resources(&[("cpu", 1)]));
    let third = task(resources(&[("cpu", 1)]));
    queue.enqueue(first.clone()).unwrap();
    queue.enqueue(second.clone()).unwrap();
    queue.enqueue(third.clone()).unwrap();

    assert!(queue.is_head(&first));
    assert!(!queue.is_head(&second));
    assert_eq!(queue.position_of(first.task_id), Some(1));
    assert_eq!(queue.position_of(second.task_id), Some(2));
    assert_eq!(queue.position_of(third.task_id), Some(3));
}

#[test]
fn lookup_finds_active_and_done_tasks() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 1)])]);
    let queued = task(resources(&[("cpu", 1)]));
    queue.enqueue(queued.clone()).unwrap();
    assert!(queue.lookup(queued.task_id).is_some());
    assert!(queue.lookup(uuid::Uuid::new_v4()).is_none());
}

#[test]
fn removing_a_queued_task_moves_it_to_done_cancelled() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 1)])]);
    let first = task(resources(&[("cpu", 1)]));
    let second = task(resources(&[("cpu", 1)]));
    queue.enqueue(first.clone()).unwrap();
    queue.enqueue(second.clone()).unwrap();

    queue.remove(second.task_id).unwrap();
    assert_eq!(queue.position_of(second.task_id), None);
    assert!(second.is_done());
    let snapshot = second.snapshot();
    assert!(!snapshot.success());
    assert!(snapshot.error.unwrap().contains("cancelled"));
    // Still reachable through the done buffer until fetched.
    assert!(queue.lookup(second.task_id).is_some());
    assert_eq!(queue.done_len(), 1);

    // The remaining task keeps its lane position.
    assert_eq!(queue.position_of(first.task_id), Some(1));
}

#[test]
fn removing_an_unknown_task_fails() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 1)])]);
    assert!(matches!(
        queue.remove(uuid::Uuid::new_v4()),
        Err(CoreError::NotFound(_))
    ));
}

#[test]
fn take_done_evicts_exactly_once() {
    let queue = TaskQueue::new(vec![resources(&[("cpu", 1)])]);
    let doomed = task(resources(&[("cpu", 1)]));
    queue.enqueue(doomed.clone()).unwrap();
    queue.remove(doomed.task_id).unwrap();

    assert!(queue.take_done(doomed.task_id).is_some());
    assert!(queue.take_done(doomed.task_id).is_none());
    assert!(queue.lookup(doomed.task_id).is_none());
}
