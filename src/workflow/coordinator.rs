//! Multi-stage workflow coordinator.
//!
//! One bounded buffer and one worker set per processing stage. A stage
//! worker consumes an item from its own buffer, runs the stage
//! processor, stamps progress, and produces the item into the next
//! stage's buffer — blocking there if the downstream stage is behind.
//! That blocking is the point: a slow stage throttles every stage above
//! it, and total in-flight work is bounded by the buffer capacities
//! plus the worker count.
//!
//! # Stopping
//!
//! `stop` first closes the intake, then drains the stages in pipeline
//! order: each stage's workers exit only once their buffer is empty and
//! every upstream stage has already stopped. Every accepted item
//! therefore reaches the completed archive before `stop` returns. An
//! item whose submission races with `stop` is never lost either — it
//! stays queued and is processed by the next `start`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;

use super::item::{Stage, WorkItem};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::sync::BoundedBuffer;

/// Caller-supplied per-stage processing logic.
pub type StageHook = Arc<dyn Fn(&mut WorkItem) + Send + Sync>;

/// How long an idle stage worker parks before re-checking its drain flag.
const DRAIN_POLL: Duration = Duration::from_millis(20);

struct StageSlot {
    stage: Stage,
    buffer: BoundedBuffer<WorkItem>,
    draining: AtomicBool,
    processed: AtomicU64,
}

struct CoordinatorInner {
    /// One slot per processing stage, pipeline order.
    stages: Vec<StageSlot>,
    /// Optional caller hook per processing stage.
    hooks: Vec<Option<StageHook>>,
    /// Terminal archive; also guards the completion counters.
    completed: Mutex<Vec<WorkItem>>,
    /// Intake gate, flipped off at the start of `stop`.
    accepting: AtomicBool,
}

/// Routes work items through the fixed stage sequence.
pub struct WorkflowCoordinator {
    config: WorkflowConfig,
    inner: Arc<CoordinatorInner>,
    next_id: AtomicU64,
    /// Worker handles per stage; non-empty while running.
    workers: Mutex<Vec<Vec<JoinHandle<()>>>>,
}

impl std::fmt::Debug for WorkflowCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowCoordinator")
            .field("running", &self.is_running())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WorkflowCoordinator {
    /// Creates a coordinator; call [`start`](Self::start) to spawn the
    /// stage workers.
    #[must_use]
    pub fn new(config: WorkflowConfig) -> Self {
        assert!(
            config.workers_per_stage > 0,
            "workflow requires at least 1 worker per stage"
        );
        let stages = Stage::PROCESSING
            .iter()
            .map(|&stage| StageSlot {
                stage,
                buffer: BoundedBuffer::new(config.stage_capacity),
                draining: AtomicBool::new(false),
                processed: AtomicU64::new(0),
            })
            .collect();

        Self {
            config,
            inner: Arc::new(CoordinatorInner {
                stages,
                hooks: vec![None; Stage::PROCESSING.len()],
                completed: Mutex::new(Vec::new()),
                accepting: AtomicBool::new(false),
            }),
            next_id: AtomicU64::new(0),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Installs a caller hook run after the built-in processor of
    /// `stage`. Must be called before the first `start`.
    ///
    /// # Panics
    /// Panics if `stage` is [`Stage::Completed`].
    #[must_use]
    pub fn with_stage_hook<F>(mut self, stage: Stage, hook: F) -> Self
    where
        F: Fn(&mut WorkItem) + Send + Sync + 'static,
    {
        assert!(
            !matches!(stage, Stage::Completed),
            "completed stage has no processor"
        );
        let inner = Arc::get_mut(&mut self.inner)
            .expect("hooks must be installed before workers are spawned");
        inner.hooks[stage.index()] = Some(Arc::new(hook));
        self
    }

    /// Spawns every stage's workers and opens the intake.
    ///
    /// # Errors
    /// Returns [`WorkflowError::AlreadyRunning`] if already started.
    pub fn start(&self) -> Result<(), WorkflowError> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(WorkflowError::AlreadyRunning);
        }

        for slot in &self.inner.stages {
            slot.draining.store(false, Ordering::Release);
        }

        for slot in &self.inner.stages {
            let mut stage_workers = Vec::with_capacity(self.config.workers_per_stage);
            for i in 0..self.config.workers_per_stage {
                let inner = Arc::clone(&self.inner);
                let stage = slot.stage;
                let name = format!("{}-{}-{i}", self.config.thread_name_prefix, stage.label());
                let handle = thread::Builder::new()
                    .name(name)
                    .spawn(move || {
                        tracing::debug!(stage = stage.label(), "stage worker started");
                        stage_worker(&inner, stage.index());
                        tracing::debug!(stage = stage.label(), "stage worker exiting");
                    })
                    .expect("failed to spawn stage worker");
                stage_workers.push(handle);
            }
            workers.push(stage_workers);
        }

        self.inner.accepting.store(true, Ordering::Release);
        tracing::info!(
            stages = self.inner.stages.len(),
            workers_per_stage = self.config.workers_per_stage,
            "workflow started"
        );
        Ok(())
    }

    /// Closes the intake and drains the pipeline in stage order, then
    /// joins every worker. Idempotent.
    pub fn stop(&self) {
        let mut workers = self.workers.lock();
        if workers.is_empty() {
            return;
        }
        self.inner.accepting.store(false, Ordering::Release);

        // Upstream first: a stage only drains once no stage above it
        // can produce into its buffer, so in-flight items always find
        // live consumers downstream.
        for (slot, stage_workers) in self.inner.stages.iter().zip(workers.drain(..)) {
            slot.draining.store(true, Ordering::Release);
            for handle in stage_workers {
                let _ = handle.join();
            }
        }
        tracing::info!("workflow stopped");
    }

    /// Runs the pipeline for `duration`, then drains and stops.
    pub fn run_for(&self, duration: Duration) -> Result<(), WorkflowError> {
        self.start()?;
        thread::sleep(duration);
        self.stop();
        Ok(())
    }

    /// Creates a work item at [`Stage::Initialization`] and enqueues it,
    /// blocking while the first stage's buffer is full.
    ///
    /// Returns the item's id.
    pub fn submit(
        &self,
        name: impl Into<String>,
        payload: impl Into<String>,
    ) -> Result<u64, WorkflowError> {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(WorkflowError::NotRunning);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.stages[0]
            .buffer
            .produce(WorkItem::new(id, name, payload));
        Ok(id)
    }

    /// Like [`submit`](Self::submit), but gives up after `timeout` if
    /// the intake stays full.
    pub fn try_submit(
        &self,
        name: impl Into<String>,
        payload: impl Into<String>,
        timeout: Duration,
    ) -> Result<u64, WorkflowError> {
        if !self.inner.accepting.load(Ordering::Acquire) {
            return Err(WorkflowError::NotRunning);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.inner.stages[0]
            .buffer
            .try_produce(WorkItem::new(id, name, payload), timeout)
            .map_err(|_| WorkflowError::SubmitTimeout)?;
        Ok(id)
    }

    /// Returns true while workers are live and the intake is open.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.accepting.load(Ordering::Acquire)
    }

    /// Items queued in `stage`'s buffer right now.
    ///
    /// # Panics
    /// Panics if `stage` is [`Stage::Completed`], which has no queue.
    #[must_use]
    pub fn queue_depth(&self, stage: Stage) -> usize {
        assert!(
            !matches!(stage, Stage::Completed),
            "completed stage has no queue"
        );
        self.inner.stages[stage.index()].buffer.len()
    }

    /// Point-in-time statistics snapshot.
    #[must_use]
    pub fn stats(&self) -> WorkflowStats {
        let stages = self
            .inner
            .stages
            .iter()
            .map(|slot| StageStats {
                stage: slot.stage.label(),
                processed: slot.processed.load(Ordering::Relaxed),
                queued: slot.buffer.len(),
            })
            .collect();
        WorkflowStats {
            stages,
            completed: self.inner.completed.lock().len(),
        }
    }

    /// Clones of every archived item, in completion order.
    #[must_use]
    pub fn completed_items(&self) -> Vec<WorkItem> {
        self.inner.completed.lock().clone()
    }
}

impl Drop for WorkflowCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Per-stage statistics inside a [`WorkflowStats`] snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StageStats {
    /// Stage label.
    pub stage: &'static str,
    /// Items that have finished this stage since construction.
    pub processed: u64,
    /// Items waiting in this stage's buffer at snapshot time.
    pub queued: usize,
}

/// Snapshot of pipeline progress.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStats {
    /// One entry per processing stage, pipeline order.
    pub stages: Vec<StageStats>,
    /// Items archived in the completed collection.
    pub completed: usize,
}

fn stage_worker(inner: &Arc<CoordinatorInner>, stage_idx: usize) {
    let slot = &inner.stages[stage_idx];
    loop {
        let Some(mut item) = slot.buffer.try_consume(DRAIN_POLL) else {
            if slot.draining.load(Ordering::Acquire) && slot.buffer.is_empty() {
                break;
            }
            continue;
        };

        process_stage(inner, stage_idx, &mut item);
        item.advance();
        slot.processed.fetch_add(1, Ordering::Relaxed);

        if item.is_completed() {
            tracing::debug!(id = item.id(), "work item completed");
            inner.completed.lock().push(item);
        } else {
            let next_idx = item.current_stage().index();
            inner.stages[next_idx].buffer.produce(item);
        }
    }
}

/// Runs the built-in processor and any caller hook for one stage,
/// isolating panics so the item keeps moving and the worker survives.
fn process_stage(inner: &CoordinatorInner, stage_idx: usize, item: &mut WorkItem) {
    let stage = inner.stages[stage_idx].stage;
    let hook = inner.hooks[stage_idx].as_ref();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        apply_builtin(stage, item);
        if let Some(hook) = hook {
            hook(item);
        }
    }));
    if outcome.is_err() {
        tracing::warn!(
            id = item.id(),
            stage = stage.label(),
            "stage processor panicked; item continues"
        );
        item.record(format!("{} processor panicked", stage.label()));
    }
}

/// The fixed transition logic each stage applies before any hook.
fn apply_builtin(stage: Stage, item: &mut WorkItem) {
    match stage {
        Stage::Initialization => {
            let normalized = item.payload().trim().to_string();
            item.set_payload(normalized);
            item.record("initialized");
        }
        Stage::DataProcessing => {
            let transformed = item.payload().to_uppercase();
            item.record(format!("processed {} bytes", transformed.len()));
            item.set_payload(transformed);
        }
        Stage::Validation => {
            let note = if item.payload().is_empty() {
                "validated: empty payload"
            } else {
                "validated"
            };
            item.record(note);
        }
        Stage::OutputGeneration => {
            let output = format!("{}: {}", item.name(), item.payload());
            item.set_payload(output);
            item.record("output generated");
        }
        Stage::Cleanup => {
            item.record("cleaned up");
        }
        Stage::Completed => unreachable!("completed stage has no processor"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_logging;
    use std::collections::HashSet;
    use std::time::Instant;

    fn init_test(name: &str) {
        init_test_logging();
        crate::test_phase!(name);
    }

    fn wait_for_completed(coordinator: &WorkflowCoordinator, count: usize, budget: Duration) {
        let deadline = Instant::now() + budget;
        while coordinator.stats().completed < count {
            assert!(
                Instant::now() < deadline,
                "pipeline stalled: {} of {count} completed",
                coordinator.stats().completed
            );
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn pipeline_completes_all_items() {
        init_test("pipeline_completes_all_items");
        let coordinator = WorkflowCoordinator::new(WorkflowConfig::default());
        coordinator.start().expect("start");

        for i in 0..10 {
            coordinator
                .submit(format!("job-{i}"), format!("  payload {i} "))
                .expect("submit");
        }

        wait_for_completed(&coordinator, 10, Duration::from_secs(10));
        coordinator.stop();

        let stats = coordinator.stats();
        for stage in &stats.stages {
            crate::assert_with_log!(
                stage.processed == 10,
                "stage processed all",
                10u64,
                stage.processed
            );
        }

        let items = coordinator.completed_items();
        crate::assert_with_log!(items.len() == 10, "all archived", 10usize, items.len());
        let ids: HashSet<u64> = items.iter().map(WorkItem::id).collect();
        crate::assert_with_log!(ids.len() == 10, "archived at most once", 10usize, ids.len());

        for item in &items {
            crate::assert_with_log!(item.is_completed(), "completed", true, item.is_completed());
            crate::assert_with_log!(
                item.trace().len() == 5,
                "five stage notes",
                5usize,
                item.trace().len()
            );
            // Initialization trimmed, data processing uppercased,
            // output generation prefixed the name.
            crate::assert_with_log!(
                item.payload().starts_with(item.name()),
                "output payload shape",
                item.name(),
                item.payload()
            );
            crate::assert_with_log!(
                item.payload().contains("PAYLOAD"),
                "payload uppercased",
                "PAYLOAD",
                item.payload()
            );
        }
        crate::test_complete!("pipeline_completes_all_items");
    }

    #[test]
    fn submit_before_start_refused() {
        init_test("submit_before_start_refused");
        let coordinator = WorkflowCoordinator::new(WorkflowConfig::default());
        let refused = coordinator.submit("job", "data").expect_err("not running");
        crate::assert_with_log!(
            refused == WorkflowError::NotRunning,
            "not running error",
            WorkflowError::NotRunning,
            refused
        );
        crate::test_complete!("submit_before_start_refused");
    }

    #[test]
    fn double_start_refused_and_stop_idempotent() {
        init_test("double_start_refused_and_stop_idempotent");
        let coordinator = WorkflowCoordinator::new(WorkflowConfig::default());
        coordinator.start().expect("first start");
        let second = coordinator.start().expect_err("second start refused");
        crate::assert_with_log!(
            second == WorkflowError::AlreadyRunning,
            "already running",
            WorkflowError::AlreadyRunning,
            second
        );
        coordinator.stop();
        coordinator.stop();
        crate::assert_with_log!(!coordinator.is_running(), "stopped", false, coordinator.is_running());
        crate::test_complete!("double_start_refused_and_stop_idempotent");
    }

    #[test]
    fn stop_drains_accepted_items() {
        init_test("stop_drains_accepted_items");
        let coordinator = WorkflowCoordinator::new(
            WorkflowConfig::default().stage_capacity(8).workers_per_stage(1),
        );
        coordinator.start().expect("start");
        for i in 0..20 {
            coordinator.submit(format!("job-{i}"), "data").expect("submit");
        }
        coordinator.stop();

        let stats = coordinator.stats();
        crate::assert_with_log!(stats.completed == 20, "all drained", 20usize, stats.completed);
        for stage in &stats.stages {
            crate::assert_with_log!(stage.queued == 0, "buffers empty", 0usize, stage.queued);
        }
        crate::test_complete!("stop_drains_accepted_items");
    }

    #[test]
    fn backpressure_bounds_in_flight() {
        init_test("backpressure_bounds_in_flight");
        let coordinator = Arc::new(
            WorkflowCoordinator::new(
                WorkflowConfig::default().stage_capacity(1).workers_per_stage(1),
            )
            .with_stage_hook(Stage::OutputGeneration, |_item| {
                thread::sleep(Duration::from_millis(15));
            }),
        );
        coordinator.start().expect("start");

        // 5 stage buffers of capacity 1 plus 5 single-worker stages.
        let bound = 10usize;
        let total = 15usize;
        let submitted = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let submitter = {
            let coordinator = Arc::clone(&coordinator);
            let submitted = Arc::clone(&submitted);
            thread::spawn(move || {
                for i in 0..total {
                    coordinator.submit(format!("job-{i}"), "data").expect("submit");
                    submitted.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        while !submitter.is_finished() {
            // The submitted counter trails the actual submission, so
            // saturate: an item can complete before the count ticks.
            let in_flight = submitted
                .load(Ordering::SeqCst)
                .saturating_sub(coordinator.stats().completed);
            assert!(
                in_flight <= bound,
                "in-flight {in_flight} exceeded bound {bound}"
            );
            thread::sleep(Duration::from_millis(5));
        }
        submitter.join().expect("submitter failed");

        wait_for_completed(&coordinator, total, Duration::from_secs(10));
        coordinator.stop();
        crate::test_complete!("backpressure_bounds_in_flight");
    }

    #[test]
    fn hook_panic_is_isolated() {
        init_test("hook_panic_is_isolated");
        let coordinator = WorkflowCoordinator::new(
            WorkflowConfig::default().workers_per_stage(1),
        )
        .with_stage_hook(Stage::Validation, |item| {
            assert!(!item.payload().contains("BOOM"), "poison payload");
        });
        coordinator.start().expect("start");

        coordinator.submit("ok-1", "fine").expect("submit");
        coordinator.submit("poison", "boom").expect("submit");
        coordinator.submit("ok-2", "fine").expect("submit");

        wait_for_completed(&coordinator, 3, Duration::from_secs(10));
        coordinator.stop();

        let items = coordinator.completed_items();
        crate::assert_with_log!(items.len() == 3, "all complete", 3usize, items.len());
        let poisoned = items
            .iter()
            .find(|item| item.name() == "poison")
            .expect("poison item archived");
        let panicked_note = poisoned
            .trace()
            .iter()
            .any(|note| note.contains("panicked"));
        crate::assert_with_log!(panicked_note, "panic recorded in trace", true, panicked_note);
        crate::test_complete!("hook_panic_is_isolated");
    }

    #[test]
    fn try_submit_times_out_when_intake_jammed() {
        init_test("try_submit_times_out_when_intake_jammed");
        let coordinator = WorkflowCoordinator::new(
            WorkflowConfig::default().stage_capacity(1).workers_per_stage(1),
        )
        .with_stage_hook(Stage::Initialization, |_item| {
            thread::sleep(Duration::from_millis(150));
        });
        coordinator.start().expect("start");

        coordinator.submit("a", "data").expect("first accepted");
        coordinator.submit("b", "data").expect("second queued");
        let jammed = coordinator
            .try_submit("c", "data", Duration::from_millis(10))
            .expect_err("intake full");
        crate::assert_with_log!(
            jammed == WorkflowError::SubmitTimeout,
            "submit timeout",
            WorkflowError::SubmitTimeout,
            jammed
        );

        coordinator.stop();
        crate::test_complete!("try_submit_times_out_when_intake_jammed");
    }

    #[test]
    fn stage_never_regresses() {
        init_test("stage_never_regresses");
        // Hook panics are swallowed by design, so violations are
        // counted rather than asserted inside the hook.
        let observed = Arc::new(Mutex::new(std::collections::HashMap::<u64, usize>::new()));
        let violations = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut coordinator = WorkflowCoordinator::new(WorkflowConfig::default());
        for &stage in &Stage::PROCESSING {
            let observed = Arc::clone(&observed);
            let violations = Arc::clone(&violations);
            coordinator = coordinator.with_stage_hook(stage, move |item| {
                let mut map = observed.lock();
                let previous = map.insert(item.id(), item.current_stage().index());
                if let Some(previous) = previous {
                    if item.current_stage().index() != previous + 1 {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }
        coordinator.start().expect("start");
        for i in 0..8 {
            coordinator.submit(format!("job-{i}"), "data").expect("submit");
        }
        wait_for_completed(&coordinator, 8, Duration::from_secs(10));
        coordinator.stop();

        let violation_count = violations.load(Ordering::SeqCst);
        crate::assert_with_log!(violation_count == 0, "strict order held", 0usize, violation_count);
        let final_stages = observed.lock();
        crate::assert_with_log!(final_stages.len() == 8, "every item observed", 8usize, final_stages.len());
        let all_reached_cleanup = final_stages
            .values()
            .all(|&index| index == Stage::Cleanup.index());
        crate::assert_with_log!(all_reached_cleanup, "all reached cleanup", true, all_reached_cleanup);
        crate::test_complete!("stage_never_regresses");
    }
}
