//! Admission-controlled queue.
//!
//! The queue bounds how many tasks execute at once (`concurrency_limit`) and
//! how many admitted requests may be outstanding (`capacity`). A submission is
//! handled in one of three ways:
//!
//! 1. a slot is free: the task is invoked inside `submit`;
//! 2. no slot is free but there is room to queue: a deferred start is recorded
//!    and `submit` returns at once;
//! 3. the queue is saturated: the submitter waits until a completion hands it
//!    a slot.
//!
//! Blocked submitters and deferred starts share one FIFO list. Each completion
//! hands its slot to the oldest waiter, so later submitters never overtake
//! earlier ones. When the last running task finishes and nobody is waiting,
//! every `wait()` caller is released together.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::channel::oneshot;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{ConfigError, QueueConfig};
use crate::core::diagnostics::{build_diagnostic_event, emit, DiagnosticsSink, Severity};
use crate::core::handle::Outcome;
use crate::core::stats::{Lifecycle, QueueCounters, QueueStats};
use crate::core::task::{panic_message, Task};
use crate::core::{Admission, QueueError, TaskError, TaskHandle, TaskId};

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn a future to run to completion in the background.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Starts a deferred task on the slot handed to it. Receives the running count
/// as of the handoff and returns whatever the start itself asks to fire.
type DeferredStart<S> = Box<dyn FnOnce(&AdmissionQueue<S>, usize) -> Wake<S> + Send>;

/// A suspended continuation waiting for a slot.
enum Waiter<S> {
    /// Submitter suspended by backpressure; the grant carries the running count.
    Blocked(oneshot::Sender<usize>),
    /// Admitted task waiting to be started.
    Deferred(DeferredStart<S>),
}

/// What a slot release asks the caller to fire once the lock is dropped.
enum Wake<S> {
    Nothing,
    Grant(oneshot::Sender<usize>, usize),
    Start(DeferredStart<S>, usize),
    Drained(Vec<oneshot::Sender<()>>),
}

struct State<S> {
    running: usize,
    deferred: usize,
    blocked: usize,
    pending: VecDeque<Waiter<S>>,
    drain: Vec<oneshot::Sender<()>>,
    lifecycle: Lifecycle,
}

impl<S> State<S> {
    fn new() -> Self {
        Self {
            running: 0,
            deferred: 0,
            blocked: 0,
            pending: VecDeque::new(),
            drain: Vec::new(),
            lifecycle: Lifecycle::Active,
        }
    }
}

struct Inner<S> {
    config: QueueConfig,
    name: String,
    concurrency: usize,
    state: Mutex<State<S>>,
    counters: QueueCounters,
    next_id: AtomicU64,
    spawner: S,
    diagnostics: Option<Arc<dyn DiagnosticsSink>>,
}

/// Result of the admission decision, carrying whatever the chosen path needs.
enum Admit<T, O> {
    Now(T, oneshot::Sender<O>, usize),
    Queued,
    Saturated(oneshot::Receiver<usize>, T, oneshot::Sender<O>),
    Closed,
}

/// Bounded, FIFO admission queue for async and sync tasks.
///
/// Cloning is cheap and yields another handle to the same queue.
pub struct AdmissionQueue<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for AdmissionQueue<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[cfg(feature = "tokio-runtime")]
impl AdmissionQueue<crate::runtime::TokioSpawner> {
    /// Create a queue running tasks on the ambient tokio runtime.
    pub fn new(config: QueueConfig) -> Result<Self, ConfigError> {
        Self::with_spawner(config, crate::runtime::TokioSpawner::default())
    }
}

impl<S> AdmissionQueue<S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Create a queue running tasks on the given spawner.
    pub fn with_spawner(config: QueueConfig, spawner: S) -> Result<Self, ConfigError> {
        Self::from_parts(config, spawner, None)
    }

    pub(crate) fn from_parts(
        config: QueueConfig,
        spawner: S,
        diagnostics: Option<Arc<dyn DiagnosticsSink>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let name = config
            .label
            .clone()
            .unwrap_or_else(|| format!("queue-{}", Uuid::new_v4().simple()));
        if config.concurrency_limit() > config.capacity {
            warn!(
                queue = %name,
                concurrency_limit = config.concurrency_limit(),
                capacity = config.capacity,
                "concurrency limit exceeds capacity; capacity bounds execution"
            );
        }
        let concurrency = config.effective_concurrency();
        debug!(queue = %name, capacity = config.capacity, concurrency, "queue created");

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                name,
                concurrency,
                state: Mutex::new(State::new()),
                counters: QueueCounters::default(),
                next_id: AtomicU64::new(1),
                spawner,
                diagnostics,
            }),
        })
    }

    /// Configuration the queue was built from.
    pub fn config(&self) -> &QueueConfig {
        &self.inner.config
    }

    /// Label, or a generated `queue-<uuid>` name when none was configured.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current lifecycle state.
    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.state.lock().lifecycle
    }

    /// Number of tasks holding an execution slot.
    pub fn running(&self) -> usize {
        self.inner.state.lock().running
    }

    /// Snapshot of queue state and totals.
    pub fn stats(&self) -> QueueStats {
        let mut stats = {
            let state = self.inner.state.lock();
            QueueStats {
                capacity: self.inner.config.capacity,
                concurrency_limit: self.inner.concurrency,
                running: state.running,
                deferred: state.deferred,
                blocked: state.blocked,
                drain_waiters: state.drain.len(),
                lifecycle: state.lifecycle,
                ..QueueStats::default()
            }
        };
        self.inner.counters.fill(&mut stats);
        stats
    }

    /// Submit a task.
    ///
    /// Resolves once the task is accepted: immediately when a slot is free
    /// (the task has been invoked) or when there is room to queue it (it will
    /// be invoked later, in order). When the queue is saturated this waits
    /// until a running task finishes and hands its slot over.
    ///
    /// The returned handle resolves to the task's outcome. Task failures and
    /// panics are delivered only through the handle.
    ///
    /// # Errors
    ///
    /// [`QueueError::AcceptanceClosed`] while the queue is stopping or stopped.
    pub fn submit<T>(
        &self,
        task: T,
    ) -> impl Future<Output = Result<TaskHandle<T::Output, T::Error>, QueueError>> + Send + '_
    where
        T: Task,
    {
        async move {
            let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
            let (tx, rx) = oneshot::channel();

            let admit = {
                let mut state = self.inner.state.lock();
                if state.lifecycle != Lifecycle::Active {
                    Admit::Closed
                } else if state.running < self.inner.concurrency {
                    state.running += 1;
                    Admit::Now(task, tx, state.running)
                } else if state.running + state.deferred < self.inner.config.capacity {
                    let start: DeferredStart<S> =
                        Box::new(move |queue: &Self, running: usize| queue.launch(id, task, tx, running));
                    state.pending.push_back(Waiter::Deferred(start));
                    state.deferred += 1;
                    Admit::Queued
                } else {
                    let (grant_tx, grant_rx) = oneshot::channel();
                    state.pending.push_back(Waiter::Blocked(grant_tx));
                    state.blocked += 1;
                    Admit::Saturated(grant_rx, task, tx)
                }
            };

            match admit {
                Admit::Closed => {
                    warn!(queue = %self.inner.name, task_id = id, "submission rejected: acceptance closed");
                    Err(QueueError::AcceptanceClosed(self.inner.name.clone()))
                }
                Admit::Now(task, tx, running) => {
                    self.inner.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                    let wake = self.launch(id, task, tx, running);
                    self.fire(wake);
                    Ok(TaskHandle::new(id, Admission::Immediate, rx))
                }
                Admit::Queued => {
                    self.inner.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                    debug!(queue = %self.inner.name, task_id = id, "task deferred");
                    Ok(TaskHandle::new(id, Admission::Deferred, rx))
                }
                Admit::Saturated(grant_rx, task, tx) => {
                    debug!(queue = %self.inner.name, task_id = id, "queue saturated; submitter waiting");
                    let mut grant = GrantWait {
                        queue: self,
                        rx: Some(grant_rx),
                    };
                    let Some(running) = grant.wait().await else {
                        return Err(QueueError::AcceptanceClosed(self.inner.name.clone()));
                    };
                    self.inner.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
                    debug!(queue = %self.inner.name, task_id = id, "submitter granted a slot");
                    let wake = self.launch(id, task, tx, running);
                    self.fire(wake);
                    Ok(TaskHandle::new(id, Admission::AfterBackpressure, rx))
                }
            }
        }
    }

    /// Wait until no task is running.
    ///
    /// Resolves at once if the queue is idle. Other callers may submit work
    /// concurrently, so the queue can be busy again by the time this returns.
    pub async fn wait(&self) {
        let rx = {
            let mut state = self.inner.state.lock();
            if state.running == 0 {
                return;
            }
            let (tx, rx) = oneshot::channel();
            state.drain.push(tx);
            rx
        };
        // The sender is only dropped with the queue itself.
        let _ = rx.await;
    }

    /// Stop accepting submissions and wait for running work to drain.
    ///
    /// New submissions fail with [`QueueError::AcceptanceClosed`] from the
    /// moment this is called. Already admitted work, including deferred tasks
    /// and submitters waiting for a slot, still runs. Dropping the returned
    /// future before it completes leaves the queue stopping until another
    /// `stop()` finishes.
    pub async fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            match state.lifecycle {
                Lifecycle::Stopped => return,
                Lifecycle::Stopping => {}
                Lifecycle::Active => {
                    state.lifecycle = Lifecycle::Stopping;
                    info!(queue = %self.inner.name, running = state.running, "queue stopping");
                }
            }
        }

        self.wait().await;

        let mut state = self.inner.state.lock();
        if state.lifecycle == Lifecycle::Stopping {
            state.lifecycle = Lifecycle::Stopped;
            info!(queue = %self.inner.name, "queue stopped");
        }
    }

    /// Resume accepting submissions after [`stop`](Self::stop).
    ///
    /// No-op unless the queue is stopped.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidState`] while a stop is still draining.
    pub fn start(&self) -> Result<(), QueueError> {
        let mut state = self.inner.state.lock();
        match state.lifecycle {
            Lifecycle::Active => Ok(()),
            Lifecycle::Stopping => Err(QueueError::InvalidState(format!(
                "queue `{}` cannot start while stopping",
                self.inner.name
            ))),
            Lifecycle::Stopped => {
                state.lifecycle = Lifecycle::Active;
                info!(queue = %self.inner.name, "queue started");
                Ok(())
            }
        }
    }

    /// Invoke a task that already holds a slot and drive it to completion.
    ///
    /// `running` is the count as of the slot claim. A panic during invocation
    /// releases the slot here; the resulting wake-up is returned rather than
    /// fired so that a chain of failing deferred starts never nests.
    fn launch<T>(
        &self,
        id: TaskId,
        task: T,
        tx: oneshot::Sender<Outcome<T::Output, T::Error>>,
        running: usize,
    ) -> Wake<S>
    where
        T: Task,
    {
        let invoked = catch_unwind(AssertUnwindSafe(|| task.invoke()));

        self.inner.counters.started_tasks.fetch_add(1, Ordering::Relaxed);
        debug!(queue = %self.inner.name, task_id = id, running, "task started");
        self.diagnose("task started", running, Severity::Info, Some(id));

        match invoked {
            Ok(fut) => {
                let queue = self.clone();
                self.inner.spawner.spawn(async move {
                    let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(err)) => Err(TaskError::Failed(err)),
                        Err(payload) => Err(TaskError::Panicked(panic_message(payload.as_ref()))),
                    };
                    queue.task_finished(id, outcome.is_ok());
                    let _ = tx.send(outcome);
                });
                Wake::Nothing
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(queue = %self.inner.name, task_id = id, "task panicked on invocation: {}", message);
                let wake = self.finish(id, false);
                let _ = tx.send(Err(TaskError::Panicked(message)));
                wake
            }
        }
    }

    /// Completion notification: release the task's slot and wake one waiter.
    pub(crate) fn task_finished(&self, id: TaskId, succeeded: bool) {
        let wake = self.finish(id, succeeded);
        self.fire(wake);
    }

    /// Record a finished task and release its slot, returning the wake-up to fire.
    fn finish(&self, id: TaskId, succeeded: bool) -> Wake<S> {
        if succeeded {
            self.inner.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
        }

        let (running, wake) = self.release_slot();
        debug!(queue = %self.inner.name, task_id = id, running, succeeded, "task finished");
        self.diagnose("task finished", running, Severity::Info, Some(id));
        wake
    }

    /// Give back one slot. The oldest waiter, if any, takes it over; otherwise
    /// an idle queue releases its drain waiters.
    ///
    /// Returns the running count right after the release, before any handoff.
    fn release_slot(&self) -> (usize, Wake<S>) {
        let mut state = self.inner.state.lock();

        let underflow = state.running == 0;
        if !underflow {
            state.running -= 1;
        }
        let released = state.running;

        let wake = match state.pending.pop_front() {
            Some(waiter) => {
                state.running += 1;
                match waiter {
                    Waiter::Blocked(grant) => {
                        state.blocked -= 1;
                        Wake::Grant(grant, state.running)
                    }
                    Waiter::Deferred(start) => {
                        state.deferred -= 1;
                        Wake::Start(start, state.running)
                    }
                }
            }
            None if state.running == 0 => Wake::Drained(std::mem::take(&mut state.drain)),
            None => Wake::Nothing,
        };
        drop(state);

        if underflow {
            self.inner.counters.underflows.fetch_add(1, Ordering::Relaxed);
            error!(queue = %self.inner.name, "running count underflow; completion reported twice");
            self.diagnose("running count underflow", released, Severity::Error, None);
        }
        (released, wake)
    }

    /// Fire wake-ups outside the lock until none is left.
    fn fire(&self, mut wake: Wake<S>) {
        loop {
            wake = match wake {
                Wake::Nothing => return,
                Wake::Start(start, running) => start(self, running),
                Wake::Grant(grant, running) => {
                    if grant.send(running).is_ok() {
                        return;
                    }
                    debug!(queue = %self.inner.name, "blocked submitter gone; passing slot on");
                    self.release_slot().1
                }
                Wake::Drained(waiters) => {
                    if !waiters.is_empty() {
                        debug!(queue = %self.inner.name, waiters = waiters.len(), "queue drained");
                    }
                    for waiter in waiters {
                        let _ = waiter.send(());
                    }
                    return;
                }
            };
        }
    }

    fn diagnose(&self, message: &str, running: usize, severity: Severity, task_id: Option<TaskId>) {
        if let Some(sink) = &self.inner.diagnostics {
            let event =
                build_diagnostic_event(message, self.inner.name.as_str(), running, severity, task_id);
            emit(sink.as_ref(), &event);
        }
    }
}

/// A saturated submitter's claim on a future slot.
///
/// If the submitting future is dropped after the slot was granted but before
/// the task was launched, the slot is passed on instead of leaking.
struct GrantWait<'a, S>
where
    S: Spawn + Send + Sync + 'static,
{
    queue: &'a AdmissionQueue<S>,
    rx: Option<oneshot::Receiver<usize>>,
}

impl<S> GrantWait<'_, S>
where
    S: Spawn + Send + Sync + 'static,
{
    /// Resolves to the running count handed over with the slot.
    async fn wait(&mut self) -> Option<usize> {
        let granted = match self.rx.as_mut() {
            Some(rx) => rx.await.ok(),
            None => None,
        };
        self.rx = None;
        granted
    }
}

impl<S> Drop for GrantWait<'_, S>
where
    S: Spawn + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if matches!(rx.try_recv(), Ok(Some(_))) {
                debug!(queue = %self.queue.inner.name, "granted submitter cancelled; passing slot on");
                let (_, wake) = self.queue.release_slot();
                self.queue.fire(wake);
            }
        }
    }
}

impl<S> fmt::Debug for AdmissionQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("AdmissionQueue")
            .field("name", &self.inner.name)
            .field("capacity", &self.inner.config.capacity)
            .field("concurrency", &self.inner.concurrency)
            .field("running", &state.running)
            .field("deferred", &state.deferred)
            .field("blocked", &state.blocked)
            .field("lifecycle", &state.lifecycle)
            .finish_non_exhaustive()
    }
}
