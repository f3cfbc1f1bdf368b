// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling tier of a submitted task.
///
/// Higher tiers are always dequeued before lower ones; tasks of the same tier
/// run in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskPriority {
    /// Background work.
    #[default]
    Normal,
    /// Work on the current frame's critical path.
    High,
    /// Work other tasks are blocked on.
    Critical,
    /// Work that must start as soon as a worker frees up.
    RealTime,
}

impl TaskPriority {
    const COUNT: usize = 4;

    fn slot(self) -> usize {
        self as usize
    }
}

/// Error reported by a [`TaskHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
    /// The task was dropped before producing a value: the pool shut down with
    /// the task still queued, or the task panicked.
    #[error("task was cancelled before producing a result")]
    Cancelled,
}

/// Handle to the value of a task submitted with
/// [`PoolHandle::submit_with_result`].
///
/// It can be waited on from any thread, including the submitter.
pub struct TaskHandle<T> {
    receiver: flume::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Blocks until the task has run and returns its value.
    pub fn wait(self) -> Result<T, TaskError> {
        self.receiver.recv().map_err(|_| TaskError::Cancelled)
    }

    /// Returns the value if the task already finished, without blocking.
    ///
    /// `Ok(None)` means the task has not run yet.
    pub fn try_wait(&self) -> Result<Option<T>, TaskError> {
        match self.receiver.try_recv() {
            Ok(value) => Ok(Some(value)),
            Err(flume::TryRecvError::Empty) => Ok(None),
            Err(flume::TryRecvError::Disconnected) => Err(TaskError::Cancelled),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("ready", &!self.receiver.is_empty())
            .finish()
    }
}

#[derive(Default)]
struct QueueState {
    tiers: [VecDeque<Task>; TaskPriority::COUNT],
    stop: bool,
}

impl QueueState {
    fn pop(&mut self) -> Option<Task> {
        self.tiers.iter_mut().rev().find_map(VecDeque::pop_front)
    }

    fn len(&self) -> usize {
        self.tiers.iter().map(VecDeque::len).sum()
    }

    fn drain(&mut self) -> Vec<Task> {
        self.tiers.iter_mut().flat_map(|tier| tier.drain(..)).collect()
    }
}

struct Shared {
    queue: Mutex<QueueState>,
    available: Condvar,
    thread_count: AtomicUsize,
}

impl Shared {
    // Tasks never run under this lock, so poisoning can only come from a panic
    // inside the queue bookkeeping itself; the queue is still consistent.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A cloneable reference to a pool's task queue.
///
/// Tasks capture a `PoolHandle` to submit follow-up work, which is how
/// multi-stage jobs are chained without joins.
#[derive(Clone)]
pub struct PoolHandle {
    shared: Arc<Shared>,
}

impl PoolHandle {
    /// Number of running worker threads. Zero means the pool is a no-op pool
    /// and callers should run their work on the calling thread.
    pub fn thread_count(&self) -> usize {
        self.shared.thread_count.load(Ordering::Acquire)
    }

    /// Number of tasks waiting in the queue.
    pub fn pending(&self) -> usize {
        self.shared.lock().len()
    }

    /// Enqueues `task`. Never blocks on task execution.
    ///
    /// Tasks submitted after [`WorkerPool::shutdown`] are dropped.
    pub fn submit<F>(&self, task: F, priority: TaskPriority)
    where
        F: FnOnce() + Send + 'static,
    {
        let rejected = {
            let mut state = self.shared.lock();
            if state.stop {
                Some(Box::new(task) as Task)
            } else {
                state.tiers[priority.slot()].push_back(Box::new(task));
                None
            }
        };
        match rejected {
            Some(task) => {
                log::trace!("Task submitted to a stopped pool was dropped.");
                drop(task);
            }
            None => self.shared.available.notify_one(),
        }
    }

    /// Enqueues `task` and returns a handle to its value.
    pub fn submit_with_result<F, T>(&self, task: F, priority: TaskPriority) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (sender, receiver) = flume::bounded(1);
        self.submit(
            move || {
                // The handle may have been dropped; the value is simply discarded.
                let _ = sender.send(task());
            },
            priority,
        );
        TaskHandle { receiver }
    }

    /// Pops the highest-priority queued task and runs it on the calling
    /// thread. Returns `false` if the queue was empty or the pool is stopped.
    pub fn run_next_on_calling_thread(&self) -> bool {
        let task = {
            let mut state = self.shared.lock();
            if state.stop {
                return false;
            }
            state.pop()
        };
        match task {
            Some(task) => {
                run_task(task);
                true
            }
            None => false,
        }
    }

    /// Runs queued tasks on the calling thread until the queue is empty.
    ///
    /// Returns the number of tasks executed. Tasks submitted by the executed
    /// tasks are drained too.
    pub fn run_pending_on_calling_thread(&self) -> usize {
        let mut executed = 0;
        while self.run_next_on_calling_thread() {
            executed += 1;
        }
        executed
    }
}

impl fmt::Debug for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolHandle")
            .field("thread_count", &self.thread_count())
            .finish()
    }
}

/// A fixed-size pool of persistent worker threads sharing one priority queue.
///
/// Threads are created in [`initialize`](Self::initialize) and joined in
/// [`shutdown`](Self::shutdown) (also run on drop). Between the two, the pool
/// is driven entirely through its queue and [`CountingSignal`]s.
///
/// [`CountingSignal`]: super::CountingSignal
pub struct WorkerPool {
    handle: PoolHandle,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Creates a pool with no workers. Call [`initialize`](Self::initialize) to
    /// start threads.
    pub fn new() -> Self {
        Self {
            handle: PoolHandle {
                shared: Arc::new(Shared {
                    queue: Mutex::new(QueueState::default()),
                    available: Condvar::new(),
                    thread_count: AtomicUsize::new(0),
                }),
            },
            workers: Vec::new(),
        }
    }

    /// Creates a pool and starts `thread_count` workers.
    pub fn with_threads(thread_count: usize) -> Self {
        let mut pool = Self::new();
        pool.initialize(thread_count);
        pool
    }

    /// Spawns `thread_count` workers.
    ///
    /// Each worker sleeps until the queue is non-empty or shutdown is
    /// requested, pops one task, runs it, and repeats. A `thread_count` of zero
    /// leaves the pool as a no-op pool. Calling this on a running pool does
    /// nothing.
    pub fn initialize(&mut self, thread_count: usize) {
        if !self.workers.is_empty() {
            log::warn!(
                "WorkerPool already running with {} workers; initialize ignored.",
                self.workers.len()
            );
            return;
        }

        self.handle.shared.lock().stop = false;

        for index in 0..thread_count {
            let shared = Arc::clone(&self.handle.shared);
            let spawned = thread::Builder::new()
                .name(format!("vantage-worker-{index}"))
                .spawn(move || worker_loop(shared));
            match spawned {
                Ok(worker) => self.workers.push(worker),
                Err(e) => log::warn!("Failed to spawn worker thread {index}: {e}"),
            }
        }

        self.handle
            .shared
            .thread_count
            .store(self.workers.len(), Ordering::Release);

        if self.workers.len() < thread_count {
            log::warn!(
                "WorkerPool degraded: {} of {} workers started.",
                self.workers.len(),
                thread_count
            );
        }
        log::info!("WorkerPool started with {} workers.", self.workers.len());
    }

    /// Stops the workers and joins them. Queued tasks are dropped without
    /// running, which cancels their result handles.
    pub fn shutdown(&mut self) {
        let dropped = {
            let mut state = self.handle.shared.lock();
            state.stop = true;
            state.drain()
        };
        self.handle.shared.available.notify_all();

        if !dropped.is_empty() {
            log::debug!("WorkerPool dropped {} queued tasks at shutdown.", dropped.len());
        }
        drop(dropped);

        let joined = self.workers.len();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("A worker thread terminated abnormally.");
            }
        }
        self.handle.shared.thread_count.store(0, Ordering::Release);

        if joined > 0 {
            log::info!("WorkerPool shut down ({joined} workers joined).");
        }
    }

    /// Returns a cloneable handle to this pool's queue.
    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    /// See [`PoolHandle::thread_count`].
    pub fn thread_count(&self) -> usize {
        self.handle.thread_count()
    }

    /// See [`PoolHandle::submit`].
    pub fn submit<F>(&self, task: F, priority: TaskPriority)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.submit(task, priority);
    }

    /// See [`PoolHandle::submit_with_result`].
    pub fn submit_with_result<F, T>(&self, task: F, priority: TaskPriority) -> TaskHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.handle.submit_with_result(task, priority)
    }

    /// See [`PoolHandle::run_pending_on_calling_thread`].
    pub fn run_pending_on_calling_thread(&self) -> usize {
        self.handle.run_pending_on_calling_thread()
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut state = shared.lock();
            loop {
                if state.stop {
                    return;
                }
                if let Some(task) = state.pop() {
                    break task;
                }
                state = shared
                    .available
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };
        run_task(task);
    }
}

fn run_task(task: Task) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
        let thread = thread::current();
        log::error!(
            "Task panicked on thread '{}': {}",
            thread.name().unwrap_or("<unnamed>"),
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
