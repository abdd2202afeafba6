//! Delivery targets for stream callbacks.
//!
//! A [`Scheduler`] decides where and when a [`Job`] runs. The collection and
//! command engines take a [`SharedScheduler`] so hosts can route
//! notifications to a UI thread, a worker, or run them inline.
//!
//! | Scheduler | Runs jobs | Ordering |
//! |-----------|-----------|----------|
//! | [`ImmediateScheduler`] | inline, on the calling thread | call order |
//! | [`QueueScheduler`] | when the owner calls [`QueueScheduler::run_pending`] | FIFO |
//! | [`ThreadScheduler`] | on one dedicated worker thread | FIFO |

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::StreamError;
use crate::sync::lock;

/// A unit of scheduled work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Something that runs jobs.
pub trait Scheduler: Send + Sync {
    /// Queue or run `job`.
    fn schedule(&self, job: Job);
}

/// Shared handle to a scheduler.
pub type SharedScheduler = Arc<dyn Scheduler>;

/// The inline scheduler as a [`SharedScheduler`].
#[must_use]
pub fn immediate() -> SharedScheduler {
    Arc::new(ImmediateScheduler)
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, job: Job) {
        job();
    }
}

/// Collects jobs until the owner drains them.
///
/// Useful as a stand-in for a UI dispatcher and for deterministic tests.
#[derive(Default)]
pub struct QueueScheduler {
    queue: Mutex<VecDeque<Job>>,
}

impl fmt::Debug for QueueScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

impl QueueScheduler {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run queued jobs in FIFO order until the queue is empty, including jobs
    /// queued by the jobs themselves. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let job = lock(&self.queue).pop_front();
            match job {
                Some(job) => {
                    job();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    /// Number of queued jobs.
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }
}

impl Scheduler for QueueScheduler {
    fn schedule(&self, job: Job) {
        lock(&self.queue).push_back(job);
    }
}

/// Runs jobs in order on a dedicated worker thread.
///
/// Dropping the scheduler lets the worker finish the queued jobs and joins
/// it. A job that panics is logged and does not stop the worker.
pub struct ThreadScheduler {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Option<JoinHandle<()>>,
    name: String,
}

impl fmt::Debug for ThreadScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadScheduler")
            .field("name", &self.name)
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl ThreadScheduler {
    /// Spawn the worker thread.
    ///
    /// If the thread cannot be spawned, jobs run inline on the scheduling
    /// thread instead.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job>();
        match thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(rx))
        {
            Ok(handle) => Self {
                sender: Mutex::new(Some(tx)),
                handle: Some(handle),
                name,
            },
            Err(error) => {
                tracing::warn!(%error, scheduler = %name, "failed to spawn scheduler thread; running jobs inline");
                Self {
                    sender: Mutex::new(None),
                    handle: None,
                    name,
                }
            }
        }
    }

    /// Name given to the worker thread.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Scheduler for ThreadScheduler {
    fn schedule(&self, job: Job) {
        let rejected = match &*lock(&self.sender) {
            Some(sender) => sender.send(job).err().map(|mpsc::SendError(job)| job),
            None => Some(job),
        };
        if let Some(job) = rejected {
            run_guarded(job);
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        drop(lock(&self.sender).take());
        if let Some(handle) = self.handle.take() {
            // The last handle can be dropped by a job on the worker itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn worker_loop(rx: mpsc::Receiver<Job>) {
    while let Ok(job) = rx.recv() {
        run_guarded(job);
    }
}

fn run_guarded(job: Job) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(job)) {
        let error = StreamError::panicked(payload);
        tracing::error!(error = %error, "scheduled job panicked");
    }
}
