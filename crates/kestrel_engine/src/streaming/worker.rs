//! Single background thread fed one job at a time
//!
//! The main thread drops the latest job into a one-slot mailbox and raises
//! `wants_update`; the worker picks it up, runs it and hands the output back
//! through a channel with room for one result. Neither side ever blocks the
//! other: a newer request replaces an unstarted one, and a finished result
//! waits in the channel until the main thread takes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const IDLE_WAIT: Duration = Duration::from_millis(20);

/// Worker errors
#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    /// The OS refused to start the thread
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

struct Shared<J> {
    running: AtomicBool,
    wants_update: AtomicBool,
    job: Mutex<Option<J>>,
}

impl<J> Shared<J> {
    fn swap_job(&self, job: Option<J>) -> Option<J> {
        let mut slot = self.job.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, job)
    }
}

/// A named thread that turns jobs of type `J` into outputs of type `O`
pub struct BackgroundWorker<J, O> {
    shared: Arc<Shared<J>>,
    results: Receiver<O>,
    thread: Option<JoinHandle<()>>,
}

impl<J: Send + 'static, O: Send + 'static> BackgroundWorker<J, O> {
    /// Start the thread; `work` runs on it for every job
    pub fn spawn<F>(name: &str, work: F) -> Result<Self, WorkerError>
    where
        F: FnMut(J) -> O + Send + 'static,
    {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(true),
            wants_update: AtomicBool::new(false),
            job: Mutex::new(None),
        });
        let (tx, rx) = mpsc::sync_channel(1);

        let worker_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(worker_shared, tx, work))?;
        log::debug!("started background worker `{}`", name);

        Ok(Self {
            shared,
            results: rx,
            thread: Some(thread),
        })
    }

    /// Queue a job, replacing one that has not started yet.
    ///
    /// Returns true when an unstarted job was replaced.
    pub fn request(&self, job: J) -> bool {
        let replaced = self.shared.swap_job(Some(job)).is_some();
        self.shared.wants_update.store(true, Ordering::Release);
        self.wake();
        replaced
    }

    /// Take a finished output without waiting
    pub fn try_take(&self) -> Option<O> {
        let output = self.results.try_recv().ok();
        if output.is_some() {
            // the worker may be holding the next result
            self.wake();
        }
        output
    }

    /// Whether the thread is still accepting work
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    fn wake(&self) {
        if let Some(thread) = &self.thread {
            thread.thread().unpark();
        }
    }
}

impl<J, O> Drop for BackgroundWorker<J, O> {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            if thread.join().is_err() {
                log::error!("background worker panicked");
            }
        }
    }
}

fn worker_loop<J, O, F>(shared: Arc<Shared<J>>, results: SyncSender<O>, mut work: F)
where
    F: FnMut(J) -> O,
{
    while shared.running.load(Ordering::Acquire) {
        if !shared.wants_update.swap(false, Ordering::AcqRel) {
            thread::park_timeout(IDLE_WAIT);
            continue;
        }
        let Some(job) = shared.swap_job(None) else {
            continue;
        };

        let mut output = work(job);
        loop {
            match results.try_send(output) {
                Ok(()) => break,
                Err(TrySendError::Full(pending)) => {
                    if !shared.running.load(Ordering::Acquire) {
                        return;
                    }
                    output = pending;
                    thread::park_timeout(IDLE_WAIT);
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}
