//! Background execution of collaborator calls without blocking the
//! editor's event loop.

use std::collections::VecDeque;
use std::fmt;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Output of a finished job.
#[derive(Debug)]
pub struct Completed<T> {
    pub id: JobId,
    pub output: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// One worker thread per job.
    Threaded,
    /// Jobs run to completion inside `submit`.
    Inline,
}

struct PendingJob<T> {
    id: JobId,
    label: String,
    receiver: Receiver<T>,
    join: Option<JoinHandle<()>>,
}

/// Runs jobs off the caller's thread and hands back their outputs on
/// [`poll`](JobQueue::poll), oldest submission first.
pub struct JobQueue<T> {
    mode: Mode,
    next_id: u64,
    pending: Vec<PendingJob<T>>,
    ready: VecDeque<Completed<T>>,
}

impl<T: Send + 'static> JobQueue<T> {
    pub fn threaded() -> Self {
        Self::with_mode(Mode::Threaded)
    }

    /// Deterministic queue for tests and one-shot tools.
    pub fn inline() -> Self {
        Self::with_mode(Mode::Inline)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            next_id: 1,
            pending: Vec::new(),
            ready: VecDeque::new(),
        }
    }

    pub fn submit<F>(&mut self, label: impl Into<String>, job: F) -> JobId
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let id = JobId(self.next_id);
        self.next_id += 1;
        let label = label.into();
        debug!(%id, %label, "job submitted");

        match self.mode {
            Mode::Inline => self.ready.push_back(Completed { id, output: job() }),
            Mode::Threaded => {
                let (tx, rx) = mpsc::channel();
                let join = thread::spawn(move || {
                    let _ = tx.send(job());
                });
                self.pending.push(PendingJob {
                    id,
                    label,
                    receiver: rx,
                    join: Some(join),
                });
            }
        }
        id
    }

    /// Outputs of every job finished since the last poll.
    pub fn poll(&mut self) -> Vec<Completed<T>> {
        let mut ready: Vec<Completed<T>> = self.ready.drain(..).collect();
        let mut still_pending = Vec::new();

        for mut job in self.pending.drain(..) {
            match job.receiver.try_recv() {
                Ok(output) => {
                    if let Some(join) = job.join.take() {
                        let _ = join.join();
                    }
                    ready.push(Completed { id: job.id, output });
                }
                Err(TryRecvError::Empty) => still_pending.push(job),
                Err(TryRecvError::Disconnected) => {
                    if let Some(join) = job.join.take() {
                        let _ = join.join();
                    }
                    warn!(id = %job.id, label = %job.label, "job ended without output");
                }
            }
        }

        self.pending = still_pending;
        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.ready.is_empty()
    }
}

impl<T> fmt::Debug for JobQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("mode", &self.mode)
            .field("pending", &self.pending.len())
            .field("ready", &self.ready.len())
            .finish()
    }
}
