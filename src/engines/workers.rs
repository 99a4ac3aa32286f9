//! Background worker pools
//!
//! The animation compute stage hands closures to a [`WorkerPool`]. Scenes
//! never wait on jobs: results come back over channels.

use std::io;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs off the control thread.
pub trait WorkerPool: Send + Sync {
    fn execute(&self, job: Job);
}

/// Runs every job immediately on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineWorkerPool;

impl WorkerPool for InlineWorkerPool {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Fixed set of threads pulling jobs from a shared queue.
pub struct ThreadWorkerPool {
    jobs: Option<Sender<Job>>,
    threads: Vec<JoinHandle<()>>,
}

impl ThreadWorkerPool {
    /// Spawn `count` worker threads (at least one).
    ///
    /// # Errors
    ///
    /// Returns an error if a thread cannot be spawned
    pub fn new(count: usize) -> io::Result<Self> {
        let (jobs, queue) = unbounded::<Job>();
        let mut threads = Vec::with_capacity(count.max(1));

        for index in 0..count.max(1) {
            let queue = queue.clone();
            let handle = thread::Builder::new()
                .name(format!("scene-worker-{index}"))
                .spawn(move || {
                    // Ends once every sender is gone and the queue is drained.
                    for job in queue {
                        job();
                    }
                })?;
            threads.push(handle);
        }

        log::debug!("started {} worker threads", threads.len());
        Ok(Self {
            jobs: Some(jobs),
            threads,
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

impl WorkerPool for ThreadWorkerPool {
    fn execute(&self, job: Job) {
        let Some(jobs) = &self.jobs else {
            return;
        };
        if jobs.send(job).is_err() {
            log::warn!("worker pool is shut down, dropping job");
        }
    }
}

impl Drop for ThreadWorkerPool {
    fn drop(&mut self) {
        self.jobs.take();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread panicked");
            }
        }
    }
}
