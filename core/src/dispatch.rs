//! Bounded worker pool that runs deferred calls off the caller's thread.
//!
//! # Design
//! A fixed set of named OS threads pull jobs from one bounded queue. When the
//! queue is full, `spawn` and `detach` block the submitting thread until a
//! worker frees a slot, so the number of requests in flight never exceeds
//! `workers` and the backlog never exceeds `queue_depth`.
//!
//! Every job, tracked or detached, is counted from submission until it
//! returns. `wait_idle` waits for that count to reach zero. A panic inside a
//! job is caught on the worker so the pool keeps its size.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::endpoint::Deferred;
use crate::error::Error;

pub const DEFAULT_WORKERS: usize = 64;
pub const DEFAULT_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Worker threads, and so the cap on concurrent requests. At least 1.
    pub workers: usize,
    /// Jobs that may wait for a worker before submission blocks. 0 hands
    /// each job straight to an idle worker.
    pub queue_depth: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn end(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn get(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait_zero(&self) {
        let count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        let _idle = self
            .idle
            .wait_while(count, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Handle to one tracked job.
#[derive(Debug)]
pub struct Ticket {
    done: Receiver<()>,
}

impl Ticket {
    /// Block until the job's callback has returned.
    ///
    /// Returns `Error::Abandoned` if the job panicked before finishing.
    pub fn wait(self) -> Result<(), Error> {
        self.done.recv().map_err(|_| Error::Abandoned)
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    sender: Option<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Arc<InFlight>,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Result<Self, Error> {
        let (sender, receiver) = mpsc::sync_channel::<Job>(config.queue_depth);
        let receiver = Arc::new(Mutex::new(receiver));
        let in_flight = Arc::new(InFlight::default());

        let mut dispatcher = Self {
            sender: Some(sender),
            workers: Vec::with_capacity(config.workers.max(1)),
            in_flight,
        };
        for id in 0..config.workers.max(1) {
            let receiver = Arc::clone(&receiver);
            let in_flight = Arc::clone(&dispatcher.in_flight);
            let handle = thread::Builder::new()
                .name(format!("ping-worker-{id}"))
                .spawn(move || worker_loop(receiver, in_flight))?;
            dispatcher.workers.push(handle);
        }
        tracing::debug!(
            workers = dispatcher.workers.len(),
            queue_depth = config.queue_depth,
            "dispatcher started"
        );
        Ok(dispatcher)
    }

    /// Run `deferred` on a worker and return a handle to wait on.
    pub fn spawn(&self, deferred: Deferred) -> Result<Ticket, Error> {
        self.spawn_fn(move || deferred.run())
    }

    /// Run `deferred` on a worker without keeping a handle.
    pub fn detach(&self, deferred: Deferred) -> Result<(), Error> {
        self.detach_fn(move || deferred.run())
    }

    pub fn spawn_fn<F>(&self, job: F) -> Result<Ticket, Error>
    where
        F: FnOnce() + Send + 'static,
    {
        let (done_tx, done_rx) = mpsc::sync_channel(1);
        self.submit(Box::new(move || {
            job();
            // The ticket may already be gone; nobody is waiting then.
            let _ = done_tx.send(());
        }))?;
        Ok(Ticket { done: done_rx })
    }

    pub fn detach_fn<F>(&self, job: F) -> Result<(), Error>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Box::new(job))
    }

    /// Jobs submitted and not yet finished, queued ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Block until every submitted job has finished.
    pub fn wait_idle(&self) {
        self.in_flight.wait_zero();
    }

    fn submit(&self, job: Job) -> Result<(), Error> {
        let sender = self.sender.as_ref().ok_or(Error::Closed)?;
        self.in_flight.begin();
        if sender.send(job).is_err() {
            self.in_flight.end();
            return Err(Error::Closed);
        }
        Ok(())
    }
}

impl Drop for Dispatcher {
    /// Close the queue, let workers drain what is left, then join them.
    fn drop(&mut self) {
        self.sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("dispatcher worker exited with a panic");
            }
        }
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>, in_flight: Arc<InFlight>) {
    loop {
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let Ok(job) = next else {
            break;
        };
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            let current = thread::current();
            tracing::error!(
                worker = current.name().unwrap_or_default(),
                "job panicked; callback did not complete"
            );
        }
        in_flight.end();
    }
}
