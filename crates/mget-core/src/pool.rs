//! Bounded worker pool.
//!
//! Fixed number of OS threads consuming boxed closures from a shared channel.
//! Used at both concurrency levels: the manager's job pool and each job's
//! segment pool. The two levels are independent, so peak thread usage is
//! `max_concurrent_jobs * connections_per_job`; operators size the limits
//! with that product in mind.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size thread pool with an explicit size limit.
pub struct WorkerPool {
    sender: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn a pool of `size` threads (clamped to at least 1).
    pub fn new(name: &str, size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<Task>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|i| {
                let receiver = Arc::clone(&receiver);
                std::thread::Builder::new()
                    .name(format!("{}-{}", name, i))
                    .spawn(move || worker_loop(&receiver))
                    .expect("failed to spawn pool worker")
            })
            .collect();

        Self {
            sender: Some(sender),
            workers,
        }
    }

    /// Enqueue a task; it runs as soon as a worker is free.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender
            .as_ref()
            .expect("pool already shut down")
            .send(Box::new(task))
            .expect("pool workers exited");
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }
}

fn worker_loop(receiver: &Mutex<Receiver<Task>>) {
    loop {
        // Hold the lock only while waiting for the next task, never while running it.
        let task = match receiver.lock().unwrap().recv() {
            Ok(task) => task,
            Err(_) => break, // channel closed: pool dropped
        };
        task();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        // Closing the channel lets each worker drain remaining tasks and exit.
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            if let Err(e) = handle.join() {
                tracing::error!("pool worker panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn runs_all_tasks() {
        let pool = WorkerPool::new("test", 4);
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..32 {
            let counter = Arc::clone(&counter);
            pool.execute(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        drop(pool); // joins workers after the queue drains
        assert_eq!(counter.load(Ordering::SeqCst), 32);
    }

    #[test]
    fn concurrency_is_bounded_by_size() {
        let pool = WorkerPool::new("test", 2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            pool.execute(move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(20));
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        drop(pool);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn zero_size_clamped_to_one() {
        let pool = WorkerPool::new("test", 0);
        assert_eq!(pool.size(), 1);
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        pool.execute(move || {
            d.store(1, Ordering::SeqCst);
        });
        drop(pool);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
