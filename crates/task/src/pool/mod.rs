//! Fixed-size pool of worker threads
//!
//! Workers share one [`WorkQueue`](queue::WorkQueue) guarded by a mutex and
//! sleep on a condition variable while it is empty. Submitted closures are
//! always taken before compression jobs, so a long compression backlog never
//! delays work a caller is blocked on. Compression jobs are handed to a
//! [`CompressionRunner`]; their outcome is only observable through the task
//! store.

mod handle;
mod queue;

pub use handle::TaskHandle;
pub use queue::Priority;

use parking_lot::{Condvar, Mutex};
use queue::{Job, WorkItem, WorkQueue};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use zpress_config::PoolConfig;
use zpress_core::{CompressionTask, Error, Result};

/// Executes one compression job on a worker thread
pub trait CompressionRunner: Send + Sync {
    fn run(&self, task: CompressionTask);
}

impl<F> CompressionRunner for F
where
    F: Fn(CompressionTask) + Send + Sync,
{
    fn run(&self, task: CompressionTask) {
        self(task)
    }
}

struct Shared {
    queue: Mutex<WorkQueue>,
    available: Condvar,
    runner: Arc<dyn CompressionRunner>,
}

/// Worker pool running generic closures and compression jobs
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    threads: usize,
}

impl WorkerPool {
    pub fn new(config: &PoolConfig, runner: Arc<dyn CompressionRunner>) -> Self {
        let threads = config.effective_threads();
        let shared = Arc::new(Shared {
            queue: Mutex::new(WorkQueue::default()),
            available: Condvar::new(),
            runner,
        });

        let workers = (0..threads)
            .filter_map(|index| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("zpress-worker-{index}"))
                    .spawn(move || worker_loop(&shared))
                    .map_err(|e| tracing::error!("Failed to spawn worker {}: {}", index, e))
                    .ok()
            })
            .collect::<Vec<_>>();

        tracing::debug!(threads = workers.len(), "started worker pool");

        Self {
            threads: workers.len(),
            shared,
            workers: Mutex::new(workers),
        }
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Run `f` on a worker and hand back a handle to its result
    ///
    /// A panic inside `f` is caught and reported through the handle as
    /// [`Error::TaskPanicked`]; the worker keeps running.
    pub fn submit<F, T>(&self, f: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = crossbeam::channel::bounded(1);
        let job: Job = Box::new(move || {
            let result = catch_unwind(AssertUnwindSafe(f)).map_err(|p| Error::task_panicked(&*p));
            // receiver may have been dropped; nobody is waiting then
            let _ = tx.send(result);
        });
        self.push(WorkItem::Generic(job))?;
        Ok(TaskHandle { rx })
    }

    /// Queue a compression job; its progress is reported through the task store
    pub fn enqueue_compression(&self, task: CompressionTask) -> Result<()> {
        self.push(WorkItem::Compression(task))
    }

    /// Items waiting in the given class
    pub fn pending(&self, priority: Priority) -> usize {
        self.shared.queue.lock().len(priority)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shared.queue.lock().stopping
    }

    /// Stop accepting work, let workers drain the queue, and join them
    pub fn shutdown(&self) {
        self.shared.queue.lock().stopping = true;
        self.shared.available.notify_all();

        let workers = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }

        let current = thread::current().id();
        for worker in workers {
            // a job calling shutdown cannot join its own thread
            if worker.thread().id() == current {
                continue;
            }
            if worker.join().is_err() {
                tracing::error!("Worker thread terminated abnormally");
            }
        }
        tracing::debug!("worker pool stopped");
    }

    fn push(&self, item: WorkItem) -> Result<()> {
        {
            let mut queue = self.shared.queue.lock();
            if queue.stopping {
                return Err(Error::PoolShutdown);
            }
            queue.push(item);
        }
        self.shared.available.notify_one();
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let item = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(item) = queue.pop() {
                    break item;
                }
                if queue.stopping {
                    return;
                }
                shared.available.wait(&mut queue);
            }
        };

        match item {
            WorkItem::Generic(job) => job(),
            WorkItem::Compression(task) => {
                let task_id = task.id.clone();
                let runner = Arc::clone(&shared.runner);
                if let Err(payload) = catch_unwind(AssertUnwindSafe(move || runner.run(task))) {
                    tracing::error!(
                        task_id = %task_id,
                        error = %Error::task_panicked(&*payload),
                        "compression job panicked"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use zpress_core::{CompressionLevel, FileRef};

    fn noop_runner() -> Arc<dyn CompressionRunner> {
        Arc::new(|_task: CompressionTask| {})
    }

    fn task(name: &str) -> CompressionTask {
        let file = FileRef::new(name, "owner", format!("/tmp/{name}.txt"));
        CompressionTask::new(&file, CompressionLevel::FAST)
    }

    #[test]
    fn test_submit_returns_result() {
        let pool = WorkerPool::new(&PoolConfig::with_threads(2), noop_runner());
        assert_eq!(pool.threads(), 2);

        let handle = pool.submit(|| 6 * 7).unwrap();
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn test_generic_fifo_order() {
        let pool = WorkerPool::new(&PoolConfig::with_threads(1), noop_runner());
        let (gate_tx, gate_rx) = crossbeam::channel::bounded::<()>(0);
        let order = Arc::new(Mutex::new(Vec::new()));

        let blocker = pool.submit(move || gate_rx.recv().is_ok()).unwrap();
        let handles: Vec<_> = (0..5)
            .map(|i| {
                let order = Arc::clone(&order);
                pool.submit(move || order.lock().push(i)).unwrap()
            })
            .collect();

        gate_tx.send(()).unwrap();
        assert!(blocker.wait().unwrap());
        for handle in handles {
            handle.wait().unwrap();
        }
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(&PoolConfig::with_threads(1), noop_runner());

        let handle = pool.submit(|| -> u32 { panic!("boom") }).unwrap();
        match handle.wait() {
            Err(Error::TaskPanicked { message }) => assert_eq!(message, "boom"),
            other => panic!("expected panic error, got {other:?}"),
        }

        assert_eq!(pool.submit(|| 1).unwrap().wait().unwrap(), 1);
    }

    #[test]
    fn test_compression_jobs_reach_runner() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let runner: Arc<dyn CompressionRunner> = Arc::new(move |_task: CompressionTask| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let pool = WorkerPool::new(&PoolConfig::with_threads(3), runner);

        for i in 0..20 {
            pool.enqueue_compression(task(&format!("f{i}"))).unwrap();
        }
        pool.shutdown();

        assert_eq!(seen.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_generic_work_overtakes_compression_backlog() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let runner: Arc<dyn CompressionRunner> = Arc::new(move |_task: CompressionTask| {
            thread::sleep(Duration::from_millis(10));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let pool = WorkerPool::new(&PoolConfig::with_threads(1), runner);

        for i in 0..50 {
            pool.enqueue_compression(task(&format!("f{i}"))).unwrap();
        }
        let observed = Arc::clone(&done);
        let handle = pool.submit(move || observed.load(Ordering::SeqCst)).unwrap();

        let completed_before = handle.wait().unwrap();
        assert!(
            completed_before <= 2,
            "generic job waited for {completed_before} compression jobs"
        );
        assert!(pool.pending(Priority::Compression) > 0);
    }

    #[test]
    fn test_panicking_runner_keeps_pool_alive() {
        let runner: Arc<dyn CompressionRunner> =
            Arc::new(|_task: CompressionTask| panic!("runner failure"));
        let pool = WorkerPool::new(&PoolConfig::with_threads(1), runner);

        pool.enqueue_compression(task("bad")).unwrap();
        assert_eq!(pool.submit(|| "alive").unwrap().wait().unwrap(), "alive");
    }

    #[test]
    fn test_shutdown_drains_and_rejects() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let runner: Arc<dyn CompressionRunner> = Arc::new(move |_task: CompressionTask| {
            thread::sleep(Duration::from_millis(2));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let pool = WorkerPool::new(&PoolConfig::with_threads(2), runner);

        for i in 0..10 {
            pool.enqueue_compression(task(&format!("f{i}"))).unwrap();
        }
        let handle = pool.submit(|| "queued before shutdown").unwrap();
        pool.shutdown();

        assert_eq!(seen.load(Ordering::SeqCst), 10);
        assert_eq!(handle.wait().unwrap(), "queued before shutdown");
        assert!(pool.is_shutting_down());
        assert!(matches!(pool.submit(|| ()), Err(Error::PoolShutdown)));
        assert!(matches!(
            pool.enqueue_compression(task("late")),
            Err(Error::PoolShutdown)
        ));

        // second shutdown is a no-op
        pool.shutdown();
    }
}
