//! Bounded background worker pool.
//!
//! Workers pull boxed tasks off a shared queue. A worker retires after a
//! configurable number of tasks and spawns its own replacement, which keeps
//! any per-task allocation growth bounded over long uptimes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

/// A unit of background work.
pub type PoolTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Depth of the pending-task queue.
const QUEUE_DEPTH: usize = 1024;

/// Handle to the worker pool. Cloneable; dropping every handle closes the
/// queue and lets workers drain and exit.
#[derive(Clone)]
pub struct WorkerPool {
    tx: mpsc::Sender<PoolTask>,
}

impl WorkerPool {
    /// Start `concurrency` workers, each recycling after `recycle_after`
    /// tasks.
    pub fn start(concurrency: usize, recycle_after: usize) -> Self {
        let (tx, rx) = mpsc::channel::<PoolTask>(QUEUE_DEPTH);
        let rx = Arc::new(Mutex::new(rx));

        for id in 0..concurrency.max(1) {
            spawn_worker(id, rx.clone(), recycle_after.max(1));
        }

        info!(concurrency, recycle_after, "worker pool started");
        Self { tx }
    }

    /// Enqueue a task. Waits when the queue is full; errors only after the
    /// pool has shut down.
    pub async fn submit(&self, task: PoolTask) -> anyhow::Result<()> {
        self.tx
            .send(task)
            .await
            .map_err(|_| anyhow::anyhow!("worker pool is shut down"))
    }
}

fn spawn_worker(id: usize, rx: Arc<Mutex<mpsc::Receiver<PoolTask>>>, recycle_after: usize) {
    tokio::spawn(async move {
        debug!(worker_id = id, "worker started");
        let mut processed = 0usize;

        loop {
            // Hold the lock only while waiting for the next task.
            let task = {
                let mut guard = rx.lock().await;
                guard.recv().await
            };

            let Some(task) = task else {
                debug!(worker_id = id, processed, "queue closed, worker exiting");
                return;
            };

            task.await;
            processed += 1;

            if processed >= recycle_after {
                info!(worker_id = id, processed, "worker recycling");
                spawn_worker(id, rx, recycle_after);
                return;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn pool_runs_all_submitted_tasks() {
        let pool = WorkerPool::start(2, 50);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let counter = counter.clone();
            pool.submit(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();
        }

        // Tasks run on background workers; give them a moment.
        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) == 20 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn pool_survives_worker_recycling() {
        // recycle_after = 1 forces a respawn after every task
        let pool = WorkerPool::start(1, 1);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            let counter = counter.clone();
            pool.submit(Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .await
            .unwrap();
        }

        for _ in 0..50 {
            if counter.load(Ordering::SeqCst) == 5 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }
}
