//! Tokio-backed scheduler.

use super::{Job, Scheduler};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// A [`Scheduler`] backed by a tokio runtime.
///
/// The main context is a single spawned task draining an unbounded queue,
/// which makes it effectively single-threaded with ordered delivery. Worker
/// jobs go to the runtime's blocking pool, so how many run concurrently is
/// a runtime deployment concern, not an engine concern.
pub struct TokioScheduler {
    main_tx: mpsc::UnboundedSender<Job>,
    runtime: Handle,
}

impl TokioScheduler {
    /// Creates a scheduler on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use
    /// [`TokioScheduler::with_handle`] from non-async code.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Creates a scheduler on the given runtime handle.
    #[must_use]
    pub fn with_handle(runtime: Handle) -> Self {
        let (main_tx, mut main_rx) = mpsc::unbounded_channel::<Job>();
        runtime.spawn(async move {
            while let Some(job) = main_rx.recv().await {
                job();
            }
            tracing::debug!("main context queue closed; drain task exiting");
        });
        Self { main_tx, runtime }
    }
}

impl Scheduler for TokioScheduler {
    fn submit_main(&self, job: Job) {
        if self.main_tx.send(job).is_err() {
            tracing::warn!("main context is gone; dropping job");
        }
    }

    fn submit_worker(&self, job: Job) {
        let _handle = self.runtime.spawn_blocking(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_main_jobs_run_in_submission_order() {
        let scheduler = TokioScheduler::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (done_tx, done_rx) = oneshot::channel();

        for i in 0..10 {
            let order = order.clone();
            scheduler.submit_main(Box::new(move || {
                order.lock().push(i);
            }));
        }
        scheduler.submit_main(Box::new(move || {
            let _ = done_tx.send(());
        }));

        done_rx.await.unwrap();
        assert_eq!(*order.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_worker_jobs_all_run() {
        let scheduler = TokioScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let (done_tx, done_rx) = oneshot::channel();
        let done_tx = Arc::new(parking_lot::Mutex::new(Some(done_tx)));

        for _ in 0..8 {
            let count = count.clone();
            let done_tx = done_tx.clone();
            scheduler.submit_worker(Box::new(move || {
                if count.fetch_add(1, Ordering::SeqCst) == 7 {
                    if let Some(tx) = done_tx.lock().take() {
                        let _ = tx.send(());
                    }
                }
            }));
        }

        done_rx.await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_worker_can_submit_back_to_main() {
        let scheduler = Arc::new(TokioScheduler::new());
        let (done_tx, done_rx) = oneshot::channel();

        let inner = scheduler.clone();
        scheduler.submit_worker(Box::new(move || {
            inner.submit_main(Box::new(move || {
                let _ = done_tx.send("from main");
            }));
        }));

        assert_eq!(done_rx.await.unwrap(), "from main");
    }
}
