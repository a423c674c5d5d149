//! Handles to in-flight chain runs.

use crate::errors::ChainError;
use crate::value::Value;
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use uuid::Uuid;

/// How a run ended: the final value, or how it halted.
pub type RunResult = Result<Value, ChainError>;

type Waiter = Box<dyn FnOnce(RunResult) + Send>;

enum HandleState {
    Pending(Vec<Waiter>),
    Done(RunResult),
}

struct HandleInner {
    run_id: Uuid,
    label: Arc<str>,
    state: Mutex<HandleState>,
}

/// A cloneable handle to a started run.
///
/// A handle can be awaited (it implements [`Future`]), inspected with
/// [`RunHandle::peek`], or fed into a join as a
/// [`JoinItem::Chain`](crate::JoinItem::Chain). All clones observe the same
/// single resolution.
#[derive(Clone)]
pub struct RunHandle {
    inner: Arc<HandleInner>,
}

impl RunHandle {
    pub(crate) fn new(run_id: Uuid, label: Arc<str>) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                run_id,
                label,
                state: Mutex::new(HandleState::Pending(Vec::new())),
            }),
        }
    }

    /// Unique id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.inner.run_id
    }

    /// Label of the chain this run was started from.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Whether the run has finished, successfully or not.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.inner.state.lock(), HandleState::Done(_))
    }

    /// The outcome, if the run has already finished.
    #[must_use]
    pub fn peek(&self) -> Option<RunResult> {
        match &*self.inner.state.lock() {
            HandleState::Done(result) => Some(result.clone()),
            HandleState::Pending(_) => None,
        }
    }

    /// Registers a callback for the run's outcome.
    ///
    /// Fires immediately (on the calling thread) if the run has already
    /// resolved; otherwise it fires wherever the run completes, which for
    /// successful runs is the main context.
    pub fn on_resolved<F>(&self, waiter: F)
    where
        F: FnOnce(RunResult) + Send + 'static,
    {
        let result = {
            let mut state = self.inner.state.lock();
            match &mut *state {
                HandleState::Pending(waiters) => {
                    waiters.push(Box::new(waiter));
                    return;
                }
                HandleState::Done(result) => result.clone(),
            }
        };
        waiter(result);
    }

    /// Resolves the handle exactly once and drains the waiters. A second
    /// resolution is ignored.
    pub(crate) fn complete(&self, result: RunResult) {
        let waiters = {
            let mut state = self.inner.state.lock();
            match &mut *state {
                HandleState::Done(_) => {
                    tracing::warn!(run_id = %self.inner.run_id, "run resolved twice; ignoring");
                    return;
                }
                HandleState::Pending(waiters) => {
                    let waiters = std::mem::take(waiters);
                    *state = HandleState::Done(result.clone());
                    waiters
                }
            }
        };
        for waiter in waiters {
            waiter(result.clone());
        }
    }
}

impl Future for RunHandle {
    type Output = RunResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.inner.state.lock();
        match &mut *state {
            HandleState::Done(result) => Poll::Ready(result.clone()),
            HandleState::Pending(waiters) => {
                let waker = cx.waker().clone();
                waiters.push(Box::new(move |_| waker.wake()));
                Poll::Pending
            }
        }
    }
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.inner.run_id)
            .field("label", &self.inner.label)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{downcast_ref, value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn handle() -> RunHandle {
        RunHandle::new(Uuid::new_v4(), Arc::from("test"))
    }

    #[test]
    fn test_waiter_registered_before_completion() {
        let h = handle();
        let hits = Arc::new(AtomicUsize::new(0));

        let seen = hits.clone();
        h.on_resolved(move |result| {
            assert_eq!(downcast_ref::<i32>(&result.unwrap()), Some(&5));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!h.is_resolved());
        h.complete(Ok(value(5_i32)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_waiter_registered_after_completion_fires_immediately() {
        let h = handle();
        h.complete(Ok(value(1_i32)));

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        h.on_resolved(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_completion_is_ignored() {
        let h = handle();
        h.complete(Ok(value(1_i32)));
        h.complete(Ok(value(2_i32)));

        let result = h.peek().and_then(Result::ok);
        assert_eq!(result.as_ref().and_then(downcast_ref::<i32>), Some(&1));
    }

    #[test]
    fn test_clones_observe_same_outcome() {
        let h = handle();
        let other = h.clone();
        h.complete(Err(ChainError::Halted { index: 0 }));
        assert!(matches!(
            other.peek(),
            Some(Err(ChainError::Halted { index: 0 }))
        ));
    }

    #[tokio::test]
    async fn test_handle_is_awaitable() {
        let h = handle();
        let awaited = h.clone();

        let task = tokio::spawn(async move { awaited.await });
        tokio::task::yield_now().await;
        h.complete(Ok(value(9_i32)));

        let result = task.await.unwrap().unwrap();
        assert_eq!(downcast_ref::<i32>(&result), Some(&9));
    }
}
