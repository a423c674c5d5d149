//! The execution engine.
//!
//! One [`ChainRun`] exists per `start()`; it walks the frozen snapshot
//! cursor-by-cursor, hopping execution contexts as each link requires. The
//! engine never holds a thread: every transition is a scheduler submission,
//! and the cursor and carried input travel through the submitted jobs, so
//! they have a single logical owner at any instant.

mod handle;
mod join;
mod tracker;

pub use handle::{RunHandle, RunResult};
pub use tracker::{RunInfo, RunTracker};


use crate::action::{ActionResult, JoinItem};
use crate::chain::ChainSpec;
use crate::errors::ChainError;
use crate::failure::{Decision, Failure};
use crate::scheduler::Scheduler;
use crate::value::{self, Value};
use join::JoinBarrier;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Terminal success callback, invoked on the main context with the final
/// carried value.
pub type SuccessFn = Box<dyn FnOnce(Value) + Send>;

/// A single execution of a [`ChainSpec`].
///
/// Runs are independent: each has its own cursor, carried input, and
/// handle, and shares nothing mutable with the builder it came from or
/// with other runs of the same snapshot.
pub struct ChainRun {
    spec: ChainSpec,
    scheduler: Arc<dyn Scheduler>,
    tracker: Arc<RunTracker>,
    handle: RunHandle,
    run_id: Uuid,
    on_success: Mutex<Option<SuccessFn>>,
}

impl ChainRun {
    /// Starts executing `spec` at cursor 0 with the unit input and returns
    /// immediately with a handle to the in-flight run.
    ///
    /// An empty snapshot completes straight away: the success callback
    /// receives the unit value on the main context.
    pub fn launch(
        spec: ChainSpec,
        scheduler: Arc<dyn Scheduler>,
        tracker: Arc<RunTracker>,
        on_success: Option<SuccessFn>,
    ) -> RunHandle {
        let run_id = Uuid::new_v4();
        let handle = RunHandle::new(run_id, Arc::from(spec.label()));
        tracker.register(RunInfo {
            run_id,
            label: spec.label().to_string(),
            steps: spec.len(),
            started_at: crate::utils::iso_timestamp(),
        });
        tracing::debug!(
            run_id = %run_id,
            label = spec.label(),
            steps = spec.len(),
            "chain run started"
        );

        let run = Arc::new(Self {
            spec,
            scheduler,
            tracker,
            handle: handle.clone(),
            run_id,
            on_success: Mutex::new(on_success),
        });
        run.advance(0, value::unit());
        handle
    }

    /// Submits the link at `cursor` to its context, or finishes the run if
    /// the cursor is past the end.
    fn advance(self: &Arc<Self>, cursor: usize, input: Value) {
        if cursor >= self.spec.len() {
            self.finish(input);
            return;
        }

        let link = self.spec.link(cursor).clone();
        let context = link.context();
        let run = Arc::clone(self);
        self.scheduler.submit(
            context,
            Box::new(move || {
                tracing::trace!(
                    run_id = %run.run_id,
                    index = cursor,
                    context = context.as_str(),
                    "running action"
                );
                match (link.action())(input.clone()) {
                    Ok(ActionResult::Value(output)) => run.advance(cursor + 1, output),
                    Ok(ActionResult::Join(items)) => run.join(cursor, input, items),
                    Err(cause) => run.dispatch_failure(cursor, input, cause),
                }
            }),
        );
    }

    /// Arms a barrier over the join items returned by the action at
    /// `cursor`. The aggregate becomes the next action's input; the first
    /// constituent halt becomes a failure of the joining action, carrying
    /// `input` so a retry re-evaluates the whole join.
    fn join(self: &Arc<Self>, cursor: usize, input: Value, items: Vec<JoinItem>) {
        if items.is_empty() {
            self.advance(cursor + 1, value::value(Vec::<Value>::new()));
            return;
        }

        tracing::trace!(
            run_id = %self.run_id,
            index = cursor,
            width = items.len(),
            "arming join barrier"
        );
        let run = Arc::clone(self);
        let barrier = JoinBarrier::new(items.len(), move |settled| match settled {
            Ok(values) => run.advance(cursor + 1, value::value(values)),
            Err(reason) => run.dispatch_failure(cursor, input, anyhow::Error::new(reason)),
        });

        for (slot, item) in items.into_iter().enumerate() {
            match item {
                JoinItem::Ready(ready) => barrier.resolve(slot, ready),
                JoinItem::Chain(handle) => {
                    let barrier = Arc::clone(&barrier);
                    handle.on_resolved(move |result| match result {
                        Ok(resolved) => barrier.resolve(slot, resolved),
                        Err(reason) => barrier.fail(slot, reason),
                    });
                }
            }
        }
    }

    /// Routes a failure to the handler stack bound at `cursor`, on the
    /// main context, and applies the recorded decision.
    fn dispatch_failure(self: &Arc<Self>, cursor: usize, input: Value, cause: anyhow::Error) {
        let run = Arc::clone(self);
        self.scheduler.submit_main(Box::new(move || {
            tracing::debug!(
                run_id = %run.run_id,
                index = cursor,
                cause = %cause,
                "action failed"
            );

            let stack = run.spec.link(cursor).handlers().cloned();
            let failure = Failure::new(cause, cursor);
            let handled = stack.is_some_and(|stack| stack.dispatch(&failure));

            if !handled {
                let index = failure.index();
                let cause = failure.into_cause();
                tracing::error!(
                    run_id = %run.run_id,
                    index,
                    cause = ?cause,
                    "unhandled failure; halting chain"
                );
                run.halt(ChainError::Unhandled {
                    index,
                    cause: Arc::new(cause),
                });
                return;
            }

            match failure.decision() {
                Decision::Halt => {
                    tracing::debug!(run_id = %run.run_id, index = cursor, "handler halted chain");
                    run.halt(ChainError::Halted { index: cursor });
                }
                Decision::Retry => run.advance(cursor, input),
                Decision::JumpTo(target) => run.apply_jump(target, input),
            }
        }));
    }

    #[allow(clippy::cast_sign_loss)]
    fn apply_jump(self: &Arc<Self>, target: isize, input: Value) {
        let len = self.spec.len();
        if target >= 0 && (target as usize) < len {
            tracing::debug!(run_id = %self.run_id, target, "resuming after jump");
            self.advance(target as usize, input);
        } else {
            tracing::warn!(
                run_id = %self.run_id,
                target,
                len,
                "jump out of bounds; halting chain"
            );
            self.halt(ChainError::JumpOutOfBounds { target, len });
        }
    }

    /// Delivers the final value on the main context: first the success
    /// callback, then the handle (and with it any join waiters).
    fn finish(self: &Arc<Self>, output: Value) {
        let run = Arc::clone(self);
        self.scheduler.submit_main(Box::new(move || {
            tracing::debug!(run_id = %run.run_id, "chain run completed");
            run.tracker.unregister(run.run_id);
            if let Some(on_success) = run.on_success.lock().take() {
                on_success(output.clone());
            }
            run.handle.complete(Ok(output));
        }));
    }

    /// Terminates the run without a success callback. Only the handle is
    /// resolved, so joiners and awaiters learn how the run ended.
    fn halt(self: &Arc<Self>, error: ChainError) {
        self.tracker.unregister(self.run_id);
        self.handle.complete(Err(error));
    }
}

impl std::fmt::Debug for ChainRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainRun")
            .field("run_id", &self.run_id)
            .field("label", &self.spec.label())
            .field("steps", &self.spec.len())
            .finish()
    }
}
