//! Execution-context scheduling.
//!
//! The engine relies on exactly two concurrency primitives: "run this on
//! the main context" and "run this on the worker context". Both are
//! fire-and-forget; the only guarantee a [`Scheduler`] must give is that a
//! submitted job eventually runs (unless the scheduler itself is torn
//! down), and that main-context jobs run one at a time, in submission
//! order.

mod runtime;

pub use runtime::TokioScheduler;

use crate::action::TaskContext;

/// A unit of work submitted to a context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The two-context submission seam the engine schedules through.
pub trait Scheduler: Send + Sync {
    /// Submits a job to the main context. Main jobs are delivered in
    /// submission order and never run concurrently with each other.
    fn submit_main(&self, job: Job);

    /// Submits a job to the worker context. Worker jobs may run
    /// concurrently with each other and with the main context.
    fn submit_worker(&self, job: Job);

    /// Submits a job to the given context.
    fn submit(&self, context: TaskContext, job: Job) {
        match context {
            TaskContext::Main => self.submit_main(job),
            TaskContext::Worker => self.submit_worker(job),
        }
    }
}
