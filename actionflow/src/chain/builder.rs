//! The mutable chain-building surface.

use super::{ChainSpec, LinkSpec};
use crate::action::{ActionResult, TaskContext};
use crate::engine::{ChainRun, RunHandle, RunTracker};
use crate::failure::{Failure, HandlerFn, HandlerStack};
use crate::value::{self, Value};
use std::any::Any;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// Accumulates actions and failure handlers, then starts runs from frozen
/// snapshots.
///
/// The builder stays mutable and reusable: `start()` copies the current
/// sequence into a [`ChainSpec`], so it can be cleared and refilled while
/// earlier runs are still in flight. Every action appended after a call to
/// [`ChainBuilder::on_failure`] (or [`ChainBuilder::on_failure_for`]) is
/// bound to that handler stack.
///
/// ```rust,ignore
/// let mut chain = ChainBuilder::new("fetch-user", scheduler);
/// chain
///     .on_failure(|f| f.retry())
///     .produce(TaskContext::Worker, || load_user(7))
///     .map(TaskContext::Main, |user: &User| Ok(render(user)));
/// let handle = chain.start(|v| println!("done"));
/// ```
pub struct ChainBuilder {
    label: String,
    scheduler: Arc<dyn crate::scheduler::Scheduler>,
    links: Vec<LinkSpec>,
    current_handlers: Option<Arc<HandlerStack>>,
    tracker: Arc<RunTracker>,
}

impl ChainBuilder {
    /// Creates an empty builder that schedules through `scheduler`.
    #[must_use]
    pub fn new(label: impl Into<String>, scheduler: Arc<dyn crate::scheduler::Scheduler>) -> Self {
        Self {
            label: label.into(),
            scheduler,
            links: Vec::new(),
            current_handlers: None,
            tracker: Arc::new(RunTracker::new()),
        }
    }

    /// Appends a raw action bound to `context`.
    pub fn then<F>(&mut self, context: TaskContext, action: F) -> &mut Self
    where
        F: Fn(Value) -> anyhow::Result<ActionResult> + Send + Sync + 'static,
    {
        self.links.push(LinkSpec::new(
            Arc::new(action),
            context,
            self.current_handlers.clone(),
        ));
        self
    }

    /// Appends an action that transforms a typed input into a typed output.
    ///
    /// The input is borrowed from the carried value; a run whose carried
    /// value is not an `I` fails the action, which routes to its handler
    /// stack like any other failure.
    pub fn map<I, O, F>(&mut self, context: TaskContext, action: F) -> &mut Self
    where
        I: Any + Send + Sync,
        O: Any + Send + Sync,
        F: Fn(&I) -> anyhow::Result<O> + Send + Sync + 'static,
    {
        self.then(context, move |input| {
            let input = expect_input::<I>(&input)?;
            Ok(ActionResult::value(action(input)?))
        })
    }

    /// Appends an action that ignores its input and produces a value.
    pub fn produce<O, F>(&mut self, context: TaskContext, action: F) -> &mut Self
    where
        O: Any + Send + Sync,
        F: Fn() -> anyhow::Result<O> + Send + Sync + 'static,
    {
        self.then(context, move |_| Ok(ActionResult::value(action()?)))
    }

    /// Appends an action that consumes a typed input and passes the unit
    /// value on.
    pub fn consume<I, F>(&mut self, context: TaskContext, action: F) -> &mut Self
    where
        I: Any + Send + Sync,
        F: Fn(&I) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.then(context, move |input| {
            action(expect_input::<I>(&input)?)?;
            Ok(ActionResult::unit())
        })
    }

    /// Installs `handler` for every action appended from here on,
    /// replacing the current handler stack.
    pub fn on_failure<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        self.current_handlers = Some(Arc::new(HandlerStack::catch_all(as_handler(handler))));
        self
    }

    /// Installs `handler` for failures whose cause is an `E`; any other
    /// failure delegates to the handler that was current before this call
    /// (or is unhandled if there was none).
    pub fn on_failure_for<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: Display + Debug + Send + Sync + 'static,
        F: Fn(&Failure) + Send + Sync + 'static,
    {
        let stack =
            HandlerStack::for_error::<E>(as_handler(handler), self.current_handlers.as_deref());
        self.current_handlers = Some(Arc::new(stack));
        self
    }

    /// Removes all accumulated actions and the current handler stack.
    ///
    /// Runs already started from this builder are unaffected.
    pub fn clear(&mut self) -> &mut Self {
        self.links.clear();
        self.current_handlers = None;
        self
    }

    /// Number of actions accumulated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the builder holds no actions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The tracker all runs started from this builder register with.
    #[must_use]
    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    /// Freezes the current sequence into an immutable snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ChainSpec {
        ChainSpec::new(self.label.clone(), self.links.clone())
    }

    /// Snapshots the builder and starts a run, delivering the final value
    /// to `on_success` on the main context.
    ///
    /// Returns immediately with a handle to the in-flight run, which can be
    /// awaited, inspected, or joined into another chain.
    pub fn start<F>(&self, on_success: F) -> RunHandle
    where
        F: FnOnce(Value) + Send + 'static,
    {
        ChainRun::launch(
            self.snapshot(),
            self.scheduler.clone(),
            self.tracker.clone(),
            Some(Box::new(on_success)),
        )
    }

    /// Starts a run without a success callback. The outcome is still
    /// observable through the returned handle.
    pub fn start_detached(&self) -> RunHandle {
        ChainRun::launch(
            self.snapshot(),
            self.scheduler.clone(),
            self.tracker.clone(),
            None,
        )
    }
}

impl Debug for ChainBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("label", &self.label)
            .field("links", &self.links.len())
            .field("has_handlers", &self.current_handlers.is_some())
            .finish()
    }
}

fn as_handler<F>(handler: F) -> HandlerFn
where
    F: Fn(&Failure) + Send + Sync + 'static,
{
    Arc::new(handler)
}

fn expect_input<I: Any + Send + Sync>(input: &Value) -> anyhow::Result<&I> {
    value::downcast_ref::<I>(input).ok_or_else(|| {
        anyhow::anyhow!(
            "carried value is not a {}",
            std::any::type_name::<I>()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InlineScheduler;

    fn builder() -> ChainBuilder {
        ChainBuilder::new("test", Arc::new(InlineScheduler::new()))
    }

    #[test]
    fn test_append_counts_links() {
        let mut chain = builder();
        chain
            .produce(TaskContext::Worker, || Ok(1_i32))
            .map(TaskContext::Main, |n: &i32| Ok(n + 1));
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn test_handler_binds_to_later_links_only() {
        let mut chain = builder();
        chain.produce(TaskContext::Main, || Ok(()));
        chain.on_failure(|f| f.retry());
        chain.produce(TaskContext::Main, || Ok(()));

        let spec = chain.snapshot();
        assert!(!spec.link(0).has_handlers());
        assert!(spec.link(1).has_handlers());
    }

    #[test]
    fn test_clear_resets_links_and_handlers() {
        let mut chain = builder();
        chain.on_failure(|f| f.halt());
        chain.produce(TaskContext::Main, || Ok(()));
        chain.clear();
        assert!(chain.is_empty());

        chain.produce(TaskContext::Main, || Ok(()));
        assert!(!chain.snapshot().link(0).has_handlers());
    }

    #[test]
    fn test_snapshot_is_isolated_from_builder() {
        let mut chain = builder();
        chain.produce(TaskContext::Main, || Ok(1_i32));
        let spec = chain.snapshot();
        chain.clear();
        assert_eq!(spec.len(), 1);
        assert!(chain.is_empty());
    }
}
