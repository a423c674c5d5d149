//! Actions: the units of work a chain executes.
//!
//! An action takes one [`Value`] and either produces the next value, asks
//! the engine to wait on a join, or fails. Which execution context it runs
//! on is a property of the action fixed at append time, never inferred.

use crate::engine::RunHandle;
use crate::value::{self, Value};
use std::any::Any;
use std::sync::Arc;

/// The execution context an action is scheduled onto.
///
/// `Main` is the single, order-preserving context (failure handlers and
/// success callbacks always run there). `Worker` submissions may run
/// concurrently with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskContext {
    /// The coordinating, effectively single-threaded context.
    Main,
    /// The concurrent worker context.
    Worker,
}

impl TaskContext {
    /// Short name used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Worker => "worker",
        }
    }
}

/// The callable an action wraps.
pub type ActionFn = Arc<dyn Fn(Value) -> anyhow::Result<ActionResult> + Send + Sync>;

/// What an action hands back to the engine.
///
/// The join case is an explicit tagged variant rather than a runtime type
/// test on the returned value: an action that wants to wait on other work
/// says so in its return type.
pub enum ActionResult {
    /// The next value in the pipe.
    Value(Value),
    /// Wait until every item resolves, then continue with the aggregate.
    Join(Vec<JoinItem>),
}

impl ActionResult {
    /// Wraps a payload as the next value.
    pub fn value<T: Any + Send + Sync>(inner: T) -> Self {
        Self::Value(value::value(inner))
    }

    /// The unit result, for actions that are pure consumers.
    #[must_use]
    pub fn unit() -> Self {
        Self::Value(value::unit())
    }

    /// Passes an already-wrapped [`Value`] along unchanged.
    #[must_use]
    pub fn passthrough(inner: Value) -> Self {
        Self::Value(inner)
    }

    /// Requests a join over the given items.
    ///
    /// The aggregate delivered to the next action is a `Vec<Value>` in the
    /// order given here, regardless of resolution order.
    #[must_use]
    pub fn join(items: impl IntoIterator<Item = JoinItem>) -> Self {
        Self::Join(items.into_iter().collect())
    }
}

impl std::fmt::Debug for ActionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(_) => f.write_str("ActionResult::Value(..)"),
            Self::Join(items) => write!(f, "ActionResult::Join({} items)", items.len()),
        }
    }
}

/// One constituent of a join request.
pub enum JoinItem {
    /// A plain value; its slot resolves immediately.
    Ready(Value),
    /// An in-flight chain; its slot resolves when that chain completes.
    Chain(RunHandle),
}

impl JoinItem {
    /// Wraps a payload as an immediately-resolved item.
    pub fn ready<T: Any + Send + Sync>(inner: T) -> Self {
        Self::Ready(value::value(inner))
    }
}

impl From<RunHandle> for JoinItem {
    fn from(handle: RunHandle) -> Self {
        Self::Chain(handle)
    }
}

impl From<Value> for JoinItem {
    fn from(inner: Value) -> Self {
        Self::Ready(inner)
    }
}

impl std::fmt::Debug for JoinItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(_) => f.write_str("JoinItem::Ready(..)"),
            Self::Chain(handle) => write!(f, "JoinItem::Chain({})", handle.run_id()),
        }
    }
}
