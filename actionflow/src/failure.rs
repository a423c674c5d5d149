//! Failure interception and control-flow redirection.
//!
//! When an action fails, the engine wraps the cause in a [`Failure`] and
//! dispatches it to the handler stack bound to that action, always on the
//! main context. The handler records a [`Decision`] by calling
//! [`Failure::retry`], [`Failure::jump_by`] or [`Failure::halt`]; recording
//! nothing is a silent halt.
//!
//! Handler stacks are a flat list of `(matcher, callback)` entries walked
//! front to back. A typed handler that does not match delegates to whatever
//! handler was active when it was installed; a failure that falls off the
//! end of the stack is unhandled.

use std::cell::Cell;
use std::fmt::{Debug, Display};
use std::sync::Arc;

/// The net effect of a failure handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Stop the chain; no success callback fires.
    Halt,
    /// Re-run the failing action with the same input it received.
    Retry,
    /// Resume at an absolute cursor position, carrying the input forward.
    JumpTo(isize),
}

/// A caught action failure, passed by reference to the bound handler.
///
/// The redirection methods only have an effect while the handler is
/// executing; the engine reads the recorded decision as soon as the handler
/// returns.
pub struct Failure {
    cause: anyhow::Error,
    index: usize,
    decision: Cell<Decision>,
}

impl Failure {
    pub(crate) fn new(cause: anyhow::Error, index: usize) -> Self {
        Self {
            cause,
            index,
            decision: Cell::new(Decision::Halt),
        }
    }

    /// The error the action raised.
    #[must_use]
    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Index of the failing action in the chain.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the cause is an `E`.
    #[must_use]
    pub fn is<E>(&self) -> bool
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        self.cause.is::<E>()
    }

    /// Borrows the cause as an `E`, if that is what was raised.
    #[must_use]
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        self.cause.downcast_ref::<E>()
    }

    /// Re-execute the failing action with the input it already received.
    pub fn retry(&self) {
        self.decision.set(Decision::Retry);
    }

    /// Move the cursor by `offset` relative to the failing action and
    /// resume there, without replaying anything in between.
    ///
    /// `jump_by(0)` is equivalent to [`Failure::retry`]. A target outside
    /// the chain halts the run with
    /// [`ChainError::JumpOutOfBounds`](crate::ChainError::JumpOutOfBounds).
    #[allow(clippy::cast_possible_wrap)]
    pub fn jump_by(&self, offset: isize) {
        self.decision.set(Decision::JumpTo(self.index as isize + offset));
    }

    /// Stop the chain. This is also the default when the handler records
    /// no decision.
    pub fn halt(&self) {
        self.decision.set(Decision::Halt);
    }

    pub(crate) fn decision(&self) -> Decision {
        self.decision.get()
    }

    pub(crate) fn into_cause(self) -> anyhow::Error {
        self.cause
    }
}

impl Debug for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Failure")
            .field("index", &self.index)
            .field("cause", &self.cause)
            .field("decision", &self.decision.get())
            .finish()
    }
}

/// A failure-handling callback.
pub type HandlerFn = Arc<dyn Fn(&Failure) + Send + Sync>;

type MatchFn = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

#[derive(Clone)]
struct HandlerEntry {
    /// `None` matches every failure.
    matcher: Option<MatchFn>,
    callback: HandlerFn,
}

/// The ordered handler entries bound to an action.
///
/// Installing a plain handler replaces the stack with a single catch-all
/// entry; installing a typed handler pushes a filtered entry in front of the
/// stack it was installed over.
#[derive(Clone)]
pub struct HandlerStack {
    entries: Vec<HandlerEntry>,
}

impl HandlerStack {
    /// A stack with one entry that matches every failure.
    #[must_use]
    pub fn catch_all(callback: HandlerFn) -> Self {
        Self {
            entries: vec![HandlerEntry {
                matcher: None,
                callback,
            }],
        }
    }

    /// A stack whose front entry only fires for causes of type `E`,
    /// delegating everything else to `fallback`.
    #[must_use]
    pub fn for_error<E>(callback: HandlerFn, fallback: Option<&Self>) -> Self
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        let mut entries = vec![HandlerEntry {
            matcher: Some(Arc::new(|cause: &anyhow::Error| cause.is::<E>())),
            callback,
        }];
        if let Some(previous) = fallback {
            entries.extend(previous.entries.iter().cloned());
        }
        Self { entries }
    }

    /// Number of entries in the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stack has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs the first matching entry. Returns `false` if no entry matched,
    /// in which case the failure is unhandled.
    pub(crate) fn dispatch(&self, failure: &Failure) -> bool {
        for entry in &self.entries {
            let matches = entry
                .matcher
                .as_ref()
                .map_or(true, |matcher| matcher(failure.cause()));
            if matches {
                (entry.callback)(failure);
                return true;
            }
        }
        false
    }
}

impl Debug for HandlerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HandlerStack({} entries)", self.entries.len())
    }
}
