//! Immutable chain snapshots.

use crate::action::{ActionFn, TaskContext};
use crate::failure::HandlerStack;
use std::sync::Arc;

/// One action paired with its context and the handler stack that was in
/// effect when it was appended.
#[derive(Clone)]
pub struct LinkSpec {
    action: ActionFn,
    context: TaskContext,
    handlers: Option<Arc<HandlerStack>>,
}

impl LinkSpec {
    /// Creates a link.
    #[must_use]
    pub fn new(
        action: ActionFn,
        context: TaskContext,
        handlers: Option<Arc<HandlerStack>>,
    ) -> Self {
        Self {
            action,
            context,
            handlers,
        }
    }

    /// The context this link is scheduled onto.
    #[must_use]
    pub fn context(&self) -> TaskContext {
        self.context
    }

    /// Whether a handler stack is bound to this link.
    #[must_use]
    pub fn has_handlers(&self) -> bool {
        self.handlers.is_some()
    }

    pub(crate) fn action(&self) -> &ActionFn {
        &self.action
    }

    pub(crate) fn handlers(&self) -> Option<&Arc<HandlerStack>> {
        self.handlers.as_ref()
    }
}

impl std::fmt::Debug for LinkSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSpec")
            .field("context", &self.context)
            .field("handlers", &self.handlers.is_some())
            .finish()
    }
}

/// The frozen, ordered sequence of links a run executes.
///
/// Taking a snapshot copies the builder's accumulated links, so clearing or
/// extending the builder afterwards never affects a started run.
#[derive(Clone)]
pub struct ChainSpec {
    label: Arc<str>,
    links: Arc<[LinkSpec]>,
}

impl ChainSpec {
    /// Freezes a sequence of links under a label.
    #[must_use]
    pub fn new(label: impl Into<String>, links: Vec<LinkSpec>) -> Self {
        Self {
            label: label.into().into(),
            links: links.into(),
        }
    }

    /// The builder-assigned label, used in logs and run tracking.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the chain has no links.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub(crate) fn link(&self, index: usize) -> &LinkSpec {
        &self.links[index]
    }
}

impl std::fmt::Debug for ChainSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainSpec")
            .field("label", &self.label)
            .field("links", &self.links.len())
            .finish()
    }
}
