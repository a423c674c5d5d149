//! # Actionflow
//!
//! A chain-of-actions pipeline engine.
//!
//! Actionflow lets a caller compose a linear sequence of actions, each
//! explicitly scheduled onto one of two execution contexts — a single
//! ordered "main" context (e.g. a UI thread) and a concurrent worker
//! context — with:
//!
//! - **Failure redirection**: installable handlers intercept any action
//!   failure on the main context and may retry the action in place or jump
//!   the cursor by a relative offset, forward or backward
//! - **Snapshot isolation**: `start()` freezes the builder's accumulated
//!   actions into an immutable spec, so the builder stays mutable and
//!   reusable while runs are in flight
//! - **Join barriers**: an action can wait on a mix of plain values and
//!   other in-flight chains, receiving the aggregate in input order
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actionflow::prelude::*;
//!
//! let scheduler = Arc::new(TokioScheduler::new());
//! let mut chain = ChainBuilder::new("thumbnail", scheduler);
//! chain
//!     .on_failure(|f| f.retry())
//!     .produce(TaskContext::Worker, || fetch_image())
//!     .map(TaskContext::Worker, |img: &Image| Ok(scale(img)))
//!     .consume(TaskContext::Main, |thumb: &Image| Ok(show(thumb)));
//!
//! let handle = chain.start(|_| println!("rendered"));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod action;
pub mod chain;
pub mod engine;
pub mod errors;
pub mod failure;
pub mod observability;
pub mod scheduler;
pub mod testing;
pub mod utils;
pub mod value;

pub use action::{ActionFn, ActionResult, JoinItem, TaskContext};
pub use chain::{ChainBuilder, ChainSpec, LinkSpec};
pub use engine::{ChainRun, RunHandle, RunInfo, RunResult, RunTracker, SuccessFn};
pub use errors::ChainError;
pub use failure::{Decision, Failure, HandlerFn, HandlerStack};
pub use scheduler::{Job, Scheduler, TokioScheduler};
pub use value::Value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::{ActionResult, JoinItem, TaskContext};
    pub use crate::chain::{ChainBuilder, ChainSpec};
    pub use crate::engine::{RunHandle, RunResult, RunTracker};
    pub use crate::errors::ChainError;
    pub use crate::failure::{Decision, Failure};
    pub use crate::scheduler::{Job, Scheduler, TokioScheduler};
    pub use crate::value::{downcast_ref, unit, value, Value};
}
