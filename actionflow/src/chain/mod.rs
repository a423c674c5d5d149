//! Chain building and snapshotting.
//!
//! This module provides:
//! - The mutable, reusable [`ChainBuilder`] surface
//! - The immutable [`ChainSpec`] snapshot the engine consumes

mod builder;
mod spec;

pub use builder::ChainBuilder;
pub use spec::{ChainSpec, LinkSpec};
