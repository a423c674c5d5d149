//! Error types for chain execution.
//!
//! Action failures themselves are arbitrary caller errors (`anyhow::Error`)
//! and never surface here directly; this taxonomy covers the ways a run can
//! terminate without reaching its success callback. All variants are
//! `Clone`: one outcome may reach several handle waiters.

use std::sync::Arc;
use thiserror::Error;

/// The ways a chain run can halt instead of completing.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// An action failed and no handler in its stack matched the cause.
    #[error("action {index} failed with no matching handler: {cause}")]
    Unhandled {
        /// Index of the failing action.
        index: usize,
        /// The root failure, as raised by the action.
        cause: Arc<anyhow::Error>,
    },

    /// The handler for a failing action halted the chain, either explicitly
    /// or by recording no decision at all.
    #[error("chain halted by the handler for action {index}")]
    Halted {
        /// Index of the failing action.
        index: usize,
    },

    /// A handler jumped to a cursor position outside the chain.
    #[error("jump to {target} is outside the chain of {len} actions")]
    JumpOutOfBounds {
        /// The requested absolute cursor position.
        target: isize,
        /// Number of actions in the chain.
        len: usize,
    },

    /// A chain joined by a barrier halted, so its slot can never resolve.
    #[error("joined chain in slot {slot} halted: {reason}")]
    JoinedChainHalted {
        /// Position of the halted chain in the join's input list.
        slot: usize,
        /// How the joined chain halted.
        reason: Arc<ChainError>,
    },
}

impl ChainError {
    /// Index of the action this error is attributed to, where one exists.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Unhandled { index, .. } | Self::Halted { index } => Some(*index),
            Self::JumpOutOfBounds { .. } | Self::JoinedChainHalted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unhandled_display_includes_cause() {
        let err = ChainError::Unhandled {
            index: 2,
            cause: Arc::new(anyhow::anyhow!("disk on fire")),
        };
        let msg = err.to_string();
        assert!(msg.contains("action 2"));
        assert!(msg.contains("disk on fire"));
    }

    #[test]
    fn test_jump_out_of_bounds_display() {
        let err = ChainError::JumpOutOfBounds { target: -3, len: 5 };
        assert!(err.to_string().contains("-3"));
        assert!(err.to_string().contains("5 actions"));
    }

    #[test]
    fn test_joined_chain_halted_wraps_reason() {
        let inner = ChainError::Halted { index: 0 };
        let err = ChainError::JoinedChainHalted {
            slot: 1,
            reason: Arc::new(inner),
        };
        assert!(err.to_string().contains("slot 1"));
        assert!(err.to_string().contains("handler for action 0"));
    }

    #[test]
    fn test_index_attribution() {
        assert_eq!(ChainError::Halted { index: 4 }.index(), Some(4));
        assert_eq!(
            ChainError::JumpOutOfBounds { target: 9, len: 3 }.index(),
            None
        );
    }
}
