//! Error types for the AST crate.
//!
//! This module defines structured errors for arena lookups and the few
//! in-place rewrites the front end performs after construction.

use thiserror::Error;

use crate::nodes::NodeId;

/// Errors that can occur while navigating or rewriting the arena.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[must_use = "errors must not be silently ignored"]
pub enum AstError {
    /// No node with this id was ever added to the arena.
    #[error("node {id} does not exist in the arena")]
    NodeNotFound { id: NodeId },

    /// The node to replace is not held in any child slot of the given parent.
    #[error("node {child} is not a child of node {parent}")]
    NotAChild { parent: NodeId, child: NodeId },

    /// Replacement nodes must be constructed with the parent they are placed under.
    #[error("node {node} was built for parent {actual:?}, cannot place it under {expected}")]
    ParentMismatch {
        node: NodeId,
        expected: NodeId,
        actual: Option<NodeId>,
    },

    /// The operation requires a constructor definition.
    #[error("node {id} is not a constructor definition")]
    NotAConstructor { id: NodeId },
}
