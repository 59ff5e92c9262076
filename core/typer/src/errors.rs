use std::fmt::{self, Display, Formatter};

use duby_ast::errors::AstError;
use duby_ast::nodes::{Location, NodeId};
use thiserror::Error;

use crate::type_info::TypeInfo;

/// Context for type mismatch errors to provide better messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMismatchContext {
    MethodReturn { method_name: String },
    Branches,
    DefaultValue { argument_name: String },
}

impl Display for TypeMismatchContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeMismatchContext::MethodReturn { method_name } => {
                write!(f, "in return type of method `{method_name}`")
            }
            TypeMismatchContext::Branches => write!(f, "between branches of `if`"),
            TypeMismatchContext::DefaultValue { argument_name } => {
                write!(f, "in default value of argument `{argument_name}`")
            }
        }
    }
}

/// A node still waiting for its type when inference gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedNode {
    pub id: NodeId,
    pub description: String,
    pub location: Location,
}

impl Display for UnresolvedNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {} (id: {})", self.description, self.location, self.id)
    }
}

fn format_unresolved(nodes: &[UnresolvedNode]) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Error)]
pub enum TypeCheckError {
    #[error("{location}: type mismatch {context}: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        expected: TypeInfo,
        found: TypeInfo,
        context: TypeMismatchContext,
        location: Location,
    },

    #[error("{location}: unknown type `{name}`")]
    UnknownType { name: String, location: Location },

    #[error("{location}: local `{name}` already has type `{existing}`, cannot bind `{found}`")]
    ConflictingLocalType {
        name: String,
        existing: TypeInfo,
        found: TypeInfo,
        location: Location,
    },

    #[error(
        "{location}: method `{class}.{name}` already returns `{existing}`, cannot also return `{found}`"
    )]
    ConflictingMethodType {
        class: TypeInfo,
        name: String,
        existing: TypeInfo,
        found: TypeInfo,
        location: Location,
    },

    #[error("{location}: ambiguous call to `{type_name}.{method_name}` with arguments ({arguments})")]
    AmbiguousMethod {
        type_name: String,
        method_name: String,
        arguments: String,
        location: Location,
    },

    /// The worklist stopped making progress. Lists every node still pending.
    #[error("could not infer types for {}", format_unresolved(unresolved))]
    CannotInfer { unresolved: Vec<UnresolvedNode> },

    #[error("inference did not reach a fixpoint within {limit} passes")]
    PassLimitExceeded { limit: usize },

    /// A broken tree or an internal bookkeeping bug; never a user error.
    #[error("internal typer error: {message}")]
    InvariantViolation { message: String },
}

impl From<AstError> for TypeCheckError {
    fn from(error: AstError) -> Self {
        TypeCheckError::InvariantViolation {
            message: error.to_string(),
        }
    }
}

impl TypeCheckError {
    /// Returns the source location associated with this error, if it has one.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            TypeCheckError::TypeMismatch { location, .. }
            | TypeCheckError::UnknownType { location, .. }
            | TypeCheckError::ConflictingLocalType { location, .. }
            | TypeCheckError::ConflictingMethodType { location, .. }
            | TypeCheckError::AmbiguousMethod { location, .. } => Some(location),
            TypeCheckError::CannotInfer { unresolved } => {
                unresolved.first().map(|node| &node.location)
            }
            TypeCheckError::PassLimitExceeded { .. }
            | TypeCheckError::InvariantViolation { .. } => None,
        }
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        TypeCheckError::InvariantViolation {
            message: message.into(),
        }
    }
}
