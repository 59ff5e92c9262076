//! Macro expansion seam.
//!
//! When a call cannot be resolved to a method, the typer offers it to a
//! [`MacroExpander`]. An expander that recognizes the call builds a
//! replacement subtree in the arena. The typer splices it into the call's
//! slot and infers it in place of the call. The call node keeps the
//! expansion's type.

use duby_ast::arena::Arena;
use duby_ast::nodes::NodeId;

use crate::type_info::TypeInfo;

pub trait MacroExpander {
    /// Expands the call node `call` made on `receiver`.
    ///
    /// The returned root must be built with the call's parent as its
    /// parent. Return `None` when no macro applies; the call then waits for
    /// a method to be learned.
    fn expand(&mut self, arena: &mut Arena, call: NodeId, receiver: &TypeInfo) -> Option<NodeId>;
}

/// Expander that knows no macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMacros;

impl MacroExpander for NoMacros {
    fn expand(&mut self, _: &mut Arena, _: NodeId, _: &TypeInfo) -> Option<NodeId> {
        None
    }
}

impl<F> MacroExpander for F
where
    F: FnMut(&mut Arena, NodeId, &TypeInfo) -> Option<NodeId>,
{
    fn expand(&mut self, arena: &mut Arena, call: NodeId, receiver: &TypeInfo) -> Option<NodeId> {
        self(arena, call, receiver)
    }
}
