#![warn(clippy::pedantic)]
//! Type inference for Duby
//!
//! This crate infers the static types of a Duby program: a Ruby-syntax
//! language compiled to the JVM in which almost nothing is annotated.
//! Locals, method return types and often parameter types are all inferred.
//!
//! ## How inference proceeds
//!
//! Every node is inferred on demand through [`typer::Typer::infer`]. A node
//! whose dependencies are not known yet (a method called before its
//! definition resolved, a local not bound yet) is *deferred* rather than
//! rejected. Once the first traversal is over, the driver re-infers the
//! deferred nodes pass after pass. Each resolved node can teach the
//! tables something new (a local's type, a method's return type), which
//! unblocks others. Inference ends when the worklist is empty, or fails
//! when a pass makes no progress at all.
//!
//! Facts are monotonic: a local binding or a method type, once learned,
//! can only be confirmed, never changed. A conflicting fact is an error.
//!
//! ## Quick Start
//!
//! ```ignore
//! use duby_ast::arena::Arena;
//! use duby_typer::TyperBuilder;
//!
//! let arena: Arena = build_program();
//! let typed_context = TyperBuilder::new()
//!     .build_typed_context(arena)?
//!     .typed_context();
//!
//! if let Some(type_info) = typed_context.get_node_typeinfo(node_id) {
//!     println!("Node {} has type: {}", node_id, type_info);
//! }
//! ```
//!
//! ## Public Modules
//!
//! - [`config`] - `[typer]` settings read from TOML
//! - [`errors`] - error types with source locations
//! - [`macros`] - the macro expansion seam
//! - [`scope_chain`] - local bindings per scope node
//! - [`signature_table`] - declared signatures and learned method types
//! - [`type_info`] - the JVM-flavoured type model
//! - [`type_lookup`] - the type catalog contract and its in-memory implementation
//! - [`typed_context`] - inference results handed to later stages
//! - [`typer`] - the inference engine

use duby_ast::arena::Arena;

use crate::config::TyperConfig;
use crate::macros::{MacroExpander, NoMacros};
use crate::type_lookup::{ClassCatalog, TypeLookup};
use crate::typed_context::TypedContext;
use crate::typer::Typer;

pub mod config;
pub mod errors;
pub mod macros;
mod method;
pub mod scope_chain;
pub mod signature_table;
pub mod type_info;
pub mod type_lookup;
pub mod typed_context;
pub mod typer;

/// Builder state before inference has run.
pub struct TyperInitState {
    config: TyperConfig,
    lookup: Box<dyn TypeLookup>,
    macros: Box<dyn MacroExpander>,
}

/// Builder state once inference completed.
pub struct TyperCompleteState {
    typed_context: TypedContext,
}

/// Type alias for a completed builder ready to yield its context.
pub type CompletedTyperBuilder = TyperBuilder<TyperCompleteState>;

/// Builder for running inference on an AST arena.
///
/// Uses the typestate pattern so the typed context can only be taken once
/// inference has succeeded.
pub struct TyperBuilder<S> {
    state: S,
}

impl Default for TyperBuilder<TyperInitState> {
    fn default() -> Self {
        TyperBuilder::new()
    }
}

impl TyperBuilder<TyperInitState> {
    #[must_use]
    pub fn new() -> Self {
        TyperBuilder {
            state: TyperInitState {
                config: TyperConfig::default(),
                lookup: Box::new(ClassCatalog::new()),
                macros: Box::new(NoMacros),
            },
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: TyperConfig) -> Self {
        self.state.config = config;
        self
    }

    /// Replaces the default [`ClassCatalog`].
    #[must_use]
    pub fn with_lookup(mut self, lookup: Box<dyn TypeLookup>) -> Self {
        self.state.lookup = lookup;
        self
    }

    #[must_use]
    pub fn with_macros(mut self, macros: Box<dyn MacroExpander>) -> Self {
        self.state.macros = macros;
        self
    }

    /// Run inference on the provided arena and return a completed builder.
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails. The error downcasts to
    /// [`errors::TypeCheckError`].
    #[must_use = "returns builder with typed context, extract with .typed_context()"]
    pub fn build_typed_context(
        self,
        arena: Arena,
    ) -> anyhow::Result<TyperBuilder<TyperCompleteState>> {
        let TyperInitState {
            config,
            lookup,
            macros,
        } = self.state;
        let mut typer = Typer::new(arena)
            .with_config(config)
            .with_lookup(lookup)
            .with_macros(macros);
        typer.infer_types()?;
        let ctx = typer.into_context();

        debug_assert!(
            {
                let untyped = ctx.find_untyped_nodes();
                if !untyped.is_empty() {
                    eprintln!("Typer bug: {} node(s) without TypeInfo:", untyped.len());
                    for m in &untyped {
                        eprintln!("  - {} at {} (id: {})", m.kind, m.location, m.id);
                    }
                }
                untyped.is_empty()
            },
            "All reachable nodes should have TypeInfo after inference"
        );

        Ok(TyperBuilder {
            state: TyperCompleteState { typed_context: ctx },
        })
    }
}

impl TyperBuilder<TyperCompleteState> {
    /// Consume the builder and return the typed context.
    #[must_use = "consumes builder and returns the typed context"]
    pub fn typed_context(self) -> TypedContext {
        self.state.typed_context
    }
}
