//! Typed Context - Inference Results for AST Nodes
//!
//! [`TypedContext`] is what the typer leaves behind for later stages
//! (code generation, tooling):
//!
//! ```text
//! TypedContext
//! ├─ Arena (the tree, including macro expansions spliced in during inference)
//! ├─ node_types: NodeId -> TypeInfo        memoized node types
//! ├─ argument_types: NodeId -> [TypeInfo]  Arguments nodes
//! ├─ ScopeChain                            local bindings per scope node
//! ├─ SignatureTable                        declared and effective signatures
//! └─ MethodTable                           (class, name, params) -> method type
//! ```
//!
//! Every fact here is written once. A node type, once memoized, never
//! changes; inference only ever adds entries.

use duby_ast::arena::Arena;
use duby_ast::nodes::{Location, Node, NodeId, NodeKind};
use rustc_hash::FxHashMap;

use crate::scope_chain::ScopeChain;
use crate::signature_table::{MethodTable, MethodType, Signature, SignatureTable};
use crate::type_info::TypeInfo;

/// Which constructor a constructor delegates to before running its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegationKind {
    /// `initialize(...)`: another constructor of the same class.
    This,
    /// `super(...)`: a superclass constructor.
    Super,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDelegation {
    pub kind: DelegationKind,
    pub arguments: Vec<NodeId>,
    pub argument_types: Vec<TypeInfo>,
    /// The constructor invoked, when the typer could identify it.
    pub target: Option<MethodType>,
}

#[derive(Default)]
pub struct TypedContext {
    arena: Arena,
    node_types: FxHashMap<NodeId, TypeInfo>,
    argument_types: FxHashMap<NodeId, Vec<TypeInfo>>,
    pub(crate) scopes: ScopeChain,
    pub(crate) signatures: SignatureTable,
    pub(crate) methods: MethodTable,
    /// Lexical class of each method definition, bound on first use.
    pub(crate) defining_classes: FxHashMap<NodeId, TypeInfo>,
    pub(crate) delegate_targets: FxHashMap<NodeId, MethodType>,
    /// Call node to the root of its macro expansion.
    pub(crate) expansions: FxHashMap<NodeId, NodeId>,
}

impl TypedContext {
    pub(crate) fn new(arena: Arena) -> Self {
        Self {
            arena,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Filters AST nodes using a predicate function, ordered by id.
    #[must_use = "returns filtered nodes without side effects"]
    pub fn filter_nodes<T: Fn(&Node) -> bool>(&self, fn_predicate: T) -> Vec<&Node> {
        self.arena.filter_nodes(fn_predicate)
    }

    /// Gets the memoized type of a node.
    ///
    /// `None` if the node was never inferred or is still pending. Block
    /// arguments are structural and never get a type. `Arguments` nodes
    /// are typed `void`; their per-argument types are in
    /// [`get_argument_types`](TypedContext::get_argument_types).
    #[must_use = "this is a pure lookup with no side effects"]
    pub fn get_node_typeinfo(&self, node_id: NodeId) -> Option<TypeInfo> {
        self.node_types.get(&node_id).cloned()
    }

    pub(crate) fn has_node_typeinfo(&self, node_id: NodeId) -> bool {
        self.node_types.contains_key(&node_id)
    }

    pub(crate) fn set_node_typeinfo(&mut self, node_id: NodeId, type_info: TypeInfo) {
        self.node_types.entry(node_id).or_insert(type_info);
    }

    /// Types of an `Arguments` node: required, then optional, then rest.
    #[must_use]
    pub fn get_argument_types(&self, arguments: NodeId) -> Option<&[TypeInfo]> {
        self.argument_types.get(&arguments).map(Vec::as_slice)
    }

    pub(crate) fn set_argument_types(&mut self, arguments: NodeId, types: Vec<TypeInfo>) {
        self.argument_types.entry(arguments).or_insert(types);
    }

    /// Parameter types of a method definition, once its arguments resolved.
    #[must_use]
    pub fn method_argument_types(&self, method: NodeId) -> Option<&[TypeInfo]> {
        let arguments = self.arena.find_node(method)?.kind.as_method()?.arguments;
        self.get_argument_types(arguments)
    }

    #[must_use]
    pub fn signature(&self, method: NodeId) -> Option<&Signature> {
        self.signatures.get(method)
    }

    /// Class a method definition belongs to. For static methods this is the meta type.
    #[must_use]
    pub fn defining_class(&self, method: NodeId) -> Option<TypeInfo> {
        let lexical = self.defining_classes.get(&method)?;
        let is_static = self
            .arena
            .find_node(method)
            .and_then(|node| node.kind.as_method())
            .is_some_and(duby_ast::nodes::MethodDefinition::is_static);
        Some(if is_static {
            lexical.meta()
        } else {
            lexical.clone()
        })
    }

    #[must_use]
    pub fn method_table(&self) -> &MethodTable {
        &self.methods
    }

    #[must_use]
    pub fn method_type(
        &self,
        defining_class: &TypeInfo,
        name: &str,
        parameters: &[TypeInfo],
    ) -> Option<&MethodType> {
        self.methods.find_exact(defining_class, name, parameters)
    }

    #[must_use]
    pub fn scope_chain(&self) -> &ScopeChain {
        &self.scopes
    }

    /// Type of local `name` as seen from scope node `scope`.
    #[must_use]
    pub fn local_type(&self, scope: NodeId, name: &str) -> Option<TypeInfo> {
        self.scopes.lookup(&self.arena, scope, name)
    }

    /// The node that took the place of a macro call, if the call was expanded.
    #[must_use]
    pub fn expansion_of(&self, call: NodeId) -> Option<NodeId> {
        self.expansions.get(&call).copied()
    }

    /// Delegating constructor call split off the front of a constructor body.
    #[must_use]
    pub fn constructor_delegation(&self, constructor: NodeId) -> Option<ConstructorDelegation> {
        let method = self.arena.find_node(constructor)?.kind.as_method()?;
        let (kind, arguments) = match (&method.this_args, &method.super_args) {
            (Some(args), _) => (DelegationKind::This, args.clone()),
            (None, Some(args)) => (DelegationKind::Super, args.clone()),
            (None, None) => return None,
        };
        let argument_types = arguments
            .iter()
            .filter_map(|arg| self.get_node_typeinfo(*arg))
            .collect();
        Some(ConstructorDelegation {
            kind,
            arguments,
            argument_types,
            target: self.delegate_targets.get(&constructor).cloned(),
        })
    }

    /// Nodes reachable from the roots that have no type after inference.
    ///
    /// An empty list means inference covered the whole tree. Block arguments
    /// are structural and skipped.
    #[must_use = "returns list of missing node types for verification"]
    #[track_caller]
    pub fn find_untyped_nodes(&self) -> Vec<MissingNodeType> {
        self.arena
            .filter_nodes(|node| node.parent.is_none())
            .into_iter()
            .flat_map(|root| {
                self.arena.get_children_cmp(root.id, |node| {
                    !matches!(node.kind, NodeKind::BlockArgument(_))
                        && !self.node_types.contains_key(&node.id)
                })
            })
            .map(|node| MissingNodeType {
                id: node.id,
                kind: node.kind.kind_name().to_string(),
                location: node.location.clone(),
            })
            .collect()
    }
}

/// Information about a node missing its type after inference.
#[derive(Debug)]
pub struct MissingNodeType {
    pub id: NodeId,
    pub kind: String,
    pub location: Location,
}
