//! Scope Chain
//!
//! Local variable bindings, one [`Scope`] per scope node of the tree.
//!
//! Scope nodes are scripts, class and interface bodies, methods and
//! blocks. Only blocks see the locals of the scope around them. Every other
//! scope starts empty, so lookups stop there. Parent links are not stored
//! here; the arena already has them.

use duby_ast::arena::Arena;
use duby_ast::nodes::NodeId;
use rustc_hash::FxHashMap;

use crate::type_info::TypeInfo;

#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub(crate) id: NodeId,
    /// Name to (node that first bound it, type).
    pub(crate) variables: FxHashMap<String, (NodeId, TypeInfo)>,
}

impl Scope {
    #[must_use = "scope constructor returns a new scope that should be used"]
    pub(crate) fn new(id: NodeId) -> Self {
        Self {
            id,
            variables: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn lookup_variable_local(&self, name: &str) -> Option<&TypeInfo> {
        self.variables.get(name).map(|(_, ty)| ty)
    }

    /// Bound names with their types, sorted by name.
    #[must_use]
    pub fn variables(&self) -> Vec<(&str, &TypeInfo)> {
        let mut variables: Vec<(&str, &TypeInfo)> = self
            .variables
            .iter()
            .map(|(name, (_, ty))| (name.as_str(), ty))
            .collect();
        variables.sort_by_key(|(name, _)| *name);
        variables
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScopeChain {
    scopes: FxHashMap<NodeId, Scope>,
}

impl ScopeChain {
    #[must_use]
    pub fn scope(&self, id: NodeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    /// Type of `name` bound directly in `scope`, ignoring enclosing scopes.
    #[must_use]
    pub fn lookup_local(&self, scope: NodeId, name: &str) -> Option<&TypeInfo> {
        self.scopes
            .get(&scope)
            .and_then(|scope| scope.lookup_variable_local(name))
    }

    /// Type of `name` as seen from `scope`: the scope itself first, then,
    /// through closures, the scopes they capture.
    #[must_use]
    pub fn lookup(&self, arena: &Arena, scope: NodeId, name: &str) -> Option<TypeInfo> {
        self.visible_scopes(arena, scope)
            .find_map(|id| self.lookup_local(id, name).cloned())
    }

    /// The scope that owns `name` as seen from `scope`. A name nobody binds
    /// yet belongs to `scope` itself.
    pub(crate) fn binding_scope(&self, arena: &Arena, scope: NodeId, name: &str) -> NodeId {
        self.visible_scopes(arena, scope)
            .find(|id| self.lookup_local(*id, name).is_some())
            .unwrap_or(scope)
    }

    pub(crate) fn insert_variable(
        &mut self,
        scope: NodeId,
        name: &str,
        node: NodeId,
        type_info: TypeInfo,
    ) {
        self.scopes
            .entry(scope)
            .or_insert_with(|| Scope::new(scope))
            .variables
            .insert(name.to_string(), (node, type_info));
    }

    fn visible_scopes<'a>(
        &'a self,
        arena: &'a Arena,
        scope: NodeId,
    ) -> impl Iterator<Item = NodeId> + 'a {
        std::iter::successors(Some(scope), move |current| outer_scope(arena, *current))
    }
}

/// The scope a closure captures from. `None` for scopes that isolate their locals.
fn outer_scope(arena: &Arena, scope: NodeId) -> Option<NodeId> {
    let node = arena.find_node(scope)?;
    if node.kind.isolates_locals() {
        return None;
    }
    node.parent.and_then(|parent| arena.enclosing_scope(parent))
}
