use crate::errors::AstError;
use crate::nodes::{MethodDefinition, Node, NodeId, NodeKind};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct Arena {
    pub(crate) nodes: FxHashMap<NodeId, Node>,
    next_id: NodeId,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            nodes: FxHashMap::default(),
            next_id: 1,
        }
    }
}

enum Delegation {
    This(Vec<NodeId>),
    Super(Vec<NodeId>),
}

impl Arena {
    /// Reserves a fresh node id. Ids are handed out sequentially starting at 1.
    pub fn next_id(&mut self) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a node to the arena. The parent link travels with the node; the
    /// parent's child slots are filled by whoever builds the parent.
    ///
    /// # Panics
    ///
    /// Panics if `node.id` is zero or if a node with the same ID already exists in the arena.
    pub fn add_node(&mut self, node: Node) {
        assert!(node.id != 0, "Node ID must be non-zero");
        assert!(
            !self.nodes.contains_key(&node.id),
            "Node with ID {} already exists in the arena",
            node.id
        );
        if node.id >= self.next_id {
            self.next_id = node.id + 1;
        }
        self.nodes.insert(node.id, node);
    }

    #[must_use]
    pub fn find_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Like [`Arena::find_node`], but a missing node is an error.
    ///
    /// # Errors
    ///
    /// Returns [`AstError::NodeNotFound`] if no node has this id.
    pub fn node(&self, id: NodeId) -> Result<&Node, AstError> {
        self.nodes.get(&id).ok_or(AstError::NodeNotFound { id })
    }

    #[must_use]
    pub fn find_parent_node(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&id)
            .map(Node::children)
            .unwrap_or_default()
    }

    /// Walks parent links, nearest first. The node itself is not included.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &Node> + '_ {
        std::iter::successors(
            self.find_parent_node(id).and_then(|p| self.nodes.get(&p)),
            move |node| node.parent.and_then(|p| self.nodes.get(&p)),
        )
    }

    /// Nearest node carrying the `Scope` capability, starting at `id` itself.
    #[must_use]
    pub fn enclosing_scope(&self, id: NodeId) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.nodes.get(&node_id)?;
            if node.is_scope() {
                return Some(node_id);
            }
            current = node.parent;
        }
        None
    }

    /// Pre-order walk of the subtree rooted at `id`, keeping nodes accepted by `comparator`.
    pub fn get_children_cmp<F>(&self, id: NodeId, comparator: F) -> Vec<&Node>
    where
        F: Fn(&Node) -> bool,
    {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = vec![id];

        while let Some(current_id) = stack.pop() {
            let Some(current_node) = self.nodes.get(&current_id) else {
                continue;
            };
            if comparator(current_node) {
                result.push(current_node);
            }
            stack.extend(current_node.children().into_iter().rev());
        }

        result
    }

    /// All nodes accepted by the predicate, ordered by id.
    pub fn filter_nodes<T: Fn(&Node) -> bool>(&self, fn_predicate: T) -> Vec<&Node> {
        let mut nodes: Vec<&Node> = self
            .nodes
            .values()
            .filter(|node| fn_predicate(node))
            .collect();
        nodes.sort_by_key(|node| node.id);
        nodes
    }

    #[must_use]
    pub fn methods(&self) -> Vec<(NodeId, &MethodDefinition)> {
        self.filter_nodes(|node| matches!(node.kind, NodeKind::MethodDefinition(_)))
            .into_iter()
            .filter_map(|node| node.kind.as_method().map(|method| (node.id, method)))
            .collect()
    }

    /// Puts `new` into the child slot of `parent` currently holding `old`.
    ///
    /// `new` must have been constructed with `parent` as its parent; nodes are
    /// never re-parented.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is missing, `new` belongs to another
    /// parent, or `old` is not a child of `parent`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), AstError> {
        let actual = self.node(new)?.parent;
        if actual != Some(parent) {
            return Err(AstError::ParentMismatch {
                node: new,
                expected: parent,
                actual,
            });
        }
        let parent_node = self
            .nodes
            .get_mut(&parent)
            .ok_or(AstError::NodeNotFound { id: parent })?;
        let slot = parent_node
            .kind
            .child_slots_mut()
            .into_iter()
            .find(|slot| **slot == old)
            .ok_or(AstError::NotAChild { parent, child: old })?;
        *slot = new;
        Ok(())
    }

    /// Splits a leading `initialize(...)` or `super(...)` call off a constructor body.
    ///
    /// The first statement of the body (or the body itself when it is a single
    /// statement) is inspected. An unqualified call named `initialize` becomes
    /// `this_args`, a `super` call becomes `super_args`; the statement is
    /// replaced by a `Noop`. Runs at most once per constructor.
    ///
    /// # Errors
    ///
    /// Returns an error if `ctor` is not a constructor definition or the
    /// body references missing nodes.
    pub fn extract_delegate_constructor(&mut self, ctor: NodeId) -> Result<(), AstError> {
        let ctor_node = self.node(ctor)?;
        let location = ctor_node.location.clone();
        let body = match &ctor_node.kind {
            NodeKind::MethodDefinition(method) if method.is_constructor() => {
                if method.this_args.is_some() || method.super_args.is_some() {
                    return Ok(());
                }
                method.body
            }
            _ => return Err(AstError::NotAConstructor { id: ctor }),
        };
        let Some(body) = body else {
            return Ok(());
        };

        let (holder, first) = match &self.node(body)?.kind {
            NodeKind::Body(block) => match block.statements.first() {
                Some(first) => (body, *first),
                None => return Ok(()),
            },
            _ => (ctor, body),
        };

        let delegation = match &self.node(first)?.kind {
            NodeKind::FunctionalCall(call) if call.name == "initialize" => {
                Delegation::This(call.parameters.clone())
            }
            NodeKind::Super(super_call) => Delegation::Super(super_call.parameters.clone()),
            _ => return Ok(()),
        };

        let noop = self.next_id();
        self.add_node(Node {
            id: noop,
            parent: Some(holder),
            location,
            kind: NodeKind::Noop,
        });
        self.replace_child(holder, first, noop)?;

        if let Some(NodeKind::MethodDefinition(method)) =
            self.nodes.get_mut(&ctor).map(|node| &mut node.kind)
        {
            match delegation {
                Delegation::This(args) => method.this_args = Some(args),
                Delegation::Super(args) => method.super_args = Some(args),
            }
        }
        Ok(())
    }
}
