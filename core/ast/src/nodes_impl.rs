use crate::nodes::{DeclaredSignature, MethodDefinition, MethodKind, Node, NodeId, NodeKind};

impl DeclaredSignature {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn param(mut self, name: &str, type_name: &str) -> Self {
        self.parameters
            .push((name.to_string(), type_name.to_string()));
        self
    }

    #[must_use]
    pub fn returns(mut self, type_name: &str) -> Self {
        self.returns = Some(type_name.to_string());
        self
    }

    #[must_use]
    pub fn throws(mut self, type_name: &str) -> Self {
        self.throws.push(type_name.to_string());
        self
    }

    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, ty)| ty.as_str())
    }
}

impl MethodDefinition {
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.kind == MethodKind::Static
    }

    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }
}

impl NodeKind {
    /// `Named` capability.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            NodeKind::Script(n) => Some(&n.name),
            NodeKind::ClassDefinition(n) => Some(&n.name),
            NodeKind::InterfaceDeclaration(n) => Some(&n.name),
            NodeKind::MethodDefinition(n) => Some(&n.name),
            NodeKind::RequiredArgument(n) => Some(&n.name),
            NodeKind::OptionalArgument(n) => Some(&n.name),
            NodeKind::RestArgument(n) => Some(&n.name),
            NodeKind::BlockArgument(n) => Some(&n.name),
            NodeKind::Local(n) => Some(&n.name),
            NodeKind::LocalAssignment(n) => Some(&n.name),
            NodeKind::FunctionalCall(n) => Some(&n.name),
            NodeKind::Call(n) => Some(&n.name),
            NodeKind::Constant(n) => Some(&n.name),
            _ => None,
        }
    }

    /// `Scope` capability: the node opens a fresh binding context.
    #[must_use]
    pub fn is_scope(&self) -> bool {
        matches!(
            self,
            NodeKind::Script(_)
                | NodeKind::ClassDefinition(_)
                | NodeKind::InterfaceDeclaration(_)
                | NodeKind::MethodDefinition(_)
                | NodeKind::Block(_)
        )
    }

    /// Scopes that do not see the locals of their enclosing scope.
    /// Only closures capture.
    #[must_use]
    pub fn isolates_locals(&self) -> bool {
        self.is_scope() && !matches!(self, NodeKind::Block(_))
    }

    /// `Scoped` capability: the node reads or writes bindings of its enclosing scope.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        matches!(
            self,
            NodeKind::RequiredArgument(_)
                | NodeKind::OptionalArgument(_)
                | NodeKind::RestArgument(_)
                | NodeKind::Local(_)
                | NodeKind::LocalAssignment(_)
        )
    }

    #[must_use]
    pub fn is_argument(&self) -> bool {
        matches!(
            self,
            NodeKind::RequiredArgument(_)
                | NodeKind::OptionalArgument(_)
                | NodeKind::RestArgument(_)
                | NodeKind::BlockArgument(_)
        )
    }

    #[must_use]
    pub fn as_method(&self) -> Option<&MethodDefinition> {
        if let NodeKind::MethodDefinition(method) = self {
            Some(method)
        } else {
            None
        }
    }

    /// Child slots in source order. Detached nodes (e.g. extracted
    /// constructor delegation arguments) are not listed.
    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        let mut children = Vec::new();
        match self {
            NodeKind::Script(n) => children.extend(n.body),
            NodeKind::ClassDefinition(n) => children.extend(n.body),
            NodeKind::InterfaceDeclaration(n) => children.extend(n.body),
            NodeKind::MethodDefinition(n) => {
                children.push(n.arguments);
                children.extend(n.body);
            }
            NodeKind::Arguments(n) => {
                children.extend(&n.required);
                children.extend(&n.optional);
                children.extend(n.rest);
                children.extend(n.block);
            }
            NodeKind::OptionalArgument(n) => children.push(n.value),
            NodeKind::Block(n) => {
                children.push(n.arguments);
                children.extend(n.body);
            }
            NodeKind::Body(n) => children.extend(&n.statements),
            NodeKind::LocalAssignment(n) => children.push(n.value),
            NodeKind::FunctionalCall(n) => {
                children.extend(&n.parameters);
                children.extend(n.block);
            }
            NodeKind::Call(n) => {
                children.push(n.target);
                children.extend(&n.parameters);
                children.extend(n.block);
            }
            NodeKind::Super(n) => children.extend(&n.parameters),
            NodeKind::If(n) => {
                children.push(n.condition);
                children.extend(n.then_body);
                children.extend(n.else_body);
            }
            NodeKind::Return(n) => children.extend(n.value),
            NodeKind::Raise(n) => children.push(n.exception),
            NodeKind::RequiredArgument(_)
            | NodeKind::RestArgument(_)
            | NodeKind::BlockArgument(_)
            | NodeKind::Noop
            | NodeKind::Fixnum(_)
            | NodeKind::Float(_)
            | NodeKind::Str(_)
            | NodeKind::Boolean(_)
            | NodeKind::Null
            | NodeKind::SelfRef
            | NodeKind::Local(_)
            | NodeKind::Constant(_) => {}
        }
        children
    }

    pub(crate) fn child_slots_mut(&mut self) -> Vec<&mut NodeId> {
        let mut slots: Vec<&mut NodeId> = Vec::new();
        match self {
            NodeKind::Script(n) => slots.extend(n.body.as_mut()),
            NodeKind::ClassDefinition(n) => slots.extend(n.body.as_mut()),
            NodeKind::InterfaceDeclaration(n) => slots.extend(n.body.as_mut()),
            NodeKind::MethodDefinition(n) => {
                slots.push(&mut n.arguments);
                slots.extend(n.body.as_mut());
            }
            NodeKind::Arguments(n) => {
                slots.extend(n.required.iter_mut());
                slots.extend(n.optional.iter_mut());
                slots.extend(n.rest.as_mut());
                slots.extend(n.block.as_mut());
            }
            NodeKind::OptionalArgument(n) => slots.push(&mut n.value),
            NodeKind::Block(n) => {
                slots.push(&mut n.arguments);
                slots.extend(n.body.as_mut());
            }
            NodeKind::Body(n) => slots.extend(n.statements.iter_mut()),
            NodeKind::LocalAssignment(n) => slots.push(&mut n.value),
            NodeKind::FunctionalCall(n) => {
                slots.extend(n.parameters.iter_mut());
                slots.extend(n.block.as_mut());
            }
            NodeKind::Call(n) => {
                slots.push(&mut n.target);
                slots.extend(n.parameters.iter_mut());
                slots.extend(n.block.as_mut());
            }
            NodeKind::Super(n) => slots.extend(n.parameters.iter_mut()),
            NodeKind::If(n) => {
                slots.push(&mut n.condition);
                slots.extend(n.then_body.as_mut());
                slots.extend(n.else_body.as_mut());
            }
            NodeKind::Return(n) => slots.extend(n.value.as_mut()),
            NodeKind::Raise(n) => slots.push(&mut n.exception),
            _ => {}
        }
        slots
    }

    /// Short human description used in diagnostics, e.g. "method `foo`".
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            NodeKind::MethodDefinition(method) => match method.kind {
                MethodKind::Constructor => format!("constructor `{}`", method.name),
                MethodKind::Static => format!("static method `{}`", method.name),
                MethodKind::Instance => format!("method `{}`", method.name),
            },
            NodeKind::RequiredArgument(n) => format!("argument `{}`", n.name),
            NodeKind::OptionalArgument(n) => format!("optional argument `{}`", n.name),
            NodeKind::RestArgument(n) => format!("rest argument `{}`", n.name),
            NodeKind::BlockArgument(n) => format!("block argument `{}`", n.name),
            NodeKind::Local(n) => format!("local `{}`", n.name),
            NodeKind::LocalAssignment(n) => format!("assignment to `{}`", n.name),
            NodeKind::FunctionalCall(n) => format!("call to `{}`", n.name),
            NodeKind::Call(n) => format!("call to `{}`", n.name),
            NodeKind::Constant(n) => format!("constant `{}`", n.name),
            NodeKind::ClassDefinition(n) => format!("class `{}`", n.name),
            NodeKind::InterfaceDeclaration(n) => format!("interface `{}`", n.name),
            NodeKind::Script(n) => format!("script `{}`", n.name),
            other => other.kind_name().to_string(),
        }
    }
}

impl Node {
    #[must_use]
    pub fn is_scope(&self) -> bool {
        self.kind.is_scope()
    }

    #[must_use]
    pub fn children(&self) -> Vec<NodeId> {
        self.kind.children()
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.kind.describe()
    }
}
