//! Programmatic AST construction.
//!
//! The parser and the macro layer hand nodes to the typer through an
//! [`Arena`]. `AstBuilder` is the one way nodes get into it:
//!
//! - every node is given its parent and the current source position;
//! - a node's id is reserved before its children are built, so the
//!   closure building the children can name their parent;
//! - the node records exactly the children the closure returns, in order.
//!
//! ```
//! use duby_ast::arena::Arena;
//! use duby_ast::builder::AstBuilder;
//! use duby_ast::nodes::DeclaredSignature;
//!
//! let mut arena = Arena::default();
//! let mut b = AstBuilder::new(&mut arena, "answer.duby");
//! let script = b.script("Answer", |b, script| {
//!     Some(b.body(script, |b, body| {
//!         vec![b.method(body, "answer", DeclaredSignature::new(), |b, m| {
//!             let args = b.no_arguments(m);
//!             let body = b.body(m, |b, body| vec![b.fixnum(body, 42)]);
//!             (args, Some(body))
//!         })]
//!     }))
//! });
//! assert!(arena.find_node(script).is_some());
//! ```
//!
//! Constructors run delegate extraction as soon as they are built, see
//! [`Arena::extract_delegate_constructor`].

use crate::arena::Arena;
use crate::errors::AstError;
use crate::nodes::{
    Arguments, Block, BlockArgument, Body, Boolean, Call, ClassDefinition, Constant,
    DeclaredSignature, Fixnum, Float, FunctionalCall, If, InterfaceDeclaration, Local,
    LocalAssignment, Location, MethodDefinition, MethodKind, Node, NodeId, NodeKind,
    OptionalArgument, Raise, RequiredArgument, RestArgument, Return, Script, Str, Super,
};

pub struct AstBuilder<'a> {
    arena: &'a mut Arena,
    source: String,
    line: u32,
    column: u32,
}

impl<'a> AstBuilder<'a> {
    #[must_use]
    pub fn new(arena: &'a mut Arena, source: &str) -> Self {
        Self {
            arena,
            source: source.to_string(),
            line: 1,
            column: 0,
        }
    }

    /// Sets the position recorded for the nodes built from now on.
    pub fn at(&mut self, line: u32, column: u32) -> &mut Self {
        self.line = line;
        self.column = column;
        self
    }

    #[must_use]
    pub fn arena(&self) -> &Arena {
        self.arena
    }

    fn location(&self) -> Location {
        Location::new(0, self.line, self.column, self.source.clone())
    }

    /// Builds one node. `build` receives the reserved id of the node so the
    /// children it creates can point at it.
    pub fn node<F>(&mut self, parent: Option<NodeId>, build: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> NodeKind,
    {
        let id = self.arena.next_id();
        let location = self.location();
        let kind = build(self, id);
        self.arena.add_node(Node {
            id,
            parent,
            location,
            kind,
        });
        id
    }

    pub fn leaf(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        self.node(Some(parent), |_, _| kind)
    }

    pub fn script<F>(&mut self, name: &str, body: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Option<NodeId>,
    {
        self.node(None, |b, id| {
            NodeKind::Script(Script {
                name: name.to_string(),
                body: body(b, id),
            })
        })
    }

    pub fn class_definition<F>(
        &mut self,
        parent: NodeId,
        name: &str,
        superclass: Option<&str>,
        body: F,
    ) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Option<NodeId>,
    {
        self.class_implementing(parent, name, superclass, &[], body)
    }

    pub fn class_implementing<F>(
        &mut self,
        parent: NodeId,
        name: &str,
        superclass: Option<&str>,
        interfaces: &[&str],
        body: F,
    ) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Option<NodeId>,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::ClassDefinition(ClassDefinition {
                name: name.to_string(),
                superclass: superclass.map(str::to_string),
                interfaces: interfaces.iter().map(|i| (*i).to_string()).collect(),
                body: body(b, id),
            })
        })
    }

    pub fn interface<F>(&mut self, parent: NodeId, name: &str, body: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Option<NodeId>,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::InterfaceDeclaration(InterfaceDeclaration {
                name: name.to_string(),
                interfaces: vec![],
                body: body(b, id),
            })
        })
    }

    /// Builds an instance method. `build` returns the `Arguments` node and the optional body.
    pub fn method<F>(
        &mut self,
        parent: NodeId,
        name: &str,
        signature: DeclaredSignature,
        build: F,
    ) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Option<NodeId>),
    {
        self.method_of_kind(parent, name, MethodKind::Instance, signature, build)
    }

    pub fn static_method<F>(
        &mut self,
        parent: NodeId,
        name: &str,
        signature: DeclaredSignature,
        build: F,
    ) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Option<NodeId>),
    {
        self.method_of_kind(parent, name, MethodKind::Static, signature, build)
    }

    /// Builds a constructor and splits off its delegation call.
    ///
    /// # Errors
    ///
    /// Propagates arena errors from delegate extraction.
    pub fn constructor<F>(
        &mut self,
        parent: NodeId,
        signature: DeclaredSignature,
        build: F,
    ) -> Result<NodeId, AstError>
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Option<NodeId>),
    {
        let id = self.method_of_kind(
            parent,
            "initialize",
            MethodKind::Constructor,
            signature,
            build,
        );
        self.arena.extract_delegate_constructor(id)?;
        Ok(id)
    }

    fn method_of_kind<F>(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: MethodKind,
        signature: DeclaredSignature,
        build: F,
    ) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Option<NodeId>),
    {
        self.node(Some(parent), |b, id| {
            let (arguments, body) = build(b, id);
            NodeKind::MethodDefinition(MethodDefinition {
                name: name.to_string(),
                kind,
                signature,
                arguments,
                body,
                this_args: None,
                super_args: None,
            })
        })
    }

    pub fn arguments<F>(&mut self, parent: NodeId, build: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Arguments,
    {
        self.node(Some(parent), |b, id| NodeKind::Arguments(build(b, id)))
    }

    pub fn no_arguments(&mut self, parent: NodeId) -> NodeId {
        self.arguments(parent, |_, _| Arguments::default())
    }

    /// Shorthand for an argument list made only of required arguments.
    pub fn required_arguments(&mut self, parent: NodeId, names: &[&str]) -> NodeId {
        self.arguments(parent, |b, args| Arguments {
            required: names
                .iter()
                .map(|name| b.required_argument(args, name))
                .collect(),
            ..Arguments::default()
        })
    }

    pub fn required_argument(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.leaf(
            parent,
            NodeKind::RequiredArgument(RequiredArgument {
                name: name.to_string(),
            }),
        )
    }

    pub fn optional_argument<F>(&mut self, parent: NodeId, name: &str, value: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> NodeId,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::OptionalArgument(OptionalArgument {
                name: name.to_string(),
                value: value(b, id),
            })
        })
    }

    pub fn rest_argument(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.leaf(
            parent,
            NodeKind::RestArgument(RestArgument {
                name: name.to_string(),
            }),
        )
    }

    pub fn block_argument(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.leaf(
            parent,
            NodeKind::BlockArgument(BlockArgument {
                name: name.to_string(),
            }),
        )
    }

    pub fn block<F>(&mut self, parent: NodeId, build: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Option<NodeId>),
    {
        self.node(Some(parent), |b, id| {
            let (arguments, body) = build(b, id);
            NodeKind::Block(Block { arguments, body })
        })
    }

    pub fn body<F>(&mut self, parent: NodeId, statements: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Vec<NodeId>,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::Body(Body {
                statements: statements(b, id),
            })
        })
    }

    pub fn noop(&mut self, parent: NodeId) -> NodeId {
        self.leaf(parent, NodeKind::Noop)
    }

    pub fn fixnum(&mut self, parent: NodeId, value: i64) -> NodeId {
        self.leaf(parent, NodeKind::Fixnum(Fixnum { value }))
    }

    pub fn float(&mut self, parent: NodeId, value: f64) -> NodeId {
        self.leaf(parent, NodeKind::Float(Float { value }))
    }

    pub fn string(&mut self, parent: NodeId, value: &str) -> NodeId {
        self.leaf(
            parent,
            NodeKind::Str(Str {
                value: value.to_string(),
            }),
        )
    }

    pub fn boolean(&mut self, parent: NodeId, value: bool) -> NodeId {
        self.leaf(parent, NodeKind::Boolean(Boolean { value }))
    }

    pub fn null(&mut self, parent: NodeId) -> NodeId {
        self.leaf(parent, NodeKind::Null)
    }

    pub fn self_ref(&mut self, parent: NodeId) -> NodeId {
        self.leaf(parent, NodeKind::SelfRef)
    }

    pub fn local(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.leaf(
            parent,
            NodeKind::Local(Local {
                name: name.to_string(),
            }),
        )
    }

    pub fn local_assignment<F>(&mut self, parent: NodeId, name: &str, value: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> NodeId,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::LocalAssignment(LocalAssignment {
                name: name.to_string(),
                value: value(b, id),
            })
        })
    }

    pub fn constant(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.leaf(
            parent,
            NodeKind::Constant(Constant {
                name: name.to_string(),
            }),
        )
    }

    /// Unqualified call on `self`.
    pub fn functional_call<F>(&mut self, parent: NodeId, name: &str, parameters: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Vec<NodeId>,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::FunctionalCall(FunctionalCall {
                name: name.to_string(),
                parameters: parameters(b, id),
                block: None,
            })
        })
    }

    /// Unqualified call carrying a closure. `build` returns the parameters and the block node.
    pub fn functional_call_with_block<F>(&mut self, parent: NodeId, name: &str, build: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (Vec<NodeId>, NodeId),
    {
        self.node(Some(parent), |b, id| {
            let (parameters, block) = build(b, id);
            NodeKind::FunctionalCall(FunctionalCall {
                name: name.to_string(),
                parameters,
                block: Some(block),
            })
        })
    }

    /// Call on an explicit receiver. `build` returns the target and the parameters.
    pub fn call<F>(&mut self, parent: NodeId, name: &str, build: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Vec<NodeId>),
    {
        self.node(Some(parent), |b, id| {
            let (target, parameters) = build(b, id);
            NodeKind::Call(Call {
                target,
                name: name.to_string(),
                parameters,
                block: None,
            })
        })
    }

    pub fn super_call<F>(&mut self, parent: NodeId, parameters: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Vec<NodeId>,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::Super(Super {
                parameters: parameters(b, id),
            })
        })
    }

    /// `build` returns the condition, the then branch and the optional else branch.
    pub fn if_node<F>(&mut self, parent: NodeId, build: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> (NodeId, Option<NodeId>, Option<NodeId>),
    {
        self.node(Some(parent), |b, id| {
            let (condition, then_body, else_body) = build(b, id);
            NodeKind::If(If {
                condition,
                then_body,
                else_body,
            })
        })
    }

    pub fn return_node<F>(&mut self, parent: NodeId, value: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> Option<NodeId>,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::Return(Return {
                value: value(b, id),
            })
        })
    }

    pub fn raise<F>(&mut self, parent: NodeId, exception: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId) -> NodeId,
    {
        self.node(Some(parent), |b, id| {
            NodeKind::Raise(Raise {
                exception: exception(b, id),
            })
        })
    }
}
