use core::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Stable index of a node inside an [`Arena`](crate::arena::Arena).
///
/// Zero is reserved and never handed out.
pub type NodeId = u32;

#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct Location {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
    pub source: String,
}

impl Location {
    #[must_use]
    pub fn new(offset: u32, line: u32, column: u32, source: String) -> Self {
        Self {
            offset,
            line,
            column,
            source,
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

macro_rules! ast_nodes {
    (
        $(
            $(#[$outer:meta])*
            $struct_vis:vis struct $name:ident {
                $(
                    $(#[$field_attr:meta])*
                    $field_vis:vis $field_name:ident : $field_ty:ty
                ),* $(,)?
            }
        )+
    ) => {
        $(
            $(#[$outer])*
            #[derive(Clone, PartialEq, Debug, Serialize)]
            $struct_vis struct $name {
                $(
                    $(#[$field_attr])*
                    $field_vis $field_name : $field_ty,
                )*
            }
        )+
    };
}

macro_rules! node_kinds {
    (
        $(
            $(#[$arm_attr:meta])*
            $arm:ident $( ( $payload:ty ) )?
        ),* $(,)?
    ) => {
        /// Closed set of node kinds. Every typer rule dispatches on this tag.
        #[derive(Clone, PartialEq, Debug, Serialize)]
        pub enum NodeKind {
            $(
                $(#[$arm_attr])*
                $arm $( ( $payload ) )?,
            )*
        }

        impl NodeKind {
            #[must_use]
            pub fn kind_name(&self) -> &'static str {
                match self {
                    $(
                        NodeKind::$arm { .. } => stringify!($arm),
                    )*
                }
            }
        }
    };
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub enum MethodKind {
    #[default]
    Instance,
    Static,
    Constructor,
}

/// Types written in the source for a method, by name. Nothing here is resolved.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct DeclaredSignature {
    pub parameters: Vec<(String, String)>,
    pub returns: Option<String>,
    pub throws: Vec<String>,
}

node_kinds! {
    Script(Script),
    ClassDefinition(ClassDefinition),
    InterfaceDeclaration(InterfaceDeclaration),
    MethodDefinition(MethodDefinition),
    Arguments(Arguments),
    RequiredArgument(RequiredArgument),
    OptionalArgument(OptionalArgument),
    RestArgument(RestArgument),
    BlockArgument(BlockArgument),
    Block(Block),
    Body(Body),
    Noop,
    Fixnum(Fixnum),
    Float(Float),
    Str(Str),
    Boolean(Boolean),
    Null,
    SelfRef,
    Local(Local),
    LocalAssignment(LocalAssignment),
    FunctionalCall(FunctionalCall),
    Call(Call),
    Super(Super),
    Constant(Constant),
    If(If),
    Return(Return),
    Raise(Raise),
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub location: Location,
    pub kind: NodeKind,
}

ast_nodes! {

    pub struct Script {
        pub name: String,
        pub body: Option<NodeId>,
    }

    pub struct ClassDefinition {
        pub name: String,
        pub superclass: Option<String>,
        pub interfaces: Vec<String>,
        pub body: Option<NodeId>,
    }

    pub struct InterfaceDeclaration {
        pub name: String,
        pub interfaces: Vec<String>,
        pub body: Option<NodeId>,
    }

    pub struct MethodDefinition {
        pub name: String,
        pub kind: MethodKind,
        pub signature: DeclaredSignature,
        pub arguments: NodeId,
        pub body: Option<NodeId>,
        /// Arguments of a leading `initialize(...)` call, constructors only.
        pub this_args: Option<Vec<NodeId>>,
        /// Arguments of a leading `super(...)` call, constructors only.
        pub super_args: Option<Vec<NodeId>>,
    }

    /// Parameter list of a method or block.
    ///
    /// Inference gives the node itself the `void` type. The ordered
    /// parameter types (required, optional, rest) are kept next to it and
    /// read through `TypedContext::get_argument_types`.
    #[derive(Default)]
    pub struct Arguments {
        pub required: Vec<NodeId>,
        pub optional: Vec<NodeId>,
        pub rest: Option<NodeId>,
        pub block: Option<NodeId>,
    }

    pub struct RequiredArgument {
        pub name: String,
    }

    pub struct OptionalArgument {
        pub name: String,
        pub value: NodeId,
    }

    pub struct RestArgument {
        pub name: String,
    }

    pub struct BlockArgument {
        pub name: String,
    }

    pub struct Block {
        pub arguments: NodeId,
        pub body: Option<NodeId>,
    }

    pub struct Body {
        pub statements: Vec<NodeId>,
    }

    pub struct Fixnum {
        pub value: i64,
    }

    pub struct Float {
        pub value: f64,
    }

    pub struct Str {
        pub value: String,
    }

    pub struct Boolean {
        pub value: bool,
    }

    pub struct Local {
        pub name: String,
    }

    pub struct LocalAssignment {
        pub name: String,
        pub value: NodeId,
    }

    pub struct FunctionalCall {
        pub name: String,
        pub parameters: Vec<NodeId>,
        pub block: Option<NodeId>,
    }

    pub struct Call {
        pub target: NodeId,
        pub name: String,
        pub parameters: Vec<NodeId>,
        pub block: Option<NodeId>,
    }

    pub struct Super {
        pub parameters: Vec<NodeId>,
    }

    pub struct Constant {
        pub name: String,
    }

    pub struct If {
        pub condition: NodeId,
        pub then_body: Option<NodeId>,
        pub else_body: Option<NodeId>,
    }

    pub struct Return {
        pub value: Option<NodeId>,
    }

    pub struct Raise {
        pub exception: NodeId,
    }

}
