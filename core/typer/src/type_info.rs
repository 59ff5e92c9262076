//! Type Information
//!
//! This module defines the representation of types used throughout the typer.
//!
//! Duby targets the JVM, so the type space mirrors it:
//! - Primitive types: boolean, byte, char, short, int, long, float, double
//! - Reference types: classes and interfaces by fully qualified name, arrays
//! - Sentinels: `void` ("no value"), `unreachable` (never completes), `null`
//!
//! Every class type also has a *meta* form, the type of the class object
//! itself. Static methods are members of the meta type.

use core::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash, Serialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    /// All primitive variants for iteration.
    pub const ALL: &'static [PrimitiveType] = &[
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Char,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Returns the source-code keyword of this primitive (e.g. "int").
    #[must_use = "returns the string representation without modifying self"]
    pub const fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    /// JVM widening conversion: `self` can be used where `target` is expected.
    #[must_use]
    pub fn widens_to(&self, target: PrimitiveType) -> bool {
        if *self == target {
            return true;
        }
        if *self == PrimitiveType::Char {
            return matches!(
                target,
                PrimitiveType::Int | PrimitiveType::Long | PrimitiveType::Float | PrimitiveType::Double
            );
        }
        match (self.numeric_rank(), target.numeric_rank()) {
            (Some(from), Some(to)) => from < to && target != PrimitiveType::Char,
            _ => false,
        }
    }

    fn numeric_rank(self) -> Option<u8> {
        match self {
            PrimitiveType::Byte => Some(0),
            PrimitiveType::Short => Some(1),
            PrimitiveType::Int => Some(2),
            PrimitiveType::Long => Some(3),
            PrimitiveType::Float => Some(4),
            PrimitiveType::Double => Some(5),
            PrimitiveType::Boolean | PrimitiveType::Char => None,
        }
    }
}

impl std::str::FromStr for PrimitiveType {
    type Err = ();

    /// Parses a primitive keyword. Keywords are case sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|p| p.as_str() == s)
            .copied()
            .ok_or(())
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize)]
pub enum TypeInfoKind {
    /// The "no value" type.
    Void,
    /// Type of expressions that never complete (`raise`).
    Unreachable,
    Null,
    Primitive(PrimitiveType),
    /// Class or interface, by fully qualified name.
    Object(String),
    Array(Box<TypeInfo>),
}

impl Display for TypeInfoKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            TypeInfoKind::Void => write!(f, "void"),
            TypeInfoKind::Unreachable => write!(f, "unreachable"),
            TypeInfoKind::Null => write!(f, "null"),
            TypeInfoKind::Primitive(primitive) => write!(f, "{}", primitive.as_str()),
            TypeInfoKind::Object(name) => write!(f, "{name}"),
            TypeInfoKind::Array(element) => write!(f, "{element}[]"),
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Hash, Serialize)]
pub struct TypeInfo {
    pub kind: TypeInfoKind,
    /// Class-object form of the type: members are the static ones.
    pub meta: bool,
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self::void()
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        if self.meta {
            write!(f, "{} meta", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl TypeInfo {
    #[must_use]
    pub fn new(kind: TypeInfoKind) -> Self {
        Self { kind, meta: false }
    }

    #[must_use]
    pub fn void() -> Self {
        Self::new(TypeInfoKind::Void)
    }

    #[must_use]
    pub fn unreachable() -> Self {
        Self::new(TypeInfoKind::Unreachable)
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(TypeInfoKind::Null)
    }

    #[must_use]
    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self::new(TypeInfoKind::Primitive(primitive))
    }

    #[must_use]
    pub fn int() -> Self {
        Self::primitive(PrimitiveType::Int)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::primitive(PrimitiveType::Boolean)
    }

    #[must_use]
    pub fn object(name: &str) -> Self {
        Self::new(TypeInfoKind::Object(name.to_string()))
    }

    #[must_use]
    pub fn array(element: TypeInfo) -> Self {
        Self::new(TypeInfoKind::Array(Box::new(element)))
    }

    /// Class-object type of this type. Idempotent.
    #[must_use = "returns a new TypeInfo, original is unchanged"]
    pub fn meta(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            meta: true,
        }
    }

    #[must_use = "returns a new TypeInfo, original is unchanged"]
    pub fn unmeta(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            meta: false,
        }
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeInfoKind::Void)
    }

    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self.kind, TypeInfoKind::Unreachable)
    }

    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.meta
    }

    #[must_use]
    pub fn as_primitive(&self) -> Option<PrimitiveType> {
        match self.kind {
            TypeInfoKind::Primitive(primitive) if !self.meta => Some(primitive),
            _ => None,
        }
    }

    /// Reference types accept `null`.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        !self.meta
            && matches!(
                self.kind,
                TypeInfoKind::Object(_) | TypeInfoKind::Array(_) | TypeInfoKind::Null
            )
    }

    /// Fully qualified class name for object types.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        if let TypeInfoKind::Object(name) = &self.kind {
            Some(name)
        } else {
            None
        }
    }

    /// Parses a builtin keyword (`void` or a primitive).
    #[must_use = "parsing result should be checked; returns None if not a builtin"]
    pub fn from_builtin_str(s: &str) -> Option<Self> {
        if s == "void" {
            return Some(Self::void());
        }
        s.parse::<PrimitiveType>().ok().map(Self::primitive)
    }
}
