//! Type Lookup Service
//!
//! The typer never decides on its own what a type name means or whether one
//! type may stand in for another. It asks a [`TypeLookup`]. In the full
//! compiler that service is backed by the host runtime's reflective class
//! catalog; [`ClassCatalog`] is the in-memory implementation shipped with
//! the typer: JVM primitives, the handful of `java.lang` classes the
//! language leans on, and every class or interface declared in the
//! compilation unit.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::type_info::{PrimitiveType, TypeInfo, TypeInfoKind};

pub const OBJECT: &str = "java.lang.Object";
pub const STRING: &str = "java.lang.String";

/// A class or interface declared in the compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDeclaration {
    pub name: String,
    pub superclass: Option<String>,
    pub interfaces: Vec<String>,
    pub is_interface: bool,
}

/// Contract the typer requires from the type catalog.
pub trait TypeLookup {
    /// Resolves a type name as written in source. `None` means unknown.
    fn resolve(&self, name: &str) -> Option<TypeInfo>;

    /// `true` if a value of `subtype` may be used where `candidate_supertype` is expected.
    fn is_parent(&self, candidate_supertype: &TypeInfo, subtype: &TypeInfo) -> bool;

    /// Makes a class declared in the compilation unit resolvable.
    fn define_type(&mut self, declaration: TypeDeclaration) -> TypeInfo;

    /// Direct superclass, preserving meta-ness. `None` at the root of the hierarchy.
    fn superclass(&self, ty: &TypeInfo) -> Option<TypeInfo>;

    /// Return type of a method the catalog itself knows about (library
    /// classes, operators on primitives).
    fn method_type(&self, target: &TypeInfo, name: &str, arguments: &[TypeInfo])
    -> Option<TypeInfo>;

    /// The "no value" sentinel.
    fn no_type(&self) -> TypeInfo {
        TypeInfo::void()
    }

    /// The "never completes" sentinel.
    fn unreachable_type(&self) -> TypeInfo {
        TypeInfo::unreachable()
    }
}

#[derive(Debug, Clone)]
struct ClassEntry {
    superclass: Option<String>,
    interfaces: Vec<String>,
    is_interface: bool,
}

#[derive(Debug, Clone)]
struct LibraryMethod {
    parameters: Vec<TypeInfo>,
    return_type: TypeInfo,
}

#[derive(Debug, Clone)]
pub struct ClassCatalog {
    classes: FxHashMap<String, ClassEntry>,
    aliases: FxHashMap<String, String>,
    methods: FxHashMap<(TypeInfo, String), Vec<LibraryMethod>>,
}

impl Default for ClassCatalog {
    fn default() -> Self {
        let mut catalog = Self {
            classes: FxHashMap::default(),
            aliases: FxHashMap::default(),
            methods: FxHashMap::default(),
        };
        catalog.init_builtin_classes();
        catalog
    }
}

impl ClassCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn init_builtin_classes(&mut self) {
        const BUILTINS: &[(&str, Option<&str>, &[&str], bool)] = &[
            (OBJECT, None, &[], false),
            ("java.lang.CharSequence", None, &[], true),
            (STRING, Some(OBJECT), &["java.lang.CharSequence"], false),
            ("java.lang.Throwable", Some(OBJECT), &[], false),
            ("java.lang.Exception", Some("java.lang.Throwable"), &[], false),
            (
                "java.lang.RuntimeException",
                Some("java.lang.Exception"),
                &[],
                false,
            ),
        ];
        for (name, superclass, interfaces, is_interface) in BUILTINS {
            self.classes.insert(
                (*name).to_string(),
                ClassEntry {
                    superclass: superclass.map(str::to_string),
                    interfaces: interfaces.iter().map(|i| (*i).to_string()).collect(),
                    is_interface: *is_interface,
                },
            );
            if let Some(short) = name.strip_prefix("java.lang.") {
                self.aliases.insert(short.to_string(), (*name).to_string());
            }
        }
    }

    /// Registers a library class the catalog should know about.
    #[must_use]
    pub fn with_class(mut self, name: &str, superclass: Option<&str>) -> Self {
        self.define_type(TypeDeclaration {
            name: name.to_string(),
            superclass: superclass.map(str::to_string),
            interfaces: vec![],
            is_interface: false,
        });
        self
    }

    /// Registers a library method. Use a meta `owner` for static methods.
    #[must_use]
    pub fn with_method(
        mut self,
        owner: &TypeInfo,
        name: &str,
        parameters: Vec<TypeInfo>,
        return_type: TypeInfo,
    ) -> Self {
        self.methods
            .entry((owner.clone(), name.to_string()))
            .or_default()
            .push(LibraryMethod {
                parameters,
                return_type,
            });
        self
    }

    fn canonical<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.classes.contains_key(name) {
            return Some(name);
        }
        self.aliases.get(name).map(String::as_str)
    }

    /// Every class and interface `name` extends or implements, transitively.
    fn ancestors(&self, name: &str) -> FxHashSet<String> {
        let mut seen = FxHashSet::default();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            let Some(entry) = self
                .canonical(&current)
                .and_then(|canonical| self.classes.get(canonical))
            else {
                continue;
            };
            for parent in entry.superclass.iter().chain(entry.interfaces.iter()) {
                let parent = self.canonical(parent).unwrap_or(parent).to_string();
                if seen.insert(parent.clone()) {
                    stack.push(parent);
                }
            }
        }
        seen
    }

    fn is_interface(&self, name: &str) -> bool {
        self.canonical(name)
            .and_then(|canonical| self.classes.get(canonical))
            .is_some_and(|entry| entry.is_interface)
    }

    fn primitive_operator(
        target: PrimitiveType,
        name: &str,
        argument: &TypeInfo,
    ) -> Option<TypeInfo> {
        let argument = argument.as_primitive()?;
        match name {
            "+" | "-" | "*" | "/" | "%" if target.is_numeric() && argument.is_numeric() => {
                Some(TypeInfo::primitive(binary_promotion(target, argument)))
            }
            "<" | ">" | "<=" | ">=" if target.is_numeric() && argument.is_numeric() => {
                Some(TypeInfo::boolean())
            }
            "==" | "!=" if target.is_numeric() == argument.is_numeric() => {
                Some(TypeInfo::boolean())
            }
            "&" | "|" | "^" if target == PrimitiveType::Boolean && argument == target => {
                Some(TypeInfo::boolean())
            }
            _ => None,
        }
    }
}

/// JVM binary numeric promotion.
fn binary_promotion(left: PrimitiveType, right: PrimitiveType) -> PrimitiveType {
    [PrimitiveType::Double, PrimitiveType::Float, PrimitiveType::Long]
        .into_iter()
        .find(|wide| left == *wide || right == *wide)
        .unwrap_or(PrimitiveType::Int)
}

impl TypeLookup for ClassCatalog {
    fn resolve(&self, name: &str) -> Option<TypeInfo> {
        if let Some(element) = name.strip_suffix("[]") {
            return self.resolve(element).map(TypeInfo::array);
        }
        if let Some(builtin) = TypeInfo::from_builtin_str(name) {
            return Some(builtin);
        }
        self.canonical(name).map(TypeInfo::object)
    }

    fn is_parent(&self, candidate_supertype: &TypeInfo, subtype: &TypeInfo) -> bool {
        if candidate_supertype == subtype || subtype.is_unreachable() {
            return true;
        }
        if candidate_supertype.meta || subtype.meta {
            return candidate_supertype.meta
                && subtype.meta
                && self.is_parent(&candidate_supertype.unmeta(), &subtype.unmeta());
        }
        match (&candidate_supertype.kind, &subtype.kind) {
            (TypeInfoKind::Primitive(sup), TypeInfoKind::Primitive(sub)) => sub.widens_to(*sup),
            (TypeInfoKind::Object(_) | TypeInfoKind::Array(_), TypeInfoKind::Null) => true,
            (TypeInfoKind::Object(sup), TypeInfoKind::Array(_)) => {
                self.canonical(sup) == Some(OBJECT)
            }
            (TypeInfoKind::Object(sup), TypeInfoKind::Object(sub)) => {
                let sup = self.canonical(sup).unwrap_or(sup);
                sup == OBJECT || self.ancestors(sub).contains(sup)
            }
            (TypeInfoKind::Array(sup), TypeInfoKind::Array(sub)) => {
                sup.is_reference() && sub.is_reference() && self.is_parent(sup, sub)
            }
            _ => false,
        }
    }

    fn define_type(&mut self, declaration: TypeDeclaration) -> TypeInfo {
        let superclass = match declaration.superclass {
            Some(superclass) => Some(superclass),
            None if declaration.is_interface => None,
            None => Some(OBJECT.to_string()),
        };
        let ty = TypeInfo::object(&declaration.name);
        self.classes.insert(
            declaration.name,
            ClassEntry {
                superclass,
                interfaces: declaration.interfaces,
                is_interface: declaration.is_interface,
            },
        );
        ty
    }

    fn superclass(&self, ty: &TypeInfo) -> Option<TypeInfo> {
        let parent = match &ty.kind {
            TypeInfoKind::Object(name) => {
                let canonical = self.canonical(name)?;
                let entry = self.classes.get(canonical)?;
                match &entry.superclass {
                    Some(superclass) => self.resolve(superclass)?,
                    None if entry.is_interface || self.is_interface(name) => {
                        TypeInfo::object(OBJECT)
                    }
                    None => return None,
                }
            }
            TypeInfoKind::Array(_) => TypeInfo::object(OBJECT),
            _ => return None,
        };
        Some(if ty.meta { parent.meta() } else { parent })
    }

    fn method_type(
        &self,
        target: &TypeInfo,
        name: &str,
        arguments: &[TypeInfo],
    ) -> Option<TypeInfo> {
        if let Some(known) = self
            .methods
            .get(&(target.clone(), name.to_string()))
            .and_then(|overloads| {
                overloads.iter().find(|method| {
                    method.parameters.len() == arguments.len()
                        && method
                            .parameters
                            .iter()
                            .zip(arguments)
                            .all(|(param, arg)| self.is_parent(param, arg))
                })
            })
        {
            return Some(known.return_type.clone());
        }

        if let Some(primitive) = target.as_primitive() {
            return match arguments {
                [argument] => Self::primitive_operator(primitive, name, argument),
                _ => None,
            };
        }

        if target.meta || !target.is_reference() {
            return None;
        }
        match (name, arguments) {
            ("+", [argument]) if target.class_name() == Some(STRING) && !argument.is_void() => {
                Some(TypeInfo::object(STRING))
            }
            ("toString", []) => Some(TypeInfo::object(STRING)),
            ("hashCode", []) => Some(TypeInfo::int()),
            ("equals", [argument]) if argument.is_reference() => Some(TypeInfo::boolean()),
            ("==" | "!=", [argument]) if argument.is_reference() => Some(TypeInfo::boolean()),
            _ => None,
        }
    }
}
