//! The inference engine.
//!
//! [`Typer::infer`] is the single entry point every rule goes through:
//!
//! 1. a memoized type is returned as is;
//! 2. otherwise the node's rule runs, inferring whatever it depends on;
//! 3. a rule that is missing a dependency yields `None` and the node is
//!    put on the deferral worklist; a rule that succeeds has its type
//!    memoized.
//!
//! [`Typer::resolve`] then re-drives the worklist pass after pass until a
//! pass makes no progress. Whatever is still pending at that point can
//! never resolve and is reported all at once.
//!
//! Method and argument rules live in `method.rs`.

use std::collections::VecDeque;

use duby_ast::arena::Arena;
use duby_ast::nodes::{
    Call, FunctionalCall, If, Location, LocalAssignment, NodeId, NodeKind, Script,
};
use rustc_hash::FxHashSet;
use tracing::{debug, info, trace, warn};

use crate::config::TyperConfig;
use crate::errors::{TypeCheckError, TypeMismatchContext, UnresolvedNode};
use crate::macros::{MacroExpander, NoMacros};
use crate::signature_table::MethodType;
use crate::type_info::{TypeInfo, TypeInfoKind};
use crate::type_lookup::{ClassCatalog, STRING, TypeDeclaration, TypeLookup};
use crate::typed_context::TypedContext;

pub(crate) type InferResult = Result<Option<TypeInfo>, TypeCheckError>;

pub struct Typer {
    pub(crate) ctx: TypedContext,
    pub(crate) lookup: Box<dyn TypeLookup>,
    macros: Box<dyn MacroExpander>,
    config: TyperConfig,
    worklist: VecDeque<NodeId>,
    deferred: FxHashSet<NodeId>,
    /// Set for the duration of one last-chance pass.
    last_chance: bool,
    passes: usize,
    /// Classes that declare at least one constructor; the others get an
    /// implicit no-argument one.
    pub(crate) declared_constructors: FxHashSet<TypeInfo>,
}

impl Typer {
    #[must_use]
    pub fn new(arena: Arena) -> Self {
        Self {
            ctx: TypedContext::new(arena),
            lookup: Box::new(ClassCatalog::new()),
            macros: Box::new(NoMacros),
            config: TyperConfig::default(),
            worklist: VecDeque::new(),
            deferred: FxHashSet::default(),
            last_chance: false,
            passes: 0,
            declared_constructors: FxHashSet::default(),
        }
    }

    #[must_use]
    pub fn with_lookup(mut self, lookup: Box<dyn TypeLookup>) -> Self {
        self.lookup = lookup;
        self
    }

    #[must_use]
    pub fn with_macros(mut self, macros: Box<dyn MacroExpander>) -> Self {
        self.macros = macros;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: TyperConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn context(&self) -> &TypedContext {
        &self.ctx
    }

    #[must_use]
    pub fn into_context(self) -> TypedContext {
        self.ctx
    }

    #[must_use]
    pub fn lookup(&self) -> &dyn TypeLookup {
        self.lookup.as_ref()
    }

    /// Nodes currently on the deferral worklist, in queue order.
    #[must_use]
    pub fn pending(&self) -> Vec<NodeId> {
        self.worklist.iter().copied().collect()
    }

    /// Number of driver passes run so far.
    #[must_use]
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Infers every tree in the arena and drives the worklist to a fixpoint.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, or [`TypeCheckError::CannotInfer`]
    /// listing every node still unresolved at the fixpoint.
    pub fn infer_types(&mut self) -> Result<(), TypeCheckError> {
        self.register_types()?;
        let roots: Vec<NodeId> = self
            .ctx
            .filter_nodes(|node| node.parent.is_none())
            .into_iter()
            .map(|node| node.id)
            .collect();
        for root in roots {
            self.infer(root)?;
        }
        self.resolve()
    }

    /// Makes every class and interface of the compilation unit known to the
    /// type lookup service, then resolves every declared signature, before
    /// any body is inferred. Fully declared methods are callable from then
    /// on. [`Typer::infer_types`] runs this first; call it directly when
    /// driving [`Typer::infer`] by hand.
    ///
    /// # Errors
    ///
    /// Returns [`TypeCheckError::UnknownType`] for an undeclared type name
    /// in a signature, or an invariant violation for a constructor outside
    /// any class.
    pub fn register_types(&mut self) -> Result<(), TypeCheckError> {
        let mut declarations = Vec::new();
        let mut constructors = Vec::new();
        let mut methods = Vec::new();
        for node in self.ctx.filter_nodes(|_| true) {
            match &node.kind {
                NodeKind::ClassDefinition(class) => declarations.push(TypeDeclaration {
                    name: class.name.clone(),
                    superclass: class.superclass.clone(),
                    interfaces: class.interfaces.clone(),
                    is_interface: false,
                }),
                NodeKind::InterfaceDeclaration(interface) => declarations.push(TypeDeclaration {
                    name: interface.name.clone(),
                    superclass: None,
                    interfaces: interface.interfaces.clone(),
                    is_interface: true,
                }),
                NodeKind::MethodDefinition(method) => {
                    if method.is_constructor() {
                        constructors.push(node.id);
                    }
                    methods.push((node.id, method.clone()));
                }
                _ => {}
            }
        }
        for declaration in declarations {
            let ty = self.lookup.define_type(declaration);
            debug!(class = %ty, "registered type");
        }
        for constructor in constructors {
            let class = self.lexical_class(constructor)?;
            self.declared_constructors.insert(class);
        }
        for (id, method) in methods {
            self.infer_signature(id, &method)?;
        }
        Ok(())
    }

    /// Infers `id`, memoizing the result, or defers it.
    ///
    /// Returns `Ok(None)` when a dependency is still unknown; the node is
    /// then on the worklist. Calling this again on a resolved node returns
    /// the same type and has no other effect.
    ///
    /// # Errors
    ///
    /// Returns an error for type mismatches, conflicting facts and broken trees.
    pub fn infer(&mut self, id: NodeId) -> Result<Option<TypeInfo>, TypeCheckError> {
        if let Some(ty) = self.ctx.get_node_typeinfo(id) {
            return Ok(Some(ty));
        }
        if let Some(expansion) = self.ctx.expansion_of(id) {
            let expanded = self.infer(expansion)?;
            return self.remember(id, expanded);
        }
        let node = self.ctx.arena().node(id)?.clone();
        trace!(node = id, kind = node.kind.kind_name(), "infer");
        let inferred = match &node.kind {
            NodeKind::Script(script) => self.infer_script(script)?,
            NodeKind::ClassDefinition(class) => self
                .infer_optional(class.body)?
                .map(|_| TypeInfo::object(&class.name)),
            NodeKind::InterfaceDeclaration(interface) => self
                .infer_optional(interface.body)?
                .map(|_| TypeInfo::object(&interface.name)),
            NodeKind::MethodDefinition(method) => self.infer_method_definition(id, method)?,
            NodeKind::Arguments(_) => self.infer_arguments(id)?.map(|_| TypeInfo::void()),
            NodeKind::RequiredArgument(argument) => {
                self.infer_required_argument(id, &argument.name)?
            }
            NodeKind::OptionalArgument(argument) => self.infer_optional_argument(id, argument)?,
            NodeKind::RestArgument(argument) => self.infer_required_argument(id, &argument.name)?,
            NodeKind::BlockArgument(_) => {
                return Err(TypeCheckError::invariant(format!(
                    "block argument {id} is structural and has no type"
                )));
            }
            NodeKind::Block(block) => {
                let arguments = self.infer(block.arguments)?;
                let body = self.infer_optional(block.body)?;
                arguments.and(body)
            }
            NodeKind::Body(body) => self.infer_body(&body.statements)?,
            NodeKind::Noop => Some(TypeInfo::void()),
            NodeKind::Fixnum(_) => Some(TypeInfo::int()),
            NodeKind::Float(_) => Some(TypeInfo::primitive(
                crate::type_info::PrimitiveType::Double,
            )),
            NodeKind::Str(_) => Some(TypeInfo::object(STRING)),
            NodeKind::Boolean(_) => Some(TypeInfo::boolean()),
            NodeKind::Null => Some(TypeInfo::null()),
            NodeKind::SelfRef => Some(self.self_type(id)?),
            NodeKind::Local(local) => {
                let scope = self.scope_of(id)?;
                self.local_type(scope, &local.name)
            }
            NodeKind::LocalAssignment(assignment) => {
                self.infer_local_assignment(id, assignment, &node.location)?
            }
            NodeKind::FunctionalCall(call) => self.infer_functional_call(id, call)?,
            NodeKind::Call(call) => self.infer_call(id, call)?,
            NodeKind::Super(super_call) => self
                .infer_all(&super_call.parameters)?
                .map(|_| TypeInfo::void()),
            NodeKind::Constant(constant) => self.lookup.resolve(&constant.name).map(|ty| ty.meta()),
            NodeKind::If(if_node) => self.infer_if(if_node, &node.location)?,
            NodeKind::Return(ret) => self.infer_optional(ret.value)?,
            NodeKind::Raise(raise) => self
                .infer(raise.exception)?
                .map(|_| self.lookup.unreachable_type()),
        };
        self.remember(id, inferred)
    }

    fn remember(&mut self, id: NodeId, inferred: Option<TypeInfo>) -> InferResult {
        match inferred {
            Some(ty) => {
                self.ctx.set_node_typeinfo(id, ty.clone());
                Ok(Some(ty))
            }
            None => {
                self.defer(id);
                Ok(None)
            }
        }
    }

    /// Puts `id` on the worklist for the next pass. Deferring a node twice
    /// in one pass keeps a single entry.
    pub fn defer(&mut self, id: NodeId) {
        if self.deferred.insert(id) {
            debug!(node = id, "deferred");
            self.worklist.push_back(id);
        }
    }

    /// Re-drives deferred nodes until the worklist is empty or a pass makes
    /// no progress.
    ///
    /// A pass without progress is followed by one last-chance pass, in
    /// which an `if` with one resolved branch takes that branch's type.
    /// This is what lets recursive methods without declared return types
    /// resolve. Only a last-chance pass without progress is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`TypeCheckError::CannotInfer`] at the fixpoint,
    /// [`TypeCheckError::PassLimitExceeded`] when the configured limit is
    /// hit, or any error raised while re-inferring a node.
    pub fn resolve(&mut self) -> Result<(), TypeCheckError> {
        loop {
            if self.worklist.is_empty() {
                info!(passes = self.passes, "inference complete");
                return Ok(());
            }
            if let Some(limit) = self.config.max_passes
                && self.passes >= limit
            {
                warn!(limit, pending = self.worklist.len(), "pass limit reached");
                return Err(TypeCheckError::PassLimitExceeded { limit });
            }
            self.passes += 1;
            let pending: Vec<NodeId> = self.worklist.drain(..).collect();
            self.deferred.clear();
            for &id in &pending {
                self.infer(id)?;
            }
            let resolved = pending
                .iter()
                .filter(|id| self.ctx.has_node_typeinfo(**id))
                .count();
            info!(
                pass = self.passes,
                pending = pending.len(),
                resolved,
                last_chance = self.last_chance,
                "inference pass"
            );
            if resolved > 0 {
                self.last_chance = false;
                continue;
            }
            if self.config.last_chance && !self.last_chance {
                warn!(
                    pending = self.worklist.len(),
                    "no progress, retrying with last-chance typing"
                );
                self.last_chance = true;
                continue;
            }
            return Err(self.unresolved_error());
        }
    }

    fn unresolved_error(&self) -> TypeCheckError {
        let mut ids: Vec<NodeId> = self.worklist.iter().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        let unresolved: Vec<UnresolvedNode> = ids
            .into_iter()
            .filter_map(|id| self.ctx.arena().find_node(id))
            .map(|node| UnresolvedNode {
                id: node.id,
                description: node.describe(),
                location: node.location.clone(),
            })
            .collect();
        for node in &unresolved {
            warn!(node = node.id, "could not infer type of {node}");
        }
        TypeCheckError::CannotInfer { unresolved }
    }

    /// Binds local `name` as seen from scope node `scope`.
    ///
    /// Closures write through to the scope that already owns the name. An
    /// existing binding is kept when the new type is equal to it or a
    /// subtype of it; anything else is a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`TypeCheckError::ConflictingLocalType`] on a conflict.
    pub fn learn_local_type(
        &mut self,
        scope: NodeId,
        name: &str,
        ty: TypeInfo,
    ) -> Result<TypeInfo, TypeCheckError> {
        let location = self.location(scope)?;
        self.learn_local_type_at(scope, name, ty, scope, &location)
    }

    pub(crate) fn learn_local_type_at(
        &mut self,
        scope: NodeId,
        name: &str,
        ty: TypeInfo,
        node: NodeId,
        location: &Location,
    ) -> Result<TypeInfo, TypeCheckError> {
        let target = self.ctx.scopes.binding_scope(self.ctx.arena(), scope, name);
        match self.ctx.scopes.lookup_local(target, name).cloned() {
            Some(existing) if existing == ty || self.lookup.is_parent(&existing, &ty) => {
                Ok(existing)
            }
            Some(existing) => Err(TypeCheckError::ConflictingLocalType {
                name: name.to_string(),
                existing,
                found: ty,
                location: location.clone(),
            }),
            None => {
                debug!(scope = target, name, ty = %ty, "learned local");
                self.ctx.scopes.insert_variable(target, name, node, ty.clone());
                Ok(ty)
            }
        }
    }

    /// Type of local `name` as seen from scope node `scope`, if known yet.
    #[must_use]
    pub fn local_type(&self, scope: NodeId, name: &str) -> Option<TypeInfo> {
        self.ctx.local_type(scope, name)
    }

    /// Records a method type for call sites to find.
    ///
    /// # Errors
    ///
    /// Returns [`TypeCheckError::ConflictingMethodType`] when the same
    /// class, name and parameters already resolved to another return type.
    pub fn learn_method_type(
        &mut self,
        method: MethodType,
    ) -> Result<TypeInfo, TypeCheckError> {
        self.learn_method_type_at(method, &Location::default())
    }

    pub(crate) fn learn_method_type_at(
        &mut self,
        method: MethodType,
        location: &Location,
    ) -> Result<TypeInfo, TypeCheckError> {
        let class = method.defining_class.clone();
        let name = method.name.clone();
        let found = method.return_type.clone();
        match self.ctx.methods.learn(method) {
            Ok(learned) => {
                debug!(class = %class, name = %name, ty = %learned.return_type, "learned method");
                Ok(learned.return_type)
            }
            Err(existing) => Err(TypeCheckError::ConflictingMethodType {
                class,
                name,
                existing: existing.return_type,
                found,
                location: location.clone(),
            }),
        }
    }

    /// Finds the method a call on `receiver` with these argument types
    /// would invoke. Looks at learned methods, then the type lookup
    /// service, then the superclass, and so on up the hierarchy.
    ///
    /// # Errors
    ///
    /// Returns [`TypeCheckError::AmbiguousMethod`] when several overloads
    /// apply and none is most specific.
    pub fn method_type(
        &self,
        receiver: &TypeInfo,
        name: &str,
        arguments: &[TypeInfo],
    ) -> Result<Option<MethodType>, TypeCheckError> {
        self.find_method(receiver, name, arguments, &Location::default())
    }

    pub(crate) fn find_method(
        &self,
        receiver: &TypeInfo,
        name: &str,
        arguments: &[TypeInfo],
        location: &Location,
    ) -> Result<Option<MethodType>, TypeCheckError> {
        let mut visited = FxHashSet::default();
        let mut current = Some(receiver.clone());
        while let Some(class) = current {
            if !visited.insert(class.clone()) {
                break;
            }
            if let Some(found) = self.declared_method(&class, name, arguments, location)? {
                return Ok(Some(found));
            }
            current = self.lookup.superclass(&class);
        }
        Ok(None)
    }

    /// The constructor `Foo.new(args)` or an `initialize(args)` delegation
    /// invokes. Constructors are not inherited, so only `class` itself is
    /// searched.
    pub(crate) fn find_constructor(
        &self,
        class: &TypeInfo,
        arguments: &[TypeInfo],
        location: &Location,
    ) -> Result<Option<MethodType>, TypeCheckError> {
        self.declared_method(class, "initialize", arguments, location)
    }

    /// Learned overloads of `class`, then the type lookup service. No
    /// superclass walk.
    fn declared_method(
        &self,
        class: &TypeInfo,
        name: &str,
        arguments: &[TypeInfo],
        location: &Location,
    ) -> Result<Option<MethodType>, TypeCheckError> {
        if let Some(found) = self.select_overload(class, name, arguments, location)? {
            return Ok(Some(found));
        }
        Ok(self
            .lookup
            .method_type(class, name, arguments)
            .map(|return_type| MethodType {
                defining_class: class.clone(),
                name: name.to_string(),
                parameters: arguments.to_vec(),
                return_type,
                throws: vec![],
                varargs: false,
            }))
    }

    fn select_overload(
        &self,
        class: &TypeInfo,
        name: &str,
        arguments: &[TypeInfo],
        location: &Location,
    ) -> Result<Option<MethodType>, TypeCheckError> {
        let overloads = self.ctx.methods.overloads(class, name);
        if let Some(exact) = overloads.iter().find(|m| m.parameters == arguments) {
            return Ok(Some(exact.clone()));
        }
        let fixed: Vec<&MethodType> = overloads
            .iter()
            .filter(|method| self.accepts(&method.parameters, arguments))
            .collect();
        let applicable = if fixed.is_empty() {
            let spread: Vec<&MethodType> = overloads
                .iter()
                .filter(|method| self.accepts_spread(method, arguments))
                .collect();
            let longest = spread.iter().map(|method| method.parameters.len()).max();
            spread
                .into_iter()
                .filter(|method| Some(method.parameters.len()) == longest)
                .collect()
        } else {
            fixed
        };
        match applicable.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some((*only).clone())),
            candidates => candidates
                .iter()
                .find(|candidate| {
                    candidates
                        .iter()
                        .all(|other| self.accepts(&other.parameters, &candidate.parameters))
                })
                .map(|most_specific| Some((*most_specific).clone()))
                .ok_or_else(|| TypeCheckError::AmbiguousMethod {
                    type_name: class.to_string(),
                    method_name: name.to_string(),
                    arguments: arguments
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                    location: location.clone(),
                }),
        }
    }

    fn accepts(&self, parameters: &[TypeInfo], arguments: &[TypeInfo]) -> bool {
        parameters.len() == arguments.len()
            && parameters
                .iter()
                .zip(arguments)
                .all(|(param, arg)| self.lookup.is_parent(param, arg))
    }

    /// Whether a varargs method takes these arguments as its leading
    /// parameters followed by any number of rest array elements. Such a
    /// match is only tried when no overload takes the arguments as they are.
    fn accepts_spread(&self, method: &MethodType, arguments: &[TypeInfo]) -> bool {
        let Some((rest, leading)) = method.parameters.split_last().filter(|_| method.varargs)
        else {
            return false;
        };
        let TypeInfoKind::Array(element) = &rest.kind else {
            return false;
        };
        arguments.len() >= leading.len()
            && self.accepts(leading, &arguments[..leading.len()])
            && arguments[leading.len()..]
                .iter()
                .all(|arg| self.lookup.is_parent(element, arg))
    }

    /// The type `self` has at node `id`.
    ///
    /// Inside a class or interface that is the class type; inside a
    /// static method, its meta type. Top-level code and methods defined
    /// at script level run on the script class's meta type.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation if `id` is not inside a script or class.
    pub fn self_type(&self, id: NodeId) -> Result<TypeInfo, TypeCheckError> {
        let arena = self.ctx.arena();
        let mut static_context = false;
        for node in std::iter::once(arena.node(id)?).chain(arena.ancestors(id)) {
            let class = match &node.kind {
                NodeKind::MethodDefinition(method) if method.is_static() => {
                    static_context = true;
                    continue;
                }
                NodeKind::ClassDefinition(class) => TypeInfo::object(&class.name),
                NodeKind::InterfaceDeclaration(interface) => TypeInfo::object(&interface.name),
                NodeKind::Script(script) => return Ok(self.script_type(script).meta()),
                _ => continue,
            };
            return Ok(if static_context { class.meta() } else { class });
        }
        Err(TypeCheckError::invariant(format!(
            "node {id} is not inside a script or class"
        )))
    }

    /// Class owning a method definition, ignoring `static`.
    pub(crate) fn lexical_class(&self, method: NodeId) -> Result<TypeInfo, TypeCheckError> {
        let parent = self.ctx.arena().find_parent_node(method).ok_or_else(|| {
            TypeCheckError::invariant(format!("method {method} has no parent"))
        })?;
        self.self_type(parent)
    }

    fn script_type(&self, script: &Script) -> TypeInfo {
        if script.name.is_empty() {
            TypeInfo::object(&self.config.script_class)
        } else {
            TypeInfo::object(&script.name)
        }
    }

    /// Nearest scope node at or above `id`.
    /// The scope whose bindings a scoped node (a local, an assignment, an
    /// argument) reads or writes.
    pub(crate) fn scope_of(&self, id: NodeId) -> Result<NodeId, TypeCheckError> {
        let node = self.ctx.arena().node(id)?;
        if !node.kind.is_scoped() {
            return Err(TypeCheckError::invariant(format!(
                "{} {id} does not bind locals",
                node.kind.kind_name()
            )));
        }
        self.ctx.arena().enclosing_scope(id).ok_or_else(|| {
            TypeCheckError::invariant(format!("node {id} has no enclosing scope"))
        })
    }

    pub(crate) fn location(&self, id: NodeId) -> Result<Location, TypeCheckError> {
        Ok(self.ctx.arena().node(id)?.location.clone())
    }

    pub(crate) fn infer_optional(&mut self, id: Option<NodeId>) -> InferResult {
        match id {
            Some(id) => self.infer(id),
            None => Ok(Some(self.lookup.no_type())),
        }
    }

    /// Infers every node, even after one is found pending, so that each
    /// pass learns as much as it can.
    pub(crate) fn infer_all(
        &mut self,
        ids: &[NodeId],
    ) -> Result<Option<Vec<TypeInfo>>, TypeCheckError> {
        let mut types = Vec::with_capacity(ids.len());
        let mut complete = true;
        for id in ids {
            match self.infer(*id)? {
                Some(ty) => types.push(ty),
                None => complete = false,
            }
        }
        Ok(complete.then_some(types))
    }

    fn infer_script(&mut self, script: &Script) -> InferResult {
        self.infer_optional(script.body)
    }

    fn infer_body(&mut self, statements: &[NodeId]) -> InferResult {
        Ok(self.infer_all(statements)?.map(|types| {
            types
                .into_iter()
                .last()
                .unwrap_or_else(|| self.lookup.no_type())
        }))
    }

    fn infer_local_assignment(
        &mut self,
        id: NodeId,
        assignment: &LocalAssignment,
        location: &Location,
    ) -> InferResult {
        let Some(value) = self.infer(assignment.value)? else {
            return Ok(None);
        };
        let scope = self.scope_of(id)?;
        self.learn_local_type_at(scope, &assignment.name, value, id, location)
            .map(Some)
    }

    fn infer_functional_call(&mut self, id: NodeId, call: &FunctionalCall) -> InferResult {
        let receiver = self.self_type(id)?;
        let parameters = self.infer_all(&call.parameters)?;
        let block = self.infer_block_of(call.block)?;
        match (parameters, block) {
            (Some(parameters), true) => self.resolve_call(id, &receiver, &call.name, &parameters),
            _ => Ok(None),
        }
    }

    fn infer_call(&mut self, id: NodeId, call: &Call) -> InferResult {
        let target = self.infer(call.target)?;
        let parameters = self.infer_all(&call.parameters)?;
        let block = self.infer_block_of(call.block)?;
        let (Some(target), Some(parameters), true) = (target, parameters, block) else {
            return Ok(None);
        };
        if call.name == "new" && target.is_meta() {
            return self.infer_instantiation(id, &target.unmeta(), &parameters);
        }
        self.resolve_call(id, &target, &call.name, &parameters)
    }

    fn infer_block_of(&mut self, block: Option<NodeId>) -> Result<bool, TypeCheckError> {
        match block {
            Some(block) => Ok(self.infer(block)?.is_some()),
            None => Ok(true),
        }
    }

    /// `Foo.new(args)`: resolves a constructor, yields an instance of `Foo`.
    fn infer_instantiation(
        &mut self,
        id: NodeId,
        instance: &TypeInfo,
        parameters: &[TypeInfo],
    ) -> InferResult {
        let location = self.location(id)?;
        if self
            .find_constructor(instance, parameters, &location)?
            .is_some()
        {
            return Ok(Some(instance.clone()));
        }
        let implicit = parameters.is_empty() && !self.declared_constructors.contains(instance);
        Ok(implicit.then(|| instance.clone()))
    }

    fn resolve_call(
        &mut self,
        id: NodeId,
        receiver: &TypeInfo,
        name: &str,
        parameters: &[TypeInfo],
    ) -> InferResult {
        let location = self.location(id)?;
        if let Some(method) = self.find_method(receiver, name, parameters, &location)? {
            return Ok(Some(method.return_type));
        }
        let Some(expansion) = self.macros.expand(self.ctx.arena_mut(), id, receiver) else {
            return Ok(None);
        };
        let parent = self.ctx.arena().find_parent_node(id).ok_or_else(|| {
            TypeCheckError::invariant(format!("call {id} has no parent to expand into"))
        })?;
        self.ctx.arena_mut().replace_child(parent, id, expansion)?;
        self.ctx.expansions.insert(id, expansion);
        debug!(call = id, expansion, name, "expanded macro");
        self.infer(expansion)
    }

    fn infer_if(&mut self, if_node: &If, location: &Location) -> InferResult {
        let condition = self.infer(if_node.condition)?;
        let then_type = self.infer_optional(if_node.then_body)?;
        let Some(else_body) = if_node.else_body else {
            return Ok(condition.and(then_type));
        };
        let else_type = self.infer(else_body)?;
        if condition.is_none() {
            return Ok(None);
        }
        match (then_type, else_type) {
            (Some(then_type), Some(else_type)) => self
                .join_branches(then_type, else_type, location)
                .map(Some),
            (Some(known), None) | (None, Some(known)) if self.last_chance => {
                warn!(ty = %known, "typing `if` from its only resolved branch");
                Ok(Some(known))
            }
            _ => Ok(None),
        }
    }

    fn join_branches(
        &self,
        then_type: TypeInfo,
        else_type: TypeInfo,
        location: &Location,
    ) -> Result<TypeInfo, TypeCheckError> {
        if then_type.is_unreachable() || self.lookup.is_parent(&else_type, &then_type) {
            return Ok(else_type);
        }
        if else_type.is_unreachable() || self.lookup.is_parent(&then_type, &else_type) {
            return Ok(then_type);
        }
        Err(TypeCheckError::TypeMismatch {
            expected: then_type,
            found: else_type,
            context: TypeMismatchContext::Branches,
            location: location.clone(),
        })
    }
}
