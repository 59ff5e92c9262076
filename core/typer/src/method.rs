//! Method, constructor and argument rules.

use duby_ast::nodes::{Arguments, Location, MethodDefinition, NodeId, NodeKind, OptionalArgument};
use tracing::debug;

use crate::errors::{TypeCheckError, TypeMismatchContext};
use crate::signature_table::{MethodType, Signature};
use crate::type_info::TypeInfo;
use crate::typer::{InferResult, Typer};

impl Typer {
    pub(crate) fn infer_method_definition(
        &mut self,
        id: NodeId,
        method: &MethodDefinition,
    ) -> InferResult {
        let location = self.location(id)?;
        let delegation_ready = self.infer_delegation(method)?;
        let lexical = self.bind_defining_class(id)?;
        let defining_class = if method.is_static() {
            lexical.meta()
        } else {
            lexical.clone()
        };
        let signature = self.infer_signature(id, method)?;
        let arguments = self.argument_list(method.arguments)?;
        let body_type = self.infer_optional(method.body)?;

        let (Some(arguments), Some(body_type), true) = (arguments, body_type, delegation_ready)
        else {
            return Ok(None);
        };
        if method.is_constructor() && !self.bind_delegate_target(id, method, &lexical, &location)? {
            return Ok(None);
        }

        let declared = signature.return_type.clone();
        let mut effective = declared.clone().unwrap_or_else(|| body_type.clone());
        if effective.is_unreachable() {
            effective = self.lookup.no_type();
        }
        let check = declared.as_ref().is_some_and(|declared| !declared.is_void());
        if check && !self.is_abstract(id) && !self.lookup.is_parent(&effective, &body_type) {
            return Err(TypeCheckError::TypeMismatch {
                expected: effective,
                found: body_type,
                context: TypeMismatchContext::MethodReturn {
                    method_name: method.name.clone(),
                },
                location,
            });
        }

        let table_return = if method.is_constructor() {
            self.lookup.no_type()
        } else {
            effective.clone()
        };
        let layout = ArgumentLayout::of(&self.arguments_of(method.arguments)?);
        self.learn_overloads(
            &defining_class,
            &method.name,
            &arguments,
            layout,
            &table_return,
            &signature.throws,
            &location,
        )?;
        self.ctx.signatures.set_return_type(id, effective.clone());
        debug!(method = %method.name, class = %defining_class, ty = %effective, "resolved method");
        Ok(Some(effective))
    }

    /// Binds the lexical class of a method definition on first use.
    fn bind_defining_class(&mut self, id: NodeId) -> Result<TypeInfo, TypeCheckError> {
        if let Some(class) = self.ctx.defining_classes.get(&id) {
            return Ok(class.clone());
        }
        let class = self.lexical_class(id)?;
        self.ctx.defining_classes.insert(id, class.clone());
        Ok(class)
    }

    /// A method is abstract when its nearest enclosing scope is an interface.
    fn is_abstract(&self, id: NodeId) -> bool {
        let arena = self.ctx.arena();
        arena
            .find_parent_node(id)
            .and_then(|parent| arena.enclosing_scope(parent))
            .and_then(|scope| arena.find_node(scope))
            .is_some_and(|scope| matches!(scope.kind, NodeKind::InterfaceDeclaration(_)))
    }

    /// Infers delegation arguments, same-class ones first. `true` once all are known.
    fn infer_delegation(&mut self, method: &MethodDefinition) -> Result<bool, TypeCheckError> {
        let mut ready = true;
        for argument in method
            .this_args
            .iter()
            .flatten()
            .chain(method.super_args.iter().flatten())
        {
            ready &= self.infer(*argument)?.is_some();
        }
        Ok(ready)
    }

    /// Finds the constructor an `initialize(...)` delegation calls. `false`
    /// while that constructor is not known yet.
    fn bind_delegate_target(
        &mut self,
        id: NodeId,
        method: &MethodDefinition,
        class: &TypeInfo,
        location: &Location,
    ) -> Result<bool, TypeCheckError> {
        let Some(this_args) = &method.this_args else {
            return Ok(true);
        };
        if self.ctx.delegate_targets.contains_key(&id) {
            return Ok(true);
        }
        let types: Option<Vec<TypeInfo>> = this_args
            .iter()
            .map(|arg| self.ctx.get_node_typeinfo(*arg))
            .collect();
        let Some(types) = types else {
            return Ok(false);
        };
        match self.find_constructor(class, &types, location)? {
            Some(target) => {
                debug!(constructor = id, target = ?target.parameters, "bound delegate constructor");
                self.ctx.delegate_targets.insert(id, target);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Resolves the declared types of a method. Runs once per method;
    /// methods whose parameter and return types are all declared become
    /// callable right away.
    pub(crate) fn infer_signature(
        &mut self,
        id: NodeId,
        method: &MethodDefinition,
    ) -> Result<Signature, TypeCheckError> {
        if let Some(signature) = self.ctx.signatures.get(id) {
            return Ok(signature.clone());
        }
        let location = self.location(id)?;
        let declared = &method.signature;
        let mut signature = Signature::default();
        for (name, type_name) in &declared.parameters {
            let ty = self.resolve_declared(type_name, &location)?;
            signature.parameters.insert(name.clone(), ty);
        }
        signature.return_type = declared
            .returns
            .as_deref()
            .map(|type_name| self.resolve_declared(type_name, &location))
            .transpose()?;
        signature.throws = declared
            .throws
            .iter()
            .map(|type_name| self.resolve_declared(type_name, &location))
            .collect::<Result<_, _>>()?;
        self.ctx.signatures.insert(id, signature.clone());
        self.register_declared_method(id, method, &signature, &location)?;
        Ok(signature)
    }

    fn register_declared_method(
        &mut self,
        id: NodeId,
        method: &MethodDefinition,
        signature: &Signature,
        location: &Location,
    ) -> Result<(), TypeCheckError> {
        let return_type = match (&signature.return_type, method.is_constructor()) {
            (_, true) => self.lookup.no_type(),
            (Some(return_type), false) if !return_type.is_unreachable() => return_type.clone(),
            _ => return Ok(()),
        };
        let arguments = self.arguments_of(method.arguments)?;
        let parameters: Option<Vec<TypeInfo>> = self
            .argument_names(&arguments)?
            .iter()
            .map(|name| signature.parameter(name).cloned())
            .collect();
        let Some(parameters) = parameters else {
            return Ok(());
        };
        let lexical = self.bind_defining_class(id)?;
        let defining_class = if method.is_static() {
            lexical.meta()
        } else {
            lexical
        };
        self.learn_overloads(
            &defining_class,
            &method.name,
            &parameters,
            ArgumentLayout::of(&arguments),
            &return_type,
            &signature.throws,
            location,
        )
    }

    /// Learns one method type per way of calling the method: every
    /// trailing optional argument may be left out. A rest argument stays
    /// last in each of them.
    #[allow(clippy::too_many_arguments)]
    fn learn_overloads(
        &mut self,
        defining_class: &TypeInfo,
        name: &str,
        parameters: &[TypeInfo],
        layout: ArgumentLayout,
        return_type: &TypeInfo,
        throws: &[TypeInfo],
        location: &Location,
    ) -> Result<(), TypeCheckError> {
        let positional = layout.required + layout.optional;
        if parameters.len() != positional + usize::from(layout.rest) {
            return Err(TypeCheckError::invariant(format!(
                "method `{name}` has {} parameter types for {positional} positional arguments",
                parameters.len()
            )));
        }
        let rest = &parameters[positional..];
        for given in layout.required..=positional {
            self.learn_method_type_at(
                MethodType {
                    defining_class: defining_class.clone(),
                    name: name.to_string(),
                    parameters: parameters[..given].iter().chain(rest).cloned().collect(),
                    return_type: return_type.clone(),
                    throws: throws.to_vec(),
                    varargs: layout.rest,
                },
                location,
            )?;
        }
        Ok(())
    }

    fn resolve_declared(
        &self,
        type_name: &str,
        location: &Location,
    ) -> Result<TypeInfo, TypeCheckError> {
        self.lookup
            .resolve(type_name)
            .ok_or_else(|| TypeCheckError::UnknownType {
                name: type_name.to_string(),
                location: location.clone(),
            })
    }

    fn arguments_of(&self, id: NodeId) -> Result<Arguments, TypeCheckError> {
        match &self.ctx.arena().node(id)?.kind {
            NodeKind::Arguments(arguments) => Ok(arguments.clone()),
            other => Err(TypeCheckError::invariant(format!(
                "expected Arguments at node {id}, found {}",
                other.kind_name()
            ))),
        }
    }

    fn argument_names(&self, arguments: &Arguments) -> Result<Vec<String>, TypeCheckError> {
        arguments
            .required
            .iter()
            .chain(&arguments.optional)
            .chain(&arguments.rest)
            .map(|id| {
                self.ctx
                    .arena()
                    .node(*id)?
                    .kind
                    .name()
                    .map(str::to_string)
                    .ok_or_else(|| TypeCheckError::invariant(format!("argument {id} has no name")))
            })
            .collect()
    }

    /// Types of an `Arguments` node: required, then optional, then rest.
    /// Block arguments are structural and not part of the list.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not an `Arguments` node or an argument
    /// conflicts with a binding already in scope.
    pub fn infer_arguments(
        &mut self,
        id: NodeId,
    ) -> Result<Option<Vec<TypeInfo>>, TypeCheckError> {
        if let Some(types) = self.ctx.get_argument_types(id) {
            return Ok(Some(types.to_vec()));
        }
        let arguments = self.arguments_of(id)?;
        let ids: Vec<NodeId> = arguments
            .required
            .iter()
            .chain(&arguments.optional)
            .chain(&arguments.rest)
            .copied()
            .collect();
        let types = self.infer_all(&ids)?;
        if let Some(types) = &types {
            self.ctx.set_argument_types(id, types.clone());
        }
        Ok(types)
    }

    /// Infers an `Arguments` node through [`Typer::infer`], so that it is
    /// memoized or deferred like any other node, and returns its types.
    fn argument_list(&mut self, id: NodeId) -> Result<Option<Vec<TypeInfo>>, TypeCheckError> {
        if self.infer(id)?.is_none() {
            return Ok(None);
        }
        Ok(self.ctx.get_argument_types(id).map(<[TypeInfo]>::to_vec))
    }

    /// Declared signature of the method owning argument `id`, if the
    /// argument belongs to a method rather than a block.
    fn owning_signature(&mut self, id: NodeId) -> Result<Option<Signature>, TypeCheckError> {
        let arena = self.ctx.arena();
        let argument = arena.node(id)?;
        if !argument.kind.is_argument() {
            return Err(TypeCheckError::invariant(format!(
                "node {id} is a {}, not an argument",
                argument.kind.kind_name()
            )));
        }
        let Some(owner) = arena
            .find_parent_node(id)
            .and_then(|arguments| arena.find_parent_node(arguments))
        else {
            return Ok(None);
        };
        let method = match &arena.node(owner)?.kind {
            NodeKind::MethodDefinition(method) => method.clone(),
            _ => return Ok(None),
        };
        self.infer_signature(owner, &method).map(Some)
    }

    /// Required and rest arguments: a declared type is taught into the
    /// scope, otherwise the scope must already know the name.
    pub(crate) fn infer_required_argument(&mut self, id: NodeId, name: &str) -> InferResult {
        let scope = self.scope_of(id)?;
        let declared = self
            .owning_signature(id)?
            .and_then(|signature| signature.parameter(name).cloned());
        match declared {
            Some(declared) => {
                let location = self.location(id)?;
                self.learn_local_type_at(scope, name, declared, id, &location)
                    .map(Some)
            }
            None => Ok(self.ctx.scopes.lookup_local(scope, name).cloned()),
        }
    }

    /// Optional arguments take their declared type, or the type of their
    /// default value. A declared type must accept the default value.
    pub(crate) fn infer_optional_argument(
        &mut self,
        id: NodeId,
        argument: &OptionalArgument,
    ) -> InferResult {
        let scope = self.scope_of(id)?;
        let location = self.location(id)?;
        let declared = self
            .owning_signature(id)?
            .and_then(|signature| signature.parameter(&argument.name).cloned());
        let Some(value) = self.infer(argument.value)? else {
            return Ok(None);
        };
        let ty = match declared {
            Some(declared) if !self.lookup.is_parent(&declared, &value) => {
                return Err(TypeCheckError::TypeMismatch {
                    expected: declared,
                    found: value,
                    context: TypeMismatchContext::DefaultValue {
                        argument_name: argument.name.clone(),
                    },
                    location,
                });
            }
            Some(declared) => declared,
            None => value,
        };
        self.learn_local_type_at(scope, &argument.name, ty, id, &location)
            .map(Some)
    }
}

/// How many arguments of each kind a method declares.
#[derive(Debug, Clone, Copy)]
struct ArgumentLayout {
    required: usize,
    optional: usize,
    rest: bool,
}

impl ArgumentLayout {
    fn of(arguments: &Arguments) -> Self {
        ArgumentLayout {
            required: arguments.required.len(),
            optional: arguments.optional.len(),
            rest: arguments.rest.is_some(),
        }
    }
}
