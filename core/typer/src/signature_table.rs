//! Method signatures and learned method types.
//!
//! Two tables with different keys:
//!
//! - [`SignatureTable`] holds what each method *definition* declares,
//!   keyed by the definition's node id. Its return slot is overwritten
//!   with the effective return type once the method resolves.
//! - [`MethodTable`] holds what callers can see: method types keyed by
//!   defining class and name, with one entry per parameter list.

use duby_ast::nodes::NodeId;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::type_info::TypeInfo;

/// Resolved declared types of one method definition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Signature {
    /// Declared parameter types by argument name.
    pub parameters: FxHashMap<String, TypeInfo>,
    /// Declared return type until the method resolves, effective return type after.
    pub return_type: Option<TypeInfo>,
    pub throws: Vec<TypeInfo>,
}

impl Signature {
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&TypeInfo> {
        self.parameters.get(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    signatures: FxHashMap<NodeId, Signature>,
}

impl SignatureTable {
    #[must_use]
    pub fn get(&self, method: NodeId) -> Option<&Signature> {
        self.signatures.get(&method)
    }

    pub(crate) fn insert(&mut self, method: NodeId, signature: Signature) {
        self.signatures.insert(method, signature);
    }

    pub(crate) fn set_return_type(&mut self, method: NodeId, return_type: TypeInfo) {
        self.signatures.entry(method).or_default().return_type = Some(return_type);
    }
}

/// A method as seen by its callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MethodType {
    pub defining_class: TypeInfo,
    pub name: String,
    pub parameters: Vec<TypeInfo>,
    pub return_type: TypeInfo,
    pub throws: Vec<TypeInfo>,
    /// The last parameter is a rest array that takes any number of
    /// trailing arguments.
    pub varargs: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MethodTable {
    methods: FxHashMap<(TypeInfo, String), Vec<MethodType>>,
}

impl MethodTable {
    /// Records a method type. Learning the same fact twice is a no-op.
    ///
    /// Returns the recorded entry, or `Err` with the existing entry when
    /// the same class, name and parameters are already known with a
    /// different return type.
    pub(crate) fn learn(&mut self, method: MethodType) -> Result<MethodType, MethodType> {
        let overloads = self
            .methods
            .entry((method.defining_class.clone(), method.name.clone()))
            .or_default();
        if let Some(existing) = overloads
            .iter()
            .find(|known| known.parameters == method.parameters)
        {
            return if existing.return_type == method.return_type {
                Ok(existing.clone())
            } else {
                Err(existing.clone())
            };
        }
        overloads.push(method.clone());
        Ok(method)
    }

    #[must_use]
    pub fn overloads(&self, defining_class: &TypeInfo, name: &str) -> &[MethodType] {
        self.methods
            .get(&(defining_class.clone(), name.to_string()))
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn find_exact(
        &self,
        defining_class: &TypeInfo,
        name: &str,
        parameters: &[TypeInfo],
    ) -> Option<&MethodType> {
        self.overloads(defining_class, name)
            .iter()
            .find(|method| method.parameters == parameters)
    }

    /// Every method learned for `defining_class`, ordered by name.
    #[must_use]
    pub fn methods_of(&self, defining_class: &TypeInfo) -> Vec<&MethodType> {
        let mut methods: Vec<&MethodType> = self
            .methods
            .iter()
            .filter(|((class, _), _)| class == defining_class)
            .flat_map(|(_, overloads)| overloads.iter())
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
