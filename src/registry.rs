//! Definition registry.
//!
//! Holds every transformation and trait in registration order. Built once
//! while contributors load and read-only afterwards.

use crate::definition::{Definition, TraitRef, TransformationRef};
use crate::error::KiError;
use crate::id::{QualifiedId, StatusHandle};
use std::collections::HashMap;

/// Registry of transformation and trait definitions.
///
/// # Examples
///
/// ```rust
/// use kiform::{Definition, DefinitionRegistry, Entity, Framework, QualifiedId, StatusHandle, Transformation};
/// use std::sync::Arc;
///
/// struct Ssj;
/// impl Transformation for Ssj {
///     fn update(&self, _entity: &mut Entity, _fw: &Framework) {}
/// }
///
/// let mut registry = DefinitionRegistry::new();
/// let id = QualifiedId::from_str("mod/SSJ");
/// registry
///     .register(Definition::transformation(id.clone(), StatusHandle(1), Arc::new(Ssj)))
///     .unwrap();
///
/// assert!(registry.lookup_by_id(&id).is_some());
/// assert_eq!(registry.lookup_by_numeric_handle(StatusHandle(1)), Some(&id));
/// ```
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<Definition>,
    index: HashMap<QualifiedId, usize>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition.
    ///
    /// Fails with `DuplicateKey` if the ID is taken and with
    /// `DuplicateHandle` if the status handle is taken. The registry is left
    /// untouched on failure.
    pub fn register(&mut self, definition: Definition) -> Result<&Definition, KiError> {
        if self.index.contains_key(&definition.id) {
            return Err(KiError::DuplicateKey {
                kind: "definition",
                id: definition.id.to_string(),
            });
        }
        if let Some(owner) = self.lookup_by_numeric_handle(definition.status) {
            return Err(KiError::DuplicateHandle {
                handle: definition.status.0,
                id: owner.to_string(),
            });
        }

        let slot = self.definitions.len();
        self.index.insert(definition.id.clone(), slot);
        self.definitions.push(definition);
        Ok(&self.definitions[slot])
    }

    pub fn lookup_by_id(&self, id: &QualifiedId) -> Option<&Definition> {
        self.index.get(id).map(|&slot| &self.definitions[slot])
    }

    /// Reverse lookup from a host status handle. Linear scan.
    pub fn lookup_by_numeric_handle(&self, status: StatusHandle) -> Option<&QualifiedId> {
        self.definitions
            .iter()
            .find(|def| def.status == status)
            .map(|def| &def.id)
    }

    pub fn contains(&self, id: &QualifiedId) -> bool {
        self.index.contains_key(id)
    }

    /// Handles of non-stackable transformations, in registration order.
    pub fn list_non_stackable(&self, excluding: &[StatusHandle]) -> Vec<StatusHandle> {
        self.list_transformations(false, excluding)
    }

    /// Handles of stackable transformations, in registration order.
    pub fn list_stackable(&self, excluding: &[StatusHandle]) -> Vec<StatusHandle> {
        self.list_transformations(true, excluding)
    }

    fn list_transformations(&self, stackable: bool, excluding: &[StatusHandle]) -> Vec<StatusHandle> {
        self.definitions
            .iter()
            .filter(|def| def.is_transformation() && def.is_stackable() == stackable)
            .filter(|def| !excluding.contains(&def.status))
            .map(|def| def.status)
            .collect()
    }

    pub fn transformation(&self, id: &QualifiedId) -> Option<TransformationRef> {
        self.lookup_by_id(id).and_then(Definition::as_transformation)
    }

    pub fn trait_definition(&self, id: &QualifiedId) -> Option<TraitRef> {
        self.lookup_by_id(id).and_then(Definition::as_trait)
    }

    /// Definitions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Wipe the registry. Only meant for teardown or reload.
    pub fn clear(&mut self) {
        self.definitions.clear();
        self.index.clear();
    }
}
