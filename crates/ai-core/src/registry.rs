use std::collections::BTreeMap;

use crate::{ComponentType, ComponentTypeId, CoreError, TypeHash};

/// Host type registry: maps declared type hashes to runtime type ids.
///
/// Resolution happens at setup time. An unknown hash disables the consuming system before it ever
/// ticks rather than failing mid-tick.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    by_hash: BTreeMap<TypeHash, (ComponentTypeId, ComponentType)>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type, returning its id. Re-registering the same hash returns the existing id.
    pub fn register(&mut self, ty: ComponentType) -> ComponentTypeId {
        let next = ComponentTypeId(self.by_hash.len() as u32);
        self.by_hash.entry(ty.hash).or_insert((next, ty)).0
    }

    pub fn get(&self, hash: TypeHash) -> Option<&ComponentType> {
        self.by_hash.get(&hash).map(|(_, ty)| ty)
    }

    pub fn resolve(&self, declared: &ComponentType) -> Result<ComponentTypeId, CoreError> {
        let Some((id, registered)) = self.by_hash.get(&declared.hash) else {
            return Err(CoreError::UnresolvedType { hash: declared.hash });
        };
        if registered.size != declared.size {
            return Err(CoreError::TypeSizeMismatch {
                hash: declared.hash,
                registered: registered.size,
                declared: declared.size,
            });
        }
        Ok(*id)
    }

    /// Resolve every declared type or fail on the first one the host does not know.
    pub fn resolve_all(&self, declared: &[ComponentType]) -> Result<Vec<ComponentTypeId>, CoreError> {
        declared
            .iter()
            .map(|ty| {
                self.resolve(ty).inspect_err(|err| {
                    tracing::error!(name = %ty.name, %err, "cannot resolve declared component type");
                })
            })
            .collect()
    }
}
