use std::collections::BTreeMap;

use crate::{BindingKind, ComponentType, CoreError, Entity, SchemaMismatch, TypeHash};

/// Cross-entity component access supplied by the host.
///
/// This is the only trait object on the evaluation path; it is resolved once per lookup slot when
/// the handles are bound, not per field.
pub trait ComponentLookup {
    /// Raw bytes of `entity`'s component, or `None` when the entity lacks it.
    fn get(&self, entity: Entity) -> Option<&[u8]>;
}

/// A lookup source paired with the type hash it serves.
#[derive(Clone, Copy)]
pub struct LookupHandle<'a> {
    type_hash: TypeHash,
    source: &'a dyn ComponentLookup,
}

impl<'a> LookupHandle<'a> {
    pub fn new(type_hash: TypeHash, source: &'a dyn ComponentLookup) -> Self {
        Self { type_hash, source }
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }
}

impl core::fmt::Debug for LookupHandle<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LookupHandle")
            .field("type_hash", &self.type_hash)
            .finish_non_exhaustive()
    }
}

/// Lookup handles matched positionally against a graph's declared lookup list.
#[derive(Debug, Clone, Copy)]
pub struct Lookups<'r, 'a> {
    handles: &'r [LookupHandle<'a>],
}

impl<'r, 'a> Lookups<'r, 'a> {
    pub fn bind(declared: &[ComponentType], handles: &'r [LookupHandle<'a>]) -> Result<Self, CoreError> {
        let declared_hashes: Vec<TypeHash> = declared.iter().map(|t| t.hash).collect();
        let supplied: Vec<TypeHash> = handles.iter().map(|h| h.type_hash).collect();
        if let Some(mismatch) = SchemaMismatch::check(BindingKind::Lookup, &declared_hashes, &supplied) {
            tracing::error!(%mismatch, "refusing to bind lookup handles");
            return Err(mismatch.into());
        }
        Ok(Self { handles })
    }

    pub fn prevalidated(handles: &'r [LookupHandle<'a>]) -> Self {
        Self { handles }
    }

    pub fn empty() -> Self {
        Self { handles: &[] }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Whether `entity` has the component served by `slot`.
    pub fn contains(&self, slot: u16, entity: Entity) -> Result<bool, CoreError> {
        Ok(self.handle(slot)?.source.get(entity).is_some())
    }

    /// Copy `out.len()` bytes at `offset` from `entity`'s component into `out`.
    ///
    /// Returns `false` and zero-fills `out` when the entity lacks the component; a miss is not an
    /// error. Reading past the end of a component that does exist is.
    pub fn read_into(
        &self,
        slot: u16,
        entity: Entity,
        offset: u32,
        out: &mut [u8],
    ) -> Result<bool, CoreError> {
        let Some(bytes) = self.handle(slot)?.source.get(entity) else {
            out.fill(0);
            return Ok(false);
        };
        let start = offset as usize;
        let end = match start.checked_add(out.len()) {
            Some(end) if end <= bytes.len() => end,
            _ => {
                return Err(CoreError::FieldOutOfBounds {
                    slot,
                    offset,
                    size: out.len() as u32,
                    len: bytes.len(),
                })
            }
        };
        out.copy_from_slice(&bytes[start..end]);
        Ok(true)
    }

    fn handle(&self, slot: u16) -> Result<&LookupHandle<'a>, CoreError> {
        self.handles.get(slot as usize).ok_or(CoreError::SlotOutOfRange {
            kind: BindingKind::Lookup,
            slot,
            bound: self.handles.len(),
        })
    }
}

/// Simple ordered-map lookup, handy for hosts without their own storage and for tests.
#[derive(Debug, Default, Clone)]
pub struct MapLookup {
    components: BTreeMap<Entity, Vec<u8>>,
}

impl MapLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity, bytes: impl Into<Vec<u8>>) {
        self.components.insert(entity, bytes.into());
    }

    pub fn remove(&mut self, entity: Entity) -> Option<Vec<u8>> {
        self.components.remove(&entity)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentLookup for MapLookup {
    fn get(&self, entity: Entity) -> Option<&[u8]> {
        self.components.get(&entity).map(Vec::as_slice)
    }
}
