use core::fmt;
use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BindingKind, CoreError, SchemaMismatch};

/// Stable hash identifying a component layout.
///
/// Hashes are produced by the offline pipeline and compared verbatim at bind time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TypeHash(pub u64);

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Host-side type index resolved through a [`crate::TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentTypeId(pub u32);

/// A component type as declared by a graph: hash plus byte size.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComponentType {
    pub hash: TypeHash,
    pub size: u32,
    pub name: Cow<'static, str>,
}

impl ComponentType {
    pub fn new(hash: TypeHash, size: u32, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            hash,
            size,
            name: name.into(),
        }
    }
}

/// Type-erased view of one entity's component for the duration of a tick.
///
/// References are never persisted; the host builds a fresh array every tick.
#[derive(Debug)]
pub struct ComponentRef<'a> {
    bytes: &'a mut [u8],
    type_hash: TypeHash,
    type_id: ComponentTypeId,
}

impl<'a> ComponentRef<'a> {
    pub fn new(bytes: &'a mut [u8], type_hash: TypeHash, type_id: ComponentTypeId) -> Self {
        Self {
            bytes,
            type_hash,
            type_id,
        }
    }

    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    pub fn type_id(&self) -> ComponentTypeId {
        self.type_id
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        self.bytes
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

/// Read-only component array that has passed the schema check.
///
/// Binding validates count, order and per-slot type hash once; field reads afterwards only do a
/// bounds check.
#[derive(Debug, Clone, Copy)]
pub struct Components<'r, 'a> {
    refs: &'r [ComponentRef<'a>],
}

impl<'r, 'a> Components<'r, 'a> {
    /// Validate `refs` against the declared list and wrap them.
    ///
    /// A count, order or type-hash disagreement is fatal and reported with the full
    /// missing/extra breakdown.
    pub fn bind(declared: &[ComponentType], refs: &'r [ComponentRef<'a>]) -> Result<Self, CoreError> {
        let declared_hashes: Vec<TypeHash> = declared.iter().map(|t| t.hash).collect();
        let supplied: Vec<TypeHash> = refs.iter().map(|r| r.type_hash).collect();
        if let Some(mismatch) = SchemaMismatch::check(BindingKind::Local, &declared_hashes, &supplied) {
            tracing::error!(%mismatch, "refusing to bind component references");
            return Err(mismatch.into());
        }
        Ok(Self { refs })
    }

    /// Wrap references that were already validated earlier in the same tick.
    pub fn prevalidated(refs: &'r [ComponentRef<'a>]) -> Self {
        Self { refs }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Borrow `size` bytes at `offset` inside slot `slot`.
    pub fn read(&self, slot: u16, offset: u32, size: u32) -> Result<&'r [u8], CoreError> {
        let refs: &'r [ComponentRef<'a>] = self.refs;
        let component = refs.get(slot as usize).ok_or(CoreError::SlotOutOfRange {
            kind: BindingKind::Local,
            slot,
            bound: refs.len(),
        })?;
        field_range(component.bytes.len(), slot, offset, size).map(|range| &component.bytes[range])
    }
}

fn field_range(
    len: usize,
    slot: u16,
    offset: u32,
    size: u32,
) -> Result<core::ops::Range<usize>, CoreError> {
    let start = offset as usize;
    match start.checked_add(size as usize) {
        Some(end) if end <= len => Ok(start..end),
        _ => Err(CoreError::FieldOutOfBounds {
            slot,
            offset,
            size,
            len,
        }),
    }
}

/// Copy `bytes` into slot `slot` at `offset`. Touches exactly `bytes.len()` bytes.
pub fn write_field(
    refs: &mut [ComponentRef<'_>],
    slot: u16,
    offset: u32,
    bytes: &[u8],
) -> Result<(), CoreError> {
    let bound = refs.len();
    let component = refs.get_mut(slot as usize).ok_or(CoreError::SlotOutOfRange {
        kind: BindingKind::Local,
        slot,
        bound,
    })?;
    let range = field_range(component.bytes.len(), slot, offset, bytes.len() as u32)?;
    component.bytes[range].copy_from_slice(bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITION: TypeHash = TypeHash(0x10);
    const VELOCITY: TypeHash = TypeHash(0x20);

    fn declared() -> Vec<ComponentType> {
        vec![
            ComponentType::new(POSITION, 12, "Position"),
            ComponentType::new(VELOCITY, 12, "Velocity"),
        ]
    }

    #[test]
    fn bind_accepts_exact_match() {
        let mut a = [0u8; 12];
        let mut b = [0u8; 12];
        let refs = [
            ComponentRef::new(&mut a, POSITION, ComponentTypeId(0)),
            ComponentRef::new(&mut b, VELOCITY, ComponentTypeId(1)),
        ];
        let bound = Components::bind(&declared(), &refs).unwrap();
        assert_eq!(bound.len(), 2);
    }

    #[test]
    fn bind_rejects_swapped_order() {
        let mut a = [0u8; 12];
        let mut b = [0u8; 12];
        let refs = [
            ComponentRef::new(&mut b, VELOCITY, ComponentTypeId(1)),
            ComponentRef::new(&mut a, POSITION, ComponentTypeId(0)),
        ];
        let err = Components::bind(&declared(), &refs).unwrap_err();
        let CoreError::SchemaMismatch(m) = err else {
            panic!("expected schema mismatch");
        };
        assert!(m.missing.is_empty());
        assert!(m.extra.is_empty());
        assert_eq!(m.first_mismatch, Some(0));
    }

    #[test]
    fn read_is_bounds_checked() {
        let mut a = [1u8, 2, 3, 4];
        let refs = [ComponentRef::new(&mut a, POSITION, ComponentTypeId(0))];
        let bound = Components::prevalidated(&refs);
        assert_eq!(bound.read(0, 1, 2).unwrap(), &[2, 3]);
        assert!(matches!(
            bound.read(0, 3, 2),
            Err(CoreError::FieldOutOfBounds { len: 4, .. })
        ));
        assert!(matches!(
            bound.read(1, 0, 1),
            Err(CoreError::SlotOutOfRange { bound: 1, .. })
        ));
    }

    #[test]
    fn write_field_touches_only_the_range() {
        let mut a = [0xAAu8; 8];
        {
            let mut refs = [ComponentRef::new(&mut a, POSITION, ComponentTypeId(0))];
            write_field(&mut refs, 0, 2, &[1, 2, 3]).unwrap();
        }
        assert_eq!(a, [0xAA, 0xAA, 1, 2, 3, 0xAA, 0xAA, 0xAA]);
    }
}
