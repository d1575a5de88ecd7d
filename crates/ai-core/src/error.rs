use core::fmt;

use crate::TypeHash;

/// Which binding table a schema check ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Local,
    Lookup,
}

impl fmt::Display for BindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingKind::Local => f.write_str("local"),
            BindingKind::Lookup => f.write_str("lookup"),
        }
    }
}

/// Disagreement between a graph's declared component list and what the caller supplied.
///
/// `missing` holds declared types that were not supplied, `extra` holds supplied types that were
/// not declared. When both are empty the multisets agree and `first_mismatch` names the first slot
/// whose type is out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMismatch {
    pub kind: BindingKind,
    pub declared: Vec<TypeHash>,
    pub supplied: Vec<TypeHash>,
    pub missing: Vec<TypeHash>,
    pub extra: Vec<TypeHash>,
    pub first_mismatch: Option<usize>,
}

impl SchemaMismatch {
    /// Compare `declared` against `supplied`. Returns `None` when they match exactly.
    pub fn check(kind: BindingKind, declared: &[TypeHash], supplied: &[TypeHash]) -> Option<Self> {
        if declared == supplied {
            return None;
        }

        let mut extra: Vec<TypeHash> = supplied.to_vec();
        let mut missing = Vec::new();
        for hash in declared {
            match extra.iter().position(|s| s == hash) {
                Some(pos) => {
                    extra.swap_remove(pos);
                }
                None => missing.push(*hash),
            }
        }
        extra.sort();

        let first_mismatch = declared
            .iter()
            .zip(supplied.iter())
            .position(|(d, s)| d != s)
            .or_else(|| Some(declared.len().min(supplied.len())));

        Some(Self {
            kind,
            declared: declared.to_vec(),
            supplied: supplied.to_vec(),
            missing,
            extra,
            first_mismatch,
        })
    }
}

fn write_hashes(f: &mut fmt::Formatter<'_>, hashes: &[TypeHash]) -> fmt::Result {
    f.write_str("[")?;
    for (i, h) in hashes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{h}")?;
    }
    f.write_str("]")
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} component schema mismatch: declared {} types, supplied {}; missing ",
            self.kind,
            self.declared.len(),
            self.supplied.len()
        )?;
        write_hashes(f, &self.missing)?;
        f.write_str("; extra ")?;
        write_hashes(f, &self.extra)?;
        if let Some(slot) = self.first_mismatch {
            write!(f, "; first mismatched slot {slot}")?;
        }
        Ok(())
    }
}

/// Errors raised by the shared kernel: binding, registry and raw byte access.
///
/// All of these are configuration or schema faults. None of them is retried and none is
/// silently degraded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    SchemaMismatch(Box<SchemaMismatch>),

    #[error("component type {hash} is not registered")]
    UnresolvedType { hash: TypeHash },

    #[error("component type {hash} registered with {registered} bytes but declared with {declared}")]
    TypeSizeMismatch {
        hash: TypeHash,
        registered: u32,
        declared: u32,
    },

    #[error("{kind} slot {slot} is not bound ({bound} slots)")]
    SlotOutOfRange {
        kind: BindingKind,
        slot: u16,
        bound: usize,
    },

    #[error("field access out of bounds: slot {slot} offset {offset} size {size} (component is {len} bytes)")]
    FieldOutOfBounds {
        slot: u16,
        offset: u32,
        size: u32,
        len: usize,
    },

    #[error("blackboard access out of bounds: offset {offset} size {size} (blackboard is {len} bytes)")]
    BlackboardOutOfBounds { offset: u32, size: u32, len: usize },

    #[error("blackboard layout for identity {identity:#x} is already registered")]
    DuplicateLayout { identity: u64 },

    #[error("no blackboard layout registered for identity {identity:#x}")]
    UnknownLayout { identity: u64 },

    #[error("blackboard layout for identity {identity:#x} does not fit in u32 offsets")]
    LayoutOverflow { identity: u64 },
}

impl From<SchemaMismatch> for CoreError {
    fn from(value: SchemaMismatch) -> Self {
        CoreError::SchemaMismatch(Box::new(value))
    }
}
