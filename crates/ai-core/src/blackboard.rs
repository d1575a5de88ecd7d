use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Byte range inside a blackboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BbSlot {
    pub offset: u32,
    pub size: u32,
}

impl BbSlot {
    pub const fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// One past the last byte, or `None` if the slot runs past `u32::MAX`.
    pub const fn end(self) -> Option<u32> {
        self.offset.checked_add(self.size)
    }
}

/// The contiguous region a single tree or query identity owns inside the blackboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BbRegion {
    pub offset: u32,
    pub size: u32,
}

const SLOT_ALIGN: u32 = 4;

fn align_up(value: u32) -> Option<u32> {
    value.div_ceil(SLOT_ALIGN).checked_mul(SLOT_ALIGN)
}

/// Global blackboard layout keyed by tree/query identity hash.
///
/// Every identity gets one region; slots inside a region are 4-byte aligned. Layouts are built once
/// at setup and shared read-only by all instances.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlackboardLayout {
    regions: BTreeMap<u64, BbRegion>,
    size: u32,
}

impl BlackboardLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a region for `identity` holding one slot per entry of `slot_sizes`.
    pub fn register(&mut self, identity: u64, slot_sizes: &[u32]) -> Result<Vec<BbSlot>, CoreError> {
        if self.regions.contains_key(&identity) {
            return Err(CoreError::DuplicateLayout { identity });
        }

        let overflow = CoreError::LayoutOverflow { identity };
        let base = align_up(self.size).ok_or(overflow.clone())?;
        let mut cursor = base;
        let mut slots = Vec::with_capacity(slot_sizes.len());
        for &size in slot_sizes {
            let slot = BbSlot::new(align_up(cursor).ok_or(overflow.clone())?, size);
            cursor = slot.end().ok_or(overflow.clone())?;
            slots.push(slot);
        }

        self.regions.insert(
            identity,
            BbRegion {
                offset: base,
                size: cursor - base,
            },
        );
        self.size = cursor;
        Ok(slots)
    }

    pub fn region(&self, identity: u64) -> Result<BbRegion, CoreError> {
        self.regions
            .get(&identity)
            .copied()
            .ok_or(CoreError::UnknownLayout { identity })
    }

    /// Total bytes an instance blackboard needs for this layout.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Allocate a zeroed blackboard sized for this layout.
    pub fn instantiate(&self) -> Blackboard {
        Blackboard::zeroed(self.size as usize)
    }
}

/// Fixed-layout per-instance scratch memory.
///
/// Owned by the instance, persists across ticks. The interpreter and the query scorer only borrow
/// it for the duration of a call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Blackboard {
    bytes: Vec<u8>,
}

impl Blackboard {
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: vec![0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zero every byte, keeping the size.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    pub fn read(&self, slot: BbSlot) -> Result<&[u8], CoreError> {
        let range = self.range(slot)?;
        Ok(&self.bytes[range])
    }

    /// Copy `bytes` into `slot`. Writing fewer bytes than the slot holds leaves the tail untouched.
    pub fn write(&mut self, slot: BbSlot, bytes: &[u8]) -> Result<(), CoreError> {
        if bytes.len() > slot.size as usize {
            return Err(CoreError::BlackboardOutOfBounds {
                offset: slot.offset,
                size: bytes.len() as u32,
                len: self.bytes.len(),
            });
        }
        let range = self.range(BbSlot::new(slot.offset, bytes.len() as u32))?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    fn range(&self, slot: BbSlot) -> Result<core::ops::Range<usize>, CoreError> {
        let start = slot.offset as usize;
        match start.checked_add(slot.size as usize) {
            Some(end) if end <= self.bytes.len() => Ok(start..end),
            _ => Err(CoreError::BlackboardOutOfBounds {
                offset: slot.offset,
                size: slot.size,
                len: self.bytes.len(),
            }),
        }
    }
}
