use ai_core::{BbSlot, Blackboard, ComponentRef};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{EvalError, Operand, Value, ValueType};

/// Copy an evaluated input into a local component field.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldWrite {
    pub slot: u16,
    pub offset: u32,
    pub ty: ValueType,
    pub value: Operand,
}

/// Copy an evaluated input into a blackboard slot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarWrite {
    pub slot: BbSlot,
    pub ty: ValueType,
    pub value: Operand,
}

fn check_type(expected: ValueType, value: &Value) -> Result<(), EvalError> {
    if value.ty() != expected {
        return Err(EvalError::TypeMismatch {
            node: u32::MAX,
            expected: expected.name(),
            found: value.ty(),
        });
    }
    Ok(())
}

/// Write `value` into `refs[write.slot]` at `write.offset`.
///
/// Copies exactly `ty.size()` bytes and touches nothing else; `offset + size` must fit the
/// component.
pub fn write_field(refs: &mut [ComponentRef<'_>], write: &FieldWrite, value: &Value) -> Result<(), EvalError> {
    check_type(write.ty, value)?;
    ai_core::write_field(refs, write.slot, write.offset, value.to_bytes().as_slice())?;
    Ok(())
}

pub fn write_var(blackboard: &mut Blackboard, write: &VarWrite, value: &Value) -> Result<(), EvalError> {
    check_type(write.ty, value)?;
    blackboard.write(write.slot, value.to_bytes().as_slice())?;
    Ok(())
}
