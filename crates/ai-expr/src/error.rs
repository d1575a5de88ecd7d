use ai_core::CoreError;

use crate::ValueType;

/// Structural problems in an expression graph. Always a configuration fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node {node} references node {input}, which is not strictly earlier")]
    ForwardReference { node: u32, input: u32 },

    #[error("node {node} ({op}) expects {expected} inputs, found {found}")]
    ArityMismatch {
        node: u32,
        op: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("node {node} input {input}: expected {expected}, found {found}")]
    TypeMismatch {
        node: u32,
        input: usize,
        expected: &'static str,
        found: ValueType,
    },

    #[error("constant {index} out of range ({len} constants)")]
    ConstantOutOfRange { index: u32, len: usize },

    #[error("local component slot {slot} out of range ({len} declared)")]
    LocalOutOfRange { slot: u16, len: usize },

    #[error("lookup component slot {slot} out of range ({len} declared)")]
    LookupOutOfRange { slot: u16, len: usize },

    #[error("field at offset {offset} size {size} exceeds component slot {slot} ({component_size} bytes)")]
    FieldOutOfBounds {
        slot: u16,
        offset: u32,
        size: u32,
        component_size: u32,
    },

    #[error("blackboard slot at offset {offset} holds {slot_size} bytes, {ty} needs {}", .ty.size())]
    BlackboardSlotSize {
        offset: u32,
        slot_size: u32,
        ty: ValueType,
    },

    #[error("node {node}: lane {lane} out of range for {lanes} lanes")]
    InvalidLane { node: u32, lane: u8, lanes: u8 },

    #[error("node {node}: unsupported lane count {lanes}")]
    InvalidLanes { node: u32, lanes: u8 },

    #[error("output {index} out of range ({len} outputs)")]
    OutputOutOfRange { index: u32, len: usize },
}

/// Errors raised while evaluating a graph.
///
/// A lookup miss is deliberately absent: it evaluates to zeroed bytes, not an error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("node {node}: expected {expected}, found {found}")]
    TypeMismatch {
        node: u32,
        expected: &'static str,
        found: ValueType,
    },

    #[error("node {node}: integer division by zero")]
    DivisionByZero { node: u32 },

    #[error("expression reads the query item outside of a query")]
    MissingItem,
}
