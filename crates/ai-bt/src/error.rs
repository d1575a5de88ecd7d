use ai_core::CoreError;
use ai_expr::{EvalError, GraphError, ValueType};
use ai_utility::QueryError;

use crate::NodeId;

/// Fatal interpreter errors.
///
/// In-tree failure (an exhausted selector, a `Fail` node) is control flow and never surfaces here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BtError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("interpreter exceeded {steps} steps (last node {node})")]
    StepLimitExceeded { steps: usize, node: NodeId },

    #[error("corrupt stack: {reason}")]
    CorruptStack { reason: &'static str },

    #[error("node {node} out of range ({len} nodes)")]
    InvalidNode { node: NodeId, len: usize },

    #[error("unknown node kind {0}")]
    UnknownNodeKind(u8),

    #[error("node {node}: child {child} out of range or refers to the root")]
    InvalidChild { node: NodeId, child: NodeId },

    #[error("node 0 is not a root node")]
    MissingRoot,

    #[error("root node found at {node}; only node 0 may be the root")]
    MisplacedRoot { node: NodeId },

    #[error("node {node}: query {query} out of range ({len} queries)")]
    QueryOutOfRange { node: NodeId, query: usize, len: usize },

    #[error("query {query} declares components that differ from the tree's")]
    QuerySchema { query: usize },

    #[error("node {node}: {what} must be {expected}, found {found}")]
    OperandType {
        node: NodeId,
        what: &'static str,
        expected: ValueType,
        found: ValueType,
    },
}
