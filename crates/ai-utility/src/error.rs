use ai_core::CoreError;
use ai_expr::{EvalError, GraphError, ValueType};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    /// The entity set a generator reads has not been produced yet. Not fatal: retry next tick.
    #[error("entity set {set:#018x} is not ready")]
    EntitySetPending { set: u64 },

    #[error("query produces {found} items, caller expects {expected}")]
    ItemTypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    #[error("query {identity:#018x}: {what} must be {expected}, found {found}")]
    OperandType {
        identity: u64,
        what: &'static str,
        expected: &'static str,
        found: ValueType,
    },
}

impl QueryError {
    /// Whether the error is the recoverable "entity set not ready" condition.
    pub fn is_pending(&self) -> bool {
        matches!(self, QueryError::EntitySetPending { .. })
    }
}
