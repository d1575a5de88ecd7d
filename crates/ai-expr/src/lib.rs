//! Typed expression graphs over component data, lookups, blackboard slots and constants.
//!
//! Graphs are immutable DAGs built offline. Evaluation is a pure reduction apart from the random
//! nodes, which draw from the calling instance's RNG.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod builder;
pub mod error;
pub mod eval;
pub mod graph;
pub mod value;
pub mod write;

pub use builder::GraphBuilder;
pub use error::{EvalError, GraphError};
pub use eval::{evaluate, EvalContext, Evaluator};
pub use graph::{
    CompareOp, ConstIndex, ExprNode, ExpressionGraph, GraphTypes, NodeIndex, Op, Operand,
    OutputIndex,
};
pub use value::{ScalarKind, Value, ValueBytes, ValueType};
pub use write::{write_field, write_var, FieldWrite, VarWrite};
