//! Resumable behavior-tree interpreter.
//!
//! Trees are immutable node arenas. Each instance owns an explicit stack of frames that acts as
//! its program counter, so a tree suspended in a `Wait` simply resumes from the top frame on the
//! next call. All conditions and writes go through `ai-expr` graphs.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod error;
pub mod interpreter;
pub mod stack;
pub mod state;
pub mod tree;

pub use error::BtError;
pub use interpreter::{execute, InterpreterConfig, TickInputs, TickOutcome};
pub use stack::{BtStack, StackFrame};
pub use state::{BehaviorTreeState, BtInstance, PendingQuery};
pub use tree::{ExecutionNode, GuardedChild, NodeId, NodeKind, TreeBuilder, TreeData};
