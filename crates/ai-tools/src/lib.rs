//! Tooling primitives for the decision engine.
//!
//! Recording is optional and never affects execution; the interpreter only ever writes to a sink.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod trace;

pub use trace::{NullTraceSink, TraceEvent, TraceKind, TraceLog, TraceSink, VecTraceSink};
