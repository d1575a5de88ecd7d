#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::NodeId;

/// One activation of a node: which node, and how far through its children it got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StackFrame {
    pub node: NodeId,
    pub child_index: u32,
}

impl StackFrame {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            child_index: 0,
        }
    }
}

/// The interpreter's program counter. Persisted by the instance between calls.
///
/// Once initialized, frame 0 is always the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BtStack {
    frames: Vec<StackFrame>,
}

impl BtStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn top(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut StackFrame> {
        self.frames.last_mut()
    }

    pub fn push(&mut self, node: NodeId) {
        self.frames.push(StackFrame::new(node));
    }

    pub fn pop(&mut self) -> Option<StackFrame> {
        self.frames.pop()
    }

    pub fn truncate(&mut self, len: usize) {
        self.frames.truncate(len);
    }

    /// Drop every frame; the next call starts from the root again.
    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
