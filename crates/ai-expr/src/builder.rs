use ai_core::{BbSlot, ComponentType};

use crate::{
    ConstIndex, ExprNode, ExpressionGraph, GraphError, NodeIndex, Op, Operand, OutputIndex, Value,
    ValueType,
};

/// Incremental, validating constructor for [`ExpressionGraph`].
///
/// Nodes can only reference operands that already exist, so anything built here is acyclic by
/// construction; `build` still runs the full validator.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<ExprNode>,
    constants: Vec<Value>,
    locals: Vec<ComponentType>,
    lookups: Vec<ComponentType>,
    outputs: Vec<Operand>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the next local component slot.
    pub fn local(&mut self, ty: ComponentType) -> u16 {
        self.locals.push(ty);
        (self.locals.len() - 1) as u16
    }

    /// Declare the next lookup component slot.
    pub fn lookup(&mut self, ty: ComponentType) -> u16 {
        self.lookups.push(ty);
        (self.lookups.len() - 1) as u16
    }

    pub fn constant(&mut self, value: impl Into<Value>) -> Operand {
        self.constants.push(value.into());
        Operand::Const(ConstIndex((self.constants.len() - 1) as u32))
    }

    pub fn field(&self, slot: u16, offset: u32, ty: ValueType) -> Operand {
        Operand::Local { slot, offset, ty }
    }

    pub fn var(&self, slot: BbSlot, ty: ValueType) -> Operand {
        Operand::Blackboard { slot, ty }
    }

    pub fn node(&mut self, op: Op, inputs: &[Operand]) -> Operand {
        self.nodes.push(ExprNode {
            op,
            inputs: inputs.to_vec(),
        });
        Operand::Node(NodeIndex((self.nodes.len() - 1) as u32))
    }

    pub fn output(&mut self, operand: Operand) -> OutputIndex {
        self.outputs.push(operand);
        OutputIndex((self.outputs.len() - 1) as u32)
    }

    pub fn build(self) -> Result<ExpressionGraph, GraphError> {
        ExpressionGraph::from_parts(
            self.nodes,
            self.constants,
            self.locals,
            self.lookups,
            self.outputs,
        )
    }
}
