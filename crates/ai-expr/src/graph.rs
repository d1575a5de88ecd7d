use ai_core::{BbSlot, ComponentType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{GraphError, ScalarKind, Value, ValueType};

/// Index of a node inside an [`ExpressionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeIndex(pub u32);

/// Index into the constant pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstIndex(pub u32);

/// Index into the graph's output list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputIndex(pub u32);

/// Where an input value comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Operand {
    /// Result of an earlier node.
    Node(NodeIndex),
    Const(ConstIndex),
    /// Field of a local component, by declared slot.
    Local { slot: u16, offset: u32, ty: ValueType },
    Blackboard { slot: BbSlot, ty: ValueType },
    /// The query item currently being filtered or scored.
    Item(ValueType),
    /// Simulation time in seconds.
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CompareOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    pub fn apply<T: PartialOrd>(self, a: T, b: T) -> bool {
        match self {
            CompareOp::Lt => a < b,
            CompareOp::Gt => a > b,
            CompareOp::Le => a <= b,
            CompareOp::Ge => a >= b,
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
        }
    }
}

/// Operation tag of an expression node.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Op {
    Copy,
    And,
    Or,
    Xor,
    Not,
    CompareInt(CompareOp),
    CompareFloat(CompareOp),
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    /// Pack `lanes` scalars into a vector.
    Make { kind: ScalarKind, lanes: u8 },
    /// Extract one lane of a vector.
    Break { lane: u8 },
    /// Reorder lanes; `count` of 1 yields a scalar.
    Swizzle { lanes: [u8; 4], count: u8 },
    Length,
    Distance,
    /// Uniform float in `[min, max)`.
    RandomFloat,
    /// Unit vector in 2 or 3 dimensions.
    RandomDirection { dims: u8 },
    HasComponent { lookup: u16 },
    /// Field of another entity's component; zeroed when the entity lacks it.
    LookupField { lookup: u16, offset: u32, ty: ValueType },
}

impl Op {
    pub fn arity(&self) -> usize {
        match self {
            Op::RandomDirection { .. } => 0,
            Op::Copy
            | Op::Not
            | Op::Negate
            | Op::Break { .. }
            | Op::Swizzle { .. }
            | Op::Length
            | Op::HasComponent { .. }
            | Op::LookupField { .. } => 1,
            Op::And
            | Op::Or
            | Op::Xor
            | Op::CompareInt(_)
            | Op::CompareFloat(_)
            | Op::Add
            | Op::Sub
            | Op::Mul
            | Op::Div
            | Op::Distance
            | Op::RandomFloat => 2,
            Op::Make { lanes, .. } => *lanes as usize,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Op::Copy => "copy",
            Op::And => "and",
            Op::Or => "or",
            Op::Xor => "xor",
            Op::Not => "not",
            Op::CompareInt(_) => "compare_int",
            Op::CompareFloat(_) => "compare_float",
            Op::Add => "add",
            Op::Sub => "sub",
            Op::Mul => "mul",
            Op::Div => "div",
            Op::Negate => "negate",
            Op::Make { .. } => "make",
            Op::Break { .. } => "break",
            Op::Swizzle { .. } => "swizzle",
            Op::Length => "length",
            Op::Distance => "distance",
            Op::RandomFloat => "random_float",
            Op::RandomDirection { .. } => "random_direction",
            Op::HasComponent { .. } => "has_component",
            Op::LookupField { .. } => "lookup_field",
        }
    }
}

/// Largest arity of any op; evaluation gathers inputs into a fixed array of this size.
pub const MAX_INPUTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExprNode {
    pub op: Op,
    pub inputs: Vec<Operand>,
}

/// Immutable dataflow graph of typed pure operations.
///
/// Nodes only reference strictly earlier nodes, so the node list is already in topological order
/// and cannot contain a cycle.
///
/// Deserialized graphs go through [`ExpressionGraph::from_parts`], so they are validated too.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "GraphParts"))]
pub struct ExpressionGraph {
    nodes: Vec<ExprNode>,
    constants: Vec<Value>,
    locals: Vec<ComponentType>,
    lookups: Vec<ComponentType>,
    outputs: Vec<Operand>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct GraphParts {
    nodes: Vec<ExprNode>,
    constants: Vec<Value>,
    locals: Vec<ComponentType>,
    lookups: Vec<ComponentType>,
    outputs: Vec<Operand>,
}

#[cfg(feature = "serde")]
impl TryFrom<GraphParts> for ExpressionGraph {
    type Error = GraphError;

    fn try_from(parts: GraphParts) -> Result<Self, GraphError> {
        Self::from_parts(
            parts.nodes,
            parts.constants,
            parts.locals,
            parts.lookups,
            parts.outputs,
        )
    }
}

/// Result type of every node, produced by [`ExpressionGraph::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphTypes {
    nodes: Vec<ValueType>,
}

impl GraphTypes {
    pub fn node(&self, index: NodeIndex) -> Option<ValueType> {
        self.nodes.get(index.0 as usize).copied()
    }

    /// Static type of `operand`, checking that it references something the graph declares.
    pub fn operand(&self, graph: &ExpressionGraph, operand: &Operand) -> Result<ValueType, GraphError> {
        graph.operand_type(operand, &self.nodes, self.nodes.len() as u32)
    }
}

impl ExpressionGraph {
    /// Assemble and validate a graph from its parts.
    pub fn from_parts(
        nodes: Vec<ExprNode>,
        constants: Vec<Value>,
        locals: Vec<ComponentType>,
        lookups: Vec<ComponentType>,
        outputs: Vec<Operand>,
    ) -> Result<Self, GraphError> {
        let graph = Self {
            nodes,
            constants,
            locals,
            lookups,
            outputs,
        };
        graph.validate()?;
        Ok(graph)
    }

    pub fn nodes(&self) -> &[ExprNode] {
        &self.nodes
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    /// Declared local components, in the exact order callers must supply them.
    pub fn locals(&self) -> &[ComponentType] {
        &self.locals
    }

    /// Declared lookup components, matched positionally against lookup handles.
    pub fn lookups(&self) -> &[ComponentType] {
        &self.lookups
    }

    pub fn outputs(&self) -> &[Operand] {
        &self.outputs
    }

    pub fn output(&self, index: OutputIndex) -> Result<&Operand, GraphError> {
        self.outputs.get(index.0 as usize).ok_or(GraphError::OutputOutOfRange {
            index: index.0,
            len: self.outputs.len(),
        })
    }

    /// Check ordering, arity, references, field bounds and operand types.
    pub fn validate(&self) -> Result<GraphTypes, GraphError> {
        let mut types = Vec::with_capacity(self.nodes.len());
        for (i, node) in self.nodes.iter().enumerate() {
            let at = i as u32;
            let arity = node.op.arity();
            if node.inputs.len() != arity || arity > MAX_INPUTS {
                return Err(GraphError::ArityMismatch {
                    node: at,
                    op: node.op.name(),
                    expected: arity,
                    found: node.inputs.len(),
                });
            }

            let mut inputs = [ValueType::Bool; MAX_INPUTS];
            for (k, operand) in node.inputs.iter().enumerate() {
                inputs[k] = self.operand_type(operand, &types, at)?;
            }
            types.push(self.result_type(at, &node.op, &inputs[..arity])?);
        }

        let end = types.len() as u32;
        for operand in &self.outputs {
            self.operand_type(operand, &types, end)?;
        }
        Ok(GraphTypes { nodes: types })
    }

    fn operand_type(
        &self,
        operand: &Operand,
        node_types: &[ValueType],
        before: u32,
    ) -> Result<ValueType, GraphError> {
        match *operand {
            Operand::Node(NodeIndex(index)) => {
                if index >= before {
                    return Err(GraphError::ForwardReference {
                        node: before,
                        input: index,
                    });
                }
                node_types
                    .get(index as usize)
                    .copied()
                    .ok_or(GraphError::ForwardReference {
                        node: before,
                        input: index,
                    })
            }
            Operand::Const(ConstIndex(index)) => self
                .constants
                .get(index as usize)
                .map(Value::ty)
                .ok_or(GraphError::ConstantOutOfRange {
                    index,
                    len: self.constants.len(),
                }),
            Operand::Local { slot, offset, ty } => {
                let component = self
                    .locals
                    .get(slot as usize)
                    .ok_or(GraphError::LocalOutOfRange {
                        slot,
                        len: self.locals.len(),
                    })?;
                if offset
                    .checked_add(ty.size())
                    .is_none_or(|end| end > component.size)
                {
                    return Err(GraphError::FieldOutOfBounds {
                        slot,
                        offset,
                        size: ty.size(),
                        component_size: component.size,
                    });
                }
                Ok(ty)
            }
            Operand::Blackboard { slot, ty } => {
                if slot.size != ty.size() {
                    return Err(GraphError::BlackboardSlotSize {
                        offset: slot.offset,
                        slot_size: slot.size,
                        ty,
                    });
                }
                Ok(ty)
            }
            Operand::Item(ty) => Ok(ty),
            Operand::Time => Ok(ValueType::Float),
        }
    }

    fn result_type(&self, node: u32, op: &Op, inputs: &[ValueType]) -> Result<ValueType, GraphError> {
        let expect = |input: usize, ok: bool, expected: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(GraphError::TypeMismatch {
                    node,
                    input,
                    expected,
                    found: inputs[input],
                })
            }
        };
        let is_float_vector = |ty: ValueType| ty.scalar_kind() == Some(ScalarKind::Float) && ty.lanes() >= 2;

        match *op {
            Op::Copy => Ok(inputs[0]),
            Op::And | Op::Or | Op::Xor => {
                expect(0, inputs[0] == ValueType::Bool, "bool")?;
                expect(1, inputs[1] == ValueType::Bool, "bool")?;
                Ok(ValueType::Bool)
            }
            Op::Not => {
                expect(0, inputs[0] == ValueType::Bool, "bool")?;
                Ok(ValueType::Bool)
            }
            Op::CompareInt(_) => {
                expect(0, inputs[0] == ValueType::Int, "int")?;
                expect(1, inputs[1] == ValueType::Int, "int")?;
                Ok(ValueType::Bool)
            }
            Op::CompareFloat(_) => {
                expect(0, inputs[0] == ValueType::Float, "float")?;
                expect(1, inputs[1] == ValueType::Float, "float")?;
                Ok(ValueType::Bool)
            }
            Op::Add | Op::Sub | Op::Mul | Op::Div => {
                let (a, b) = (inputs[0], inputs[1]);
                expect(0, a.scalar_kind().is_some(), "numeric")?;
                let broadcast = b.lanes() == 1 && b.scalar_kind() == a.scalar_kind();
                expect(1, b == a || broadcast, "same numeric type or matching scalar")?;
                Ok(a)
            }
            Op::Negate => {
                expect(0, inputs[0].scalar_kind().is_some(), "numeric")?;
                Ok(inputs[0])
            }
            Op::Make { kind, lanes } => {
                let ty = ValueType::numeric(kind, lanes)
                    .filter(|_| lanes >= 2)
                    .ok_or(GraphError::InvalidLanes { node, lanes })?;
                let scalar = ValueType::numeric(kind, 1).unwrap_or(ValueType::Float);
                for k in 0..inputs.len() {
                    expect(k, inputs[k] == scalar, scalar.name())?;
                }
                Ok(ty)
            }
            Op::Break { lane } => {
                let input = inputs[0];
                expect(0, input.lanes() >= 2, "vector")?;
                if lane >= input.lanes() {
                    return Err(GraphError::InvalidLane {
                        node,
                        lane,
                        lanes: input.lanes(),
                    });
                }
                Ok(ValueType::numeric(input.scalar_kind().unwrap_or(ScalarKind::Float), 1)
                    .unwrap_or(ValueType::Float))
            }
            Op::Swizzle { lanes, count } => {
                let input = inputs[0];
                expect(0, input.lanes() >= 2, "vector")?;
                if !(1..=4).contains(&count) {
                    return Err(GraphError::InvalidLanes { node, lanes: count });
                }
                if let Some(&bad) = lanes[..count as usize].iter().find(|&&l| l >= input.lanes()) {
                    return Err(GraphError::InvalidLane {
                        node,
                        lane: bad,
                        lanes: input.lanes(),
                    });
                }
                ValueType::numeric(input.scalar_kind().unwrap_or(ScalarKind::Float), count)
                    .ok_or(GraphError::InvalidLanes { node, lanes: count })
            }
            Op::Length => {
                expect(0, is_float_vector(inputs[0]), "float vector")?;
                Ok(ValueType::Float)
            }
            Op::Distance => {
                expect(0, is_float_vector(inputs[0]), "float vector")?;
                expect(1, inputs[1] == inputs[0], inputs[0].name())?;
                Ok(ValueType::Float)
            }
            Op::RandomFloat => {
                expect(0, inputs[0] == ValueType::Float, "float")?;
                expect(1, inputs[1] == ValueType::Float, "float")?;
                Ok(ValueType::Float)
            }
            Op::RandomDirection { dims } => match dims {
                2 => Ok(ValueType::Float2),
                3 => Ok(ValueType::Float3),
                _ => Err(GraphError::InvalidLanes { node, lanes: dims }),
            },
            Op::HasComponent { lookup } => {
                self.check_lookup(lookup)?;
                expect(0, inputs[0] == ValueType::Entity, "entity")?;
                Ok(ValueType::Bool)
            }
            Op::LookupField { lookup, offset, ty } => {
                let component = self.check_lookup(lookup)?;
                if offset
                    .checked_add(ty.size())
                    .is_none_or(|end| end > component.size)
                {
                    return Err(GraphError::FieldOutOfBounds {
                        slot: lookup,
                        offset,
                        size: ty.size(),
                        component_size: component.size,
                    });
                }
                expect(0, inputs[0] == ValueType::Entity, "entity")?;
                Ok(ty)
            }
        }
    }

    fn check_lookup(&self, lookup: u16) -> Result<&ComponentType, GraphError> {
        self.lookups
            .get(lookup as usize)
            .ok_or(GraphError::LookupOutOfRange {
                slot: lookup,
                len: self.lookups.len(),
            })
    }
}
