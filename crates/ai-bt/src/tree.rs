use core::fmt;

use ai_expr::{ExpressionGraph, FieldWrite, GraphTypes, Operand, ValueType, VarWrite};
use ai_utility::QueryData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::BtError;

/// Index of a node in a tree's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable node tags. The numeric values are part of the baked asset format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum NodeKind {
    Root = 0,
    Sequence = 1,
    Selector = 2,
    WriteField = 3,
    Wait = 4,
    Fail = 5,
    Optional = 6,
    Catch = 7,
    WriteVar = 8,
    RunQuery = 9,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Root => "Root",
            NodeKind::Sequence => "Sequence",
            NodeKind::Selector => "Selector",
            NodeKind::WriteField => "WriteField",
            NodeKind::Wait => "Wait",
            NodeKind::Fail => "Fail",
            NodeKind::Optional => "Optional",
            NodeKind::Catch => "Catch",
            NodeKind::WriteVar => "WriteVar",
            NodeKind::RunQuery => "RunQuery",
        }
    }
}

impl TryFrom<u8> for NodeKind {
    type Error = BtError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => NodeKind::Root,
            1 => NodeKind::Sequence,
            2 => NodeKind::Selector,
            3 => NodeKind::WriteField,
            4 => NodeKind::Wait,
            5 => NodeKind::Fail,
            6 => NodeKind::Optional,
            7 => NodeKind::Catch,
            8 => NodeKind::WriteVar,
            9 => NodeKind::RunQuery,
            other => {
                tracing::error!(tag = other, "unknown behavior tree node kind");
                return Err(BtError::UnknownNodeKind(other));
            }
        })
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A selector branch: `child` runs when `guard` holds.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GuardedChild {
    pub guard: Operand,
    pub child: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExecutionNode {
    Root { child: NodeId },
    Sequence { children: Vec<NodeId> },
    /// Runs the first branch whose guard holds; fails when none does.
    Selector { branches: Vec<GuardedChild> },
    WriteField { writes: Vec<FieldWrite> },
    /// Suspends until `condition` holds.
    Wait { condition: Operand },
    Fail,
    Optional { guard: Operand, child: NodeId },
    /// Unwind target for failures raised below it.
    Catch { child: NodeId },
    WriteVar { writes: Vec<VarWrite> },
    /// Index into [`TreeData::queries`].
    RunQuery { query: usize },
}

impl ExecutionNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            ExecutionNode::Root { .. } => NodeKind::Root,
            ExecutionNode::Sequence { .. } => NodeKind::Sequence,
            ExecutionNode::Selector { .. } => NodeKind::Selector,
            ExecutionNode::WriteField { .. } => NodeKind::WriteField,
            ExecutionNode::Wait { .. } => NodeKind::Wait,
            ExecutionNode::Fail => NodeKind::Fail,
            ExecutionNode::Optional { .. } => NodeKind::Optional,
            ExecutionNode::Catch { .. } => NodeKind::Catch,
            ExecutionNode::WriteVar { .. } => NodeKind::WriteVar,
            ExecutionNode::RunQuery { .. } => NodeKind::RunQuery,
        }
    }

    fn children(&self) -> Vec<NodeId> {
        match self {
            ExecutionNode::Root { child }
            | ExecutionNode::Optional { child, .. }
            | ExecutionNode::Catch { child } => vec![*child],
            ExecutionNode::Sequence { children } => children.clone(),
            ExecutionNode::Selector { branches } => branches.iter().map(|b| b.child).collect(),
            _ => Vec::new(),
        }
    }
}

/// Immutable tree asset shared by every instance running it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TreeParts"))]
pub struct TreeData {
    /// Stable identity hash; keys the blackboard layout and the instance RNG stream.
    pub identity: u64,
    nodes: Vec<ExecutionNode>,
    pub graph: ExpressionGraph,
    pub queries: Vec<QueryData>,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct TreeParts {
    identity: u64,
    nodes: Vec<ExecutionNode>,
    graph: ExpressionGraph,
    queries: Vec<QueryData>,
}

#[cfg(feature = "serde")]
impl TryFrom<TreeParts> for TreeData {
    type Error = BtError;

    fn try_from(parts: TreeParts) -> Result<Self, BtError> {
        Self::new(parts.identity, parts.nodes, parts.graph, parts.queries)
    }
}

impl TreeData {
    /// Assemble and validate a tree. Node 0 must be the root.
    pub fn new(
        identity: u64,
        nodes: Vec<ExecutionNode>,
        graph: ExpressionGraph,
        queries: Vec<QueryData>,
    ) -> Result<Self, BtError> {
        let tree = Self {
            identity,
            nodes,
            graph,
            queries,
        };
        tree.validate().inspect_err(|err| {
            tracing::error!(identity = tree.identity, %err, "rejecting behavior tree");
        })?;
        Ok(tree)
    }

    pub fn nodes(&self) -> &[ExecutionNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Result<&ExecutionNode, BtError> {
        self.nodes.get(id.index()).ok_or(BtError::InvalidNode {
            node: id,
            len: self.nodes.len(),
        })
    }

    pub fn validate(&self) -> Result<(), BtError> {
        match self.nodes.first() {
            Some(ExecutionNode::Root { .. }) => {}
            _ => return Err(BtError::MissingRoot),
        }
        let types = self.graph.validate()?;

        for (i, node) in self.nodes.iter().enumerate() {
            let id = NodeId(i as u32);
            if i > 0 && node.kind() == NodeKind::Root {
                return Err(BtError::MisplacedRoot { node: id });
            }
            for child in node.children() {
                if child == NodeId::ROOT || child.index() >= self.nodes.len() {
                    return Err(BtError::InvalidChild { node: id, child });
                }
            }
            self.validate_payload(id, node, &types)?;
        }
        Ok(())
    }

    fn validate_payload(&self, id: NodeId, node: &ExecutionNode, types: &GraphTypes) -> Result<(), BtError> {
        let expect = |what: &'static str, operand: &Operand, expected: ValueType| -> Result<(), BtError> {
            let found = types.operand(&self.graph, operand)?;
            if found == expected {
                Ok(())
            } else {
                Err(BtError::OperandType {
                    node: id,
                    what,
                    expected,
                    found,
                })
            }
        };

        match node {
            ExecutionNode::Selector { branches } => {
                for branch in branches {
                    expect("selector guard", &branch.guard, ValueType::Bool)?;
                }
            }
            ExecutionNode::Wait { condition } => expect("wait condition", condition, ValueType::Bool)?,
            ExecutionNode::Optional { guard, .. } => expect("optional guard", guard, ValueType::Bool)?,
            ExecutionNode::WriteField { writes } => {
                for write in writes {
                    // Checks the destination field against the declared component.
                    types.operand(
                        &self.graph,
                        &Operand::Local {
                            slot: write.slot,
                            offset: write.offset,
                            ty: write.ty,
                        },
                    )?;
                    expect("field write value", &write.value, write.ty)?;
                }
            }
            ExecutionNode::WriteVar { writes } => {
                for write in writes {
                    types.operand(
                        &self.graph,
                        &Operand::Blackboard {
                            slot: write.slot,
                            ty: write.ty,
                        },
                    )?;
                    expect("variable write value", &write.value, write.ty)?;
                }
            }
            ExecutionNode::RunQuery { query } => {
                let data = self.queries.get(*query).ok_or(BtError::QueryOutOfRange {
                    node: id,
                    query: *query,
                    len: self.queries.len(),
                })?;
                data.validate()?;
                if data.graph.locals() != self.graph.locals() || data.graph.lookups() != self.graph.lookups() {
                    return Err(BtError::QuerySchema { query: *query });
                }
            }
            ExecutionNode::Root { .. }
            | ExecutionNode::Sequence { .. }
            | ExecutionNode::Fail
            | ExecutionNode::Catch { .. } => {}
        }
        Ok(())
    }
}

/// Builds a tree bottom-up: children are added before the nodes that reference them, and the
/// root is filled in last.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    identity: u64,
    nodes: Vec<ExecutionNode>,
    queries: Vec<QueryData>,
}

impl TreeBuilder {
    pub fn new(identity: u64) -> Self {
        Self {
            identity,
            nodes: vec![ExecutionNode::Root {
                child: NodeId::ROOT,
            }],
            queries: Vec::new(),
        }
    }

    pub fn add(&mut self, node: ExecutionNode) -> NodeId {
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
    }

    /// Register a query and return the index `RunQuery` nodes use.
    pub fn query(&mut self, query: QueryData) -> usize {
        self.queries.push(query);
        self.queries.len() - 1
    }

    pub fn build(mut self, root_child: NodeId, graph: ExpressionGraph) -> Result<TreeData, BtError> {
        self.nodes[0] = ExecutionNode::Root { child: root_child };
        TreeData::new(self.identity, self.nodes, graph, self.queries)
    }
}
