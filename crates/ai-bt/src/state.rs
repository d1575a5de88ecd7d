use ai_core::{Blackboard, Entity, SplitMix64, TickContext};
use ai_expr::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BtStack, TreeData};

/// Per-instance scalar state that survives between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BehaviorTreeState {
    /// Number of calls so far; stamped on every trace event.
    pub cycle: u64,
    pub rng: SplitMix64,
}

impl BehaviorTreeState {
    pub fn new(seed: u64) -> Self {
        Self {
            cycle: 0,
            rng: SplitMix64::new(seed),
        }
    }

    /// State seeded from the global seed, the instance and the tree identity.
    pub fn for_instance(ctx: &TickContext, entity: Entity, tree: &TreeData) -> Self {
        Self {
            cycle: 0,
            rng: ctx.rng_for_agent(entity, tree.identity),
        }
    }
}

/// Identity of a query a `RunQuery` node is waiting on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PendingQuery {
    query: Option<u64>,
}

impl PendingQuery {
    pub fn is_pending(&self) -> bool {
        self.query.is_some()
    }

    pub fn identity(&self) -> Option<u64> {
        self.query
    }

    pub fn set(&mut self, identity: u64) {
        self.query = Some(identity);
    }

    pub fn clear(&mut self) {
        self.query = None;
    }
}

/// Everything one tree instance owns across calls.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BtInstance {
    pub state: BehaviorTreeState,
    pub stack: BtStack,
    pub blackboard: Blackboard,
    pub pending: PendingQuery,
    /// Ranked items of the last `RunQuery` whose query writes to a sink.
    pub results: Vec<Value>,
}

impl BtInstance {
    pub fn new(state: BehaviorTreeState, blackboard: Blackboard) -> Self {
        Self {
            state,
            stack: BtStack::new(),
            blackboard,
            pending: PendingQuery::default(),
            results: Vec::new(),
        }
    }
}
