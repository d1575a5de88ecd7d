use ai_core::{Blackboard, ComponentRef, Components, LookupHandle, Lookups, SplitMix64};
use ai_expr::{EvalContext, Evaluator};
use ai_tools::{TraceEvent, TraceKind, TraceSink};
use ai_utility::{EntitySets, QueryConfig, QueryContext};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{BtError, BtInstance, BtStack, ExecutionNode, NodeId, NodeKind, TreeData};

/// Interpreter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterpreterConfig {
    /// Hard cap on node visits per call. Hitting it is a defect in the tree, not a tree failure.
    pub max_steps: usize,
    pub query: QueryConfig,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_steps: 10_000,
            query: QueryConfig::default(),
        }
    }
}

impl InterpreterConfig {
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_query_config(mut self, query: QueryConfig) -> Self {
        self.query = query;
        self
    }
}

/// Per-call inputs supplied by the host scheduler.
///
/// `components` must match the tree graph's declared locals exactly; `lookups` its declared
/// lookups.
pub struct TickInputs<'c, 'a> {
    pub components: &'c mut [ComponentRef<'a>],
    pub lookups: &'c [LookupHandle<'a>],
    pub entity_sets: &'c EntitySets,
    /// Simulation time in seconds.
    pub now: f32,
}

/// How a call handed control back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A node is suspended and will be re-inspected first on the next call.
    Waiting(NodeId),
    /// The root was reached a second time in this call.
    Yielded,
}

struct Tracer<'s> {
    sink: Option<&'s mut dyn TraceSink>,
    cycle: u64,
}

impl Tracer<'_> {
    fn emit(&mut self, kind: TraceKind, node: NodeId, node_kind: NodeKind, depth: usize) {
        tracing::trace!(cycle = self.cycle, event = kind.name(), %node, node_kind = node_kind.name(), depth);
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.emit(TraceEvent::new(self.cycle, kind, node.0, node_kind.name()).with_depth(depth as u32));
        }
    }
}

fn context<'c, 'a>(
    components: &'c [ComponentRef<'a>],
    lookups: &'c [LookupHandle<'a>],
    blackboard: &'c Blackboard,
    rng: &'c mut SplitMix64,
    now: f32,
) -> EvalContext<'c, 'a> {
    EvalContext {
        components: Components::prevalidated(components),
        lookups: Lookups::prevalidated(lookups),
        blackboard,
        item: None,
        now,
        rng,
    }
}

/// Advance one tree instance until it suspends.
///
/// Component refs and lookup handles are checked against the tree's declarations once on entry;
/// after that every field access is only bounds-checked. In-tree failures unwind to the nearest
/// `Catch` or reset the stack to the root and never surface as errors.
pub fn execute(
    tree: &TreeData,
    instance: &mut BtInstance,
    inputs: TickInputs<'_, '_>,
    trace: Option<&mut dyn TraceSink>,
    config: &InterpreterConfig,
) -> Result<TickOutcome, BtError> {
    let TickInputs {
        components,
        lookups,
        entity_sets,
        now,
    } = inputs;
    Components::bind(tree.graph.locals(), components)?;
    Lookups::bind(tree.graph.lookups(), lookups)?;

    let BtInstance {
        state,
        stack,
        blackboard,
        pending,
        results,
    } = instance;
    state.cycle += 1;
    let mut tracer = Tracer {
        sink: trace,
        cycle: state.cycle,
    };

    if stack.is_empty() {
        stack.push(NodeId::ROOT);
        tracer.emit(TraceKind::Init, NodeId::ROOT, NodeKind::Root, stack.len());
    }
    if stack.frames()[0].node != NodeId::ROOT {
        tracing::error!(identity = tree.identity, frames = ?stack.frames(), "stack does not start at the root");
        return Err(BtError::CorruptStack {
            reason: "frame 0 is not the root",
        });
    }
    let start = top(stack)?.node;
    tracer.emit(TraceKind::Start, start, tree.node(start)?.kind(), stack.len());

    let mut eval = Evaluator::new(&tree.graph);
    let mut root_visited = false;
    let mut last = start;

    for _ in 0..config.max_steps {
        let frame = *top(stack)?;
        let id = frame.node;
        let node = tree.node(id)?;
        let kind = node.kind();
        let depth = stack.len();
        last = id;
        eval.reset();

        match node {
            ExecutionNode::Root { child } => {
                if root_visited {
                    tracer.emit(TraceKind::Yield, id, kind, depth);
                    return Ok(TickOutcome::Yielded);
                }
                root_visited = true;
                tracer.emit(TraceKind::Call, id, kind, depth);
                stack.push(*child);
            }
            ExecutionNode::Sequence { children } => match children.get(frame.child_index as usize) {
                Some(&child) => {
                    tracer.emit(TraceKind::Call, id, kind, depth);
                    advance(stack, frame.child_index + 1)?;
                    stack.push(child);
                }
                None => {
                    tracer.emit(TraceKind::Return, id, kind, depth);
                    stack.pop();
                }
            },
            ExecutionNode::Selector { branches } => {
                if frame.child_index > 0 {
                    tracer.emit(TraceKind::Return, id, kind, depth);
                    stack.pop();
                    continue;
                }
                let mut chosen = None;
                for (i, branch) in branches.iter().enumerate() {
                    let mut ctx = context(components, lookups, blackboard, &mut state.rng, now);
                    if eval.eval_bool(&branch.guard, &mut ctx)? {
                        chosen = Some((i, branch.child));
                        break;
                    }
                }
                match chosen {
                    Some((i, child)) => {
                        tracer.emit(TraceKind::Call, id, kind, depth);
                        advance(stack, i as u32 + 1)?;
                        stack.push(child);
                    }
                    None => {
                        tracer.emit(TraceKind::Fail, id, kind, depth);
                        unwind(tree, stack, &mut tracer)?;
                    }
                }
            }
            ExecutionNode::WriteField { writes } => {
                tracer.emit(TraceKind::Call, id, kind, depth);
                for write in writes {
                    let value = {
                        let mut ctx = context(components, lookups, blackboard, &mut state.rng, now);
                        eval.eval(&write.value, &mut ctx)?
                    };
                    ai_expr::write_field(components, write, &value)?;
                }
                tracer.emit(TraceKind::Return, id, kind, depth);
                stack.pop();
            }
            ExecutionNode::WriteVar { writes } => {
                tracer.emit(TraceKind::Call, id, kind, depth);
                for write in writes {
                    let value = {
                        let mut ctx = context(components, lookups, blackboard, &mut state.rng, now);
                        eval.eval(&write.value, &mut ctx)?
                    };
                    ai_expr::write_var(blackboard, write, &value)?;
                }
                tracer.emit(TraceKind::Return, id, kind, depth);
                stack.pop();
            }
            ExecutionNode::Wait { condition } => {
                let mut ctx = context(components, lookups, blackboard, &mut state.rng, now);
                if eval.eval_bool(condition, &mut ctx)? {
                    tracer.emit(TraceKind::Return, id, kind, depth);
                    stack.pop();
                } else {
                    tracer.emit(TraceKind::Wait, id, kind, depth);
                    return Ok(TickOutcome::Waiting(id));
                }
            }
            ExecutionNode::Fail => {
                tracer.emit(TraceKind::Fail, id, kind, depth);
                unwind(tree, stack, &mut tracer)?;
            }
            ExecutionNode::Optional { guard, child } => {
                let run = frame.child_index == 0 && {
                    let mut ctx = context(components, lookups, blackboard, &mut state.rng, now);
                    eval.eval_bool(guard, &mut ctx)?
                };
                if run {
                    tracer.emit(TraceKind::Call, id, kind, depth);
                    advance(stack, 1)?;
                    stack.push(*child);
                } else {
                    tracer.emit(TraceKind::Return, id, kind, depth);
                    stack.pop();
                }
            }
            ExecutionNode::Catch { child } => {
                if frame.child_index == 0 {
                    tracer.emit(TraceKind::Call, id, kind, depth);
                    advance(stack, 1)?;
                    stack.push(*child);
                } else {
                    tracer.emit(TraceKind::Return, id, kind, depth);
                    stack.pop();
                }
            }
            ExecutionNode::RunQuery { query } => {
                let data = tree.queries.get(*query).ok_or(BtError::QueryOutOfRange {
                    node: id,
                    query: *query,
                    len: tree.queries.len(),
                })?;
                tracer.emit(TraceKind::Call, id, kind, depth);
                let ctx = QueryContext {
                    components: &*components,
                    lookups,
                    entity_sets,
                    now,
                    rng: &mut state.rng,
                };
                match ai_utility::execute_values(data, ctx, blackboard, &config.query, results) {
                    Err(err) if err.is_pending() => {
                        tracing::debug!(identity = data.identity, %id, "query input not ready; suspending");
                        pending.set(data.identity);
                        tracer.emit(TraceKind::Wait, id, kind, depth);
                        return Ok(TickOutcome::Waiting(id));
                    }
                    Err(err) => return Err(err.into()),
                    Ok(0) => {
                        pending.clear();
                        tracer.emit(TraceKind::Fail, id, kind, depth);
                        unwind(tree, stack, &mut tracer)?;
                    }
                    Ok(_) => {
                        pending.clear();
                        tracer.emit(TraceKind::Return, id, kind, depth);
                        stack.pop();
                    }
                }
            }
        }
    }

    tracing::error!(
        identity = tree.identity,
        steps = config.max_steps,
        node = %last,
        "behavior tree exceeded its step limit"
    );
    Err(BtError::StepLimitExceeded {
        steps: config.max_steps,
        node: last,
    })
}

fn top(stack: &BtStack) -> Result<&crate::StackFrame, BtError> {
    stack.top().ok_or(BtError::CorruptStack {
        reason: "stack emptied below the root",
    })
}

fn advance(stack: &mut BtStack, child_index: u32) -> Result<(), BtError> {
    let frame = stack.top_mut().ok_or(BtError::CorruptStack {
        reason: "stack emptied below the root",
    })?;
    frame.child_index = child_index;
    Ok(())
}

/// Unwind to the nearest `Catch` above the root, or reset to the root alone.
///
/// The catch frame keeps its advanced child index, so its next visit returns: it absorbs exactly
/// one failure.
fn unwind(tree: &TreeData, stack: &mut BtStack, tracer: &mut Tracer<'_>) -> Result<(), BtError> {
    let mut catch = None;
    for (depth, frame) in stack.frames().iter().enumerate().skip(1).rev() {
        if tree.node(frame.node)?.kind() == NodeKind::Catch {
            catch = Some((depth, frame.node));
            break;
        }
    }

    match catch {
        Some((depth, node)) => {
            tracing::debug!(identity = tree.identity, %node, unwound = stack.len() - depth - 1, "failure caught");
            stack.truncate(depth + 1);
            tracer.emit(TraceKind::Catch, node, NodeKind::Catch, stack.len());
        }
        None => {
            tracing::debug!(identity = tree.identity, depth = stack.len(), "uncaught failure; restarting from root");
            stack.truncate(1);
        }
    }
    Ok(())
}
