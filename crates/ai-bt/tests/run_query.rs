use ai_bt::{
    execute, BehaviorTreeState, BtError, BtInstance, ExecutionNode, InterpreterConfig, NodeId,
    TickInputs, TickOutcome, TreeBuilder, TreeData,
};
use ai_core::{BbSlot, BlackboardLayout, ComponentType, Entity, TypeHash};
use ai_expr::{GraphBuilder, Value, ValueType, VarWrite};
use ai_tools::{TraceLog, TraceSink};
use ai_utility::{EntitySets, Generator, QueryData, QueryOutput, QueryPass, Scorer};

const TARGETS: u64 = 0x51;

fn targets_query(output: QueryOutput) -> QueryData {
    let mut g = GraphBuilder::new();
    let zero = g.constant(0.0f32);
    let one = g.constant(1i32);
    QueryData::new(TARGETS, g.build().unwrap(), one)
        .with_pass(
            QueryPass::new()
                .generate(Generator::Entities { set: TARGETS })
                .score(Scorer::new(zero)),
        )
        .with_output(output)
}

/// Root -> Sequence[RunQuery, WriteVar(done = 1)].
fn tree(output: QueryOutput, done: BbSlot) -> TreeData {
    let mut g = GraphBuilder::new();
    let one = g.constant(1i32);
    let graph = g.build().unwrap();

    let mut b = TreeBuilder::new(0x7EE);
    let query = b.query(targets_query(output));
    let run = b.add(ExecutionNode::RunQuery { query });
    let mark = b.add(ExecutionNode::WriteVar {
        writes: vec![VarWrite {
            slot: done,
            ty: ValueType::Int,
            value: one,
        }],
    });
    let seq = b.add(ExecutionNode::Sequence {
        children: vec![run, mark],
    });
    b.build(seq, graph).unwrap()
}

struct Host {
    instance: BtInstance,
    slots: Vec<BbSlot>,
    sets: EntitySets,
}

impl Host {
    fn new(tree: &TreeData) -> Self {
        let mut layout = BlackboardLayout::new();
        let slots = layout.register(tree.identity, &[4, 8]).unwrap();
        Self {
            instance: BtInstance::new(BehaviorTreeState::new(3), layout.instantiate()),
            slots,
            sets: EntitySets::new(),
        }
    }

    fn tick(&mut self, tree: &TreeData, log: &mut TraceLog) -> Result<TickOutcome, BtError> {
        let inputs = TickInputs {
            components: &mut [],
            lookups: &[],
            entity_sets: &self.sets,
            now: 0.0,
        };
        execute(
            tree,
            &mut self.instance,
            inputs,
            Some(log as &mut dyn TraceSink),
            &InterpreterConfig::default(),
        )
    }

    fn done(&self) -> bool {
        self.instance.blackboard.read(self.slots[0]).unwrap() != [0; 4]
    }
}

#[test]
fn run_query_waits_for_entity_set_then_completes() {
    let done = BbSlot::new(0, 4);
    let tree = tree(QueryOutput::Sink, done);
    let mut host = Host::new(&tree);
    let run = NodeId(1);

    let mut log = TraceLog::default();
    assert_eq!(host.tick(&tree, &mut log), Ok(TickOutcome::Waiting(run)));
    assert_eq!(host.instance.pending.identity(), Some(TARGETS));
    assert_eq!(
        log.render()[log.events.len() - 2..],
        ["Call(RunQuery)", "Wait(RunQuery)"]
    );
    assert!(!host.done());

    host.sets.insert(TARGETS, vec![Entity(5), Entity(6)]);
    let mut log = TraceLog::default();
    assert_eq!(host.tick(&tree, &mut log), Ok(TickOutcome::Yielded));
    assert!(!host.instance.pending.is_pending());
    assert_eq!(host.instance.results, [Value::Entity(Entity(5))]);
    assert!(host.done());
    assert_eq!(
        log.render()[..4],
        [
            "Start(RunQuery)",
            "Call(RunQuery)",
            "Return(RunQuery)",
            "Call(Sequence)"
        ]
    );
}

#[test]
fn empty_query_result_fails_the_node() {
    let done = BbSlot::new(0, 4);
    let tree = tree(QueryOutput::Sink, done);
    let mut host = Host::new(&tree);
    host.sets.insert(TARGETS, Vec::new());

    let mut log = TraceLog::default();
    assert_eq!(host.tick(&tree, &mut log), Ok(TickOutcome::Yielded));
    assert!(!host.done());
    assert!(log.render().contains(&"Fail(RunQuery)".to_string()));
    assert_eq!(host.instance.stack.len(), 1);
}

#[test]
fn run_query_can_write_best_item_to_blackboard() {
    let done = BbSlot::new(0, 4);
    let best = BbSlot::new(4, 8);
    let tree = tree(QueryOutput::Blackboard(best), done);
    let mut host = Host::new(&tree);
    host.sets.insert(TARGETS, vec![Entity(42)]);

    host.tick(&tree, &mut TraceLog::default()).unwrap();
    assert_eq!(
        host.instance.blackboard.read(best).unwrap(),
        &42u64.to_le_bytes()
    );
    assert!(host.instance.results.is_empty());
}

#[test]
fn query_must_share_the_tree_component_schema() {
    let mut qg = GraphBuilder::new();
    qg.local(ComponentType::new(TypeHash(1), 4, "Health"));
    let zero = qg.constant(0.0f32);
    let one = qg.constant(1i32);
    let query = QueryData::new(9, qg.build().unwrap(), one).with_pass(
        QueryPass::new()
            .generate(Generator::Entities { set: 9 })
            .score(Scorer::new(zero)),
    );

    let mut b = TreeBuilder::new(1);
    let index = b.query(query);
    let run = b.add(ExecutionNode::RunQuery { query: index });
    assert_eq!(
        b.build(run, GraphBuilder::new().build().unwrap()).unwrap_err(),
        BtError::QuerySchema { query: 0 }
    );
}
