use ai_bt::{
    execute, BehaviorTreeState, BtInstance, ExecutionNode, GuardedChild, InterpreterConfig,
    TickInputs, TreeBuilder,
};
use ai_core::{BbSlot, BlackboardLayout, ComponentRef, ComponentType, ComponentTypeId, TypeHash};
use ai_expr::{CompareOp, GraphBuilder, Op, ValueType, VarWrite};
use ai_utility::EntitySets;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const HEALTH: TypeHash = TypeHash(0xBE);

fn bench_bt_tick(c: &mut Criterion) {
    let slot = BbSlot::new(0, 4);

    let mut g = GraphBuilder::new();
    let health = g.local(ComponentType::new(HEALTH, 4, "Health"));
    let hp = g.field(health, 0, ValueType::Float);
    let low = g.constant(25.0f32);
    let hurt = g.node(Op::CompareFloat(CompareOp::Lt), &[hp, low]);
    let healthy = g.node(Op::Not, &[hurt]);
    let counter = g.var(slot, ValueType::Int);
    let one = g.constant(1i32);
    let next = g.node(Op::Add, &[counter, one]);
    let graph = g.build().expect("valid graph");

    let mut b = TreeBuilder::new(1);
    let mut branches = Vec::with_capacity(33);
    for i in 0..33 {
        let child = b.add(ExecutionNode::WriteVar {
            writes: vec![VarWrite {
                slot,
                ty: ValueType::Int,
                value: next,
            }],
        });
        let guard = if i == 32 { healthy } else { hurt };
        branches.push(GuardedChild { guard, child });
    }
    let selector = b.add(ExecutionNode::Selector { branches });
    let tree = b.build(selector, graph).expect("valid tree");

    let mut layout = BlackboardLayout::new();
    layout.register(tree.identity, &[4]).expect("layout");
    let mut instance = BtInstance::new(BehaviorTreeState::new(0), layout.instantiate());
    let mut hp_bytes = 80.0f32.to_le_bytes();
    let sets = EntitySets::new();
    let config = InterpreterConfig::default();

    c.bench_function("ai-bt/tick(guards=33)", |bench| {
        bench.iter(|| {
            let mut refs = [ComponentRef::new(&mut hp_bytes, HEALTH, ComponentTypeId(0))];
            let inputs = TickInputs {
                components: &mut refs,
                lookups: &[],
                entity_sets: &sets,
                now: 0.0,
            };
            black_box(execute(&tree, &mut instance, inputs, None, &config).ok());
        })
    });
}

criterion_group!(benches, bench_bt_tick);
criterion_main!(benches);
