use ai_core::{
    BbSlot, Blackboard, BlackboardLayout, ComponentRef, ComponentType, ComponentTypeId, Components,
    Entity, LookupHandle, Lookups, MapLookup, SplitMix64, TypeHash,
};
use ai_expr::{
    evaluate, write_field, write_var, CompareOp, EvalContext, EvalError, Evaluator, FieldWrite,
    GraphBuilder, GraphError, Op, ScalarKind, Value, ValueType, VarWrite,
};

const TRANSFORM: TypeHash = TypeHash(0xA1);
const MOVE_TARGET: TypeHash = TypeHash(0xA2);

fn transform() -> ComponentType {
    ComponentType::new(TRANSFORM, 12, "Transform")
}

fn float3_bytes(v: [f32; 3]) -> [u8; 12] {
    let mut out = [0u8; 12];
    out.copy_from_slice(Value::Float3(v).to_bytes().as_slice());
    out
}

#[test]
fn position_reduces_to_three() {
    let mut b = GraphBuilder::new();
    let slot = b.local(transform());
    let position = b.field(slot, 0, ValueType::Float3);
    let xyy = b.node(
        Op::Swizzle {
            lanes: [0, 1, 1, 0],
            count: 3,
        },
        &[position],
    );
    let length = b.node(Op::Length, &[xyy]);
    let out = b.output(length);
    let graph = b.build().unwrap();

    let mut data = float3_bytes([1.0, 2.0, 4.0]);
    let refs = [ComponentRef::new(&mut data, TRANSFORM, ComponentTypeId(0))];
    let bb = Blackboard::zeroed(0);
    let mut rng = SplitMix64::new(0);
    let mut ctx = EvalContext {
        components: Components::bind(graph.locals(), &refs).unwrap(),
        lookups: Lookups::empty(),
        blackboard: &bb,
        item: None,
        now: 0.0,
        rng: &mut rng,
    };

    assert_eq!(evaluate(&graph, out, &mut ctx), Ok(Value::Float(3.0)));
}

#[test]
fn xz_projection_length() {
    let mut b = GraphBuilder::new();
    let slot = b.local(transform());
    let position = b.field(slot, 0, ValueType::Float3);
    let x = b.node(Op::Break { lane: 0 }, &[position]);
    let z = b.node(Op::Break { lane: 2 }, &[position]);
    let xz = b.node(
        Op::Make {
            kind: ScalarKind::Float,
            lanes: 2,
        },
        &[x, z],
    );
    let length = b.node(Op::Length, &[xz]);
    let out = b.output(length);
    let graph = b.build().unwrap();

    let mut data = float3_bytes([3.0, 100.0, 4.0]);
    let refs = [ComponentRef::new(&mut data, TRANSFORM, ComponentTypeId(0))];
    let bb = Blackboard::zeroed(0);
    let mut rng = SplitMix64::new(0);
    let mut ctx = EvalContext {
        components: Components::bind(graph.locals(), &refs).unwrap(),
        lookups: Lookups::empty(),
        blackboard: &bb,
        item: None,
        now: 0.0,
        rng: &mut rng,
    };

    assert_eq!(evaluate(&graph, out, &mut ctx), Ok(Value::Float(5.0)));
}

#[test]
fn lookup_miss_yields_not_found_and_zeroed_value() {
    let mut b = GraphBuilder::new();
    let pos = b.lookup(transform());
    let target = b.constant(Entity(7));
    let has = b.node(Op::HasComponent { lookup: pos }, &[target]);
    let field = b.node(
        Op::LookupField {
            lookup: pos,
            offset: 0,
            ty: ValueType::Float3,
        },
        &[target],
    );
    let has_out = b.output(has);
    let field_out = b.output(field);
    let graph = b.build().unwrap();

    let probe = |positions: &MapLookup| {
        let handles = [LookupHandle::new(TRANSFORM, positions)];
        let bb = Blackboard::zeroed(0);
        let mut rng = SplitMix64::new(0);
        let mut ctx = EvalContext {
            components: Components::prevalidated(&[]),
            lookups: Lookups::bind(graph.lookups(), &handles).unwrap(),
            blackboard: &bb,
            item: None,
            now: 0.0,
            rng: &mut rng,
        };
        let mut eval = Evaluator::new(&graph);
        (
            eval.eval_output(has_out, &mut ctx).unwrap(),
            eval.eval_output(field_out, &mut ctx).unwrap(),
        )
    };

    let mut positions = MapLookup::new();
    positions.insert(Entity(8), float3_bytes([5.0, 5.0, 5.0]).to_vec());
    assert_eq!(
        probe(&positions),
        (Value::Bool(false), Value::Float3([0.0, 0.0, 0.0]))
    );

    positions.insert(Entity(7), float3_bytes([1.0, 2.0, 3.0]).to_vec());
    assert_eq!(
        probe(&positions),
        (Value::Bool(true), Value::Float3([1.0, 2.0, 3.0]))
    );
}

#[test]
fn blackboard_and_time_operands() {
    let mut layout = BlackboardLayout::new();
    let slots = layout.register(0x51, &[4]).unwrap();
    let mut bb = layout.instantiate();
    bb.write(slots[0], &10.0f32.to_le_bytes()).unwrap();

    let mut b = GraphBuilder::new();
    let deadline = b.var(slots[0], ValueType::Float);
    let expired = b.node(Op::CompareFloat(CompareOp::Ge), &[ai_expr::Operand::Time, deadline]);
    let out = b.output(expired);
    let graph = b.build().unwrap();

    let mut rng = SplitMix64::new(0);
    for (now, want) in [(9.5, false), (10.0, true)] {
        let mut ctx = EvalContext {
            components: Components::prevalidated(&[]),
            lookups: Lookups::empty(),
            blackboard: &bb,
            item: None,
            now,
            rng: &mut rng,
        };
        assert_eq!(evaluate(&graph, out, &mut ctx), Ok(Value::Bool(want)));
    }
}

#[test]
fn random_nodes_are_reproducible_and_memoized() {
    let mut b = GraphBuilder::new();
    let lo = b.constant(0.0f32);
    let hi = b.constant(1.0f32);
    let r = b.node(Op::RandomFloat, &[lo, hi]);
    let twice = b.node(Op::Sub, &[r, r]);
    let r_out = b.output(r);
    let diff_out = b.output(twice);
    let graph = b.build().unwrap();

    let sample = |seed: u64| {
        let bb = Blackboard::zeroed(0);
        let mut rng = SplitMix64::new(seed);
        let mut ctx = EvalContext {
            components: Components::prevalidated(&[]),
            lookups: Lookups::empty(),
            blackboard: &bb,
            item: None,
            now: 0.0,
            rng: &mut rng,
        };
        let mut eval = Evaluator::new(&graph);
        let r = eval.eval_output(r_out, &mut ctx).unwrap();
        let diff = eval.eval_output(diff_out, &mut ctx).unwrap();
        (r, diff)
    };

    let (a, diff) = sample(11);
    assert_eq!(diff, Value::Float(0.0));
    assert_eq!(sample(11).0, a);
}

#[test]
fn field_write_copies_exactly_size_bytes() {
    let mut data = [0xEEu8; 16];
    {
        let mut refs = [ComponentRef::new(&mut data, MOVE_TARGET, ComponentTypeId(1))];
        let write = FieldWrite {
            slot: 0,
            offset: 4,
            ty: ValueType::Float2,
            value: ai_expr::Operand::Time,
        };
        write_field(&mut refs, &write, &Value::Float2([1.0, 2.0])).unwrap();

        let past_end = FieldWrite { offset: 12, ..write };
        assert!(matches!(
            write_field(&mut refs, &past_end, &Value::Float2([1.0, 2.0])),
            Err(EvalError::Core(ai_core::CoreError::FieldOutOfBounds { .. }))
        ));
    }
    assert_eq!(&data[..4], &[0xEE; 4]);
    assert_eq!(&data[4..8], &1.0f32.to_le_bytes());
    assert_eq!(&data[8..12], &2.0f32.to_le_bytes());
    assert_eq!(&data[12..], &[0xEE; 4]);
}

#[test]
fn var_write_checks_type() {
    let mut bb = Blackboard::zeroed(8);
    let write = VarWrite {
        slot: BbSlot::new(4, 4),
        ty: ValueType::Int,
        value: ai_expr::Operand::Time,
    };
    write_var(&mut bb, &write, &Value::Int(-2)).unwrap();
    assert_eq!(bb.read(BbSlot::new(4, 4)).unwrap(), &(-2i32).to_le_bytes());
    assert!(matches!(
        write_var(&mut bb, &write, &Value::Float(1.0)),
        Err(EvalError::TypeMismatch { .. })
    ));
}

#[test]
fn validator_rejects_bad_graphs() {
    let mut b = GraphBuilder::new();
    let one = b.constant(1i32);
    b.node(Op::And, &[one, one]);
    assert!(matches!(b.build(), Err(GraphError::TypeMismatch { node: 0, .. })));

    let mut b = GraphBuilder::new();
    b.node(Op::Not, &[ai_expr::Operand::Node(ai_expr::NodeIndex(0))]);
    assert_eq!(
        b.build().unwrap_err(),
        GraphError::ForwardReference { node: 0, input: 0 }
    );

    let mut b = GraphBuilder::new();
    let slot = b.local(transform());
    let past_end = b.field(slot, 4, ValueType::Float3);
    b.output(past_end);
    assert!(matches!(b.build(), Err(GraphError::FieldOutOfBounds { .. })));

    let mut b = GraphBuilder::new();
    let slot = b.local(transform());
    let wraps = b.field(slot, u32::MAX - 1, ValueType::Float);
    b.output(wraps);
    assert!(matches!(b.build(), Err(GraphError::FieldOutOfBounds { .. })));

    let mut b = GraphBuilder::new();
    let v = b.constant([1.0f32, 2.0]);
    b.node(Op::Break { lane: 2 }, &[v]);
    assert!(matches!(b.build(), Err(GraphError::InvalidLane { lane: 2, lanes: 2, .. })));

    let mut b = GraphBuilder::new();
    let one = b.constant(1.0f32);
    b.node(Op::Add, &[one]);
    assert!(matches!(b.build(), Err(GraphError::ArityMismatch { expected: 2, found: 1, .. })));
}
