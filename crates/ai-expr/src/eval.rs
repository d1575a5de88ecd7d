use ai_core::{Blackboard, Components, DeterministicRng, Entity, Lookups, SplitMix64};

use crate::graph::MAX_INPUTS;
use crate::value::Lanes;
use crate::{
    EvalError, ExpressionGraph, NodeIndex, Op, Operand, OutputIndex, ScalarKind, Value, ValueType,
};

/// Everything an evaluation may read.
///
/// Components and lookups must already be bound against the graph's declarations. The RNG is the
/// only mutable input; it belongs to the calling instance so random nodes stay reproducible.
pub struct EvalContext<'c, 'a> {
    pub components: Components<'c, 'a>,
    pub lookups: Lookups<'c, 'a>,
    pub blackboard: &'c Blackboard,
    pub item: Option<Value>,
    pub now: f32,
    pub rng: &'c mut SplitMix64,
}

/// Call-scoped evaluator with per-node memoization.
///
/// A node shared by several consumers is evaluated once per evaluator, which also means a random
/// node yields a single value per call. Use [`Evaluator::reset`] between query items.
pub struct Evaluator<'g> {
    graph: &'g ExpressionGraph,
    memo: Vec<Option<Value>>,
}

impl<'g> Evaluator<'g> {
    pub fn new(graph: &'g ExpressionGraph) -> Self {
        Self {
            graph,
            memo: vec![None; graph.nodes().len()],
        }
    }

    pub fn reset(&mut self) {
        self.memo.fill(None);
    }

    pub fn eval_output(&mut self, output: OutputIndex, ctx: &mut EvalContext<'_, '_>) -> Result<Value, EvalError> {
        let operand = *self.graph.output(output)?;
        self.eval(&operand, ctx)
    }

    pub fn eval(&mut self, operand: &Operand, ctx: &mut EvalContext<'_, '_>) -> Result<Value, EvalError> {
        match *operand {
            Operand::Node(index) => self.eval_node(index, ctx),
            Operand::Const(index) => {
                let constants = self.graph.constants();
                constants.get(index.0 as usize).copied().ok_or_else(|| {
                    crate::GraphError::ConstantOutOfRange {
                        index: index.0,
                        len: constants.len(),
                    }
                    .into()
                })
            }
            Operand::Local { slot, offset, ty } => {
                let bytes = ctx.components.read(slot, offset, ty.size())?;
                decode(ty, bytes)
            }
            Operand::Blackboard { slot, ty } => {
                let bytes = ctx.blackboard.read(slot)?;
                decode(ty, bytes)
            }
            Operand::Item(ty) => {
                let item = ctx.item.ok_or(EvalError::MissingItem)?;
                if item.ty() != ty {
                    return Err(EvalError::TypeMismatch {
                        node: u32::MAX,
                        expected: ty.name(),
                        found: item.ty(),
                    });
                }
                Ok(item)
            }
            Operand::Time => Ok(Value::Float(ctx.now)),
        }
    }

    pub fn eval_bool(&mut self, operand: &Operand, ctx: &mut EvalContext<'_, '_>) -> Result<bool, EvalError> {
        let value = self.eval(operand, ctx)?;
        value.as_bool().ok_or(EvalError::TypeMismatch {
            node: node_of(operand),
            expected: "bool",
            found: value.ty(),
        })
    }

    pub fn eval_float(&mut self, operand: &Operand, ctx: &mut EvalContext<'_, '_>) -> Result<f32, EvalError> {
        let value = self.eval(operand, ctx)?;
        match value {
            Value::Float(v) => Ok(v),
            Value::Int(v) => Ok(v as f32),
            other => Err(EvalError::TypeMismatch {
                node: node_of(operand),
                expected: "float",
                found: other.ty(),
            }),
        }
    }

    pub fn eval_int(&mut self, operand: &Operand, ctx: &mut EvalContext<'_, '_>) -> Result<i32, EvalError> {
        let value = self.eval(operand, ctx)?;
        value.as_int().ok_or(EvalError::TypeMismatch {
            node: node_of(operand),
            expected: "int",
            found: value.ty(),
        })
    }

    fn eval_node(&mut self, index: NodeIndex, ctx: &mut EvalContext<'_, '_>) -> Result<Value, EvalError> {
        let graph = self.graph;
        let i = index.0 as usize;
        let node = graph.nodes().get(i).ok_or(crate::GraphError::ForwardReference {
            node: graph.nodes().len() as u32,
            input: index.0,
        })?;
        if let Some(value) = self.memo[i] {
            return Ok(value);
        }
        if node.inputs.len() != node.op.arity() || node.inputs.len() > MAX_INPUTS {
            return Err(crate::GraphError::ArityMismatch {
                node: index.0,
                op: node.op.name(),
                expected: node.op.arity(),
                found: node.inputs.len(),
            }
            .into());
        }

        let mut args = [Value::Bool(false); MAX_INPUTS];
        for (k, input) in node.inputs.iter().enumerate() {
            if let Operand::Node(dep) = input {
                if dep.0 >= index.0 {
                    return Err(crate::GraphError::ForwardReference {
                        node: index.0,
                        input: dep.0,
                    }
                    .into());
                }
            }
            args[k] = self.eval(input, ctx)?;
        }

        let value = apply(&node.op, index.0, &args[..node.inputs.len()], ctx)?;
        tracing::trace!(node = index.0, op = node.op.name(), ?value, "evaluated");
        self.memo[i] = Some(value);
        Ok(value)
    }
}

/// One-shot evaluation of a graph output.
pub fn evaluate(
    graph: &ExpressionGraph,
    output: OutputIndex,
    ctx: &mut EvalContext<'_, '_>,
) -> Result<Value, EvalError> {
    Evaluator::new(graph).eval_output(output, ctx)
}

fn node_of(operand: &Operand) -> u32 {
    match operand {
        Operand::Node(index) => index.0,
        _ => u32::MAX,
    }
}

fn decode(ty: ValueType, bytes: &[u8]) -> Result<Value, EvalError> {
    Value::from_bytes(ty, bytes).ok_or(EvalError::TypeMismatch {
        node: u32::MAX,
        expected: ty.name(),
        found: ty,
    })
}

fn mismatch(node: u32, expected: &'static str, found: &Value) -> EvalError {
    EvalError::TypeMismatch {
        node,
        expected,
        found: found.ty(),
    }
}

fn as_bool(node: u32, v: &Value) -> Result<bool, EvalError> {
    v.as_bool().ok_or_else(|| mismatch(node, "bool", v))
}

fn as_int(node: u32, v: &Value) -> Result<i32, EvalError> {
    v.as_int().ok_or_else(|| mismatch(node, "int", v))
}

fn as_float(node: u32, v: &Value) -> Result<f32, EvalError> {
    v.as_float().ok_or_else(|| mismatch(node, "float", v))
}

fn as_entity(node: u32, v: &Value) -> Result<Entity, EvalError> {
    v.as_entity().ok_or_else(|| mismatch(node, "entity", v))
}

fn lanes(node: u32, v: &Value) -> Result<Lanes, EvalError> {
    v.lanes().ok_or_else(|| mismatch(node, "numeric", v))
}

fn float_lanes(node: u32, v: &Value) -> Result<([f32; 4], u8), EvalError> {
    match v.lanes() {
        Some(Lanes::Float(l, n)) if n >= 2 => Ok((l, n)),
        _ => Err(mismatch(node, "float vector", v)),
    }
}

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Sub,
    Mul,
    Div,
}

fn arith(node: u32, kind: Arith, a: &Value, b: &Value) -> Result<Value, EvalError> {
    let la = lanes(node, a)?;
    let lb = lanes(node, b)?;
    let n = la.count();
    let broadcast = lb.count() == 1;
    if la.kind() != lb.kind() || (lb.count() != n && !broadcast) {
        return Err(mismatch(node, a.ty().name(), b));
    }
    let pick = |i: usize| if broadcast { 0 } else { i };

    let out = match (la, lb) {
        (Lanes::Int(x, _), Lanes::Int(y, _)) => {
            let mut out = [0i32; 4];
            for i in 0..n as usize {
                let (p, q) = (x[i], y[pick(i)]);
                out[i] = match kind {
                    Arith::Add => p.wrapping_add(q),
                    Arith::Sub => p.wrapping_sub(q),
                    Arith::Mul => p.wrapping_mul(q),
                    Arith::Div => {
                        if q == 0 {
                            return Err(EvalError::DivisionByZero { node });
                        }
                        p.wrapping_div(q)
                    }
                };
            }
            Lanes::Int(out, n)
        }
        (Lanes::Float(x, _), Lanes::Float(y, _)) => {
            let mut out = [0f32; 4];
            for i in 0..n as usize {
                let (p, q) = (x[i], y[pick(i)]);
                out[i] = match kind {
                    Arith::Add => p + q,
                    Arith::Sub => p - q,
                    Arith::Mul => p * q,
                    Arith::Div => p / q,
                };
            }
            Lanes::Float(out, n)
        }
        _ => return Err(mismatch(node, a.ty().name(), b)),
    };
    Ok(Value::from_lanes(out))
}

fn length(l: &[f32; 4], n: u8) -> f32 {
    l[..n as usize].iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn apply(op: &Op, node: u32, args: &[Value], ctx: &mut EvalContext<'_, '_>) -> Result<Value, EvalError> {
    let value = match *op {
        Op::Copy => args[0],
        Op::And => Value::Bool(as_bool(node, &args[0])? && as_bool(node, &args[1])?),
        Op::Or => Value::Bool(as_bool(node, &args[0])? || as_bool(node, &args[1])?),
        Op::Xor => Value::Bool(as_bool(node, &args[0])? ^ as_bool(node, &args[1])?),
        Op::Not => Value::Bool(!as_bool(node, &args[0])?),
        Op::CompareInt(cmp) => Value::Bool(cmp.apply(as_int(node, &args[0])?, as_int(node, &args[1])?)),
        Op::CompareFloat(cmp) => {
            Value::Bool(cmp.apply(as_float(node, &args[0])?, as_float(node, &args[1])?))
        }
        Op::Add => arith(node, Arith::Add, &args[0], &args[1])?,
        Op::Sub => arith(node, Arith::Sub, &args[0], &args[1])?,
        Op::Mul => arith(node, Arith::Mul, &args[0], &args[1])?,
        Op::Div => arith(node, Arith::Div, &args[0], &args[1])?,
        Op::Negate => match lanes(node, &args[0])? {
            Lanes::Int(mut l, n) => {
                l.iter_mut().for_each(|x| *x = x.wrapping_neg());
                Value::from_lanes(Lanes::Int(l, n))
            }
            Lanes::Float(mut l, n) => {
                l.iter_mut().for_each(|x| *x = -*x);
                Value::from_lanes(Lanes::Float(l, n))
            }
        },
        Op::Make { kind, lanes: n } => {
            let out = match kind {
                ScalarKind::Int => {
                    let mut l = [0i32; 4];
                    for (i, arg) in args.iter().enumerate() {
                        l[i] = as_int(node, arg)?;
                    }
                    Lanes::Int(l, n)
                }
                ScalarKind::Float => {
                    let mut l = [0f32; 4];
                    for (i, arg) in args.iter().enumerate() {
                        l[i] = as_float(node, arg)?;
                    }
                    Lanes::Float(l, n)
                }
            };
            Value::from_lanes(out)
        }
        Op::Break { lane } => {
            let l = lanes(node, &args[0])?;
            if lane >= l.count() {
                return Err(crate::GraphError::InvalidLane {
                    node,
                    lane,
                    lanes: l.count(),
                }
                .into());
            }
            match l {
                Lanes::Int(v, _) => Value::Int(v[lane as usize]),
                Lanes::Float(v, _) => Value::Float(v[lane as usize]),
            }
        }
        Op::Swizzle { lanes: order, count } => {
            let l = lanes(node, &args[0])?;
            if let Some(&bad) = order[..count.min(4) as usize].iter().find(|&&i| i >= l.count()) {
                return Err(crate::GraphError::InvalidLane {
                    node,
                    lane: bad,
                    lanes: l.count(),
                }
                .into());
            }
            let out = match l {
                Lanes::Int(v, _) => Lanes::Int(order.map(|i| v[(i & 3) as usize]), count),
                Lanes::Float(v, _) => Lanes::Float(order.map(|i| v[(i & 3) as usize]), count),
            };
            Value::from_lanes(out)
        }
        Op::Length => {
            let (l, n) = float_lanes(node, &args[0])?;
            Value::Float(length(&l, n))
        }
        Op::Distance => {
            let delta = arith(node, Arith::Sub, &args[0], &args[1])?;
            let (l, n) = float_lanes(node, &delta)?;
            Value::Float(length(&l, n))
        }
        Op::RandomFloat => {
            let min = as_float(node, &args[0])?;
            let max = as_float(node, &args[1])?;
            Value::Float(ctx.rng.next_f32_range(min, max))
        }
        Op::RandomDirection { dims } => {
            let angle = ctx.rng.next_f32_range(0.0, core::f32::consts::TAU);
            match dims {
                2 => Value::Float2([angle.cos(), angle.sin()]),
                _ => {
                    let z = ctx.rng.next_f32_range(-1.0, 1.0);
                    let r = (1.0 - z * z).max(0.0).sqrt();
                    Value::Float3([r * angle.cos(), r * angle.sin(), z])
                }
            }
        }
        Op::HasComponent { lookup } => {
            let entity = as_entity(node, &args[0])?;
            Value::Bool(ctx.lookups.contains(lookup, entity)?)
        }
        Op::LookupField { lookup, offset, ty } => {
            let entity = as_entity(node, &args[0])?;
            let mut buf = [0u8; 16];
            let bytes = &mut buf[..ty.size() as usize];
            ctx.lookups.read_into(lookup, entity, offset, bytes)?;
            decode(ty, bytes)?
        }
    };
    Ok(value)
}
