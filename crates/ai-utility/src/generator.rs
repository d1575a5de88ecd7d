use std::collections::BTreeMap;

use ai_core::Entity;
use ai_expr::{EvalContext, Evaluator, Operand, Value, ValueType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::QueryError;

/// Source of candidate items for one pass.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Generator {
    /// Points on an axis-aligned grid around `center`, row-major, extents inclusive.
    ///
    /// `center` and `size` are `float2`, `spacing` is `float`. A non-positive spacing or a
    /// non-finite size yields the center alone.
    Grid {
        center: Operand,
        size: Operand,
        spacing: Operand,
    },
    /// `count` points evenly spaced on a circle, starting on the +x axis.
    Ring {
        center: Operand,
        radius: Operand,
        count: Operand,
    },
    /// Entities from a precomputed set, usually keyed by the query's identity.
    Entities { set: u64 },
}

impl Generator {
    pub fn item_type(&self) -> ValueType {
        match self {
            Generator::Grid { .. } | Generator::Ring { .. } => ValueType::Float2,
            Generator::Entities { .. } => ValueType::Entity,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Generator::Grid { .. } => "grid",
            Generator::Ring { .. } => "ring",
            Generator::Entities { .. } => "entities",
        }
    }

    /// Append at most `limit` items to `out`.
    pub fn generate(
        &self,
        eval: &mut Evaluator<'_>,
        ctx: &mut EvalContext<'_, '_>,
        sets: &EntitySets,
        limit: usize,
        out: &mut Vec<Value>,
    ) -> Result<(), QueryError> {
        eval.reset();
        match self {
            Generator::Grid {
                center,
                size,
                spacing,
            } => {
                let center = float2(eval, ctx, center)?;
                let size = float2(eval, ctx, size)?;
                let spacing = eval.eval_float(spacing, ctx)?;

                if spacing.is_nan() || spacing <= 0.0 || !size.iter().all(|e| e.is_finite()) {
                    out.extend((limit > 0).then_some(Value::Float2(center)));
                    return Ok(());
                }
                // Rows and columns past `limit` can never be reached.
                let steps = |extent: f32| {
                    let steps = (extent.max(0.0) / spacing + 1e-4).floor().min(limit as f32);
                    (steps as usize).saturating_add(1)
                };
                let (nx, ny) = (steps(size[0]), steps(size[1]));
                let origin = [center[0] - size[0] * 0.5, center[1] - size[1] * 0.5];
                let points = (0..ny).flat_map(|j| {
                    (0..nx).map(move |i| {
                        Value::Float2([
                            origin[0] + i as f32 * spacing,
                            origin[1] + j as f32 * spacing,
                        ])
                    })
                });
                out.extend(points.take(limit));
            }
            Generator::Ring {
                center,
                radius,
                count,
            } => {
                let center = float2(eval, ctx, center)?;
                let radius = eval.eval_float(radius, ctx)?;
                let count = eval.eval_int(count, ctx)?.max(0) as usize;
                let step = core::f32::consts::TAU / count.max(1) as f32;
                out.extend((0..count.min(limit)).map(|i| {
                    let angle = i as f32 * step;
                    Value::Float2([
                        center[0] + radius * angle.cos(),
                        center[1] + radius * angle.sin(),
                    ])
                }));
            }
            Generator::Entities { set } => {
                let entities = sets.get(*set).ok_or(QueryError::EntitySetPending { set: *set })?;
                out.extend(entities.iter().take(limit).map(|&e| Value::Entity(e)));
            }
        }
        Ok(())
    }
}

fn float2(
    eval: &mut Evaluator<'_>,
    ctx: &mut EvalContext<'_, '_>,
    operand: &Operand,
) -> Result<[f32; 2], QueryError> {
    match eval.eval(operand, ctx)? {
        Value::Float2(v) => Ok(v),
        other => Err(ai_expr::EvalError::TypeMismatch {
            node: u32::MAX,
            expected: "float2",
            found: other.ty(),
        }
        .into()),
    }
}

/// Entity sets produced ahead of the query, keyed by set identity.
///
/// The host fills these before the tick's query pass runs; a missing key means the producer has
/// not finished yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EntitySets {
    sets: BTreeMap<u64, Vec<Entity>>,
}

impl EntitySets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, set: u64, entities: Vec<Entity>) {
        self.sets.insert(set, entities);
    }

    pub fn get(&self, set: u64) -> Option<&[Entity]> {
        self.sets.get(&set).map(Vec::as_slice)
    }

    pub fn contains(&self, set: u64) -> bool {
        self.sets.contains_key(&set)
    }

    pub fn remove(&mut self, set: u64) -> Option<Vec<Entity>> {
        self.sets.remove(&set)
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
