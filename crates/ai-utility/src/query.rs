use ai_core::BbSlot;
use ai_expr::{ExpressionGraph, Operand, ScalarKind, ValueType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Generator, QueryError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScoreDirection {
    #[default]
    LargestWins,
    SmallestWins,
}

impl ScoreDirection {
    /// Map a raw score onto a key where NaN always ranks last.
    pub(crate) fn rank_key(self, score: f32) -> f32 {
        match (self, score.is_nan()) {
            (ScoreDirection::LargestWins, true) => f32::NEG_INFINITY,
            (ScoreDirection::SmallestWins, true) => f32::INFINITY,
            _ => score,
        }
    }

    pub(crate) fn order(self, a: f32, b: f32) -> core::cmp::Ordering {
        match self {
            ScoreDirection::LargestWins => b.total_cmp(&a),
            ScoreDirection::SmallestWins => a.total_cmp(&b),
        }
    }
}

/// Linear map of `[min, max]` onto `[0, 1]`, clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Normalizer {
    pub min: f32,
    pub max: f32,
}

impl Normalizer {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// An empty range acts as a step at `max`.
    pub fn apply(&self, value: f32) -> f32 {
        let span = self.max - self.min;
        if span.abs() <= f32::EPSILON {
            return if value >= self.max { 1.0 } else { 0.0 };
        }
        ((value - self.min) / span).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scorer {
    /// `float` (or `int`) expression evaluated per item.
    pub value: Operand,
    pub normalizer: Option<Normalizer>,
    pub negate: bool,
    /// Upper bound of a uniform term added after normalization and negation.
    pub noise: f32,
}

impl Scorer {
    pub fn new(value: Operand) -> Self {
        Self {
            value,
            normalizer: None,
            negate: false,
            noise: 0.0,
        }
    }

    pub fn with_normalizer(mut self, min: f32, max: f32) -> Self {
        self.normalizer = Some(Normalizer::new(min, max));
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryPass {
    pub generators: Vec<Generator>,
    /// `bool` expressions; an item survives only if every filter holds.
    pub filters: Vec<Operand>,
    /// Per-item score is the sum of all scorers.
    pub scorers: Vec<Scorer>,
}

impl QueryPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(mut self, generator: Generator) -> Self {
        self.generators.push(generator);
        self
    }

    pub fn filter(mut self, condition: Operand) -> Self {
        self.filters.push(condition);
        self
    }

    pub fn score(mut self, scorer: Scorer) -> Self {
        self.scorers.push(scorer);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QueryOutput {
    /// Ranked items into the caller's buffer.
    #[default]
    Sink,
    /// The single best item's bytes into a blackboard slot.
    Blackboard(BbSlot),
}

/// Immutable query asset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryData {
    /// Stable identity hash; keys entity sets and RNG streams.
    pub identity: u64,
    pub graph: ExpressionGraph,
    pub passes: Vec<QueryPass>,
    /// `int` expression; negative values count as zero.
    pub result_count: Operand,
    pub direction: ScoreDirection,
    pub output: QueryOutput,
}

impl QueryData {
    pub fn new(identity: u64, graph: ExpressionGraph, result_count: Operand) -> Self {
        Self {
            identity,
            graph,
            passes: Vec::new(),
            result_count,
            direction: ScoreDirection::LargestWins,
            output: QueryOutput::Sink,
        }
    }

    pub fn with_pass(mut self, pass: QueryPass) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn with_direction(mut self, direction: ScoreDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_output(mut self, output: QueryOutput) -> Self {
        self.output = output;
        self
    }

    /// Item type generators produce, if the query has any generator.
    pub fn item_type(&self) -> Option<ValueType> {
        self.passes
            .iter()
            .flat_map(|p| p.generators.iter())
            .map(Generator::item_type)
            .next()
    }

    /// Check the graph plus every operand the query reads against its expected type.
    pub fn validate(&self) -> Result<(), QueryError> {
        let types = self.graph.validate()?;
        let check = |what: &'static str,
                     operand: &Operand,
                     expected: &'static str,
                     ok: fn(ValueType) -> bool|
         -> Result<(), QueryError> {
            let found = types.operand(&self.graph, operand)?;
            if ok(found) {
                Ok(())
            } else {
                Err(QueryError::OperandType {
                    identity: self.identity,
                    what,
                    expected,
                    found,
                })
            }
        };
        let is_numeric = |ty: ValueType| ty.lanes() == 1 && ty.scalar_kind().is_some();

        check("result count", &self.result_count, "int", |ty| ty == ValueType::Int)?;

        let item = self.item_type();
        for pass in &self.passes {
            for generator in &pass.generators {
                if let Some(expected) = item.filter(|&ty| ty != generator.item_type()) {
                    return Err(QueryError::ItemTypeMismatch {
                        expected,
                        found: generator.item_type(),
                    });
                }
                validate_generator(generator, &check)?;
            }
            for filter in &pass.filters {
                check("filter", filter, "bool", |ty| ty == ValueType::Bool)?;
            }
            for scorer in &pass.scorers {
                check("scorer", &scorer.value, "float", is_numeric)?;
            }
        }

        if let (QueryOutput::Blackboard(slot), Some(ty)) = (self.output, item) {
            if slot.size != ty.size() {
                return Err(ai_expr::GraphError::BlackboardSlotSize {
                    offset: slot.offset,
                    slot_size: slot.size,
                    ty,
                }
                .into());
            }
        }
        Ok(())
    }
}

fn validate_generator<F>(generator: &Generator, check: &F) -> Result<(), QueryError>
where
    F: Fn(&'static str, &Operand, &'static str, fn(ValueType) -> bool) -> Result<(), QueryError>,
{
    let is_float2 = |ty: ValueType| ty == ValueType::Float2;
    let is_scalar = |ty: ValueType| ty.lanes() == 1 && ty.scalar_kind() == Some(ScalarKind::Float);
    match generator {
        Generator::Grid {
            center,
            size,
            spacing,
        } => {
            check("grid center", center, "float2", is_float2)?;
            check("grid size", size, "float2", is_float2)?;
            check("grid spacing", spacing, "float", is_scalar)
        }
        Generator::Ring {
            center,
            radius,
            count,
        } => {
            check("ring center", center, "float2", is_float2)?;
            check("ring radius", radius, "float", is_scalar)?;
            check("ring count", count, "int", |ty| ty == ValueType::Int)
        }
        Generator::Entities { .. } => Ok(()),
    }
}

/// Knobs for query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueryConfig {
    /// Upper bound on items any single generator may append.
    pub max_items_per_generator: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_items_per_generator: 4096,
        }
    }
}

impl QueryConfig {
    pub fn with_max_items_per_generator(mut self, max: usize) -> Self {
        self.max_items_per_generator = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizer_clamps() {
        let n = Normalizer::new(10.0, 20.0);
        assert_eq!(n.apply(5.0), 0.0);
        assert_eq!(n.apply(15.0), 0.5);
        assert_eq!(n.apply(25.0), 1.0);
        assert_eq!(Normalizer::new(3.0, 3.0).apply(3.0), 1.0);
    }

    #[test]
    fn nan_ranks_last_either_way() {
        let largest = ScoreDirection::LargestWins;
        let smallest = ScoreDirection::SmallestWins;
        assert_eq!(largest.rank_key(f32::NAN), f32::NEG_INFINITY);
        assert_eq!(smallest.rank_key(f32::NAN), f32::INFINITY);
        assert_eq!(largest.order(2.0, 1.0), core::cmp::Ordering::Less);
        assert_eq!(smallest.order(2.0, 1.0), core::cmp::Ordering::Greater);
    }
}
