use ai_core::{
    Blackboard, ComponentRef, Components, DeterministicRng, LookupHandle, Lookups, SplitMix64,
};
use ai_expr::{EvalContext, Evaluator, Value};

use crate::{EntitySets, QueryConfig, QueryData, QueryError, QueryItem, QueryOutput, Scorer};

/// Per-call inputs of a query. Component refs and lookup handles are bound against the query
/// graph's declarations on entry.
pub struct QueryContext<'c, 'a> {
    pub components: &'c [ComponentRef<'a>],
    pub lookups: &'c [LookupHandle<'a>],
    pub entity_sets: &'c EntitySets,
    pub now: f32,
    pub rng: &'c mut SplitMix64,
}

/// An item that survived filtering, with its summed score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    /// Index into the call's generated item list.
    pub item: usize,
    pub score: f32,
}

/// Run `query` and write ranked results into `sink`, or the best item into the blackboard.
///
/// Returns the number of items written.
pub fn execute<I: QueryItem>(
    query: &QueryData,
    ctx: QueryContext<'_, '_>,
    blackboard: &mut Blackboard,
    config: &QueryConfig,
    sink: &mut Vec<I>,
) -> Result<usize, QueryError> {
    if let Some(found) = query.item_type().filter(|&ty| ty != I::VALUE_TYPE) {
        tracing::error!(identity = query.identity, %found, expected = %I::VALUE_TYPE, "query item type mismatch");
        return Err(QueryError::ItemTypeMismatch {
            expected: I::VALUE_TYPE,
            found,
        });
    }

    let mut values = Vec::new();
    let count = execute_values(query, ctx, blackboard, config, &mut values)?;
    sink.clear();
    sink.extend(values.into_iter().filter_map(I::from_value));
    Ok(count)
}

/// Type-erased form of [`execute`]: results stay as [`Value`]s.
pub fn execute_values(
    query: &QueryData,
    ctx: QueryContext<'_, '_>,
    blackboard: &mut Blackboard,
    config: &QueryConfig,
    sink: &mut Vec<Value>,
) -> Result<usize, QueryError> {
    sink.clear();
    let (items, ranked) = {
        let mut ectx = EvalContext {
            components: Components::bind(query.graph.locals(), ctx.components)?,
            lookups: Lookups::bind(query.graph.lookups(), ctx.lookups)?,
            blackboard: &*blackboard,
            item: None,
            now: ctx.now,
            rng: ctx.rng,
        };
        run_passes(query, &mut ectx, ctx.entity_sets, config)?
    };

    match query.output {
        QueryOutput::Sink => {
            sink.extend(ranked.iter().map(|s| items[s.item]));
            Ok(sink.len())
        }
        QueryOutput::Blackboard(slot) => {
            let Some(best) = ranked.first() else {
                return Ok(0);
            };
            blackboard.write(slot, items[best.item].to_bytes().as_slice())?;
            Ok(1)
        }
    }
}

fn run_passes(
    query: &QueryData,
    ctx: &mut EvalContext<'_, '_>,
    sets: &EntitySets,
    config: &QueryConfig,
) -> Result<(Vec<Value>, Vec<ScoredItem>), QueryError> {
    let mut eval = Evaluator::new(&query.graph);
    let result_count = eval.eval_int(&query.result_count, ctx)?.max(0) as usize;

    let mut items: Vec<Value> = Vec::new();
    let mut scored: Vec<ScoredItem> = Vec::new();
    if result_count == 0 {
        return Ok((items, scored));
    }

    for (index, pass) in query.passes.iter().enumerate() {
        if index > 0 {
            tracing::debug!(
                identity = query.identity,
                pass = index,
                scored = scored.len(),
                result_count,
                "falling back to next pass"
            );
        }

        let start = items.len();
        for generator in &pass.generators {
            if let Err(err) = generator.generate(
                &mut eval,
                ctx,
                sets,
                config.max_items_per_generator,
                &mut items,
            ) {
                if err.is_pending() {
                    tracing::debug!(identity = query.identity, %err, "query waiting on entity set");
                }
                return Err(err);
            }
        }

        // Swap-remove compaction: survivors of a pass do not keep generation order.
        for filter in &pass.filters {
            let mut i = start;
            while i < items.len() {
                eval.reset();
                ctx.item = Some(items[i]);
                if eval.eval_bool(filter, ctx)? {
                    i += 1;
                } else {
                    items.swap_remove(i);
                }
            }
        }

        for item in start..items.len() {
            eval.reset();
            ctx.item = Some(items[item]);
            let mut score = 0.0;
            for scorer in &pass.scorers {
                score += score_one(scorer, &mut eval, ctx)?;
            }
            scored.push(ScoredItem {
                item,
                score: query.direction.rank_key(score),
            });
        }
        ctx.item = None;

        if scored.len() >= result_count {
            break;
        }
    }

    // Stable: equal scores keep generation order.
    scored.sort_by(|a, b| query.direction.order(a.score, b.score));
    scored.truncate(result_count);
    Ok((items, scored))
}

fn score_one(
    scorer: &Scorer,
    eval: &mut Evaluator<'_>,
    ctx: &mut EvalContext<'_, '_>,
) -> Result<f32, QueryError> {
    let mut score = eval.eval_float(&scorer.value, ctx)?;
    if let Some(normalizer) = scorer.normalizer {
        score = normalizer.apply(score);
    }
    if scorer.negate {
        score = -score;
    }
    if scorer.noise > 0.0 {
        score += ctx.rng.next_f32_range(0.0, scorer.noise);
    }
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_expr::{ExpressionGraph, GraphBuilder};

    fn scalar(value: f32) -> (ExpressionGraph, ai_expr::Operand) {
        let mut b = GraphBuilder::new();
        let c = b.constant(value);
        (b.build().unwrap(), c)
    }

    fn score(scorer: &Scorer, graph: &ExpressionGraph, seed: u64) -> f32 {
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
        let mut eval = Evaluator::new(graph);
        score_one(scorer, &mut eval, &mut ctx).unwrap()
    }

    #[test]
    fn normalize_then_negate() {
        let (graph, c) = scalar(15.0);
        let scorer = Scorer::new(c).with_normalizer(10.0, 20.0).negated();
        assert_eq!(score(&scorer, &graph, 0), -0.5);
    }

    #[test]
    fn noise_is_bounded_and_seeded() {
        let (graph, c) = scalar(1.0);
        let scorer = Scorer::new(c).with_noise(0.25);
        for seed in 0..32 {
            let s = score(&scorer, &graph, seed);
            assert!((1.0..1.25).contains(&s), "seed {seed}: {s}");
            assert_eq!(s, score(&scorer, &graph, seed));
        }
    }
}
