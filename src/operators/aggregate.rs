//! Folds the current row into the query's [`AggregateHashmap`].
//!
//! Unlike every other operator, `Aggregate` never calls [`emit`] — a
//! GROUP BY's output is only materialized once, at end-of-query, from the
//! finalized hashmap (see the driver), not one row at a time.

use crate::context::RuntimeContext;
use crate::expression::Expression;
use crate::operators::Operator;

/// `group_expressions` compute the key this row groups under, in the same
/// order the hashmap's group columns were declared in. `aggregate_sources`
/// is parallel to the hashmap's `AggregateSlot`s: `Some(expr)` computes the
/// value folded into that slot, `None` is `COUNT(*)`, which needs no input
/// expression at all.
#[derive(Debug)]
pub struct Aggregate {
    group_expressions: Vec<Expression>,
    aggregate_sources: Vec<Option<Expression>>,
}

impl Aggregate {
    pub fn new(group_expressions: Vec<Expression>, aggregate_sources: Vec<Option<Expression>>) -> Self {
        Aggregate {
            group_expressions,
            aggregate_sources,
        }
    }
}

impl Operator for Aggregate {
    fn consume(&mut self, ctx: &mut RuntimeContext, _rest: &mut [Box<dyn Operator>]) {
        let key: Vec<_> = self
            .group_expressions
            .iter()
            .map(|expr| {
                expr.compute(ctx);
                expr.handle().get_runtime(ctx)
            })
            .collect();

        let mut hashmap = ctx.hashmap.take().expect("Aggregate operator requires ctx.hashmap");
        let row = hashmap.find_or_create_group(&key);

        for (slot_index, source) in self.aggregate_sources.iter().enumerate() {
            let incoming = source.as_ref().map(|expr| {
                expr.compute(ctx);
                expr.handle().get_runtime(ctx)
            });
            let incoming = match incoming {
                Some(value) if value.is_null() => None,
                other => other,
            };
            hashmap.update(slot_index, row, incoming);
        }
        ctx.hashmap = Some(hashmap);
    }
}
