//! Evaluates a boolean expression and only emits rows where it is `TRUE`
//! (NULL and `FALSE` are both rejected, per SQL `WHERE` semantics).

use crate::context::RuntimeContext;
use crate::expression::Expression;
use crate::operators::{emit, Operator};

#[derive(Debug)]
pub struct Filter {
    condition: Expression,
}

impl Filter {
    pub fn new(condition: Expression) -> Self {
        Filter { condition }
    }
}

impl Operator for Filter {
    fn consume(&mut self, ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]) {
        if self.condition.compute_and_get::<bool>(ctx) == Some(true) {
            emit(ctx, rest);
        }
    }
}
