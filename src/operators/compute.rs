//! Evaluates a list of extra (non-column) expressions into the tuple, then
//! passes the row on unconditionally.

use crate::context::RuntimeContext;
use crate::expression::Expression;
use crate::operators::{emit, Operator};

/// One `Compute` per node that needs derived values written into the tuple
/// before the next stage runs — arithmetic results, comparison outcomes, or
/// any other intermediate that isn't a column read. Unlike `Filter`, `Compute`
/// never drops a row; it only populates slots.
#[derive(Debug)]
pub struct Compute {
    expressions: Vec<Expression>,
}

impl Compute {
    pub fn new(expressions: Vec<Expression>) -> Self {
        Compute { expressions }
    }
}

impl Operator for Compute {
    fn consume(&mut self, ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]) {
        for expression in &self.expressions {
            expression.compute(ctx);
        }
        emit(ctx, rest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{BinaryExpr, BinaryOp, ColumnExpr, LiteralExpr};
    use crate::handle::TupleHandle;
    use crate::mvcc::{MvccArrays, MvccSnapshot, MvccState};
    use crate::value::{DataType, RuntimeValue};
    use parking_lot::RwLock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Counter {
        count: Arc<AtomicUsize>,
    }

    impl Operator for Counter {
        fn consume(&mut self, _ctx: &mut RuntimeContext, _rest: &mut [Box<dyn Operator>]) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ctx(slots: usize) -> RuntimeContext {
        let arrays = Arc::new(RwLock::new(MvccArrays::fresh(1)));
        let snapshot = MvccSnapshot {
            transaction_id: 0,
            snapshot_commit_id: 0,
        };
        RuntimeContext::new(0, slots, MvccState::bind_direct(snapshot, &arrays))
    }

    #[test]
    fn computed_sum_lands_in_its_slot_and_row_still_emits() {
        let left_handle = TupleHandle::new(DataType::Int32, false, 0);
        let result_handle = TupleHandle::new(DataType::Int32, false, 1);
        let expression = Expression::Binary(BinaryExpr {
            op: BinaryOp::Add,
            left: Box::new(Expression::Column(ColumnExpr {
                column_id: 0,
                handle: left_handle,
            })),
            right: Box::new(Expression::Literal(LiteralExpr {
                value: RuntimeValue::Int32(Some(4)),
                handle: TupleHandle::new(DataType::Int32, false, 2),
            })),
            handle: result_handle,
            logical_pruning: false,
        });
        let mut compute = Compute::new(vec![expression]);
        let mut c = ctx(3);
        left_handle.set::<i32>(&mut c, Some(10));

        let count = Arc::new(AtomicUsize::new(0));
        let mut rest: Vec<Box<dyn Operator>> = vec![Box::new(Counter { count: count.clone() })];
        compute.consume(&mut c, &mut rest);

        assert_eq!(result_handle.get::<i32>(&c), Some(14));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
