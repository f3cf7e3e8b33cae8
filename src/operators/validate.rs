//! Drops rows invisible to the query's MVCC snapshot.

use crate::context::RuntimeContext;
use crate::operators::{emit, Operator};

/// Checks `ctx.mvcc.is_visible(ctx.row_offset)` and only emits visible rows.
/// Disabled entirely (the chain omits this operator) when
/// `EngineConfig::enable_mvcc` is false.
#[derive(Debug, Default)]
pub struct Validate;

impl Operator for Validate {
    fn consume(&mut self, ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]) {
        if ctx.mvcc.is_visible(ctx.row_offset) {
            emit(ctx, rest);
        }
    }
}
