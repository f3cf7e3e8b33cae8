//! Enforces a `LIMIT` row budget and signals the driver to stop scanning
//! once it's exhausted.

use crate::context::RuntimeContext;
use crate::operators::{emit, Operator};

/// Emits the row and consumes one unit of `ctx.limit_remaining` if the
/// budget still permits it; otherwise drops the row and sets
/// `ctx.should_stop`, which the driver checks after every row to end the
/// scan early rather than processing further chunks for no reason.
#[derive(Debug, Default)]
pub struct Limit;

impl Operator for Limit {
    fn consume(&mut self, ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]) {
        if ctx.limit_permits_row() {
            ctx.consume_limit();
            emit(ctx, rest);
            if !ctx.limit_permits_row() {
                ctx.should_stop = true;
            }
        } else {
            ctx.should_stop = true;
        }
    }
}
