//! The operator chain: a straight recursive call sequence, one node per
//! pipeline stage, with no intermediate batching or queueing (§5).
//!
//! A chain is a `Vec<Box<dyn Operator>>`. Each operator's `consume` decides,
//! for the current row, whether to call [`emit`] — which hands the row to
//! the next operator in the slice — or to drop it (Filter rejects it,
//! Validate finds it invisible, Limit has exhausted its budget). There is
//! no shared dispatch loop: the recursion depth is the chain length, and
//! each `consume` call is the entire per-row cost for that stage.

pub mod aggregate;
pub mod compute;
pub mod filter;
pub mod limit;
pub mod read;
pub mod validate;
pub mod write;

use std::fmt;

use crate::context::RuntimeContext;

/// One stage of the per-row pipeline.
pub trait Operator: fmt::Debug + Send {
    /// Processes the current row (`ctx.row_offset`) and, if this stage
    /// doesn't reject it, calls [`emit`] to hand it to `rest`.
    fn consume(&mut self, ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]);
}

/// Hands the current row to the next operator in the chain, if any. The
/// last operator in a chain (always a Write) is called with an empty
/// `rest` and does not call this.
pub fn emit(ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]) {
    if let Some((next, tail)) = rest.split_first_mut() {
        next.consume(ctx, tail);
    }
}
