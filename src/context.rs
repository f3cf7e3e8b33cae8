//! Per-chunk runtime state shared by every node in an operator chain while
//! processing one chunk.
//!
//! One [`RuntimeContext`] is created per chunk per pipeline instance and
//! lives for that chunk's lifetime: it owns the runtime tuple (the one row
//! of scratch space every expression reads and writes through), the bound
//! MVCC visibility state, the optional aggregate hashmap, and the row
//! budget for `LIMIT`. Readers, writers, and the operator chain itself take
//! `&mut RuntimeContext` rather than owning any of this, so the same chain
//! can be rebuilt against a fresh context for the next chunk without
//! reallocating the chain itself.

use crate::aggregate::AggregateHashmap;
use crate::mvcc::MvccState;
use crate::value::VariantVector;

/// Mutable state threaded through one chunk's worth of row-at-a-time
/// evaluation.
#[derive(Debug)]
pub struct RuntimeContext {
    pub chunk_id: usize,
    /// Offset of the row currently being processed, within the *input*
    /// chunk. Advanced by the driver's per-row loop; segment readers index
    /// into their bound column with this.
    pub row_offset: usize,
    pub(crate) tuple: VariantVector,
    pub mvcc: MvccState,
    pub hashmap: Option<AggregateHashmap>,
    /// Rows still permitted by an active `LIMIT`. `None` means unbounded.
    pub limit_remaining: Option<u64>,
    /// Set by the Limit operator once the budget is exhausted; the driver
    /// checks this after every row to stop scanning early.
    pub should_stop: bool,
}

impl RuntimeContext {
    pub fn new(chunk_id: usize, tuple_slots: usize, mvcc: MvccState) -> Self {
        let mut tuple = VariantVector::new();
        tuple.resize(tuple_slots);
        RuntimeContext {
            chunk_id,
            row_offset: 0,
            tuple,
            mvcc,
            hashmap: None,
            limit_remaining: None,
            should_stop: false,
        }
    }

    pub fn with_hashmap(mut self, hashmap: AggregateHashmap) -> Self {
        self.hashmap = Some(hashmap);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit_remaining = Some(limit);
        self
    }

    /// Whether the row budget (if any) still permits another output row.
    /// `LIMIT 0` and an exhausted budget both report `false`.
    pub fn limit_permits_row(&self) -> bool {
        self.limit_remaining.is_none_or(|remaining| remaining > 0)
    }

    /// Consumes one unit of the row budget, if one is active.
    pub fn consume_limit(&mut self) {
        if let Some(remaining) = self.limit_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvcc::{MvccArrays, MvccSnapshot};
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn mvcc_state() -> MvccState {
        let arrays = Arc::new(RwLock::new(MvccArrays::fresh(1)));
        let snapshot = MvccSnapshot {
            transaction_id: 0,
            snapshot_commit_id: 0,
        };
        MvccState::bind_direct(snapshot, &arrays)
    }

    #[test]
    fn new_context_sizes_tuple_and_has_no_limit() {
        let ctx = RuntimeContext::new(3, 5, mvcc_state());
        assert_eq!(ctx.tuple.len(), 5);
        assert!(ctx.limit_permits_row());
    }

    #[test]
    fn limit_counts_down_to_zero_then_blocks() {
        let mut ctx = RuntimeContext::new(0, 1, mvcc_state()).with_limit(2);
        assert!(ctx.limit_permits_row());
        ctx.consume_limit();
        assert!(ctx.limit_permits_row());
        ctx.consume_limit();
        assert!(!ctx.limit_permits_row());
        ctx.consume_limit();
        assert!(!ctx.limit_permits_row());
    }

    #[test]
    fn zero_limit_blocks_immediately() {
        let ctx = RuntimeContext::new(0, 1, mvcc_state()).with_limit(0);
        assert!(!ctx.limit_permits_row());
    }
}
