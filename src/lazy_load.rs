//! Plan-time classification of which columns a Read/Filter/Compute node
//! needs to actually load versus which are already sitting in the tuple
//! from an earlier node in the chain.
//!
//! [`LazyLoadPlanner`] walks the operator chain's expressions in order and,
//! for each column reference it encounters, decides whether this is the
//! first time that column is needed (so some operator must bind a segment
//! reader for it) or whether an earlier node already loaded it. Within
//! "needs loading", it further distinguishes columns only needed
//! transiently by the node asking for them (`LoadWithoutStore`) from
//! columns a later node will also need (`LoadAndStore`) — this is plan-time
//! bookkeeping only. At runtime both are bound to the same kind of
//! segment reader and always write through to their slot: see
//! [`crate::segment::TypedSegmentReader`].

use std::collections::HashSet;

use crate::expression::Expression;

/// How a Column leaf's value should be obtained when its owning node runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyLoad {
    /// First reference to this column; a later node also references it, so
    /// the loaded value must be kept in its slot.
    LoadAndStore,
    /// First reference to this column, and no later node needs it.
    LoadWithoutStore,
    /// Already loaded into its slot by an earlier node in the chain.
    ReadFromSlot,
}

/// Tracks which source columns have already been loaded as the planner
/// walks an operator chain front to back.
#[derive(Debug, Default)]
pub struct LazyLoadPlanner {
    loaded: HashSet<usize>,
}

impl LazyLoadPlanner {
    pub fn new() -> Self {
        LazyLoadPlanner::default()
    }

    /// Classifies `column_id`. `needed_downstream` is whether any node
    /// after the current one also references this column (the caller
    /// determines this by a first pass over the whole remaining chain, see
    /// [`accessed_column_ids`]).
    pub fn classify(&mut self, column_id: usize, needed_downstream: bool) -> LazyLoad {
        if self.loaded.contains(&column_id) {
            return LazyLoad::ReadFromSlot;
        }
        self.loaded.insert(column_id);
        if needed_downstream {
            LazyLoad::LoadAndStore
        } else {
            LazyLoad::LoadWithoutStore
        }
    }

    pub fn has_loaded(&self, column_id: usize) -> bool {
        self.loaded.contains(&column_id)
    }
}

/// Collects every source column id a Column leaf in `expr` references.
pub fn accessed_column_ids(expr: &Expression) -> HashSet<usize> {
    let mut ids = HashSet::new();
    collect_column_ids(expr, &mut ids);
    ids
}

fn collect_column_ids(expr: &Expression, ids: &mut HashSet<usize>) {
    match expr {
        Expression::Column(e) => {
            ids.insert(e.column_id);
        }
        Expression::Literal(_) => {}
        Expression::Unary(e) => collect_column_ids(&e.operand, ids),
        Expression::Binary(e) => {
            collect_column_ids(&e.left, ids);
            collect_column_ids(&e.right, ids);
        }
        Expression::Between(e) => {
            collect_column_ids(&e.value, ids);
            collect_column_ids(&e.low, ids);
            collect_column_ids(&e.high, ids);
        }
        Expression::In(e) => {
            collect_column_ids(&e.value, ids);
            for item in &e.list {
                collect_column_ids(item, ids);
            }
        }
        Expression::Like(e) => collect_column_ids(&e.value, ids),
    }
}
