//! Runs one [`Plan`] to completion over a [`Table`], chunk by chunk.
//!
//! The driver is the only place that owns cross-chunk state: the aggregate
//! hashmap (if the plan groups) and the remaining `LIMIT` budget both have
//! to survive from one chunk's [`RuntimeContext`] to the next, even though a
//! fresh context is built for every chunk (§ MVCC lock scope). Everything
//! else — Validate, Filter, Compute, Aggregate, Limit, Write — is built once
//! from the plan and reused unchanged across every chunk; only `Read` is
//! rebuilt, since it's the only stage bound to a specific chunk's segments.

use tracing::{debug, trace};

use crate::context::RuntimeContext;
use crate::error::StorageResult;
use crate::mvcc::{MvccSnapshot, MvccState};
use crate::operators::write;
use crate::operators::Operator;
use crate::plan::Plan;
use crate::table::{Chunk, Table};

/// Drives one [`Plan`] against a [`Table`] under a fixed MVCC snapshot.
#[derive(Debug)]
pub struct Driver {
    plan: Plan,
}

impl Driver {
    pub fn new(plan: Plan) -> Self {
        Driver { plan }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Scans every chunk of `table`, visible-row filtering first (if MVCC is
    /// enabled), then the plan's filter/compute/aggregate/limit chain, and
    /// returns the result as a single-chunk [`Table`].
    ///
    /// A plain (non-aggregating) plan's result chunk holds every row the
    /// chain emitted, re-materialized through `Write`'s bound output
    /// columns. An aggregating plan's result chunk holds one row per group,
    /// materialized from the finalized hashmap instead — the scan itself
    /// never calls `Write` for a grouped query's *input* rows, only
    /// `Aggregate`.
    pub fn run(&mut self, table: &Table, snapshot: MvccSnapshot) -> StorageResult<Table> {
        let tuple_slots = self.plan.tuple_slot_count();
        let (mut chain, shared_writers) = self.plan.build_tail_chain();

        let mut hashmap = self.plan.aggregate_spec().map(|spec| {
            crate::aggregate::AggregateHashmap::new(&spec.group_types, spec.slots.clone())
        });
        let mut limit_remaining = self.plan.limit();

        debug!(chunks = table.chunks.len(), "starting scan");

        'scan: for (chunk_index, chunk) in table.chunks.iter().enumerate() {
            let mut read_op = self.plan.build_read_operator(chunk)?;
            let mut ctx = self.bind_chunk_context(chunk_index, chunk, tuple_slots, snapshot);
            ctx.hashmap = hashmap.take();
            ctx.limit_remaining = limit_remaining;

            for row in 0..chunk.row_count {
                ctx.row_offset = row;
                read_op.consume(&mut ctx, &mut chain);
                if ctx.should_stop {
                    trace!(chunk_index, row, "limit exhausted, stopping scan");
                    hashmap = ctx.hashmap.take();
                    limit_remaining = Some(0);
                    break 'scan;
                }
            }

            hashmap = ctx.hashmap.take();
            limit_remaining = ctx.limit_remaining;
        }

        if let Some(mut hashmap) = hashmap {
            hashmap.finalize();
            let spec = self
                .plan
                .aggregate_spec()
                .expect("hashmap only exists when the plan has an aggregate spec");
            let mut data_types = spec.group_types.clone();
            data_types.extend(spec.slots.iter().map(|s| (s.handle.data_type(), s.handle.is_nullable())));
            let row_count = hashmap.num_groups();
            let columns = hashmap.into_columns(&data_types);
            return Ok(Table::new(vec![Chunk::new(row_count, columns, crate::mvcc::MvccArrays::fresh(row_count))]));
        }

        let columns = write::finish_writers(shared_writers);
        let row_count = columns.first().map_or(0, |c| c.len());
        Ok(Table::new(vec![Chunk::new(row_count, columns, crate::mvcc::MvccArrays::fresh(row_count))]))
    }

    fn bind_chunk_context(
        &self,
        chunk_index: usize,
        chunk: &Chunk,
        tuple_slots: usize,
        snapshot: MvccSnapshot,
    ) -> RuntimeContext {
        let mvcc = MvccState::bind_direct(snapshot, &chunk.mvcc);
        RuntimeContext::new(chunk_index, tuple_slots, mvcc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::expression::{BinaryExpr, BinaryOp, ColumnExpr, Expression, LiteralExpr};
    use crate::mvcc::{MvccArrays, OPEN_END_CID};
    use crate::plan::PlanBuilder;
    use crate::table::{ColumnData, ColumnSegment, DenseSegment};
    use crate::value::{DataType, RuntimeValue};

    fn table_with_one_int_column(values: Vec<i32>) -> Table {
        let row_count = values.len();
        let column = ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(values)));
        let chunk = Chunk::new(row_count, vec![column], MvccArrays::fresh(row_count));
        Table::new(vec![chunk])
    }

    #[test]
    fn filters_rows_and_writes_matching_column_back_out() {
        let table = table_with_one_int_column(vec![1, 2, 3, 2, 1]);
        let mut builder = PlanBuilder::new(EngineConfig::default());
        let column = builder.bind_input_column(0, DataType::Int32, false);
        let literal_handle = builder.allocate_slot(DataType::Int32, false);
        let result_handle = builder.allocate_slot(DataType::Bool, false);
        let filter = Expression::Binary(BinaryExpr {
            op: BinaryOp::Eq,
            left: Box::new(Expression::Column(ColumnExpr { column_id: 0, handle: column })),
            right: Box::new(Expression::Literal(LiteralExpr {
                value: RuntimeValue::Int32(Some(2)),
                handle: literal_handle,
            })),
            handle: result_handle,
            logical_pruning: true,
        });
        builder.set_filter(filter).unwrap();
        builder.add_output_column(column);
        let plan = builder.build().unwrap();

        let mut driver = Driver::new(plan);
        let snapshot = MvccSnapshot {
            transaction_id: 0,
            snapshot_commit_id: 0,
        };
        let result = driver.run(&table, snapshot).unwrap();

        assert_eq!(result.chunks[0].row_count, 2);
        match &*result.chunks[0].columns[0] {
            ColumnData::Int32(ColumnSegment::Dense(segment)) => {
                assert_eq!(segment.value_at(0), Some(2));
                assert_eq!(segment.value_at(1), Some(2));
            }
            _ => panic!("expected a dense Int32 column"),
        }
    }

    #[test]
    fn invisible_rows_are_excluded_from_the_result() {
        let column = ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(vec![10, 20])));
        let mvcc = MvccArrays {
            begin_cids: vec![0, 100],
            end_cids: vec![OPEN_END_CID, OPEN_END_CID],
            row_tids: vec![0, 0],
        };
        let chunk = Chunk::new(2, vec![column], mvcc);
        let table = Table::new(vec![chunk]);

        let mut builder = PlanBuilder::new(EngineConfig::default());
        let column_handle = builder.bind_input_column(0, DataType::Int32, false);
        builder.add_output_column(column_handle);
        let plan = builder.build().unwrap();

        let mut driver = Driver::new(plan);
        let snapshot = MvccSnapshot {
            transaction_id: 0,
            snapshot_commit_id: 10,
        };
        let result = driver.run(&table, snapshot).unwrap();
        assert_eq!(result.chunks[0].row_count, 1);
    }

    #[test]
    fn limit_stops_the_scan_early_across_chunks() {
        let column_a = ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(vec![1, 2])));
        let column_b = ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(vec![3, 4])));
        let chunk_a = Chunk::new(2, vec![column_a], MvccArrays::fresh(2));
        let chunk_b = Chunk::new(2, vec![column_b], MvccArrays::fresh(2));
        let table = Table::new(vec![chunk_a, chunk_b]);

        let mut builder = PlanBuilder::new(EngineConfig::default());
        let column_handle = builder.bind_input_column(0, DataType::Int32, false);
        builder.add_output_column(column_handle);
        builder.set_limit(3);
        let plan = builder.build().unwrap();

        let mut driver = Driver::new(plan);
        let snapshot = MvccSnapshot {
            transaction_id: 0,
            snapshot_commit_id: 0,
        };
        let result = driver.run(&table, snapshot).unwrap();
        assert_eq!(result.chunks[0].row_count, 3);
    }
}
