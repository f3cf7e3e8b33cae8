//! Builds a [`Plan`]: the tuple layout, operator chain recipe, and
//! validated expression tree the driver replays against every chunk of a
//! scan.
//!
//! Planning is the one place `PlanError` can be raised — the driver's
//! per-row loop never returns a `Result` (see [`crate::error`]). A `Plan`
//! is built once per query and reused across every chunk; only the `Read`
//! operator at the head of the chain is rebuilt per chunk, since it's the
//! only stage whose state (which physical segment it binds to) depends on
//! which chunk is currently being scanned.

use std::collections::HashSet;

use crate::aggregate::AggregateSlot;
use crate::config::EngineConfig;
use crate::error::{PlanError, PlanResult, StorageError, StorageResult};
use crate::expression::{BinaryOp, Expression};
use crate::handle::TupleHandle;
use crate::lazy_load::{self, LazyLoad, LazyLoadPlanner};
use crate::operators::aggregate::Aggregate;
use crate::operators::compute::Compute;
use crate::operators::filter::Filter;
use crate::operators::limit::Limit;
use crate::operators::read::Read;
use crate::operators::validate::Validate;
use crate::operators::write::Write;
use crate::operators::Operator;
use crate::segment;
use crate::table::Chunk;
use crate::value::DataType;

/// One input column this plan reads: which source column it binds to, and
/// which tuple slot the bound reader writes into.
#[derive(Debug, Clone, Copy)]
pub struct InputBinding {
    pub column_id: usize,
    pub handle: TupleHandle,
}

/// The aggregation half of a plan: group-by key expressions plus, for each
/// aggregate output, which function it computes and which expression feeds
/// it (`None` for `COUNT(*)`).
#[derive(Debug, Clone)]
pub struct AggregateSpec {
    pub group_types: Vec<(DataType, bool)>,
    pub group_expressions: Vec<Expression>,
    pub slots: Vec<AggregateSlot>,
    pub sources: Vec<Option<Expression>>,
}

/// A fully built, validated query plan. Immutable once constructed by
/// [`PlanBuilder::build`].
#[derive(Debug)]
pub struct Plan {
    config: EngineConfig,
    tuple_slot_count: usize,
    input_bindings: Vec<InputBinding>,
    filter: Option<Expression>,
    compute: Vec<Expression>,
    aggregate: Option<AggregateSpec>,
    limit: Option<u64>,
    output_handles: Vec<TupleHandle>,
    lazy_load: Vec<(usize, LazyLoad)>,
}

impl Plan {
    pub fn tuple_slot_count(&self) -> usize {
        self.tuple_slot_count
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn aggregate_spec(&self) -> Option<&AggregateSpec> {
        self.aggregate.as_ref()
    }

    /// The classification [`lazy_load::LazyLoadPlanner`] assigned to each
    /// accessed column, in the order columns were first encountered. Exposed
    /// for diagnostics and tests; it does not change what gets bound — see
    /// [`Plan::build_read_operator`].
    pub fn lazy_load_classification(&self) -> &[(usize, LazyLoad)] {
        &self.lazy_load
    }

    /// Rebuilds the Read operator for `chunk`: one typed reader per input
    /// column this plan actually needs. With `enable_lazy_load` on, columns
    /// nothing downstream references are skipped entirely — no reader is
    /// bound, so they're never loaded from the chunk at all.
    ///
    /// This runs at chunk start, not at plan build, so a missing column is a
    /// [`StorageError`] (the chunk doesn't match the schema the plan was
    /// built against) rather than a [`PlanError`] — the plan itself was
    /// valid when built.
    pub fn build_read_operator(&self, chunk: &Chunk) -> StorageResult<Read> {
        let accessed = self.accessed_column_ids();
        let mut readers = Vec::new();
        for binding in &self.input_bindings {
            if self.config.enable_lazy_load && !accessed.contains(&binding.column_id) {
                continue;
            }
            let column = chunk
                .columns
                .get(binding.column_id)
                .ok_or_else(|| StorageError::SegmentLoad {
                    column: binding.column_id,
                    reason: "chunk has no column at this index".to_string(),
                })?
                .clone();
            readers.push(segment::reader_for(column, binding.handle));
        }
        Ok(Read::new(readers))
    }

    /// Builds the reusable tail of the chain (everything after Read):
    /// `[Validate?, Filter?, Compute, Aggregate?, Limit?, Write]`, plus the
    /// shared handle the driver uses to collect the output columns once the
    /// scan finishes. Built once per query and driven with a fresh Read
    /// ahead of it for every chunk.
    pub fn build_tail_chain(&self) -> (Vec<Box<dyn Operator>>, crate::operators::write::SharedWriters) {
        let mut chain: Vec<Box<dyn Operator>> = Vec::new();
        if self.config.enable_mvcc {
            chain.push(Box::new(Validate));
        }
        if let Some(filter) = &self.filter {
            chain.push(Box::new(Filter::new(filter.clone())));
        }
        if !self.compute.is_empty() {
            chain.push(Box::new(Compute::new(self.compute.clone())));
        }
        if let Some(spec) = &self.aggregate {
            chain.push(Box::new(Aggregate::new(
                spec.group_expressions.clone(),
                spec.sources.clone(),
            )));
        }
        if self.limit.is_some() {
            chain.push(Box::new(Limit));
        }
        let writers = self.output_handles.iter().map(|h| segment::writer_for(*h)).collect();
        let (write_op, shared) = Write::new(writers);
        chain.push(Box::new(write_op));
        (chain, shared)
    }

    fn accessed_column_ids(&self) -> HashSet<usize> {
        let mut ids = HashSet::new();
        if let Some(filter) = &self.filter {
            ids.extend(lazy_load::accessed_column_ids(filter));
        }
        for expr in &self.compute {
            ids.extend(lazy_load::accessed_column_ids(expr));
        }
        if let Some(spec) = &self.aggregate {
            for expr in &spec.group_expressions {
                ids.extend(lazy_load::accessed_column_ids(expr));
            }
            for source in spec.sources.iter().flatten() {
                ids.extend(lazy_load::accessed_column_ids(source));
            }
        }
        for output in &self.output_handles {
            if let Some(binding) = self
                .input_bindings
                .iter()
                .find(|b| b.handle.tuple_index() == output.tuple_index())
            {
                ids.insert(binding.column_id);
            }
        }
        ids
    }
}

/// Incrementally assembles a [`Plan`]: allocate tuple slots, register input
/// column bindings, attach a filter/compute list/aggregate/limit, declare
/// the output columns, then [`PlanBuilder::build`].
#[derive(Debug)]
pub struct PlanBuilder {
    config: EngineConfig,
    next_slot: usize,
    slot_types: Vec<(DataType, bool)>,
    input_bindings: Vec<InputBinding>,
    filter: Option<Expression>,
    compute: Vec<Expression>,
    aggregate: Option<AggregateSpec>,
    limit: Option<u64>,
    output_handles: Vec<TupleHandle>,
}

impl PlanBuilder {
    pub fn new(config: EngineConfig) -> Self {
        PlanBuilder {
            config,
            next_slot: 0,
            slot_types: Vec::new(),
            input_bindings: Vec::new(),
            filter: None,
            compute: Vec::new(),
            aggregate: None,
            limit: None,
            output_handles: Vec::new(),
        }
    }

    /// Allocates a fresh tuple slot for an intermediate or literal value.
    pub fn allocate_slot(&mut self, data_type: DataType, nullable: bool) -> TupleHandle {
        let handle = TupleHandle::new(data_type, nullable, self.next_slot);
        self.slot_types.push((data_type, nullable));
        self.next_slot += 1;
        handle
    }

    /// Allocates a slot for input column `column_id` and registers the
    /// binding that will produce its segment reader at chunk time.
    pub fn bind_input_column(&mut self, column_id: usize, data_type: DataType, nullable: bool) -> TupleHandle {
        let handle = self.allocate_slot(data_type, nullable);
        self.input_bindings.push(InputBinding { column_id, handle });
        handle
    }

    pub fn set_filter(&mut self, expr: Expression) -> PlanResult<()> {
        if expr.handle().data_type() != DataType::Bool {
            return Err(PlanError::ResultTypeInference(
                "WHERE condition must evaluate to Bool".to_string(),
            ));
        }
        self.filter = Some(expr);
        Ok(())
    }

    pub fn add_compute(&mut self, expr: Expression) {
        self.compute.push(expr);
    }

    pub fn set_aggregate(&mut self, spec: AggregateSpec) -> PlanResult<()> {
        if spec.slots.len() != spec.sources.len() {
            return Err(PlanError::ResultTypeInference(
                "aggregate slots and sources must be the same length".to_string(),
            ));
        }
        self.aggregate = Some(spec);
        Ok(())
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn add_output_column(&mut self, handle: TupleHandle) {
        self.output_handles.push(handle);
    }

    /// Validates every handle this builder produced against the layout it
    /// allocated them from, then assembles the [`Plan`].
    pub fn build(self) -> PlanResult<Plan> {
        for handle in &self.output_handles {
            self.validate_handle(handle)?;
        }
        self.validate_tree(&self.filter)?;
        for expr in &self.compute {
            self.validate_tree(&Some(expr.clone()))?;
        }
        if let Some(spec) = &self.aggregate {
            for expr in &spec.group_expressions {
                self.validate_tree(&Some(expr.clone()))?;
            }
            for source in spec.sources.iter().flatten() {
                self.validate_tree(&Some(source.clone()))?;
            }
        }

        let mut planner = LazyLoadPlanner::new();
        let mut lazy_load = Vec::new();
        let downstream_ids = self.downstream_column_ids();
        for binding in &self.input_bindings {
            let needed_downstream = downstream_ids.contains(&binding.column_id);
            lazy_load.push((binding.column_id, planner.classify(binding.column_id, needed_downstream)));
        }

        Ok(Plan {
            config: self.config,
            tuple_slot_count: self.next_slot,
            input_bindings: self.input_bindings,
            filter: self.filter,
            compute: self.compute,
            aggregate: self.aggregate,
            limit: self.limit,
            output_handles: self.output_handles,
            lazy_load,
        })
    }

    fn downstream_column_ids(&self) -> HashSet<usize> {
        let mut ids = HashSet::new();
        if let Some(filter) = &self.filter {
            ids.extend(lazy_load::accessed_column_ids(filter));
        }
        for expr in &self.compute {
            ids.extend(lazy_load::accessed_column_ids(expr));
        }
        if let Some(spec) = &self.aggregate {
            for expr in &spec.group_expressions {
                ids.extend(lazy_load::accessed_column_ids(expr));
            }
            for source in spec.sources.iter().flatten() {
                ids.extend(lazy_load::accessed_column_ids(source));
            }
        }
        for output in &self.output_handles {
            if let Some(binding) = self
                .input_bindings
                .iter()
                .find(|b| b.handle.tuple_index() == output.tuple_index())
            {
                ids.insert(binding.column_id);
            }
        }
        ids
    }

    fn validate_handle(&self, handle: &TupleHandle) -> PlanResult<()> {
        let slot = handle.tuple_index();
        match self.slot_types.get(slot) {
            Some(&(data_type, _)) if data_type == handle.data_type() => Ok(()),
            Some(&(found, _)) => Err(PlanError::TupleLayoutMismatch {
                slot,
                expected: handle.data_type(),
                found,
            }),
            None => Err(PlanError::UnboundColumn(slot)),
        }
    }

    fn validate_tree(&self, expr: &Option<Expression>) -> PlanResult<()> {
        let Some(expr) = expr else { return Ok(()) };
        self.validate_handle(&expr.handle())?;
        match expr {
            Expression::Column(_) | Expression::Literal(_) => {}
            Expression::Unary(e) => self.validate_tree(&Some((*e.operand).clone()))?,
            Expression::Binary(e) => {
                if is_overflow_capable_integer_arithmetic(e.op, e.handle.data_type()) && !e.handle.is_nullable() {
                    return Err(PlanError::ResultTypeInference(format!(
                        "integer {:?} can overflow or divide by zero at runtime and must write NULL, so its result slot must be nullable",
                        e.op
                    )));
                }
                self.validate_tree(&Some((*e.left).clone()))?;
                self.validate_tree(&Some((*e.right).clone()))?;
            }
            Expression::Between(e) => {
                self.validate_tree(&Some((*e.value).clone()))?;
                self.validate_tree(&Some((*e.low).clone()))?;
                self.validate_tree(&Some((*e.high).clone()))?;
            }
            Expression::In(e) => {
                self.validate_tree(&Some((*e.value).clone()))?;
                for item in &e.list {
                    self.validate_tree(&Some(item.clone()))?;
                }
            }
            Expression::Like(e) => self.validate_tree(&Some((*e.value).clone()))?,
        }
        Ok(())
    }
}

/// Add/Sub/Mul/Div/Mod over a non-float result type can produce NULL at
/// runtime (overflow, or division/modulo by zero — see
/// [`crate::expression`]'s `arithmetic`), regardless of whether either
/// operand's slot is nullable. `Pow` always evaluates through the float
/// path and comparison/logical ops produce `Bool`, so neither can hit this.
fn is_overflow_capable_integer_arithmetic(op: BinaryOp, result_type: DataType) -> bool {
    matches!(op, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
        && !result_type.is_float()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{BinaryExpr, ColumnExpr, LiteralExpr};
    use crate::value::RuntimeValue;

    #[test]
    fn filter_must_be_boolean() {
        let mut builder = PlanBuilder::new(EngineConfig::default());
        let handle = builder.bind_input_column(0, DataType::Int32, false);
        let not_bool = Expression::Column(ColumnExpr { column_id: 0, handle });
        assert!(matches!(
            builder.set_filter(not_bool),
            Err(PlanError::ResultTypeInference(_))
        ));
    }

    #[test]
    fn mismatched_handle_type_is_rejected() {
        let mut builder = PlanBuilder::new(EngineConfig::default());
        let handle = builder.bind_input_column(0, DataType::Int32, false);
        let wrong_handle = TupleHandle::new(DataType::Bool, false, handle.tuple_index());
        builder.add_output_column(wrong_handle);
        let err = builder.build().unwrap_err();
        assert!(matches!(err, PlanError::TupleLayoutMismatch { .. }));
    }

    #[test]
    fn non_nullable_result_slot_on_overflow_capable_arithmetic_is_rejected() {
        let mut builder = PlanBuilder::new(EngineConfig::default());
        let a = builder.bind_input_column(0, DataType::Int32, false);
        let literal_handle = builder.allocate_slot(DataType::Int32, false);
        let result_handle = builder.allocate_slot(DataType::Int32, false);
        let compute = Expression::Binary(BinaryExpr {
            op: BinaryOp::Add,
            left: Box::new(Expression::Column(ColumnExpr { column_id: 0, handle: a })),
            right: Box::new(Expression::Literal(LiteralExpr {
                value: RuntimeValue::Int32(Some(1)),
                handle: literal_handle,
            })),
            handle: result_handle,
            logical_pruning: true,
        });
        builder.add_compute(compute);
        builder.add_output_column(result_handle);
        let err = builder.build().unwrap_err();
        assert!(matches!(err, PlanError::ResultTypeInference(_)));
    }

    #[test]
    fn unused_column_is_skipped_by_lazy_load_when_enabled() {
        let mut builder = PlanBuilder::new(EngineConfig::default());
        let used = builder.bind_input_column(0, DataType::Int32, false);
        let _unused = builder.bind_input_column(1, DataType::Int32, false);
        builder.add_output_column(used);
        let plan = builder.build().unwrap();

        // Column 0 feeds an output column, so it counts as needed downstream
        // even though no filter/compute/aggregate expression references it.
        // Column 1 is referenced nowhere at all.
        let classification = plan.lazy_load_classification();
        assert_eq!(classification.len(), 2);
        assert_eq!(classification[0].1, LazyLoad::LoadAndStore);
        assert_eq!(classification[1].1, LazyLoad::LoadWithoutStore);
    }

    #[test]
    fn output_only_column_is_still_bound_under_lazy_load() {
        use crate::driver::Driver;
        use crate::mvcc::{MvccArrays, MvccSnapshot};
        use crate::table::{Chunk, ColumnData, ColumnSegment, DenseSegment, Table};

        let mut builder = PlanBuilder::new(EngineConfig::default());
        let a = builder.bind_input_column(0, DataType::Int32, false);
        let b = builder.bind_input_column(1, DataType::Int32, false);
        let literal_handle = builder.allocate_slot(DataType::Int32, false);
        let result_handle = builder.allocate_slot(DataType::Bool, false);
        let filter = Expression::Binary(BinaryExpr {
            op: BinaryOp::Gt,
            left: Box::new(Expression::Column(ColumnExpr { column_id: 1, handle: b })),
            right: Box::new(Expression::Literal(LiteralExpr {
                value: RuntimeValue::Int32(Some(15)),
                handle: literal_handle,
            })),
            handle: result_handle,
            logical_pruning: true,
        });
        builder.set_filter(filter).unwrap();
        // `a` is referenced only as an output column, never by the filter.
        builder.add_output_column(a);
        let plan = builder.build().unwrap();
        assert!(plan.config().enable_lazy_load, "this test only exercises the lazy-load path");

        let column_a = ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(vec![3, 4])));
        let column_b = ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(vec![20, 20])));
        let chunk = Chunk::new(2, vec![column_a, column_b], MvccArrays::fresh(2));
        let table = Table::new(vec![chunk]);

        let mut driver = Driver::new(plan);
        let snapshot = MvccSnapshot {
            transaction_id: 0,
            snapshot_commit_id: 0,
        };
        let result = driver.run(&table, snapshot).unwrap();
        match &*result.chunks[0].columns[0] {
            ColumnData::Int32(ColumnSegment::Dense(segment)) => {
                assert_eq!(segment.value_at(0), Some(3));
                assert_eq!(segment.value_at(1), Some(4));
            }
            _ => panic!("expected a dense Int32 column"),
        }
    }

    #[test]
    fn eq_filter_on_first_column_plans_successfully() {
        let mut builder = PlanBuilder::new(EngineConfig::default());
        let column = builder.bind_input_column(0, DataType::Int32, true);
        let literal_handle = builder.allocate_slot(DataType::Int32, false);
        let result_handle = builder.allocate_slot(DataType::Bool, true);
        let filter = Expression::Binary(BinaryExpr {
            op: BinaryOp::Eq,
            left: Box::new(Expression::Column(ColumnExpr { column_id: 0, handle: column })),
            right: Box::new(Expression::Literal(LiteralExpr {
                value: RuntimeValue::Int32(Some(5)),
                handle: literal_handle,
            })),
            handle: result_handle,
            logical_pruning: true,
        });
        builder.set_filter(filter).unwrap();
        builder.add_output_column(column);
        let plan = builder.build().unwrap();
        assert_eq!(plan.tuple_slot_count(), 3);
    }
}
