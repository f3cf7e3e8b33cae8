//! The concrete input -> expected output scenarios, run end to end through
//! [`Driver::run`] rather than through any single module's inline tests.

use std::sync::Arc;

use tuplejit::aggregate::{AggregateHashmap, AggregateKind, AggregateSlot};
use tuplejit::config::EngineConfig;
use tuplejit::driver::Driver;
use tuplejit::expression::{BinaryExpr, BinaryOp, ColumnExpr, Expression, LiteralExpr, UnaryExpr, UnaryOp};
use tuplejit::expression::like::LikePattern;
use tuplejit::expression::LikeExpr;
use tuplejit::handle::HashmapHandle;
use tuplejit::mvcc::{MvccArrays, MvccSnapshot, OPEN_END_CID};
use tuplejit::plan::{AggregateSpec, PlanBuilder};
use tuplejit::table::{Chunk, ColumnData, ColumnSegment, DenseSegment, Table};
use tuplejit::value::{DataType, InitialValue, RuntimeValue, VariantVector};

fn int32_column(values: Vec<i32>) -> ColumnData {
    ColumnData::Int32(ColumnSegment::Dense(DenseSegment::new(values)))
}

fn nullable_int32_column(values: Vec<Option<i32>>) -> ColumnData {
    let nulls: Vec<bool> = values.iter().map(Option::is_none).collect();
    let raw: Vec<i32> = values.into_iter().map(|v| v.unwrap_or(0)).collect();
    ColumnData::Int32(ColumnSegment::Dense(DenseSegment::with_nulls(raw, nulls)))
}

fn string_column(values: Vec<&str>) -> ColumnData {
    ColumnData::String(ColumnSegment::Dense(DenseSegment::new(
        values.into_iter().map(Arc::from).collect(),
    )))
}

fn single_chunk_table(columns: Vec<ColumnData>, row_count: usize) -> Table {
    Table::new(vec![Chunk::new(row_count, columns, MvccArrays::fresh(row_count))])
}

fn default_snapshot() -> MvccSnapshot {
    MvccSnapshot {
        transaction_id: 0,
        snapshot_commit_id: 0,
    }
}

fn int32_values(column: &ColumnData) -> Vec<Option<i32>> {
    match column {
        ColumnData::Int32(ColumnSegment::Dense(segment)) => {
            (0..segment.len()).map(|row| segment.value_at(row)).collect()
        }
        _ => panic!("expected a dense Int32 column"),
    }
}

fn int64_values(column: &ColumnData) -> Vec<Option<i64>> {
    match column {
        ColumnData::Int64(ColumnSegment::Dense(segment)) => {
            (0..segment.len()).map(|row| segment.value_at(row)).collect()
        }
        _ => panic!("expected a dense Int64 column"),
    }
}

/// Scenario 1: `SELECT a WHERE b > 15`, then the same query rewritten as
/// `b IS NOT NULL AND b > 15` with logical pruning enabled.
#[test]
fn scenario_1_filter_excludes_null_and_low_values() {
    let table = single_chunk_table(
        vec![
            int32_column(vec![1, 2, 3, 4]),
            nullable_int32_column(vec![Some(10), None, Some(20), Some(30)]),
        ],
        4,
    );

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let a = builder.bind_input_column(0, DataType::Int32, false);
    let b = builder.bind_input_column(1, DataType::Int32, true);
    let literal_handle = builder.allocate_slot(DataType::Int32, false);
    let result_handle = builder.allocate_slot(DataType::Bool, true);
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
    builder.add_output_column(a);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let result = driver.run(&table, default_snapshot()).unwrap();
    assert_eq!(int32_values(&result.chunks[0].columns[0]), vec![Some(3), Some(4)]);
}

/// Same scenario, with the filter rewritten as `b IS NOT NULL AND b > 15`
/// and logical pruning on — the result must be identical to the direct
/// `b > 15` form, even though row 2 (`b = NULL`) never evaluates the right
/// side of the `And`.
#[test]
fn scenario_1_logical_pruning_matches_direct_filter() {
    let table = single_chunk_table(
        vec![
            int32_column(vec![1, 2, 3, 4]),
            nullable_int32_column(vec![Some(10), None, Some(20), Some(30)]),
        ],
        4,
    );

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let a = builder.bind_input_column(0, DataType::Int32, false);
    let b = builder.bind_input_column(1, DataType::Int32, true);
    let is_not_null_handle = builder.allocate_slot(DataType::Bool, true);
    let literal_handle = builder.allocate_slot(DataType::Int32, false);
    let gt_handle = builder.allocate_slot(DataType::Bool, true);
    let and_handle = builder.allocate_slot(DataType::Bool, true);

    let is_not_null = Expression::Unary(UnaryExpr {
        op: UnaryOp::IsNotNull,
        operand: Box::new(Expression::Column(ColumnExpr { column_id: 1, handle: b })),
        handle: is_not_null_handle,
    });
    let gt = Expression::Binary(BinaryExpr {
        op: BinaryOp::Gt,
        left: Box::new(Expression::Column(ColumnExpr { column_id: 1, handle: b })),
        right: Box::new(Expression::Literal(LiteralExpr {
            value: RuntimeValue::Int32(Some(15)),
            handle: literal_handle,
        })),
        handle: gt_handle,
        logical_pruning: true,
    });
    let filter = Expression::Binary(BinaryExpr {
        op: BinaryOp::And,
        left: Box::new(is_not_null),
        right: Box::new(gt),
        handle: and_handle,
        logical_pruning: true,
    });
    builder.set_filter(filter).unwrap();
    builder.add_output_column(a);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let result = driver.run(&table, default_snapshot()).unwrap();
    assert_eq!(int32_values(&result.chunks[0].columns[0]), vec![Some(3), Some(4)]);
}

/// Scenario 2: `SELECT a/b FROM T` on `[(10,2),(10,0),(10,null)]` -> `[5, null, null]`.
#[test]
fn scenario_2_division_by_zero_and_null_both_produce_null() {
    let table = single_chunk_table(
        vec![
            int32_column(vec![10, 10, 10]),
            nullable_int32_column(vec![Some(2), Some(0), None]),
        ],
        3,
    );

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let a = builder.bind_input_column(0, DataType::Int32, false);
    let b = builder.bind_input_column(1, DataType::Int32, true);
    let result_handle = builder.allocate_slot(DataType::Int32, true);
    let divide = Expression::Binary(BinaryExpr {
        op: BinaryOp::Div,
        left: Box::new(Expression::Column(ColumnExpr { column_id: 0, handle: a })),
        right: Box::new(Expression::Column(ColumnExpr { column_id: 1, handle: b })),
        handle: result_handle,
        logical_pruning: true,
    });
    builder.add_compute(divide);
    builder.add_output_column(result_handle);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let result = driver.run(&table, default_snapshot()).unwrap();
    assert_eq!(int32_values(&result.chunks[0].columns[0]), vec![Some(5), None, None]);
}

/// Scenario 3: `SELECT s WHERE s LIKE 'h_llo'` on `['hello','hallo','help','hollow']`.
#[test]
fn scenario_3_like_pattern_matches_single_char_wildcard() {
    let table = single_chunk_table(vec![string_column(vec!["hello", "hallo", "help", "hollow"])], 4);

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let s = builder.bind_input_column(0, DataType::String, false);
    let result_handle = builder.allocate_slot(DataType::Bool, true);
    let filter = Expression::Like(LikeExpr {
        value: Box::new(Expression::Column(ColumnExpr { column_id: 0, handle: s })),
        pattern: LikePattern::compile("h_llo"),
        negated: false,
        handle: result_handle,
    });
    builder.set_filter(filter).unwrap();
    builder.add_output_column(s);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let result = driver.run(&table, default_snapshot()).unwrap();
    let values = match &result.chunks[0].columns[0] {
        ColumnData::String(ColumnSegment::Dense(segment)) => {
            (0..segment.len()).map(|row| segment.value_at(row)).collect::<Vec<_>>()
        }
        _ => panic!("expected a dense String column"),
    };
    assert_eq!(
        values,
        vec![Some(Arc::from("hello")), Some(Arc::from("hallo"))]
    );
}

/// Scenario 4: `SELECT COUNT(*), SUM(x) GROUP BY g` on
/// `[(g=1,x=10),(g=2,x=null),(g=1,x=5),(g=2,x=7)]` -> `[(1,2,15),(2,1,7)]`.
#[test]
fn scenario_4_group_by_counts_and_sums_per_group() {
    let table = single_chunk_table(
        vec![
            int32_column(vec![1, 2, 1, 2]),
            nullable_int32_column(vec![Some(10), None, Some(5), Some(7)]),
        ],
        4,
    );

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let g = builder.bind_input_column(0, DataType::Int32, false);
    let x = builder.bind_input_column(1, DataType::Int32, true);

    let group_expressions = vec![Expression::Column(ColumnExpr { column_id: 0, handle: g })];
    let count_handle = HashmapHandle::new(DataType::Int64, false, 1);
    let sum_handle = HashmapHandle::new(DataType::Int64, true, 2);
    let spec = AggregateSpec {
        group_types: vec![(DataType::Int32, false)],
        group_expressions,
        slots: vec![
            AggregateSlot {
                kind: AggregateKind::Count,
                handle: count_handle,
                source: None,
            },
            AggregateSlot {
                kind: AggregateKind::Sum,
                handle: sum_handle,
                source: Some(x),
            },
        ],
        sources: vec![None, Some(Expression::Column(ColumnExpr { column_id: 1, handle: x }))],
    };
    builder.set_aggregate(spec).unwrap();
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let result = driver.run(&table, default_snapshot()).unwrap();

    let groups = int32_values(&result.chunks[0].columns[0]);
    let counts = int64_values(&result.chunks[0].columns[1]);
    let sums = int64_values(&result.chunks[0].columns[2]);

    let mut rows: Vec<(Option<i32>, Option<i64>, Option<i64>)> =
        groups.into_iter().zip(counts).zip(sums).map(|((g, c), s)| (g, c, s)).collect();
    rows.sort_by_key(|(g, _, _)| *g);

    assert_eq!(
        rows,
        vec![(Some(1), Some(2), Some(15)), (Some(2), Some(2), Some(7))]
    );
}

/// Scenario 5: MVCC visibility under snapshot=5, tx=T7 — rows 0 and 3 survive.
#[test]
fn scenario_5_mvcc_visibility_through_the_driver() {
    let column = int32_column(vec![100, 200, 300, 400]);
    let mvcc = MvccArrays {
        begin_cids: vec![3, 6, 3, 3],
        end_cids: vec![OPEN_END_CID, OPEN_END_CID, 4, OPEN_END_CID],
        row_tids: vec![0, 0, 0, 7],
    };
    let chunk = Chunk::new(4, vec![column], mvcc);
    let table = Table::new(vec![chunk]);

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let handle = builder.bind_input_column(0, DataType::Int32, false);
    builder.add_output_column(handle);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let snapshot = MvccSnapshot {
        transaction_id: 7,
        snapshot_commit_id: 5,
    };
    let result = driver.run(&table, snapshot).unwrap();
    assert_eq!(int32_values(&result.chunks[0].columns[0]), vec![Some(100), Some(400)]);
}

/// Scenario 6: `MIN(int32)` seeded with `InitialValue::MinValue` reports
/// `INT32_MIN` before any row lands, but the hashmap's own first-write-
/// replaces-sentinel bookkeeping means an actual update with `5` leaves the
/// group holding `5`, not `min(INT32_MIN, 5)`.
#[test]
fn scenario_6_aggregate_initial_value_is_replaced_not_compared_against() {
    let mut raw = VariantVector::new();
    let index = raw.grow_by_one::<i32>(InitialValue::MinValue);
    assert_eq!(raw.get::<i32>(index), i32::MIN);

    let min_slot = AggregateSlot {
        kind: AggregateKind::Min,
        handle: HashmapHandle::new(DataType::Int32, true, 1),
        source: Some(tuplejit::handle::TupleHandle::new(DataType::Int32, true, 0)),
    };
    let mut hashmap = AggregateHashmap::new(&[(DataType::Int32, false)], vec![min_slot]);
    let row = hashmap.find_or_create_group(&[RuntimeValue::Int32(Some(1))]);
    hashmap.update(0, row, Some(RuntimeValue::Int32(Some(5))));
    assert_eq!(
        hashmap.slots()[0].handle.get_runtime(&hashmap, row),
        RuntimeValue::Int32(Some(5))
    );
}

/// Boundary case: an empty chunk passes through the chain without emitting.
#[test]
fn boundary_empty_chunk_emits_nothing() {
    let table = single_chunk_table(vec![int32_column(vec![])], 0);
    let mut builder = PlanBuilder::new(EngineConfig::default());
    let handle = builder.bind_input_column(0, DataType::Int32, false);
    builder.add_output_column(handle);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let result = driver.run(&table, default_snapshot()).unwrap();
    assert_eq!(result.chunks[0].row_count, 0);
}

/// Boundary case: a chunk whose every row is MVCC-invisible emits zero rows.
#[test]
fn boundary_all_invisible_chunk_emits_nothing() {
    let column = int32_column(vec![1, 2, 3]);
    let mvcc = MvccArrays {
        begin_cids: vec![100, 100, 100],
        end_cids: vec![OPEN_END_CID, OPEN_END_CID, OPEN_END_CID],
        row_tids: vec![0, 0, 0],
    };
    let chunk = Chunk::new(3, vec![column], mvcc);
    let table = Table::new(vec![chunk]);

    let mut builder = PlanBuilder::new(EngineConfig::default());
    let handle = builder.bind_input_column(0, DataType::Int32, false);
    builder.add_output_column(handle);
    let plan = builder.build().unwrap();

    let mut driver = Driver::new(plan);
    let snapshot = MvccSnapshot {
        transaction_id: 0,
        snapshot_commit_id: 1,
    };
    let result = driver.run(&table, snapshot).unwrap();
    assert_eq!(result.chunks[0].row_count, 0);
}
