//! The GROUP BY hashmap: finds or creates a group for the current row's key
//! and folds one more value into each aggregate column.
//!
//! Grouping keys are compared null-aware — two NULLs group together, same
//! as standard SQL `GROUP BY` semantics — via a hash-combine over the key's
//! [`RuntimeValue`]s followed by bucket collision scanning, rather than a
//! sorted/tree index. Aggregate columns use a first-write-replaces-sentinel
//! convention: each column tracks, per group, whether it has seen a
//! non-null value yet, rather than seeding `MIN`/`MAX` with
//! [`InitialValue::MinValue`]/`MaxValue` and comparing against it forever.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::handle::HashmapHandle;
use crate::table::{ColumnData, ColumnSegment, DenseSegment};
use crate::value::{DataType, InitialValue, RuntimeValue, VariantValue, VariantVector};

/// The aggregate function computed by one output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Count,
    Sum,
    Min,
    Max,
    Avg,
}

/// One aggregate output column: which function, which tuple slot feeds it
/// (`None` for `COUNT(*)`), and where its running value lives in the
/// hashmap.
#[derive(Debug, Clone)]
pub struct AggregateSlot {
    pub kind: AggregateKind,
    pub handle: HashmapHandle,
    pub source: Option<crate::handle::TupleHandle>,
}

/// Per-group running state for one [`AggregateSlot`]: whether it has seen a
/// non-null input yet, and (for `Count`/`Avg`) how many non-null inputs.
#[derive(Debug, Default, Clone)]
struct SlotState {
    initialized: Vec<bool>,
    counts: Vec<u64>,
}

impl SlotState {
    fn grow_by_one(&mut self) {
        self.initialized.push(false);
        self.counts.push(0);
    }
}

/// Group-by storage: one [`VariantVector`] per column (group keys first,
/// then aggregate outputs), plus the hash index used to find a row's group.
#[derive(Debug)]
pub struct AggregateHashmap {
    columns: Vec<VariantVector>,
    nullable: Vec<bool>,
    group_count: usize,
    slots: Vec<AggregateSlot>,
    slot_state: Vec<SlotState>,
    buckets: HashMap<u64, Vec<usize>>,
    num_groups: usize,
}

impl AggregateHashmap {
    /// `group_types` describes the group-by key columns (type, nullable) in
    /// order; `slots` describes the aggregate output columns, appended
    /// after the group columns in `columns`.
    pub fn new(group_types: &[(DataType, bool)], slots: Vec<AggregateSlot>) -> Self {
        let group_count = group_types.len();
        let mut nullable: Vec<bool> = group_types.iter().map(|(_, n)| *n).collect();
        nullable.extend(slots.iter().map(|s| s.handle.is_nullable()));
        let slot_state = vec![SlotState::default(); slots.len()];
        AggregateHashmap {
            columns: vec![VariantVector::new(); group_count + slots.len()],
            nullable,
            group_count,
            slots,
            slot_state,
            buckets: HashMap::new(),
            num_groups: 0,
        }
    }

    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn slots(&self) -> &[AggregateSlot] {
        &self.slots
    }

    pub(crate) fn column(&self, index: usize) -> &VariantVector {
        &self.columns[index]
    }

    pub(crate) fn column_mut(&mut self, index: usize) -> &mut VariantVector {
        &mut self.columns[index]
    }

    fn hash_key(key: &[RuntimeValue]) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for value in key {
            hash_runtime_value(value, &mut hasher);
        }
        hasher.finish()
    }

    fn group_matches(&self, group_row: usize, key: &[RuntimeValue]) -> bool {
        (0..self.group_count).all(|i| {
            let nullable = self.nullable[i];
            let existing = read_runtime_like(&self.columns[i], nullable, group_row, &key[i]);
            runtime_values_group_equal(&existing, &key[i])
        })
    }

    /// Finds the existing group matching `key`, or creates a new one (with
    /// every aggregate column seeded to its empty state) and returns its
    /// row index.
    pub fn find_or_create_group(&mut self, key: &[RuntimeValue]) -> usize {
        assert_eq!(key.len(), self.group_count);
        let hash = Self::hash_key(key);
        if let Some(candidates) = self.buckets.get(&hash) {
            for &row in candidates {
                if self.group_matches(row, key) {
                    return row;
                }
            }
        }

        let row = self.num_groups;
        for (i, value) in key.iter().enumerate() {
            push_runtime(&mut self.columns[i], value);
        }
        for (offset, slot) in self.slots.iter().enumerate() {
            let column_index = self.group_count + offset;
            push_runtime(
                &mut self.columns[column_index],
                &RuntimeValue::null_of(slot.handle.data_type()),
            );
            self.slot_state[offset].grow_by_one();
        }
        self.num_groups += 1;
        self.buckets.entry(hash).or_default().push(row);
        row
    }

    /// Folds `incoming` (the current row's value for this aggregate's
    /// source expression, already NULL-checked by the caller) into group
    /// `row`'s running state for aggregate `slot_index`.
    pub fn update(&mut self, slot_index: usize, row: usize, incoming: Option<RuntimeValue>) {
        let slot = self.slots[slot_index].clone();
        let column_index = self.group_count + slot_index;

        match slot.kind {
            AggregateKind::Count => {
                let counts_now_non_null = slot.source.is_none() || incoming.is_some();
                if counts_now_non_null {
                    self.slot_state[slot_index].counts[row] += 1;
                }
                let count = self.slot_state[slot_index].counts[row];
                slot.handle
                    .set_runtime(self, row, RuntimeValue::Int64(Some(count as i64)));
            }
            AggregateKind::Sum | AggregateKind::Avg => {
                let Some(value) = incoming else { return };
                self.slot_state[slot_index].counts[row] += 1;
                let running = if self.slot_state[slot_index].initialized[row] {
                    let current = slot.handle.get_runtime(self, row);
                    numeric_add(&current, &value)
                } else {
                    self.slot_state[slot_index].initialized[row] = true;
                    value
                };
                self.columns[column_index].set_is_null(row, false);
                slot.handle.set_runtime(self, row, running);
            }
            AggregateKind::Min => {
                let Some(value) = incoming else { return };
                let next = if self.slot_state[slot_index].initialized[row] {
                    let current = slot.handle.get_runtime(self, row);
                    if runtime_value_less_than(&value, &current) {
                        value
                    } else {
                        current
                    }
                } else {
                    self.slot_state[slot_index].initialized[row] = true;
                    value
                };
                slot.handle.set_runtime(self, row, next);
            }
            AggregateKind::Max => {
                let Some(value) = incoming else { return };
                let next = if self.slot_state[slot_index].initialized[row] {
                    let current = slot.handle.get_runtime(self, row);
                    if runtime_value_less_than(&current, &value) {
                        value
                    } else {
                        current
                    }
                } else {
                    self.slot_state[slot_index].initialized[row] = true;
                    value
                };
                slot.handle.set_runtime(self, row, next);
            }
        }
    }

    /// Converts every `Avg` slot's running sum into sum/count, and resets
    /// any never-touched `Sum`/`Min`/`Max`/`Avg` slot to NULL. Called once,
    /// after the last input row of the query has been folded in.
    pub fn finalize(&mut self) {
        for (offset, slot) in self.slots.clone().iter().enumerate() {
            for row in 0..self.num_groups {
                if !self.slot_state[offset].initialized[row] {
                    if matches!(
                        slot.kind,
                        AggregateKind::Sum | AggregateKind::Min | AggregateKind::Max | AggregateKind::Avg
                    ) {
                        slot.handle
                            .set_runtime(self, row, RuntimeValue::null_of(slot.handle.data_type()));
                    }
                    continue;
                }
                if slot.kind == AggregateKind::Avg {
                    let sum = slot.handle.get_runtime(self, row);
                    let count = self.slot_state[offset].counts[row] as f64;
                    let avg = sum.as_f64().map(|s| s / count);
                    let result = match slot.handle.data_type() {
                        DataType::Float32 => RuntimeValue::Float32(avg.map(|a| a as f32)),
                        _ => RuntimeValue::Float64(avg),
                    };
                    slot.handle.set_runtime(self, row, result);
                }
            }
        }
    }

    /// Consumes the hashmap and materializes every column (group keys, then
    /// aggregate outputs, in that order) into finished dense [`ColumnData`].
    /// Called once, after [`AggregateHashmap::finalize`].
    pub fn into_columns(self, data_types: &[(DataType, bool)]) -> Vec<ColumnData> {
        assert_eq!(data_types.len(), self.columns.len());
        let num_groups = self.num_groups;
        self.columns
            .into_iter()
            .zip(data_types.iter())
            .map(|(column, &(data_type, nullable))| materialize_column(data_type, nullable, &column, num_groups))
            .collect()
    }
}

fn materialize_column(data_type: DataType, nullable: bool, column: &VariantVector, len: usize) -> ColumnData {
    macro_rules! dense {
        ($variant:ident, $ty:ty) => {{
            let values: Vec<$ty> = (0..len).map(|row| column.get::<$ty>(row)).collect();
            let segment = if nullable {
                let nulls: Vec<bool> = (0..len).map(|row| column.is_null(row)).collect();
                DenseSegment::with_nulls(values, nulls)
            } else {
                DenseSegment::new(values)
            };
            ColumnData::$variant(ColumnSegment::Dense(segment))
        }};
    }
    match data_type {
        DataType::Int32 => dense!(Int32, i32),
        DataType::Int64 => dense!(Int64, i64),
        DataType::Float32 => dense!(Float32, f32),
        DataType::Float64 => dense!(Float64, f64),
        DataType::String => dense!(String, std::sync::Arc<str>),
        DataType::Bool => dense!(Bool, bool),
        DataType::Null => unreachable!("a group-by or aggregate column never declares DataType::Null"),
    }
}

/// Reads `column` at `row` as a [`RuntimeValue`], using `like`'s variant to
/// pick which lane to read.
fn read_runtime_like(
    column: &VariantVector,
    nullable: bool,
    row: usize,
    like: &RuntimeValue,
) -> RuntimeValue {
    macro_rules! lane {
        ($variant:ident, $ty:ty) => {
            RuntimeValue::$variant(if nullable && column.is_null(row) {
                None
            } else {
                Some(column.get::<$ty>(row))
            })
        };
    }
    match like {
        RuntimeValue::Int32(_) => lane!(Int32, i32),
        RuntimeValue::Int64(_) => lane!(Int64, i64),
        RuntimeValue::Float32(_) => lane!(Float32, f32),
        RuntimeValue::Float64(_) => lane!(Float64, f64),
        RuntimeValue::String(_) => lane!(String, std::sync::Arc<str>),
        RuntimeValue::Bool(_) => lane!(Bool, bool),
    }
}

fn push_runtime(column: &mut VariantVector, value: &RuntimeValue) -> usize {
    match value.clone() {
        RuntimeValue::Int32(v) => grow_and_set::<i32>(column, v),
        RuntimeValue::Int64(v) => grow_and_set::<i64>(column, v),
        RuntimeValue::Float32(v) => grow_and_set::<f32>(column, v),
        RuntimeValue::Float64(v) => grow_and_set::<f64>(column, v),
        RuntimeValue::String(v) => grow_and_set::<std::sync::Arc<str>>(column, v),
        RuntimeValue::Bool(v) => grow_and_set::<bool>(column, v),
    }
}

fn grow_and_set<T: VariantValue>(column: &mut VariantVector, value: Option<T>) -> usize {
    let index = column.grow_by_one::<T>(InitialValue::Zero);
    match value {
        Some(v) => column.set::<T>(index, v),
        None => column.set_is_null(index, true),
    }
    index
}

fn hash_runtime_value<H: Hasher>(value: &RuntimeValue, hasher: &mut H) {
    std::mem::discriminant(value).hash(hasher);
    match value {
        RuntimeValue::Int32(v) => v.hash(hasher),
        RuntimeValue::Int64(v) => v.hash(hasher),
        RuntimeValue::Float32(v) => v.map(f32::to_bits).hash(hasher),
        RuntimeValue::Float64(v) => v.map(f64::to_bits).hash(hasher),
        RuntimeValue::String(v) => v.hash(hasher),
        RuntimeValue::Bool(v) => v.hash(hasher),
    }
}

/// Grouping equality: two NULLs in the same key position group together.
fn runtime_values_group_equal(a: &RuntimeValue, b: &RuntimeValue) -> bool {
    a == b
}

fn numeric_add(a: &RuntimeValue, b: &RuntimeValue) -> RuntimeValue {
    match (a, b) {
        (RuntimeValue::Int32(x), RuntimeValue::Int32(y)) => {
            RuntimeValue::Int32(x.zip(*y).map(|(x, y)| x.wrapping_add(y)))
        }
        (RuntimeValue::Int64(x), RuntimeValue::Int64(y)) => {
            RuntimeValue::Int64(x.zip(*y).map(|(x, y)| x.wrapping_add(y)))
        }
        (RuntimeValue::Float32(x), RuntimeValue::Float32(y)) => {
            RuntimeValue::Float32(x.zip(*y).map(|(x, y)| x + y))
        }
        (RuntimeValue::Float64(x), RuntimeValue::Float64(y)) => {
            RuntimeValue::Float64(x.zip(*y).map(|(x, y)| x + y))
        }
        _ => RuntimeValue::null_of(a.data_type()),
    }
}

fn runtime_value_less_than(a: &RuntimeValue, b: &RuntimeValue) -> bool {
    match (a, b) {
        (RuntimeValue::String(Some(x)), RuntimeValue::String(Some(y))) => x < y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x < y,
            _ => false,
        },
    }
}
