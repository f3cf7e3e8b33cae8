//! Plan-time descriptors into the runtime tuple and the aggregate hashmap.
//!
//! A [`TupleHandle`] or [`HashmapHandle`] never holds a reference to the
//! vector it addresses — it is a cheap, copyable `(type, nullable, index)`
//! triple produced once while building a [`crate::plan::Plan`] and never
//! mutated afterwards. Two handles are equal exactly when they name the same
//! slot in any context, so they can be hashed, compared, and passed around
//! freely without borrowing anything.

use crate::aggregate::AggregateHashmap;
use crate::context::RuntimeContext;
use crate::value::{DataType, RuntimeValue, VariantValue};

/// Names a slot in the per-query runtime tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleHandle {
    data_type: DataType,
    nullable: bool,
    tuple_index: usize,
}

impl TupleHandle {
    pub fn new(data_type: DataType, nullable: bool, tuple_index: usize) -> Self {
        Self {
            data_type,
            nullable,
            tuple_index,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn tuple_index(&self) -> usize {
        self.tuple_index
    }

    /// Reads the slot this handle names out of `ctx`'s runtime tuple.
    /// Returns `None` for SQL NULL.
    pub fn get<T: VariantValue>(&self, ctx: &RuntimeContext) -> Option<T> {
        if self.nullable && ctx.tuple.is_null(self.tuple_index) {
            None
        } else {
            Some(ctx.tuple.get::<T>(self.tuple_index))
        }
    }

    /// Writes a value (or SQL NULL) into the slot this handle names.
    pub fn set<T: VariantValue>(&self, ctx: &mut RuntimeContext, value: Option<T>) {
        match value {
            Some(v) => {
                ctx.tuple.set::<T>(self.tuple_index, v);
                if self.nullable {
                    ctx.tuple.set_is_null(self.tuple_index, false);
                }
            }
            None => {
                debug_assert!(
                    self.nullable,
                    "attempted to write NULL into a non-nullable tuple slot"
                );
                ctx.tuple.set_is_null(self.tuple_index, true);
            }
        }
    }

    pub fn is_null(&self, ctx: &RuntimeContext) -> bool {
        self.nullable && ctx.tuple.is_null(self.tuple_index)
    }

    /// Reads the slot as a type-erased [`RuntimeValue`], dispatching on
    /// `data_type` to the matching monomorphic accessor. Used where the
    /// caller cannot know the concrete type at compile time — grouping keys
    /// and aggregate inputs, primarily.
    pub fn get_runtime(&self, ctx: &RuntimeContext) -> RuntimeValue {
        match self.data_type {
            DataType::Int32 => RuntimeValue::Int32(self.get::<i32>(ctx)),
            DataType::Int64 => RuntimeValue::Int64(self.get::<i64>(ctx)),
            DataType::Float32 => RuntimeValue::Float32(self.get::<f32>(ctx)),
            DataType::Float64 => RuntimeValue::Float64(self.get::<f64>(ctx)),
            DataType::String => RuntimeValue::String(self.get::<std::sync::Arc<str>>(ctx)),
            DataType::Bool => RuntimeValue::Bool(self.get::<bool>(ctx)),
            DataType::Null => RuntimeValue::Bool(None),
        }
    }

    /// Writes a type-erased [`RuntimeValue`] into the slot this handle
    /// names. Panics if `value`'s type disagrees with `self.data_type()` —
    /// plan-time validation guarantees this never happens.
    pub fn set_runtime(&self, ctx: &mut RuntimeContext, value: RuntimeValue) {
        match value {
            RuntimeValue::Int32(v) => self.set::<i32>(ctx, v),
            RuntimeValue::Int64(v) => self.set::<i64>(ctx, v),
            RuntimeValue::Float32(v) => self.set::<f32>(ctx, v),
            RuntimeValue::Float64(v) => self.set::<f64>(ctx, v),
            RuntimeValue::String(v) => self.set::<std::sync::Arc<str>>(ctx, v),
            RuntimeValue::Bool(v) => self.set::<bool>(ctx, v),
        }
    }
}

/// Names a column in the aggregate hashmap's group or aggregate column
/// array. Like [`TupleHandle`], but every access additionally takes a
/// `row_index` selecting the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashmapHandle {
    data_type: DataType,
    nullable: bool,
    column_index: usize,
}

impl HashmapHandle {
    pub fn new(data_type: DataType, nullable: bool, column_index: usize) -> Self {
        Self {
            data_type,
            nullable,
            column_index,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn column_index(&self) -> usize {
        self.column_index
    }

    pub fn get<T: VariantValue>(&self, hashmap: &AggregateHashmap, row: usize) -> Option<T> {
        let column = hashmap.column(self.column_index);
        if self.nullable && column.is_null(row) {
            None
        } else {
            Some(column.get::<T>(row))
        }
    }

    pub fn set<T: VariantValue>(&self, hashmap: &mut AggregateHashmap, row: usize, value: Option<T>) {
        let column = hashmap.column_mut(self.column_index);
        match value {
            Some(v) => {
                column.set::<T>(row, v);
                if self.nullable {
                    column.set_is_null(row, false);
                }
            }
            None => {
                debug_assert!(
                    self.nullable,
                    "attempted to write NULL into a non-nullable hashmap column"
                );
                column.set_is_null(row, true);
            }
        }
    }

    pub fn get_runtime(&self, hashmap: &AggregateHashmap, row: usize) -> RuntimeValue {
        match self.data_type {
            DataType::Int32 => RuntimeValue::Int32(self.get::<i32>(hashmap, row)),
            DataType::Int64 => RuntimeValue::Int64(self.get::<i64>(hashmap, row)),
            DataType::Float32 => RuntimeValue::Float32(self.get::<f32>(hashmap, row)),
            DataType::Float64 => RuntimeValue::Float64(self.get::<f64>(hashmap, row)),
            DataType::String => RuntimeValue::String(self.get::<std::sync::Arc<str>>(hashmap, row)),
            DataType::Bool => RuntimeValue::Bool(self.get::<bool>(hashmap, row)),
            DataType::Null => RuntimeValue::Bool(None),
        }
    }

    pub fn set_runtime(&self, hashmap: &mut AggregateHashmap, row: usize, value: RuntimeValue) {
        match value {
            RuntimeValue::Int32(v) => self.set::<i32>(hashmap, row, v),
            RuntimeValue::Int64(v) => self.set::<i64>(hashmap, row, v),
            RuntimeValue::Float32(v) => self.set::<f32>(hashmap, row, v),
            RuntimeValue::Float64(v) => self.set::<f64>(hashmap, row, v),
            RuntimeValue::String(v) => self.set::<std::sync::Arc<str>>(hashmap, row, v),
            RuntimeValue::Bool(v) => self.set::<bool>(hashmap, row, v),
        }
    }
}
