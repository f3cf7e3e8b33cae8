//! Segment readers and writers: the boundary between the chunk's stored
//! columns and the per-row evaluation core.
//!
//! Every input column is bound, once per chunk, to a [`SegmentReader`] that
//! knows how to pull a single row's value out of whichever encoding the
//! column happens to use (dense / dictionary / reference, §4.1) and write it
//! into the row's [`crate::context::RuntimeContext`] tuple. Every output
//! column is bound to a [`SegmentWriter`] that appends one row at a time and
//! is consumed into a finished [`ColumnData`] at chunk end.
//!
//! Readers intentionally have one job: always write through to the slot.
//! There is no separate "compute but don't store" path — callers that only
//! need the value read it back out of the slot immediately after
//! (`read_and_get`). What differs is only which readers a plan chooses to
//! bind at all; see [`crate::lazy_load`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::RuntimeContext;
use crate::handle::TupleHandle;
use crate::table::{ColumnData, ColumnSegment, DenseSegment};
use crate::value::{DataType, InitialValue, VariantValue};

/// Reads one column's value for the current row and writes it into a tuple
/// slot. Bound once per chunk, invoked once per row.
pub trait SegmentReader: fmt::Debug + Send + Sync {
    fn read_value(&self, ctx: &mut RuntimeContext);
}

/// A reader bound to one physical column and the tuple slot it feeds.
#[derive(Debug)]
pub struct TypedSegmentReader<T: VariantValue> {
    column: Arc<ColumnData>,
    handle: TupleHandle,
    _marker: PhantomData<T>,
}

impl<T: VariantValue> TypedSegmentReader<T> {
    pub fn new(column: Arc<ColumnData>, handle: TupleHandle) -> Self {
        TypedSegmentReader {
            column,
            handle,
            _marker: PhantomData,
        }
    }

    /// Reads the current row's value and also returns it, for callers (e.g.
    /// the Read operator) that need it immediately rather than through a
    /// later slot read.
    pub fn read_and_get(&self, ctx: &mut RuntimeContext) -> Option<T> {
        self.read_value(ctx);
        self.handle.get::<T>(ctx)
    }
}

impl<T: VariantValue> SegmentReader for TypedSegmentReader<T> {
    fn read_value(&self, ctx: &mut RuntimeContext) {
        let segment = T::as_column(&self.column);
        let value = segment.value_at(ctx.row_offset);
        self.handle.set(ctx, value);
    }
}

/// Accumulates one row at a time and, at chunk end, produces a finished
/// dense column.
pub trait SegmentWriter: fmt::Debug + Send {
    fn write_value(&mut self, ctx: &RuntimeContext);
    fn finish(self: Box<Self>) -> ColumnData;
}

/// A writer bound to one output tuple slot, accumulating a dense segment.
#[derive(Debug)]
pub struct TypedSegmentWriter<T: VariantValue> {
    handle: TupleHandle,
    values: Vec<T>,
    nulls: Vec<bool>,
}

impl<T: VariantValue> TypedSegmentWriter<T> {
    pub fn new(handle: TupleHandle) -> Self {
        TypedSegmentWriter {
            handle,
            values: Vec::new(),
            nulls: Vec::new(),
        }
    }
}

impl<T: VariantValue> SegmentWriter for TypedSegmentWriter<T> {
    fn write_value(&mut self, ctx: &RuntimeContext) {
        match self.handle.get::<T>(ctx) {
            Some(value) => {
                self.values.push(value);
                self.nulls.push(false);
            }
            None => {
                self.values.push(T::initial_value(InitialValue::Zero));
                self.nulls.push(true);
            }
        }
    }

    fn finish(self: Box<Self>) -> ColumnData {
        let segment = if self.handle.is_nullable() {
            DenseSegment::with_nulls(self.values, self.nulls)
        } else {
            DenseSegment::new(self.values)
        };
        T::into_column(ColumnSegment::Dense(segment))
    }
}

/// Builds the typed reader matching `handle`'s declared type, bound to
/// `column`. The planner uses this so it never has to name a concrete `T`
/// itself — only `DataType` is known until a query is actually planned.
pub fn reader_for(column: Arc<ColumnData>, handle: TupleHandle) -> Box<dyn SegmentReader> {
    match handle.data_type() {
        DataType::Int32 => Box::new(TypedSegmentReader::<i32>::new(column, handle)),
        DataType::Int64 => Box::new(TypedSegmentReader::<i64>::new(column, handle)),
        DataType::Float32 => Box::new(TypedSegmentReader::<f32>::new(column, handle)),
        DataType::Float64 => Box::new(TypedSegmentReader::<f64>::new(column, handle)),
        DataType::String => Box::new(TypedSegmentReader::<std::sync::Arc<str>>::new(column, handle)),
        DataType::Bool => Box::new(TypedSegmentReader::<bool>::new(column, handle)),
        DataType::Null => unreachable!("a bound column never declares DataType::Null"),
    }
}

/// Builds the typed writer matching `handle`'s declared type.
pub fn writer_for(handle: TupleHandle) -> Box<dyn SegmentWriter> {
    match handle.data_type() {
        DataType::Int32 => Box::new(TypedSegmentWriter::<i32>::new(handle)),
        DataType::Int64 => Box::new(TypedSegmentWriter::<i64>::new(handle)),
        DataType::Float32 => Box::new(TypedSegmentWriter::<f32>::new(handle)),
        DataType::Float64 => Box::new(TypedSegmentWriter::<f64>::new(handle)),
        DataType::String => Box::new(TypedSegmentWriter::<std::sync::Arc<str>>::new(handle)),
        DataType::Bool => Box::new(TypedSegmentWriter::<bool>::new(handle)),
        DataType::Null => unreachable!("an output column never declares DataType::Null"),
    }
}
