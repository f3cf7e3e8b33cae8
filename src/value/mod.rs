//! # Value Model
//!
//! The variant tuple store at the heart of the evaluation core.
//!
//! Instead of one `Vec<Variant>` where every slot can hold any of a handful
//! of types, [`VariantVector`] is a struct of parallel, strongly-typed
//! vectors — one per [`DataType`] — plus a shared null bitmap. Slot `i` has
//! a meaningful value in exactly one of the typed vectors; the others are
//! simply unused at that index. Accessors (`get`/`set`) are generic over the
//! accessed type and never branch on `DataType` internally: the tag exists
//! only so callers can pick the right monomorphic call site, never so the
//! hot loop can dispatch on it.
//!
//! `Bool` is logically its own [`DataType`], but physically shares the `i32`
//! vector (0/1), so a boolean column costs nothing extra in the
//! struct-of-vectors layout.

use std::sync::Arc;

use crate::table::{ColumnData, ColumnSegment};

/// Closed set of value types the evaluation core understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    Bool,
    Null,
}

impl DataType {
    /// Whether this type participates in arithmetic promotion.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Int32 | DataType::Int64 | DataType::Float32 | DataType::Float64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }
}

/// Seed value for [`VariantVector::grow_by_one`].
///
/// Kept as a description of the value an aggregate column starts a new
/// group at; see the aggregate module for why the aggregate operator itself
/// tracks "has this group been written yet" separately rather than relying
/// on `MinValue`/`MaxValue` sentinel comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialValue {
    Zero,
    MinValue,
    MaxValue,
}

/// A struct-of-parallel-vectors variant value store.
///
/// Used in two ways:
///
/// 1. As the runtime tuple: `resize(n)` gives every typed vector (and the
///    null bitmap) the same length `n`, one slot per plan-time tuple index.
///    Only the vector matching a given slot's logical [`DataType`] ever
///    holds meaningful data at that index.
/// 2. As an aggregate column: `grow_by_one` appends to exactly one typed
///    vector (the aggregate's own type) without ever resizing the others.
#[derive(Debug, Clone, Default)]
pub struct VariantVector {
    int32: Vec<i32>,
    int64: Vec<i64>,
    float32: Vec<f32>,
    float64: Vec<f64>,
    string: Vec<Arc<str>>,
    is_null: Vec<bool>,
}

impl VariantVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resizes every typed vector and the null bitmap to `new_size`.
    ///
    /// Used to size the runtime tuple once per query; individual aggregate
    /// columns use [`grow_by_one`](Self::grow_by_one) instead.
    pub fn resize(&mut self, new_size: usize) {
        self.int32.resize(new_size, 0);
        self.int64.resize(new_size, 0);
        self.float32.resize(new_size, 0.0);
        self.float64.resize(new_size, 0.0);
        self.string.resize(new_size, Arc::from(""));
        self.is_null.resize(new_size, false);
    }

    pub fn len(&self) -> usize {
        self.is_null.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_null.is_empty()
    }

    pub fn is_null(&self, index: usize) -> bool {
        self.is_null[index]
    }

    pub fn set_is_null(&mut self, index: usize, is_null: bool) {
        self.is_null[index] = is_null;
    }

    pub fn get<T: VariantValue>(&self, index: usize) -> T {
        T::vector_get(self, index)
    }

    pub fn set<T: VariantValue>(&mut self, index: usize, value: T) {
        T::vector_set(self, index, value);
    }

    /// Appends one element to the typed vector for `T`, seeded per
    /// `initial`, and appends `false` to the null bitmap. Returns the new
    /// element's index. Other typed vectors are left untouched.
    pub fn grow_by_one<T: VariantValue>(&mut self, initial: InitialValue) -> usize {
        let index = T::vector_len(self);
        T::vector_push(self, T::initial_value(initial));
        self.is_null.push(false);
        index
    }

    pub(crate) fn int32_vec(&self) -> &[i32] {
        &self.int32
    }

    pub(crate) fn int32_vec_mut(&mut self) -> &mut Vec<i32> {
        &mut self.int32
    }

    pub(crate) fn int64_vec_mut(&mut self) -> &mut Vec<i64> {
        &mut self.int64
    }

    pub(crate) fn float32_vec_mut(&mut self) -> &mut Vec<f32> {
        &mut self.float32
    }

    pub(crate) fn float64_vec_mut(&mut self) -> &mut Vec<f64> {
        &mut self.float64
    }

    pub(crate) fn string_vec_mut(&mut self) -> &mut Vec<Arc<str>> {
        &mut self.string
    }
}

/// A type that can live in one lane of a [`VariantVector`].
///
/// Implemented for exactly the physical representations the evaluation core
/// uses: `i32`, `i64`, `f32`, `f64`, `Arc<str>`, and `bool` (which shares the
/// `i32` lane). There is no blanket/dynamic implementation; each accessor
/// call is monomorphized against a single lane.
pub trait VariantValue: Clone + PartialEq + std::fmt::Debug + 'static {
    const DATA_TYPE: DataType;

    fn vector_get(vv: &VariantVector, index: usize) -> Self;
    fn vector_set(vv: &mut VariantVector, index: usize, value: Self);
    fn vector_len(vv: &VariantVector) -> usize;
    fn vector_push(vv: &mut VariantVector, value: Self);
    fn initial_value(initial: InitialValue) -> Self;

    /// Downcasts a type-erased column to the segment matching this lane.
    /// Panics if `data` holds a different type than `Self` — plan-time
    /// validation of the tuple layout is what keeps this from ever firing.
    fn as_column(data: &ColumnData) -> &ColumnSegment<Self>;

    /// The inverse of [`as_column`](Self::as_column): wraps a freshly built
    /// segment back into the type-erased [`ColumnData`].
    fn into_column(segment: ColumnSegment<Self>) -> ColumnData;
}

impl VariantValue for i32 {
    const DATA_TYPE: DataType = DataType::Int32;

    fn vector_get(vv: &VariantVector, index: usize) -> Self {
        vv.int32[index]
    }

    fn vector_set(vv: &mut VariantVector, index: usize, value: Self) {
        vv.int32[index] = value;
    }

    fn vector_len(vv: &VariantVector) -> usize {
        vv.int32.len()
    }

    fn vector_push(vv: &mut VariantVector, value: Self) {
        vv.int32.push(value);
    }

    fn initial_value(initial: InitialValue) -> Self {
        match initial {
            InitialValue::Zero => 0,
            InitialValue::MinValue => i32::MIN,
            InitialValue::MaxValue => i32::MAX,
        }
    }

    fn as_column(data: &ColumnData) -> &ColumnSegment<Self> {
        match data {
            ColumnData::Int32(s) => s,
            _ => unreachable!("tuple layout guarantees Int32 column here"),
        }
    }

    fn into_column(segment: ColumnSegment<Self>) -> ColumnData {
        ColumnData::Int32(segment)
    }
}

impl VariantValue for i64 {
    const DATA_TYPE: DataType = DataType::Int64;

    fn vector_get(vv: &VariantVector, index: usize) -> Self {
        vv.int64[index]
    }

    fn vector_set(vv: &mut VariantVector, index: usize, value: Self) {
        vv.int64[index] = value;
    }

    fn vector_len(vv: &VariantVector) -> usize {
        vv.int64.len()
    }

    fn vector_push(vv: &mut VariantVector, value: Self) {
        vv.int64.push(value);
    }

    fn initial_value(initial: InitialValue) -> Self {
        match initial {
            InitialValue::Zero => 0,
            InitialValue::MinValue => i64::MIN,
            InitialValue::MaxValue => i64::MAX,
        }
    }

    fn as_column(data: &ColumnData) -> &ColumnSegment<Self> {
        match data {
            ColumnData::Int64(s) => s,
            _ => unreachable!("tuple layout guarantees Int64 column here"),
        }
    }

    fn into_column(segment: ColumnSegment<Self>) -> ColumnData {
        ColumnData::Int64(segment)
    }
}

impl VariantValue for f32 {
    const DATA_TYPE: DataType = DataType::Float32;

    fn vector_get(vv: &VariantVector, index: usize) -> Self {
        vv.float32[index]
    }

    fn vector_set(vv: &mut VariantVector, index: usize, value: Self) {
        vv.float32[index] = value;
    }

    fn vector_len(vv: &VariantVector) -> usize {
        vv.float32.len()
    }

    fn vector_push(vv: &mut VariantVector, value: Self) {
        vv.float32.push(value);
    }

    fn initial_value(initial: InitialValue) -> Self {
        match initial {
            InitialValue::Zero => 0.0,
            InitialValue::MinValue => f32::MIN,
            InitialValue::MaxValue => f32::MAX,
        }
    }

    fn as_column(data: &ColumnData) -> &ColumnSegment<Self> {
        match data {
            ColumnData::Float32(s) => s,
            _ => unreachable!("tuple layout guarantees Float32 column here"),
        }
    }

    fn into_column(segment: ColumnSegment<Self>) -> ColumnData {
        ColumnData::Float32(segment)
    }
}

impl VariantValue for f64 {
    const DATA_TYPE: DataType = DataType::Float64;

    fn vector_get(vv: &VariantVector, index: usize) -> Self {
        vv.float64[index]
    }

    fn vector_set(vv: &mut VariantVector, index: usize, value: Self) {
        vv.float64[index] = value;
    }

    fn vector_len(vv: &VariantVector) -> usize {
        vv.float64.len()
    }

    fn vector_push(vv: &mut VariantVector, value: Self) {
        vv.float64.push(value);
    }

    fn initial_value(initial: InitialValue) -> Self {
        match initial {
            InitialValue::Zero => 0.0,
            InitialValue::MinValue => f64::MIN,
            InitialValue::MaxValue => f64::MAX,
        }
    }

    fn as_column(data: &ColumnData) -> &ColumnSegment<Self> {
        match data {
            ColumnData::Float64(s) => s,
            _ => unreachable!("tuple layout guarantees Float64 column here"),
        }
    }

    fn into_column(segment: ColumnSegment<Self>) -> ColumnData {
        ColumnData::Float64(segment)
    }
}

impl VariantValue for Arc<str> {
    const DATA_TYPE: DataType = DataType::String;

    fn vector_get(vv: &VariantVector, index: usize) -> Self {
        vv.string[index].clone()
    }

    fn vector_set(vv: &mut VariantVector, index: usize, value: Self) {
        vv.string[index] = value;
    }

    fn vector_len(vv: &VariantVector) -> usize {
        vv.string.len()
    }

    fn vector_push(vv: &mut VariantVector, value: Self) {
        vv.string.push(value);
    }

    fn initial_value(_initial: InitialValue) -> Self {
        Arc::from("")
    }

    fn as_column(data: &ColumnData) -> &ColumnSegment<Self> {
        match data {
            ColumnData::String(s) => s,
            _ => unreachable!("tuple layout guarantees String column here"),
        }
    }

    fn into_column(segment: ColumnSegment<Self>) -> ColumnData {
        ColumnData::String(segment)
    }
}

/// `Bool` shares the `i32` lane: `0` is false, anything else is true.
impl VariantValue for bool {
    const DATA_TYPE: DataType = DataType::Bool;

    fn vector_get(vv: &VariantVector, index: usize) -> Self {
        vv.int32[index] != 0
    }

    fn vector_set(vv: &mut VariantVector, index: usize, value: Self) {
        vv.int32[index] = value as i32;
    }

    fn vector_len(vv: &VariantVector) -> usize {
        vv.int32.len()
    }

    fn vector_push(vv: &mut VariantVector, value: Self) {
        vv.int32.push(value as i32);
    }

    fn initial_value(initial: InitialValue) -> Self {
        !matches!(initial, InitialValue::Zero)
    }

    fn as_column(data: &ColumnData) -> &ColumnSegment<Self> {
        match data {
            ColumnData::Bool(s) => s,
            _ => unreachable!("tuple layout guarantees Bool column here"),
        }
    }

    fn into_column(segment: ColumnSegment<Self>) -> ColumnData {
        ColumnData::Bool(segment)
    }
}

/// A type-erased runtime value, tagged by [`DataType`].
///
/// This is the one place the evaluation core allows itself a tagged union:
/// the expression tree is built from nodes whose concrete type is only known
/// at plan time, so evaluating it generically requires *some* way to carry
/// "a value of statically-unknown-until-now type" between nodes. The tag is
/// only ever matched to pick a call site; see [`VariantValue`] for the
/// monomorphic accessors underneath.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Int32(Option<i32>),
    Int64(Option<i64>),
    Float32(Option<f32>),
    Float64(Option<f64>),
    String(Option<Arc<str>>),
    Bool(Option<bool>),
}

impl RuntimeValue {
    pub fn data_type(&self) -> DataType {
        match self {
            RuntimeValue::Int32(_) => DataType::Int32,
            RuntimeValue::Int64(_) => DataType::Int64,
            RuntimeValue::Float32(_) => DataType::Float32,
            RuntimeValue::Float64(_) => DataType::Float64,
            RuntimeValue::String(_) => DataType::String,
            RuntimeValue::Bool(_) => DataType::Bool,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            RuntimeValue::Int32(v) => v.is_none(),
            RuntimeValue::Int64(v) => v.is_none(),
            RuntimeValue::Float32(v) => v.is_none(),
            RuntimeValue::Float64(v) => v.is_none(),
            RuntimeValue::String(v) => v.is_none(),
            RuntimeValue::Bool(v) => v.is_none(),
        }
    }

    pub fn null_of(data_type: DataType) -> Self {
        match data_type {
            DataType::Int32 => RuntimeValue::Int32(None),
            DataType::Int64 => RuntimeValue::Int64(None),
            DataType::Float32 => RuntimeValue::Float32(None),
            DataType::Float64 => RuntimeValue::Float64(None),
            DataType::String => RuntimeValue::String(None),
            DataType::Bool => RuntimeValue::Bool(None),
            DataType::Null => RuntimeValue::Bool(None),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RuntimeValue::Bool(v) => *v,
            _ => None,
        }
    }

    /// Widens any numeric value to `f64`. Returns `None` for non-numeric
    /// types (the caller is responsible for only using this on numeric
    /// operands, which plan-time type checking guarantees).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RuntimeValue::Int32(v) => v.map(|x| x as f64),
            RuntimeValue::Int64(v) => v.map(|x| x as f64),
            RuntimeValue::Float32(v) => v.map(|x| x as f64),
            RuntimeValue::Float64(v) => *v,
            _ => None,
        }
    }

    /// Widens any integer value to `i64`. `None` for non-integer types.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RuntimeValue::Int32(v) => v.map(i64::from),
            RuntimeValue::Int64(v) => *v,
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::String(v) => v.as_deref(),
            _ => None,
        }
    }
}
