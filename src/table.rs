//! Storage-side collaborator types: `Table`, `Chunk`, and the three segment
//! encodings the evaluation core reads from (§6, §4.1).
//!
//! These are intentionally thin — on-disk formats, compaction, and the
//! storage manager that produces them are external collaborators (§1 Scope,
//! §6). What lives here is exactly enough structure for segment readers to
//! bind against: a column's encoding (dense / dictionary / reference) plus
//! the MVCC arrays every chunk carries.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::mvcc::MvccArrays;
use crate::value::{DataType, VariantValue};

/// `(chunk_index, row_offset)` — a position inside some table.
pub type RowId = (usize, usize);

/// A dense, positional segment: one value per row, with an optional
/// separate null vector (no null vector means the column is not nullable).
#[derive(Debug, Clone)]
pub struct DenseSegment<T> {
    pub values: Vec<T>,
    pub nulls: Option<Vec<bool>>,
}

impl<T: Clone> DenseSegment<T> {
    pub fn new(values: Vec<T>) -> Self {
        DenseSegment {
            values,
            nulls: None,
        }
    }

    pub fn with_nulls(values: Vec<T>, nulls: Vec<bool>) -> Self {
        assert_eq!(values.len(), nulls.len());
        DenseSegment {
            values,
            nulls: Some(nulls),
        }
    }

    pub fn value_at(&self, row: usize) -> Option<T> {
        if self.nulls.as_ref().is_some_and(|n| n[row]) {
            None
        } else {
            Some(self.values[row].clone())
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An unsigned attribute vector, width-chosen by dictionary size (§6).
#[derive(Debug, Clone)]
pub enum AttributeVector {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl AttributeVector {
    pub fn len(&self) -> usize {
        match self {
            AttributeVector::U8(v) => v.len(),
            AttributeVector::U16(v) => v.len(),
            AttributeVector::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn id_at(&self, row: usize) -> u32 {
        match self {
            AttributeVector::U8(v) => v[row] as u32,
            AttributeVector::U16(v) => v[row] as u32,
            AttributeVector::U32(v) => v[row],
        }
    }

    /// Picks the narrowest width that can address `dictionary_size` values
    /// plus the null sentinel.
    pub fn from_ids(ids: &[u32], dictionary_size: usize) -> Self {
        if dictionary_size < u8::MAX as usize {
            AttributeVector::U8(ids.iter().map(|&id| id as u8).collect())
        } else if dictionary_size < u16::MAX as usize {
            AttributeVector::U16(ids.iter().map(|&id| id as u16).collect())
        } else {
            AttributeVector::U32(ids.to_vec())
        }
    }
}

/// A dictionary-encoded segment: an attribute vector of ids into a sorted
/// dictionary of distinct values, with a reserved sentinel id for NULL.
#[derive(Debug, Clone)]
pub struct DictionarySegment<T> {
    pub attribute_vector: AttributeVector,
    pub dictionary: Vec<T>,
    pub null_value_id: u32,
}

impl<T: VariantValue + PartialOrd> DictionarySegment<T> {
    /// Builds a dictionary-encoded segment from row values: distinct
    /// non-null values sorted into the dictionary, NULL mapped to a
    /// sentinel id one past the last real entry.
    pub fn encode(values: &[Option<T>]) -> Self {
        let mut dictionary: Vec<T> = values.iter().flatten().cloned().collect();
        dictionary.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        dictionary.dedup_by(|a, b| a == b);

        let null_value_id = dictionary.len() as u32;
        let ids: Vec<u32> = values
            .iter()
            .map(|value| match value {
                Some(v) => dictionary
                    .binary_search_by(|probe| probe.partial_cmp(v).unwrap_or(std::cmp::Ordering::Equal))
                    .expect("value was inserted into the dictionary above") as u32,
                None => null_value_id,
            })
            .collect();

        DictionarySegment {
            attribute_vector: AttributeVector::from_ids(&ids, dictionary.len()),
            dictionary,
            null_value_id,
        }
    }
}

impl<T: Clone> DictionarySegment<T> {
    pub fn value_at(&self, row: usize) -> Option<T> {
        let id = self.attribute_vector.id_at(row);
        if id == self.null_value_id {
            None
        } else {
            Some(self.dictionary[id as usize].clone())
        }
    }

    pub fn len(&self) -> usize {
        self.attribute_vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A reference segment: a position list into another table's segments.
/// Carries no type parameter of its own — the type is supplied by whichever
/// [`ColumnSegment<T>`] wraps it, and resolved by following the indirection
/// into `referenced_table` at read time.
#[derive(Debug)]
pub struct ReferenceSegmentData {
    pub referenced_table: Arc<Table>,
    pub referenced_column: usize,
    pub positions: Vec<RowId>,
}

/// One column's data within one chunk, generic over its physical type.
#[derive(Debug)]
pub enum ColumnSegment<T> {
    Dense(DenseSegment<T>),
    Dictionary(DictionarySegment<T>),
    Reference(Arc<ReferenceSegmentData>),
}

impl<T: VariantValue> ColumnSegment<T> {
    pub fn len(&self) -> usize {
        match self {
            ColumnSegment::Dense(s) => s.len(),
            ColumnSegment::Dictionary(s) => s.len(),
            ColumnSegment::Reference(r) => r.positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolves the value at `row`, following reference indirection as
    /// deep as it goes (§4.1: "reference readers must follow the
    /// indirection to the underlying segment for each access").
    pub fn value_at(&self, row: usize) -> Option<T> {
        match self {
            ColumnSegment::Dense(s) => s.value_at(row),
            ColumnSegment::Dictionary(s) => s.value_at(row),
            ColumnSegment::Reference(r) => {
                let (chunk_index, base_row) = r.positions[row];
                let base_chunk = &r.referenced_table.chunks[chunk_index];
                let base_column = T::as_column(&base_chunk.columns[r.referenced_column]);
                base_column.value_at(base_row)
            }
        }
    }
}

/// Type-erased column storage for one column of one chunk. The six variants
/// mirror the six-member closed [`DataType`] set. Unlike
/// [`crate::value::VariantVector`], `Bool` gets its own `ColumnSegment<bool>`
/// here rather than sharing `Int32`'s lane — segment storage has no per-row
/// turnover pressure to pack against, and sharing would make a `Bool`
/// column indistinguishable from an `Int32` one without an extra tag.
#[derive(Debug)]
pub enum ColumnData {
    Int32(ColumnSegment<i32>),
    Int64(ColumnSegment<i64>),
    Float32(ColumnSegment<f32>),
    Float64(ColumnSegment<f64>),
    String(ColumnSegment<Arc<str>>),
    Bool(ColumnSegment<bool>),
}

impl ColumnData {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float32(_) => DataType::Float32,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::String(_) => DataType::String,
            ColumnData::Bool(_) => DataType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int32(s) => s.len(),
            ColumnData::Int64(s) => s.len(),
            ColumnData::Float32(s) => s.len(),
            ColumnData::Float64(s) => s.len(),
            ColumnData::String(s) => s.len(),
            ColumnData::Bool(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One horizontal partition of a table: the unit of scan scheduling (§GLOSSARY).
///
/// Columns are individually `Arc`-wrapped so segment readers can hold their
/// own cheap handle to a column's data without borrowing the chunk (needed
/// for readers to outlive a single `consume` call across the per-row loop).
#[derive(Debug)]
pub struct Chunk {
    pub row_count: usize,
    pub columns: Vec<Arc<ColumnData>>,
    pub mvcc: Arc<RwLock<MvccArrays>>,
}

impl Chunk {
    pub fn new(row_count: usize, columns: Vec<ColumnData>, mvcc: MvccArrays) -> Self {
        Chunk {
            row_count,
            columns: columns.into_iter().map(Arc::new).collect(),
            mvcc: Arc::new(RwLock::new(mvcc)),
        }
    }
}

/// A table: an ordered list of chunks, shared read-mostly across pipeline
/// instances (§5).
#[derive(Debug, Default)]
pub struct Table {
    pub chunks: Vec<Chunk>,
}

impl Table {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        Table { chunks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn encode_decode_round_trips_values_and_the_null_sentinel() {
        let values = vec![Some(30), Some(10), None, Some(20), Some(10)];
        let segment = DictionarySegment::encode(&values);
        let decoded: Vec<Option<i32>> = (0..segment.len()).map(|row| segment.value_at(row)).collect();
        assert_eq!(decoded, values);
    }

    #[test]
    fn encode_deduplicates_and_sorts_the_dictionary() {
        let values = vec![Some(30), Some(10), Some(20), Some(10), Some(30)];
        let segment = DictionarySegment::encode(&values);
        assert_eq!(segment.dictionary, vec![10, 20, 30]);
        assert_eq!(segment.null_value_id, 3);
    }

    #[test]
    fn encode_picks_the_narrowest_attribute_vector_width() {
        let values: Vec<Option<i32>> = (0..10).map(Some).collect();
        let segment = DictionarySegment::encode(&values);
        assert!(matches!(segment.attribute_vector, AttributeVector::U8(_)));
    }

    #[test]
    fn encode_round_trips_strings() {
        let values: Vec<Option<Arc<str>>> =
            vec![Some(Arc::from("b")), None, Some(Arc::from("a")), Some(Arc::from("b"))];
        let segment = DictionarySegment::encode(&values);
        let decoded: Vec<Option<Arc<str>>> = (0..segment.len()).map(|row| segment.value_at(row)).collect();
        assert_eq!(decoded, values);
    }
}
