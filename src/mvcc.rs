//! MVCC snapshot and visibility.
//!
//! Per chunk, the source table carries `begin_cids`, `end_cids`, and
//! `row_tids` arrays (§6). A row is visible to a query's snapshot iff:
//!
//! ```text
//! begin_cid <= snapshot_commit_id && (end_cid > snapshot_commit_id || tid == transaction_id)
//! ```
//!
//! Row transaction ids are materialized into a plain `Vec<u64>` at chunk
//! start (see [`MvccState::bind_direct`]) to avoid atomic loads in the
//! per-row hot path.

use std::sync::Arc;

use parking_lot::{ArcRwLockReadGuard, RawRwLock, RwLock};

/// `(transaction_id, snapshot_commit_id)` — the pair that decides row
/// visibility for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MvccSnapshot {
    pub transaction_id: u64,
    pub snapshot_commit_id: u64,
}

/// The begin/end-commit-id and owning-transaction arrays for one chunk of
/// one table. Shared read-mostly across concurrent pipeline instances; a
/// reader holds the lock for the lifetime of a chunk (§5).
#[derive(Debug, Default)]
pub struct MvccArrays {
    pub begin_cids: Vec<u64>,
    pub end_cids: Vec<u64>,
    pub row_tids: Vec<u64>,
}

pub const OPEN_END_CID: u64 = u64::MAX;

impl MvccArrays {
    pub fn fresh(row_count: usize) -> Self {
        MvccArrays {
            begin_cids: vec![0; row_count],
            end_cids: vec![OPEN_END_CID; row_count],
            row_tids: vec![0; row_count],
        }
    }

    pub fn len(&self) -> usize {
        self.begin_cids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.begin_cids.is_empty()
    }
}

/// Where a pipeline instance's MVCC data for the current chunk comes from:
/// directly from a data chunk, or indirectly through a reference chunk's
/// position list into a base table.
#[derive(Debug)]
pub enum MvccSource {
    Direct {
        /// Holds the shared read lock open for the chunk's lifetime. The
        /// arrays are accessed through the materialized copies below, not
        /// by dereferencing this guard — it exists purely to keep the lock
        /// held for as long as the chunk is being processed.
        _guard: ArcRwLockReadGuard<RawRwLock, MvccArrays>,
        begin_cids: Arc<Vec<u64>>,
        end_cids: Arc<Vec<u64>>,
    },
    Reference {
        _guard: ArcRwLockReadGuard<RawRwLock, MvccArrays>,
        base_begin_cids: Arc<Vec<u64>>,
        base_end_cids: Arc<Vec<u64>>,
        /// For row `i` in this chunk, `positions[i]` is its offset in the
        /// base table's MVCC arrays.
        positions: Vec<usize>,
    },
}

/// The per-chunk MVCC state carried on [`crate::context::RuntimeContext`].
#[derive(Debug)]
pub struct MvccState {
    pub snapshot: MvccSnapshot,
    pub source: MvccSource,
    /// Row transaction ids materialized into a plain vector at chunk start
    /// to avoid atomic access in the per-row loop.
    pub row_tids: Vec<u64>,
}

impl MvccState {
    /// Binds the MVCC state for a chunk whose rows are data rows (not
    /// references), acquiring a shared read lock for the chunk's lifetime.
    pub fn bind_direct(snapshot: MvccSnapshot, arrays: &Arc<RwLock<MvccArrays>>) -> Self {
        let guard = RwLock::read_arc(arrays);
        let begin_cids = Arc::new(guard.begin_cids.clone());
        let end_cids = Arc::new(guard.end_cids.clone());
        let row_tids = guard.row_tids.clone();
        MvccState {
            snapshot,
            source: MvccSource::Direct {
                _guard: guard,
                begin_cids,
                end_cids,
            },
            row_tids,
        }
    }

    /// Binds the MVCC state for a chunk of reference rows: `positions[i]`
    /// is row `i`'s offset into the base table's MVCC arrays.
    pub fn bind_reference(
        snapshot: MvccSnapshot,
        base_arrays: &Arc<RwLock<MvccArrays>>,
        positions: Vec<usize>,
    ) -> Self {
        let guard = RwLock::read_arc(base_arrays);
        let base_begin_cids = Arc::new(guard.begin_cids.clone());
        let base_end_cids = Arc::new(guard.end_cids.clone());
        let row_tids = positions.iter().map(|&p| guard.row_tids[p]).collect();
        MvccState {
            snapshot,
            source: MvccSource::Reference {
                _guard: guard,
                base_begin_cids,
                base_end_cids,
                positions,
            },
            row_tids,
        }
    }

    /// Whether row `offset` of the current chunk is visible under this
    /// snapshot.
    pub fn is_visible(&self, offset: usize) -> bool {
        let (begin_cid, end_cid) = match &self.source {
            MvccSource::Direct {
                begin_cids,
                end_cids,
                ..
            } => (begin_cids[offset], end_cids[offset]),
            MvccSource::Reference {
                base_begin_cids,
                base_end_cids,
                positions,
                ..
            } => {
                let base_offset = positions[offset];
                (base_begin_cids[base_offset], base_end_cids[base_offset])
            }
        };
        let tid = self.row_tids[offset];
        begin_cid <= self.snapshot.snapshot_commit_id
            && (end_cid > self.snapshot.snapshot_commit_id || tid == self.snapshot.transaction_id)
    }
}
