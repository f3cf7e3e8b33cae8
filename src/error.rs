//! Error taxonomy for the evaluation core.
//!
//! Per the plan/runtime split the rest of the crate follows: [`PlanError`]
//! is raised while building a [`crate::plan::Plan`] and is fatal to the
//! query before a single row is touched; [`StorageError`] is raised at
//! chunk start when binding readers/writers or acquiring the MVCC lock.
//! Neither is ever raised from inside the per-row operator chain — a
//! condition that would otherwise be an error there (division by zero,
//! overflow) is mapped to SQL NULL instead, never a `Result`.

use thiserror::Error;

use crate::value::DataType;

/// Errors raised while building a plan, before any row is processed.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("tuple layout mismatch at slot {slot}: expected {expected:?}, found {found:?}")]
    TupleLayoutMismatch {
        slot: usize,
        expected: DataType,
        found: DataType,
    },

    #[error("unsupported type combination for {op}: {left:?} and {right:?}")]
    UnsupportedTypeCombination {
        op: String,
        left: DataType,
        right: DataType,
    },

    #[error("result type inference failed: {0}")]
    ResultTypeInference(String),

    #[error("literal value `{value}` cannot be represented as {data_type:?}")]
    OutOfRangeCast { value: String, data_type: DataType },

    #[error("LIKE/NOT LIKE pattern must be a literal expression")]
    LikePatternNotLiteral,

    #[error("BETWEEN/IN operands must share a comparable type")]
    IncomparableOperands,

    #[error("column {0} is not bound to any segment reader in this plan")]
    UnboundColumn(usize),
}

/// Errors raised at chunk start: segment load failures, MVCC lock
/// acquisition failures. Aborts the query and releases any held locks.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to load segment for column {column}: {reason}")]
    SegmentLoad { column: usize, reason: String },

    #[error("failed to acquire MVCC read lock: {0}")]
    MvccLockFailed(String),

    #[error("chunk index {0} out of range")]
    ChunkOutOfRange(usize),

    #[error("reference segment points at a row outside its referenced table: {0:?}")]
    DanglingReference((usize, usize)),
}

pub type PlanResult<T> = Result<T, PlanError>;
pub type StorageResult<T> = Result<T, StorageError>;
