//! A tuple-at-a-time expression evaluation core for a column-oriented,
//! in-memory relational engine.
//!
//! A [`plan::Plan`] describes, once, the tuple layout a query needs and the
//! chain of [`operators::Operator`]s that implement it — reading bound
//! input columns, evaluating `WHERE`/computed [`expression::Expression`]
//! trees, folding rows into a `GROUP BY` [`aggregate::AggregateHashmap`],
//! enforcing `LIMIT`, and writing the surviving rows back out through
//! [`segment::SegmentWriter`]s. [`driver::Driver`] replays that chain row
//! by row, chunk by chunk, against a [`table::Table`] under one
//! [`mvcc::MvccSnapshot`].
//!
//! Every row-level evaluation step is NULL-propagating rather than
//! fallible: division by zero, overflow, and incomparable operands all
//! produce SQL NULL (see [`error`]). The only place a query can fail is
//! while building the plan, before any row is touched.

pub mod aggregate;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod expression;
pub mod handle;
pub mod lazy_load;
pub mod mvcc;
pub mod operators;
pub mod plan;
pub mod segment;
pub mod table;
pub mod value;
