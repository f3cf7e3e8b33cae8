//! Terminal operator: appends the current row's bound output slots into
//! their writers. Always the last node in a chain; never calls [`emit`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::context::RuntimeContext;
use crate::operators::Operator;
use crate::segment::SegmentWriter;
use crate::table::ColumnData;

/// Shared handle to a `Write` operator's accumulating writer list.
pub type SharedWriters = Arc<Mutex<Vec<Box<dyn SegmentWriter>>>>;

/// The writer list lives behind a shared lock rather than inside `Write`
/// itself: the same `Write` instance is reused across every chunk of a scan
/// (only the `Read` operator ahead of it is rebuilt per chunk, see
/// [`crate::driver`]), and the driver needs to reach in and call `finish`
/// once the scan is over without downcasting a `Box<dyn Operator>`.
#[derive(Debug, Clone)]
pub struct Write {
    writers: SharedWriters,
}

impl Write {
    /// Builds a `Write` operator and returns a second handle to the same
    /// writer list, for the driver to keep and finish once the scan ends.
    pub fn new(writers: Vec<Box<dyn SegmentWriter>>) -> (Self, SharedWriters) {
        let shared = Arc::new(Mutex::new(writers));
        (Write { writers: shared.clone() }, shared)
    }
}

impl Operator for Write {
    fn consume(&mut self, ctx: &mut RuntimeContext, _rest: &mut [Box<dyn Operator>]) {
        for writer in self.writers.lock().iter_mut() {
            writer.write_value(ctx);
        }
    }
}

/// Finishes every writer into its column, in binding order. Called once,
/// after the last row of the scan has been processed. Panics if a `Write`
/// clone is still alive elsewhere, which would mean the scan isn't actually
/// finished.
pub fn finish_writers(writers: SharedWriters) -> Vec<ColumnData> {
    let writers = Arc::try_unwrap(writers)
        .expect("finish_writers called while a Write operator still holds this handle")
        .into_inner();
    writers.into_iter().map(|writer| writer.finish()).collect()
}
