//! Reads bound input columns into the tuple for the current row.

use crate::context::RuntimeContext;
use crate::operators::{emit, Operator};
use crate::segment::SegmentReader;

/// Reads every bound column for the current row, then passes it on. Columns
/// classified [`crate::lazy_load::LazyLoad::ReadFromSlot`] by the planner
/// are simply not given a reader here — there's nothing for this operator
/// to do for them.
#[derive(Debug)]
pub struct Read {
    readers: Vec<Box<dyn SegmentReader>>,
}

impl Read {
    pub fn new(readers: Vec<Box<dyn SegmentReader>>) -> Self {
        Read { readers }
    }
}

impl Operator for Read {
    fn consume(&mut self, ctx: &mut RuntimeContext, rest: &mut [Box<dyn Operator>]) {
        for reader in &self.readers {
            reader.read_value(ctx);
        }
        emit(ctx, rest);
    }
}
