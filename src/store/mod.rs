//! Alignment-store boundary.
//!
//! The density aggregator only needs ranged, lazily produced record streams;
//! [`AlignmentStore`] is that seam. [`BamAlignmentStore`] serves indexed BAM
//! files, [`MemoryAlignmentStore`] serves tests and embedders.

mod bam;
mod memory;

pub use bam::BamAlignmentStore;
pub use memory::MemoryAlignmentStore;

use crate::genomics::{AlignmentRecord, GenomicRange};

/// Error type alignment stores report.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Lazily produced records; dropping the iterator releases the query.
pub type RecordStream<'a> = Box<dyn Iterator<Item = Result<AlignmentRecord, StoreError>> + 'a>;

/// Source of alignment records supporting overlap queries.
///
/// Implementations need not be safe for concurrent queries: callers hold
/// exclusive access for the whole lifetime of a [`RecordStream`].
pub trait AlignmentStore {
    /// Reference names in header order.
    fn reference_names(&self) -> Vec<String>;

    /// Length of `reference`, if known.
    fn reference_length(&self, reference: &str) -> Option<u32>;

    /// Records overlapping `range` on `reference`, in store-native order.
    fn query_overlapping<'a>(
        &'a mut self,
        reference: &str,
        range: GenomicRange,
    ) -> Result<RecordStream<'a>, StoreError>;
}
