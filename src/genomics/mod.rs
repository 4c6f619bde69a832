//! Genomic coordinates, interval sets, 2bit decoding and the two tile
//! aggregators.
//!
//! Everything here works in 1-based inclusive coordinates; conversion from
//! 0-based file layouts happens at the decoding boundary.

mod composition;
mod density;
mod interval_set;
mod twobit;
mod types;

pub use composition::{
    count_bases, BaseCounts, CompositionAggregator, CompositionConfig, MemorySequence,
    SequenceView, DEFAULT_MIN_WINDOW,
};
pub use density::{DensityAggregator, DensityConfig, DensityPolicy, TileAccumulator};
pub use interval_set::IntervalSet;
pub use twobit::{
    ByteOrder, PackedGenomeStore, PackedSequence, SequenceLayout, StoreOptions, TWOBIT_SIGNATURE,
};
pub use types::{resolve_reference_name, AlignmentRecord, GenomicRange, Strand};
