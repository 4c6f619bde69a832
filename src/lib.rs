//! # Zoom-dependent genomic annotation tiles
//!
//! This library turns very large reference-genome and alignment files into a
//! bounded number of summary features for a genome-browser style client that
//! asks for a coordinate range plus a maximum number of display bins.
//!
//! ## Core pieces
//!
//! 1. **Tile planning**: `tile_size = max(floor, span / max_bins)`, tiles indexed
//!    by `position / tile_size` ([`tiling`]).
//! 2. **Read-depth density**: stream alignment records once, distribute each
//!    fragment over the tiles it overlaps ([`genomics::DensityAggregator`]).
//! 3. **Base composition**: per-tile GC fraction and CpG observed/expected
//!    ([`genomics::CompositionAggregator`]).
//! 4. **2bit decoding**: random access into a memory-mapped packed genome
//!    with lazily decoded N and mask regions ([`genomics::PackedGenomeStore`]).
//!
//! ## Usage Example
//!
//! ```ignore
//! use tilescope::genomics::{CompositionAggregator, CompositionConfig, PackedGenomeStore, StoreOptions};
//! use tilescope::features::FeatureFilter;
//!
//! let store = PackedGenomeStore::open("hg19.2bit", StoreOptions::default().with_elide_repeats(true))?;
//! let chr1 = store.sequence("1")?;
//! let aggregator = CompositionAggregator::new(CompositionConfig::default())?;
//! let features = aggregator.aggregate(&*chr1, &FeatureFilter::overlapping(1, 1_000_000), 500)?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod features; // Typed features, feature sets and acceptance filters
pub mod genomics; // Intervals, 2bit decoding and the two aggregators
pub mod plugin; // Annotation sources and the source registry
pub mod store; // Alignment-store boundary and implementations
pub mod tiling; // Adaptive-resolution tile planning
/// Python bindings for exposing tile aggregation to external runtimes.
#[cfg(feature = "python-bindings")]
pub mod python_bindings;

// Re-exports for convenience
pub use features::{Feature, FeatureFilter, FeatureSet, FeatureType, Strand};
pub use genomics::{
    AlignmentRecord, CompositionAggregator, DensityAggregator, DensityPolicy, GenomicRange,
    IntervalSet, PackedGenomeStore, PackedSequence,
};
pub use store::{AlignmentStore, StoreError};
pub use tiling::{Tile, TilePlan, TilingConfig};

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening sources or answering a query.
#[derive(Error, Debug)]
pub enum AnnotationError {
    /// Invalid configuration value or unusable input location.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Underlying file could not be opened or mapped.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to open.
        path: PathBuf,
        /// Operating-system error.
        #[source]
        source: std::io::Error,
    },

    /// Malformed container (signature, version, truncated record).
    #[error("format error: {0}")]
    Format(String),

    /// Reference name unknown to the source, even after `chr` toggling.
    #[error("no sequence named {0}")]
    NotFound(String),

    /// Position outside `1..=length`.
    #[error("{position} is outside 1:{length}")]
    Bounds {
        /// Requested 1-based position.
        position: i64,
        /// Length of the sequence.
        length: u32,
    },

    /// Failure reported by the alignment store while streaming a query.
    #[error("alignment store failure: {0}")]
    UpstreamStore(#[source] StoreError),
}

impl AnnotationError {
    /// Helper for constructing format errors.
    pub fn format(msg: impl Into<String>) -> Self {
        AnnotationError::Format(msg.into())
    }

    /// Helper for constructing configuration errors.
    pub fn configuration(msg: impl Into<String>) -> Self {
        AnnotationError::Configuration(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnnotationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_error_message_matches_range_notation() {
        let err = AnnotationError::Bounds {
            position: 9,
            length: 8,
        };
        assert_eq!(err.to_string(), "9 is outside 1:8");
    }

    #[test]
    fn upstream_error_keeps_source() {
        let inner: StoreError = "truncated BGZF block".into();
        let err = AnnotationError::UpstreamStore(inner);
        let source = std::error::Error::source(&err).expect("source retained");
        assert_eq!(source.to_string(), "truncated BGZF block");
    }
}
