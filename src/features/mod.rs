//! Typed annotation features and the acceptance filters applied to them.
//!
//! Every aggregator emits [`Feature`]s into a [`FeatureSet`]; a
//! [`FeatureFilter`] both bounds the scanned range and decides which
//! emitted features are kept.

mod feature;
mod filter;

pub use crate::genomics::Strand;
pub use feature::{AnnotationValue, Feature, FeatureGroup, FeatureSet, FeatureType};
pub use filter::{query_range, FeatureFilter};
