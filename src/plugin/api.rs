use crate::features::{FeatureFilter, FeatureSet, FeatureType};
use crate::Result;

/// Reference sequence advertised by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    /// Name clients use to address the reference.
    pub name: String,
    /// Number of bases, when the source knows it.
    pub length: Option<u32>,
}

/// A named provider of typed features over reference sequences.
///
/// Sources are shared between request handlers, so `features` takes `&self`
/// and implementations serialise access to any non-thread-safe backend
/// internally.
pub trait AnnotationSource: Send + Sync {
    /// Short type tag (`bam`, `2bit`, `2bit-comp`).
    fn source_type(&self) -> &'static str;

    /// Version string of the source implementation.
    fn version(&self) -> &'static str;

    /// Feature types this source can emit.
    fn feature_types(&self) -> &'static [FeatureType];

    /// Filter accepting exactly the feature types this source emits.
    fn schema(&self) -> FeatureFilter {
        self.feature_types()
            .iter()
            .map(|ty| FeatureFilter::ByType(*ty))
            .reduce(FeatureFilter::or)
            .unwrap_or(FeatureFilter::All)
    }

    /// References clients may query.
    fn entry_points(&self) -> Result<Vec<EntryPoint>>;

    /// Length of `reference` after name resolution, if known.
    fn reference_length(&self, reference: &str) -> Option<u32>;

    /// Features on `reference` accepted by `filter`, tiled into at most
    /// roughly `max_bins` bins (`<= 0` selects the source default).
    fn features(&self, reference: &str, filter: &FeatureFilter, max_bins: i32) -> Result<FeatureSet>;
}
