use tracing::debug;

use crate::features::{query_range, AnnotationValue, Feature, FeatureFilter, FeatureSet, FeatureType};
use crate::genomics::{AlignmentRecord, GenomicRange, Strand};
use crate::store::AlignmentStore;
use crate::tiling::{TilePlan, TilingConfig};
use crate::{AnnotationError, Result};

/// How alignment records are turned into per-tile depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DensityPolicy {
    /// One contribution per fragment (unpaired read, or first segment of a
    /// proper pair spanning both mates), spread over tiles as
    /// `overlap / fragment_length`. Score is `1000 * weight / tile_size`.
    #[default]
    FragmentDepth,
    /// Every record contributes its raw overlap in bases. Score is
    /// `weight / tile_size`, i.e. mean per-base coverage.
    RawCoverage,
}

impl DensityPolicy {
    /// Multiplier applied to tile weights before dividing by the tile size.
    pub fn scale_factor(self) -> f64 {
        match self {
            DensityPolicy::FragmentDepth => 1000.0,
            DensityPolicy::RawCoverage => 1.0,
        }
    }
}

/// Parameters of the read-depth aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityConfig {
    /// Tile planning (default floor 100 bases, 500 bins).
    pub tiling: TilingConfig,
    /// Records with mapping quality below this are dropped; `-1` keeps all.
    pub quality_threshold: i32,
    /// Attach the read name as a `pair` key to mapping features.
    pub group_pairs: bool,
    /// Depth weighting strategy.
    pub policy: DensityPolicy,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            tiling: TilingConfig::default(),
            quality_threshold: -1,
            group_pairs: false,
            policy: DensityPolicy::default(),
        }
    }
}

impl DensityConfig {
    /// Set the tile planning parameters.
    pub fn with_tiling(mut self, tiling: TilingConfig) -> Self {
        self.tiling = tiling;
        self
    }

    /// Set the mapping-quality threshold.
    pub fn with_quality_threshold(mut self, threshold: i32) -> Self {
        self.quality_threshold = threshold;
        self
    }

    /// Enable or disable pair keys on mapping features.
    pub fn with_group_pairs(mut self, enabled: bool) -> Self {
        self.group_pairs = enabled;
        self
    }

    /// Select the depth weighting strategy.
    pub fn with_policy(mut self, policy: DensityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Check tile parameters.
    pub fn validate(&self) -> Result<()> {
        self.tiling.validate()
    }
}

/// Per-tile weight accumulator for one query.
#[derive(Debug, Clone)]
pub struct TileAccumulator {
    plan: TilePlan,
    weights: Vec<f64>,
}

impl TileAccumulator {
    /// Zeroed accumulator with one slot per planned tile.
    pub fn new(plan: TilePlan) -> Self {
        Self {
            plan,
            weights: vec![0.0; plan.tile_count()],
        }
    }

    /// Spread `span` over the planned tiles it overlaps. With `normalize`,
    /// each tile receives `overlap / span.len()`; otherwise the raw overlap.
    /// Parts outside the plan are dropped.
    pub fn add_span(&mut self, span: &GenomicRange, normalize: bool) {
        let span_len = f64::from(span.len());
        for index in self.plan.tiles_overlapping(span) {
            let tile = self.plan.tile_range(index);
            let overlap = match tile.intersection(span) {
                Some(shared) => f64::from(shared.len()),
                None => continue,
            };
            if let Some(slot) = self.plan.slot(index) {
                self.weights[slot] += if normalize { overlap / span_len } else { overlap };
            }
        }
    }

    /// Accumulated weights, one per planned tile.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Sum over all tiles.
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }
}

/// Streams alignment records once per query and emits per-record mapping
/// features plus one density feature per tile.
#[derive(Debug, Clone)]
pub struct DensityAggregator {
    config: DensityConfig,
}

impl DensityAggregator {
    /// Create an aggregator after validating `config`.
    pub fn new(config: DensityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &DensityConfig {
        &self.config
    }

    /// Aggregate `reference` as constrained by `filter`.
    ///
    /// The caller must hold exclusive access to `store` for the call. Any
    /// store failure aborts the query; no partial result is returned.
    pub fn aggregate<S>(
        &self,
        store: &mut S,
        reference: &str,
        filter: &FeatureFilter,
        max_bins: i32,
    ) -> Result<FeatureSet>
    where
        S: AlignmentStore + ?Sized,
    {
        let length = store
            .reference_length(reference)
            .ok_or_else(|| AnnotationError::NotFound(reference.to_string()))?;
        let mut result = FeatureSet::new();
        let Some(query) = query_range(filter, length) else {
            return Ok(result);
        };

        let plan = self.config.tiling.plan(query, max_bins);
        let mut tiles = TileAccumulator::new(plan);
        let mut streamed = 0usize;
        let mut kept = 0usize;

        let records = store
            .query_overlapping(reference, query)
            .map_err(AnnotationError::UpstreamStore)?;
        for record in records {
            let record = record.map_err(AnnotationError::UpstreamStore)?;
            streamed += 1;
            let Some(aligned) = record.aligned_range() else {
                continue;
            };
            if i32::from(record.mapping_quality) < self.config.quality_threshold {
                continue;
            }
            kept += 1;

            let feature = self.mapping_feature(&record, aligned);
            if filter.accept(&feature) {
                result.push(feature);
            }
            self.accumulate(&mut tiles, &record, &aligned);
        }

        let scale = self.config.policy.scale_factor();
        let tile_size = f64::from(plan.tile_size());
        for (tile, weight) in plan.tiles().zip(tiles.weights()) {
            let feature = Feature::new(FeatureType::Density, tile.range, Strand::Unknown)
                .with_score(scale * weight / tile_size);
            if filter.accept(&feature) {
                result.push(feature);
            }
        }

        debug!(
            reference,
            %query,
            streamed,
            kept,
            tiles = plan.tile_count(),
            emitted = result.len(),
            policy = ?self.config.policy,
            "aggregated read density"
        );
        Ok(result)
    }

    fn mapping_feature(&self, record: &AlignmentRecord, aligned: GenomicRange) -> Feature {
        let feature = Feature::new(FeatureType::Mapping, aligned, record.strand);
        if self.config.group_pairs {
            feature.with_annotation("pair", AnnotationValue::Text(record.read_name.to_string()))
        } else {
            feature
        }
    }

    fn accumulate(&self, tiles: &mut TileAccumulator, record: &AlignmentRecord, aligned: &GenomicRange) {
        match self.config.policy {
            DensityPolicy::FragmentDepth => {
                if !record.represents_fragment() {
                    return;
                }
                if let Some(fragment) = record.fragment_range() {
                    tiles.add_span(&fragment, true);
                }
            }
            DensityPolicy::RawCoverage => tiles.add_span(aligned, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryAlignmentStore;

    fn r(start: u32, end: u32) -> GenomicRange {
        GenomicRange::new(start, end).unwrap()
    }

    fn plan_1k() -> TilePlan {
        TilingConfig::default().plan(r(1, 1_000), 500)
    }

    #[test]
    fn normalized_span_sums_to_one() {
        let mut acc = TileAccumulator::new(plan_1k());
        acc.add_span(&r(50, 249), true);
        let w = acc.weights();
        assert!((w[0] - 0.255).abs() < 1e-12);
        assert!((w[1] - 0.5).abs() < 1e-12);
        assert!((w[2] - 0.245).abs() < 1e-12);
        assert!((acc.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn span_ending_on_tile_boundary_stays_in_that_tile() {
        let mut acc = TileAccumulator::new(plan_1k());
        acc.add_span(&r(100, 100), false);
        assert_eq!(acc.weights()[0], 1.0);
        assert_eq!(acc.weights()[1], 0.0);
    }

    #[test]
    fn span_from_position_zero_is_clamped() {
        let mut acc = TileAccumulator::new(plan_1k());
        acc.add_span(&GenomicRange::from_bounds(0, 50), false);
        assert_eq!(acc.weights()[0], 50.0);
        assert_eq!(acc.total(), 50.0);
    }

    #[test]
    fn raw_weights_equal_overlap_lengths() {
        let mut acc = TileAccumulator::new(plan_1k());
        let spans = [r(1, 75), r(60, 310), r(999, 1_050)];
        for span in &spans {
            acc.add_span(span, false);
        }
        let expected: u32 = spans.iter().map(|s| s.len()).sum();
        assert_eq!(acc.total(), f64::from(expected));
    }

    #[test]
    fn fragment_depth_counts_each_pair_once() {
        let mut store = MemoryAlignmentStore::new();
        store.add_reference("chr1", 1_000);
        store.push("chr1", AlignmentRecord::new("p", 101, 150).with_mate(251, true, true));
        store.push("chr1", AlignmentRecord::new("p", 251, 300).with_mate(101, false, true).reversed());

        let aggregator = DensityAggregator::new(DensityConfig::default()).unwrap();
        let features = aggregator
            .aggregate(&mut store, "chr1", &FeatureFilter::overlapping(1, 1_000), 500)
            .unwrap();

        assert_eq!(features.count_of(FeatureType::Mapping), 2);
        let scores: Vec<f64> = features
            .of_type(FeatureType::Density)
            .map(|f| f.score().unwrap())
            .collect();
        assert_eq!(scores.len(), 10);
        // Fragment 101..300 covers tiles 1 and 2 equally.
        assert!((scores[1] - 5.0).abs() < 1e-9);
        assert!((scores[2] - 5.0).abs() < 1e-9);
        assert_eq!(scores[0], 0.0);
    }

    #[test]
    fn quality_threshold_and_unplaced_records_are_dropped() {
        let mut store = MemoryAlignmentStore::new();
        store.add_reference("chr1", 500);
        store.push("chr1", AlignmentRecord::new("low", 10, 60).with_mapping_quality(3));
        store.push("chr1", AlignmentRecord::new("unplaced", 0, 60));
        store.push("chr1", AlignmentRecord::new("ok", 10, 60).with_mapping_quality(30));

        let config = DensityConfig::default()
            .with_quality_threshold(10)
            .with_group_pairs(true);
        let aggregator = DensityAggregator::new(config).unwrap();
        let features = aggregator
            .aggregate(&mut store, "chr1", &FeatureFilter::All, -1)
            .unwrap();

        let mappings: Vec<&Feature> = features.of_type(FeatureType::Mapping).collect();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].groups()[0].id, "ok");
        assert_eq!(mappings[0].range, r(10, 60));
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let mut store = MemoryAlignmentStore::new();
        let aggregator = DensityAggregator::new(DensityConfig::default()).unwrap();
        let err = aggregator
            .aggregate(&mut store, "chrZ", &FeatureFilter::All, 10)
            .unwrap_err();
        assert!(matches!(err, AnnotationError::NotFound(name) if name == "chrZ"));
    }
}
