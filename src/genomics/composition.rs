use tracing::debug;

use crate::features::{query_range, Feature, FeatureFilter, FeatureSet, FeatureType};
use crate::genomics::{GenomicRange, PackedSequence, Strand};
use crate::tiling::TilingConfig;
use crate::{AnnotationError, Result};

/// Width of the window composition is measured over when tiles are smaller.
pub const DEFAULT_MIN_WINDOW: u32 = 500;

/// Read access to a decoded sequence.
pub trait SequenceView {
    /// Sequence name.
    fn name(&self) -> &str;

    /// Number of bases.
    fn len(&self) -> u32;

    /// Whether the sequence has no bases.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Uppercase ASCII bases covering `range` (1-based, inclusive).
    fn fetch(&self, range: &GenomicRange) -> Result<Vec<u8>>;
}

impl SequenceView for PackedSequence {
    fn name(&self) -> &str {
        PackedSequence::name(self)
    }

    fn len(&self) -> u32 {
        PackedSequence::len(self)
    }

    fn fetch(&self, range: &GenomicRange) -> Result<Vec<u8>> {
        PackedSequence::fetch(self, range)
    }
}

/// Sequence held as a plain byte buffer.
#[derive(Debug, Clone)]
pub struct MemorySequence {
    name: String,
    bases: Vec<u8>,
}

impl MemorySequence {
    /// Wrap `bases`, uppercasing them.
    pub fn new(name: impl Into<String>, bases: impl Into<Vec<u8>>) -> Self {
        let mut bases = bases.into();
        bases.make_ascii_uppercase();
        Self {
            name: name.into(),
            bases,
        }
    }
}

impl SequenceView for MemorySequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> u32 {
        self.bases.len().min(u32::MAX as usize) as u32
    }

    fn fetch(&self, range: &GenomicRange) -> Result<Vec<u8>> {
        let length = SequenceView::len(self);
        if range.end() > length {
            return Err(AnnotationError::Bounds {
                position: i64::from(range.end()),
                length,
            });
        }
        let lo = (range.start() - 1) as usize;
        let hi = range.end() as usize;
        Ok(self.bases[lo..hi].to_vec())
    }
}

/// Base tallies over one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BaseCounts {
    /// `C` bases.
    pub c: u32,
    /// `G` bases.
    pub g: u32,
    /// `CG` adjacencies.
    pub cpg: u32,
    /// Window length.
    pub length: u32,
}

impl BaseCounts {
    /// `(G + C) / length`, zero for an empty window.
    pub fn gc_fraction(&self) -> f64 {
        if self.length == 0 {
            return 0.0;
        }
        f64::from(self.c + self.g) / f64::from(self.length)
    }

    /// `cpg * length / (c * g)`; `None` when either base is absent.
    pub fn cpg_ratio(&self) -> Option<f64> {
        if self.c == 0 || self.g == 0 {
            return None;
        }
        Some(f64::from(self.cpg) * f64::from(self.length) / (f64::from(self.c) * f64::from(self.g)))
    }
}

/// Tally `C`, `G` and `CG` in `bases`.
pub fn count_bases(bases: &[u8]) -> BaseCounts {
    let mut counts = BaseCounts {
        length: bases.len().min(u32::MAX as usize) as u32,
        ..BaseCounts::default()
    };
    for &base in bases {
        match base {
            b'C' => counts.c += 1,
            b'G' => counts.g += 1,
            _ => {}
        }
    }
    counts.cpg = bases.windows(2).filter(|pair| matches!(pair, [b'C', b'G'])).count() as u32;
    counts
}

/// Parameters of the composition aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositionConfig {
    /// Tile planning (default floor 10 bases, 500 bins).
    pub tiling: TilingConfig,
    /// Minimum measurement window.
    pub min_window: u32,
}

impl Default for CompositionConfig {
    fn default() -> Self {
        Self {
            tiling: TilingConfig::default().with_min_tile(10),
            min_window: DEFAULT_MIN_WINDOW,
        }
    }
}

impl CompositionConfig {
    /// Set the tile planning parameters.
    pub fn with_tiling(mut self, tiling: TilingConfig) -> Self {
        self.tiling = tiling;
        self
    }

    /// Set the minimum measurement window.
    pub fn with_min_window(mut self, min_window: u32) -> Self {
        self.min_window = min_window;
        self
    }

    /// Check tile and window parameters.
    pub fn validate(&self) -> Result<()> {
        self.tiling.validate()?;
        if self.min_window == 0 {
            return Err(AnnotationError::configuration("minimum window must be > 0"));
        }
        Ok(())
    }
}

/// Per-tile GC fraction and CpG observed/expected ratio.
#[derive(Debug, Clone)]
pub struct CompositionAggregator {
    config: CompositionConfig,
}

impl CompositionAggregator {
    /// Create an aggregator after validating `config`.
    pub fn new(config: CompositionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    pub fn config(&self) -> &CompositionConfig {
        &self.config
    }

    /// Window measured for `tile` on a sequence of `length` bases.
    ///
    /// Tiles narrower than the minimum window are measured over a window of
    /// that width centred on the tile. Returns `None` when the clipped window
    /// is shorter than 40% of the minimum window.
    pub fn composition_window(&self, tile: &GenomicRange, length: u32) -> Option<GenomicRange> {
        let min_window = i64::from(self.config.min_window);
        let (tmin, tmax) = (i64::from(tile.start()), i64::from(tile.end()));
        let (mut cmin, mut cmax) = if i64::from(tile.len()) < min_window {
            let centred = (tmin + tmax - min_window) / 2;
            (centred, centred + min_window - 1)
        } else {
            (tmin, tmax)
        };
        cmin = cmin.max(1);
        cmax = cmax.min(i64::from(length));
        if cmin > cmax || cmax - cmin + 1 < (0.4 * min_window as f64) as i64 {
            return None;
        }
        GenomicRange::new(cmin as u32, cmax as u32)
    }

    /// Aggregate `sequence` as constrained by `filter`.
    ///
    /// Emits a `gc` feature and, when both `C` and `G` occur in the window, a
    /// `cpgoe` feature per measured tile, both at the tile's own range.
    pub fn aggregate<V>(&self, sequence: &V, filter: &FeatureFilter, max_bins: i32) -> Result<FeatureSet>
    where
        V: SequenceView + ?Sized,
    {
        let mut result = FeatureSet::new();
        let length = sequence.len();
        if length == 0 {
            return Ok(result);
        }
        let Some(query) = query_range(filter, length) else {
            return Ok(result);
        };

        let plan = self.config.tiling.plan(query, max_bins);
        let mut skipped = 0usize;
        let mut undefined_ratio = 0usize;
        for tile in plan.tiles() {
            let Some(window) = self.composition_window(&tile.range, length) else {
                skipped += 1;
                continue;
            };
            let counts = count_bases(&sequence.fetch(&window)?);

            let gc = Feature::new(FeatureType::Gc, tile.range, Strand::Unknown)
                .with_score(counts.gc_fraction());
            if filter.accept(&gc) {
                result.push(gc);
            }
            match counts.cpg_ratio() {
                Some(ratio) => {
                    let cpgoe = Feature::new(FeatureType::CpgOe, tile.range, Strand::Unknown)
                        .with_score(ratio);
                    if filter.accept(&cpgoe) {
                        result.push(cpgoe);
                    }
                }
                None => undefined_ratio += 1,
            }
        }

        debug!(
            sequence = sequence.name(),
            %query,
            tiles = plan.tile_count(),
            skipped,
            undefined_ratio,
            emitted = result.len(),
            "aggregated base composition"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(start: u32, end: u32) -> GenomicRange {
        GenomicRange::new(start, end).unwrap()
    }

    #[test]
    fn counts_cpg_adjacencies_only() {
        let counts = count_bases(b"ACGCGTTGCA");
        assert_eq!(counts.c, 3);
        assert_eq!(counts.g, 3);
        assert_eq!(counts.cpg, 2);
        assert!((counts.gc_fraction() - 0.6).abs() < 1e-12);
        assert!((counts.cpg_ratio().unwrap() - 20.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn missing_c_or_g_leaves_ratio_undefined() {
        assert_eq!(count_bases(b"GGGGAAT").cpg_ratio(), None);
        assert_eq!(count_bases(b"").gc_fraction(), 0.0);
    }

    #[test]
    fn all_gc_window_without_cpg() {
        let mut bases = vec![b'G'; 250];
        bases.extend(std::iter::repeat(b'C').take(250));
        let sequence = MemorySequence::new("s", bases);
        let aggregator = CompositionAggregator::new(CompositionConfig::default()).unwrap();

        let features = aggregator
            .aggregate(&sequence, &FeatureFilter::contained_by(1, 500), 1)
            .unwrap();
        let gc: Vec<&Feature> = features.of_type(FeatureType::Gc).collect();
        assert_eq!(gc.len(), 1);
        assert_eq!(gc[0].range, r(1, 500));
        assert_eq!(gc[0].score(), Some(1.0));
        let cpgoe: Vec<&Feature> = features.of_type(FeatureType::CpgOe).collect();
        assert_eq!(cpgoe[0].score(), Some(0.0));
    }

    #[test]
    fn narrow_tiles_are_measured_over_centred_window() {
        let aggregator = CompositionAggregator::new(CompositionConfig::default()).unwrap();
        assert_eq!(aggregator.composition_window(&r(1_001, 1_010), 10_000), Some(r(755, 1_254)));
        assert_eq!(aggregator.composition_window(&r(1, 1_000), 10_000), Some(r(1, 1_000)));
    }

    #[test]
    fn short_clipped_windows_are_skipped() {
        let aggregator = CompositionAggregator::new(CompositionConfig::default()).unwrap();
        // Centred window for tile 1..10 is -244..255, clipped to 1..255.
        assert_eq!(aggregator.composition_window(&r(1, 10), 10_000), Some(r(1, 255)));
        // Sequence of 150 bases never reaches 200 bases of window.
        assert_eq!(aggregator.composition_window(&r(1, 10), 150), None);
        assert_eq!(aggregator.composition_window(&r(2_000, 2_010), 150), None);

        let sequence = MemorySequence::new("short", vec![b'A'; 150]);
        let features = aggregator
            .aggregate(&sequence, &FeatureFilter::All, -1)
            .unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn memory_sequence_rejects_out_of_range_fetch() {
        let sequence = MemorySequence::new("s", b"acgt".to_vec());
        assert_eq!(sequence.fetch(&r(2, 3)).unwrap(), b"CG");
        assert!(matches!(
            sequence.fetch(&r(3, 9)),
            Err(AnnotationError::Bounds { position: 9, length: 4 })
        ));
    }

    #[test]
    fn query_from_position_zero_starts_at_first_base() {
        let sequence = MemorySequence::new("s", b"acgt".repeat(250));
        assert_eq!(sequence.fetch(&GenomicRange::from_bounds(0, 2)).unwrap(), b"AC");

        let aggregator = CompositionAggregator::new(CompositionConfig::default()).unwrap();
        let features = aggregator
            .aggregate(&sequence, &FeatureFilter::overlapping(0, 600), -1)
            .unwrap();
        let first = features.iter().next().unwrap();
        assert_eq!(first.feature_type, FeatureType::Gc);
        assert_eq!(first.range, r(1, 10));
    }
}
