use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::features::{FeatureFilter, FeatureSet, FeatureType};
use crate::genomics::{
    resolve_reference_name, CompositionAggregator, CompositionConfig, DensityAggregator,
    DensityConfig, GenomicRange, PackedGenomeStore, PackedSequence, StoreOptions,
};
use crate::plugin::{AnnotationSource, EntryPoint};
use crate::store::AlignmentStore;
use crate::{AnnotationError, Result};

/// Read mappings and tile density over an alignment store.
///
/// The store is held behind a mutex for the whole of each query, so one
/// store handle serves any number of callers.
#[derive(Debug)]
pub struct DensitySource<S> {
    store: Mutex<S>,
    aggregator: DensityAggregator,
}

impl<S: AlignmentStore + Send> DensitySource<S> {
    /// Wrap `store` with the given aggregation parameters.
    pub fn new(store: S, config: DensityConfig) -> Result<Self> {
        Ok(Self {
            store: Mutex::new(store),
            aggregator: DensityAggregator::new(config)?,
        })
    }

    /// Aggregation parameters in use.
    pub fn config(&self) -> &DensityConfig {
        self.aggregator.config()
    }

    /// Release the wrapped store.
    pub fn into_inner(self) -> S {
        self.store.into_inner()
    }
}

impl<S: AlignmentStore + Send> AnnotationSource for DensitySource<S> {
    fn source_type(&self) -> &'static str {
        "bam"
    }

    fn version(&self) -> &'static str {
        "0.1.0"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Mapping, FeatureType::Density]
    }

    fn entry_points(&self) -> Result<Vec<EntryPoint>> {
        let store = self.store.lock();
        Ok(store
            .reference_names()
            .into_iter()
            .map(|name| EntryPoint {
                length: store.reference_length(&name),
                name,
            })
            .collect())
    }

    fn reference_length(&self, reference: &str) -> Option<u32> {
        let store = self.store.lock();
        let resolved =
            resolve_reference_name(reference, |name| store.reference_length(name).is_some())?;
        store.reference_length(&resolved)
    }

    fn features(&self, reference: &str, filter: &FeatureFilter, max_bins: i32) -> Result<FeatureSet> {
        let mut store = self.store.lock();
        let resolved =
            resolve_reference_name(reference, |name| store.reference_length(name).is_some())
                .ok_or_else(|| AnnotationError::NotFound(reference.to_string()))?;
        self.aggregator
            .aggregate(&mut *store, &resolved, filter, max_bins)
    }
}

/// GC fraction and CpG observed/expected tiles over a 2bit genome.
#[derive(Debug)]
pub struct CompositionSource {
    store: PackedGenomeStore,
    aggregator: CompositionAggregator,
}

impl CompositionSource {
    /// Open the container at `path` with repeat masks elided.
    pub fn open(path: impl AsRef<Path>, config: CompositionConfig) -> Result<Self> {
        let store = PackedGenomeStore::open(path, StoreOptions::default().with_elide_repeats(true))?;
        Self::from_store(store, config)
    }

    /// Serve an already opened store.
    pub fn from_store(store: PackedGenomeStore, config: CompositionConfig) -> Result<Self> {
        Ok(Self {
            store,
            aggregator: CompositionAggregator::new(config)?,
        })
    }

    /// Underlying store.
    pub fn store(&self) -> &PackedGenomeStore {
        &self.store
    }
}

impl AnnotationSource for CompositionSource {
    fn source_type(&self) -> &'static str {
        "2bit-comp"
    }

    fn version(&self) -> &'static str {
        "1.00"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::CpgOe, FeatureType::Gc]
    }

    /// Names with any `chr` prefix stripped; `*_random` and `M` are hidden.
    fn entry_points(&self) -> Result<Vec<EntryPoint>> {
        let mut points = Vec::new();
        for name in self.store.names() {
            let short = name.strip_prefix("chr").unwrap_or(name);
            if short.ends_with("_random") || short == "M" {
                continue;
            }
            if points.iter().any(|p: &EntryPoint| p.name == short) {
                continue;
            }
            points.push(EntryPoint {
                name: short.to_string(),
                length: self.reference_length(name),
            });
        }
        Ok(points)
    }

    fn reference_length(&self, reference: &str) -> Option<u32> {
        self.store.sequence(reference).ok().map(|seq| seq.len())
    }

    fn features(&self, reference: &str, filter: &FeatureFilter, max_bins: i32) -> Result<FeatureSet> {
        let sequence = self.store.sequence(reference)?;
        self.aggregator.aggregate(&*sequence, filter, max_bins)
    }
}

/// Repeat-masked blocks and raw bases from a 2bit genome.
#[derive(Debug)]
pub struct SequenceSource {
    store: PackedGenomeStore,
}

impl SequenceSource {
    /// Open the container at `path` with repeat masks kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_store(PackedGenomeStore::open(path, StoreOptions::default())?))
    }

    /// Serve an already opened store.
    pub fn from_store(store: PackedGenomeStore) -> Self {
        Self { store }
    }

    /// Resolve `reference` to its packed sequence.
    pub fn sequence(&self, reference: &str) -> Result<Arc<PackedSequence>> {
        self.store.sequence(reference)
    }

    /// Bases of `reference` over `range`.
    pub fn bases(&self, reference: &str, range: &GenomicRange) -> Result<Vec<u8>> {
        self.store.sequence(reference)?.fetch(range)
    }
}

impl AnnotationSource for SequenceSource {
    fn source_type(&self) -> &'static str {
        "2bit"
    }

    fn version(&self) -> &'static str {
        "1.00"
    }

    fn feature_types(&self) -> &'static [FeatureType] {
        &[FeatureType::Repeat]
    }

    fn entry_points(&self) -> Result<Vec<EntryPoint>> {
        Ok(self
            .store
            .names()
            .map(|name| EntryPoint {
                name: name.to_string(),
                length: self.reference_length(name),
            })
            .collect())
    }

    fn reference_length(&self, reference: &str) -> Option<u32> {
        self.store.sequence(reference).ok().map(|seq| seq.len())
    }

    fn features(&self, reference: &str, filter: &FeatureFilter, _max_bins: i32) -> Result<FeatureSet> {
        self.store.sequence(reference)?.repeat_features(filter)
    }
}
