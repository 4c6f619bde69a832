//! Python bindings that expose tile planning and 2bit composition via PyO3.
use pyo3::{
    exceptions::{PyKeyError, PyRuntimeError, PyValueError},
    prelude::*,
    types::PyModule,
};

use crate::features::FeatureFilter;
use crate::genomics::{
    CompositionAggregator, CompositionConfig, GenomicRange, PackedGenomeStore, StoreOptions,
};
use crate::tiling::TilingConfig;
use crate::AnnotationError;

fn to_py_err(err: AnnotationError) -> PyErr {
    match err {
        AnnotationError::NotFound(name) => PyKeyError::new_err(name),
        AnnotationError::Bounds { .. } | AnnotationError::Configuration(_) => {
            PyValueError::new_err(err.to_string())
        }
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn range(start: u32, end: u32) -> PyResult<GenomicRange> {
    GenomicRange::new(start, end)
        .ok_or_else(|| PyValueError::new_err(format!("invalid range {start}..{end}")))
}

/// Python-facing handle on one 2bit genome.
#[pyclass]
#[derive(Debug)]
pub struct PyAnnotationEngine {
    store: PackedGenomeStore,
    composition: CompositionAggregator,
}

#[pymethods]
impl PyAnnotationEngine {
    #[new]
    #[pyo3(signature = (path, elide_repeats = true))]
    /// Open the 2bit container at `path`.
    pub fn new(path: &str, elide_repeats: bool) -> PyResult<Self> {
        let store = PackedGenomeStore::open(
            path,
            StoreOptions::default().with_elide_repeats(elide_repeats),
        )
        .map_err(to_py_err)?;
        let composition =
            CompositionAggregator::new(CompositionConfig::default()).map_err(to_py_err)?;
        Ok(Self { store, composition })
    }

    /// Sequence names in directory order.
    pub fn sequences(&self) -> Vec<String> {
        self.store.names().map(str::to_string).collect()
    }

    /// Length of `name` (with `chr` prefix resolution).
    pub fn length(&self, name: &str) -> PyResult<u32> {
        Ok(self.store.sequence(name).map_err(to_py_err)?.len())
    }

    /// Bases of `name` over the 1-based inclusive range `start..=end`.
    pub fn bases(&self, name: &str, start: u32, end: u32) -> PyResult<String> {
        let sequence = self.store.sequence(name).map_err(to_py_err)?;
        let bytes = sequence.fetch(&range(start, end)?).map_err(to_py_err)?;
        String::from_utf8(bytes).map_err(|err| PyRuntimeError::new_err(err.to_string()))
    }

    /// Plan tiles for `start..=end`.
    ///
    /// Returns:
    ///     `(tile_size, min_tile_index, max_tile_index)`.
    #[pyo3(signature = (start, end, max_bins = -1, min_tile = 100))]
    pub fn plan_tiles(
        &self,
        start: u32,
        end: u32,
        max_bins: i32,
        min_tile: u32,
    ) -> PyResult<(u32, u32, u32)> {
        let config = TilingConfig::default().with_min_tile(min_tile);
        config.validate().map_err(to_py_err)?;
        let plan = config.plan(range(start, end)?, max_bins);
        Ok((plan.tile_size(), plan.min_tile_index(), plan.max_tile_index()))
    }

    /// GC and CpG o/e tiles overlapping `start..=end` on `name`.
    ///
    /// Returns:
    ///     List of `(type, start, end, score)` tuples.
    #[pyo3(signature = (name, start, end, max_bins = -1))]
    pub fn composition(
        &self,
        name: &str,
        start: u32,
        end: u32,
        max_bins: i32,
    ) -> PyResult<Vec<(String, u32, u32, f64)>> {
        let sequence = self.store.sequence(name).map_err(to_py_err)?;
        let filter = FeatureFilter::Overlaps(range(start, end)?);
        let features = self
            .composition
            .aggregate(&*sequence, &filter, max_bins)
            .map_err(to_py_err)?;
        Ok(features
            .iter()
            .map(|f| {
                (
                    f.feature_type.name().to_string(),
                    f.range.start(),
                    f.range.end(),
                    f.score().unwrap_or(f64::NAN),
                )
            })
            .collect())
    }
}

/// Create Python module.
#[pymodule]
pub fn tilescope_py(_py: Python<'_>, m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyAnnotationEngine>()?;
    Ok(())
}
