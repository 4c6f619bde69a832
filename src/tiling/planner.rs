use std::ops::RangeInclusive;

use tracing::debug;

use crate::genomics::GenomicRange;
use crate::{AnnotationError, Result};

/// Bin budget used when the client does not supply one.
pub const DEFAULT_MAX_BINS: u32 = 500;

/// Tiling parameters shared by the aggregators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingConfig {
    /// Smallest tile size ever planned.
    pub min_tile: u32,
    /// Bin budget substituted for non-positive requests.
    pub default_max_bins: u32,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            min_tile: 100,
            default_max_bins: DEFAULT_MAX_BINS,
        }
    }
}

impl TilingConfig {
    /// Set the minimum tile size.
    pub fn with_min_tile(mut self, min_tile: u32) -> Self {
        self.min_tile = min_tile;
        self
    }

    /// Set the default bin budget.
    pub fn with_default_max_bins(mut self, bins: u32) -> Self {
        self.default_max_bins = bins;
        self
    }

    /// Reject parameters that would produce zero-sized tiles or divide by zero.
    pub fn validate(&self) -> Result<()> {
        if self.min_tile == 0 {
            return Err(AnnotationError::configuration("minimum tile size must be > 0"));
        }
        if self.default_max_bins == 0 {
            return Err(AnnotationError::configuration("default bin budget must be > 0"));
        }
        Ok(())
    }

    /// Plan tiles for `range` with at most roughly `max_bins` bins.
    ///
    /// `tile_size = max(min_tile, span / bins)` with truncating division,
    /// `min_tile_index = start / tile_size`,
    /// `max_tile_index = ceil(end / tile_size)`. A budget `<= 0` selects the
    /// default.
    pub fn plan(&self, range: GenomicRange, max_bins: i32) -> TilePlan {
        let bins = if max_bins > 0 {
            max_bins as u32
        } else {
            self.default_max_bins.max(1)
        };
        let tile_size = self.min_tile.max(range.len() / bins).max(1);
        let plan = TilePlan {
            tile_size,
            min_tile: range.start() / tile_size,
            max_tile: range.end().div_ceil(tile_size),
        };
        debug!(
            %range,
            bins,
            tile_size,
            min_tile = plan.min_tile,
            max_tile = plan.max_tile,
            "planned tiles"
        );
        plan
    }
}

/// One fixed-size bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Tile index (`position / tile_size`).
    pub index: u32,
    /// Nominal span; the last tile may extend past the sequence end.
    pub range: GenomicRange,
}

/// Tile size plus the inclusive tile-index range covering a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePlan {
    tile_size: u32,
    min_tile: u32,
    max_tile: u32,
}

impl TilePlan {
    /// Bases per tile.
    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// First planned tile index.
    pub fn min_tile_index(&self) -> u32 {
        self.min_tile
    }

    /// Last planned tile index (inclusive).
    pub fn max_tile_index(&self) -> u32 {
        self.max_tile
    }

    /// Number of planned tiles.
    pub fn tile_count(&self) -> usize {
        (self.max_tile - self.min_tile) as usize + 1
    }

    /// Tile index a position maps to.
    pub fn tile_index_of(&self, position: u32) -> u32 {
        position / self.tile_size
    }

    /// Nominal span of tile `index`, saturating at the coordinate limit.
    pub fn tile_range(&self, index: u32) -> GenomicRange {
        let size = u64::from(self.tile_size);
        let start = (u64::from(index) * size + 1).min(u64::from(u32::MAX)) as u32;
        let end = ((u64::from(index) + 1) * size).min(u64::from(u32::MAX)) as u32;
        GenomicRange::from_bounds(start, end)
    }

    /// Position of tile `index` within the plan, if planned.
    pub fn slot(&self, index: u32) -> Option<usize> {
        (self.min_tile..=self.max_tile)
            .contains(&index)
            .then(|| (index - self.min_tile) as usize)
    }

    /// Planned tiles whose span shares a base with `range`.
    pub fn tiles_overlapping(&self, range: &GenomicRange) -> RangeInclusive<u32> {
        let first = ((range.start() - 1) / self.tile_size).max(self.min_tile);
        let last = ((range.end() - 1) / self.tile_size).min(self.max_tile);
        first..=last
    }

    /// All planned tiles in index order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (self.min_tile..=self.max_tile).map(move |index| Tile {
            index,
            range: self.tile_range(index),
        })
    }
}
