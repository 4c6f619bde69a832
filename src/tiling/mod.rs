//! Adaptive-resolution tiling.
//!
//! Maps a query range and a bin budget onto fixed-size tiles indexed by
//! `position / tile_size`; tile `t` spans `[t * tile_size + 1, (t + 1) * tile_size]`.

mod planner;

pub use planner::{Tile, TilePlan, TilingConfig, DEFAULT_MAX_BINS};
