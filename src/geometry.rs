//! Grid-index arithmetic shared by the TSDF and mesh layers.
//!
//! Three index spaces are in play:
//!
//! - **block index**: position of a block in the block grid,
//! - **local voxel index**: position of a voxel inside its block, in
//!   `[0, voxels_per_side)` per axis,
//! - **global voxel index**: position of a voxel in the infinite voxel grid.
//!
//! The mapping `global = block * voxels_per_side + local` is a bijection under
//! the non-negative remainder convention: floor division recovers the block,
//! euclidean remainder recovers the local index.

use glam::{DVec3, IVec3};

/// Index of a grid cell (block or voxel) along three signed axes.
pub type GridIndex = IVec3;

/// Coordinate epsilon: pulls points that land exactly on a cell boundary into
/// the upper cell.
pub const EPSILON: f64 = 1e-6;

/// Grid index of a point already scaled by the inverse cell size.
#[inline]
pub fn grid_index_from_scaled_point(scaled: DVec3) -> GridIndex {
  GridIndex::new(
    (scaled.x + EPSILON).floor() as i32,
    (scaled.y + EPSILON).floor() as i32,
    (scaled.z + EPSILON).floor() as i32,
  )
}

/// Grid index of a world-space point for cells of size `1 / grid_size_inv`.
#[inline]
pub fn grid_index_from_point(point: DVec3, grid_size_inv: f64) -> GridIndex {
  grid_index_from_scaled_point(point * grid_size_inv)
}

/// World-space coordinate of a cell's minimum corner.
#[inline]
pub fn origin_from_grid_index(index: GridIndex, grid_size: f64) -> DVec3 {
  index.as_dvec3() * grid_size
}

/// World-space coordinate of a cell's center.
#[inline]
pub fn center_from_grid_index(index: GridIndex, grid_size: f64) -> DVec3 {
  (index.as_dvec3() + DVec3::splat(0.5)) * grid_size
}

/// Block index owning a global voxel index (componentwise floor division).
#[inline]
pub fn block_index_from_global_voxel_index(global: GridIndex, voxels_per_side: i32) -> GridIndex {
  GridIndex::new(
    global.x.div_euclid(voxels_per_side),
    global.y.div_euclid(voxels_per_side),
    global.z.div_euclid(voxels_per_side),
  )
}

/// Local voxel index of a global voxel index within `block_index`.
///
/// For pairs produced by [`block_index_from_global_voxel_index`] the result is
/// in `[0, voxels_per_side)` on every axis.
#[inline]
pub fn local_from_global_voxel_index(
  global: GridIndex,
  block_index: GridIndex,
  voxels_per_side: i32,
) -> GridIndex {
  global - block_index * voxels_per_side
}

/// Sign of `x` as a grid step: -1, 0 or +1.
#[inline]
pub fn sgn(x: f64) -> i32 {
  if x > 0.0 {
    1
  } else if x < 0.0 {
    -1
  } else {
    0
  }
}

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;
