//! A fixed cubical chunk of voxels.
//!
//! Blocks are the unit of sparse allocation, meshing and egress. The voxel
//! hash only holds voxels that have been touched; reading a voxel by index
//! allocates an empty one, which is the contract the integrators rely on.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::DVec3;
use parking_lot::RwLock;

use crate::geometry::{self, GridIndex};
use crate::voxel::TsdfVoxel;

pub struct TsdfBlock {
  block_index: GridIndex,
  origin: DVec3,
  voxels_per_side: i32,
  voxel_size: f64,
  voxel_size_inv: f64,
  block_size: f64,
  block_size_inv: f64,
  updated: AtomicBool,
  voxels: RwLock<HashMap<GridIndex, Arc<TsdfVoxel>>>,
}

impl TsdfBlock {
  /// New empty block. Freshly allocated blocks start dirty so the mesher
  /// picks them up on the next pass.
  pub fn new(block_index: GridIndex, origin: DVec3, voxels_per_side: i32, voxel_size: f64) -> Self {
    let block_size = voxel_size * voxels_per_side as f64;
    Self {
      block_index,
      origin,
      voxels_per_side,
      voxel_size,
      voxel_size_inv: 1.0 / voxel_size,
      block_size,
      block_size_inv: 1.0 / block_size,
      updated: AtomicBool::new(true),
      voxels: RwLock::new(HashMap::new()),
    }
  }

  #[inline]
  pub fn block_index(&self) -> GridIndex {
    self.block_index
  }

  /// World-space coordinate of the block's minimum corner.
  #[inline]
  pub fn origin(&self) -> DVec3 {
    self.origin
  }

  #[inline]
  pub fn voxels_per_side(&self) -> i32 {
    self.voxels_per_side
  }

  #[inline]
  pub fn voxel_size(&self) -> f64 {
    self.voxel_size
  }

  #[inline]
  pub fn block_size(&self) -> f64 {
    self.block_size
  }

  #[inline]
  pub fn block_size_inv(&self) -> f64 {
    self.block_size_inv
  }

  /// Whether the block has been written since the last mesh pass.
  pub fn updated(&self) -> bool {
    self.updated.load(Ordering::Acquire)
  }

  /// Transition the dirty flag. Idempotent.
  pub fn set_updated(&self, updated: bool) {
    self.updated.store(updated, Ordering::Release);
  }

  /// Number of allocated voxels.
  pub fn voxel_count(&self) -> usize {
    self.voxels.read().len()
  }

  /// Snapshot of the allocated voxels.
  pub fn voxels(&self) -> Vec<Arc<TsdfVoxel>> {
    self.voxels.read().values().cloned().collect()
  }

  /// Voxel at a local index, allocating an empty voxel on first touch.
  pub fn get_voxel(&self, voxel_index: GridIndex) -> Arc<TsdfVoxel> {
    if let Some(voxel) = self.voxels.read().get(&voxel_index) {
      return Arc::clone(voxel);
    }
    let mut voxels = self.voxels.write();
    Arc::clone(
      voxels
        .entry(voxel_index)
        .or_insert_with(|| Arc::new(TsdfVoxel::new(voxel_index))),
    )
  }

  /// Voxel at a local index, without allocating.
  pub fn get_voxel_if_exists(&self, voxel_index: GridIndex) -> Option<Arc<TsdfVoxel>> {
    self.voxels.read().get(&voxel_index).map(Arc::clone)
  }

  /// Voxel containing a world-space point, allocating on first touch.
  pub fn get_voxel_by_coordinates(&self, point: DVec3) -> Arc<TsdfVoxel> {
    self.get_voxel(self.voxel_index_from_coordinates(point))
  }

  /// Local voxel index containing a world-space point. The result is only
  /// valid when the point lies inside this block.
  #[inline]
  pub fn voxel_index_from_coordinates(&self, point: DVec3) -> GridIndex {
    geometry::grid_index_from_point(point - self.origin, self.voxel_size_inv)
  }

  /// Local voxel index for a world-space point, clamped into the block.
  pub fn truncated_voxel_index(&self, point: DVec3) -> GridIndex {
    let max_value = self.voxels_per_side - 1;
    self
      .voxel_index_from_coordinates(point)
      .clamp(GridIndex::ZERO, GridIndex::splat(max_value))
  }

  /// World-space center of a local voxel.
  #[inline]
  pub fn coordinates_from_voxel_index(&self, voxel_index: GridIndex) -> DVec3 {
    self.origin + geometry::center_from_grid_index(voxel_index, self.voxel_size)
  }

  /// Whether a local index lies inside the block.
  #[inline]
  pub fn is_valid_voxel_index(&self, voxel_index: GridIndex) -> bool {
    voxel_index.cmpge(GridIndex::ZERO).all()
      && voxel_index.cmplt(GridIndex::splat(self.voxels_per_side)).all()
  }
}
