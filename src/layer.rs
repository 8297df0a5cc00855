//! The sparse TSDF voxel store.
//!
//! A layer is a hash of blocks keyed by 3-D block index. The layer lock only
//! guards the block map; voxel mutation synchronizes on block and voxel
//! locks, so concurrent integration workers contend on the layer only when
//! allocating a block for the first time.

use std::collections::HashMap;
use std::sync::Arc;

use glam::DVec3;
use parking_lot::RwLock;

use crate::block::TsdfBlock;
use crate::color::Color;
use crate::geometry::{self, GridIndex};
use crate::voxel::TsdfVoxel;

pub struct TsdfLayer {
  voxel_size: f64,
  voxel_size_inv: f64,
  voxels_per_side: i32,
  block_size: f64,
  block_size_inv: f64,
  blocks: RwLock<HashMap<GridIndex, Arc<TsdfBlock>>>,
}

impl TsdfLayer {
  pub fn new(voxel_size: f64, voxels_per_side: i32) -> Self {
    let block_size = voxel_size * voxels_per_side as f64;
    Self {
      voxel_size,
      voxel_size_inv: 1.0 / voxel_size,
      voxels_per_side,
      block_size,
      block_size_inv: 1.0 / block_size,
      blocks: RwLock::new(HashMap::new()),
    }
  }

  #[inline]
  pub fn voxel_size(&self) -> f64 {
    self.voxel_size
  }

  #[inline]
  pub fn voxel_size_inv(&self) -> f64 {
    self.voxel_size_inv
  }

  #[inline]
  pub fn voxels_per_side(&self) -> i32 {
    self.voxels_per_side
  }

  #[inline]
  pub fn block_size(&self) -> f64 {
    self.block_size
  }

  #[inline]
  pub fn block_size_inv(&self) -> f64 {
    self.block_size_inv
  }

  /// Number of allocated blocks.
  pub fn block_count(&self) -> usize {
    self.blocks.read().len()
  }

  /// Snapshot of all allocated blocks.
  pub fn blocks(&self) -> Vec<Arc<TsdfBlock>> {
    self.blocks.read().values().cloned().collect()
  }

  /// Snapshot of the blocks whose dirty flag is set.
  pub fn updated_blocks(&self) -> Vec<Arc<TsdfBlock>> {
    self
      .blocks
      .read()
      .values()
      .filter(|b| b.updated())
      .cloned()
      .collect()
  }

  /// Block at an index, allocating on first touch.
  pub fn get_block(&self, block_index: GridIndex) -> Arc<TsdfBlock> {
    if let Some(block) = self.blocks.read().get(&block_index) {
      return Arc::clone(block);
    }
    let mut blocks = self.blocks.write();
    Arc::clone(blocks.entry(block_index).or_insert_with(|| {
      Arc::new(TsdfBlock::new(
        block_index,
        geometry::origin_from_grid_index(block_index, self.block_size),
        self.voxels_per_side,
        self.voxel_size,
      ))
    }))
  }

  /// Block at an index, without allocating.
  pub fn get_block_if_exists(&self, block_index: GridIndex) -> Option<Arc<TsdfBlock>> {
    self.blocks.read().get(&block_index).map(Arc::clone)
  }

  /// Block containing a world-space point, allocating on first touch.
  pub fn get_block_by_coordinates(&self, point: DVec3) -> Arc<TsdfBlock> {
    self.get_block(geometry::grid_index_from_point(point, self.block_size_inv))
  }

  /// Block and voxel for a global voxel index, allocating both on first
  /// touch.
  pub fn block_and_voxel_from_global_voxel_index(
    &self,
    global_voxel_index: GridIndex,
  ) -> (Arc<TsdfBlock>, Arc<TsdfVoxel>) {
    let block_index =
      geometry::block_index_from_global_voxel_index(global_voxel_index, self.voxels_per_side);
    let block = self.get_block(block_index);
    let voxel_index =
      geometry::local_from_global_voxel_index(global_voxel_index, block_index, self.voxels_per_side);
    let voxel = block.get_voxel(voxel_index);
    (block, voxel)
  }

  /// Centers and colors of voxels close to the surface: distance within one
  /// voxel of zero and weight above `min_weight`.
  pub fn voxel_centers_near_surface(&self, min_weight: f64) -> Vec<(DVec3, Color)> {
    let mut centers = Vec::new();
    for block in self.blocks.read().values() {
      for voxel in block.voxels() {
        let state = voxel.read();
        if state.distance.abs() < self.voxel_size && state.weight > min_weight {
          centers.push((block.coordinates_from_voxel_index(voxel.index()), state.color));
        }
      }
    }
    centers
  }
}

#[cfg(test)]
#[path = "layer_test.rs"]
mod layer_test;
