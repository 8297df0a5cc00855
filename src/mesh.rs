//! Mesh blocks and the mesh layer.
//!
//! The mesh layer shares the TSDF layer's spatial hash so a TSDF block and
//! its mesh always live at the same index. Geometry buffers are rebuilt from
//! scratch on every mesh pass and cleared after egress.

use std::collections::HashMap;
use std::sync::Arc;

use glam::DVec3;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::color::Color;
use crate::geometry::{self, GridIndex};
use crate::layer::TsdfLayer;

/// Geometry buffers of one mesh block.
///
/// Vertices are deduplicated by exact coordinate: emitting the same
/// coordinate twice returns the same index, so triangles sharing an edge
/// share vertices within the block.
#[derive(Default)]
pub struct MeshGeometry {
  pub vertices: Vec<DVec3>,
  pub triangles: Vec<[u32; 3]>,
  pub colors: Vec<Color>,
  vertex_map: HashMap<[u64; 3], u32>,
}

impl MeshGeometry {
  /// Index of the vertex at `position`, appending it on first sight.
  pub fn add_vertex(&mut self, position: DVec3) -> u32 {
    let key = [
      position.x.to_bits(),
      position.y.to_bits(),
      position.z.to_bits(),
    ];
    if let Some(index) = self.vertex_map.get(&key) {
      return *index;
    }
    let index = self.vertices.len() as u32;
    self.vertices.push(position);
    self.vertex_map.insert(key, index);
    index
  }

  /// Drop all geometry, preserving capacity.
  pub fn clear(&mut self) {
    self.vertices.clear();
    self.triangles.clear();
    self.colors.clear();
    self.vertex_map.clear();
  }

  pub fn has_data(&self) -> bool {
    !self.vertices.is_empty() && !self.triangles.is_empty()
  }
}

/// Per-block mesh: vertex, triangle-index and color arrays behind the block
/// lock.
pub struct MeshBlock {
  block_index: GridIndex,
  origin: DVec3,
  geometry: RwLock<MeshGeometry>,
}

impl MeshBlock {
  pub fn new(block_index: GridIndex, origin: DVec3) -> Self {
    Self {
      block_index,
      origin,
      geometry: RwLock::new(MeshGeometry::default()),
    }
  }

  #[inline]
  pub fn block_index(&self) -> GridIndex {
    self.block_index
  }

  #[inline]
  pub fn origin(&self) -> DVec3 {
    self.origin
  }

  /// Egress name of this block: `"{i0}_{i1}_{i2}"`.
  pub fn index_string(&self) -> String {
    format!(
      "{}_{}_{}",
      self.block_index.x, self.block_index.y, self.block_index.z
    )
  }

  pub fn geometry(&self) -> RwLockReadGuard<'_, MeshGeometry> {
    self.geometry.read()
  }

  pub fn geometry_mut(&self) -> RwLockWriteGuard<'_, MeshGeometry> {
    self.geometry.write()
  }

  pub fn vertex_count(&self) -> usize {
    self.geometry.read().vertices.len()
  }

  pub fn has_data(&self) -> bool {
    self.geometry.read().has_data()
  }

  /// Drop the block's geometry so the next mesh pass rebuilds it.
  pub fn clear(&self) {
    self.geometry.write().clear();
  }
}

/// Sparse hash of mesh blocks, indexed like the TSDF layer it mirrors.
pub struct MeshLayer {
  voxel_size: f64,
  voxels_per_side: i32,
  block_size: f64,
  block_size_inv: f64,
  blocks: RwLock<HashMap<GridIndex, Arc<MeshBlock>>>,
}

impl MeshLayer {
  /// A mesh layer sharing the TSDF layer's block indexing.
  pub fn new(tsdf_layer: &TsdfLayer) -> Self {
    Self {
      voxel_size: tsdf_layer.voxel_size(),
      voxels_per_side: tsdf_layer.voxels_per_side(),
      block_size: tsdf_layer.block_size(),
      block_size_inv: tsdf_layer.block_size_inv(),
      blocks: RwLock::new(HashMap::new()),
    }
  }

  #[inline]
  pub fn voxel_size(&self) -> f64 {
    self.voxel_size
  }

  #[inline]
  pub fn voxels_per_side(&self) -> i32 {
    self.voxels_per_side
  }

  #[inline]
  pub fn block_size(&self) -> f64 {
    self.block_size
  }

  pub fn block_count(&self) -> usize {
    self.blocks.read().len()
  }

  /// Snapshot of all allocated mesh blocks.
  pub fn blocks(&self) -> Vec<Arc<MeshBlock>> {
    self.blocks.read().values().cloned().collect()
  }

  /// Mesh block at an index, allocating on first touch.
  pub fn get_block(&self, block_index: GridIndex) -> Arc<MeshBlock> {
    if let Some(block) = self.blocks.read().get(&block_index) {
      return Arc::clone(block);
    }
    let mut blocks = self.blocks.write();
    Arc::clone(blocks.entry(block_index).or_insert_with(|| {
      Arc::new(MeshBlock::new(
        block_index,
        geometry::origin_from_grid_index(block_index, self.block_size),
      ))
    }))
  }

  /// Mesh block at an index, without allocating.
  pub fn get_block_if_exists(&self, block_index: GridIndex) -> Option<Arc<MeshBlock>> {
    self.blocks.read().get(&block_index).map(Arc::clone)
  }

  /// Mesh block containing a world-space point, allocating on first touch.
  pub fn get_block_by_coordinates(&self, point: DVec3) -> Arc<MeshBlock> {
    self.get_block(geometry::grid_index_from_point(point, self.block_size_inv))
  }
}
