//! Parallel mesh extraction over updated TSDF blocks.
//!
//! Each updated block is re-meshed from scratch: interior cubes read all 8
//! corners from the block itself, cubes on the three max faces reach into
//! neighbor blocks and are skipped when a neighbor has not been allocated
//! yet (the neighbor's own mesh pass will cover the seam once it exists).

use std::sync::Arc;

use glam::DVec3;
use rayon::prelude::*;
use tracing::debug;
use web_time::Instant;

use crate::block::TsdfBlock;
use crate::color::Color;
use crate::config::MeshConfig;
use crate::geometry::{self, GridIndex};
use crate::layer::TsdfLayer;
use crate::marching_cubes::{self, CUBE_INDEX_OFFSETS};
use crate::mesh::{MeshBlock, MeshGeometry, MeshLayer};

pub struct MeshIntegrator {
  config: MeshConfig,
  tsdf_layer: Arc<TsdfLayer>,
  mesh_layer: Arc<MeshLayer>,
}

impl MeshIntegrator {
  pub fn new(config: MeshConfig, tsdf_layer: Arc<TsdfLayer>, mesh_layer: Arc<MeshLayer>) -> Self {
    Self {
      config,
      tsdf_layer,
      mesh_layer,
    }
  }

  pub fn mesh_layer(&self) -> &Arc<MeshLayer> {
    &self.mesh_layer
  }

  /// Re-mesh every block that was dirty when the call started and clear
  /// their dirty flags. Blocks dirtied during the pass are picked up by the
  /// next invocation.
  pub fn integrate_mesh(&self) {
    let start = Instant::now();
    let updated_blocks = self.tsdf_layer.updated_blocks();

    updated_blocks.par_iter().for_each(|block| {
      self.update_mesh_for_block(block);
      block.set_updated(false);
    });

    debug!(
      blocks = updated_blocks.len(),
      elapsed_us = start.elapsed().as_micros() as u64,
      "meshed updated blocks"
    );
  }

  fn update_mesh_for_block(&self, block: &TsdfBlock) {
    let mesh_block = self.mesh_layer.get_block(block.block_index());
    let vps = block.voxels_per_side();

    {
      let mut geometry = mesh_block.geometry_mut();
      geometry.clear();

      for x in 0..vps {
        for y in 0..vps {
          for z in 0..vps {
            let voxel_index = GridIndex::new(x, y, z);
            if x < vps - 1 && y < vps - 1 && z < vps - 1 {
              self.extract_cube_inside_block(block, voxel_index, &mut geometry);
            } else {
              self.extract_cube_on_border(block, voxel_index, &mut geometry);
            }
          }
        }
      }
    }

    if self.config.use_color {
      self.update_mesh_color(block, &mesh_block);
    }
  }

  /// Cube with all 8 corners inside `block`.
  fn extract_cube_inside_block(
    &self,
    block: &TsdfBlock,
    voxel_index: GridIndex,
    geometry: &mut MeshGeometry,
  ) {
    let mut coords = [DVec3::ZERO; 8];
    let mut sdf = [0.0; 8];

    for (i, offset) in CUBE_INDEX_OFFSETS.iter().enumerate() {
      let corner_index = voxel_index + *offset;
      let Some(voxel) = block.get_voxel_if_exists(corner_index) else {
        return;
      };
      let state = voxel.read();
      if state.weight < self.config.min_weight {
        return;
      }
      coords[i] = block.coordinates_from_voxel_index(corner_index);
      sdf[i] = state.distance;
    }

    marching_cubes::mesh_cube(&coords, &sdf, geometry);
  }

  /// Cube on a max face of `block`: corners past the face are read from the
  /// neighbor block, which must already exist.
  fn extract_cube_on_border(
    &self,
    block: &TsdfBlock,
    voxel_index: GridIndex,
    geometry: &mut MeshGeometry,
  ) {
    let vps = block.voxels_per_side();
    let mut coords = [DVec3::ZERO; 8];
    let mut sdf = [0.0; 8];

    for (i, offset) in CUBE_INDEX_OFFSETS.iter().enumerate() {
      let corner_index = voxel_index + *offset;

      let (owner, local_index) = if block.is_valid_voxel_index(corner_index) {
        (None, corner_index)
      } else {
        let block_offset = GridIndex::new(
          (corner_index.x >= vps) as i32,
          (corner_index.y >= vps) as i32,
          (corner_index.z >= vps) as i32,
        );
        let Some(neighbor) = self
          .tsdf_layer
          .get_block_if_exists(block.block_index() + block_offset)
        else {
          return;
        };
        (Some(neighbor), corner_index - block_offset * vps)
      };
      let owner_block = owner.as_deref().unwrap_or(block);

      let Some(voxel) = owner_block.get_voxel_if_exists(local_index) else {
        return;
      };
      let state = voxel.read();
      if state.weight < self.config.min_weight {
        return;
      }
      coords[i] = owner_block.coordinates_from_voxel_index(local_index);
      sdf[i] = state.distance;
    }

    marching_cubes::mesh_cube(&coords, &sdf, geometry);
  }

  /// Sample voxel colors onto the block's vertices. Vertices whose
  /// containing voxel is missing or too lightly observed keep the default
  /// color.
  fn update_mesh_color(&self, block: &TsdfBlock, mesh_block: &MeshBlock) {
    let mut geometry = mesh_block.geometry_mut();
    let MeshGeometry {
      ref vertices,
      ref mut colors,
      ..
    } = *geometry;

    colors.clear();
    colors.reserve(vertices.len());

    for vertex in vertices {
      let voxel_index = block.voxel_index_from_coordinates(*vertex);
      let voxel = if block.is_valid_voxel_index(voxel_index) {
        block.get_voxel_if_exists(voxel_index)
      } else {
        self
          .tsdf_layer
          .get_block_if_exists(geometry::grid_index_from_point(*vertex, block.block_size_inv()))
          .and_then(|neighbor| {
            neighbor.get_voxel_if_exists(neighbor.voxel_index_from_coordinates(*vertex))
          })
      };

      let mut color = Color::WHITE;
      if let Some(voxel) = voxel {
        let state = voxel.read();
        if state.weight > self.config.min_weight {
          color = state.color;
        }
      }
      colors.push(color);
    }
  }
}

#[cfg(test)]
#[path = "mesh_integrator_test.rs"]
mod mesh_integrator_test;
