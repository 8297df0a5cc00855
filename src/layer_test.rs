use glam::DVec3;

use super::*;

#[test]
fn block_allocation_bijection() {
  let layer = TsdfLayer::new(0.1, 16);

  // Allocating by coordinate then by index returns the same block.
  let point = DVec3::new(-0.02, 3.27, 1.61);
  let by_coordinates = layer.get_block_by_coordinates(point);
  let by_index = layer.get_block(by_coordinates.block_index());
  assert!(Arc::ptr_eq(&by_coordinates, &by_index));
  assert_eq!(layer.block_count(), 1);

  // The block's origin is its index scaled by the block size.
  let index = by_index.block_index();
  let expected = geometry::origin_from_grid_index(index, layer.block_size());
  assert!((by_index.origin() - expected).length() < 1e-12);
}

#[test]
fn voxel_center_identity() {
  let layer = TsdfLayer::new(0.1, 16);
  let block = layer.get_block(GridIndex::new(-2, 0, 3));

  for x in 0..16 {
    for y in 0..16 {
      for z in 0..16 {
        let voxel_index = GridIndex::new(x, y, z);
        let center = block.coordinates_from_voxel_index(voxel_index);
        let voxel = block.get_voxel_by_coordinates(center);
        assert_eq!(voxel.index(), voxel_index);
      }
    }
  }
}

#[test]
fn global_voxel_index_allocates_valid_local() {
  let layer = TsdfLayer::new(0.1, 16);

  let (block, voxel) =
    layer.block_and_voxel_from_global_voxel_index(GridIndex::new(0, 60, 20));
  assert_eq!(block.block_index(), GridIndex::new(0, 3, 1));
  assert_eq!(voxel.index(), GridIndex::new(0, 12, 4));

  let (block, voxel) =
    layer.block_and_voxel_from_global_voxel_index(GridIndex::new(-1, -16, -17));
  assert_eq!(block.block_index(), GridIndex::new(-1, -1, -2));
  assert_eq!(voxel.index(), GridIndex::new(15, 0, 15));
  assert!(block.is_valid_voxel_index(voxel.index()));
}

#[test]
fn get_voxel_if_exists_does_not_allocate() {
  let layer = TsdfLayer::new(0.1, 16);
  let block = layer.get_block(GridIndex::ZERO);

  assert!(block.get_voxel_if_exists(GridIndex::new(1, 2, 3)).is_none());
  assert_eq!(block.voxel_count(), 0);

  let voxel = block.get_voxel(GridIndex::new(1, 2, 3));
  assert_eq!(voxel.weight(), 0.0);
  assert!(block.get_voxel_if_exists(GridIndex::new(1, 2, 3)).is_some());
  assert_eq!(block.voxel_count(), 1);
}

#[test]
fn truncated_voxel_index_clamps() {
  let layer = TsdfLayer::new(0.1, 16);
  let block = layer.get_block(GridIndex::ZERO);

  // Far outside the block on every axis.
  let clamped = block.truncated_voxel_index(DVec3::new(100.0, -100.0, 0.85));
  assert_eq!(clamped, GridIndex::new(15, 0, 8));
}

#[test]
fn updated_blocks_snapshot() {
  let layer = TsdfLayer::new(0.1, 16);
  let a = layer.get_block(GridIndex::ZERO);
  let b = layer.get_block(GridIndex::new(1, 0, 0));

  // Fresh blocks start dirty.
  assert_eq!(layer.updated_blocks().len(), 2);

  a.set_updated(false);
  assert_eq!(layer.updated_blocks().len(), 1);
  b.set_updated(false);
  assert!(layer.updated_blocks().is_empty());
}
