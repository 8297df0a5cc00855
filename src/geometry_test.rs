use glam::DVec3;

use super::*;

#[test]
fn grid_index_of_boundary_points() {
  // Points a hair's breadth from a cell boundary land in the upper cell.
  assert_eq!(
    grid_index_from_point(DVec3::new(1.31130219e-06, 5.2854619, 1.1920929e-07), 2.0 * 10.0),
    GridIndex::new(0, 105, 0)
  );
  assert_eq!(
    grid_index_from_point(DVec3::new(-0.0166654587, 5.2854619, 1.1920929e-07), 2.0 * 10.0),
    GridIndex::new(-1, 105, 0)
  );
  assert_eq!(
    grid_index_from_point(DVec3::new(-2.05839586, 4.35501623, 1.1920929e-07), 10.0),
    GridIndex::new(-21, 43, 0)
  );
}

#[test]
fn index_round_trip() {
  let block_size = 1.6;
  for x in -50..=50 {
    for y in -50..=50 {
      for z in -50..=50 {
        let index = GridIndex::new(x, y, z);
        let origin = origin_from_grid_index(index, block_size);
        assert_eq!(grid_index_from_point(origin, 1.0 / block_size), index);
      }
    }
  }
}

#[test]
fn center_from_index() {
  let center = center_from_grid_index(GridIndex::new(-2, 51, -3), 0.1);
  assert!((center - DVec3::new(-0.15, 5.15, -0.25)).length() < EPSILON);

  let center = center_from_grid_index(GridIndex::new(-2, 56, 9), 0.1);
  assert!((center - DVec3::new(-0.15, 5.65, 0.95)).length() < EPSILON);
}

#[test]
fn global_voxel_index_bijection() {
  let vps = 16;
  for x in [-33, -17, -16, -1, 0, 1, 15, 16, 40] {
    for y in [-20, 0, 31] {
      for z in [-5, 0, 16] {
        let global = GridIndex::new(x, y, z);
        let block = block_index_from_global_voxel_index(global, vps);
        let local = local_from_global_voxel_index(global, block, vps);
        assert!(local.cmpge(GridIndex::ZERO).all(), "local {local} out of range");
        assert!(local.cmplt(GridIndex::splat(vps)).all(), "local {local} out of range");
        assert_eq!(block * vps + local, global);
      }
    }
  }
}

#[test]
fn sgn_matches_sign() {
  assert_eq!(sgn(3.5), 1);
  assert_eq!(sgn(-0.001), -1);
  assert_eq!(sgn(0.0), 0);
}
