//! End-to-end fusion and meshing over the synthetic cylinder scene.

use std::sync::Arc;

use glam::{DVec2, DVec3};

use crate::color::Color;
use crate::config::{MeshConfig, TsdfConfig};
use crate::geometry::{GridIndex, EPSILON};
use crate::integrator::{
  FastTsdfIntegrator, MergedTsdfIntegrator, SimpleTsdfIntegrator, TsdfIntegrator,
};
use crate::layer::TsdfLayer;
use crate::mesh::MeshLayer;
use crate::mesh_integrator::MeshIntegrator;
use crate::simulation::{orbit_poses, Cylinder, Plane, SimulationWorld};

const CYLINDER_CENTER: DVec3 = DVec3::new(0.0, 0.0, 2.0);
const FOV_HORIZONTAL: f64 = 150.0;
const CAMERA_MAX_DISTANCE: f64 = 10.0;

fn scene_config() -> TsdfConfig {
  TsdfConfig {
    voxel_size: 0.1,
    voxels_per_side: 16,
    min_range: 0.1,
    max_range: 5.0,
    truncation_distance: 0.1 * 4.0,
    allow_clearing: true,
    allow_carving: true,
    weight_constant: false,
    weight_dropoff: false,
    max_weight: 10_000.0,
    ..TsdfConfig::default()
  }
}

fn cylinder_world() -> SimulationWorld {
  let mut world =
    SimulationWorld::new(0.1, DVec3::new(-5.0, -5.0, -1.0), DVec3::new(5.0, 5.0, 6.0));
  world.add_object(Box::new(Cylinder {
    center: CYLINDER_CENTER,
    radius: 2.0,
    height: 4.0,
    color: Color::RED,
  }));
  world.add_object(Box::new(Plane {
    center: DVec3::ZERO,
    normal: DVec3::Z,
    color: Color::WHITE,
  }));
  world
}

#[test]
fn single_frame_simple_integration() {
  let world = cylinder_world();
  let poses = orbit_poses(50, CYLINDER_CENTER, 6.0, 2.0);
  let config = scene_config();

  let layer = Arc::new(TsdfLayer::new(config.voxel_size, config.voxels_per_side));
  let mut integrator = SimpleTsdfIntegrator::new(config.clone(), Arc::clone(&layer));

  let cloud = world.point_cloud_from_transform(
    &poses[0],
    DVec2::new(320.0, 240.0),
    FOV_HORIZONTAL,
    CAMERA_MAX_DISTANCE,
  );
  let sensor_cloud = cloud.transformed(&poses[0].inverse());

  integrator.integrate_point_cloud(&poses[0], &sensor_cloud);

  assert_eq!(layer.block_count(), 62);

  // The sensor origin voxel saturates: every carving ray starts there.
  let (_, voxel) = layer.block_and_voxel_from_global_voxel_index(GridIndex::new(0, 60, 20));
  assert!((voxel.distance() - 0.4).abs() < EPSILON);
  assert!((voxel.weight() - config.max_weight).abs() < EPSILON);

  // Voxels near the surface picked up an object color.
  let mut colored_near_surface = 0;
  for block in layer.blocks() {
    for voxel in block.voxels() {
      let state = voxel.read();
      if state.distance.abs() < layer.voxel_size() && state.weight > 0.0 {
        assert_ne!(state.color, Color::BLACK, "uncolored surface voxel");
        colored_near_surface += 1;
      }
    }
  }
  assert!(colored_near_surface > 0);

  // Meshing the frame produces one mesh block per TSDF block.
  let mesh_layer = Arc::new(MeshLayer::new(&layer));
  let mesher = MeshIntegrator::new(
    MeshConfig::default(),
    Arc::clone(&layer),
    Arc::clone(&mesh_layer),
  );
  mesher.integrate_mesh();
  assert_eq!(mesh_layer.block_count(), layer.block_count());
}

#[test]
fn orbit_fusion_and_meshing_with_all_integrators() {
  let world = cylinder_world();
  let poses = orbit_poses(50, CYLINDER_CENTER, 6.0, 2.0);
  let config = scene_config();

  let simple_layer = Arc::new(TsdfLayer::new(config.voxel_size, config.voxels_per_side));
  let merged_layer = Arc::new(TsdfLayer::new(config.voxel_size, config.voxels_per_side));
  let fast_layer = Arc::new(TsdfLayer::new(config.voxel_size, config.voxels_per_side));

  let mut integrators: Vec<Box<dyn TsdfIntegrator>> = vec![
    Box::new(SimpleTsdfIntegrator::new(config.clone(), Arc::clone(&simple_layer))),
    Box::new(MergedTsdfIntegrator::new(config.clone(), Arc::clone(&merged_layer))),
    Box::new(FastTsdfIntegrator::new(config.clone(), Arc::clone(&fast_layer))),
  ];

  // A lighter camera keeps the orbit cheap; the scene geometry is the same.
  let resolution = DVec2::new(80.0, 60.0);
  for pose in &poses {
    let cloud =
      world.point_cloud_from_transform(pose, resolution, FOV_HORIZONTAL, CAMERA_MAX_DISTANCE);
    let sensor_cloud = cloud.transformed(&pose.inverse());
    for integrator in &mut integrators {
      integrator.integrate_point_cloud(pose, &sensor_cloud);
    }
  }

  for integrator in &integrators {
    let layer = integrator.layer();
    assert!(layer.block_count() > 0);

    // The block in front of the cylinder wall exists and sits where its
    // index says.
    let block = layer
      .get_block_if_exists(GridIndex::new(0, 1, -1))
      .expect("surface block missing");
    assert!((block.origin() - DVec3::new(0.0, 1.6, -1.6)).length() < 1e-12);

    let mesh_layer = Arc::new(MeshLayer::new(layer));
    let mesher = MeshIntegrator::new(
      MeshConfig::default(),
      Arc::clone(layer),
      Arc::clone(&mesh_layer),
    );
    mesher.integrate_mesh();

    assert_eq!(mesh_layer.block_count(), layer.block_count());
    assert!(layer.updated_blocks().is_empty());

    // The fused surface produced real geometry somewhere.
    let total_vertices: usize = mesh_layer.blocks().iter().map(|b| b.vertex_count()).sum();
    assert!(total_vertices > 0);
  }
}
