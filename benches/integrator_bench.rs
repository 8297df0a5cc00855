//! Integrator throughput benchmarks.
//!
//! Compares the three integrator variants on the synthetic cylinder scene:
//! - **simple**: every return cast in full
//! - **merged**: one ray per landing voxel
//! - **fast**: approximate-set ray and voxel skipping
//!
//! The mesh pass is benchmarked separately on a freshly fused layer.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{DVec2, DVec3};
use tsdf_fusion::{
  simulation::{orbit_poses, Cylinder, Plane, SimulationWorld},
  Color, FastTsdfIntegrator, MergedTsdfIntegrator, MeshConfig, MeshIntegrator, MeshLayer,
  PointCloud, SimpleTsdfIntegrator, Transform, TsdfConfig, TsdfIntegrator, TsdfLayer,
};

fn scene() -> SimulationWorld {
  let mut world =
    SimulationWorld::new(0.1, DVec3::new(-5.0, -5.0, -1.0), DVec3::new(5.0, 5.0, 6.0));
  world.add_object(Box::new(Cylinder {
    center: DVec3::new(0.0, 0.0, 2.0),
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

fn scene_frames(count: usize) -> Vec<(Transform, PointCloud)> {
  let world = scene();
  orbit_poses(count, DVec3::new(0.0, 0.0, 2.0), 6.0, 2.0)
    .into_iter()
    .map(|pose| {
      let cloud = world.point_cloud_from_transform(&pose, DVec2::new(160.0, 120.0), 150.0, 10.0);
      let sensor_cloud = cloud.transformed(&pose.inverse());
      (pose, sensor_cloud)
    })
    .collect()
}

fn bench_integrators(c: &mut Criterion) {
  let frames = scene_frames(10);
  let config = TsdfConfig::default();

  let mut group = c.benchmark_group("integrate_orbit");
  group.sample_size(10);

  let variants: [(&str, fn(TsdfConfig, Arc<TsdfLayer>) -> Box<dyn TsdfIntegrator>); 3] = [
    ("simple", |config, layer| Box::new(SimpleTsdfIntegrator::new(config, layer))),
    ("merged", |config, layer| Box::new(MergedTsdfIntegrator::new(config, layer))),
    ("fast", |config, layer| Box::new(FastTsdfIntegrator::new(config, layer))),
  ];

  for (name, make) in variants {
    group.bench_function(BenchmarkId::from_parameter(name), |b| {
      b.iter(|| {
        let layer = Arc::new(TsdfLayer::new(config.voxel_size, config.voxels_per_side));
        let mut integrator = make(config.clone(), Arc::clone(&layer));
        for (pose, cloud) in &frames {
          integrator.integrate_point_cloud(pose, cloud);
        }
        layer.block_count()
      });
    });
  }
  group.finish();
}

fn bench_meshing(c: &mut Criterion) {
  let frames = scene_frames(10);
  let config = TsdfConfig::default();

  let layer = Arc::new(TsdfLayer::new(config.voxel_size, config.voxels_per_side));
  let mut integrator = MergedTsdfIntegrator::new(config.clone(), Arc::clone(&layer));
  for (pose, cloud) in &frames {
    integrator.integrate_point_cloud(pose, cloud);
  }

  c.bench_function("integrate_mesh", |b| {
    b.iter(|| {
      // Re-dirty every block so the pass does full work each iteration.
      for block in layer.blocks() {
        block.set_updated(true);
      }
      let mesh_layer = Arc::new(MeshLayer::new(&layer));
      let mesher =
        MeshIntegrator::new(MeshConfig::default(), Arc::clone(&layer), Arc::clone(&mesh_layer));
      mesher.integrate_mesh();
      mesh_layer.block_count()
    });
  });
}

criterion_group!(benches, bench_integrators, bench_meshing);
criterion_main!(benches);
