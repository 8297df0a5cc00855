//! TSDF integrators: fuse posed point clouds into the layer.
//!
//! Three variants trade quality for throughput:
//!
//! - [`SimpleTsdfIntegrator`] casts every return in full. Highest quality.
//! - [`MergedTsdfIntegrator`] buckets returns by landing voxel and casts one
//!   ray per bucket; wins scale with point density per voxel.
//! - [`FastTsdfIntegrator`] additionally skips rays whose endpoint region was
//!   already cast this scan and aborts rays that keep re-visiting observed
//!   voxels. Approximate by design: a skipped update is acceptable,
//!   corruption is not.
//!
//! All variants share the same parallel ingestion outline: partition the
//! cloud into `threads` chunks, and per point validate the ray, transform it
//! into the layer frame, then walk it voxel by voxel applying the weighted
//! SDF update.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashSet;
use glam::DVec3;
use rayon::prelude::*;
use tracing::debug;
use web_time::Instant;

use crate::color::Color;
use crate::config::TsdfConfig;
use crate::geometry::{self, GridIndex, EPSILON};
use crate::layer::TsdfLayer;
use crate::point_cloud::PointCloud;
use crate::ray_caster::{validate_ray, Ray, RayCaster};
use crate::transform::Transform;
use crate::voxel::TsdfVoxel;

/// Observation weight of a sensor-frame point: inverse squared depth.
pub fn calculate_weight(point_c: DVec3) -> f64 {
  let dist_z = point_c.z.abs();
  if dist_z > EPSILON {
    1.0 / (dist_z * dist_z)
  } else {
    0.0
  }
}

/// Signed distance of a voxel center along the ray from `origin` to
/// `point_g`: positive in front of the surface, negative behind.
pub fn compute_distance(origin: DVec3, point_g: DVec3, voxel_center: DVec3) -> f64 {
  let v_voxel_origin = voxel_center - origin;
  let v_point_origin = point_g - origin;
  let dist_g = v_point_origin.length();
  let dist_g_v = v_point_origin.dot(v_voxel_origin) / dist_g;
  dist_g - dist_g_v
}

/// Apply one observation to a voxel under its write lock.
///
/// The weight may be attenuated behind the surface (drop-off); the fused
/// distance is the weight-blended average clamped to the truncation band.
/// Color is blended only for observations inside the band.
pub fn update_tsdf_voxel(
  config: &TsdfConfig,
  origin: DVec3,
  point_g: DVec3,
  global_voxel_index: GridIndex,
  color: Color,
  weight: f64,
  voxel: &TsdfVoxel,
) {
  let voxel_center = geometry::center_from_grid_index(global_voxel_index, config.voxel_size);
  let sdf = compute_distance(origin, point_g, voxel_center);

  let mut updated_weight = weight;
  let drop_off_epsilon = config.voxel_size;
  if config.weight_dropoff && sdf < -drop_off_epsilon {
    updated_weight = weight * (config.truncation_distance + sdf)
      / (config.truncation_distance - drop_off_epsilon);
    updated_weight = updated_weight.max(0.0);
  }

  let mut state = voxel.write();

  let new_weight = state.weight + updated_weight;
  if new_weight < EPSILON {
    return;
  }
  let new_weight = new_weight.min(config.max_weight);

  let new_sdf = (sdf * updated_weight + state.distance * state.weight) / new_weight;

  if sdf.abs() < config.truncation_distance {
    state.color = Color::blend(state.color, state.weight, color, weight);
  }

  state.distance = new_sdf.clamp(-config.truncation_distance, config.truncation_distance);
  state.weight = new_weight;
}

/// Walk one validated ray through the layer, updating every voxel it
/// pierces.
fn integrate_ray(config: &TsdfConfig, layer: &TsdfLayer, ray: &Ray, color: Color, weight: f64) {
  let caster = RayCaster::new(
    ray,
    layer.voxel_size_inv(),
    config.truncation_distance,
    config.max_range,
    config.allow_carving,
    true,
  );
  for global_voxel_index in caster {
    let (block, voxel) = layer.block_and_voxel_from_global_voxel_index(global_voxel_index);
    update_tsdf_voxel(config, ray.origin, ray.point, global_voxel_index, color, weight, &voxel);
    block.set_updated(true);
  }
}

/// Shared ingestion path: chunk the cloud and fan the chunks out.
fn integrate_points_parallel(
  config: &TsdfConfig,
  layer: &TsdfLayer,
  pose: &Transform,
  cloud: &PointCloud,
) {
  if cloud.is_empty() {
    return;
  }
  let chunk_size = cloud.len().div_ceil(config.threads.max(1));
  cloud
    .points
    .par_chunks(chunk_size)
    .zip(cloud.colors.par_chunks(chunk_size))
    .for_each(|(points, colors)| {
      for (point, color) in points.iter().zip(colors) {
        let mut ray = Ray::default();
        if !validate_ray(&mut ray, *point, config.min_range, config.max_range, config.allow_clearing)
        {
          continue;
        }
        ray.origin = pose.translation;
        ray.point = pose.transform_point(*point);

        let weight = if config.weight_constant {
          1.0
        } else {
          calculate_weight(*point)
        };
        integrate_ray(config, layer, &ray, *color, weight);
      }
    });
}

/// A TSDF integrator consumes posed point clouds.
pub trait TsdfIntegrator: Send {
  /// Fuse one sensor-frame cloud observed at `pose`. Rows with NaN
  /// coordinates must be filtered upstream
  /// ([`PointCloud::retain_finite`]).
  fn integrate_point_cloud(&mut self, pose: &Transform, cloud: &PointCloud);

  fn layer(&self) -> &Arc<TsdfLayer>;
}

// =============================================================================
// Simple
// =============================================================================

/// Casts every return's ray in full, from the sensor origin to slightly past
/// the surface.
pub struct SimpleTsdfIntegrator {
  config: TsdfConfig,
  layer: Arc<TsdfLayer>,
}

impl SimpleTsdfIntegrator {
  pub fn new(config: TsdfConfig, layer: Arc<TsdfLayer>) -> Self {
    debug_assert!((config.voxel_size - layer.voxel_size()).abs() < EPSILON);
    Self { config, layer }
  }
}

impl TsdfIntegrator for SimpleTsdfIntegrator {
  fn integrate_point_cloud(&mut self, pose: &Transform, cloud: &PointCloud) {
    let start = Instant::now();
    integrate_points_parallel(&self.config, &self.layer, pose, cloud);
    debug!(
      points = cloud.len(),
      elapsed_us = start.elapsed().as_micros() as u64,
      "integrated point cloud (simple)"
    );
  }

  fn layer(&self) -> &Arc<TsdfLayer> {
    &self.layer
  }
}

// =============================================================================
// Merged
// =============================================================================

/// Decimate the cloud to one representative return per landing voxel; ties
/// keep the last point seen.
fn bundle_rays(voxel_size_inv: f64, cloud: &PointCloud) -> HashMap<GridIndex, usize> {
  let mut voxel_map = HashMap::new();
  for (i, point) in cloud.points.iter().enumerate() {
    voxel_map.insert(geometry::grid_index_from_point(*point, voxel_size_inv), i);
  }
  voxel_map
}

/// Buckets returns by their voxel of landing and casts one ray per bucket.
pub struct MergedTsdfIntegrator {
  config: TsdfConfig,
  layer: Arc<TsdfLayer>,
}

impl MergedTsdfIntegrator {
  pub fn new(config: TsdfConfig, layer: Arc<TsdfLayer>) -> Self {
    debug_assert!((config.voxel_size - layer.voxel_size()).abs() < EPSILON);
    Self { config, layer }
  }
}

impl TsdfIntegrator for MergedTsdfIntegrator {
  fn integrate_point_cloud(&mut self, pose: &Transform, cloud: &PointCloud) {
    let start = Instant::now();

    let voxel_map = bundle_rays(self.layer.voxel_size_inv(), cloud);
    let mut filtered = PointCloud {
      width: cloud.width,
      height: cloud.height,
      points: Vec::with_capacity(voxel_map.len()),
      colors: Vec::with_capacity(voxel_map.len()),
    };
    for point_index in voxel_map.into_values() {
      filtered.points.push(cloud.points[point_index]);
      filtered.colors.push(cloud.colors[point_index]);
    }

    integrate_points_parallel(&self.config, &self.layer, pose, &filtered);
    debug!(
      points = cloud.len(),
      bundled = filtered.len(),
      elapsed_us = start.elapsed().as_micros() as u64,
      "integrated point cloud (merged)"
    );
  }

  fn layer(&self) -> &Arc<TsdfLayer> {
    &self.layer
  }
}

// =============================================================================
// Fast
// =============================================================================

/// Throughput-optimized integrator with per-scan approximate sets.
///
/// `start_approx_set` holds subsampled endpoint buckets already cast this
/// scan; `observed_approx_set` holds voxels any ray visited. Rays are cast
/// from the surface inward so the informative near-surface voxels are
/// updated before a ray is aborted for redundancy.
pub struct FastTsdfIntegrator {
  config: TsdfConfig,
  layer: Arc<TsdfLayer>,
  start_approx_set: DashSet<GridIndex>,
  observed_approx_set: DashSet<GridIndex>,
  integrated_frames: u32,
}

impl FastTsdfIntegrator {
  pub fn new(config: TsdfConfig, layer: Arc<TsdfLayer>) -> Self {
    debug_assert!((config.voxel_size - layer.voxel_size()).abs() < EPSILON);
    Self {
      config,
      layer,
      start_approx_set: DashSet::new(),
      observed_approx_set: DashSet::new(),
      integrated_frames: 0,
    }
  }

  fn integrate_point(&self, pose: &Transform, point: DVec3, color: Color) {
    let config = &self.config;
    let mut ray = Ray::default();
    if !validate_ray(&mut ray, point, config.min_range, config.max_range, config.allow_clearing) {
      return;
    }
    ray.origin = pose.translation;
    ray.point = pose.transform_point(point);

    // Skip the ray entirely when another ray already started in the same
    // subsampled endpoint bucket this scan.
    let start_index = geometry::grid_index_from_point(
      ray.point,
      config.start_voxel_subsampling_factor * self.layer.voxel_size_inv(),
    );
    if !self.start_approx_set.insert(start_index) {
      return;
    }

    let weight = if config.weight_constant {
      1.0
    } else {
      calculate_weight(point)
    };

    let caster = RayCaster::new(
      &ray,
      self.layer.voxel_size_inv(),
      config.truncation_distance,
      config.max_range,
      config.allow_carving,
      false,
    );
    let mut consecutive_ray_collisions = 0;
    for global_voxel_index in caster {
      if !self.observed_approx_set.insert(global_voxel_index) {
        consecutive_ray_collisions += 1;
        if consecutive_ray_collisions >= config.max_consecutive_ray_collisions {
          break;
        }
      } else {
        consecutive_ray_collisions = 0;
      }

      let (block, voxel) = self.layer.block_and_voxel_from_global_voxel_index(global_voxel_index);
      update_tsdf_voxel(config, ray.origin, ray.point, global_voxel_index, color, weight, &voxel);
      block.set_updated(true);
    }
  }
}

impl TsdfIntegrator for FastTsdfIntegrator {
  fn integrate_point_cloud(&mut self, pose: &Transform, cloud: &PointCloud) {
    let start = Instant::now();

    if self.integrated_frames % self.config.clear_checks_every_n_frames == 0 {
      self.start_approx_set.clear();
      self.observed_approx_set.clear();
    }
    self.integrated_frames = self.integrated_frames.wrapping_add(1);

    if cloud.is_empty() {
      return;
    }
    let chunk_size = cloud.len().div_ceil(self.config.threads.max(1));
    cloud
      .points
      .par_chunks(chunk_size)
      .zip(cloud.colors.par_chunks(chunk_size))
      .for_each(|(points, colors)| {
        for (point, color) in points.iter().zip(colors) {
          self.integrate_point(pose, *point, *color);
        }
      });

    debug!(
      points = cloud.len(),
      elapsed_us = start.elapsed().as_micros() as u64,
      "integrated point cloud (fast)"
    );
  }

  fn layer(&self) -> &Arc<TsdfLayer> {
    &self.layer
  }
}

#[cfg(test)]
#[path = "integrator_test.rs"]
mod integrator_test;
