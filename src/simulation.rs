//! Synthetic depth-camera scenes for tests and benchmarks.
//!
//! A handful of analytic objects are ray-traced through a pinhole camera
//! model to produce the colored point clouds the integrators consume. The
//! canonical scene is a cylinder standing on a ground plane, orbited by the
//! sensor.

use std::f64::consts::PI;

use glam::{DQuat, DVec2, DVec3};

use crate::color::Color;
use crate::geometry::EPSILON;
use crate::point_cloud::PointCloud;
use crate::transform::Transform;

/// An analytic object that sensor rays can hit.
pub trait SimulatedObject: Send + Sync {
  /// Closest intersection of a unit-direction ray within `max_distance`,
  /// as `(point, distance)`.
  fn ray_intersection(
    &self,
    ray_origin: DVec3,
    ray_direction: DVec3,
    max_distance: f64,
  ) -> Option<(DVec3, f64)>;

  fn color(&self) -> Color;
}

/// Upright cylinder with end caps, centered at `center`.
pub struct Cylinder {
  pub center: DVec3,
  pub radius: f64,
  pub height: f64,
  pub color: Color,
}

impl SimulatedObject for Cylinder {
  fn ray_intersection(
    &self,
    ray_origin: DVec3,
    ray_direction: DVec3,
    max_distance: f64,
  ) -> Option<(DVec3, f64)> {
    let vector_e = ray_origin - self.center;
    let vector_d = ray_direction;

    // Quadratic in the xy plane for the side wall.
    let a = vector_d.x * vector_d.x + vector_d.y * vector_d.y;
    let b = 2.0 * vector_e.x * vector_d.x + 2.0 * vector_e.y * vector_d.y;
    let c = vector_e.x * vector_e.x + vector_e.y * vector_e.y - self.radius * self.radius;

    let under_sqrt = b * b - 4.0 * a * c;
    if under_sqrt < 0.0 {
      return None;
    }

    let (t1, t2) = if under_sqrt <= EPSILON {
      (-b / (2.0 * a), -1.0)
    } else {
      ((-b + under_sqrt.sqrt()) / (2.0 * a), (-b - under_sqrt.sqrt()) / (2.0 * a))
    };

    let half_height = self.height / 2.0;
    let z1 = vector_e.z + t1 * vector_d.z;
    let z2 = vector_e.z + t2 * vector_d.z;
    let t1_valid = t1 >= 0.0 && z1 >= -half_height && z1 <= half_height;
    let t2_valid = t2 >= 0.0 && z2 >= -half_height && z2 <= half_height;

    // End caps.
    let mut t3_valid = false;
    let mut t4_valid = false;
    let mut t3 = 0.0;
    let mut t4 = 0.0;
    if vector_d.z.abs() > EPSILON {
      t3 = (-half_height - vector_e.z) / vector_d.z;
      t4 = (half_height - vector_e.z) / vector_d.z;
      let q3 = vector_e + vector_d * t3;
      let q4 = vector_e + vector_d * t4;
      t3_valid = t3 >= 0.0 && DVec2::new(q3.x, q3.y).length() < self.radius;
      t4_valid = t4 >= 0.0 && DVec2::new(q4.x, q4.y).length() < self.radius;
    }

    if !(t1_valid || t2_valid || t3_valid || t4_valid) {
      return None;
    }

    let mut t = max_distance;
    if t1_valid {
      t = t.min(t1);
    }
    if t2_valid {
      t = t.min(t2);
    }
    if t3_valid {
      t = t.min(t3);
    }
    if t4_valid {
      t = t.min(t4);
    }
    if t >= max_distance {
      return None;
    }

    Some((ray_origin + ray_direction * t, t))
  }

  fn color(&self) -> Color {
    self.color
  }
}

/// Infinite plane through `center` with the given normal.
pub struct Plane {
  pub center: DVec3,
  pub normal: DVec3,
  pub color: Color,
}

impl SimulatedObject for Plane {
  fn ray_intersection(
    &self,
    ray_origin: DVec3,
    ray_direction: DVec3,
    max_distance: f64,
  ) -> Option<(DVec3, f64)> {
    let normal = self.normal.normalize();
    let denominator = ray_direction.dot(normal);
    if denominator.abs() < EPSILON {
      return None;
    }
    let t = (self.center - ray_origin).dot(normal) / denominator;
    if t < 0.0 || t >= max_distance {
      return None;
    }
    Some((ray_origin + ray_direction * t, t))
  }

  fn color(&self) -> Color {
    self.color
  }
}

/// A bounded world of analytic objects observed by a depth camera.
pub struct SimulationWorld {
  pub voxel_size: f64,
  pub min_bound: DVec3,
  pub max_bound: DVec3,
  objects: Vec<Box<dyn SimulatedObject>>,
}

impl SimulationWorld {
  pub fn new(voxel_size: f64, min_bound: DVec3, max_bound: DVec3) -> Self {
    Self {
      voxel_size,
      min_bound,
      max_bound,
      objects: Vec::new(),
    }
  }

  pub fn add_object(&mut self, object: Box<dyn SimulatedObject>) {
    self.objects.push(object);
  }

  /// Ray-trace a depth frame from an explicit viewpoint.
  ///
  /// `resolution` is the pixel grid; the focal length follows from the
  /// horizontal field of view (degrees). Points are returned in the world
  /// frame; pixels that hit nothing produce no point.
  pub fn point_cloud_from_viewpoint(
    &self,
    view_origin: DVec3,
    view_direction: DVec3,
    resolution: DVec2,
    fov_horizontal_degrees: f64,
    max_distance: f64,
  ) -> PointCloud {
    let fov_rad = fov_horizontal_degrees * PI / 180.0;
    let focal_length = resolution.x / (2.0 * (fov_rad / 2.0).tan());
    let rotation = DQuat::from_rotation_arc(DVec3::X, view_direction.normalize());

    let mut points = Vec::new();
    let mut colors = Vec::new();

    let half_width = resolution.x / 2.0;
    let half_height = resolution.y / 2.0;
    let mut u = -half_width;
    while u < half_width {
      let mut v = -half_height;
      while v < half_height {
        let camera_direction =
          DVec3::new(1.0, u / focal_length, v / focal_length).normalize();
        let direction = rotation * camera_direction;

        let mut closest: Option<(DVec3, f64, Color)> = None;
        for object in &self.objects {
          if let Some((point, distance)) =
            object.ray_intersection(view_origin, direction, max_distance)
          {
            if closest.is_none_or(|(_, best, _)| distance < best) {
              closest = Some((point, distance, object.color()));
            }
          }
        }
        if let Some((point, _, color)) = closest {
          points.push(point);
          colors.push(color);
        }

        v += 1.0;
      }
      u += 1.0;
    }

    PointCloud {
      width: resolution.x as usize,
      height: resolution.y as usize,
      points,
      colors,
    }
  }

  /// Ray-trace a depth frame from a sensor pose, looking along the pose's
  /// +x axis.
  pub fn point_cloud_from_transform(
    &self,
    pose: &Transform,
    resolution: DVec2,
    fov_horizontal_degrees: f64,
    max_distance: f64,
  ) -> PointCloud {
    let view_direction = pose.rotation * DVec3::X;
    self.point_cloud_from_viewpoint(
      pose.translation,
      view_direction,
      resolution,
      fov_horizontal_degrees,
      max_distance,
    )
  }
}

/// Sensor poses orbiting `center` at the given radius and height, each
/// pitched slightly down and yawed to face the center.
pub fn orbit_poses(count: usize, center: DVec3, radius: f64, height: f64) -> Vec<Transform> {
  let angle_increment = 2.0 * PI / count as f64;
  let mut poses = Vec::with_capacity(count);
  for i in 0..count {
    let angle = angle_increment * i as f64;
    let position = DVec3::new(radius * angle.sin(), radius * angle.cos(), height);
    let facing_direction = center - position;

    let mut desired_yaw = -PI / 2.0;
    if facing_direction.x > 1e-4 || facing_direction.y > 1e-4 {
      desired_yaw = facing_direction.y.atan2(facing_direction.x);
    }

    let rotation = DQuat::from_rotation_y(-0.1) * DQuat::from_rotation_z(desired_yaw);
    poses.push(Transform::new(rotation, position));
  }
  poses
}

#[cfg(test)]
#[path = "simulation_test.rs"]
mod simulation_test;
