//! Voxel-exact ray traversal.
//!
//! The caster walks the integer voxel grid between two scaled endpoints with
//! the Amanatides–Woo DDA, adapted to signed indices. Iteration yields every
//! voxel whose cell the ray pierces, in order from start to end.

use glam::DVec3;

use crate::geometry::{self, GridIndex};

/// A sensor ray: world-space origin and return point.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ray {
  pub origin: DVec3,
  pub point: DVec3,
  pub length: f64,
  pub clearing: bool,
}

/// Validate a sensor-frame return against the range window.
///
/// Zero points and returns shorter than `min_length` are dropped. Returns
/// longer than `max_length` stay valid; with `allow_clearing` they become
/// clearing rays, otherwise they are truncated naturally during ray setup.
pub fn validate_ray(
  ray: &mut Ray,
  point: DVec3,
  min_length: f64,
  max_length: f64,
  allow_clearing: bool,
) -> bool {
  ray.clearing = false;
  // Faster than checking the ray length for 0,0,0 points.
  if point.x == 0.0 && point.y == 0.0 && point.z == 0.0 {
    return false;
  }
  ray.length = point.length();
  if ray.length < min_length {
    return false;
  }
  if ray.length > max_length && allow_clearing {
    ray.clearing = true;
  }
  true
}

/// Integer-grid DDA over the voxels pierced by a ray.
pub struct RayCaster {
  length_in_steps: u32,
  step_signs: GridIndex,
  current_index: GridIndex,
  end_index: GridIndex,
  current_step: u32,
  t_to_next_boundary: DVec3,
  t_step_size: DVec3,
  start_scaled: DVec3,
  end_scaled: DVec3,
}

impl RayCaster {
  /// Build a caster for a validated ray.
  ///
  /// Clearing rays stop `truncation_distance` short of the return, capped at
  /// `max_range`. Non-clearing rays overshoot the return by
  /// `truncation_distance`. Without carving, the walk is restricted to the
  /// near-surface band. `cast_from_origin = false` swaps the endpoints so the
  /// walk runs from the surface inward.
  pub fn new(
    ray: &Ray,
    voxel_size_inv: f64,
    truncation_distance: f64,
    max_range: f64,
    allow_carving: bool,
    cast_from_origin: bool,
  ) -> Self {
    let unit_ray = (ray.point - ray.origin).normalize();

    let (ray_start, ray_end) = if ray.clearing {
      let length = (ray.point - ray.origin).length();
      let length = (length - truncation_distance).clamp(0.0, max_range);
      let end = ray.origin + unit_ray * length;
      let start = if allow_carving { ray.origin } else { end };
      (start, end)
    } else {
      let end = ray.point + unit_ray * truncation_distance;
      let start = if allow_carving {
        ray.origin
      } else {
        // A 1 m step back from the hit bounds the near-surface band.
        ray.point - unit_ray
      };
      (start, end)
    };

    let start_scaled = ray_start * voxel_size_inv;
    let end_scaled = ray_end * voxel_size_inv;

    if cast_from_origin {
      Self::from_scaled_endpoints(start_scaled, end_scaled)
    } else {
      Self::from_scaled_endpoints(end_scaled, start_scaled)
    }
  }

  /// Set up the DDA between two endpoints already scaled by the inverse
  /// voxel size.
  pub fn from_scaled_endpoints(start_scaled: DVec3, end_scaled: DVec3) -> Self {
    let current_index = geometry::grid_index_from_scaled_point(start_scaled);
    let end_index = geometry::grid_index_from_scaled_point(end_scaled);
    let diff_index = end_index - current_index;
    let length_in_steps =
      (diff_index.x.abs() + diff_index.y.abs() + diff_index.z.abs()) as u32;

    let ray_scaled = end_scaled - start_scaled;
    let step_signs = GridIndex::new(
      geometry::sgn(ray_scaled.x),
      geometry::sgn(ray_scaled.y),
      geometry::sgn(ray_scaled.z),
    );

    let corrected_step = step_signs.max(GridIndex::ZERO).as_dvec3();
    let start_scaled_shifted = start_scaled - current_index.as_dvec3();
    let distance_to_boundaries = corrected_step - start_scaled_shifted;

    // Axes the ray never crosses get +inf so the min-coefficient selection
    // cannot pick them.
    let safe_div = |numerator: f64, denominator: f64| {
      if denominator == 0.0 {
        f64::INFINITY
      } else {
        numerator / denominator
      }
    };
    let t_to_next_boundary = DVec3::new(
      safe_div(distance_to_boundaries.x, ray_scaled.x),
      safe_div(distance_to_boundaries.y, ray_scaled.y),
      safe_div(distance_to_boundaries.z, ray_scaled.z),
    );
    let t_step_size = DVec3::new(
      safe_div(step_signs.x as f64, ray_scaled.x),
      safe_div(step_signs.y as f64, ray_scaled.y),
      safe_div(step_signs.z as f64, ray_scaled.z),
    );

    Self {
      length_in_steps,
      step_signs,
      current_index,
      end_index,
      current_step: 0,
      t_to_next_boundary,
      t_step_size,
      start_scaled,
      end_scaled,
    }
  }

  /// The walk visits `length_in_steps + 1` voxels in total.
  #[inline]
  pub fn length_in_steps(&self) -> u32 {
    self.length_in_steps
  }

  #[inline]
  pub fn step_signs(&self) -> GridIndex {
    self.step_signs
  }

  #[inline]
  pub fn start_scaled(&self) -> DVec3 {
    self.start_scaled
  }

  #[inline]
  pub fn end_scaled(&self) -> DVec3 {
    self.end_scaled
  }

  #[inline]
  pub fn end_index(&self) -> GridIndex {
    self.end_index
  }

  /// Index of the smallest component of `t_to_next_boundary`.
  fn min_t_axis(&self) -> usize {
    let t = self.t_to_next_boundary;
    let mut min = f64::INFINITY;
    let mut axis = 0;
    for k in 0..3 {
      if t[k] < min {
        min = t[k];
        axis = k;
      }
    }
    axis
  }
}

impl Iterator for RayCaster {
  type Item = GridIndex;

  fn next(&mut self) -> Option<GridIndex> {
    if self.current_step > self.length_in_steps {
      return None;
    }
    self.current_step += 1;

    let result = self.current_index;
    let axis = self.min_t_axis();
    self.current_index[axis] += self.step_signs[axis];
    self.t_to_next_boundary[axis] += self.t_step_size[axis];
    Some(result)
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let remaining = (self.length_in_steps + 1 - self.current_step) as usize;
    (remaining, Some(remaining))
  }
}

#[cfg(test)]
#[path = "ray_caster_test.rs"]
mod ray_caster_test;
