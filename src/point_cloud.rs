//! Point-cloud ingress value object.

use glam::DVec3;

use crate::color::Color;
use crate::transform::Transform;

/// Ordered sequence of sensor-frame points with parallel colors.
///
/// `width`/`height` carry the organized-scan shape when the source provides
/// one; the fusion core does not depend on them.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
  pub width: usize,
  pub height: usize,
  pub points: Vec<DVec3>,
  pub colors: Vec<Color>,
}

impl PointCloud {
  /// Build a cloud without color information; colors default to opaque white.
  pub fn from_points(points: Vec<DVec3>) -> Self {
    let colors = vec![Color::WHITE; points.len()];
    Self {
      width: 0,
      height: 0,
      points,
      colors,
    }
  }

  pub fn with_colors(points: Vec<DVec3>, colors: Vec<Color>) -> Self {
    debug_assert_eq!(points.len(), colors.len());
    Self {
      width: 0,
      height: 0,
      points,
      colors,
    }
  }

  /// Decode an organized little-endian XYZRGB point buffer: f32 x/y/z at
  /// offsets 0/4/8 and the packed RGB float at offset 16 of each point
  /// record. Rows with a NaN coordinate or color are dropped.
  pub fn from_xyzrgb_le_bytes(
    data: &[u8],
    width: usize,
    height: usize,
    point_step: usize,
    row_step: usize,
  ) -> PointCloud {
    const RGB_OFFSET: usize = 16;

    let mut points = Vec::with_capacity(width * height);
    let mut colors = Vec::with_capacity(width * height);

    for v in 0..height {
      let mut offset = v * row_step;
      for _ in 0..width {
        if offset + RGB_OFFSET + 4 > data.len() {
          break;
        }
        let x = read_f32_le(&data[offset..]);
        let y = read_f32_le(&data[offset + 4..]);
        let z = read_f32_le(&data[offset + 8..]);
        let rgb = read_f32_le(&data[offset + RGB_OFFSET..]);

        if !x.is_nan() && !y.is_nan() && !z.is_nan() && !rgb.is_nan() {
          points.push(DVec3::new(x as f64, y as f64, z as f64));
          colors.push(Color::from_packed_float(rgb));
        }
        offset += point_step;
      }
    }

    PointCloud {
      width,
      height,
      points,
      colors,
    }
  }

  pub fn len(&self) -> usize {
    self.points.len()
  }

  pub fn is_empty(&self) -> bool {
    self.points.is_empty()
  }

  /// Drop rows with a non-finite coordinate, keeping colors parallel.
  pub fn retain_finite(&mut self) {
    let mut keep = self.points.iter().map(|p| p.is_finite());
    self.colors.retain(|_| keep.next().unwrap_or(false));
    self.points.retain(|p| p.is_finite());
  }

  /// The same cloud with every point transformed.
  pub fn transformed(&self, transform: &Transform) -> PointCloud {
    PointCloud {
      width: self.width,
      height: self.height,
      points: self.points.iter().map(|p| transform.transform_point(*p)).collect(),
      colors: self.colors.clone(),
    }
  }
}

fn read_f32_le(data: &[u8]) -> f32 {
  let mut bytes = [0u8; 4];
  bytes.copy_from_slice(&data[..4]);
  f32::from_le_bytes(bytes)
}
