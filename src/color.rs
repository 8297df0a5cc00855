//! Voxel and vertex colors.

/// 8-bit RGBA color carried by voxels and mesh vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
  pub r: u8,
  pub g: u8,
  pub b: u8,
  pub a: u8,
}

impl Color {
  pub const WHITE: Color = Color::new(255, 255, 255);
  pub const RED: Color = Color::new(255, 0, 0);
  pub const BLACK: Color = Color::new(0, 0, 0);

  pub const fn new(r: u8, g: u8, b: u8) -> Self {
    Self { r, g, b, a: 255 }
  }

  /// Weighted per-channel average of two colors, truncated to 8 bits.
  ///
  /// A zero total weight returns `first` unchanged.
  pub fn blend(first: Color, first_weight: f64, second: Color, second_weight: f64) -> Color {
    let total = first_weight + second_weight;
    if total <= 0.0 {
      return first;
    }
    let channel = |a: u8, b: u8| ((a as f64 * first_weight + b as f64 * second_weight) / total) as u8;
    Color {
      r: channel(first.r, second.r),
      g: channel(first.g, second.g),
      b: channel(first.b, second.b),
      a: channel(first.a, second.a),
    }
  }

  /// Decode the packed RGB-in-float encoding used by XYZRGB point clouds:
  /// the low 24 bits of the f32 bit pattern are `0xRRGGBB`.
  pub fn from_packed_float(packed: f32) -> Color {
    let bits = packed.to_bits();
    Color::new((bits >> 16) as u8, (bits >> 8) as u8, bits as u8)
  }
}

impl Default for Color {
  fn default() -> Self {
    Color::BLACK
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blend_two_colors() {
    assert_eq!(
      Color::blend(Color::new(0, 0, 0), 0.0, Color::new(255, 255, 255), 1.0),
      Color::new(255, 255, 255)
    );
    assert_eq!(
      Color::blend(
        Color::new(255, 255, 255),
        0.500417829,
        Color::new(255, 255, 255),
        0.499582082,
      ),
      Color::new(255, 255, 255)
    );
  }

  #[test]
  fn blend_zero_weight_keeps_first() {
    let c = Color::new(12, 34, 56);
    assert_eq!(Color::blend(c, 0.0, Color::WHITE, 0.0), c);
  }

  #[test]
  fn unpack_rgb_float() {
    let color = Color::from_packed_float(-2.9685543604723502e+38);
    assert_eq!((color.r, color.g, color.b), (95, 84, 71));
  }
}
