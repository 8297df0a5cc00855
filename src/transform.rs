//! Rigid transforms between the sensor and layer frames.

use glam::{DQuat, DVec3};

/// Unit-quaternion rotation plus translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
  pub rotation: DQuat,
  pub translation: DVec3,
}

impl Transform {
  pub const IDENTITY: Transform = Transform {
    rotation: DQuat::IDENTITY,
    translation: DVec3::ZERO,
  };

  pub fn new(rotation: DQuat, translation: DVec3) -> Self {
    Self { rotation, translation }
  }

  /// Rotate then translate a point.
  #[inline]
  pub fn transform_point(&self, point: DVec3) -> DVec3 {
    self.rotation * point + self.translation
  }

  /// Inverse transform: `T⁻¹(T(p)) = p`.
  pub fn inverse(&self) -> Transform {
    let rotation = self.rotation.inverse();
    Transform {
      rotation,
      translation: -(rotation * self.translation),
    }
  }

  /// Apply a static offset: rotations compose, translations add.
  pub fn compose(&self, other: &Transform) -> Transform {
    Transform {
      rotation: self.rotation * other.rotation,
      translation: self.translation + other.translation,
    }
  }

  /// Interpolate between two transforms at `alpha` in `[0, 1]`:
  /// shortest-arc SLERP on rotation, linear on translation.
  pub fn interpolate(from: &Transform, to: &Transform, alpha: f64) -> Transform {
    Transform {
      rotation: from.rotation.slerp(to.rotation, alpha),
      translation: from.translation.lerp(to.translation, alpha),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trip() {
    let pose = Transform::new(
      DQuat::from_xyzw(0.0353406072, -0.0353406072, -0.706223071, 0.706223071),
      DVec3::new(0.0, 6.0, 2.0),
    );
    let point = DVec3::new(0.714538097, -2.8530097, -1.72378588);
    let there = pose.transform_point(point);
    let back = pose.inverse().transform_point(there);
    assert!((back - point).length() < 1e-6);
  }

  #[test]
  fn interpolate_endpoints() {
    let a = Transform::new(DQuat::from_rotation_z(0.3), DVec3::new(1.0, 2.0, 3.0));
    let b = Transform::new(DQuat::from_rotation_z(-0.8), DVec3::new(-4.0, 0.0, 1.0));

    let at_a = Transform::interpolate(&a, &b, 0.0);
    assert!((at_a.translation - a.translation).length() < 1e-12);
    assert!(at_a.rotation.dot(a.rotation).abs() > 1.0 - 1e-12);

    let at_b = Transform::interpolate(&a, &b, 1.0);
    assert!((at_b.translation - b.translation).length() < 1e-12);
    assert!(at_b.rotation.dot(b.rotation).abs() > 1.0 - 1e-12);

    let mid = Transform::interpolate(&a, &b, 0.5);
    assert!((mid.translation - DVec3::new(-1.5, 1.0, 2.0)).length() < 1e-12);
  }
}
