//! A single TSDF cell.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::color::Color;
use crate::geometry::GridIndex;

/// Mutable state of a voxel, guarded by the per-voxel lock.
#[derive(Clone, Copy, Debug, Default)]
pub struct VoxelState {
  /// Truncated signed distance estimate.
  pub distance: f64,
  /// Accumulated observation weight.
  pub weight: f64,
  /// Accumulated color.
  pub color: Color,
}

/// One TSDF cell. The index is the voxel's local position inside its owning
/// block and never changes; distance, weight and color are fused under the
/// per-voxel lock, the finest synchronization point in the layer.
#[derive(Debug)]
pub struct TsdfVoxel {
  index: GridIndex,
  state: RwLock<VoxelState>,
}

impl TsdfVoxel {
  pub fn new(index: GridIndex) -> Self {
    Self {
      index,
      state: RwLock::new(VoxelState::default()),
    }
  }

  /// Local index within the owning block.
  #[inline]
  pub fn index(&self) -> GridIndex {
    self.index
  }

  pub fn distance(&self) -> f64 {
    self.state.read().distance
  }

  pub fn weight(&self) -> f64 {
    self.state.read().weight
  }

  pub fn color(&self) -> Color {
    self.state.read().color
  }

  /// Read-lock the voxel state.
  pub fn read(&self) -> RwLockReadGuard<'_, VoxelState> {
    self.state.read()
  }

  /// Write-lock the voxel state for a fusion update.
  pub fn write(&self) -> RwLockWriteGuard<'_, VoxelState> {
    self.state.write()
  }
}
