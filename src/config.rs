//! Integrator and mesher configuration.
//!
//! Loaded from a TOML file with one flat table of options; every field falls
//! back to the shipped default when absent. Validation failures name the
//! offending field so a bad deployment config is caught at load time rather
//! than as silent misbehavior.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid value for `{field}`: {reason}")]
  Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
  ConfigError::Invalid {
    field,
    reason: reason.into(),
  }
}

/// TSDF layer and integrator options.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TsdfConfig {
  /// Edge length of a single voxel in meters.
  pub voxel_size: f64,
  /// Voxels per block edge.
  pub voxels_per_side: i32,
  /// Rays shorter than this are dropped.
  pub min_range: f64,
  /// Rays longer than this are clearing rays (or truncated, see
  /// `allow_clearing`).
  pub max_range: f64,
  /// Symmetric SDF clamp. `<= 0` means "derive as 4 × voxel_size".
  #[serde(default = "unset_truncation_distance")]
  pub truncation_distance: f64,
  /// Cast rays from the sensor origin forward, carving observed free space.
  pub allow_carving: bool,
  /// Treat over-range rays as clearing rays.
  pub allow_clearing: bool,
  /// Upper bound on accumulated voxel weight.
  pub max_weight: f64,
  /// Weigh every observation 1.0 instead of 1/z².
  pub weight_constant: bool,
  /// Linearly attenuate weight behind the measured surface.
  pub weight_dropoff: bool,
  /// Resolution multiplier for the fast integrator's start set. Must be ≥ 1.
  pub start_voxel_subsampling_factor: f64,
  /// Reset period (in integrated clouds) for the fast integrator's sets.
  pub clear_checks_every_n_frames: u32,
  /// Consecutive already-observed voxels before the fast integrator drops a
  /// ray.
  pub max_consecutive_ray_collisions: u32,
  /// Worker count for point-cloud and mesh parallelism.
  pub threads: usize,
}

impl Default for TsdfConfig {
  fn default() -> Self {
    Self {
      voxel_size: 0.1,
      voxels_per_side: 16,
      min_range: 0.1,
      max_range: 5.0,
      truncation_distance: 0.1 * 4.0,
      allow_carving: true,
      allow_clearing: true,
      max_weight: 10_000.0,
      weight_constant: false,
      weight_dropoff: false,
      start_voxel_subsampling_factor: 2.0,
      clear_checks_every_n_frames: 1,
      max_consecutive_ray_collisions: 2,
      threads: default_threads(),
    }
  }
}

fn default_threads() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn unset_truncation_distance() -> f64 {
  0.0
}

impl TsdfConfig {
  /// Fill derived defaults: an unset truncation distance becomes
  /// `4 × voxel_size`.
  pub fn apply_defaults(&mut self) {
    if self.truncation_distance <= 0.0 {
      self.truncation_distance = self.voxel_size * 4.0;
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(self.voxel_size > 0.0) {
      return Err(invalid("voxel_size", format!("must be > 0, got {}", self.voxel_size)));
    }
    if self.voxels_per_side <= 0 {
      return Err(invalid(
        "voxels_per_side",
        format!("must be > 0, got {}", self.voxels_per_side),
      ));
    }
    if self.min_range > self.max_range {
      return Err(invalid(
        "min_range",
        format!("must be <= max_range, got {} > {}", self.min_range, self.max_range),
      ));
    }
    if self.start_voxel_subsampling_factor < 1.0 {
      return Err(invalid(
        "start_voxel_subsampling_factor",
        format!("must be >= 1.0, got {}", self.start_voxel_subsampling_factor),
      ));
    }
    if self.clear_checks_every_n_frames == 0 {
      return Err(invalid("clear_checks_every_n_frames", "must be > 0"));
    }
    if self.threads == 0 {
      return Err(invalid("threads", "must be > 0"));
    }
    Ok(())
  }
}

/// Mesh extraction options.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
  /// Sample voxel colors onto mesh vertices.
  pub use_color: bool,
  /// Minimum voxel weight for a cube corner to take part in meshing.
  pub min_weight: f64,
}

impl Default for MeshConfig {
  fn default() -> Self {
    Self {
      use_color: true,
      min_weight: 2.0,
    }
  }
}

/// Combined configuration as read from one flat options table.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
  #[serde(flatten)]
  pub tsdf: TsdfConfig,
  #[serde(flatten)]
  pub mesh: MeshConfig,
}

impl Config {
  /// Parse a TOML options table, fill derived defaults and validate.
  pub fn from_toml_str(text: &str) -> Result<Config, ConfigError> {
    let mut config: Config = toml::from_str(text)?;
    config.tsdf.apply_defaults();
    config.tsdf.validate()?;
    Ok(config)
  }

  /// Load from a config file on disk.
  pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    Self::from_toml_str(&std::fs::read_to_string(path)?)
  }
}
