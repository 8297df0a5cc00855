//! tsdf_fusion - real-time volumetric mapping from posed point clouds
//!
//! This crate fuses a stream of posed, colored point clouds into a Truncated
//! Signed Distance Field organized as a sparse two-level voxel grid, and
//! extracts a colored triangle mesh from that field with marching cubes.
//!
//! # Pipeline
//!
//! ```text
//! PointCloud ──▶ TsdfIntegrator ──▶ TsdfLayer ──▶ MeshIntegrator ──▶ MeshLayer
//!      ▲               ▲           (blocks of          (updated          │
//! TransformQueue ──────┘            voxels)             blocks)          ▼
//!                                                                 egress / OBJ
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tsdf_fusion::{
//!   Config, FastTsdfIntegrator, MeshIntegrator, MeshLayer, TsdfIntegrator, TsdfLayer,
//! };
//!
//! let config = Config::load("fusion.toml")?;
//! let layer = Arc::new(TsdfLayer::new(config.tsdf.voxel_size, config.tsdf.voxels_per_side));
//! let mut integrator = FastTsdfIntegrator::new(config.tsdf.clone(), Arc::clone(&layer));
//!
//! // Per sensor frame:
//! integrator.integrate_point_cloud(&pose, &cloud);
//!
//! let mesh_layer = Arc::new(MeshLayer::new(&layer));
//! let mesher = MeshIntegrator::new(config.mesh.clone(), layer, mesh_layer);
//! mesher.integrate_mesh();
//! ```

pub mod geometry;

pub mod color;
pub use color::Color;

pub mod transform;
pub use transform::Transform;

pub mod transform_queue;
pub use transform_queue::TransformQueue;

pub mod point_cloud;
pub use point_cloud::PointCloud;

pub mod config;
pub use config::{Config, ConfigError, MeshConfig, TsdfConfig};

// Sparse voxel store: voxels in blocks, blocks in a layer.
pub mod block;
pub mod layer;
pub mod voxel;
pub use block::TsdfBlock;
pub use layer::TsdfLayer;
pub use voxel::TsdfVoxel;

pub mod ray_caster;
pub use ray_caster::{Ray, RayCaster};

pub mod integrator;
pub use integrator::{
  FastTsdfIntegrator, MergedTsdfIntegrator, SimpleTsdfIntegrator, TsdfIntegrator,
};

// Meshing subsystem.
pub mod marching_cubes;
pub mod mesh;
pub mod mesh_integrator;
pub use mesh::{MeshBlock, MeshLayer};
pub use mesh_integrator::MeshIntegrator;

pub mod egress;
pub mod io;

pub mod simulation;

#[cfg(test)]
#[path = "fusion_test.rs"]
mod fusion_test;
