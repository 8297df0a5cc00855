//! Side-channel disk writers.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::layer::TsdfLayer;
use crate::mesh::MeshLayer;

/// Write every non-empty mesh block as `"{i0}_{i1}_{i2}.obj"` under `folder`.
///
/// Vertices carry their color as `v x y z r g b` with channels scaled to
/// `[0, 1]`; faces use 1-based indexing.
pub fn write_mesh_layer_to_obj_files(layer: &MeshLayer, folder: impl AsRef<Path>) -> io::Result<()> {
  let folder = folder.as_ref();
  fs::create_dir_all(folder)?;

  for block in layer.blocks() {
    let geometry = block.geometry();
    if !geometry.has_data() {
      continue;
    }

    let path = folder.join(format!("{}.obj", block.index_string()));
    let mut file = BufWriter::new(File::create(path)?);

    for (i, vertex) in geometry.vertices.iter().enumerate() {
      let color = geometry.colors.get(i).copied().unwrap_or(crate::color::Color::WHITE);
      writeln!(
        file,
        "v {} {} {} {} {} {}",
        vertex.x,
        vertex.y,
        vertex.z,
        color.r as f64 / 255.0,
        color.g as f64 / 255.0,
        color.b as f64 / 255.0,
      )?;
    }
    for triangle in &geometry.triangles {
      writeln!(file, "f {} {} {}", triangle[0] + 1, triangle[1] + 1, triangle[2] + 1)?;
    }
    file.flush()?;
  }
  Ok(())
}

/// Dump the centers and colors of near-surface voxels, one
/// `x y z r g b` line each.
pub fn write_tsdf_layer_to_txt_file(layer: &TsdfLayer, path: impl AsRef<Path>) -> io::Result<()> {
  let mut file = BufWriter::new(File::create(path)?);
  for (center, color) in layer.voxel_centers_near_surface(2.0) {
    writeln!(
      file,
      "{} {} {} {} {} {}",
      center.x, center.y, center.z, color.r, color.g, color.b
    )?;
  }
  file.flush()
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use crate::color::Color;
  use crate::geometry::GridIndex;

  use super::*;

  #[test]
  fn obj_writer_emits_colored_vertices_and_faces() {
    let tsdf = TsdfLayer::new(0.1, 16);
    let mesh = MeshLayer::new(&tsdf);

    let block = mesh.get_block(GridIndex::new(0, 1, -1));
    {
      let mut geometry = block.geometry_mut();
      geometry.add_vertex(DVec3::new(0.0, 1.6, -1.6));
      geometry.add_vertex(DVec3::new(0.1, 1.6, -1.6));
      geometry.add_vertex(DVec3::new(0.0, 1.7, -1.6));
      geometry.triangles.push([0, 1, 2]);
      geometry.colors = vec![Color::new(255, 0, 0); 3];
    }
    // An empty block produces no file.
    mesh.get_block(GridIndex::ZERO);

    let dir = tempfile::tempdir().unwrap();
    write_mesh_layer_to_obj_files(&mesh, dir.path()).unwrap();

    let contents = fs::read_to_string(dir.path().join("0_1_-1.obj")).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "v 0 1.6 -1.6 1 0 0");
    assert_eq!(lines[3], "f 1 2 3");

    assert!(!dir.path().join("0_0_0.obj").exists());
  }

  #[test]
  fn txt_dump_lists_near_surface_voxels() {
    let layer = TsdfLayer::new(0.1, 16);
    let block = layer.get_block(GridIndex::ZERO);

    let near = block.get_voxel(GridIndex::new(1, 1, 1));
    {
      let mut state = near.write();
      state.distance = 0.05;
      state.weight = 5.0;
      state.color = Color::new(10, 20, 30);
    }
    // Far from the surface: excluded.
    let far = block.get_voxel(GridIndex::new(2, 2, 2));
    {
      let mut state = far.write();
      state.distance = 0.35;
      state.weight = 5.0;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("layer.txt");
    write_tsdf_layer_to_txt_file(&layer, &path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 1);

    let fields: Vec<f64> = lines[0].split(' ').map(|f| f.parse().unwrap()).collect();
    assert!((fields[0] - 0.15).abs() < 1e-12);
    assert!((fields[1] - 0.15).abs() < 1e-12);
    assert!((fields[2] - 0.15).abs() < 1e-12);
    assert_eq!(&fields[3..], &[10.0, 20.0, 30.0]);
  }
}
