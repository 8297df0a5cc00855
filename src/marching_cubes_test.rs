use super::*;

fn unit_cube_coords() -> [DVec3; 8] {
  let mut coords = [DVec3::ZERO; 8];
  for (i, offset) in CUBE_INDEX_OFFSETS.iter().enumerate() {
    coords[i] = offset.as_dvec3();
  }
  coords
}

#[test]
fn vertex_configuration_from_signs() {
  assert_eq!(calculate_vertex_configuration(&[0.5; 8]), 0);
  assert_eq!(calculate_vertex_configuration(&[-0.5; 8]), 255);
  assert_eq!(
    calculate_vertex_configuration(&[-1.0, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1, 0.1]),
    1
  );
  assert_eq!(
    calculate_vertex_configuration(&[-1.0, -1.0, -1.0, -1.0, 0.1, 0.1, 0.1, 0.1]),
    15
  );
  // Zero counts as outside.
  assert_eq!(calculate_vertex_configuration(&[0.0; 8]), 0);
}

#[test]
fn uniform_sign_emits_nothing() {
  let coords = unit_cube_coords();
  let mut geometry = MeshGeometry::default();

  mesh_cube(&coords, &[0.5; 8], &mut geometry);
  assert!(geometry.vertices.is_empty());
  assert!(geometry.triangles.is_empty());

  mesh_cube(&coords, &[-0.5; 8], &mut geometry);
  assert!(geometry.vertices.is_empty());
  assert!(geometry.triangles.is_empty());
}

#[test]
fn single_inside_corner_emits_one_triangle() {
  let coords = unit_cube_coords();
  let mut geometry = MeshGeometry::default();

  let mut sdf = [0.5; 8];
  sdf[0] = -0.5;
  mesh_cube(&coords, &sdf, &mut geometry);

  assert_eq!(geometry.triangles.len(), 1);
  assert_eq!(geometry.vertices.len(), 3);
  // With equal magnitudes the crossings sit at the edge midpoints around
  // corner 0.
  for vertex in &geometry.vertices {
    assert!((vertex.length() - 0.5).abs() < 1e-12);
  }
}

#[test]
fn horizontal_plane_emits_quad() {
  let coords = unit_cube_coords();
  let mut geometry = MeshGeometry::default();

  // Bottom corners inside, top corners outside: surface crosses the four
  // vertical edges at z = 0.5.
  let sdf = [-0.5, -0.5, -0.5, -0.5, 0.5, 0.5, 0.5, 0.5];
  mesh_cube(&coords, &sdf, &mut geometry);

  assert_eq!(geometry.triangles.len(), 2);
  assert_eq!(geometry.vertices.len(), 4);
  for vertex in &geometry.vertices {
    assert!((vertex.z - 0.5).abs() < 1e-12);
  }
}

#[test]
fn shared_edges_share_vertices() {
  let coords = unit_cube_coords();
  let mut geometry = MeshGeometry::default();

  // Two inside corners on the bottom-back edge: one bent strip of
  // triangles, all sharing deduplicated vertices.
  let sdf = [-0.5, -0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5];
  mesh_cube(&coords, &sdf, &mut geometry);

  assert_eq!(geometry.triangles.len(), 2);
  assert_eq!(geometry.vertices.len(), 4);
}

#[test]
fn interpolation_tracks_sdf_ratio() {
  let coords = unit_cube_coords();
  let mut geometry = MeshGeometry::default();

  // Corner 0 barely inside: crossings sit close to corner 0.
  let mut sdf = [0.9; 8];
  sdf[0] = -0.1;
  mesh_cube(&coords, &sdf, &mut geometry);

  assert_eq!(geometry.triangles.len(), 1);
  for vertex in &geometry.vertices {
    assert!((vertex.length() - 0.1).abs() < 1e-12);
  }
}

#[test]
fn table_rows_are_triangle_lists_of_crossing_edges() {
  for (configuration, row) in TRIANGLE_TABLE.iter().enumerate() {
    let inside = |corner: usize| (configuration >> corner) & 1 == 1;

    let mut terminated = false;
    let mut count = 0;
    for entry in row {
      if *entry < 0 {
        terminated = true;
        continue;
      }
      assert!(!terminated, "config {configuration}: edge after terminator");
      assert!(*entry < 12, "config {configuration}: bad edge {entry}");
      let [a, b] = EDGE_INDEX_PAIRS[*entry as usize];
      assert_ne!(
        inside(a),
        inside(b),
        "config {configuration}: edge {entry} has no crossing"
      );
      count += 1;
    }
    assert_eq!(count % 3, 0, "config {configuration}: partial triangle");
    if configuration != 0 && configuration != 255 {
      assert!(count > 0, "config {configuration}: no triangles");
    }
  }
}
