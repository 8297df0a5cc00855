//! Mesh egress: per-block binary geometry records.
//!
//! Consumers receive one record per dirty mesh block over a channel and the
//! block's buffers are cleared after the send, so each record carries the
//! geometry exactly once and the next mesh pass rebuilds from scratch.
//!
//! Blob layout, little-endian:
//!
//! ```text
//! u32 vertex_count
//! u32 triangle_count
//! vertex_count  × (f32, f32, f32)   positions
//! triangle_count × (u16, u16, u16)  indices
//! vertex_count  × (u8, u8, u8)      colors
//! ```

use crossbeam_channel::Sender;
use tracing::warn;

use crate::color::Color;
use crate::mesh::{MeshGeometry, MeshLayer};

/// One streamed mesh block.
#[derive(Clone, Debug)]
pub struct MeshBlockRecord {
  /// Block index formatted as `"{i0}_{i1}_{i2}"`.
  pub index: String,
  /// Binary mesh container, see the module docs for the layout.
  pub bytes: Vec<u8>,
}

/// Serialize one block's geometry into the binary mesh container.
pub fn encode_mesh_geometry(geometry: &MeshGeometry) -> Vec<u8> {
  let vertex_count = geometry.vertices.len();
  let triangle_count = geometry.triangles.len();
  debug_assert!(vertex_count <= u16::MAX as usize + 1);

  let mut bytes = Vec::with_capacity(8 + vertex_count * 15 + triangle_count * 6);
  bytes.extend_from_slice(&(vertex_count as u32).to_le_bytes());
  bytes.extend_from_slice(&(triangle_count as u32).to_le_bytes());

  for vertex in &geometry.vertices {
    bytes.extend_from_slice(&(vertex.x as f32).to_le_bytes());
    bytes.extend_from_slice(&(vertex.y as f32).to_le_bytes());
    bytes.extend_from_slice(&(vertex.z as f32).to_le_bytes());
  }
  for triangle in &geometry.triangles {
    for index in triangle {
      bytes.extend_from_slice(&(*index as u16).to_le_bytes());
    }
  }
  for i in 0..vertex_count {
    let color = geometry.colors.get(i).copied().unwrap_or(Color::WHITE);
    bytes.extend_from_slice(&[color.r, color.g, color.b]);
  }

  bytes
}

/// Send every dirty mesh block as a record, clearing each block after its
/// send. Returns the number of records sent.
///
/// A send failure means the consumer went away: the stream is aborted with a
/// warning and the remaining blocks keep their geometry for the next
/// attempt.
pub fn stream_mesh_blocks(layer: &MeshLayer, sender: &Sender<MeshBlockRecord>) -> usize {
  let mut sent = 0;
  for block in layer.blocks() {
    let record = {
      let geometry = block.geometry();
      if !geometry.has_data() {
        continue;
      }
      MeshBlockRecord {
        index: block.index_string(),
        bytes: encode_mesh_geometry(&geometry),
      }
    };
    if let Err(err) = sender.send(record) {
      warn!("mesh egress aborted: {err}");
      return sent;
    }
    block.clear();
    sent += 1;
  }
  sent
}

#[cfg(test)]
mod tests {
  use glam::DVec3;

  use crate::geometry::GridIndex;
  use crate::layer::TsdfLayer;

  use super::*;

  fn layer_with_one_triangle() -> MeshLayer {
    let tsdf = TsdfLayer::new(0.1, 16);
    let mesh = MeshLayer::new(&tsdf);
    let block = mesh.get_block(GridIndex::new(0, 1, -1));
    let mut geometry = block.geometry_mut();
    geometry.add_vertex(DVec3::new(0.0, 0.0, 0.0));
    geometry.add_vertex(DVec3::new(1.0, 0.0, 0.0));
    geometry.add_vertex(DVec3::new(0.0, 1.0, 0.5));
    geometry.triangles.push([0, 1, 2]);
    geometry.colors = vec![Color::RED; 3];
    drop(geometry);
    mesh
  }

  #[test]
  fn encode_layout() {
    let mesh = layer_with_one_triangle();
    let block = mesh.get_block(GridIndex::new(0, 1, -1));
    let bytes = encode_mesh_geometry(&block.geometry());

    // Counts.
    assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 3);
    assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 1);
    // 8-byte header + 3 positions + 3 indices + 3 colors.
    assert_eq!(bytes.len(), 8 + 3 * 12 + 6 + 9);

    // Second vertex x component.
    let x = f32::from_le_bytes(bytes[20..24].try_into().unwrap());
    assert_eq!(x, 1.0);
    // Indices follow the positions.
    let indices_at = 8 + 3 * 12;
    assert_eq!(
      u16::from_le_bytes(bytes[indices_at + 4..indices_at + 6].try_into().unwrap()),
      2
    );
    // Colors trail the blob.
    assert_eq!(&bytes[bytes.len() - 3..], &[255, 0, 0]);
  }

  #[test]
  fn stream_sends_and_clears() {
    let mesh = layer_with_one_triangle();
    let (tx, rx) = crossbeam_channel::unbounded();

    assert_eq!(stream_mesh_blocks(&mesh, &tx), 1);
    let record = rx.try_recv().unwrap();
    assert_eq!(record.index, "0_1_-1");
    assert!(!record.bytes.is_empty());

    // The block was cleared: nothing left to stream.
    assert!(!mesh.get_block(GridIndex::new(0, 1, -1)).has_data());
    assert_eq!(stream_mesh_blocks(&mesh, &tx), 0);
  }

  #[test]
  fn stream_aborts_when_receiver_is_gone() {
    let mesh = layer_with_one_triangle();
    let (tx, rx) = crossbeam_channel::unbounded();
    drop(rx);

    assert_eq!(stream_mesh_blocks(&mesh, &tx), 0);
    // The failed block keeps its geometry for the next attempt.
    assert!(mesh.get_block(GridIndex::new(0, 1, -1)).has_data());
  }
}
