//! Merges a CAD polygon soup into one indexed mesh.

use super::{cube, uniform_colors, MeshData, Rgba};
use crate::records::{PolygonFace, PolygonSoup};
use glam::Vec3;

const MIN_FACE_AREA: f32 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedMesh {
    pub data: MeshData,
    /// Set when nothing usable was found and the placeholder cube was substituted.
    pub placeholder: bool,
    pub skipped_faces: usize,
}

/// Builds terrain geometry from `soup`, swapping source Y/Z so the file's
/// "up" becomes the renderer's Y axis. Malformed faces are skipped; an empty
/// result becomes the placeholder cube.
pub fn build_imported(soup: &PolygonSoup, color: Rgba) -> ImportedMesh {
    let mut data = MeshData::default();
    let mut skipped_faces = 0;

    for (index, face) in soup.faces.iter().enumerate() {
        let Some(points) = face_points(face) else {
            log::warn!(
                "Skipping face {} with {} vertices (expected 3 or 4 finite, non-degenerate)",
                index,
                face.vertices.len()
            );
            skipped_faces += 1;
            continue;
        };

        let offset = data.vertices.len() as u32;
        let n = points.len() as u32;
        if n == 3 {
            data.triangles.extend_from_slice(&[offset, offset + 1, offset + 2]);
        } else {
            data.quads
                .extend_from_slice(&[offset, offset + 1, offset + 2, offset + 3]);
        }
        for k in 0..n {
            data.edges.push(offset + k);
            data.edges.push(offset + (k + 1) % n);
        }
        data.vertices.extend(points);
    }

    if data.is_empty() {
        log::warn!(
            "Imported geometry has no usable faces ({} skipped); substituting placeholder cube",
            skipped_faces
        );
        return ImportedMesh {
            data: cube(color),
            placeholder: true,
            skipped_faces,
        };
    }

    data.colors = uniform_colors(data.vertices.len(), color);
    log::debug!(
        "Imported geometry: {} vertices, {} triangles, {} quads, {} skipped faces",
        data.vertices.len(),
        data.triangles.len() / 3,
        data.quads.len() / 4,
        skipped_faces
    );
    ImportedMesh {
        data,
        placeholder: false,
        skipped_faces,
    }
}

fn face_points(face: &PolygonFace) -> Option<Vec<Vec3>> {
    if !matches!(face.vertices.len(), 3 | 4) {
        return None;
    }
    let points: Vec<Vec3> = face
        .vertices
        .iter()
        .map(|p| Vec3::new(p[0] as f32, p[2] as f32, p[1] as f32))
        .collect();
    if !points.iter().all(|p| p.is_finite()) {
        return None;
    }
    // Fan area; quads stored as triangles (last vertex repeated) still pass.
    let area: f32 = (1..points.len() - 1)
        .map(|k| (points[k] - points[0]).cross(points[k + 1] - points[0]).length())
        .sum();
    if area <= MIN_FACE_AREA {
        return None;
    }
    Some(points)
}
