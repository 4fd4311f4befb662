//! Geometry builders.
//!
//! Every builder is a pure function returning a [`MeshData`]: positions,
//! per-vertex RGBA colours and the three optional index lists the renderer
//! knows how to draw. Lighting is baked into the colours at build time.

pub mod import;
pub mod shading;
pub mod shapes;

pub use import::{build_imported, ImportedMesh};
pub use shapes::{beach_ball, cube, point_marker, pyramid, sphere, POINT_TESSELLATION};

use glam::Vec3;

pub type Rgb = [f32; 3];
pub type Rgba = [f32; 4];

pub const WHITE: Rgba = [1.0, 1.0, 1.0, 1.0];
pub const HOVER_TINT: Rgba = [1.0, 0.5, 0.0, 1.0];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vec3>,
    pub colors: Vec<Rgba>,
    pub triangles: Vec<u32>,
    pub quads: Vec<u32>,
    pub edges: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn bounds(&self) -> (Vec3, Vec3) {
        bounds_of(&self.vertices)
    }
}

/// Per-axis min/max over `vertices`; a unit box when there are none.
pub fn bounds_of(vertices: &[Vec3]) -> (Vec3, Vec3) {
    let mut iter = vertices.iter().copied().filter(|v| v.is_finite());
    let Some(first) = iter.next() else {
        return (Vec3::ZERO, Vec3::ONE);
    };
    iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)))
}

pub fn uniform_colors(count: usize, color: Rgba) -> Vec<Rgba> {
    vec![color; count]
}

pub fn with_alpha(rgb: Rgb, alpha: f32) -> Rgba {
    [rgb[0], rgb[1], rgb[2], alpha]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_default_to_unit_box() {
        assert_eq!(bounds_of(&[]), (Vec3::ZERO, Vec3::ONE));
    }

    #[test]
    fn bounds_are_componentwise_min_max() {
        let (lo, hi) = bounds_of(&[
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-1.0, 5.0, 0.5),
            Vec3::new(0.0, 0.0, 9.0),
        ]);
        assert_eq!(lo, Vec3::new(-1.0, -2.0, 0.5));
        assert_eq!(hi, Vec3::new(1.0, 5.0, 9.0));
    }

    #[test]
    fn bounds_ignore_non_finite_vertices() {
        let (lo, hi) = bounds_of(&[Vec3::new(f32::NAN, 0.0, 0.0), Vec3::splat(2.0)]);
        assert_eq!(lo, Vec3::splat(2.0));
        assert_eq!(hi, Vec3::splat(2.0));
    }
}
