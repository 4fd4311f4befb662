use super::SceneError;
use crate::geometry::{uniform_colors, MeshData, Rgba};
use crate::render::backend::{ColorSet, MeshBuffers, MeshHandle};
use glam::Vec3;

/// Colour variants uploaded next to the face colours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePalette {
    pub edge: Rgba,
    pub hovered: Rgba,
    pub selected: Rgba,
}

/// Geometry and colour buffers of one scene object plus its draw toggles.
///
/// Positions and indices are fixed after construction. Hovering only
/// switches which edge colour buffer is active.
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: Vec<Vec3>,
    face_colors: Vec<Rgba>,
    edge_colors: Vec<Rgba>,
    hovered_colors: Vec<Rgba>,
    selected_colors: Vec<Rgba>,
    triangles: Vec<u32>,
    quads: Vec<u32>,
    edges: Vec<u32>,
    active_edges: ColorSet,
    pub faces_enabled: bool,
    pub edges_enabled: bool,
    enabled: bool,
    handle: Option<MeshHandle>,
}

impl Mesh {
    pub fn new(data: MeshData, palette: EdgePalette) -> Result<Self, SceneError> {
        let vertex_count = data.vertices.len();
        if vertex_count == 0 {
            return Err(SceneError::EmptyMesh);
        }
        for &index in data.triangles.iter().chain(&data.quads).chain(&data.edges) {
            if index as usize >= vertex_count {
                return Err(SceneError::IndexOutOfRange {
                    index,
                    vertex_count,
                });
            }
        }

        let mut face_colors = data.colors;
        face_colors.resize(vertex_count, palette.edge);

        Ok(Self {
            edge_colors: uniform_colors(vertex_count, palette.edge),
            hovered_colors: uniform_colors(vertex_count, palette.hovered),
            selected_colors: uniform_colors(vertex_count, palette.selected),
            positions: data.vertices,
            face_colors,
            triangles: data.triangles,
            quads: data.quads,
            edges: data.edges,
            active_edges: ColorSet::Edges,
            faces_enabled: true,
            edges_enabled: true,
            enabled: true,
            handle: None,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn face_colors(&self) -> &[Rgba] {
        &self.face_colors
    }

    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    pub fn quads(&self) -> &[u32] {
        &self.quads
    }

    pub fn edges(&self) -> &[u32] {
        &self.edges
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn on_hover(&mut self) {
        self.active_edges = ColorSet::Hovered;
    }

    pub fn on_unhover(&mut self) {
        self.active_edges = ColorSet::Edges;
    }

    /// Edge colour buffer drawn right now.
    pub fn active_edge_set(&self) -> ColorSet {
        self.active_edges
    }

    pub fn active_edge_colors(&self) -> &[Rgba] {
        match self.active_edges {
            ColorSet::Hovered => &self.hovered_colors,
            ColorSet::Selected => &self.selected_colors,
            _ => &self.edge_colors,
        }
    }

    pub(crate) fn replace_face_colors(&mut self, colors: Vec<Rgba>) {
        debug_assert_eq!(colors.len(), self.positions.len());
        self.face_colors = colors;
    }

    pub fn handle(&self) -> Option<MeshHandle> {
        self.handle
    }

    pub(crate) fn set_handle(&mut self, handle: Option<MeshHandle>) {
        self.handle = handle;
    }

    pub fn buffers(&self) -> MeshBuffers<'_> {
        MeshBuffers {
            positions: &self.positions,
            face_colors: &self.face_colors,
            edge_colors: &self.edge_colors,
            hovered_colors: &self.hovered_colors,
            selected_colors: &self.selected_colors,
            triangles: &self.triangles,
            quads: &self.quads,
            edges: &self.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{cube, HOVER_TINT, WHITE};

    fn palette() -> EdgePalette {
        EdgePalette {
            edge: WHITE,
            hovered: HOVER_TINT,
            selected: HOVER_TINT,
        }
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let mut data = cube(WHITE);
        data.edges.push(8);
        match Mesh::new(data, palette()) {
            Err(SceneError::IndexOutOfRange {
                index,
                vertex_count,
            }) => {
                assert_eq!(index, 8);
                assert_eq!(vertex_count, 8);
            }
            other => panic!("Expected IndexOutOfRange, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn rejects_empty_geometry() {
        let result = Mesh::new(MeshData::default(), palette());
        assert!(matches!(result, Err(SceneError::EmptyMesh)));
    }

    #[test]
    fn hover_swaps_active_edge_buffer() {
        let mut mesh = Mesh::new(cube([0.2, 0.2, 0.2, 1.0]), palette()).unwrap();
        assert_eq!(mesh.active_edge_set(), ColorSet::Edges);
        assert_eq!(mesh.active_edge_colors()[0], WHITE);

        mesh.on_hover();
        assert_eq!(mesh.active_edge_set(), ColorSet::Hovered);
        assert_eq!(mesh.active_edge_colors()[0], HOVER_TINT);
        assert_eq!(mesh.active_edge_colors().len(), mesh.vertex_count());

        mesh.on_unhover();
        assert_eq!(mesh.active_edge_colors()[0], WHITE);
    }

    #[test]
    fn defaults_draw_faces_and_edges() {
        let mesh = Mesh::new(cube(WHITE), palette()).unwrap();
        assert!(mesh.faces_enabled);
        assert!(mesh.edges_enabled);
        assert!(mesh.is_enabled());
        assert!(mesh.handle().is_none());
        let buffers = mesh.buffers();
        assert_eq!(buffers.positions.len(), 8);
        assert_eq!(buffers.quads.len(), 24);
    }

    #[test]
    fn missing_face_colours_are_padded() {
        let mut data = cube(WHITE);
        data.colors.truncate(2);
        let mesh = Mesh::new(data, palette()).unwrap();
        assert_eq!(mesh.face_colors().len(), 8);
    }
}
