//! Binds seismic semantics to geometry: colour ramps, marker sizes and the
//! builders each object kind uses.

use super::collision::CollisionVolume;
use super::ids::{IdAllocator, ObjectId};
use super::mesh::{EdgePalette, Mesh};
use super::object::{DetectorAttrs, EventAttrs, ObjectAttrs, SceneObject, TerrainAttrs};
use super::SceneError;
use crate::config::MarkerConfig;
use crate::geometry::{
    beach_ball, build_imported, point_marker, pyramid, sphere, MeshData, Rgba, HOVER_TINT, WHITE,
};
use crate::records::{PolygonSoup, VisualStyle};
use glam::Vec3;

pub const DETECTOR_FACE: Rgba = [1.0, 0.0, 1.0, 0.1];
pub const DETECTOR_EDGE: Rgba = [0.5, 0.13, 0.13, 1.0];
pub const TERRAIN_FACE: Rgba = [0.3, 0.3, 0.3, 0.1];

const EDGE_PALETTE: EdgePalette = EdgePalette {
    edge: WHITE,
    hovered: HOVER_TINT,
    selected: HOVER_TINT,
};

/// Creates scene objects and hands out their ids.
#[derive(Debug)]
pub struct ObjectFactory {
    config: MarkerConfig,
    ids: IdAllocator,
}

impl ObjectFactory {
    pub fn new(config: MarkerConfig) -> Self {
        Self {
            config: config.normalized(),
            ids: IdAllocator::new(),
        }
    }

    pub fn config(&self) -> &MarkerConfig {
        &self.config
    }

    /// Id the next object will receive.
    pub fn next_id(&self) -> ObjectId {
        self.ids.peek()
    }

    /// Bucket colour for `energy` unless `override_color` is given.
    pub fn event_color(&self, energy: f64, override_color: Option<Rgba>) -> Rgba {
        override_color.unwrap_or_else(|| self.config.bucket_for(energy).rgba())
    }

    pub fn marker_scale(&self, event_type: &str, energy: f64, style: VisualStyle) -> f32 {
        match style {
            VisualStyle::Points => self.config.point_scale,
            VisualStyle::Spheres | VisualStyle::BeachBalls => {
                self.config.event_scale(event_type, energy)
            }
        }
    }

    pub fn event_geometry(&self, style: VisualStyle, color: Rgba) -> MeshData {
        let density = self.config.sphere_tessellation;
        match style {
            VisualStyle::Spheres => sphere(density, density, color),
            VisualStyle::BeachBalls => beach_ball(density, density, color),
            VisualStyle::Points => point_marker(self.config.point_tessellation, color),
        }
    }

    /// Shaded face colours for an event mesh of `style`.
    pub fn event_face_colors(&self, style: VisualStyle, color: Rgba) -> Vec<Rgba> {
        self.event_geometry(style, color).colors
    }

    pub fn event_marker(
        &mut self,
        location: Vec3,
        event_type: &str,
        energy: f64,
        style: VisualStyle,
        override_color: Option<Rgba>,
    ) -> Result<SceneObject, SceneError> {
        let color = self.event_color(energy, override_color);
        let attrs = EventAttrs {
            event_type: event_type.to_string(),
            energy,
            style,
        };
        let id = self.ids.allocate();
        self.build_event(id, location, attrs, color)
    }

    /// Recreates an event under its existing id, e.g. after a style change.
    pub fn rebuild_event(
        &self,
        id: ObjectId,
        location: Vec3,
        attrs: EventAttrs,
        color: Rgba,
    ) -> Result<SceneObject, SceneError> {
        self.build_event(id, location, attrs, color)
    }

    fn build_event(
        &self,
        id: ObjectId,
        location: Vec3,
        attrs: EventAttrs,
        color: Rgba,
    ) -> Result<SceneObject, SceneError> {
        let data = self.event_geometry(attrs.style, color);
        let scale = self.marker_scale(&attrs.event_type, attrs.energy, attrs.style);
        let (lo, hi) = data.bounds();
        let mut mesh = Mesh::new(data, EDGE_PALETTE)?;
        mesh.edges_enabled = false;

        let mut object = SceneObject::new(
            id,
            mesh,
            CollisionVolume::new(lo, hi),
            ObjectAttrs::Event(attrs),
            color,
        );
        object.set_scale(Vec3::splat(scale));
        object.set_location(location);
        Ok(object)
    }

    pub fn detector_marker(
        &mut self,
        detector_id: i64,
        location: Vec3,
    ) -> Result<SceneObject, SceneError> {
        let data = pyramid(DETECTOR_FACE);
        let (lo, hi) = data.bounds();
        let mesh = Mesh::new(
            data,
            EdgePalette {
                edge: DETECTOR_EDGE,
                ..EDGE_PALETTE
            },
        )?;
        let mut object = SceneObject::new(
            self.ids.allocate(),
            mesh,
            CollisionVolume::new(lo, hi),
            ObjectAttrs::Detector(DetectorAttrs { detector_id }),
            DETECTOR_FACE,
        );
        object.set_scale(Vec3::splat(self.config.detector_scale));
        object.set_location(location);
        Ok(object)
    }

    /// Terrain keeps its source coordinates: the pivot sits on the bounding
    /// box centre and the world matrix is the identity.
    pub fn terrain_object(&mut self, soup: &PolygonSoup) -> Result<SceneObject, SceneError> {
        let imported = build_imported(soup, TERRAIN_FACE);
        let (lo, hi) = imported.data.bounds();
        let mesh = Mesh::new(imported.data, EDGE_PALETTE)?;
        let collision = CollisionVolume::new(lo, hi);
        let center = collision.center();
        let mut object = SceneObject::new(
            self.ids.allocate(),
            mesh,
            collision,
            ObjectAttrs::Terrain(TerrainAttrs {
                placeholder: imported.placeholder,
                skipped_faces: imported.skipped_faces,
            }),
            TERRAIN_FACE,
        );
        object.set_location(center);
        Ok(object)
    }
}
