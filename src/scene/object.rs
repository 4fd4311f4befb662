use super::collision::CollisionVolume;
use super::ids::ObjectId;
use super::mesh::Mesh;
use crate::geometry::{Rgb, Rgba};
use crate::records::VisualStyle;
use crate::render::pick::Ray;
use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Terrain,
    Detector,
    Event,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainAttrs {
    /// The source had no usable faces and a placeholder cube is shown instead.
    pub placeholder: bool,
    pub skipped_faces: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorAttrs {
    pub detector_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventAttrs {
    pub event_type: String,
    pub energy: f64,
    pub style: VisualStyle,
}

/// Kind-specific data, one variant per [`ObjectKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectAttrs {
    Terrain(TerrainAttrs),
    Detector(DetectorAttrs),
    Event(EventAttrs),
}

impl ObjectAttrs {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Terrain(_) => ObjectKind::Terrain,
            Self::Detector(_) => ObjectKind::Detector,
            Self::Event(_) => ObjectKind::Event,
        }
    }
}

/// `T(location) * Rz * Ry * Rx * S(scale) * T(-origin)`, rotation in radians.
pub fn compose_world_matrix(location: Vec3, rotation: Vec3, scale: Vec3, origin: Vec3) -> Mat4 {
    Mat4::from_translation(location)
        * Mat4::from_rotation_z(rotation.z)
        * Mat4::from_rotation_y(rotation.y)
        * Mat4::from_rotation_x(rotation.x)
        * Mat4::from_scale(scale)
        * Mat4::from_translation(-origin)
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    id: ObjectId,
    location: Vec3,
    rotation: Vec3,
    scale: Vec3,
    origin: Vec3,
    world: Mat4,
    attrs: ObjectAttrs,
    base_color: Rgb,
    opacity: f32,
    enabled: bool,
    hovered: bool,
    mesh: Mesh,
    collision: CollisionVolume,
}

impl SceneObject {
    /// Wraps `mesh`; the pivot is the centre of `collision`.
    pub fn new(
        id: ObjectId,
        mesh: Mesh,
        collision: CollisionVolume,
        attrs: ObjectAttrs,
        color: Rgba,
    ) -> Self {
        let origin = collision.center();
        let mut object = Self {
            id,
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            origin,
            world: Mat4::IDENTITY,
            attrs,
            base_color: [color[0], color[1], color[2]],
            opacity: color[3].clamp(0.0, 1.0),
            enabled: true,
            hovered: false,
            mesh,
            collision,
        };
        object.calculate_matrix();
        object
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.attrs.kind()
    }

    pub fn attrs(&self) -> &ObjectAttrs {
        &self.attrs
    }

    pub fn event(&self) -> Option<&EventAttrs> {
        match &self.attrs {
            ObjectAttrs::Event(event) => Some(event),
            _ => None,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(&self.attrs, ObjectAttrs::Terrain(terrain) if terrain.placeholder)
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn world_matrix(&self) -> &Mat4 {
        &self.world
    }

    /// World-space position of the pivot.
    pub fn pivot(&self) -> Vec3 {
        self.world.transform_point3(self.origin)
    }

    pub fn set_location(&mut self, location: Vec3) {
        self.location = location;
        self.calculate_matrix();
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.calculate_matrix();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.calculate_matrix();
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
        self.calculate_matrix();
    }

    pub fn calculate_matrix(&mut self) {
        self.world = compose_world_matrix(self.location, self.rotation, self.scale, self.origin);
    }

    pub fn base_color(&self) -> Rgb {
        self.base_color
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn rgba(&self) -> Rgba {
        [self.base_color[0], self.base_color[1], self.base_color[2], self.opacity]
    }

    pub(crate) fn set_color(&mut self, rgb: Rgb, opacity: f32) {
        self.base_color = rgb;
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.mesh.set_enabled(enabled);
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub(crate) fn on_hover(&mut self) {
        self.hovered = true;
        self.mesh.on_hover();
    }

    pub(crate) fn on_unhover(&mut self) {
        self.hovered = false;
        self.mesh.on_unhover();
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn mesh_mut(&mut self) -> &mut Mesh {
        &mut self.mesh
    }

    pub fn collision(&self) -> &CollisionVolume {
        &self.collision
    }

    pub fn collision_mut(&mut self) -> &mut CollisionVolume {
        &mut self.collision
    }

    pub fn is_pickable(&self) -> bool {
        self.enabled && self.mesh.is_enabled() && self.collision.enabled
    }

    pub fn ray_distance(&self, ray: &Ray) -> Option<f32> {
        self.collision
            .intersect(ray, &self.world, self.scale, self.origin)
    }
}
