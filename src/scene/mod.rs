pub mod collision;
pub mod factory;
pub mod ids;
pub mod mesh;
pub mod object;
pub mod sources;

pub use collision::CollisionVolume;
pub use factory::ObjectFactory;
pub use ids::{IdAllocator, ObjectId};
pub use mesh::{EdgePalette, Mesh};
pub use object::{
    compose_world_matrix, DetectorAttrs, EventAttrs, ObjectAttrs, ObjectKind, SceneObject,
    TerrainAttrs,
};
pub use sources::{SourceProperties, SourceRegistry};

use crate::config::ViewerConfig;
use crate::geometry::{uniform_colors, Rgb, Rgba};
use crate::records::{PolygonSoup, VisualStyle};
use crate::render::backend::{
    ColorSet, DrawCall, FrameUniforms, PipelineState, RenderBackend, Topology,
};
use crate::render::camera::OrbitCamera;
use crate::render::pick::{screen_to_ray, ClosestHit};
use glam::Vec3;
use std::collections::BTreeMap;

/// Objects at or above this opacity are drawn in the opaque pass.
pub const OPAQUE_THRESHOLD: f32 = 0.99;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("mesh has no vertices")]
    EmptyMesh,
    #[error("no object with id {0}")]
    MissingObject(ObjectId),
    #[error("object {0} is not an event")]
    NotAnEvent(ObjectId),
    #[error("id {0} already belongs to a live object")]
    DuplicateId(ObjectId),
}

/// What one call to [`Scene::draw`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub opaque: Vec<ObjectId>,
    /// In submission order, farthest first.
    pub transparent: Vec<ObjectId>,
    pub draw_calls: usize,
}

/// Every live object, the orbit camera and hover state, drawn through `B`.
pub struct Scene<B: RenderBackend> {
    objects: BTreeMap<ObjectId, SceneObject>,
    camera: OrbitCamera,
    hovered: Option<ObjectId>,
    view_target: Option<ObjectId>,
    target: Vec3,
    eye: Vec3,
    factory: ObjectFactory,
    backend: B,
}

impl<B: RenderBackend> Scene<B> {
    pub fn new(backend: B, config: &ViewerConfig) -> Self {
        let camera = OrbitCamera::new(config.camera.clone());
        let eye = camera.eye(Vec3::ZERO);
        Self {
            objects: BTreeMap::new(),
            camera,
            hovered: None,
            view_target: None,
            target: Vec3::ZERO,
            eye,
            factory: ObjectFactory::new(config.markers.clone()),
            backend,
        }
    }

    /// Uploads the object's mesh and inserts it. Ids already in the scene are
    /// refused. The first terrain object becomes the view target.
    pub fn add_object(&mut self, object: SceneObject) -> Result<ObjectId, SceneError> {
        let id = object.id();
        if self.objects.contains_key(&id) {
            log::warn!("Refusing object {}: id already in use", id);
            return Err(SceneError::DuplicateId(id));
        }
        Ok(self.insert_object(object))
    }

    /// Inserts `object`, releasing whatever was stored under its id.
    fn insert_object(&mut self, mut object: SceneObject) -> ObjectId {
        let id = object.id();
        if let Some(previous) = self.objects.remove(&id) {
            self.release(&previous);
            if self.hovered == Some(id) {
                self.hovered = None;
            }
        }

        let handle = self.backend.upload(&object.mesh().buffers());
        object.mesh_mut().set_handle(Some(handle));
        if self.view_target.is_none() && object.kind() == ObjectKind::Terrain {
            self.view_target = Some(id);
        }
        log::debug!(
            "Added {:?} {} ({} vertices)",
            object.kind(),
            id,
            object.mesh().vertex_count()
        );
        self.objects.insert(id, object);
        id
    }

    /// Releases the object's GPU resources and forgets it. Unknown ids are ignored.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.remove(&id) else {
            log::trace!("remove_object: {} not present", id);
            return false;
        };
        self.release(&object);
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.view_target == Some(id) {
            self.view_target = None;
        }
        log::debug!("Removed {:?} {}", object.kind(), id);
        true
    }

    pub fn set_enabled(&mut self, id: ObjectId, enabled: bool) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        object.set_enabled(enabled);
        if !enabled && self.hovered == Some(id) {
            object.on_unhover();
            self.hovered = None;
        }
        true
    }

    pub fn spawn_event(
        &mut self,
        location: Vec3,
        event_type: &str,
        energy: f64,
        style: VisualStyle,
        override_color: Option<Rgba>,
    ) -> Result<ObjectId, SceneError> {
        let object = self
            .factory
            .event_marker(location, event_type, energy, style, override_color)?;
        self.add_object(object)
    }

    pub fn spawn_detector(
        &mut self,
        detector_id: i64,
        location: Vec3,
    ) -> Result<ObjectId, SceneError> {
        let object = self.factory.detector_marker(detector_id, location)?;
        self.add_object(object)
    }

    pub fn spawn_terrain(&mut self, soup: &PolygonSoup) -> Result<ObjectId, SceneError> {
        let object = self.factory.terrain_object(soup)?;
        self.add_object(object)
    }

    /// Draws one frame: opaque objects first, then transparent ones back to front.
    pub fn draw(&mut self, viewport_width: f32, viewport_height: f32) -> FrameReport {
        if let Some(target) = self.target_point() {
            self.target = target;
            self.eye = self.camera.eye(target);
        }
        let eye = self.eye;

        let mut report = FrameReport::default();
        for object in self.objects.values() {
            let mesh = object.mesh();
            if !object.is_enabled() || !mesh.is_enabled() || mesh.handle().is_none() {
                continue;
            }
            if object.opacity() >= OPAQUE_THRESHOLD {
                report.opaque.push(object.id());
            } else {
                report.transparent.push(object.id());
            }
        }

        // Stable sort keeps creation order for equal distances.
        let mut transparent: Vec<(ObjectId, f32)> = report
            .transparent
            .iter()
            .filter_map(|id| self.objects.get(id))
            .map(|object| (object.id(), eye.distance(object.pivot())))
            .collect();
        transparent.sort_by(|a, b| b.1.total_cmp(&a.1));
        report.transparent = transparent.into_iter().map(|(id, _)| id).collect();

        let uniforms = FrameUniforms {
            view: self.camera.view_matrix(eye, self.target),
            projection: self.camera.projection_matrix(viewport_width / viewport_height),
            camera_position: eye,
        };
        self.backend.begin_frame(&uniforms);

        self.backend.set_pipeline(PipelineState::OPAQUE);
        for id in &report.opaque {
            if let Some(object) = self.objects.get(id) {
                report.draw_calls += submit_object(&mut self.backend, object);
            }
        }

        self.backend.set_pipeline(PipelineState::TRANSPARENT);
        for id in &report.transparent {
            if let Some(object) = self.objects.get(id) {
                report.draw_calls += submit_object(&mut self.backend, object);
            }
        }

        self.backend.set_pipeline(PipelineState::OPAQUE);
        self.backend.end_frame();
        report
    }

    /// Casts a ray through the pixel and hovers the closest hit. Does
    /// nothing without a view target.
    pub fn pick_at(
        &mut self,
        screen_x: f32,
        screen_y: f32,
        viewport_width: f32,
        viewport_height: f32,
    ) -> Option<ObjectId> {
        let target = self.target_point()?;
        let eye = self.camera.eye(target);
        let view = self.camera.view_matrix(eye, target);
        let projection = self
            .camera
            .projection_matrix(viewport_width / viewport_height);

        let picked = screen_to_ray(
            screen_x,
            screen_y,
            viewport_width,
            viewport_height,
            view,
            projection,
        )
        .and_then(|ray| {
            let mut closest = ClosestHit::default();
            for object in self.objects.values().filter(|object| object.is_pickable()) {
                if let Some(distance) = object.ray_distance(&ray) {
                    closest.offer(object.id(), distance);
                }
            }
            closest.into_hit().map(|hit| hit.id)
        });

        self.set_hovered(picked);
        picked
    }

    fn set_hovered(&mut self, picked: Option<ObjectId>) {
        if picked == self.hovered {
            return;
        }
        if let Some(object) = self.hovered.and_then(|id| self.objects.get_mut(&id)) {
            object.on_unhover();
        }
        if let Some(object) = picked.and_then(|id| self.objects.get_mut(&id)) {
            object.on_hover();
        }
        self.hovered = picked;
    }

    /// Changes colour and opacity without touching geometry. Opacity is a
    /// draw-time uniform; only an RGB change rewrites the face colours.
    pub fn retint(&mut self, id: ObjectId, rgb: Rgb, opacity: f32) -> bool {
        let Some(object) = self.objects.get_mut(&id) else {
            log::trace!("retint: {} not present", id);
            return false;
        };
        let rgb_changed = object.base_color() != rgb;
        object.set_color(rgb, opacity);
        if !rgb_changed {
            return true;
        }

        let rgba = object.rgba();
        let colors = match object.event() {
            Some(event) => self.factory.event_face_colors(event.style, rgba),
            None => uniform_colors(object.mesh().vertex_count(), rgba),
        };
        object.mesh_mut().replace_face_colors(colors);
        let updated = match object.mesh().handle() {
            Some(handle) => self
                .backend
                .update_face_colors(handle, object.mesh().face_colors()),
            None => false,
        };
        if updated {
            return true;
        }

        log::info!("Backend cannot recolour {} in place; recreating it", id);
        self.recreate(id)
    }

    fn recreate(&mut self, id: ObjectId) -> bool {
        let Some(object) = self.objects.get(&id) else {
            return false;
        };
        if let Some(event) = object.event() {
            let rebuilt = self.factory.rebuild_event(
                id,
                object.location(),
                event.clone(),
                object.rgba(),
            );
            return match rebuilt {
                Ok(rebuilt) => {
                    self.replace_object(rebuilt);
                    true
                }
                Err(err) => {
                    log::warn!("Failed to recreate {}: {}", id, err);
                    false
                }
            };
        }

        let Some(object) = self.objects.get_mut(&id) else {
            return false;
        };
        if let Some(handle) = object.mesh().handle() {
            self.backend.release(handle);
        }
        let handle = self.backend.upload(&object.mesh().buffers());
        object.mesh_mut().set_handle(Some(handle));
        true
    }

    /// Recreates an event with another visual style under the same id,
    /// keeping its colour, opacity, visibility and hover state.
    pub fn rebuild(&mut self, id: ObjectId, style: VisualStyle) -> Result<(), SceneError> {
        let object = self.objects.get(&id).ok_or(SceneError::MissingObject(id))?;
        let event = object.event().ok_or(SceneError::NotAnEvent(id))?;
        let attrs = EventAttrs {
            style,
            ..event.clone()
        };
        let rebuilt = self
            .factory
            .rebuild_event(id, object.location(), attrs, object.rgba())?;
        self.replace_object(rebuilt);
        Ok(())
    }

    fn replace_object(&mut self, mut object: SceneObject) {
        let id = object.id();
        let (enabled, hovered) = match self.objects.get(&id) {
            Some(previous) => (previous.is_enabled(), previous.is_hovered()),
            None => (true, false),
        };
        object.set_enabled(enabled);
        self.insert_object(object);
        if hovered {
            self.set_hovered(Some(id));
        }
    }

    fn release(&mut self, object: &SceneObject) {
        if let Some(handle) = object.mesh().handle() {
            self.backend.release(handle);
        }
    }

    fn target_point(&self) -> Option<Vec3> {
        self.view_target
            .and_then(|id| self.objects.get(&id))
            .map(SceneObject::pivot)
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn hovered(&self) -> Option<ObjectId> {
        self.hovered
    }

    pub fn view_target(&self) -> Option<ObjectId> {
        self.view_target
    }

    /// Points the camera at `id`; ignored for unknown ids.
    pub fn set_view_target(&mut self, id: ObjectId) -> bool {
        if !self.objects.contains_key(&id) {
            return false;
        }
        self.view_target = Some(id);
        true
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn factory(&self) -> &ObjectFactory {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut ObjectFactory {
        &mut self.factory
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Face lists then edges for one object. Returns the number of draw calls.
fn submit_object<B: RenderBackend>(backend: &mut B, object: &SceneObject) -> usize {
    let mesh = object.mesh();
    let Some(handle) = mesh.handle() else {
        return 0;
    };
    let model = *object.world_matrix();
    let mut submitted = 0;

    if mesh.faces_enabled {
        for (topology, indices) in [
            (Topology::Triangles, mesh.triangles()),
            (Topology::Quads, mesh.quads()),
        ] {
            if indices.is_empty() {
                continue;
            }
            backend.submit(&DrawCall {
                object: object.id(),
                mesh: handle,
                topology,
                colors: ColorSet::Faces,
                index_count: indices.len() as u32,
                model,
                alpha: object.opacity(),
            });
            submitted += 1;
        }
    }

    if mesh.edges_enabled && object.kind() != ObjectKind::Event && !mesh.edges().is_empty() {
        backend.submit(&DrawCall {
            object: object.id(),
            mesh: handle,
            topology: Topology::Lines,
            colors: mesh.active_edge_set(),
            index_count: mesh.edges().len() as u32,
            model,
            alpha: 1.0,
        });
        submitted += 1;
    }
    submitted
}
