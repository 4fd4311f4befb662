//! Draw submission seam.
//!
//! The scene never talks to a graphics API directly. It uploads mesh buffers
//! once, then every frame submits pipeline changes and one [`DrawCall`] per
//! primitive list. Per-object opacity travels as a uniform alpha multiplier on
//! the draw call, so changing it never touches the colour buffers.

use crate::geometry::Rgba;
use crate::scene::ObjectId;
use glam::{Mat4, Vec3};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u32);

/// Borrowed view of everything a backend needs to upload for one mesh.
#[derive(Debug, Clone, Copy)]
pub struct MeshBuffers<'a> {
    pub positions: &'a [Vec3],
    pub face_colors: &'a [Rgba],
    pub edge_colors: &'a [Rgba],
    pub hovered_colors: &'a [Rgba],
    pub selected_colors: &'a [Rgba],
    pub triangles: &'a [u32],
    pub quads: &'a [u32],
    pub edges: &'a [u32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Quads,
    Lines,
}

/// Which uploaded colour buffer a draw reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSet {
    Faces,
    Edges,
    Hovered,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    Opaque,
    /// `src_alpha, one_minus_src_alpha`
    AlphaBlend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineState {
    pub blend: BlendMode,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl PipelineState {
    pub const OPAQUE: Self = Self {
        blend: BlendMode::Opaque,
        depth_test: true,
        depth_write: true,
    };

    pub const TRANSPARENT: Self = Self {
        blend: BlendMode::AlphaBlend,
        depth_test: true,
        depth_write: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub object: ObjectId,
    pub mesh: MeshHandle,
    pub topology: Topology,
    pub colors: ColorSet,
    pub index_count: u32,
    pub model: Mat4,
    /// Replaces the per-vertex alpha of the colour set.
    pub alpha: f32,
}

pub trait RenderBackend {
    fn upload(&mut self, buffers: &MeshBuffers<'_>) -> MeshHandle;

    /// Rewrites the face colour buffer in place. Returns `false` when the
    /// backend cannot do that and the caller has to recreate the mesh.
    fn update_face_colors(&mut self, mesh: MeshHandle, colors: &[Rgba]) -> bool;

    fn release(&mut self, mesh: MeshHandle);

    fn begin_frame(&mut self, uniforms: &FrameUniforms);

    fn set_pipeline(&mut self, state: PipelineState);

    fn submit(&mut self, draw: &DrawCall);

    fn end_frame(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Upload { mesh: MeshHandle, vertices: usize },
    UpdateFaceColors(MeshHandle),
    Release(MeshHandle),
    BeginFrame(FrameUniforms),
    SetPipeline(PipelineState),
    Draw(DrawCall),
    EndFrame,
}

/// Backend that records every command instead of issuing it, for running the
/// scene without a GPU.
#[derive(Debug)]
pub struct RecordingBackend {
    commands: Vec<RenderCommand>,
    live: HashSet<MeshHandle>,
    next_handle: u32,
    in_place_updates: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            live: HashSet::new(),
            next_handle: 0,
            in_place_updates: true,
        }
    }

    /// A backend whose colour buffers are immutable after upload.
    pub fn without_in_place_updates() -> Self {
        Self {
            in_place_updates: false,
            ..Self::new()
        }
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawCall> {
        self.commands.iter().filter_map(|command| match command {
            RenderCommand::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn live_meshes(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, mesh: MeshHandle) -> bool {
        self.live.contains(&mesh)
    }
}

impl RenderBackend for RecordingBackend {
    fn upload(&mut self, buffers: &MeshBuffers<'_>) -> MeshHandle {
        let mesh = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(mesh);
        self.commands.push(RenderCommand::Upload {
            mesh,
            vertices: buffers.positions.len(),
        });
        mesh
    }

    fn update_face_colors(&mut self, mesh: MeshHandle, _colors: &[Rgba]) -> bool {
        if !self.in_place_updates || !self.live.contains(&mesh) {
            return false;
        }
        self.commands.push(RenderCommand::UpdateFaceColors(mesh));
        true
    }

    fn release(&mut self, mesh: MeshHandle) {
        if self.live.remove(&mesh) {
            self.commands.push(RenderCommand::Release(mesh));
        }
    }

    fn begin_frame(&mut self, uniforms: &FrameUniforms) {
        self.commands.push(RenderCommand::BeginFrame(*uniforms));
    }

    fn set_pipeline(&mut self, state: PipelineState) {
        self.commands.push(RenderCommand::SetPipeline(state));
    }

    fn submit(&mut self, draw: &DrawCall) {
        self.commands.push(RenderCommand::Draw(*draw));
    }

    fn end_frame(&mut self) {
        self.commands.push(RenderCommand::EndFrame);
    }
}
