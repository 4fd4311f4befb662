pub mod backend;
pub mod camera;
pub mod gpu;
pub mod pick;

pub use backend::{
    BlendMode, ColorSet, DrawCall, FrameUniforms, MeshBuffers, MeshHandle, PipelineState,
    RecordingBackend, RenderBackend, RenderCommand, Topology,
};
pub use camera::{OrbitCamera, PITCH_MAX, PITCH_MIN};
pub use gpu::{GpuBackend, GpuError};
pub use pick::{camera_basis, screen_to_ray, ClosestHit, PickHit, Ray};
