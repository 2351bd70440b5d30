pub mod camera;
pub mod gpu_context;
pub mod mesh;
pub mod pipeline;
pub mod renderer;
pub mod scene;
pub mod vertex;

pub use camera::{Camera3D, CameraUniform};
pub use gpu_context::GpuContext;
pub use mesh::{Bounds, Geometry};
pub use pipeline::MeshPipeline;
pub use renderer::{FrameSink, OverlayPass, Renderer};
pub use scene::{GeometryId, Lighting, Material, MaterialId, MeshId, MeshNode, SceneGraph, Transform};
pub use vertex::{InstanceRaw, MeshVertex};
