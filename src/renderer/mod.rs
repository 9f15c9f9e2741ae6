pub mod camera;
pub mod context;
pub mod light;
pub mod mesh;
pub mod pose;
pub mod primitives;
pub mod registry;
pub mod scene_renderer;
pub mod shader;
pub mod shadow;
pub mod texture;
pub mod vertex;

pub use camera::Camera;
pub use context::RenderContext;
pub use light::Light;
pub use mesh::{Mesh, MeshData, SceneMesh};
pub use pose::Pose;
pub use registry::{MeshHandle, MeshRegistry};
pub use scene_renderer::SceneRenderer;
pub use shadow::ShadowMap;
pub use vertex::{VertexFields, VertexFormat, VertexRecord};
