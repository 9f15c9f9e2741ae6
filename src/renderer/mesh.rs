use std::path::PathBuf;

use glam::{Mat4, Quat, Vec3, Vec4};
use wgpu::util::DeviceExt;

use crate::renderer::camera::{ProjectionUpdate, ViewUpdate};
use crate::renderer::context::RenderContext;
use crate::renderer::light::LightState;
use crate::renderer::pose::Pose;
use crate::renderer::shader::{ShaderBinding, UniformKind, UniformLayout};
use crate::renderer::shadow::ShadowMap;
use crate::renderer::texture::Texture;
use crate::renderer::vertex::{VertexFields, VertexFormat, VertexRecord};

/// Anything the scene renderer can register, draw and keep in sync with the
/// camera and light.
pub trait SceneMesh {
    fn init(&mut self, context: &RenderContext, shadow: &ShadowMap);
    fn is_initialized(&self) -> bool;

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>);
    fn draw_shadows(&self, pass: &mut wgpu::RenderPass<'_>);

    fn set_pose(&mut self, pose: Pose);
    fn translate(&mut self, delta: Vec3);
    fn rotate(&mut self, rotation: Quat);
    fn rotate_around(&mut self, pivot: Vec3, rotation: Quat);

    fn set_view(&mut self, update: &ViewUpdate);
    fn set_projection(&mut self, update: &ProjectionUpdate);
    fn set_camera_position(&mut self, position: Vec3);
    fn set_light(&mut self, light: &LightState);
    fn set_debug_normals(&mut self, enabled: bool);
}

/// CPU-side mesh payload. Construction validates the one hard invariant:
/// every index refers to an existing vertex.
#[derive(Clone, Debug)]
pub struct MeshData {
    format: VertexFormat,
    floats: Vec<f32>,
    indices: Vec<u32>,
    texture: Option<PathBuf>,
}

impl MeshData {
    pub fn new(
        format: VertexFormat,
        vertices: &[VertexRecord],
        indices: Vec<u32>,
        texture: Option<PathBuf>,
    ) -> Result<Self, String> {
        let mut floats = Vec::with_capacity(vertices.len() * format.stride() as usize);
        for record in vertices {
            if record.format() != format {
                return Err("Vertex record format does not match mesh format".to_string());
            }
            floats.extend_from_slice(record.floats());
        }
        Self::from_floats(format, floats, indices, texture)
    }

    pub fn from_floats(
        format: VertexFormat,
        floats: Vec<f32>,
        indices: Vec<u32>,
        texture: Option<PathBuf>,
    ) -> Result<Self, String> {
        let stride = format.stride() as usize;
        if stride == 0 {
            return Err("Vertex format has no enabled fields".to_string());
        }
        if floats.len() % stride != 0 {
            return Err(format!(
                "Vertex data length {} is not a multiple of the stride {}",
                floats.len(),
                stride
            ));
        }
        let vertex_count = (floats.len() / stride) as u32;
        if let Some(&bad) = indices.iter().find(|&&i| i >= vertex_count) {
            return Err(format!(
                "Index {} out of range for {} vertices",
                bad, vertex_count
            ));
        }
        Ok(Self {
            format,
            floats,
            indices,
            texture,
        })
    }

    pub fn format(&self) -> VertexFormat {
        self.format
    }

    pub fn vertex_count(&self) -> u32 {
        (self.floats.len() / self.format.stride() as usize) as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Uniform block shared by the scene and shadow entry points of
/// `shader/scene.wgsl`; member order must match the WGSL struct.
fn mesh_uniform_layout() -> UniformLayout {
    UniformLayout::new()
        .with("model", UniformKind::Mat4)
        .with("view", UniformKind::Mat4)
        .with("projection", UniformKind::Mat4)
        .with("lightSpace", UniformKind::Mat4)
        .with("cameraPos", UniformKind::Vec4)
        .with("lightPos", UniformKind::Vec4)
        .with("lightDir", UniformKind::Vec4)
        .with("ambient", UniformKind::Vec4)
        .with("diffuse", UniformKind::Vec4)
        .with("specular", UniformKind::Vec4)
        .with("flags", UniformKind::Vec4)
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    _texture: Texture,
    texture_bind: wgpu::BindGroup,
    shadow_bind: wgpu::BindGroup,
    color_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
}

/// A textured, shadow-casting mesh. GPU buffers, pipelines and the uniform
/// block are created in `init`; dropping (or re-initializing) releases them
/// through RAII exactly once.
pub struct Mesh {
    data: MeshData,
    pose: Pose,
    show_normals: bool,
    shader_path: Option<PathBuf>,
    shader: Option<ShaderBinding>,
    gpu: Option<GpuMesh>,
}

impl Mesh {
    pub fn new(data: MeshData) -> Self {
        Self {
            data,
            pose: Pose::default(),
            show_normals: false,
            shader_path: None,
            shader: None,
            gpu: None,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    /// Loads the scene shader from this file on `init` instead of the
    /// built-in source. The file must declare the same uniform block and
    /// entry points; a failed read falls back to the built-in source.
    pub fn with_shader_path(mut self, path: PathBuf) -> Self {
        self.shader_path = Some(path);
        self
    }

    fn load_shader(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> ShaderBinding {
        if let Some(path) = &self.shader_path {
            match ShaderBinding::from_path(device, queue, "MeshShader", path, mesh_uniform_layout())
            {
                Ok(shader) => return shader,
                Err(err) => log::warn!("{err}; using the built-in scene shader"),
            }
        }
        ShaderBinding::new(
            device,
            queue,
            "MeshShader",
            include_str!("../shader/scene.wgsl"),
            mesh_uniform_layout(),
        )
    }

    fn push_pose(&mut self) {
        let matrix = self.pose.matrix();
        if let Some(shader) = &mut self.shader {
            shader.set_mat4("model", matrix);
            shader.flush();
        }
    }

    fn build_pipelines(
        &self,
        context: &RenderContext,
        shader: &ShaderBinding,
        shadow: &ShadowMap,
        texture_layout: &wgpu::BindGroupLayout,
    ) -> (wgpu::RenderPipeline, wgpu::RenderPipeline) {
        let device = context.device();
        let attributes = self.data.format.attributes();
        let vertex_layout = self.data.format.buffer_layout(&attributes);

        let color_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("MeshPipelineLayout"),
            bind_group_layouts: &[
                shader.bind_group_layout(),
                texture_layout,
                shadow.bind_group_layout(),
            ],
            push_constant_ranges: &[],
        });

        let color_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("MeshPipeline"),
            layout: Some(&color_layout),
            vertex: wgpu::VertexState {
                module: shader.module(),
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout.clone()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader.module(),
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: context.surface_format(),
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: RenderContext::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let shadow_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("MeshShadowPipelineLayout"),
            bind_group_layouts: &[shader.bind_group_layout()],
            push_constant_ranges: &[],
        });

        // Front-face culling during the depth pass trims self-shadowing
        // artifacts on closed meshes.
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("MeshShadowPipeline"),
            layout: Some(&shadow_layout),
            vertex: wgpu::VertexState {
                module: shader.module(),
                entry_point: Some("vs_shadow"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Front),
                front_face: wgpu::FrontFace::Ccw,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ShadowMap::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (color_pipeline, shadow_pipeline)
    }
}

impl SceneMesh for Mesh {
    fn init(&mut self, context: &RenderContext, shadow: &ShadowMap) {
        // Re-init releases the previous GPU objects before allocating anew.
        if self.gpu.take().is_some() {
            log::debug!("Re-initializing mesh, prior GPU resources released");
        }
        self.shader = None;

        let required =
            VertexFields::POSITION | VertexFields::NORMAL | VertexFields::TEXCOORD;
        if !self.data.format.fields().contains(required) {
            log::error!(
                "Mesh format {:?} lacks the position/normal/texcoord fields the scene shader consumes; mesh stays undrawable",
                self.data.format.fields()
            );
            return;
        }

        let device = context.device();
        let queue = context.queue();

        let texture = match &self.data.texture {
            Some(path) => match Texture::from_path(device, queue, path) {
                Ok(texture) => texture,
                Err(err) => {
                    log::error!("{err}; mesh stays undrawable");
                    return;
                }
            },
            None => Texture::solid(device, queue, [255, 255, 255, 255]),
        };

        let mut shader = self.load_shader(device, queue);
        shader.set_mat4("model", self.pose.matrix());
        shader.set_mat4("view", Mat4::IDENTITY);
        shader.set_mat4("projection", Mat4::IDENTITY);
        shader.set_mat4("lightSpace", Mat4::IDENTITY);
        shader.set_vec4(
            "flags",
            Vec4::new(self.show_normals as i32 as f32, 0.0, 0.0, 0.0),
        );
        shader.flush();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh.VertexBuffer"),
            contents: bytemuck::cast_slice(&self.data.floats),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh.IndexBuffer"),
            contents: bytemuck::cast_slice(&self.data.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let texture_layout = Texture::bind_group_layout(device);
        let texture_bind = texture.bind_group(device, &texture_layout);

        let (color_pipeline, shadow_pipeline) =
            self.build_pipelines(context, &shader, shadow, &texture_layout);

        self.gpu = Some(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: self.data.index_count(),
            _texture: texture,
            texture_bind,
            shadow_bind: shadow.bind_group().clone(),
            color_pipeline,
            shadow_pipeline,
        });
        self.shader = Some(shader);
    }

    fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    /// Pure read: records the indexed draw. Binding is re-established from
    /// scratch, so nothing leaks into the next mesh's draw.
    fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        let (Some(gpu), Some(shader)) = (&self.gpu, &self.shader) else {
            return;
        };
        pass.set_pipeline(&gpu.color_pipeline);
        pass.set_bind_group(0, shader.bind_group(), &[]);
        pass.set_bind_group(1, &gpu.texture_bind, &[]);
        pass.set_bind_group(2, &gpu.shadow_bind, &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..gpu.index_count, 0, 0..1);
    }

    fn draw_shadows(&self, pass: &mut wgpu::RenderPass<'_>) {
        let (Some(gpu), Some(shader)) = (&self.gpu, &self.shader) else {
            return;
        };
        pass.set_pipeline(&gpu.shadow_pipeline);
        pass.set_bind_group(0, shader.bind_group(), &[]);
        pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
        pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..gpu.index_count, 0, 0..1);
    }

    fn set_pose(&mut self, pose: Pose) {
        self.pose = pose;
        self.push_pose();
    }

    fn translate(&mut self, delta: Vec3) {
        self.pose.translate(delta);
        self.push_pose();
    }

    fn rotate(&mut self, rotation: Quat) {
        self.pose.rotate(rotation);
        self.push_pose();
    }

    fn rotate_around(&mut self, pivot: Vec3, rotation: Quat) {
        self.pose.rotate_around(pivot, rotation);
        self.push_pose();
    }

    fn set_view(&mut self, update: &ViewUpdate) {
        if let Some(shader) = &mut self.shader {
            shader.set_mat4("view", update.view);
            shader.flush();
        }
    }

    fn set_camera_position(&mut self, position: Vec3) {
        if let Some(shader) = &mut self.shader {
            shader.set_vec4("cameraPos", position.extend(1.0));
            shader.flush();
        }
    }

    fn set_projection(&mut self, update: &ProjectionUpdate) {
        if let Some(shader) = &mut self.shader {
            shader.set_mat4("projection", update.projection);
            shader.flush();
        }
    }

    fn set_light(&mut self, light: &LightState) {
        if let Some(shader) = &mut self.shader {
            shader.set_mat4("lightSpace", light.light_space);
            shader.set_vec4("lightPos", light.position.extend(1.0));
            shader.set_vec4("lightDir", light.direction.extend(0.0));
            shader.set_vec4("ambient", light.ambient.extend(1.0));
            shader.set_vec4("diffuse", light.diffuse.extend(1.0));
            shader.set_vec4("specular", light.specular.extend(1.0));
            shader.flush();
        }
    }

    fn set_debug_normals(&mut self, enabled: bool) {
        self.show_normals = enabled;
        if let Some(shader) = &mut self.shader {
            shader.set_vec4(
                "flags",
                Vec4::new(enabled as i32 as f32, 0.0, 0.0, 0.0),
            );
            shader.flush();
        }
    }
}
