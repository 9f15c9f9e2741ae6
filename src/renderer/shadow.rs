use crate::renderer::context::RenderContext;

/// Depth-only render target for the directional light, plus the comparison
/// bind group every scene pipeline samples it through and a small debug
/// pipeline that blits the raw depth to the screen.
pub struct ShadowMap {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    debug_pipeline: wgpu::RenderPipeline,
    debug_layout: wgpu::BindGroupLayout,
    debug_sampler: wgpu::Sampler,
    debug_bind_group: wgpu::BindGroup,
    size: u32,
}

impl ShadowMap {
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
    pub const DEFAULT_SIZE: u32 = 1024;

    pub fn new(device: &wgpu::Device, size: u32, surface_format: wgpu::TextureFormat) -> Self {
        let size = if size == 0 {
            log::warn!("Shadow map size 0 requested, using {}", Self::DEFAULT_SIZE);
            Self::DEFAULT_SIZE
        } else {
            size
        };

        let view = Self::create_target(device, size);

        // Hardware PCF: the comparison happens in the sampler, the shader
        // receives the already-resolved visibility factor.
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowMap.Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowMap.BindLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        let debug_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowMap.DebugSampler"),
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let debug_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ShadowMap.DebugBindLayout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let debug_pipeline = Self::build_debug_pipeline(device, &debug_layout, surface_format);

        let bind_group = Self::build_bind_group(device, &bind_layout, &view, &sampler, "BindGroup");
        let debug_bind_group =
            Self::build_bind_group(device, &debug_layout, &view, &debug_sampler, "DebugBindGroup");

        Self {
            view,
            sampler,
            bind_layout,
            bind_group,
            debug_pipeline,
            debug_layout,
            debug_sampler,
            debug_bind_group,
            size,
        }
    }

    fn create_target(device: &wgpu::Device, size: u32) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ShadowMap"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn build_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        label: &str,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("ShadowMap.{label}")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn build_debug_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ShadowMap.DebugShader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/shadow_debug.wgsl").into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ShadowMap.DebugPipelineLayout"),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("ShadowMap.DebugPipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            // Drawn inside the scene pass, so the attachment formats must
            // match even though depth is neither tested nor written.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: RenderContext::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    /// Releases the depth target and allocates a fresh one at `size`,
    /// rebuilding the bind groups. Meshes holding the previous bind group
    /// must be re-initialized by the caller.
    pub fn resize(&mut self, device: &wgpu::Device, size: u32) {
        if size == 0 {
            log::warn!("Ignoring shadow map resize to 0");
            return;
        }
        if size == self.size {
            return;
        }
        self.view = Self::create_target(device, size);
        self.bind_group =
            Self::build_bind_group(device, &self.bind_layout, &self.view, &self.sampler, "BindGroup");
        self.debug_bind_group = Self::build_bind_group(
            device,
            &self.debug_layout,
            &self.view,
            &self.debug_sampler,
            "DebugBindGroup",
        );
        self.size = size;
        log::info!("Shadow map resized to {size}x{size}");
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Opens the depth-only pass targeting the shadow map, cleared to the far
    /// plane.
    pub fn begin_pass<'e>(&self, encoder: &'e mut wgpu::CommandEncoder) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("ShadowPass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    /// Fullscreen depth visualization, drawn instead of the scene when shadow
    /// debugging is toggled on.
    pub fn draw_debug(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.debug_pipeline);
        pass.set_bind_group(0, &self.debug_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}
