use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;
use std::path::Path;

use glam::{Mat4, Vec3, Vec4};

/// Member types a uniform block can carry. Sizes and alignments follow the
/// WGSL uniform address space rules so the CPU image matches the shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    fn size(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }

    fn align(self) -> u32 {
        match self {
            UniformKind::Int | UniformKind::Float => 4,
            UniformKind::Vec3 | UniformKind::Vec4 | UniformKind::Mat4 => 16,
        }
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

#[derive(Clone, Debug)]
struct UniformMember {
    kind: UniformKind,
    offset: u32,
}

/// Named members of one uniform block, offsets computed once at declaration.
#[derive(Clone, Debug, Default)]
pub struct UniformLayout {
    members: HashMap<String, UniformMember>,
    end: u32,
}

impl UniformLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, kind: UniformKind) -> Self {
        let offset = align_up(self.end, kind.align());
        if self
            .members
            .insert(name.to_string(), UniformMember { kind, offset })
            .is_some()
        {
            log::warn!("Uniform {:?} declared twice, keeping the later layout", name);
        }
        self.end = offset + kind.size();
        self
    }

    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.members.get(name).map(|m| m.offset)
    }

    /// Total block size, padded to the 16-byte uniform buffer granularity.
    pub fn size(&self) -> u32 {
        align_up(self.end.max(4), 16)
    }
}

/// CPU image of a uniform block. Setters look members up by name; an unknown
/// or type-mismatched name is logged once and the write is dropped, never a
/// failure (mirrors a shader compiler optimizing a uniform away).
#[derive(Clone, Debug)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
    dirty: bool,
    missing: HashSet<String>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0u8; layout.size() as usize];
        Self {
            layout,
            bytes,
            dirty: false,
            missing: HashSet::new(),
        }
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.write(name, UniformKind::Int, &value.to_le_bytes());
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, UniformKind::Float, &value.to_le_bytes());
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write(name, UniformKind::Vec3, bytemuck::bytes_of(&value.to_array()));
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.write(name, UniformKind::Vec4, bytemuck::bytes_of(&value.to_array()));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write(
            name,
            UniformKind::Mat4,
            bytemuck::bytes_of(&value.to_cols_array()),
        );
    }

    fn write(&mut self, name: &str, kind: UniformKind, data: &[u8]) {
        let Some(member) = self.layout.members.get(name) else {
            if self.missing.insert(name.to_string()) {
                log::warn!("Uniform {:?} not declared in block, writes dropped", name);
            }
            return;
        };
        if member.kind != kind {
            if self.missing.insert(name.to_string()) {
                log::warn!(
                    "Uniform {:?} declared as {:?}, write of {:?} dropped",
                    name,
                    member.kind,
                    kind
                );
            }
            return;
        }
        let offset = member.offset as usize;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        self.dirty = true;
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// A compiled shader module plus its uniform block on the GPU. Setters write
/// the CPU image; `flush` uploads it. Mesh-level mutators flush right after
/// writing so uniform state never lags the value it mirrors.
pub struct ShaderBinding {
    module: wgpu::ShaderModule,
    block: UniformBlock,
    buffer: wgpu::Buffer,
    bind_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    queue: wgpu::Queue,
}

impl ShaderBinding {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        source: &str,
        layout: UniformLayout,
    ) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let block = UniformBlock::new(layout);
        let size = block.bytes().len() as u64;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label}.Uniforms")),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label}.UniformLayout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(size),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label}.UniformBindGroup")),
            layout: &bind_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            module,
            block,
            buffer,
            bind_layout,
            bind_group,
            queue: queue.clone(),
        }
    }

    /// Loads WGSL from the filesystem. A failed read leaves the caller in the
    /// unshaded degraded mode; it is reported, not fatal.
    pub fn from_path(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        path: impl AsRef<Path>,
        layout: UniformLayout,
    ) -> Result<Self, String> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read shader {:?}: {}", path, e))?;
        Ok(Self::new(device, queue, label, &source, layout))
    }

    pub fn module(&self) -> &wgpu::ShaderModule {
        &self.module
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_layout
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.block.set_int(name, value);
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.block.set_float(name, value);
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.block.set_vec3(name, value);
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.block.set_vec4(name, value);
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.block.set_mat4(name, value);
    }

    pub fn flush(&mut self) {
        if self.block.take_dirty() {
            self.queue.write_buffer(&self.buffer, 0, self.block.bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh_like_layout() -> UniformLayout {
        UniformLayout::new()
            .with("model", UniformKind::Mat4)
            .with("view", UniformKind::Mat4)
            .with("cameraPos", UniformKind::Vec4)
            .with("shininess", UniformKind::Float)
    }

    #[test]
    fn offsets_follow_wgsl_alignment() {
        let layout = mesh_like_layout();
        assert_eq!(layout.offset_of("model"), Some(0));
        assert_eq!(layout.offset_of("view"), Some(64));
        assert_eq!(layout.offset_of("cameraPos"), Some(128));
        assert_eq!(layout.offset_of("shininess"), Some(144));
        assert_eq!(layout.size(), 160);
    }

    #[test]
    fn vec3_packs_at_sixteen_byte_alignment() {
        let layout = UniformLayout::new()
            .with("a", UniformKind::Float)
            .with("b", UniformKind::Vec3);
        assert_eq!(layout.offset_of("a"), Some(0));
        assert_eq!(layout.offset_of("b"), Some(16));
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn block_size_is_padded_to_sixteen() {
        let layout = UniformLayout::new().with("x", UniformKind::Float);
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn set_writes_bytes_at_member_offset() {
        let mut block = UniformBlock::new(mesh_like_layout());
        block.set_float("shininess", 2.5);
        let offset = 144;
        let stored = f32::from_le_bytes(block.bytes()[offset..offset + 4].try_into().unwrap());
        assert_eq!(stored, 2.5);
        assert!(block.take_dirty());
        assert!(!block.take_dirty());
    }

    #[test]
    fn unknown_uniform_is_silently_dropped() {
        let mut block = UniformBlock::new(mesh_like_layout());
        let before = block.bytes().to_vec();
        block.set_mat4("doesNotExist", Mat4::IDENTITY);
        block.set_mat4("doesNotExist", Mat4::IDENTITY);
        assert_eq!(block.bytes(), &before[..]);
        assert!(!block.take_dirty());
    }

    #[test]
    fn type_mismatch_is_dropped() {
        let mut block = UniformBlock::new(mesh_like_layout());
        let before = block.bytes().to_vec();
        block.set_float("model", 1.0);
        assert_eq!(block.bytes(), &before[..]);
    }

    #[test]
    fn mat4_round_trips_column_major() {
        let layout = UniformLayout::new().with("m", UniformKind::Mat4);
        let mut block = UniformBlock::new(layout);
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        block.set_mat4("m", m);
        let cols: &[f32] = bytemuck::cast_slice(&block.bytes()[0..64]);
        assert_eq!(cols, &m.to_cols_array());
    }
}
