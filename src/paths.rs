use std::path::{Path, PathBuf};

/// Resolves logical shader and texture names to filesystem paths. Built once
/// at startup and handed to whoever loads resources; there is no global
/// resource-path state.
#[derive(Clone, Debug)]
pub struct ResourcePaths {
    shader_dir: PathBuf,
    texture_dir: PathBuf,
}

impl ResourcePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            shader_dir: root.join("shaders"),
            texture_dir: root.join("textures"),
        }
    }

    pub fn shader(&self, name: &str) -> PathBuf {
        self.shader_dir.join(name)
    }

    pub fn texture(&self, name: &str) -> PathBuf {
        self.texture_dir.join(name)
    }

    /// Resolves a texture name only when the file actually exists, so callers
    /// can fall back to an untextured mesh without a decode attempt.
    pub fn existing_texture(&self, name: &str) -> Option<PathBuf> {
        let path = self.texture(name);
        if path.is_file() {
            Some(path)
        } else {
            log::info!("Texture {:?} not found, using fallback", path);
            None
        }
    }

    /// Resolves a shader name only when the file actually exists, letting
    /// meshes override the built-in sources from disk.
    pub fn existing_shader(&self, name: &str) -> Option<PathBuf> {
        let path = self.shader(name);
        if path.is_file() {
            Some(path)
        } else {
            log::info!("Shader {:?} not found, using built-in source", path);
            None
        }
    }
}

impl Default for ResourcePaths {
    fn default() -> Self {
        Self::new("assets")
    }
}
