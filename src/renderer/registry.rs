use std::collections::BTreeMap;

use crate::renderer::mesh::SceneMesh;

/// Opaque, stable identity of a registered mesh. Handles are issued from a
/// monotonic counter and never reused, so a stale handle can only miss, never
/// alias a later mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MeshHandle(u64);

impl MeshHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Owns every mesh in the scene, keyed by handle in insertion order.
#[derive(Default)]
pub struct MeshRegistry {
    meshes: BTreeMap<MeshHandle, Box<dyn SceneMesh>>,
    next: u64,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mesh: Box<dyn SceneMesh>) -> MeshHandle {
        let handle = MeshHandle(self.next);
        self.next += 1;
        self.meshes.insert(handle, mesh);
        handle
    }

    /// Drops the mesh and its GPU resources. Unknown handles report `false`.
    pub fn remove(&mut self, handle: MeshHandle) -> bool {
        self.meshes.remove(&handle).is_some()
    }

    pub fn get_mut(&mut self, handle: MeshHandle) -> Option<&mut Box<dyn SceneMesh>> {
        self.meshes.get_mut(&handle)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn SceneMesh>> {
        self.meshes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::camera::{ProjectionUpdate, ViewUpdate};
    use crate::renderer::context::RenderContext;
    use crate::renderer::light::LightState;
    use crate::renderer::pose::Pose;
    use crate::renderer::shadow::ShadowMap;
    use glam::{Quat, Vec3};

    struct StubMesh;

    impl SceneMesh for StubMesh {
        fn init(&mut self, _context: &RenderContext, _shadow: &ShadowMap) {}
        fn is_initialized(&self) -> bool {
            true
        }
        fn draw(&self, _pass: &mut wgpu::RenderPass<'_>) {}
        fn draw_shadows(&self, _pass: &mut wgpu::RenderPass<'_>) {}
        fn set_pose(&mut self, _pose: Pose) {}
        fn translate(&mut self, _delta: Vec3) {}
        fn rotate(&mut self, _rotation: Quat) {}
        fn rotate_around(&mut self, _pivot: Vec3, _rotation: Quat) {}
        fn set_view(&mut self, _update: &ViewUpdate) {}
        fn set_projection(&mut self, _update: &ProjectionUpdate) {}
        fn set_camera_position(&mut self, _position: Vec3) {}
        fn set_light(&mut self, _light: &LightState) {}
        fn set_debug_normals(&mut self, _enabled: bool) {}
    }

    #[test]
    fn handles_count_up_from_zero() {
        let mut registry = MeshRegistry::new();
        assert_eq!(registry.insert(Box::new(StubMesh)).id(), 0);
        assert_eq!(registry.insert(Box::new(StubMesh)).id(), 1);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_succeeds_exactly_once() {
        let mut registry = MeshRegistry::new();
        let handle = registry.insert(Box::new(StubMesh));
        assert!(registry.remove(handle));
        assert!(!registry.remove(handle));
        assert!(registry.get_mut(handle).is_none());
    }

    #[test]
    fn removed_handles_are_never_reissued() {
        let mut registry = MeshRegistry::new();
        let first = registry.insert(Box::new(StubMesh));
        registry.remove(first);
        let second = registry.insert(Box::new(StubMesh));
        assert_ne!(first, second);
        assert_eq!(second.id(), 1);
    }
}
