use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Quat, Vec3};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::paths::ResourcePaths;
use crate::renderer::camera::{Camera, ProjectionUpdate, ViewUpdate};
use crate::renderer::context::RenderContext;
use crate::renderer::light::Light;
use crate::renderer::mesh::{Mesh, MeshData, SceneMesh};
use crate::renderer::pose::Pose;
use crate::renderer::primitives;
use crate::renderer::registry::{MeshHandle, MeshRegistry};
use crate::renderer::shadow::ShadowMap;
use crate::settings::ViewerSettings;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.06,
    b: 0.08,
    a: 1.0,
};

const LIGHT_ORBIT_RADIUS: f32 = 40.0;
const LIGHT_ORBIT_RATE: f32 = 0.2;
const LIGHT_BASE_HEIGHT: f32 = 35.0;
const LIGHT_HEIGHT_SWING: f32 = 10.0;

/// Triangle wave with period 2 and range [-1, 1], so the animated value stays
/// bounded no matter how long the viewer runs.
fn triangle_wave(t: f32) -> f32 {
    let x = t.rem_euclid(2.0);
    if x < 1.0 {
        2.0 * x - 1.0
    } else {
        3.0 - 2.0 * x
    }
}

/// Returns the texture view frames should be rendered into instead of the
/// window surface, or `None` to fall back to the surface for that frame.
///
/// The returned view must match the current surface size: the color pass
/// pairs it with the renderer's screen depth buffer, and wgpu rejects a pass
/// whose attachments differ in size. `wgpu::TextureView` carries no
/// dimensions to check against, so the contract is on the host.
pub type FramebufferGetter = Box<dyn FnMut() -> Option<wgpu::TextureView>>;

/// Ties everything together: owns the GPU context, camera, light, shadow map
/// and the mesh registry, and drives the shadow and color passes every frame.
pub struct SceneRenderer {
    context: RenderContext,
    camera: Camera,
    light: Light,
    shadow: ShadowMap,
    registry: Rc<RefCell<MeshRegistry>>,
    paths: ResourcePaths,
    sun: Option<MeshHandle>,
    initialized: bool,
    show_debug: bool,
    elapsed: f32,
    cursor: Option<(f32, f32)>,
    left_down: bool,
    right_down: bool,
    ctrl_held: bool,
    alt_held: bool,
    framebuffer_getter: Option<FramebufferGetter>,
}

impl SceneRenderer {
    pub async fn new(
        window: Arc<Window>,
        settings: &ViewerSettings,
        paths: ResourcePaths,
    ) -> Result<Self, String> {
        let size = window.inner_size();
        let context = RenderContext::new(window, size).await?;
        let mut camera = Camera::from_settings(&settings.camera);
        camera.set_aspect_ratio(context.aspect_ratio());
        let light = Light::from_settings(&settings.light);
        let shadow = ShadowMap::new(
            context.device(),
            settings.shadow_map_size,
            context.surface_format(),
        );

        Ok(Self {
            context,
            camera,
            light,
            shadow,
            registry: Rc::new(RefCell::new(MeshRegistry::new())),
            paths,
            sun: None,
            initialized: false,
            show_debug: false,
            elapsed: 0.0,
            cursor: None,
            left_down: false,
            right_down: false,
            ctrl_held: false,
            alt_held: false,
            framebuffer_getter: None,
        })
    }

    /// Wires the change listeners and populates the built-in scene. Calling
    /// it again is a no-op.
    pub fn init(&mut self) {
        if self.initialized {
            return;
        }

        let registry = self.registry.clone();
        self.camera.subscribe_view(Box::new(move |update| {
            for mesh in registry.borrow_mut().iter_mut() {
                mesh.set_view(update);
                mesh.set_camera_position(update.position);
            }
        }));

        let registry = self.registry.clone();
        self.camera.subscribe_projection(Box::new(move |update| {
            for mesh in registry.borrow_mut().iter_mut() {
                mesh.set_projection(update);
            }
        }));

        let registry = self.registry.clone();
        self.light.subscribe(Box::new(move |state| {
            for mesh in registry.borrow_mut().iter_mut() {
                mesh.set_light(state);
            }
        }));

        let ground = self.scene_mesh(primitives::ground_plane(
            25.0,
            self.paths.existing_texture("ground.png"),
        ));
        self.add_mesh(Box::new(ground));

        let cube = self
            .scene_mesh(primitives::cube(
                4.0,
                self.paths.existing_texture("world.png"),
            ))
            .with_pose(Pose::new(Vec3::new(0.0, 2.0, 0.0), Quat::IDENTITY));
        self.add_mesh(Box::new(cube));

        let sun_mesh = self
            .scene_mesh(primitives::uv_sphere(1.5, 24, 12, None))
            .with_pose(Pose::new(self.light.position(), Quat::IDENTITY));
        let sun = self.add_mesh(Box::new(sun_mesh));
        self.sun = Some(sun);

        self.initialized = true;
        log::info!(
            "Scene renderer initialized with {} meshes",
            self.registry.borrow().len()
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Builds a mesh that picks up `shaders/scene.wgsl` from the resource
    /// directory when present, so the scene shader can be tweaked on disk
    /// without a rebuild.
    fn scene_mesh(&self, data: MeshData) -> Mesh {
        match self.paths.existing_shader("scene.wgsl") {
            Some(path) => Mesh::new(data).with_shader_path(path),
            None => Mesh::new(data),
        }
    }

    /// Initializes the mesh, pushes the current camera and light state into
    /// it and registers it for drawing.
    pub fn add_mesh(&mut self, mut mesh: Box<dyn SceneMesh>) -> MeshHandle {
        mesh.init(&self.context, &self.shadow);
        self.push_scene_state(mesh.as_mut());
        self.registry.borrow_mut().insert(mesh)
    }

    /// A mesh must never render a frame out of sync with the scene, so the
    /// full camera/light state is pushed whenever one is (re)initialized.
    fn push_scene_state(&self, mesh: &mut dyn SceneMesh) {
        mesh.set_view(&ViewUpdate {
            view: self.camera.view_matrix(),
            position: self.camera.position(),
        });
        mesh.set_camera_position(self.camera.position());
        mesh.set_projection(&ProjectionUpdate {
            projection: self.camera.projection_matrix(),
        });
        mesh.set_light(&self.light.state());
        mesh.set_debug_normals(self.show_debug);
    }

    /// Reallocates the shadow map at the new resolution. Every registered
    /// mesh is re-initialized since its pipelines reference the old target.
    pub fn set_shadow_map_size(&mut self, size: u32) {
        if size == self.shadow.size() {
            return;
        }
        self.shadow.resize(self.context.device(), size);
        let mut registry = self.registry.borrow_mut();
        for mesh in registry.iter_mut() {
            mesh.init(&self.context, &self.shadow);
            self.push_scene_state(mesh.as_mut());
        }
    }

    pub fn remove_mesh(&mut self, handle: MeshHandle) -> bool {
        self.registry.borrow_mut().remove(handle)
    }

    pub fn on_resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
        self.camera.set_aspect_ratio(self.context.aspect_ratio());
    }

    pub fn on_pointer_moved(&mut self, x: f32, y: f32) {
        let (dx, dy) = match self.cursor {
            Some((px, py)) => (x - px, y - py),
            None => (0.0, 0.0),
        };
        self.cursor = Some((x, y));

        if self.left_down {
            self.camera.orbit(dx, dy);
        } else if self.right_down && self.ctrl_held {
            // Pan distance tracks the lens angle so a narrow lens does not
            // overshoot.
            let scale = self.camera.lens_angle() / 45.0;
            self.camera.pan(dx * scale, dy * scale);
        }
    }

    pub fn on_pointer_left(&mut self, pressed: bool) {
        self.left_down = pressed;
    }

    pub fn on_pointer_right(&mut self, pressed: bool) {
        self.right_down = pressed;
    }

    pub fn on_modifiers(&mut self, ctrl: bool, alt: bool) {
        self.ctrl_held = ctrl;
        self.alt_held = alt;
    }

    pub fn on_scroll(&mut self, delta: f32) {
        let delta = if self.ctrl_held { delta * 10.0 } else { delta };
        self.camera.scroll(delta, self.alt_held);
    }

    /// Flips normal visualization on every mesh and swaps the color pass for
    /// the shadow-map blit.
    pub fn toggle_debug(&mut self) {
        self.show_debug = !self.show_debug;
        for mesh in self.registry.borrow_mut().iter_mut() {
            mesh.set_debug_normals(self.show_debug);
        }
    }

    /// Redirects rendering into a host-provided texture instead of the
    /// window surface. The host must keep the view sized to the surface
    /// across `on_resize`, see [`FramebufferGetter`].
    pub fn set_framebuffer_getter(&mut self, getter: FramebufferGetter) {
        self.framebuffer_getter = Some(getter);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn light(&self) -> &Light {
        &self.light
    }

    /// Advances the animation and renders one frame.
    pub fn update(&mut self, dt: f32) {
        if !self.initialized {
            return;
        }
        self.elapsed += dt;
        self.animate_light();
        if let Err(err) = self.render() {
            log::warn!("Dropped frame: {err}");
        }
    }

    fn animate_light(&mut self) {
        let angle = self.elapsed * LIGHT_ORBIT_RATE;
        let position = Vec3::new(
            LIGHT_ORBIT_RADIUS * angle.sin(),
            LIGHT_BASE_HEIGHT + LIGHT_HEIGHT_SWING * triangle_wave(self.elapsed * 0.1),
            LIGHT_ORBIT_RADIUS * angle.cos(),
        );
        if let Err(err) = self.light.set_position_and_target(position, Vec3::ZERO) {
            log::warn!("Light animation produced an invalid pose: {err}");
            return;
        }
        if let Some(sun) = self.sun {
            if let Some(mesh) = self.registry.borrow_mut().get_mut(sun) {
                mesh.set_pose(Pose::new(position, Quat::IDENTITY));
            }
        }
    }

    fn render(&mut self) -> Result<(), String> {
        // A host framebuffer takes precedence over the window surface.
        let mut host_view = None;
        if let Some(getter) = &mut self.framebuffer_getter {
            host_view = getter();
        }

        let frame = if host_view.is_some() {
            None
        } else {
            match self.context.acquire_frame() {
                Ok(frame) => Some(frame),
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    self.context.reconfigure();
                    return Ok(());
                }
                Err(wgpu::SurfaceError::Timeout) => return Ok(()),
                Err(err) => return Err(format!("Failed to acquire frame: {err}")),
            }
        };

        let target = match (&host_view, &frame) {
            (Some(view), _) => view.clone(),
            (None, Some(frame)) => frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            (None, None) => unreachable!(),
        };

        let mut encoder =
            self.context
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("FrameEncoder"),
                });

        {
            let mut registry = self.registry.borrow_mut();
            let mut pass = self.shadow.begin_pass(&mut encoder);
            for mesh in registry.iter_mut() {
                mesh.draw_shadows(&mut pass);
            }
        }

        {
            let mut registry = self.registry.borrow_mut();
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("ScenePass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.context.depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if self.show_debug {
                self.shadow.draw_debug(&mut pass);
            } else {
                for mesh in registry.iter_mut() {
                    mesh.draw(&mut pass);
                }
            }
        }

        self.context.queue().submit(Some(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_wave_stays_in_unit_range() {
        let mut t = -10.0f32;
        while t < 10.0 {
            let v = triangle_wave(t);
            assert!((-1.0..=1.0).contains(&v), "t={t} v={v}");
            t += 0.01;
        }
    }

    #[test]
    fn triangle_wave_has_period_two() {
        for t in [0.0f32, 0.3, 0.9, 1.5, 2.7] {
            assert!((triangle_wave(t) - triangle_wave(t + 2.0)).abs() < 1e-5);
        }
    }

    #[test]
    fn triangle_wave_hits_extremes() {
        assert!((triangle_wave(0.0) + 1.0).abs() < 1e-6);
        assert!((triangle_wave(1.0) - 1.0).abs() < 1e-6);
    }
}
