use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::keyboard::Key;
use winit::window::Window;

use crate::host::{Modifiers, PointerButton, RenderSurfaceHost};
use crate::paths::ResourcePaths;
use crate::renderer::scene_renderer::SceneRenderer;
use crate::settings::ViewerSettings;
use crate::sim::{IdleWorld, SimulationRunner, WorldModel};

const SIMULATION_RATE: u32 = 120;

/// Standalone viewer host: builds the scene renderer once the window is up,
/// routes input into it and runs the world model on the simulation thread.
/// Camera and light state are written back to the settings file on shutdown.
pub struct Viewer {
    settings: ViewerSettings,
    paths: ResourcePaths,
    renderer: Option<SceneRenderer>,
    simulation: Option<SimulationRunner>,
    world: Option<Box<dyn WorldModel>>,
}

impl Viewer {
    pub fn new(settings: ViewerSettings, paths: ResourcePaths) -> Self {
        Self {
            settings,
            paths,
            renderer: None,
            simulation: None,
            world: Some(Box::new(IdleWorld)),
        }
    }

    /// Replaces the idle world with an embedder-provided model. Must be
    /// called before the surface comes up.
    pub fn with_world(mut self, world: Box<dyn WorldModel>) -> Self {
        self.world = Some(world);
        self
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }
}

impl RenderSurfaceHost for Viewer {
    fn on_surface_ready(&mut self, window: Arc<Window>) {
        match pollster::block_on(SceneRenderer::new(window, &self.settings, self.paths.clone()))
        {
            Ok(mut renderer) => {
                renderer.init();
                self.renderer = Some(renderer);
            }
            Err(err) => {
                log::error!("Failed to create renderer: {err}");
            }
        }
        if let Some(world) = self.world.take() {
            self.simulation = Some(SimulationRunner::start(world, SIMULATION_RATE));
        }
    }

    fn on_frame_tick(&mut self, dt: f32) {
        if let Some(renderer) = &mut self.renderer {
            renderer.update(dt);
        }
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        if let Some(renderer) = &mut self.renderer {
            renderer.on_resize(size);
        }
    }

    fn on_pointer_moved(&mut self, x: f32, y: f32) {
        if let Some(renderer) = &mut self.renderer {
            renderer.on_pointer_moved(x, y);
        }
    }

    fn on_pointer_button(&mut self, button: PointerButton, pressed: bool) {
        if let Some(renderer) = &mut self.renderer {
            match button {
                PointerButton::Left => renderer.on_pointer_left(pressed),
                PointerButton::Right => renderer.on_pointer_right(pressed),
            }
        }
    }

    fn on_scroll(&mut self, delta: f32) {
        if let Some(renderer) = &mut self.renderer {
            renderer.on_scroll(delta);
        }
    }

    fn on_modifiers(&mut self, modifiers: Modifiers) {
        if let Some(renderer) = &mut self.renderer {
            renderer.on_modifiers(modifiers.ctrl, modifiers.alt);
        }
    }

    fn on_key_pressed(&mut self, key: &Key) {
        if let Key::Character(text) = key {
            if text.eq_ignore_ascii_case("d") {
                if let Some(renderer) = &mut self.renderer {
                    renderer.toggle_debug();
                }
            }
        }
    }

    fn on_shutdown(&mut self) {
        if let Some(simulation) = &mut self.simulation {
            simulation.stop();
        }
        if let Some(renderer) = &self.renderer {
            self.settings.camera = renderer.camera().to_settings();
            self.settings.light = renderer.light().to_settings();
            self.settings.save();
        }
    }
}
