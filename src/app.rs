use std::sync::Arc;
use std::time::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::*,
    event_loop::{ActiveEventLoop, ControlFlow},
    keyboard::{Key, NamedKey},
    window::{Window, WindowId},
};

use crate::host::{Modifiers, PointerButton, RenderSurfaceHost};

/// Windowing shell: owns the winit window and forwards everything else to
/// the host. Frames are paced with `ControlFlow::WaitUntil` so the event
/// loop keeps servicing input between redraws.
pub struct App {
    host: Box<dyn RenderSurfaceHost>,
    window: Option<Arc<Window>>,
    window_id: Option<WindowId>,
    last_frame: Option<Instant>,
    frame_interval: Duration,
    initial_size: LogicalSize<u32>,
    title: String,
}

impl App {
    pub fn new(
        host: Box<dyn RenderSurfaceHost>,
        frame_rate: u32,
        width: u32,
        height: u32,
        title: &str,
    ) -> Self {
        Self {
            host,
            window: None,
            window_id: None,
            last_frame: None,
            frame_interval: Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64),
            initial_size: LogicalSize::new(width.max(1), height.max(1)),
            title: title.to_string(),
        }
    }
}

impl ApplicationHandler for App {
    fn new_events(&mut self, _event_loop: &ActiveEventLoop, cause: StartCause) {
        if let StartCause::ResumeTimeReached { .. } = cause {
            if let Some(w) = &self.window {
                w.request_redraw();
            }
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window = match event_loop.create_window(
                Window::default_attributes()
                    .with_title(&self.title)
                    .with_inner_size(self.initial_size),
            ) {
                Ok(window) => Arc::new(window),
                Err(err) => {
                    log::error!("Failed to create window: {err}");
                    event_loop.exit();
                    return;
                }
            };
            let id = window.id();

            self.host.on_surface_ready(window.clone());

            self.window = Some(window);
            self.window_id = Some(id);

            if let Some(w) = &self.window {
                w.request_redraw();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if Some(id) != self.window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                self.host.on_shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.host.on_resize(size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(w) = &self.window {
                    self.host.on_resize(w.inner_size());
                }
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = self
                    .last_frame
                    .map(|last| (now - last).as_secs_f32())
                    .unwrap_or(0.0);
                self.last_frame = Some(now);

                self.host.on_frame_tick(dt);

                event_loop.set_control_flow(ControlFlow::WaitUntil(now + self.frame_interval));
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.host
                    .on_pointer_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state == ElementState::Pressed;
                match button {
                    MouseButton::Left => self.host.on_pointer_button(PointerButton::Left, pressed),
                    MouseButton::Right => {
                        self.host.on_pointer_button(PointerButton::Right, pressed)
                    }
                    _ => {}
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                };
                self.host.on_scroll(amount);
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                let state = modifiers.state();
                self.host.on_modifiers(Modifiers {
                    ctrl: state.control_key(),
                    alt: state.alt_key(),
                });
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => {
                if logical_key == Key::Named(NamedKey::Escape) {
                    self.host.on_shutdown();
                    event_loop.exit();
                } else {
                    self.host.on_key_pressed(&logical_key);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullHost;

    impl RenderSurfaceHost for NullHost {
        fn on_surface_ready(&mut self, _window: Arc<Window>) {}
        fn on_frame_tick(&mut self, _dt: f32) {}
        fn on_resize(&mut self, _size: winit::dpi::PhysicalSize<u32>) {}
        fn on_pointer_moved(&mut self, _x: f32, _y: f32) {}
        fn on_pointer_button(&mut self, _button: PointerButton, _pressed: bool) {}
        fn on_scroll(&mut self, _delta: f32) {}
        fn on_modifiers(&mut self, _modifiers: Modifiers) {}
        fn on_key_pressed(&mut self, _key: &Key) {}
        fn on_shutdown(&mut self) {}
    }

    #[test]
    fn frame_interval_follows_the_configured_rate() {
        let app = App::new(Box::new(NullHost), 60, 1280, 720, "viewer");
        let expected = Duration::from_secs_f64(1.0 / 60.0);
        assert_eq!(app.frame_interval, expected);
    }

    #[test]
    fn zero_frame_rate_is_clamped_to_one() {
        let app = App::new(Box::new(NullHost), 0, 1280, 720, "viewer");
        assert_eq!(app.frame_interval, Duration::from_secs(1));
    }
}
