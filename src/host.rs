use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::keyboard::Key;
use winit::window::Window;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
}

/// What the windowing shell needs from whoever drives the rendering. The
/// shell owns the event loop; the host owns the renderer and reacts to the
/// surface appearing, frame ticks and input.
pub trait RenderSurfaceHost {
    /// The window exists and a GPU surface can be created against it.
    fn on_surface_ready(&mut self, window: Arc<Window>);

    /// One frame should be produced; `dt` is the seconds since the last tick.
    fn on_frame_tick(&mut self, dt: f32);

    fn on_resize(&mut self, size: PhysicalSize<u32>);
    fn on_pointer_moved(&mut self, x: f32, y: f32);
    fn on_pointer_button(&mut self, button: PointerButton, pressed: bool);
    fn on_scroll(&mut self, delta: f32);
    fn on_modifiers(&mut self, modifiers: Modifiers);
    fn on_key_pressed(&mut self, key: &Key);

    /// Last call before the event loop exits; persist state here.
    fn on_shutdown(&mut self);
}
