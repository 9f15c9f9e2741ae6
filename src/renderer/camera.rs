use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::settings::CameraSettings;

const ROTATE_SENSITIVITY: f32 = 0.01;
const SHIFT_SENSITIVITY: f32 = 0.02;
const SCROLL_SENSITIVITY: f32 = 0.1;
const LENS_SENSITIVITY: f32 = 1.0;

const MIN_LENS_ANGLE: f32 = 1.0;
const MAX_LENS_ANGLE: f32 = 179.0;

#[derive(Clone, Copy, Debug)]
pub struct ViewUpdate {
    pub view: Mat4,
    pub position: Vec3,
}

#[derive(Clone, Copy, Debug)]
pub struct ProjectionUpdate {
    pub projection: Mat4,
}

pub type ViewListener = Box<dyn FnMut(&ViewUpdate)>;
pub type ProjectionListener = Box<dyn FnMut(&ProjectionUpdate)>;

/// Interactive camera: position + yaw/pitch/roll orientation, exponential
/// zoom and a lens angle. Every mutation notifies the registered listeners
/// synchronously, so dependent meshes re-sync their uniforms before the next
/// draw.
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    roll: f32,
    zoom: f32,
    lens_angle_deg: f32,
    aspect: f32,
    near: f32,
    far: f32,
    view_listeners: Vec<ViewListener>,
    projection_listeners: Vec<ProjectionListener>,
}

impl Camera {
    pub fn from_settings(settings: &CameraSettings) -> Self {
        Self {
            position: Vec3::from_array(settings.position),
            yaw: settings.yaw,
            pitch: settings.pitch,
            roll: settings.roll,
            zoom: settings.zoom,
            lens_angle_deg: settings.lens_angle.clamp(MIN_LENS_ANGLE, MAX_LENS_ANGLE),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            view_listeners: Vec::new(),
            projection_listeners: Vec::new(),
        }
    }

    pub fn to_settings(&self) -> CameraSettings {
        CameraSettings {
            position: self.position.to_array(),
            yaw: self.yaw,
            pitch: self.pitch,
            roll: self.roll,
            zoom: self.zoom,
            lens_angle: self.lens_angle_deg,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn lens_angle(&self) -> f32 {
        self.lens_angle_deg
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// Inverse of the camera pose, scaled by `exp(zoom)`. The exponential
    /// gives smooth unbounded zooming without a sign flip.
    pub fn view_matrix(&self) -> Mat4 {
        let pose = Mat4::from_rotation_translation(self.rotation(), self.position);
        Mat4::from_scale(Vec3::splat(self.zoom.exp())) * pose.inverse()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.lens_angle_deg.to_radians(),
            self.aspect,
            self.near,
            self.far,
        )
    }

    /// Shifts the view-plane origin. Vertical screen motion inverts sign so
    /// dragging up moves the scene up.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let shift = self.rotation() * (Vec3::new(-dx, dy, 0.0) * SHIFT_SENSITIVITY);
        self.position += shift;
        self.notify_view();
    }

    /// Orbits the view. The pitch delta is damped by `cos(pitch)` so rotation
    /// slows near the poles instead of flipping over them.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * ROTATE_SENSITIVITY;
        self.pitch += dy * ROTATE_SENSITIVITY * self.pitch.cos();
        self.notify_view();
    }

    /// Scroll input: zoom, or lens angle when the alt modifier is held. The
    /// two are mutually exclusive per event.
    pub fn scroll(&mut self, delta: f32, alt_held: bool) {
        if alt_held {
            self.lens_angle_deg = (self.lens_angle_deg + delta * LENS_SENSITIVITY)
                .clamp(MIN_LENS_ANGLE, MAX_LENS_ANGLE);
            self.notify_projection();
        } else {
            self.zoom += delta * SCROLL_SENSITIVITY;
            self.notify_view();
        }
    }

    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if aspect <= 0.0 {
            log::warn!("Ignoring non-positive aspect ratio {}", aspect);
            return;
        }
        self.aspect = aspect;
        self.notify_projection();
    }

    pub fn subscribe_view(&mut self, listener: ViewListener) {
        self.view_listeners.push(listener);
    }

    pub fn subscribe_projection(&mut self, listener: ProjectionListener) {
        self.projection_listeners.push(listener);
    }

    fn notify_view(&mut self) {
        let update = ViewUpdate {
            view: self.view_matrix(),
            position: self.position,
        };
        for listener in &mut self.view_listeners {
            listener(&update);
        }
    }

    fn notify_projection(&mut self) {
        let update = ProjectionUpdate {
            projection: self.projection_matrix(),
        };
        for listener in &mut self.projection_listeners {
            listener(&update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn camera() -> Camera {
        Camera::from_settings(&CameraSettings::default())
    }

    #[test]
    fn identity_pose_at_zero_zoom_gives_identity_view() {
        let mut cam = camera();
        cam.position = Vec3::ZERO;
        cam.yaw = 0.0;
        cam.pitch = 0.0;
        cam.roll = 0.0;
        cam.zoom = 0.0;
        assert!(cam.view_matrix().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn projection_aspect_term_tracks_resize() {
        let mut cam = camera();
        for (w, h) in [(1280u32, 720u32), (800, 600), (333, 777)] {
            cam.set_aspect_ratio(w as f32 / h as f32);
            let proj = cam.projection_matrix();
            // perspective_rh: m00 = f/aspect, m11 = f.
            let aspect = proj.y_axis.y / proj.x_axis.x;
            assert!((aspect - w as f32 / h as f32).abs() < 1e-5);
        }
    }

    #[test]
    fn non_positive_aspect_is_ignored() {
        let mut cam = camera();
        let before = cam.aspect_ratio();
        cam.set_aspect_ratio(0.0);
        cam.set_aspect_ratio(-2.0);
        assert_eq!(cam.aspect_ratio(), before);
    }

    #[test]
    fn zoom_is_monotonic_under_same_sign_scroll() {
        let mut cam = camera();
        let mut last = cam.zoom();
        for _ in 0..10 {
            cam.scroll(1.0, false);
            assert!(cam.zoom() > last);
            last = cam.zoom();
        }
        for _ in 0..10 {
            cam.scroll(-1.0, false);
            assert!(cam.zoom() < last);
            last = cam.zoom();
        }
    }

    #[test]
    fn alt_scroll_changes_lens_angle_not_zoom() {
        let mut cam = camera();
        let zoom = cam.zoom();
        let lens = cam.lens_angle();
        cam.scroll(5.0, true);
        assert_eq!(cam.zoom(), zoom);
        assert!(cam.lens_angle() > lens);
    }

    #[test]
    fn lens_angle_stays_in_valid_range() {
        let mut cam = camera();
        for _ in 0..1000 {
            cam.scroll(10.0, true);
        }
        assert!(cam.lens_angle() <= MAX_LENS_ANGLE);
        for _ in 0..1000 {
            cam.scroll(-10.0, true);
        }
        assert!(cam.lens_angle() >= MIN_LENS_ANGLE);
    }

    #[test]
    fn listeners_fire_synchronously_on_mutation() {
        let mut cam = camera();
        let views = Rc::new(Cell::new(0));
        let projections = Rc::new(Cell::new(0));
        let v = views.clone();
        cam.subscribe_view(Box::new(move |_| v.set(v.get() + 1)));
        let p = projections.clone();
        cam.subscribe_projection(Box::new(move |_| p.set(p.get() + 1)));

        cam.orbit(1.0, 1.0);
        cam.pan(1.0, 1.0);
        cam.scroll(1.0, false);
        assert_eq!(views.get(), 3);
        assert_eq!(projections.get(), 0);

        cam.scroll(1.0, true);
        cam.set_aspect_ratio(2.0);
        assert_eq!(projections.get(), 2);
        assert_eq!(views.get(), 3);
    }

    #[test]
    fn orbit_pitch_is_damped_near_poles() {
        let mut cam = camera();
        cam.pitch = 0.0;
        cam.orbit(0.0, 1.0);
        let delta_at_equator = cam.pitch;

        let mut steep = camera();
        steep.pitch = 1.4;
        steep.orbit(0.0, 1.0);
        let delta_near_pole = steep.pitch - 1.4;

        assert!(delta_near_pole < delta_at_equator);
    }

    #[test]
    fn settings_round_trip() {
        let mut cam = camera();
        cam.orbit(3.0, 2.0);
        cam.pan(1.0, -1.0);
        cam.scroll(2.0, false);
        let saved = cam.to_settings();
        let restored = Camera::from_settings(&saved);
        assert!(restored
            .view_matrix()
            .abs_diff_eq(cam.view_matrix(), 1e-5));
    }
}
