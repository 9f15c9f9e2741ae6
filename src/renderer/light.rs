use glam::{Mat4, Quat, Vec3};

use crate::settings::LightSettings;

/// Shadow projection bounds. Fixed literals rather than values fitted to the
/// scene bounds; anything the world cube scene places inside this box casts
/// and receives shadows.
pub const ORTHO_HALF_EXTENT: f32 = 30.0;
pub const ORTHO_NEAR: f32 = 0.1;
pub const ORTHO_FAR: f32 = 200.0;

const MIN_DIRECTION_LENGTH_SQ: f32 = 1e-12;

/// Immutable snapshot of the light pushed to meshes on every change.
#[derive(Clone, Copy, Debug)]
pub struct LightState {
    pub position: Vec3,
    pub direction: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub light_space: Mat4,
}

pub type LightListener = Box<dyn FnMut(&LightState)>;

/// The single directional shadow-casting light. `set` recomputes the pose
/// and light-space matrix and fires the change listeners synchronously.
pub struct Light {
    position: Vec3,
    direction: Vec3,
    ambient: Vec3,
    diffuse: Vec3,
    specular: Vec3,
    listeners: Vec<LightListener>,
}

impl Light {
    pub fn from_settings(settings: &LightSettings) -> Self {
        let mut light = Self {
            position: Vec3::from_array(settings.position),
            direction: Vec3::NEG_Z,
            ambient: Vec3::from_array(settings.ambient),
            diffuse: Vec3::from_array(settings.diffuse),
            specular: Vec3::from_array(settings.specular),
            listeners: Vec::new(),
        };
        let position = Vec3::from_array(settings.position);
        let target = Vec3::from_array(settings.target);
        if let Err(err) = light.set_position_and_target(position, target) {
            log::warn!("Invalid persisted light pose ({}), keeping default", err);
        }
        light
    }

    pub fn to_settings(&self) -> LightSettings {
        LightSettings {
            position: self.position.to_array(),
            target: (self.position + self.direction).to_array(),
            ambient: self.ambient.to_array(),
            diffuse: self.diffuse.to_array(),
            specular: self.specular.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Unit vector pointing from the light toward its target.
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Places the light. A zero-length direction is a precondition violation:
    /// the light is left untouched and no listeners fire.
    pub fn set(&mut self, position: Vec3, direction: Vec3) -> Result<(), String> {
        if direction.length_squared() < MIN_DIRECTION_LENGTH_SQ {
            return Err("light direction must be non-zero".to_string());
        }
        self.position = position;
        self.direction = direction.normalize();
        self.notify();
        Ok(())
    }

    pub fn set_position_and_target(&mut self, position: Vec3, target: Vec3) -> Result<(), String> {
        self.set(position, target - position)
    }

    /// Pose placing the light at `position` with its local +Z axis along the
    /// direction.
    pub fn pose(&self) -> Mat4 {
        let rotation = Quat::from_rotation_arc(Vec3::Z, self.direction);
        Mat4::from_rotation_translation(rotation, self.position)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::orthographic_rh(
            -ORTHO_HALF_EXTENT,
            ORTHO_HALF_EXTENT,
            -ORTHO_HALF_EXTENT,
            ORTHO_HALF_EXTENT,
            ORTHO_NEAR,
            ORTHO_FAR,
        )
    }

    /// View from the light's point of view, with the conventional up-vector
    /// fallback when the direction runs close to vertical.
    pub fn view_matrix(&self) -> Mat4 {
        let up = if self.direction.abs().dot(Vec3::Y) > 0.95 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_at_rh(self.position, self.position + self.direction, up)
    }

    /// World → shadow-map clip space.
    pub fn light_space_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn state(&self) -> LightState {
        LightState {
            position: self.position,
            direction: self.direction,
            ambient: self.ambient,
            diffuse: self.diffuse,
            specular: self.specular,
            light_space: self.light_space_matrix(),
        }
    }

    pub fn subscribe(&mut self, listener: LightListener) {
        self.listeners.push(listener);
    }

    fn notify(&mut self) {
        let state = self.state();
        for listener in &mut self.listeners {
            listener(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn light() -> Light {
        Light::from_settings(&LightSettings::default())
    }

    #[test]
    fn zero_direction_is_rejected_without_side_effects() {
        let mut l = light();
        let before_pos = l.position();
        let before_dir = l.direction();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        l.subscribe(Box::new(move |_| f.set(true)));

        assert!(l.set(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO).is_err());
        assert!(l
            .set_position_and_target(Vec3::ONE, Vec3::ONE)
            .is_err());
        assert_eq!(l.position(), before_pos);
        assert_eq!(l.direction(), before_dir);
        assert!(!fired.get());
    }

    #[test]
    fn pose_local_z_is_parallel_to_direction() {
        let mut l = light();
        for dir in [
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(-3.0, 0.0, 0.0),
        ] {
            l.set(Vec3::ZERO, dir).unwrap();
            let local_z = l.pose().transform_vector3(Vec3::Z);
            assert!(
                local_z.abs_diff_eq(dir.normalize(), 1e-5),
                "{dir:?} -> {local_z:?}"
            );
        }
    }

    #[test]
    fn pose_translation_is_light_position() {
        let mut l = light();
        l.set(Vec3::new(0.0, 0.0, 100.0), Vec3::NEG_Z).unwrap();
        let translation = l.pose().w_axis.truncate();
        assert!(translation.abs_diff_eq(Vec3::new(0.0, 0.0, 100.0), 1e-6));
    }

    #[test]
    fn direction_is_normalized_on_set() {
        let mut l = light();
        l.set(Vec3::ZERO, Vec3::new(0.0, 0.0, -10.0)).unwrap();
        assert!(l.direction().abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }

    #[test]
    fn set_position_and_target_matches_explicit_direction() {
        let mut a = light();
        let mut b = light();
        a.set_position_and_target(Vec3::new(0.0, 50.0, 0.0), Vec3::ZERO)
            .unwrap();
        b.set(Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -50.0, 0.0))
            .unwrap();
        assert!(a.direction().abs_diff_eq(b.direction(), 1e-6));
        assert!(a
            .light_space_matrix()
            .abs_diff_eq(b.light_space_matrix(), 1e-4));
    }

    #[test]
    fn change_listener_fires_on_set() {
        let mut l = light();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        l.subscribe(Box::new(move |state| {
            assert!(state.direction.is_normalized());
            c.set(c.get() + 1);
        }));
        l.set(Vec3::new(1.0, 10.0, 1.0), Vec3::NEG_Y).unwrap();
        l.set_position_and_target(Vec3::splat(5.0), Vec3::ZERO)
            .unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn light_space_maps_scene_points_into_clip_bounds() {
        let mut l = light();
        l.set_position_and_target(Vec3::new(20.0, 40.0, 20.0), Vec3::ZERO)
            .unwrap();
        let m = l.light_space_matrix();
        for p in [Vec3::ZERO, Vec3::new(5.0, 0.0, -5.0), Vec3::new(-10.0, 2.0, 8.0)] {
            let clip = m * p.extend(1.0);
            let ndc = clip.truncate() / clip.w;
            assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{p:?} -> {ndc:?}");
            assert!((0.0..=1.0).contains(&ndc.z), "{p:?} -> {ndc:?}");
        }
    }
}
