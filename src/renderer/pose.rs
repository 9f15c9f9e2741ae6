use glam::{Mat4, Quat, Vec3};

/// Rigid placement in world space: rotation followed by translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Pose {
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.translation += delta;
    }

    pub fn rotate(&mut self, rotation: Quat) {
        self.rotation = (rotation * self.rotation).normalize();
    }

    /// Rotates the pose about a world-space pivot point.
    pub fn rotate_around(&mut self, pivot: Vec3, rotation: Quat) {
        self.translation = pivot + rotation * (self.translation - pivot);
        self.rotate(rotation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn default_is_identity() {
        assert!(Pose::default().matrix().abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn translate_accumulates() {
        let mut pose = Pose::default();
        pose.translate(Vec3::new(1.0, 0.0, 0.0));
        pose.translate(Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(pose.translation, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn rotate_around_pivot_moves_translation() {
        let mut pose = Pose::new(Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY);
        pose.rotate_around(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(FRAC_PI_2));
        // (2,0,0) rotated 90 degrees about z around (1,0,0) lands at (1,1,0).
        assert!(pose
            .translation
            .abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn rotate_around_origin_matches_plain_rotation() {
        let rot = Quat::from_rotation_y(FRAC_PI_2);
        let mut a = Pose::new(Vec3::ZERO, Quat::IDENTITY);
        let mut b = Pose::new(Vec3::ZERO, Quat::IDENTITY);
        a.rotate(rot);
        b.rotate_around(Vec3::ZERO, rot);
        assert!(a.matrix().abs_diff_eq(b.matrix(), 1e-6));
    }
}
