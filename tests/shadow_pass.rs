use glam::{Mat4, Vec3};

use sim_viewer::renderer::light::{Light, ORTHO_FAR, ORTHO_HALF_EXTENT};
use sim_viewer::settings::LightSettings;

const EPSILON: f32 = 1e-4;

/// CPU mirror of the shadow lookup in the scene shader: light-space clip
/// position to shadow-map uv plus comparison depth.
fn project_shadow_cpu(matrix: Mat4, world_pos: Vec3) -> Vec3 {
    let clip = matrix * world_pos.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    Vec3::new(ndc.x * 0.5 + 0.5, -ndc.y * 0.5 + 0.5, ndc.z)
}

fn overhead_light() -> Light {
    let mut light = Light::from_settings(&LightSettings::default());
    light
        .set_position_and_target(Vec3::new(0.0, 60.0, 0.0), Vec3::ZERO)
        .unwrap();
    light
}

#[test]
fn scene_origin_projects_to_shadow_map_center() {
    let light = overhead_light();
    let uvz = project_shadow_cpu(light.light_space_matrix(), Vec3::ZERO);
    assert!((uvz.x - 0.5).abs() < EPSILON, "{uvz:?}");
    assert!((uvz.y - 0.5).abs() < EPSILON, "{uvz:?}");
    assert!((0.0..=1.0).contains(&uvz.z), "{uvz:?}");
}

#[test]
fn depth_increases_away_from_the_light() {
    let light = overhead_light();
    let matrix = light.light_space_matrix();
    let high = project_shadow_cpu(matrix, Vec3::new(0.0, 10.0, 0.0));
    let low = project_shadow_cpu(matrix, Vec3::new(0.0, 0.0, 0.0));
    assert!(low.z > high.z, "low={low:?} high={high:?}");
}

#[test]
fn orthographic_extent_bounds_the_lit_area() {
    let light = overhead_light();
    let matrix = light.light_space_matrix();

    let inside = project_shadow_cpu(matrix, Vec3::new(ORTHO_HALF_EXTENT - 1.0, 0.0, 0.0));
    assert!((0.0..=1.0).contains(&inside.x), "{inside:?}");

    let outside = project_shadow_cpu(matrix, Vec3::new(ORTHO_HALF_EXTENT + 1.0, 0.0, 0.0));
    assert!(!(0.0..=1.0).contains(&outside.x), "{outside:?}");
}

#[test]
fn slanted_light_keeps_occluders_in_front_of_receivers() {
    let mut light = Light::from_settings(&LightSettings::default());
    light
        .set_position_and_target(Vec3::new(20.0, 40.0, 20.0), Vec3::ZERO)
        .unwrap();
    let matrix = light.light_space_matrix();

    // A point on the light ray closer to the light must land on the same
    // texel with a smaller depth.
    let direction = light.direction();
    let receiver = Vec3::ZERO;
    let occluder = receiver - direction * 5.0;

    let a = project_shadow_cpu(matrix, occluder);
    let b = project_shadow_cpu(matrix, receiver);
    assert!((a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3, "{a:?} {b:?}");
    assert!(a.z < b.z, "occluder {a:?} not in front of receiver {b:?}");
}

#[test]
fn vertical_light_direction_still_produces_finite_matrices() {
    let mut light = Light::from_settings(&LightSettings::default());
    for direction in [Vec3::NEG_Y, Vec3::Y] {
        light.set(Vec3::new(0.0, 50.0, 0.0), direction).unwrap();
        let matrix = light.light_space_matrix();
        assert!(matrix.is_finite(), "{direction:?} -> {matrix:?}");
        let uvz = project_shadow_cpu(matrix, Vec3::new(1.0, 0.0, 1.0));
        assert!(uvz.is_finite(), "{direction:?} -> {uvz:?}");
    }
}

#[test]
fn far_plane_covers_the_whole_orbit_height() {
    let mut light = Light::from_settings(&LightSettings::default());
    light
        .set_position_and_target(Vec3::new(0.0, ORTHO_FAR * 0.5, 0.0), Vec3::ZERO)
        .unwrap();
    let uvz = project_shadow_cpu(light.light_space_matrix(), Vec3::ZERO);
    assert!((0.0..=1.0).contains(&uvz.z), "{uvz:?}");
}
