use std::f32::consts::PI;
use std::path::PathBuf;

use crate::renderer::mesh::MeshData;
use crate::renderer::vertex::{VertexFormat, VertexRecord};

fn record(format: VertexFormat, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> VertexRecord {
    VertexRecord::new(format)
        .with_position(position)
        .with_normal(normal)
        .with_texcoord(uv)
}

/// Axis-aligned cube centered at the origin, four vertices per face so
/// normals and texture coordinates stay per-face.
pub fn cube(size: f32, texture: Option<PathBuf>) -> MeshData {
    let h = size * 0.5;
    let format = VertexFormat::default();

    // (normal, four corners counter-clockwise when seen from outside)
    let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
        (
            [0.0, 0.0, 1.0],
            [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]],
        ),
        (
            [0.0, 0.0, -1.0],
            [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]],
        ),
        (
            [1.0, 0.0, 0.0],
            [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]],
        ),
        (
            [-1.0, 0.0, 0.0],
            [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]],
        ),
        (
            [0.0, 1.0, 0.0],
            [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]],
        ),
        (
            [0.0, -1.0, 0.0],
            [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]],
        ),
    ];
    let uvs = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(uvs) {
            vertices.push(record(format, corner, normal, uv));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }

    MeshData::new(format, &vertices, indices, texture)
        .unwrap_or_else(|e| unreachable!("cube construction is closed-form: {e}"))
}

/// Flat quad in the XZ plane facing +Y, the shadow-receiving ground.
pub fn ground_plane(half_extent: f32, texture: Option<PathBuf>) -> MeshData {
    let format = VertexFormat::default();
    let e = half_extent;
    let normal = [0.0, 1.0, 0.0];
    let vertices = [
        record(format, [-e, 0.0, e], normal, [0.0, 1.0]),
        record(format, [e, 0.0, e], normal, [1.0, 1.0]),
        record(format, [e, 0.0, -e], normal, [1.0, 0.0]),
        record(format, [-e, 0.0, -e], normal, [0.0, 0.0]),
    ];
    MeshData::new(format, &vertices, vec![0, 1, 2, 2, 3, 0], texture)
        .unwrap_or_else(|e| unreachable!("quad construction is closed-form: {e}"))
}

/// Latitude/longitude sphere, used for the sun marker.
pub fn uv_sphere(radius: f32, segments: u32, rings: u32, texture: Option<PathBuf>) -> MeshData {
    let format = VertexFormat::default();
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut vertices = Vec::new();
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * 2.0 * PI;
            let normal = [
                phi.sin() * theta.cos(),
                phi.cos(),
                phi.sin() * theta.sin(),
            ];
            let position = [normal[0] * radius, normal[1] * radius, normal[2] * radius];
            vertices.push(record(format, position, normal, [u, v]));
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * stride + segment;
            let b = a + stride;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    MeshData::new(format, &vertices, indices, texture)
        .unwrap_or_else(|e| unreachable!("sphere construction is closed-form: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_four_vertices_per_face() {
        let data = cube(2.0, None);
        assert_eq!(data.vertex_count(), 24);
        assert_eq!(data.index_count(), 36);
    }

    #[test]
    fn ground_plane_is_one_quad() {
        let data = ground_plane(50.0, None);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.index_count(), 6);
    }

    #[test]
    fn sphere_triangle_count_matches_grid() {
        let data = uv_sphere(1.0, 16, 8, None);
        assert_eq!(data.vertex_count(), 17 * 9);
        assert_eq!(data.index_count(), 16 * 8 * 6);
    }

    #[test]
    fn sphere_clamps_degenerate_tessellation() {
        let data = uv_sphere(1.0, 0, 0, None);
        assert_eq!(data.vertex_count(), 4 * 3);
    }
}
