//=========================================================================
// Primitive Shapes
//=========================================================================
//
// Ready-made meshes built through `MeshBuilder`. Every shape carries
// 3-component positions, 2-component uvs and normals.
//
//=========================================================================

use std::f32::consts::{PI, TAU};

use super::builder::MeshBuilder;
use super::mesh::{Mesh, MeshError};

//=== Cube ================================================================

/// One cube face: normal, then corners and uvs in winding order.
type Face = ([f32; 3], [([f32; 3], [f32; 2]); 4]);

const THIRD: f32 = 1.0 / 3.0;
const TWO_THIRDS: f32 = 2.0 / 3.0;

#[rustfmt::skip]
const CUBE_FACES: [Face; 6] = [
    // bottom
    ([0.0, -1.0, 0.0], [
        ([-1.0, -1.0, -1.0], [0.0, 0.0]),   ([1.0, -1.0, -1.0], [0.5, 0.0]),
        ([1.0, -1.0, 1.0], [0.5, THIRD]),   ([-1.0, -1.0, 1.0], [0.0, THIRD]),
    ]),
    // back
    ([0.0, 0.0, -1.0], [
        ([1.0, -1.0, -1.0], [0.5, 0.0]),    ([-1.0, -1.0, -1.0], [1.0, 0.0]),
        ([-1.0, 1.0, -1.0], [1.0, THIRD]),  ([1.0, 1.0, -1.0], [0.5, THIRD]),
    ]),
    // top
    ([0.0, 1.0, 0.0], [
        ([-1.0, 1.0, -1.0], [0.0, THIRD]),  ([1.0, 1.0, -1.0], [0.5, THIRD]),
        ([1.0, 1.0, 1.0], [0.5, TWO_THIRDS]), ([-1.0, 1.0, 1.0], [0.0, TWO_THIRDS]),
    ]),
    // front
    ([0.0, 0.0, 1.0], [
        ([1.0, -1.0, 1.0], [0.5, THIRD]),   ([-1.0, -1.0, 1.0], [1.0, THIRD]),
        ([-1.0, 1.0, 1.0], [1.0, TWO_THIRDS]), ([1.0, 1.0, 1.0], [0.5, TWO_THIRDS]),
    ]),
    // left
    ([-1.0, 0.0, 0.0], [
        ([-1.0, -1.0, 1.0], [0.0, TWO_THIRDS]), ([-1.0, -1.0, -1.0], [0.5, TWO_THIRDS]),
        ([-1.0, 1.0, -1.0], [0.5, 1.0]),    ([-1.0, 1.0, 1.0], [0.0, 1.0]),
    ]),
    // right
    ([1.0, 0.0, 0.0], [
        ([1.0, -1.0, 1.0], [0.5, TWO_THIRDS]), ([1.0, -1.0, -1.0], [1.0, TWO_THIRDS]),
        ([1.0, 1.0, -1.0], [1.0, 1.0]),     ([1.0, 1.0, 1.0], [0.5, 1.0]),
    ]),
];

/// Axis-aligned cube spanning [-1, 1] on every axis.
///
/// Each face has its own four vertices so normals stay flat. The uvs lay
/// the faces out as a 2 x 3 atlas.
pub fn cube() -> Result<Mesh, MeshError> {
    let mut builder = MeshBuilder::new();
    builder.reserve_vertices(24).reserve_indices(36);

    for (face, (normal, corners)) in CUBE_FACES.iter().enumerate() {
        for (position, uv) in corners {
            builder.add_position(*position).add_uv(*uv).add_normal(*normal);
        }
        let base = (face * 4) as u16;
        builder.add_face4(base, base + 1, base + 2, base + 3);
    }

    builder.build()
}

//=== Sphere ==============================================================

/// Unit UV sphere with `x_segments` slices around the vertical axis and
/// `y_segments` stacks from pole to pole.
///
/// # Panics
///
/// Panics if `x_segments < 3`, `y_segments < 2`, or the sphere needs more
/// vertices than 16-bit indices can address.
pub fn sphere(x_segments: u16, y_segments: u16) -> Result<Mesh, MeshError> {
    assert!(x_segments >= 3, "sphere needs at least 3 slices, got {}", x_segments);
    assert!(y_segments >= 2, "sphere needs at least 2 stacks, got {}", y_segments);

    let row = usize::from(x_segments) + 1;
    let vertices = row * (usize::from(y_segments) + 1);
    assert!(
        vertices <= usize::from(u16::MAX) + 1,
        "{} x {} segments need {} vertices; 16-bit indices address 65536",
        x_segments,
        y_segments,
        vertices
    );

    let mut builder = MeshBuilder::new();
    builder
        .reserve_vertices(vertices)
        .reserve_indices(usize::from(x_segments) * usize::from(y_segments) * 6);

    for y in 0..=y_segments {
        let v = f32::from(y) / f32::from(y_segments);
        for x in 0..=x_segments {
            let u = f32::from(x) / f32::from(x_segments);
            let point = [
                (u * TAU).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * TAU).sin() * (v * PI).sin(),
            ];
            builder.add_position(point).add_uv([u, v]).add_normal(point);
        }
    }

    // Indices stay below `vertices`, which fits in u16.
    let row = row as u16;
    for y in 0..y_segments {
        for x in 0..x_segments {
            let upper = y * row + x;
            let lower = (y + 1) * row + x;
            builder.add_face4(lower, upper, upper + 1, lower + 1);
        }
    }

    builder.build()
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::layout::VertexAttribute;

    fn position(mesh: &Mesh, vertex: usize) -> [f32; 3] {
        let stride = mesh.layout().stride() as usize;
        let bytes = &mesh.vertex_bytes()[vertex * stride..];
        [0, 4, 8].map(|at| f32::from_ne_bytes(bytes[at..at + 4].try_into().expect("4 bytes")))
    }

    #[test]
    fn cube_has_flat_faces() {
        let mesh = cube().expect("cube");

        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        // positions 0..12, uvs 12..20, normals 20..26 -> 28
        assert_eq!(mesh.layout().stride(), 28);
        assert!(!mesh.layout().has(VertexAttribute::Colors));
        assert_eq!(&mesh.indices()[30..], &[20, 21, 22, 22, 23, 20]);
    }

    #[test]
    fn cube_corners_lie_on_the_unit_box() {
        let mesh = cube().expect("cube");

        for vertex in 0..mesh.vertex_count() {
            assert!(position(&mesh, vertex).iter().all(|c| c.abs() == 1.0));
        }
    }

    #[test]
    fn sphere_counts_and_poles() {
        let mesh = sphere(8, 4).expect("sphere");

        assert_eq!(mesh.vertex_count(), 9 * 5);
        assert_eq!(mesh.index_count(), 8 * 4 * 6);

        let north = position(&mesh, 0);
        let south = position(&mesh, mesh.vertex_count() - 1);
        assert!((north[1] - 1.0).abs() < 1e-6);
        assert!((south[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn sphere_vertices_are_on_the_unit_sphere() {
        let mesh = sphere(12, 6).expect("sphere");

        for vertex in 0..mesh.vertex_count() {
            let [x, y, z] = position(&mesh, vertex);
            assert!(((x * x + y * y + z * z).sqrt() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    #[should_panic(expected = "16-bit indices address 65536")]
    fn oversized_sphere_panics() {
        let _ = sphere(300, 300);
    }
}
