//=========================================================================
// Mesh Builder
//=========================================================================
//
// Typed front end for `Mesh`. Attributes are collected per stream and
// interleaved on `build` according to `VertexLayout::interleaved`.
//
// Packed formats:
//   positions, uvs      f32 x N
//   colors              u8 x 4 (RGBA)
//   normals, tangents,  i16 x 3, each component `x * i16::MAX`, followed
//   bitangents          by 2 bytes of padding from the 4-byte alignment
//
// Quads are split into (i0, i1, i2) and (i2, i3, i0).
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::layout::{AttributeCounts, AttributeLayout, VertexAttribute, VertexLayout};
use super::mesh::{Mesh, MeshError};
use super::topology::PrimitiveTopology;

//=== Constants ===========================================================

const COLOR_COMPONENTS: u8 = 4;
const DIRECTION_COMPONENTS: u8 = 3;

//=== MeshBuilder =========================================================

/// Accumulates typed vertex attributes and indices into a [`Mesh`].
///
/// Every attribute stream that is used must end up with one entry per
/// position; `build` reports a mismatch as [`MeshError::AttributeCount`].
///
/// # Examples
///
/// ```
/// use lodestone::render::MeshBuilder;
///
/// let mut builder = MeshBuilder::new();
/// builder
///     .add_position([-1.0, -1.0])
///     .add_position([1.0, -1.0])
///     .add_position([1.0, 1.0])
///     .add_position([-1.0, 1.0])
///     .add_face4(0, 1, 2, 3);
///
/// let mesh = builder.build().expect("valid quad");
/// assert_eq!(mesh.index_count(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    topology: PrimitiveTopology,
    position_components: u8,
    uv_components: u8,
    positions: Vec<f32>,
    colors: Vec<[u8; 4]>,
    uvs: Vec<f32>,
    normals: Vec<[i16; 3]>,
    tangents: Vec<[i16; 3]>,
    bitangents: Vec<[i16; 3]>,
    indices: Vec<u16>,
}

impl MeshBuilder {
    /// Starts an empty triangle-list mesh.
    pub fn new() -> Self {
        Self::with_topology(PrimitiveTopology::Triangles)
    }

    pub fn with_topology(topology: PrimitiveTopology) -> Self {
        Self {
            topology,
            position_components: 0,
            uv_components: 0,
            positions: Vec::new(),
            colors: Vec::new(),
            uvs: Vec::new(),
            normals: Vec::new(),
            tangents: Vec::new(),
            bitangents: Vec::new(),
            indices: Vec::new(),
        }
    }

    //--- Capacity ---------------------------------------------------------

    /// Reserves room for `n` three-component positions.
    pub fn reserve_vertices(&mut self, n: usize) -> &mut Self {
        self.positions.reserve(n * 3);
        self
    }

    pub fn reserve_indices(&mut self, n: usize) -> &mut Self {
        self.indices.reserve(n);
        self
    }

    //--- Attributes -------------------------------------------------------

    /// Appends a position of `N` components.
    ///
    /// # Panics
    ///
    /// Panics if `N` is not in `1..=4` or differs from earlier positions.
    pub fn add_position<const N: usize>(&mut self, position: [f32; N]) -> &mut Self {
        self.position_components = fixed_width(self.position_components, N, VertexAttribute::Positions);
        self.positions.extend_from_slice(&position);
        self
    }

    /// Appends an RGBA color, one byte per channel.
    pub fn add_color(&mut self, rgba: [u8; 4]) -> &mut Self {
        self.colors.push(rgba);
        self
    }

    /// Appends a color given as `0xRRGGBBAA`.
    pub fn add_color_rgba32(&mut self, rgba: u32) -> &mut Self {
        self.add_color(rgba.to_be_bytes())
    }

    /// Appends a texture coordinate of `N` components.
    ///
    /// # Panics
    ///
    /// Panics if `N` is not in `1..=3` or differs from earlier coordinates.
    pub fn add_uv<const N: usize>(&mut self, uv: [f32; N]) -> &mut Self {
        self.uv_components = fixed_width(self.uv_components, N, VertexAttribute::Uvs);
        self.uvs.extend_from_slice(&uv);
        self
    }

    /// Components outside [-1, 1] are clamped before compression.
    pub fn add_normal(&mut self, normal: [f32; 3]) -> &mut Self {
        self.normals.push(compress(normal));
        self
    }

    pub fn add_tangent(&mut self, tangent: [f32; 3]) -> &mut Self {
        self.tangents.push(compress(tangent));
        self
    }

    pub fn add_bitangent(&mut self, bitangent: [f32; 3]) -> &mut Self {
        self.bitangents.push(compress(bitangent));
        self
    }

    //--- Indices ----------------------------------------------------------

    pub fn add_index(&mut self, index: u16) -> &mut Self {
        self.indices.push(index);
        self
    }

    pub fn add_face(&mut self, i0: u16, i1: u16, i2: u16) -> &mut Self {
        self.indices.extend_from_slice(&[i0, i1, i2]);
        self
    }

    /// Splits the quad into (i0, i1, i2) and (i2, i3, i0).
    pub fn add_face4(&mut self, i0: u16, i1: u16, i2: u16, i3: u16) -> &mut Self {
        self.add_face(i0, i1, i2).add_face(i2, i3, i0)
    }

    //--- Query API --------------------------------------------------------

    pub fn vertex_count(&self) -> usize {
        match self.position_components {
            0 => 0,
            n => self.positions.len() / usize::from(n),
        }
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    //--- Build ------------------------------------------------------------

    /// Interleaves the collected streams and validates the result.
    pub fn build(&self) -> Result<Mesh, MeshError> {
        let vertex_count = self.vertex_count();
        let counts = AttributeCounts {
            positions: self.position_components,
            colors: self.stream_width(VertexAttribute::Colors, self.colors.len(), COLOR_COMPONENTS)?,
            uvs: match self.uv_components {
                0 => 0,
                n => self.stream_width(VertexAttribute::Uvs, self.uvs.len() / usize::from(n), n)?,
            },
            normals: self.stream_width(VertexAttribute::Normals, self.normals.len(), DIRECTION_COMPONENTS)?,
            tangents: self.stream_width(VertexAttribute::Tangents, self.tangents.len(), DIRECTION_COMPONENTS)?,
            bitangents: self.stream_width(VertexAttribute::Bitangents, self.bitangents.len(), DIRECTION_COMPONENTS)?,
        };

        let layout = VertexLayout::interleaved(counts)?;
        let stride = layout.stride() as usize;
        let mut vertices = vec![0u8; stride * vertex_count];

        for (attribute, placement) in layout.iter() {
            for (index, vertex) in vertices.chunks_exact_mut(stride).enumerate() {
                let slot = &mut vertex[placement.offset as usize..];
                self.pack(attribute, placement, index, slot);
            }
        }

        Mesh::new(vertices, self.indices.clone(), self.topology, layout)
    }

    //--- Internal Helpers -------------------------------------------------

    /// Component count for a stream, or 0 when it was never used.
    fn stream_width(&self, attribute: VertexAttribute, len: usize, components: u8) -> Result<u8, MeshError> {
        let vertex_count = self.vertex_count();
        match len {
            0 => Ok(0),
            n if n == vertex_count => Ok(components),
            count => Err(MeshError::AttributeCount { attribute, count, vertex_count }),
        }
    }

    fn pack(&self, attribute: VertexAttribute, placement: AttributeLayout, index: usize, out: &mut [u8]) {
        let n = usize::from(placement.components);
        match attribute {
            VertexAttribute::Positions => write_floats(&self.positions[index * n..(index + 1) * n], out),
            VertexAttribute::Uvs => write_floats(&self.uvs[index * n..(index + 1) * n], out),
            VertexAttribute::Colors => out[..4].copy_from_slice(&self.colors[index]),
            VertexAttribute::Normals => write_shorts(&self.normals[index], out),
            VertexAttribute::Tangents => write_shorts(&self.tangents[index], out),
            VertexAttribute::Bitangents => write_shorts(&self.bitangents[index], out),
        }
    }
}

impl Default for MeshBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Helpers =============================================================

fn fixed_width(current: u8, width: usize, attribute: VertexAttribute) -> u8 {
    let max = attribute.max_components();
    assert!(
        (1..=usize::from(max)).contains(&width),
        "{} take 1 to {} components, got {}",
        attribute,
        max,
        width
    );
    let width = width as u8;
    assert!(
        current == 0 || current == width,
        "{} were started with {} components, got {}",
        attribute,
        current,
        width
    );
    width
}

/// Maps a unit-range direction onto the full `i16` range.
fn compress(v: [f32; 3]) -> [i16; 3] {
    v.map(|x| (x.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)
}

fn write_floats(values: &[f32], out: &mut [u8]) {
    for (value, bytes) in values.iter().zip(out.chunks_exact_mut(4)) {
        bytes.copy_from_slice(&value.to_ne_bytes());
    }
}

fn write_shorts(values: &[i16; 3], out: &mut [u8]) {
    for (value, bytes) in values.iter().zip(out.chunks_exact_mut(2)) {
        bytes.copy_from_slice(&value.to_ne_bytes());
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn read_f32(bytes: &[u8], at: usize) -> f32 {
        f32::from_ne_bytes(bytes[at..at + 4].try_into().expect("4 bytes"))
    }

    fn read_i16(bytes: &[u8], at: usize) -> i16 {
        i16::from_ne_bytes(bytes[at..at + 2].try_into().expect("2 bytes"))
    }

    fn lit_triangle() -> MeshBuilder {
        let mut builder = MeshBuilder::new();
        for (position, color) in [
            ([0.0, 0.0, 0.0], 0xFF00_00FF),
            ([1.0, 0.0, 0.0], 0x00FF_00FF),
            ([0.0, 1.0, 0.0], 0x0000_FFFF),
        ] {
            builder
                .add_position(position)
                .add_color_rgba32(color)
                .add_uv([position[0], position[1]])
                .add_normal([0.0, 0.0, 1.0]);
        }
        builder.add_face(0, 1, 2);
        builder
    }

    #[test]
    fn interleaves_attributes_at_layout_offsets() {
        let mesh = lit_triangle().build().expect("mesh");
        let layout = mesh.layout();

        // positions 0..12, colors 12..16, uvs 16..24, normals 24..30 -> 32
        assert_eq!(layout.stride(), 32);
        assert_eq!(mesh.vertex_count(), 3);

        let second = &mesh.vertex_bytes()[32..64];
        assert_eq!(read_f32(second, 0), 1.0);
        assert_eq!(&second[12..16], &[0x00, 0xFF, 0x00, 0xFF]);
        assert_eq!(read_f32(second, 16), 1.0);
        assert_eq!(read_f32(second, 20), 0.0);
        assert_eq!(read_i16(second, 28), i16::MAX);
        assert_eq!(&second[30..32], &[0, 0]);
    }

    #[test]
    fn directions_are_compressed_and_clamped() {
        assert_eq!(compress([1.0, -1.0, 0.0]), [i16::MAX, -i16::MAX, 0]);
        assert_eq!(compress([0.5, 2.0, -3.0]), [16383, i16::MAX, -i16::MAX]);
    }

    #[test]
    fn tangent_frames_use_their_own_slots() {
        let mut builder = MeshBuilder::new();
        for position in [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            builder
                .add_position(position)
                .add_normal([0.0, 0.0, 1.0])
                .add_tangent([1.0, 0.0, 0.0])
                .add_bitangent([0.0, 1.0, 0.0]);
        }
        builder.add_face(0, 1, 2);

        let mesh = builder.build().expect("mesh");
        let layout = mesh.layout();

        assert_eq!(layout.attribute(VertexAttribute::Tangents).map(|a| a.offset), Some(20));
        assert_eq!(layout.attribute(VertexAttribute::Bitangents).map(|a| a.offset), Some(28));
        assert_eq!(layout.stride(), 36);
        assert_eq!(read_i16(mesh.vertex_bytes(), 20), i16::MAX);
        assert_eq!(read_i16(mesh.vertex_bytes(), 30), i16::MAX);
    }

    #[test]
    fn quad_splits_into_two_triangles() {
        let mut builder = MeshBuilder::new();
        for position in [[0.0f32, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]] {
            builder.add_position(position);
        }
        builder.add_face4(0, 1, 2, 3);

        let mesh = builder.build().expect("mesh");

        assert_eq!(mesh.indices(), &[0, 1, 2, 2, 3, 0]);
        assert_eq!(mesh.layout().stride(), 8);
    }

    #[test]
    fn single_indices_respect_topology() {
        let mut builder = MeshBuilder::with_topology(PrimitiveTopology::LineStrip);
        builder.add_position([0.0f32, 0.0, 0.0]).add_position([1.0, 1.0, 1.0]);
        builder.add_index(0).add_index(1);

        let mesh = builder.build().expect("mesh");
        assert_eq!(mesh.topology(), PrimitiveTopology::LineStrip);
        assert_eq!(mesh.index_count(), 2);
    }

    #[test]
    fn short_attribute_stream_is_rejected() {
        let mut builder = lit_triangle();
        builder.add_position([2.0f32, 2.0, 2.0]);

        let err = builder.build().unwrap_err();

        assert_eq!(
            err,
            MeshError::AttributeCount { attribute: VertexAttribute::Colors, count: 3, vertex_count: 4 }
        );
    }

    #[test]
    fn indices_are_validated_like_raw_meshes() {
        let mut builder = MeshBuilder::new();
        builder.add_position([0.0f32, 0.0, 0.0]).add_face(0, 1, 2);

        assert!(matches!(builder.build(), Err(MeshError::IndexOutOfRange { index: 1, .. })));
    }

    #[test]
    #[should_panic(expected = "positions were started with 3 components")]
    fn mixed_position_widths_panic() {
        let mut builder = MeshBuilder::new();
        builder.add_position([0.0f32, 0.0, 0.0]).add_position([0.0, 0.0]);
    }

    #[test]
    #[should_panic(expected = "uvs take 1 to 3 components")]
    fn four_component_uvs_panic() {
        MeshBuilder::new().add_uv([0.0f32; 4]);
    }
}
