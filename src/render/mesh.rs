//=========================================================================
// Mesh Resource
//=========================================================================
//
// Immutable CPU-side mesh: interleaved vertex bytes, 16-bit indices, a
// topology and the layout describing the bytes. Validated once at
// construction; a `Mesh` that exists is always uploadable.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::mem;

use bytemuck::Pod;

//=== Internal Dependencies ===============================================

use super::layout::{LayoutError, VertexAttribute, VertexLayout};
use super::topology::PrimitiveTopology;

//=== MeshError ===========================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    Layout(LayoutError),

    /// Vertex byte length is not a whole number of vertices.
    VertexBytes { len: usize, stride: u32 },

    /// Typed vertex size disagrees with the layout stride.
    VertexSize { size: usize, stride: u32 },

    EmptyIndices,

    /// Index count is not a multiple the topology accepts.
    IndexCount {
        count: usize,
        topology: PrimitiveTopology,
        multiple: usize,
    },

    IndexOutOfRange { index: u16, vertex_count: usize },

    /// An attribute stream has a different vertex count than positions.
    AttributeCount {
        attribute: VertexAttribute,
        count: usize,
        vertex_count: usize,
    },
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Layout(e) => write!(f, "Invalid vertex layout: {}", e),
            Self::VertexBytes { len, stride } => {
                write!(f, "{} vertex bytes is not a multiple of stride {}", len, stride)
            }
            Self::VertexSize { size, stride } => {
                write!(f, "Vertex type is {} bytes but the stride is {}", size, stride)
            }
            Self::EmptyIndices => write!(f, "Mesh has no indices"),
            Self::IndexCount { count, topology, multiple } => write!(
                f,
                "{} indices for {:?}; expected a multiple of {}",
                count, topology, multiple
            ),
            Self::IndexOutOfRange { index, vertex_count } => {
                write!(f, "Index {} out of range for {} vertices", index, vertex_count)
            }
            Self::AttributeCount { attribute, count, vertex_count } => write!(
                f,
                "{} {} given for {} vertices",
                count, attribute, vertex_count
            ),
        }
    }
}

impl std::error::Error for MeshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Layout(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LayoutError> for MeshError {
    fn from(e: LayoutError) -> Self {
        Self::Layout(e)
    }
}

//=== Mesh ================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    vertices: Vec<u8>,
    indices: Vec<u16>,
    topology: PrimitiveTopology,
    layout: VertexLayout,
}

impl Mesh {
    /// Builds a mesh from raw interleaved bytes.
    pub fn new(
        vertices: impl Into<Vec<u8>>,
        indices: impl Into<Vec<u16>>,
        topology: PrimitiveTopology,
        layout: VertexLayout,
    ) -> Result<Self, MeshError> {
        let vertices = vertices.into();
        let indices = indices.into();
        let stride = layout.stride() as usize;

        if vertices.len() % stride != 0 {
            return Err(MeshError::VertexBytes {
                len: vertices.len(),
                stride: layout.stride(),
            });
        }

        if indices.is_empty() {
            return Err(MeshError::EmptyIndices);
        }

        let multiple = topology.index_multiple();
        if indices.len() % multiple != 0 {
            return Err(MeshError::IndexCount {
                count: indices.len(),
                topology,
                multiple,
            });
        }

        let vertex_count = vertices.len() / stride;
        if let Some(&index) = indices.iter().find(|&&i| usize::from(i) >= vertex_count) {
            return Err(MeshError::IndexOutOfRange { index, vertex_count });
        }

        Ok(Self {
            vertices,
            indices,
            topology,
            layout,
        })
    }

    /// Builds a mesh from typed vertices whose size equals the stride.
    pub fn from_vertices<V: Pod>(
        vertices: &[V],
        indices: impl Into<Vec<u16>>,
        topology: PrimitiveTopology,
        layout: VertexLayout,
    ) -> Result<Self, MeshError> {
        let size = mem::size_of::<V>();
        if size != layout.stride() as usize {
            return Err(MeshError::VertexSize {
                size,
                stride: layout.stride(),
            });
        }

        Self::new(bytemuck::cast_slice::<V, u8>(vertices).to_vec(), indices, topology, layout)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride() as usize
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
