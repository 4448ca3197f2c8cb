//=========================================================================
// Render Subsystem
//
// Backend-neutral mesh and material descriptions, plus the OpenGL
// translation and mesh lifecycle under `gl`.
//
// Data flow:
// ```text
//  VertexLayout ─┐
//  vertex bytes ─┼─→ Mesh (validated, immutable) ──from_mesh──→ GpuMesh<G> ──draw()
//  indices (u16)─┘     ↑                                        (owns VAO/VBO/EBO)
//                      │
//  MeshBuilder ────────┘  typed attributes, packed and interleaved
//  shapes::{cube, sphere}
// ```
//
//=========================================================================

pub mod builder;
pub mod gl;
pub mod layout;
pub mod material;
pub mod mesh;
pub mod shapes;
pub mod topology;

pub use builder::MeshBuilder;
pub use layout::{AttributeCounts, AttributeLayout, ElementType, LayoutError, VertexAttribute, VertexLayout, VertexLayoutBuilder};
pub use material::{BlendEquation, BlendFactor, CullFace, DepthCompare};
pub use mesh::{Mesh, MeshError};
pub use topology::{FillMode, PrimitiveTopology};
