//=========================================================================
// GPU Mesh
//=========================================================================
//
// Move-only owner of a vertex array, a vertex buffer and an element
// buffer built from a `Mesh`.
//
// Construction:
//   1. Allocate and bind the vertex array
//   2. Allocate vertex and element buffers
//   3. Upload vertex bytes (static), describe each present attribute
//   4. Upload indices (static), cache topology and index count
//
// Every handle is held by a scope guard until construction succeeds, so
// a failure at any step releases what was already allocated: buffers
// first, then the vertex array.
//
// Drawing binds the vertex array and issues one indexed draw. No other
// GL state is touched.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::num::NonZeroU32;
use std::rc::Rc;

use log::{debug, error};

//=== Internal Dependencies ===============================================

use super::api::{GlApi, GlError};
use super::constants::{
    GLenum, GLint, GLsizei, ARRAY_BUFFER, ELEMENT_ARRAY_BUFFER, STATIC_DRAW, UNSIGNED_SHORT,
};
use super::conversions::IntoGl;
use crate::core::ScopeGuard;
use crate::render::layout::VertexLayout;
use crate::render::mesh::Mesh;

//=== GpuError ============================================================

/// GPU object owned by a `GpuMesh`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpuObject {
    VertexArray,
    VertexBuffer,
    ElementBuffer,
}

impl fmt::Display for GpuObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::VertexArray => "vertex array",
            Self::VertexBuffer => "vertex buffer",
            Self::ElementBuffer => "element buffer",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// No name could be allocated for the object.
    Allocation(GpuObject),

    /// Uploading data into the buffer failed.
    Upload { object: GpuObject, source: GlError },

    /// Index count exceeds what a single draw call can address.
    IndexCount(usize),

    /// Vertex stride does not fit the backend's signed size type.
    Stride(u32),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation(object) => write!(f, "Failed to allocate {}", object),
            Self::Upload { object, source } => write!(f, "Failed to upload {}: {}", object, source),
            Self::IndexCount(count) => write!(f, "{} indices exceed a single draw call", count),
            Self::Stride(stride) => write!(f, "Vertex stride {} exceeds the backend limit", stride),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Upload { source, .. } => Some(source),
            _ => None,
        }
    }
}

//=== GpuMesh =============================================================

/// Uploaded mesh. Not `Clone`; dropping it deletes its three handles.
pub struct GpuMesh<G: GlApi> {
    gl: Rc<G>,
    vertex_array: NonZeroU32,
    vertex_buffer: NonZeroU32,
    element_buffer: NonZeroU32,
    topology: GLenum,
    index_count: GLsizei,
}

impl<G: GlApi> GpuMesh<G> {
    /// Uploads `mesh`. On error no handle outlives the call.
    pub fn from_mesh(gl: &Rc<G>, mesh: &Mesh) -> Result<Self, GpuError> {
        let index_count =
            GLsizei::try_from(mesh.index_count()).map_err(|_| GpuError::IndexCount(mesh.index_count()))?;
        let layout = mesh.layout();
        let stride = attribute_stride(layout)?;

        //--- Handles ------------------------------------------------------

        let vertex_array = allocate(gl.create_vertex_array(), GpuObject::VertexArray)?;
        let vertex_array_guard = ScopeGuard::new(|| gl.delete_vertex_array(vertex_array));

        gl.bind_vertex_array(Some(vertex_array));
        let _unbind = ScopeGuard::new(|| gl.bind_vertex_array(None));

        let vertex_buffer = allocate(gl.create_buffer(), GpuObject::VertexBuffer)?;
        let vertex_buffer_guard = ScopeGuard::new(|| gl.delete_buffer(vertex_buffer));

        let element_buffer = allocate(gl.create_buffer(), GpuObject::ElementBuffer)?;
        let element_buffer_guard = ScopeGuard::new(|| gl.delete_buffer(element_buffer));

        //--- Vertex data --------------------------------------------------

        gl.bind_buffer(ARRAY_BUFFER, Some(vertex_buffer));
        upload(&**gl, ARRAY_BUFFER, mesh.vertex_bytes(), GpuObject::VertexBuffer)?;

        for (attribute, placement) in layout.iter() {
            let slot = attribute.slot();
            gl.enable_vertex_attrib_array(slot);
            gl.vertex_attrib_pointer(
                slot,
                GLint::from(placement.components),
                attribute.element_type().into_gl(),
                attribute.normalized(),
                stride,
                placement.offset as usize,
            );
        }

        //--- Index data ---------------------------------------------------

        gl.bind_buffer(ELEMENT_ARRAY_BUFFER, Some(element_buffer));
        upload(
            &**gl,
            ELEMENT_ARRAY_BUFFER,
            bytemuck::cast_slice(mesh.indices()),
            GpuObject::ElementBuffer,
        )?;

        element_buffer_guard.dismiss();
        vertex_buffer_guard.dismiss();
        vertex_array_guard.dismiss();

        debug!(
            target: "gl",
            "Mesh uploaded: vao {} vbo {} ebo {} ({} vertices, {} indices)",
            vertex_array,
            vertex_buffer,
            element_buffer,
            mesh.vertex_count(),
            index_count
        );

        Ok(Self {
            gl: Rc::clone(gl),
            vertex_array,
            vertex_buffer,
            element_buffer,
            topology: mesh.topology().into_gl(),
            index_count,
        })
    }

    /// Binds the vertex array and draws all indices.
    pub fn draw(&self) {
        self.gl.bind_vertex_array(Some(self.vertex_array));
        self.gl
            .draw_elements(self.topology, self.index_count, UNSIGNED_SHORT, 0);
    }

    //--- Query API --------------------------------------------------------

    pub fn vertex_array(&self) -> NonZeroU32 {
        self.vertex_array
    }

    pub fn vertex_buffer(&self) -> NonZeroU32 {
        self.vertex_buffer
    }

    pub fn element_buffer(&self) -> NonZeroU32 {
        self.element_buffer
    }

    /// GL primitive mode used by `draw`.
    pub fn topology(&self) -> GLenum {
        self.topology
    }

    pub fn index_count(&self) -> GLsizei {
        self.index_count
    }
}

impl<G: GlApi> Drop for GpuMesh<G> {
    fn drop(&mut self) {
        self.gl.delete_buffer(self.vertex_buffer);
        self.gl.delete_buffer(self.element_buffer);
        self.gl.delete_vertex_array(self.vertex_array);
        debug!(target: "gl", "Mesh released: vao {}", self.vertex_array);
    }
}

impl<G: GlApi> fmt::Debug for GpuMesh<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuMesh")
            .field("vertex_array", &self.vertex_array)
            .field("vertex_buffer", &self.vertex_buffer)
            .field("element_buffer", &self.element_buffer)
            .field("topology", &format_args!("{:#06x}", self.topology))
            .field("index_count", &self.index_count)
            .finish()
    }
}

//=== Helpers =============================================================

fn allocate(handle: Option<NonZeroU32>, object: GpuObject) -> Result<NonZeroU32, GpuError> {
    handle.ok_or_else(|| {
        error!(target: "gl", "Failed to allocate {}", object);
        GpuError::Allocation(object)
    })
}

fn attribute_stride(layout: &VertexLayout) -> Result<GLsizei, GpuError> {
    GLsizei::try_from(layout.stride()).map_err(|_| GpuError::Stride(layout.stride()))
}

fn upload<G: GlApi>(gl: &G, target: GLenum, data: &[u8], object: GpuObject) -> Result<(), GpuError> {
    gl.buffer_data(target, data, STATIC_DRAW).map_err(|source| {
        error!(target: "gl", "Failed to upload {}: {}", object, source);
        GpuError::Upload { object, source }
    })
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gl::constants::{FLOAT, LINE_STRIP_ADJACENCY, SHORT, TRIANGLES};
    use crate::render::gl::recording::{FailurePoint, GlCall, RecordingGl};
    use crate::render::topology::PrimitiveTopology;

    /// 3 vertices, stride 32: positions(3 f32)@0, uvs(2 f32)@12, normals(3 i16)@20.
    fn textured_triangle() -> Mesh {
        let layout = VertexLayout::builder(32)
            .positions(3, 0)
            .uvs(2, 12)
            .normals(3, 20)
            .build()
            .expect("layout");
        Mesh::new(vec![0u8; 96], vec![0, 1, 2], PrimitiveTopology::Triangles, layout).expect("mesh")
    }

    fn count(gl: &RecordingGl, matches: impl Fn(&GlCall) -> bool) -> usize {
        gl.calls().iter().filter(|c| matches(c)).count()
    }

    //--- Lifecycle --------------------------------------------------------

    #[test]
    fn lifecycle_allocates_and_releases_exactly_once() {
        let gl = Rc::new(RecordingGl::new());

        let mesh = GpuMesh::from_mesh(&gl, &textured_triangle()).expect("upload");
        assert_eq!(gl.live_vertex_arrays(), 1);
        assert_eq!(gl.live_buffers(), 2);
        assert_eq!(count(&gl, |c| matches!(c, GlCall::CreateVertexArray(_))), 1);
        assert_eq!(count(&gl, |c| matches!(c, GlCall::CreateBuffer(_))), 2);

        let handles = [mesh.vertex_array(), mesh.vertex_buffer(), mesh.element_buffer()];
        drop(mesh);

        assert_eq!(gl.live_handles(), 0);
        let deleted: Vec<u32> = gl
            .calls()
            .iter()
            .filter_map(|c| match c {
                GlCall::DeleteVertexArray(h) | GlCall::DeleteBuffer(h) => Some(*h),
                _ => None,
            })
            .collect();
        assert_eq!(deleted, vec![handles[1].get(), handles[2].get(), handles[0].get()]);
    }

    #[test]
    fn attributes_follow_the_slot_table() {
        let gl = Rc::new(RecordingGl::new());
        let _mesh = GpuMesh::from_mesh(&gl, &textured_triangle()).expect("upload");

        let pointers: Vec<GlCall> = gl
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GlCall::VertexAttribPointer { .. }))
            .collect();

        assert_eq!(
            pointers,
            vec![
                GlCall::VertexAttribPointer { index: 0, size: 3, element_type: FLOAT, normalized: false, stride: 32, offset: 0 },
                GlCall::VertexAttribPointer { index: 2, size: 2, element_type: FLOAT, normalized: false, stride: 32, offset: 12 },
                GlCall::VertexAttribPointer { index: 3, size: 3, element_type: SHORT, normalized: true, stride: 32, offset: 20 },
            ]
        );
        assert_eq!(count(&gl, |c| matches!(c, GlCall::EnableVertexAttribArray(_))), 3);
    }

    #[test]
    fn uploads_are_static_and_sized() {
        let gl = Rc::new(RecordingGl::new());
        let _mesh = GpuMesh::from_mesh(&gl, &textured_triangle()).expect("upload");

        let uploads: Vec<GlCall> = gl
            .calls()
            .into_iter()
            .filter(|c| matches!(c, GlCall::BufferData { .. }))
            .collect();

        assert_eq!(
            uploads,
            vec![
                GlCall::BufferData { target: ARRAY_BUFFER, len: 96, usage: STATIC_DRAW },
                GlCall::BufferData { target: ELEMENT_ARRAY_BUFFER, len: 6, usage: STATIC_DRAW },
            ]
        );
    }

    #[test]
    fn draw_binds_and_issues_one_indexed_call() {
        let gl = Rc::new(RecordingGl::new());
        let mesh = GpuMesh::from_mesh(&gl, &textured_triangle()).expect("upload");
        gl.clear_calls();

        mesh.draw();

        assert_eq!(
            gl.calls(),
            vec![
                GlCall::BindVertexArray(Some(mesh.vertex_array().get())),
                GlCall::DrawElements { mode: TRIANGLES, count: 3, index_type: UNSIGNED_SHORT, offset: 0 },
            ]
        );
    }

    #[test]
    fn topology_is_cached_as_backend_constant() {
        let gl = Rc::new(RecordingGl::new());
        let layout = VertexLayout::builder(12).positions(3, 0).build().expect("layout");
        let mesh = Mesh::new(vec![0u8; 48], vec![0, 1, 2, 3], PrimitiveTopology::LineStripAdjacency, layout)
            .expect("mesh");

        let gpu = GpuMesh::from_mesh(&gl, &mesh).expect("upload");

        assert_eq!(gpu.topology(), LINE_STRIP_ADJACENCY);
        assert_eq!(gpu.index_count(), 4);
    }

    //--- Ownership --------------------------------------------------------

    #[test]
    fn moved_mesh_releases_once() {
        let gl = Rc::new(RecordingGl::new());
        let original = GpuMesh::from_mesh(&gl, &textured_triangle()).expect("upload");

        let mut owners = Vec::new();
        owners.push(original);
        let moved = owners.pop().expect("mesh");
        assert_eq!(gl.live_handles(), 3);

        drop(moved);

        assert_eq!(count(&gl, |c| matches!(c, GlCall::DeleteVertexArray(_))), 1);
        assert_eq!(count(&gl, |c| matches!(c, GlCall::DeleteBuffer(_))), 2);
        assert_eq!(gl.live_handles(), 0);
    }

    //--- Failure injection ------------------------------------------------

    #[test]
    fn construction_is_all_or_nothing() {
        let points = [
            FailurePoint::VertexArray,
            FailurePoint::Buffer(0),
            FailurePoint::Buffer(1),
            FailurePoint::Upload(0),
            FailurePoint::Upload(1),
        ];

        for point in points {
            let gl = Rc::new(RecordingGl::failing_at(point));

            let result = GpuMesh::from_mesh(&gl, &textured_triangle());

            assert!(result.is_err(), "{:?} should fail", point);
            assert_eq!(gl.live_handles(), 0, "{:?} leaked handles", point);
        }
    }

    #[test]
    fn failure_reports_the_failing_object() {
        let gl = Rc::new(RecordingGl::failing_at(FailurePoint::Buffer(1)));
        let err = GpuMesh::from_mesh(&gl, &textured_triangle()).unwrap_err();
        assert_eq!(err, GpuError::Allocation(GpuObject::ElementBuffer));

        let gl = Rc::new(RecordingGl::failing_at(FailurePoint::Upload(1)));
        let err = GpuMesh::from_mesh(&gl, &textured_triangle()).unwrap_err();
        assert_eq!(err, GpuError::Upload { object: GpuObject::ElementBuffer, source: GlError::OUT_OF_MEMORY });
    }

    #[test]
    fn failed_construction_releases_buffers_before_vertex_array() {
        let gl = Rc::new(RecordingGl::failing_at(FailurePoint::Upload(0)));

        let _ = GpuMesh::from_mesh(&gl, &textured_triangle());

        let releases: Vec<GlCall> = gl
            .calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    GlCall::DeleteBuffer(_) | GlCall::DeleteVertexArray(_) | GlCall::BindVertexArray(None)
                )
            })
            .collect();

        assert_eq!(
            releases,
            vec![
                GlCall::DeleteBuffer(3),
                GlCall::DeleteBuffer(2),
                GlCall::BindVertexArray(None),
                GlCall::DeleteVertexArray(1),
            ]
        );
    }

    #[test]
    fn oversized_stride_is_rejected_before_conversion_wraps() {
        let layout = VertexLayout::builder(u32::MAX).positions(3, 0).build().expect("layout");
        assert_eq!(attribute_stride(&layout), Err(GpuError::Stride(u32::MAX)));

        let widest = VertexLayout::builder(i32::MAX as u32).positions(3, 0).build().expect("layout");
        assert_eq!(attribute_stride(&widest), Ok(i32::MAX));
    }
}
