//=========================================================================
// GL Capability Interface
//=========================================================================
//
// The handful of GL entry points the mesh lifecycle needs. Function
// loading and context management live outside the crate; an application
// implements `GlApi` over its loaded function pointers.
//
// Handles are `NonZeroU32`: GL reserves 0 as "no object", so a live
// handle can never be confused with an unbound one.
//
// All methods take `&self`. GL is a per-context state machine reached
// from one thread, and meshes share the API through an `Rc`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::num::NonZeroU32;

//=== Internal Dependencies ===============================================

use super::constants::{GLenum, GLint, GLsizei, GLuint, INVALID_VALUE, OUT_OF_MEMORY};

//=== GlError =============================================================

/// A GL error code reported by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlError {
    pub code: GLenum,
}

impl GlError {
    pub const OUT_OF_MEMORY: GlError = GlError { code: OUT_OF_MEMORY };
}

impl fmt::Display for GlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            OUT_OF_MEMORY => write!(f, "GL_OUT_OF_MEMORY"),
            INVALID_VALUE => write!(f, "GL_INVALID_VALUE"),
            code => write!(f, "GL error {:#06x}", code),
        }
    }
}

impl std::error::Error for GlError {}

//=== GlApi ===============================================================

pub trait GlApi {
    //--- Vertex arrays ----------------------------------------------------

    /// `glGenVertexArrays(1)`; `None` if no name could be allocated.
    fn create_vertex_array(&self) -> Option<NonZeroU32>;

    fn delete_vertex_array(&self, vertex_array: NonZeroU32);

    /// `None` unbinds.
    fn bind_vertex_array(&self, vertex_array: Option<NonZeroU32>);

    //--- Buffers ----------------------------------------------------------

    fn create_buffer(&self) -> Option<NonZeroU32>;

    fn delete_buffer(&self, buffer: NonZeroU32);

    fn bind_buffer(&self, target: GLenum, buffer: Option<NonZeroU32>);

    /// Uploads `data` to the buffer bound at `target`.
    fn buffer_data(&self, target: GLenum, data: &[u8], usage: GLenum) -> Result<(), GlError>;

    //--- Attributes / drawing --------------------------------------------

    fn enable_vertex_attrib_array(&self, index: GLuint);

    /// `offset` is a byte offset into the bound array buffer.
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &self,
        index: GLuint,
        size: GLint,
        element_type: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: usize,
    );

    fn draw_elements(&self, mode: GLenum, count: GLsizei, index_type: GLenum, offset: usize);
}
