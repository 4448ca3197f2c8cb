//=========================================================================
// Recording GL Backend
//=========================================================================
//
// Headless `GlApi` that records every call, tracks which handles are
// alive and can be told to fail at a chosen allocation or upload. Used to
// test the mesh lifecycle without a context.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::num::NonZeroU32;

use log::trace;

//=== Internal Dependencies ===============================================

use super::api::{GlApi, GlError};
use super::constants::{GLenum, GLint, GLsizei, GLuint};

//=== GlCall ==============================================================

/// One recorded call. Handles are raw names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlCall {
    CreateVertexArray(u32),
    DeleteVertexArray(u32),
    BindVertexArray(Option<u32>),
    CreateBuffer(u32),
    DeleteBuffer(u32),
    BindBuffer {
        target: GLenum,
        buffer: Option<u32>,
    },
    BufferData {
        target: GLenum,
        len: usize,
        usage: GLenum,
    },
    EnableVertexAttribArray(GLuint),
    VertexAttribPointer {
        index: GLuint,
        size: GLint,
        element_type: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: usize,
    },
    DrawElements {
        mode: GLenum,
        count: GLsizei,
        index_type: GLenum,
        offset: usize,
    },
}

//=== FailurePoint ========================================================

/// Where the next failure is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// Vertex array allocation returns no name.
    VertexArray,
    /// The n-th buffer allocation (0-based) returns no name.
    Buffer(usize),
    /// The n-th upload (0-based) reports `GL_OUT_OF_MEMORY`.
    Upload(usize),
}

//=== RecordingGl =========================================================

#[derive(Debug, Default)]
pub struct RecordingGl {
    state: RefCell<Recording>,
}

#[derive(Debug, Default)]
struct Recording {
    next_name: u32,
    calls: Vec<GlCall>,
    vertex_arrays: BTreeSet<u32>,
    buffers: BTreeSet<u32>,
    buffers_created: usize,
    uploads: usize,
    failure: Option<FailurePoint>,
}

impl Recording {
    fn allocate(&mut self) -> NonZeroU32 {
        self.next_name += 1;
        NonZeroU32::MIN.saturating_add(self.next_name - 1)
    }
}

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that fails at `point`.
    pub fn failing_at(point: FailurePoint) -> Self {
        let gl = Self::default();
        gl.state.borrow_mut().failure = Some(point);
        gl
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    /// Vertex arrays plus buffers not yet deleted.
    pub fn live_handles(&self) -> usize {
        self.live_vertex_arrays() + self.live_buffers()
    }

    fn record(&self, call: GlCall) {
        trace!(target: "gl", "{:?}", call);
        self.state.borrow_mut().calls.push(call);
    }
}

impl GlApi for RecordingGl {
    fn create_vertex_array(&self) -> Option<NonZeroU32> {
        let name = {
            let mut state = self.state.borrow_mut();
            if state.failure == Some(FailurePoint::VertexArray) {
                return None;
            }
            let name = state.allocate();
            state.vertex_arrays.insert(name.get());
            name
        };
        self.record(GlCall::CreateVertexArray(name.get()));
        Some(name)
    }

    fn delete_vertex_array(&self, vertex_array: NonZeroU32) {
        self.state.borrow_mut().vertex_arrays.remove(&vertex_array.get());
        self.record(GlCall::DeleteVertexArray(vertex_array.get()));
    }

    fn bind_vertex_array(&self, vertex_array: Option<NonZeroU32>) {
        self.record(GlCall::BindVertexArray(vertex_array.map(NonZeroU32::get)));
    }

    fn create_buffer(&self) -> Option<NonZeroU32> {
        let name = {
            let mut state = self.state.borrow_mut();
            let nth = state.buffers_created;
            state.buffers_created += 1;
            if state.failure == Some(FailurePoint::Buffer(nth)) {
                return None;
            }
            let name = state.allocate();
            state.buffers.insert(name.get());
            name
        };
        self.record(GlCall::CreateBuffer(name.get()));
        Some(name)
    }

    fn delete_buffer(&self, buffer: NonZeroU32) {
        self.state.borrow_mut().buffers.remove(&buffer.get());
        self.record(GlCall::DeleteBuffer(buffer.get()));
    }

    fn bind_buffer(&self, target: GLenum, buffer: Option<NonZeroU32>) {
        self.record(GlCall::BindBuffer {
            target,
            buffer: buffer.map(NonZeroU32::get),
        });
    }

    fn buffer_data(&self, target: GLenum, data: &[u8], usage: GLenum) -> Result<(), GlError> {
        {
            let mut state = self.state.borrow_mut();
            let nth = state.uploads;
            state.uploads += 1;
            if state.failure == Some(FailurePoint::Upload(nth)) {
                return Err(GlError::OUT_OF_MEMORY);
            }
        }
        self.record(GlCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
        Ok(())
    }

    fn enable_vertex_attrib_array(&self, index: GLuint) {
        self.record(GlCall::EnableVertexAttribArray(index));
    }

    fn vertex_attrib_pointer(
        &self,
        index: GLuint,
        size: GLint,
        element_type: GLenum,
        normalized: bool,
        stride: GLsizei,
        offset: usize,
    ) {
        self.record(GlCall::VertexAttribPointer {
            index,
            size,
            element_type,
            normalized,
            stride,
            offset,
        });
    }

    fn draw_elements(&self, mode: GLenum, count: GLsizei, index_type: GLenum, offset: usize) {
        self.record(GlCall::DrawElements {
            mode,
            count,
            index_type,
            offset,
        });
    }
}
