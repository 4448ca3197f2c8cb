//=========================================================================
// OpenGL Backend
//
// - `constants`: GL enumerants used by the renderer
// - `api`: `GlApi`, the capability trait an application implements over
//   its loaded GL functions
// - `conversions`: `IntoGl`, engine enum → GL constant
// - `mesh`: `GpuMesh`, the move-only uploaded mesh
// - `recording`: `RecordingGl`, a headless `GlApi` for tests and tools
//
//=========================================================================

pub mod constants;

mod api;
mod conversions;
mod mesh;
mod recording;

pub use api::{GlApi, GlError};
pub use conversions::IntoGl;
pub use mesh::{GpuError, GpuMesh, GpuObject};
pub use recording::{FailurePoint, GlCall, RecordingGl};
