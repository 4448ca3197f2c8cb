//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use lodestone::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Application
pub use crate::app::{Application, ApplicationBuilder, FixedStep, RunHandle, Simulation};
pub use crate::core::{FrameTime, ScopeGuard};
pub use crate::logging::{init_logging, LoggingConfig};

// Events and the pump
pub use crate::io::{
    Event, EventKind, EventPayload, EventSink, Listener, MessagePump, PollStatus, PumpSource,
    SequenceDetector, UserEvent, WindowId,
};
pub use crate::io::{KeyCode, KeyState, Modifiers, MouseButton};

// Sources
pub use crate::io::{
    FilesystemMonitor, GlBackend, GlVersion, GlWindow, SwapInterval, Window, WindowBackend,
    WindowConfig, WindowError,
};

#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
pub use crate::platform::{WinitBackend, WinitContext};

// Rendering
pub use crate::render::gl::{GlApi, GpuMesh, IntoGl};
pub use crate::render::{Mesh, MeshBuilder, PrimitiveTopology, VertexAttribute, VertexLayout};
