//=========================================================================
// I/O Subsystem
//
// Event model and the cooperative message pump, plus the sources that
// feed it.
//
// Architecture:
// ```text
//  ┌──────────────────┐   poll(sink)   ┌──────────────┐   on_event   ┌──────────┐
//  │ Window<B>        │ ─────────────→ │              │ ───────────→ │ Listener │
//  │ GlWindow<B>      │                │ MessagePump  │              │ Listener │
//  │ FilesystemMonitor│                │  (queue)     │ on_immediate │   ...    │
//  │ custom sources   │                │              │ ───────────→ │          │
//  └──────────────────┘                └──────────────┘              └──────────┘
// ```
//
//=========================================================================

//=== Submodules ==========================================================

pub mod event;
pub mod filesystem_monitor;
pub mod input;
pub mod message_pump;
pub mod sequence_detector;
pub mod window;

//=== Re-exports ==========================================================

pub use event::{Event, EventKind, EventPayload, UserEvent, WindowId, USER_EVENT_BASE};
pub use filesystem_monitor::{FilesystemMonitor, MonitorError};
pub use input::{KeyCode, KeyState, Modifiers, MouseButton};
pub use message_pump::{EventSink, Listener, MessagePump, PollStatus, PumpSource};
pub use sequence_detector::SequenceDetector;
pub use window::{
    BackendError, GlBackend, GlVersion, GlWindow, SwapInterval, Window, WindowBackend,
    WindowConfig, WindowError, WindowState,
};
