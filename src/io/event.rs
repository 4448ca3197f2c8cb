//=========================================================================
// Event Model
//=========================================================================
//
// Closed tagged union of everything the message pump can transport.
//
// Architecture:
//   Window / Monitor / User source → Event → MessagePump → Listener
//
// Every built-in payload is a plain struct implementing `EventPayload`,
// which gives `Event::is::<T>()` and `Event::try_as::<T>()` without any
// runtime type information. User events carry a stable 16-bit tag and an
// immutable shared byte payload.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

//=== Internal Dependencies ===============================================

use super::input::{KeyCode, KeyState, Modifiers, MouseButton};

//=== WindowId ============================================================

/// Opaque identifier of the window an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

//=== Window Payloads =====================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowShow {
    pub window: WindowId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHide {
    pub window: WindowId,
}

/// Window moved; `x`/`y` are the new top-left position in screen space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMove {
    pub window: WindowId,
    pub x: i32,
    pub y: i32,
}

/// Window client area resized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowResize {
    pub window: WindowId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMinimize {
    pub window: WindowId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMaximize {
    pub window: WindowId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRestore {
    pub window: WindowId,
}

/// Close requested. Terminal for the window's state machine; the
/// application decides when to tear the window down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClose {
    pub window: WindowId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowFocus {
    pub window: WindowId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowUnfocus {
    pub window: WindowId,
}

//=== Filesystem Payloads =================================================

/// A file appeared under a watched root. `name` is relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileCreation {
    pub name: PathBuf,
}

/// A file disappeared from a watched root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRemoval {
    pub name: PathBuf,
}

/// A file under a watched root changed content or metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileUpdate {
    pub name: PathBuf,
}

//=== Input Payloads ======================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub window: WindowId,
    pub key: KeyCode,
    pub state: KeyState,
    pub modifiers: Modifiers,
}

/// Cursor position in window-relative logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseMove {
    pub window: WindowId,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MouseButtonInput {
    pub window: WindowId,
    pub button: MouseButton,
    pub state: KeyState,
    pub modifiers: Modifiers,
}

/// Scroll delta in lines.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseScroll {
    pub window: WindowId,
    pub horizontal: f32,
    pub vertical: f32,
}

//=== User Payload ========================================================

/// First tag available to application-defined events. Tags below this
/// value belong to the built-in kinds.
pub const USER_EVENT_BASE: u16 = 0x1000;

/// Opaque application event: a stable tag plus shared immutable bytes.
///
/// Cloning shares the payload, so user events stay cheap to copy across
/// listeners.
#[derive(Clone, PartialEq, Eq)]
pub struct UserEvent {
    kind: u16,
    payload: Arc<[u8]>,
}

impl UserEvent {
    /// Panics if `kind` falls inside the built-in id range.
    pub fn new(kind: u16, payload: impl Into<Arc<[u8]>>) -> Self {
        assert!(
            kind >= USER_EVENT_BASE,
            "user event kind must be >= {:#06x}, got {:#06x}",
            USER_EVENT_BASE,
            kind
        );
        Self {
            kind,
            payload: payload.into(),
        }
    }

    pub fn kind(&self) -> u16 {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl fmt::Debug for UserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEvent")
            .field("kind", &format_args!("{:#06x}", self.kind))
            .field("len", &self.payload.len())
            .finish()
    }
}

//=== EventPayload ========================================================

/// Implemented by every payload type the union can carry.
///
/// Drives the type-discriminated queries on `Event`.
pub trait EventPayload: Sized {
    const KIND: EventKind;

    fn extract(event: &Event) -> Option<&Self>;
}

//=== Event / EventKind ===================================================

macro_rules! event_union {
    ($($variant:ident($payload:ty) = $id:expr),* $(,)?) => {
        /// Every event the pump can transport.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Event {
            $($variant($payload),)*
        }

        /// Payload-free discriminant of `Event`.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum EventKind {
            $($variant,)*
        }

        impl EventKind {
            /// Every kind, in declaration order.
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant,)*];

            /// Stable 16-bit identifier. User events report
            /// `USER_EVENT_BASE` here; their own tag lives on the payload.
            pub const fn id(self) -> u16 {
                match self {
                    $(EventKind::$variant => $id,)*
                }
            }
        }

        impl Event {
            pub fn kind(&self) -> EventKind {
                match self {
                    $(Event::$variant(_) => EventKind::$variant,)*
                }
            }
        }

        $(
            impl EventPayload for $payload {
                const KIND: EventKind = EventKind::$variant;

                fn extract(event: &Event) -> Option<&Self> {
                    match event {
                        Event::$variant(payload) => Some(payload),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }

            impl From<$payload> for Event {
                fn from(payload: $payload) -> Self {
                    Event::$variant(payload)
                }
            }
        )*
    };
}

event_union! {
    WindowClose(WindowClose) = 0x0001,
    WindowShow(WindowShow) = 0x0002,
    WindowHide(WindowHide) = 0x0003,
    WindowMove(WindowMove) = 0x0004,
    WindowResize(WindowResize) = 0x0005,
    WindowMinimize(WindowMinimize) = 0x0006,
    WindowMaximize(WindowMaximize) = 0x0007,
    WindowRestore(WindowRestore) = 0x0008,
    WindowFocus(WindowFocus) = 0x0009,
    WindowUnfocus(WindowUnfocus) = 0x000A,
    FileCreation(FileCreation) = 0x0010,
    FileRemoval(FileRemoval) = 0x0011,
    FileUpdate(FileUpdate) = 0x0012,
    KeyInput(KeyInput) = 0x0020,
    MouseMove(MouseMove) = 0x0030,
    MouseButton(MouseButtonInput) = 0x0031,
    MouseScroll(MouseScroll) = 0x0032,
    User(UserEvent) = USER_EVENT_BASE,
}

impl Event {
    /// Stable identifier of this event. For user events, the user tag.
    pub fn id(&self) -> u16 {
        match self {
            Event::User(user) => user.kind(),
            other => other.kind().id(),
        }
    }

    /// Returns true if this event carries a payload of type `T`.
    pub fn is<T: EventPayload>(&self) -> bool {
        self.kind() == T::KIND
    }

    /// Borrows the payload as `T`, or `None` for any other kind.
    pub fn try_as<T: EventPayload>(&self) -> Option<&T> {
        T::extract(self)
    }

    /// The window this event concerns, if any.
    pub fn window(&self) -> Option<WindowId> {
        match self {
            Event::WindowClose(e) => Some(e.window),
            Event::WindowShow(e) => Some(e.window),
            Event::WindowHide(e) => Some(e.window),
            Event::WindowMove(e) => Some(e.window),
            Event::WindowResize(e) => Some(e.window),
            Event::WindowMinimize(e) => Some(e.window),
            Event::WindowMaximize(e) => Some(e.window),
            Event::WindowRestore(e) => Some(e.window),
            Event::WindowFocus(e) => Some(e.window),
            Event::WindowUnfocus(e) => Some(e.window),
            Event::KeyInput(e) => Some(e.window),
            Event::MouseMove(e) => Some(e.window),
            Event::MouseButton(e) => Some(e.window),
            Event::MouseScroll(e) => Some(e.window),
            Event::FileCreation(_)
            | Event::FileRemoval(_)
            | Event::FileUpdate(_)
            | Event::User(_) => None,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
