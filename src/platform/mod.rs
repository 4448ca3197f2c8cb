//=========================================================================
// Platform Subsystem
//
// Winit-backed `WindowBackend`. Winit allows one event loop per process,
// so every window on a thread shares one `WinitContext`. The context owns
// the event loop and a table of attached windows. Native events are
// routed to the window they name and queued there until that window's
// source polls them.
//
// Architecture:
// ```text
//  MessagePump::pump()
//   ↓
//  Window<WinitBackend>::poll()          (one per native window)
//   ↓ poll_event()
//  WinitContext::pump()  ─ own queue empty? pump the shared loop once
//   ↓ EventLoop::pump_app_events(0)
//  PlatformState::window_event(id, ..)
//   ↓ WindowTable::route(id)
//  Attached { EventMapper ──→ InputProcessor, pending } ──→ Window::track → sink.post
// ```
//
// Key Design Decisions:
// - **Shared event loop**: `WindowBackend::open` attaches to the thread's
//   context, creating it on first use. Opening queues a request that is
//   served by the next loop pass
// - **Main thread requirement**: Winit mandates the main thread on macOS,
//   so windows are opened and polled there
// - **Visibility is echoed**: `show`/`hide` queue the matching event
//   themselves since Winit does not report visibility changes
// - **No GL context**: context creation is outside Winit; applications
//   implement `GlBackend` on top of their own context library
//
//=========================================================================

//=== Submodules ==========================================================

mod event_mapper;
mod input_processor;

//=== External Crates =====================================================

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

use log::*;
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window as NativeWindow, WindowAttributes},
};

//=== Internal Imports ====================================================

use crate::io::event::{Event, WindowHide, WindowId, WindowShow};
use crate::io::window::{BackendError, Window, WindowBackend, WindowConfig, WindowError};
use event_mapper::{EventMapper, Extent};

//=== WinitContext ========================================================

thread_local! {
    static CURRENT: RefCell<Option<WinitContext>> = const { RefCell::new(None) };
}

/// Handle to the thread's Winit event loop and its attached windows.
/// Clones share the loop.
///
/// # Examples
///
/// ```no_run
/// use lodestone::io::WindowConfig;
/// use lodestone::platform::WinitContext;
///
/// let context = WinitContext::current()?;
/// let main = context.open_window(WindowConfig::new("main"))?;
/// let tools = context.open_window(WindowConfig::new("tools").with_size(320, 480))?;
/// assert_eq!(context.window_count(), 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct WinitContext {
    shared: Rc<RefCell<Shared>>,
}

/// Event loop and handler state, kept apart so both can be borrowed
/// during `pump_app_events`.
struct Shared {
    event_loop: EventLoop<()>,
    state: PlatformState,
}

impl WinitContext {
    /// Context of the calling thread, created on first use.
    pub fn current() -> Result<Self, BackendError> {
        CURRENT.with(|slot| {
            let mut slot = slot.borrow_mut();
            if let Some(context) = slot.as_ref() {
                return Ok(context.clone());
            }

            debug!(target: "platform", "Opening Winit event loop");
            let event_loop = EventLoop::new()
                .map_err(|e| BackendError::new(format!("event loop creation failed: {}", e)))?;

            let context = Self {
                shared: Rc::new(RefCell::new(Shared {
                    event_loop,
                    state: PlatformState::new(),
                })),
            };
            *slot = Some(context.clone());
            Ok(context)
        })
    }

    /// Opens a native window attached to this context.
    pub fn open_window(&self, config: WindowConfig) -> Result<Window<WinitBackend>, WindowError> {
        let backend = self.open_backend(&config).map_err(WindowError::Surface)?;
        Ok(Window::from_backend(backend, config))
    }

    /// Native windows currently alive.
    pub fn window_count(&self) -> usize {
        self.shared.borrow().state.natives.len()
    }

    //--- Internal Helpers -------------------------------------------------

    fn open_backend(&self, config: &WindowConfig) -> Result<WinitBackend, BackendError> {
        let token = {
            let mut shared = self.shared.borrow_mut();
            if shared.state.exited {
                return Err(BackendError::new("event loop has exited"));
            }
            shared.state.request(config.clone())
        };

        // The request is served in `resumed` or `about_to_wait`.
        self.pump();

        let outcome = self.shared.borrow_mut().state.outcomes.remove(&token);
        match outcome {
            Some(Ok(id)) => Ok(WinitBackend {
                context: self.clone(),
                id,
            }),
            Some(Err(message)) => Err(BackendError::new(message)),
            None => {
                self.shared.borrow_mut().state.cancel(token);
                Err(BackendError::new("window was not created by the event loop pass"))
            }
        }
    }

    /// Runs one non-blocking pass of the event loop.
    fn pump(&self) {
        let mut shared = self.shared.borrow_mut();
        let Shared { event_loop, state } = &mut *shared;
        if state.exited {
            return;
        }
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(Duration::ZERO), state) {
            info!(target: "platform", "Event loop exited with code {}", code);
            state.exited = true;
        }
    }

    fn has_pending(&self, id: WindowId) -> bool {
        self.shared.borrow().state.table.has_pending(id)
    }

    fn pop(&self, id: WindowId) -> Option<Event> {
        self.shared.borrow_mut().state.table.pop(id)
    }

    fn push(&self, id: WindowId, event: Event) {
        self.shared.borrow_mut().state.table.push(id, event);
    }

    fn with_native<R>(&self, id: WindowId, f: impl FnOnce(&NativeWindow) -> R) -> Result<R, BackendError> {
        let shared = self.shared.borrow();
        shared
            .state
            .natives
            .get(&id)
            .map(f)
            .ok_or_else(|| BackendError::new("native window is gone"))
    }
}

//=== WinitBackend ========================================================

/// Native window over Winit. Dropping it closes the window.
///
/// # Examples
///
/// ```no_run
/// use lodestone::io::{Window, WindowConfig};
/// use lodestone::platform::WinitBackend;
///
/// let first = Window::<WinitBackend>::create(WindowConfig::new("first"))?;
/// let second = Window::<WinitBackend>::create(WindowConfig::new("second"))?;
/// assert_ne!(first.id(), second.id());
/// # Ok::<(), lodestone::io::WindowError>(())
/// ```
pub struct WinitBackend {
    context: WinitContext,
    id: WindowId,
}

impl WinitBackend {
    pub fn context(&self) -> &WinitContext {
        &self.context
    }
}

impl WindowBackend for WinitBackend {
    fn open(config: &WindowConfig) -> Result<Self, BackendError> {
        WinitContext::current()?.open_backend(config)
    }

    fn window_id(&self) -> WindowId {
        self.id
    }

    /// Pumps the shared loop only when this window has nothing queued, so
    /// events routed here by another window's pass are served first.
    fn poll_event(&mut self) -> Option<Event> {
        if !self.context.has_pending(self.id) {
            self.context.pump();
        }
        self.context.pop(self.id)
    }

    fn show(&mut self) -> Result<(), BackendError> {
        self.context.with_native(self.id, |w| w.set_visible(true))?;
        self.context.push(self.id, Event::from(WindowShow { window: self.id }));
        Ok(())
    }

    fn hide(&mut self) -> Result<(), BackendError> {
        self.context.with_native(self.id, |w| w.set_visible(false))?;
        self.context.push(self.id, Event::from(WindowHide { window: self.id }));
        Ok(())
    }

    fn set_position(&mut self, x: i32, y: i32) -> Result<(), BackendError> {
        self.context
            .with_native(self.id, |w| w.set_outer_position(PhysicalPosition::new(x, y)))
    }

    /// The resulting `WindowResize` arrives through the event loop.
    fn set_size(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        self.context.with_native(self.id, |w| {
            let _ = w.request_inner_size(PhysicalSize::new(width, height));
        })
    }

    /// Without a GL context there is no back buffer; this only tells the
    /// compositor a frame is about to be shown.
    fn present(&mut self) -> Result<(), BackendError> {
        self.context.with_native(self.id, NativeWindow::pre_present_notify)
    }
}

impl Drop for WinitBackend {
    fn drop(&mut self) {
        match self.context.shared.try_borrow_mut() {
            Ok(mut shared) => shared.state.detach(self.id),
            Err(_) => warn!(target: "platform", "Event loop busy; {} left attached", self.id),
        }
    }
}

//=== WindowTable =========================================================

/// Per-window translation state and event queue.
struct Attached {
    mapper: EventMapper,
    pending: VecDeque<Event>,
}

/// Attached windows keyed by id. Native events are routed to exactly the
/// window they name.
#[derive(Default)]
struct WindowTable {
    attached: HashMap<WindowId, Attached>,
}

impl WindowTable {
    fn attach(&mut self, id: WindowId) {
        self.attached.entry(id).or_insert_with(|| Attached {
            mapper: EventMapper::new(id),
            pending: VecDeque::new(),
        });
    }

    fn detach(&mut self, id: WindowId) -> bool {
        self.attached.remove(&id).is_some()
    }

    /// Translates `event` into the queue of window `id`. Returns false
    /// when no such window is attached.
    fn route(&mut self, id: WindowId, event: &WindowEvent, extent: Extent) -> bool {
        match self.attached.get_mut(&id) {
            Some(window) => {
                window.mapper.map(event, extent, &mut window.pending);
                true
            }
            None => false,
        }
    }

    fn push(&mut self, id: WindowId, event: Event) {
        if let Some(window) = self.attached.get_mut(&id) {
            window.pending.push_back(event);
        }
    }

    fn pop(&mut self, id: WindowId) -> Option<Event> {
        self.attached.get_mut(&id)?.pending.pop_front()
    }

    fn has_pending(&self, id: WindowId) -> bool {
        self.attached.get(&id).is_some_and(|w| !w.pending.is_empty())
    }

    fn len(&self) -> usize {
        self.attached.len()
    }
}

//=== PlatformState =======================================================

/// Winit application state shared by every window of a context.
struct PlatformState {
    resumed: bool,
    next_token: u64,
    requests: VecDeque<(u64, WindowConfig)>,
    outcomes: HashMap<u64, Result<WindowId, String>>,
    natives: HashMap<WindowId, NativeWindow>,
    table: WindowTable,
    exited: bool,
}

impl PlatformState {
    fn new() -> Self {
        Self {
            resumed: false,
            next_token: 0,
            requests: VecDeque::new(),
            outcomes: HashMap::new(),
            natives: HashMap::new(),
            table: WindowTable::default(),
            exited: false,
        }
    }

    /// Queues a window for creation; the token claims its outcome.
    fn request(&mut self, config: WindowConfig) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.requests.push_back((token, config));
        token
    }

    fn cancel(&mut self, token: u64) {
        self.requests.retain(|(t, _)| *t != token);
    }

    fn detach(&mut self, id: WindowId) {
        self.table.detach(id);
        if self.natives.remove(&id).is_some() {
            debug!(target: "platform", "{} detached ({} remaining)", id, self.table.len());
        }
    }

    fn create_requested(&mut self, event_loop: &ActiveEventLoop) {
        while let Some((token, config)) = self.requests.pop_front() {
            let outcome = match event_loop.create_window(attributes(&config)) {
                Ok(window) => {
                    if config.position().is_none() {
                        center(&window);
                    }

                    let id = WindowId(u64::from(window.id()));
                    info!(
                        target: "platform",
                        "Window {} created: {}x{} @ {}x DPI",
                        id,
                        window.inner_size().width,
                        window.inner_size().height,
                        window.scale_factor()
                    );

                    self.table.attach(id);
                    self.table.push(id, Event::from(WindowShow { window: id }));
                    self.natives.insert(id, window);
                    Ok(id)
                }
                Err(e) => {
                    error!(target: "platform", "Window creation failed: {}", e);
                    Err(format!("window creation failed: {}", e))
                }
            };
            self.outcomes.insert(token, outcome);
        }
    }
}

fn attributes(config: &WindowConfig) -> WindowAttributes {
    let (width, height) = config.size();
    let attributes = WindowAttributes::default()
        .with_title(config.title())
        .with_inner_size(PhysicalSize::new(width, height));

    match config.position() {
        Some((x, y)) => attributes.with_position(PhysicalPosition::new(x, y)),
        None => attributes,
    }
}

/// Centers `window` on its current monitor.
fn center(window: &NativeWindow) {
    let Some(monitor) = window.current_monitor() else {
        debug!(target: "platform", "No monitor reported, leaving window at OS placement");
        return;
    };

    let area = monitor.size();
    let origin = monitor.position();
    let outer = window.outer_size();
    let x = origin.x + (area.width.saturating_sub(outer.width) / 2) as i32;
    let y = origin.y + (area.height.saturating_sub(outer.height) / 2) as i32;
    window.set_outer_position(PhysicalPosition::new(x, y));
}

//=== Winit Integration ===================================================

impl ApplicationHandler for PlatformState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.resumed = true;
        self.create_requested(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.resumed {
            self.create_requested(event_loop);
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let id = WindowId(u64::from(window_id));
        let Some(window) = self.natives.get(&id) else {
            trace!(target: "platform", "Event for unattached {} dropped", id);
            return;
        };

        let size = window.inner_size();
        let extent = Extent::observe(window.is_minimized(), window.is_maximized(), size.width, size.height);
        self.table.route(id, &event, extent);

        if let WindowEvent::Destroyed = event {
            info!(target: "platform", "Window {} destroyed", id);
            self.natives.remove(&id);
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
