//=========================================================================
// Window
//=========================================================================
//
// Windows as pump sources and render targets.
//
// Architecture:
//   native binding (WindowBackend) ──poll_event──→ Window<B> ──post──→ pump
//                                                     │
//   application ──update()──→ present / swap_buffers ←┘
//
// `Window<B>` forwards the backend's events into the pump and tracks the
// window state machine from them:
//
//   Constructed → Shown → { moved, resized, Minimized, Maximized, Hidden }*
//               → Closed
//
// `Closed` is terminal. The window never tears itself down; the
// application drops it when it sees `WindowClose`.
//
// `GlWindow<B>` adds a GL context. Teardown deletes the context first,
// then the surface goes with the backend.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;

use log::{debug, info, trace, warn};

//=== Internal Dependencies ===============================================

use super::event::{Event, WindowId};
use super::message_pump::{EventSink, PollStatus, PumpSource};

//=== Constants ===========================================================

/// Upper bound on native events forwarded per poll.
const MAX_EVENTS_PER_POLL: usize = 100;

//=== WindowConfig ========================================================

/// Window factory parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    title: String,
    position: Option<(i32, i32)>,
    width: u32,
    height: u32,
}

impl WindowConfig {
    /// 800x600, centered.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            position: None,
            width: 800,
            height: 600,
        }
    }

    /// # Panics
    /// If either dimension is zero.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "window size must be positive, got {}x{}", width, height);
        self.width = width;
        self.height = height;
        self
    }

    /// Places the window at `x`/`y` instead of centering it.
    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// `None` means centered.
    pub fn position(&self) -> Option<(i32, i32)> {
        self.position
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Lodestone")
    }
}

//=== GlVersion / SwapInterval ============================================

/// Requested GL context version (core profile).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct GlVersion {
    pub major: u8,
    pub minor: u8,
}

impl GlVersion {
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for GlVersion {
    fn default() -> Self {
        Self::new(3, 3)
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Synchronization between buffer swap and display refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwapInterval {
    /// Swap as soon as possible (vsync off).
    Immediate,
    /// Wait for vertical blank.
    Synchronized,
    /// Wait for vertical blank unless the frame is late.
    AdaptiveSynchronized,
}

impl SwapInterval {
    /// Value passed to the native swap-interval call.
    pub fn native(self) -> i32 {
        match self {
            Self::Immediate => 0,
            Self::Synchronized => 1,
            Self::AdaptiveSynchronized => -1,
        }
    }
}

//=== Errors ==============================================================

/// Failure reported by a native windowing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendError {}

/// Window construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// The native surface could not be created.
    Surface(BackendError),

    /// The surface exists but no GL context could be created for it.
    Context(BackendError),
}

impl fmt::Display for WindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Surface(e) => write!(f, "Window surface creation failed: {}", e),
            Self::Context(e) => write!(f, "GL context creation failed: {}", e),
        }
    }
}

impl std::error::Error for WindowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Surface(e) | Self::Context(e) => Some(e),
        }
    }
}

//=== Backend Traits ======================================================

/// Native window binding.
///
/// Implementations own the native surface and release it on drop.
pub trait WindowBackend: Sized {
    fn open(config: &WindowConfig) -> Result<Self, BackendError>;

    fn window_id(&self) -> WindowId;

    /// Next pending native event, already translated. Must not block.
    fn poll_event(&mut self) -> Option<Event>;

    fn show(&mut self) -> Result<(), BackendError>;

    fn hide(&mut self) -> Result<(), BackendError>;

    fn set_position(&mut self, x: i32, y: i32) -> Result<(), BackendError>;

    fn set_size(&mut self, width: u32, height: u32) -> Result<(), BackendError>;

    /// Flushes the back buffer to the screen.
    fn present(&mut self) -> Result<(), BackendError>;
}

/// Window binding that can host a GL context.
pub trait GlBackend: WindowBackend {
    type Context;

    fn create_context(&mut self, version: GlVersion) -> Result<Self::Context, BackendError>;

    fn delete_context(&mut self, context: &Self::Context);

    /// `interval` is the native value: 0, 1 or -1.
    fn set_swap_interval(&mut self, context: &Self::Context, interval: i32) -> Result<(), BackendError>;

    fn swap_buffers(&mut self, context: &Self::Context) -> Result<(), BackendError>;
}

//=== WindowState =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Constructed,
    Shown,
    Hidden,
    Minimized,
    Maximized,
    Closed,
}

//=== Window ==============================================================

/// A native window acting as a pump source.
pub struct Window<B: WindowBackend> {
    backend: B,
    title: String,
    position: Option<(i32, i32)>,
    size: (u32, u32),
    state: WindowState,
}

impl<B: WindowBackend> Window<B> {
    //--- Construction -----------------------------------------------------

    /// Opens a native window.
    pub fn create(config: WindowConfig) -> Result<Self, WindowError> {
        let backend = B::open(&config).map_err(WindowError::Surface)?;
        Ok(Self::from_backend(backend, config))
    }

    /// Wraps an already opened backend.
    pub fn from_backend(backend: B, config: WindowConfig) -> Self {
        info!(
            target: "window",
            "Window {} '{}' opened ({}x{})",
            backend.window_id(),
            config.title,
            config.width,
            config.height
        );
        Self {
            backend,
            title: config.title,
            position: config.position,
            size: (config.width, config.height),
            state: WindowState::Constructed,
        }
    }

    //--- Render Loop ------------------------------------------------------

    /// Presents the back buffer. Failures are logged and the frame is
    /// dropped.
    pub fn update(&mut self) {
        if let Err(e) = self.backend.present() {
            warn!(target: "window", "Window {} present failed: {}", self.id(), e);
        }
    }

    //--- Commands ---------------------------------------------------------

    pub fn show(&mut self) -> Result<(), BackendError> {
        let result = self.backend.show();
        self.log_failure("show", &result);
        result
    }

    pub fn hide(&mut self) -> Result<(), BackendError> {
        let result = self.backend.hide();
        self.log_failure("hide", &result);
        result
    }

    pub fn set_position(&mut self, x: i32, y: i32) -> Result<(), BackendError> {
        let result = self.backend.set_position(x, y);
        self.log_failure("set_position", &result);
        result
    }

    pub fn set_size(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
        let result = self.backend.set_size(width, height);
        self.log_failure("set_size", &result);
        result
    }

    //--- Query API --------------------------------------------------------

    pub fn id(&self) -> WindowId {
        self.backend.window_id()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Last known position; `None` until the window is placed or moved.
    pub fn position(&self) -> Option<(i32, i32)> {
        self.position
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == WindowState::Closed
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    //--- Internal ---------------------------------------------------------

    fn log_failure(&self, operation: &str, result: &Result<(), BackendError>) {
        if let Err(e) = result {
            warn!(target: "window", "Window {} {} failed: {}", self.id(), operation, e);
        }
    }

    fn track(&mut self, event: &Event) {
        if self.state == WindowState::Closed {
            return;
        }

        let next = match event {
            Event::WindowShow(_) | Event::WindowRestore(_) => Some(WindowState::Shown),
            Event::WindowHide(_) => Some(WindowState::Hidden),
            Event::WindowMinimize(_) => Some(WindowState::Minimized),
            Event::WindowMaximize(_) => Some(WindowState::Maximized),
            Event::WindowClose(_) => Some(WindowState::Closed),
            Event::WindowMove(m) => {
                self.position = Some((m.x, m.y));
                None
            }
            Event::WindowResize(r) => {
                self.size = (r.width, r.height);
                None
            }
            _ => None,
        };

        if let Some(state) = next {
            if state != self.state {
                debug!(target: "window", "Window {} {:?} -> {:?}", self.id(), self.state, state);
                self.state = state;
            }
        }
    }
}

impl<B: WindowBackend> PumpSource for Window<B> {
    fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
        let mut forwarded = 0;

        while forwarded < MAX_EVENTS_PER_POLL {
            let Some(event) = self.backend.poll_event() else {
                break;
            };
            trace!(target: "window", "Window {} event {:?}", self.id(), event.kind());
            self.track(&event);
            sink.post(event);
            forwarded += 1;
        }

        if forwarded >= MAX_EVENTS_PER_POLL {
            warn!(target: "window", "Window {} backlog: forwarded {} events this poll", self.id(), forwarded);
        }

        PollStatus::Ready
    }
}

//=== GlWindow ============================================================

/// A window with an attached GL context.
pub struct GlWindow<B: GlBackend> {
    window: Window<B>,
    context: B::Context,
    version: GlVersion,
    swap_interval: Option<SwapInterval>,
}

impl<B: GlBackend> GlWindow<B> {
    /// Opens a native window and creates a context for it.
    pub fn create(config: WindowConfig, version: GlVersion) -> Result<Self, WindowError> {
        Self::from_window(Window::create(config)?, version)
    }

    /// Creates a context for an existing window. On failure the window is
    /// dropped along with the error.
    pub fn from_window(mut window: Window<B>, version: GlVersion) -> Result<Self, WindowError> {
        let context = window
            .backend
            .create_context(version)
            .map_err(WindowError::Context)?;

        info!(target: "window", "Window {} GL {} context created", window.id(), version);

        Ok(Self {
            window,
            context,
            version,
            swap_interval: None,
        })
    }

    /// Swaps front and back buffers. May block on vsync.
    pub fn update(&mut self) {
        if let Err(e) = self.window.backend.swap_buffers(&self.context) {
            warn!(target: "window", "Window {} buffer swap failed: {}", self.window.id(), e);
        }
    }

    /// Applies `interval` and returns what the backend actually accepted.
    ///
    /// Adaptive sync falls back to synchronized when unsupported. If
    /// nothing is accepted the previous setting is kept and returned.
    pub fn set_swap_interval(&mut self, interval: SwapInterval) -> Option<SwapInterval> {
        let mut candidates = vec![interval];
        if interval == SwapInterval::AdaptiveSynchronized {
            candidates.push(SwapInterval::Synchronized);
        }

        for candidate in candidates {
            match self.window.backend.set_swap_interval(&self.context, candidate.native()) {
                Ok(()) => {
                    if candidate != interval {
                        info!(
                            target: "window",
                            "Window {} {:?} unsupported, using {:?}",
                            self.window.id(),
                            interval,
                            candidate
                        );
                    }
                    self.swap_interval = Some(candidate);
                    return self.swap_interval;
                }
                Err(e) => {
                    debug!(target: "window", "Swap interval {:?} rejected: {}", candidate, e);
                }
            }
        }

        warn!(target: "window", "Window {} could not apply swap interval {:?}", self.window.id(), interval);
        self.swap_interval
    }

    /// Last swap interval the backend accepted, if any was set.
    pub fn swap_interval(&self) -> Option<SwapInterval> {
        self.swap_interval
    }

    pub fn context_handle(&self) -> &B::Context {
        &self.context
    }

    pub fn version(&self) -> GlVersion {
        self.version
    }

    pub fn window(&self) -> &Window<B> {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut Window<B> {
        &mut self.window
    }
}

impl<B: GlBackend> PumpSource for GlWindow<B> {
    fn poll(&mut self, sink: &mut dyn EventSink) -> PollStatus {
        self.window.poll(sink)
    }
}

impl<B: GlBackend> Drop for GlWindow<B> {
    fn drop(&mut self) {
        debug!(target: "window", "Window {} deleting GL context", self.window.id());
        self.window.backend.delete_context(&self.context);
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::event::{WindowClose, WindowMinimize, WindowMove, WindowResize, WindowRestore, WindowShow};
    use crate::io::message_pump::{Listener, MessagePump};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    const ID: WindowId = WindowId(1);

    //--- Scripted backend -------------------------------------------------

    type CallLog = Rc<RefCell<Vec<String>>>;

    /// Replays a script; `None` entries end one poll.
    struct ScriptedBackend {
        script: VecDeque<Option<Event>>,
        log: CallLog,
        fail_present: bool,
        fail_context: bool,
        adaptive_supported: bool,
    }

    impl ScriptedBackend {
        fn new(log: &CallLog) -> Self {
            Self {
                script: VecDeque::new(),
                log: Rc::clone(log),
                fail_present: false,
                fail_context: false,
                adaptive_supported: true,
            }
        }

        fn with_script(mut self, polls: Vec<Vec<Event>>) -> Self {
            for batch in polls {
                self.script.extend(batch.into_iter().map(Some));
                self.script.push_back(None);
            }
            self
        }

        fn record(&self, call: impl Into<String>) {
            self.log.borrow_mut().push(call.into());
        }
    }

    impl WindowBackend for ScriptedBackend {
        fn open(config: &WindowConfig) -> Result<Self, BackendError> {
            Err(BackendError::new(format!("no display for '{}'", config.title())))
        }

        fn window_id(&self) -> WindowId {
            ID
        }

        fn poll_event(&mut self) -> Option<Event> {
            self.script.pop_front().flatten()
        }

        fn show(&mut self) -> Result<(), BackendError> {
            self.record("show");
            Ok(())
        }

        fn hide(&mut self) -> Result<(), BackendError> {
            Err(BackendError::new("hide unsupported"))
        }

        fn set_position(&mut self, x: i32, y: i32) -> Result<(), BackendError> {
            self.record(format!("set_position {} {}", x, y));
            Ok(())
        }

        fn set_size(&mut self, width: u32, height: u32) -> Result<(), BackendError> {
            self.record(format!("set_size {} {}", width, height));
            Ok(())
        }

        fn present(&mut self) -> Result<(), BackendError> {
            self.record("present");
            if self.fail_present {
                Err(BackendError::new("surface lost"))
            } else {
                Ok(())
            }
        }
    }

    impl GlBackend for ScriptedBackend {
        type Context = u32;

        fn create_context(&mut self, version: GlVersion) -> Result<u32, BackendError> {
            self.record(format!("create_context {}", version));
            if self.fail_context {
                Err(BackendError::new("no GL"))
            } else {
                Ok(42)
            }
        }

        fn delete_context(&mut self, context: &u32) {
            self.record(format!("delete_context {}", context));
        }

        fn set_swap_interval(&mut self, _context: &u32, interval: i32) -> Result<(), BackendError> {
            self.record(format!("swap_interval {}", interval));
            if interval == -1 && !self.adaptive_supported {
                Err(BackendError::new("adaptive vsync unsupported"))
            } else {
                Ok(())
            }
        }

        fn swap_buffers(&mut self, context: &u32) -> Result<(), BackendError> {
            self.record(format!("swap {}", context));
            Ok(())
        }
    }

    impl Drop for ScriptedBackend {
        fn drop(&mut self) {
            self.record("destroy_surface");
        }
    }

    fn window(backend: ScriptedBackend) -> Window<ScriptedBackend> {
        Window::from_backend(backend, WindowConfig::new("test").with_size(640, 480))
    }

    //--- Source behaviour -------------------------------------------------

    #[test]
    fn close_on_second_poll_stops_the_loop() {
        struct StopOnClose(Rc<Cell<bool>>);
        impl Listener for StopOnClose {
            fn on_event(&mut self, event: &Event, _: &mut dyn EventSink) {
                if event.is::<WindowClose>() {
                    self.0.set(true);
                }
            }
        }

        let log = CallLog::default();
        let backend = ScriptedBackend::new(&log)
            .with_script(vec![vec![], vec![Event::from(WindowClose { window: ID })]]);
        let source = Rc::new(RefCell::new(window(backend)));
        let stopped = Rc::new(Cell::new(false));
        let listener = Rc::new(RefCell::new(StopOnClose(Rc::clone(&stopped))));

        let mut pump = MessagePump::new();
        pump.register_source(&source);
        pump.register_listener(&listener);

        pump.pump();
        assert!(!stopped.get());
        pump.pump();
        assert!(stopped.get());
        assert!(source.borrow().is_closed());
    }

    #[test]
    fn state_tracks_forwarded_events() {
        let log = CallLog::default();
        let backend = ScriptedBackend::new(&log).with_script(vec![vec![
            Event::from(WindowShow { window: ID }),
            Event::from(WindowMove { window: ID, x: 12, y: 34 }),
            Event::from(WindowResize { window: ID, width: 1024, height: 768 }),
            Event::from(WindowMinimize { window: ID }),
        ]]);
        let source = Rc::new(RefCell::new(window(backend)));
        let mut pump = MessagePump::new();
        pump.register_source(&source);

        pump.pump();

        let win = source.borrow();
        assert_eq!(win.state(), WindowState::Minimized);
        assert_eq!(win.position(), Some((12, 34)));
        assert_eq!(win.size(), (1024, 768));
    }

    #[test]
    fn closed_is_terminal() {
        let log = CallLog::default();
        let backend = ScriptedBackend::new(&log).with_script(vec![vec![
            Event::from(WindowClose { window: ID }),
            Event::from(WindowRestore { window: ID }),
        ]]);
        let source = Rc::new(RefCell::new(window(backend)));
        let mut pump = MessagePump::new();
        pump.register_source(&source);

        pump.pump();

        assert_eq!(source.borrow().state(), WindowState::Closed);
    }

    #[test]
    fn idle_backend_produces_nothing() {
        let log = CallLog::default();
        let mut win = window(ScriptedBackend::new(&log));

        struct Counting(usize);
        impl EventSink for Counting {
            fn post(&mut self, _: Event) {
                self.0 += 1;
            }
            fn post_immediate(&mut self, _: Event) {
                self.0 += 1;
            }
        }

        let mut sink = Counting(0);
        assert_eq!(win.poll(&mut sink), PollStatus::Ready);
        assert_eq!(sink.0, 0);
        assert_eq!(win.state(), WindowState::Constructed);
    }

    //--- Commands ---------------------------------------------------------

    #[test]
    fn update_presents_and_survives_failure() {
        let log = CallLog::default();
        let mut backend = ScriptedBackend::new(&log);
        backend.fail_present = true;
        let mut win = window(backend);

        win.update();
        win.update();

        assert_eq!(log.borrow().iter().filter(|c| *c == "present").count(), 2);
    }

    #[test]
    fn commands_reach_backend_and_report_failures() {
        let log = CallLog::default();
        let mut win = window(ScriptedBackend::new(&log));

        assert!(win.show().is_ok());
        assert!(win.set_position(5, 6).is_ok());
        assert!(win.set_size(320, 200).is_ok());
        assert!(win.hide().is_err());

        assert_eq!(
            log.borrow().as_slice(),
            &["show", "set_position 5 6", "set_size 320 200"]
        );
    }

    #[test]
    fn create_reports_surface_failure() {
        let result = Window::<ScriptedBackend>::create(WindowConfig::new("headless"));

        match result {
            Err(WindowError::Surface(e)) => assert!(e.message().contains("headless")),
            other => panic!("expected surface error, got {:?}", other.err()),
        }
    }

    #[test]
    #[should_panic(expected = "window size must be positive")]
    fn zero_size_config_panics() {
        let _ = WindowConfig::new("bad").with_size(0, 480);
    }

    //--- GL window --------------------------------------------------------

    #[test]
    fn gl_window_swaps_on_update() {
        let log = CallLog::default();
        let mut gl = GlWindow::from_window(window(ScriptedBackend::new(&log)), GlVersion::default())
            .expect("context");

        gl.update();

        assert_eq!(*gl.context_handle(), 42);
        assert!(log.borrow().contains(&"swap 42".to_string()));
    }

    #[test]
    fn gl_window_tears_down_context_before_surface() {
        let log = CallLog::default();
        let gl = GlWindow::from_window(window(ScriptedBackend::new(&log)), GlVersion::new(4, 1))
            .expect("context");

        drop(gl);

        assert_eq!(
            log.borrow().as_slice(),
            &["create_context 4.1", "delete_context 42", "destroy_surface"]
        );
    }

    #[test]
    fn failed_context_releases_surface() {
        let log = CallLog::default();
        let mut backend = ScriptedBackend::new(&log);
        backend.fail_context = true;

        let result = GlWindow::from_window(window(backend), GlVersion::default());

        assert!(matches!(result, Err(WindowError::Context(_))));
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy_surface"));
        assert!(!log.borrow().iter().any(|c| c.starts_with("delete_context")));
    }

    #[test]
    fn adaptive_swap_falls_back_to_synchronized() {
        let log = CallLog::default();
        let mut backend = ScriptedBackend::new(&log);
        backend.adaptive_supported = false;
        let mut gl = GlWindow::from_window(window(backend), GlVersion::default()).expect("context");

        let applied = gl.set_swap_interval(SwapInterval::AdaptiveSynchronized);

        assert_eq!(applied, Some(SwapInterval::Synchronized));
        let calls: Vec<String> = log
            .borrow()
            .iter()
            .filter(|c| c.starts_with("swap_interval"))
            .cloned()
            .collect();
        assert_eq!(calls, vec!["swap_interval -1", "swap_interval 1"]);
    }

    #[test]
    fn immediate_swap_maps_to_zero() {
        let log = CallLog::default();
        let mut gl = GlWindow::from_window(window(ScriptedBackend::new(&log)), GlVersion::default())
            .expect("context");

        assert_eq!(gl.set_swap_interval(SwapInterval::Immediate), Some(SwapInterval::Immediate));
        assert!(log.borrow().contains(&"swap_interval 0".to_string()));
    }

    #[test]
    fn swap_intervals_use_native_values() {
        let values: Vec<i32> = [
            SwapInterval::Immediate,
            SwapInterval::Synchronized,
            SwapInterval::AdaptiveSynchronized,
        ]
        .into_iter()
        .map(SwapInterval::native)
        .collect();

        assert_eq!(values, vec![0, 1, -1]);
    }
}
