//=========================================================================
// Lodestone Library Root
//
// Foundational engine layer: a cooperative, single-threaded message pump
// that polls event sources (windows, filesystem monitors) and fans their
// events out to listeners, plus an OpenGL mesh lifecycle.
//
// Typical usage:
// ```no_run
// use lodestone::prelude::*;
//
// let mut app = ApplicationBuilder::new().build();
// let window = std::rc::Rc::new(std::cell::RefCell::new(
//     Window::<WinitBackend>::create(WindowConfig::new("demo"))?,
// ));
// app.pump_mut().register_source(&window);
// app.run(|_, _| window.borrow_mut().update());
// # Ok::<(), WindowError>(())
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `io` holds the event model, the pump and its sources. `render` is
// backend-neutral mesh data plus the GL lifecycle under `render::gl`.
// `platform` is the Winit window backend and only exists on desktop
// targets where Winit can be pumped from the caller's loop.
//
pub mod app;
pub mod core;
pub mod io;
pub mod logging;
pub mod prelude;
pub mod render;

#[cfg(any(
    target_os = "windows",
    target_os = "macos",
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
pub mod platform;

//--- Public Exports ------------------------------------------------------

pub use app::{Application, ApplicationBuilder, RunHandle};
pub use io::MessagePump;
