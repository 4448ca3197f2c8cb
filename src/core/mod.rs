//=========================================================================
// Core Utilities
//
// Small building blocks shared by the I/O and render layers:
// - `ScopeGuard`: guaranteed single release on every exit path
// - `FrameClock`: clamped per-frame timing for the run loop
//
//=========================================================================

mod frame_clock;
mod scope_guard;

pub use frame_clock::{FrameClock, FrameTime};
pub use scope_guard::ScopeGuard;
