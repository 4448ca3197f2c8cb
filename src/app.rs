//=========================================================================
// Application
//
// Single-threaded run loop over a `MessagePump`.
//
// Architecture:
// ```text
//     ApplicationBuilder  ──build()──>  Application  ──run(frame)──>  loop
//         │                               │
//         ├─ with_target_fps()            ├─ pump()       sources → listeners
//         ├─ with_fixed_step()            ├─ frame(..)    render / update
//         └─ with_logging()               └─ pace         sleep to target
// ```
//
// `run_fixed` drives a `Simulation` instead: after each pump the elapsed
// frame time is fed to a `FixedStep` accumulator, which integrates in
// whole steps and renders with the leftover fraction as `alpha`.
//
// The loop ends when any clone of the `RunHandle` is stopped, typically by
// a listener reacting to `WindowClose`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};

//=== Internal Dependencies ===============================================

use crate::core::{FrameClock, FrameTime};
use crate::io::MessagePump;
use crate::logging::{init_logging, LoggingConfig};

//=== RunHandle ===========================================================

/// Cancellation handle for [`Application::run`]. Clones share one flag.
#[derive(Debug, Clone)]
pub struct RunHandle {
    running: Rc<Cell<bool>>,
}

impl RunHandle {
    fn new() -> Self {
        Self {
            running: Rc::new(Cell::new(true)),
        }
    }

    /// Ends the run loop after the current iteration.
    pub fn stop(&self) {
        if self.running.replace(false) {
            debug!(target: "app", "Stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }
}

//=== ApplicationBuilder ==================================================

/// Builder for an [`Application`].
///
/// # Default Values
///
/// - **Target FPS**: 60
/// - **Fixed step**: 1/60 s
/// - **Logging**: not initialised
///
/// # Examples
///
/// ```no_run
/// use lodestone::app::ApplicationBuilder;
/// use lodestone::logging::LoggingConfig;
///
/// let mut app = ApplicationBuilder::new()
///     .with_target_fps(120.0)
///     .with_logging(LoggingConfig::default())
///     .build();
///
/// let handle = app.run_handle();
/// app.run(|_pump, time| {
///     if time.frame_index == 600 {
///         handle.stop();
///     }
/// });
/// ```
pub struct ApplicationBuilder {
    target_fps: f64,
    fixed_step: Duration,
    logging: Option<LoggingConfig>,
}

impl ApplicationBuilder {
    pub fn new() -> Self {
        Self {
            target_fps: 60.0,
            fixed_step: Duration::from_secs_f64(1.0 / 60.0),
            logging: None,
        }
    }

    /// Sets the frame rate the run loop paces itself to.
    ///
    /// # Panics
    ///
    /// Panics if `fps <= 0.0`.
    pub fn with_target_fps(mut self, fps: f64) -> Self {
        assert!(fps > 0.0, "target FPS must be positive, got {}", fps);
        self.target_fps = fps;
        self
    }

    /// Sets the simulation step used by [`Application::run_fixed`].
    ///
    /// # Panics
    ///
    /// Panics if `step` is zero.
    pub fn with_fixed_step(mut self, step: Duration) -> Self {
        assert!(!step.is_zero(), "fixed step must be positive");
        self.fixed_step = step;
        self
    }

    /// Initialises the global logger when the application is built.
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    pub fn build(self) -> Application {
        if let Some(config) = self.logging {
            init_logging(config);
        }

        info!(target: "app", "Building application (target FPS: {})", self.target_fps);

        Application {
            pump: MessagePump::new(),
            clock: FrameClock::new(),
            frame_duration: Duration::from_secs_f64(1.0 / self.target_fps),
            fixed_step: self.fixed_step,
            handle: RunHandle::new(),
        }
    }
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Application =========================================================

/// Owns the message pump and drives it once per frame.
pub struct Application {
    pump: MessagePump,
    clock: FrameClock,
    frame_duration: Duration,
    fixed_step: Duration,
    handle: RunHandle,
}

impl Application {
    pub fn pump(&self) -> &MessagePump {
        &self.pump
    }

    /// Registration goes through here.
    pub fn pump_mut(&mut self) -> &mut MessagePump {
        &mut self.pump
    }

    pub fn run_handle(&self) -> RunHandle {
        self.handle.clone()
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// One iteration: pump, then `frame`.
    pub fn tick<F>(&mut self, frame: &mut F) -> FrameTime
    where
        F: FnMut(&mut MessagePump, FrameTime),
    {
        let time = self.clock.tick();
        self.pump.pump();
        frame(&mut self.pump, time);
        time
    }

    /// Runs until the [`RunHandle`] is stopped. Each iteration sleeps off
    /// whatever remains of the frame budget.
    pub fn run<F>(&mut self, mut frame: F)
    where
        F: FnMut(&mut MessagePump, FrameTime),
    {
        info!(target: "app", "Run loop started");
        self.clock.reset();

        while self.handle.is_running() {
            let started = Instant::now();
            self.tick(&mut frame);

            if let Some(remaining) = self.frame_duration.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }

        info!(target: "app", "Run loop finished after {} frames", self.clock.frame_index());
    }

    /// Runs `simulation` with a fixed integration step until the
    /// [`RunHandle`] is stopped.
    ///
    /// Each iteration pumps, integrates as many whole steps as the
    /// accumulated frame time allows, then renders once. Frame time is
    /// clamped by the frame clock, so a stall integrates at most 250 ms.
    pub fn run_fixed<S: Simulation>(&mut self, simulation: &mut S) {
        info!(target: "app", "Fixed-step loop started (step: {:?})", self.fixed_step);
        self.clock.reset();
        let mut stepper = FixedStep::new(self.fixed_step);

        while self.handle.is_running() {
            let started = Instant::now();
            let time = self.clock.tick();
            self.pump.pump();

            let pump = &mut self.pump;
            let alpha = stepper.advance(Duration::from_secs_f32(time.dt), |elapsed, step| {
                simulation.integrate(pump, elapsed, step);
            });
            simulation.render(&mut self.pump, alpha);

            if let Some(remaining) = self.frame_duration.checked_sub(started.elapsed()) {
                thread::sleep(remaining);
            }
        }

        info!(
            target: "app",
            "Fixed-step loop finished after {:?} of simulated time",
            stepper.elapsed()
        );
    }
}

//=== Simulation ==========================================================

/// Game state driven by [`Application::run_fixed`].
pub trait Simulation {
    /// Advances the state by exactly `step`. `elapsed` is the simulated
    /// time before this step.
    fn integrate(&mut self, pump: &mut MessagePump, elapsed: Duration, step: Duration);

    /// Draws the state `alpha` of the way between the last two integrated
    /// states; `alpha` is in [0, 1).
    fn render(&mut self, pump: &mut MessagePump, alpha: f32);
}

//=== FixedStep ===========================================================

/// Accumulator that converts variable frame time into whole steps.
#[derive(Debug, Clone)]
pub struct FixedStep {
    step: Duration,
    accumulator: Duration,
    elapsed: Duration,
}

impl FixedStep {
    /// # Panics
    ///
    /// Panics if `step` is zero.
    pub fn new(step: Duration) -> Self {
        assert!(!step.is_zero(), "fixed step must be positive");
        Self {
            step,
            accumulator: Duration::ZERO,
            elapsed: Duration::ZERO,
        }
    }

    /// Adds `frame_time`, calls `integrate(elapsed, step)` once per whole
    /// step it covers, and returns the leftover as a fraction of a step.
    pub fn advance<F>(&mut self, frame_time: Duration, mut integrate: F) -> f32
    where
        F: FnMut(Duration, Duration),
    {
        self.accumulator += frame_time;

        while self.accumulator >= self.step {
            integrate(self.elapsed, self.step);
            self.accumulator -= self.step;
            self.elapsed += self.step;
        }

        self.alpha()
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.step.as_secs_f32()
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Simulated time integrated so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
