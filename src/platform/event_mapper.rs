//=========================================================================
// Platform Event Mapper
//
// Converts Winit window events into engine events for one window.
//
// Responsibilities:
// - Window lifecycle: moved, resized, close-requested, focus, occlusion
// - Minimize / maximize / restore detection on resize
// - Input forwarding through `InputProcessor`
//
// Winit has no minimize or maximize notification; both arrive as a
// resize. The mapper compares the window's reported extent with the last
// one it saw and emits the transition before the resize itself.
//
//=========================================================================

use std::collections::VecDeque;

use log::trace;
use winit::event::WindowEvent;

use crate::io::event::{
    Event, WindowClose, WindowFocus, WindowHide, WindowMaximize, WindowMinimize, WindowMove,
    WindowId, WindowResize, WindowRestore, WindowShow, WindowUnfocus,
};

use super::input_processor::InputProcessor;

//=== Extent ==============================================================

/// Size class of the window as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Extent {
    Normal,
    Minimized,
    Maximized,
}

impl Extent {
    /// Zero-area client rectangles count as minimized on platforms that
    /// cannot report minimization.
    pub(crate) fn observe(minimized: Option<bool>, maximized: bool, width: u32, height: u32) -> Self {
        if minimized.unwrap_or(width == 0 || height == 0) {
            Extent::Minimized
        } else if maximized {
            Extent::Maximized
        } else {
            Extent::Normal
        }
    }
}

//=== EventMapper =========================================================

pub(crate) struct EventMapper {
    window: WindowId,
    extent: Extent,
    input: InputProcessor,
}

impl EventMapper {
    pub(crate) fn new(window: WindowId) -> Self {
        Self {
            window,
            extent: Extent::Normal,
            input: InputProcessor::new(window),
        }
    }

    /// Translates `event`, appending zero or more engine events to `out`.
    /// `extent` is the window's size class at the time of the event.
    pub(crate) fn map(&mut self, event: &WindowEvent, extent: Extent, out: &mut VecDeque<Event>) {
        let window = self.window;

        match event {
            WindowEvent::Moved(position) => {
                out.push_back(Event::from(WindowMove { window, x: position.x, y: position.y }));
            }

            WindowEvent::Resized(size) => {
                self.resized(size.width, size.height, extent, out);
            }

            WindowEvent::CloseRequested => {
                out.push_back(Event::from(WindowClose { window }));
            }

            WindowEvent::Focused(true) => out.push_back(Event::from(WindowFocus { window })),
            WindowEvent::Focused(false) => out.push_back(Event::from(WindowUnfocus { window })),

            WindowEvent::Occluded(true) => out.push_back(Event::from(WindowHide { window })),
            WindowEvent::Occluded(false) => out.push_back(Event::from(WindowShow { window })),

            WindowEvent::ModifiersChanged(modifiers) => {
                self.input.update_modifiers(modifiers.state());
            }

            WindowEvent::KeyboardInput { event: key_event, .. } => {
                match self.input.process_key_event(key_event) {
                    Some(event) => out.push_back(event),
                    None => trace!(target: "platform", "unmapped key ignored"),
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                out.push_back(self.input.process_mouse_button(*button, *state));
            }

            WindowEvent::CursorMoved { position, .. } => {
                out.push_back(self.input.process_mouse_move(position.x as f32, position.y as f32));
            }

            WindowEvent::MouseWheel { delta, .. } => {
                out.push_back(self.input.process_scroll(*delta));
            }

            _ => {}
        }
    }

    fn resized(&mut self, width: u32, height: u32, extent: Extent, out: &mut VecDeque<Event>) {
        let window = self.window;
        let previous = std::mem::replace(&mut self.extent, extent);

        if extent != previous {
            trace!(target: "platform", "{} extent {:?} -> {:?}", window, previous, extent);
            match extent {
                Extent::Minimized => out.push_back(Event::from(WindowMinimize { window })),
                Extent::Maximized => out.push_back(Event::from(WindowMaximize { window })),
                Extent::Normal => out.push_back(Event::from(WindowRestore { window })),
            }
        }

        if extent != Extent::Minimized {
            out.push_back(Event::from(WindowResize { window, width, height }));
        }
    }
}

//=========================================================================
// Tests
//=========================================================================
