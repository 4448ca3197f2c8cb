//=========================================================================
// Input Processor
//=========================================================================
//
// Converts Winit input into engine input events for one window.
//
// Architecture:
//   Winit WindowEvent → InputProcessor → Event::{KeyInput, MouseMove,
//                                               MouseButton, MouseScroll}
//
// Stateful modifier tracking: caches modifier state from ModifiersChanged
// events and stamps it on every subsequent key and button event. Keys
// without an engine mapping (F13-F24, media keys) are filtered out.
//
//=========================================================================

//=== External Dependencies ===============================================

use winit::{
    event::{ElementState, KeyEvent, MouseButton as WinitMouseButton, MouseScrollDelta},
    keyboard::{KeyCode as WinitKeyCode, ModifiersState, PhysicalKey},
};

//=== Internal Dependencies ===============================================

use crate::io::event::{Event, KeyInput, MouseButtonInput, MouseMove, MouseScroll, WindowId};
use crate::io::input::{KeyCode, KeyState, Modifiers, MouseButton};

//=== Constants ===========================================================

/// Pixel scroll deltas (touchpads) are reported in lines of this height.
const PIXELS_PER_LINE: f32 = 20.0;

//=== InputProcessor ======================================================

/// Winit input → engine events, with sticky modifier state.
pub(crate) struct InputProcessor {
    window: WindowId,
    current_modifiers: Modifiers,
}

impl InputProcessor {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(window: WindowId) -> Self {
        Self {
            window,
            current_modifiers: Modifiers::NONE,
        }
    }

    //--- Modifier State Management ----------------------------------------

    /// Updates cached modifier state (applied to subsequent events).
    pub(crate) fn update_modifiers(&mut self, modifiers_state: ModifiersState) {
        self.current_modifiers = Modifiers::from(modifiers_state);
    }

    //--- Event Processing -------------------------------------------------

    /// Converts a Winit key event; unmapped keys yield `None`.
    pub(crate) fn process_key_event(&self, key_event: &KeyEvent) -> Option<Event> {
        let key = match key_event.physical_key {
            PhysicalKey::Code(code) => KeyCode::from(code),
            _ => return None,
        };

        if key == KeyCode::Unidentified {
            return None;
        }

        Some(self.key_input(key, key_event.state))
    }

    pub(crate) fn process_mouse_button(&self, button: WinitMouseButton, state: ElementState) -> Event {
        Event::from(MouseButtonInput {
            window: self.window,
            button: MouseButton::from(button),
            state: KeyState::from(state),
            modifiers: self.current_modifiers,
        })
    }

    /// Cursor position in window space (no modifiers).
    pub(crate) fn process_mouse_move(&self, x: f32, y: f32) -> Event {
        Event::from(MouseMove {
            window: self.window,
            x,
            y,
        })
    }

    pub(crate) fn process_scroll(&self, delta: MouseScrollDelta) -> Event {
        let (horizontal, vertical) = match delta {
            MouseScrollDelta::LineDelta(x, y) => (x, y),
            MouseScrollDelta::PixelDelta(position) => (
                position.x as f32 / PIXELS_PER_LINE,
                position.y as f32 / PIXELS_PER_LINE,
            ),
        };

        Event::from(MouseScroll {
            window: self.window,
            horizontal,
            vertical,
        })
    }

    //--- Internal Helpers -------------------------------------------------

    fn key_input(&self, key: KeyCode, state: ElementState) -> Event {
        Event::from(KeyInput {
            window: self.window,
            key,
            state: KeyState::from(state),
            modifiers: self.current_modifiers,
        })
    }

    //--- Test Accessors ---------------------------------------------------

    #[cfg(test)]
    pub(crate) fn current_modifiers(&self) -> Modifiers {
        self.current_modifiers
    }
}

//=========================================================================
// Winit Conversions
//=========================================================================

/// Winit normalizes platform keys (macOS Cmd → Ctrl, Option → Alt).
impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        Self {
            shift: state.shift_key(),
            ctrl: state.control_key(),
            alt: state.alt_key(),
        }
    }
}

impl From<ElementState> for KeyState {
    fn from(state: ElementState) -> Self {
        match state {
            ElementState::Pressed => KeyState::Pressed,
            ElementState::Released => KeyState::Released,
        }
    }
}

/// Maps A-Z, 0-9, arrows, and common special keys. Everything else is
/// `KeyCode::Unidentified`.
impl From<WinitKeyCode> for KeyCode {
    fn from(code: WinitKeyCode) -> Self {
        use WinitKeyCode::*;
        match code {
            //--- Digits -------------------------------------------------------

            Digit0 => KeyCode::Digit0, Digit1 => KeyCode::Digit1,
            Digit2 => KeyCode::Digit2, Digit3 => KeyCode::Digit3,
            Digit4 => KeyCode::Digit4, Digit5 => KeyCode::Digit5,
            Digit6 => KeyCode::Digit6, Digit7 => KeyCode::Digit7,
            Digit8 => KeyCode::Digit8, Digit9 => KeyCode::Digit9,

            //--- Letters ------------------------------------------------------

            KeyA => KeyCode::KeyA, KeyB => KeyCode::KeyB, KeyC => KeyCode::KeyC,
            KeyD => KeyCode::KeyD, KeyE => KeyCode::KeyE, KeyF => KeyCode::KeyF,
            KeyG => KeyCode::KeyG, KeyH => KeyCode::KeyH, KeyI => KeyCode::KeyI,
            KeyJ => KeyCode::KeyJ, KeyK => KeyCode::KeyK, KeyL => KeyCode::KeyL,
            KeyM => KeyCode::KeyM, KeyN => KeyCode::KeyN, KeyO => KeyCode::KeyO,
            KeyP => KeyCode::KeyP, KeyQ => KeyCode::KeyQ, KeyR => KeyCode::KeyR,
            KeyS => KeyCode::KeyS, KeyT => KeyCode::KeyT, KeyU => KeyCode::KeyU,
            KeyV => KeyCode::KeyV, KeyW => KeyCode::KeyW, KeyX => KeyCode::KeyX,
            KeyY => KeyCode::KeyY, KeyZ => KeyCode::KeyZ,

            //--- Arrows -------------------------------------------------------

            ArrowUp => KeyCode::ArrowUp,
            ArrowDown => KeyCode::ArrowDown,
            ArrowLeft => KeyCode::ArrowLeft,
            ArrowRight => KeyCode::ArrowRight,

            //--- Special ------------------------------------------------------

            Space => KeyCode::Space,
            Enter => KeyCode::Enter,
            Escape => KeyCode::Escape,
            Tab => KeyCode::Tab,
            Backspace => KeyCode::Backspace,
            Delete => KeyCode::Delete,

            _ => KeyCode::Unidentified,
        }
    }
}

/// Back/Forward/Other → `Other`.
impl From<WinitMouseButton> for MouseButton {
    fn from(button: WinitMouseButton) -> Self {
        match button {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    const W: WindowId = WindowId(3);

    fn make_modifiers(shift: bool, ctrl: bool, alt: bool) -> ModifiersState {
        let mut state = ModifiersState::empty();
        if shift { state.insert(ModifiersState::SHIFT); }
        if ctrl { state.insert(ModifiersState::CONTROL); }
        if alt { state.insert(ModifiersState::ALT); }
        state
    }

    #[test]
    fn starts_with_no_modifiers() {
        let processor = InputProcessor::new(W);
        assert!(processor.current_modifiers().is_empty());
    }

    #[test]
    fn update_modifiers_works() {
        let mut processor = InputProcessor::new(W);
        processor.update_modifiers(make_modifiers(true, false, true));

        let mods = processor.current_modifiers();
        assert!(mods.shift && !mods.ctrl && mods.alt);
    }

    #[test]
    fn key_input_carries_window_and_modifiers() {
        let mut processor = InputProcessor::new(W);
        processor.update_modifiers(make_modifiers(false, true, false));

        let event = processor.key_input(KeyCode::KeyS, ElementState::Pressed);

        let key = event.try_as::<KeyInput>().expect("key input");
        assert_eq!(key.window, W);
        assert_eq!(key.key, KeyCode::KeyS);
        assert_eq!(key.state, KeyState::Pressed);
        assert_eq!(key.modifiers, Modifiers::CTRL);
    }

    #[test]
    fn key_release_maps_state() {
        let processor = InputProcessor::new(W);
        let event = processor.key_input(KeyCode::KeyA, ElementState::Released);

        assert_eq!(event.try_as::<KeyInput>().map(|k| k.state), Some(KeyState::Released));
    }

    #[test]
    fn mouse_button_has_modifiers() {
        let mut processor = InputProcessor::new(W);
        processor.update_modifiers(make_modifiers(false, false, true));

        let event = processor.process_mouse_button(WinitMouseButton::Left, ElementState::Pressed);

        let input = event.try_as::<MouseButtonInput>().expect("button input");
        assert_eq!(input.button, MouseButton::Left);
        assert!(input.modifiers.alt);
    }

    #[test]
    fn modifiers_persist_across_events() {
        let mut processor = InputProcessor::new(W);
        processor.update_modifiers(make_modifiers(true, false, false));

        let button = processor.process_mouse_button(WinitMouseButton::Right, ElementState::Released);
        let key = processor.key_input(KeyCode::Space, ElementState::Pressed);

        assert_eq!(button.try_as::<MouseButtonInput>().map(|b| b.modifiers), Some(Modifiers::SHIFT));
        assert_eq!(key.try_as::<KeyInput>().map(|k| k.modifiers), Some(Modifiers::SHIFT));
    }

    #[test]
    fn mouse_move_correct() {
        let processor = InputProcessor::new(W);
        let event = processor.process_mouse_move(123.5, 456.75);

        assert_eq!(event, Event::from(MouseMove { window: W, x: 123.5, y: 456.75 }));
    }

    #[test]
    fn scroll_lines_and_pixels() {
        let processor = InputProcessor::new(W);

        let lines = processor.process_scroll(MouseScrollDelta::LineDelta(0.0, -2.0));
        assert_eq!(lines, Event::from(MouseScroll { window: W, horizontal: 0.0, vertical: -2.0 }));

        let pixels = processor.process_scroll(MouseScrollDelta::PixelDelta(PhysicalPosition::new(40.0, 10.0)));
        assert_eq!(pixels, Event::from(MouseScroll { window: W, horizontal: 2.0, vertical: 0.5 }));
    }

    #[test]
    fn keycode_conversion() {
        assert_eq!(KeyCode::from(WinitKeyCode::KeyA), KeyCode::KeyA);
        assert_eq!(KeyCode::from(WinitKeyCode::Digit7), KeyCode::Digit7);
        assert_eq!(KeyCode::from(WinitKeyCode::Escape), KeyCode::Escape);
        assert_eq!(KeyCode::from(WinitKeyCode::F13), KeyCode::Unidentified);
    }

    #[test]
    fn mouse_button_conversion() {
        assert_eq!(MouseButton::from(WinitMouseButton::Left), MouseButton::Left);
        assert_eq!(MouseButton::from(WinitMouseButton::Middle), MouseButton::Middle);
        assert_eq!(MouseButton::from(WinitMouseButton::Back), MouseButton::Other);
    }
}
