//! Trigger key arbitration
//!
//! Two keys change meaning with touch reporting:
//!
//! | Key            | Touch off                         | Touch on                     |
//! |----------------|-----------------------------------|------------------------------|
//! | Touchpad click | passed on to the meta mode handler| consumed (enter / click)     |
//! | Berry key      | Ctrl + key 171 (tmux prefix)      | enables meta mode            |
//!
//! The berry key is always consumed and only acts on release.

use bbq10_touch_config::InputInterpretation;
use evdev::Key;

use crate::event::{KeyEvent, KeyState, BERRY_KEY, PREFIX_KEY, TOUCHPAD_CLICK};
use crate::touch::{MetaMode, TouchDevice, TouchHardware};

/// Substitute actions that consume a key but are not implemented yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Touchpad click sends Enter in keys mode
    Enter,
    /// Touchpad click sends a pointer button in pointer mode
    PointerClick,
}

/// What to do with a physical key event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not a trigger key in the current state; forward the original event
    PassThrough,
    /// Swallow the original event and emit these instead
    Consumed(Vec<KeyEvent>),
    /// Swallow the original event; its substitute is not implemented
    Pending(PendingAction),
}

impl Verdict {
    pub fn is_consumed(&self) -> bool {
        !matches!(self, Verdict::PassThrough)
    }

    /// Substitute events to emit, empty unless `Consumed`.
    pub fn events(&self) -> &[KeyEvent] {
        match self {
            Verdict::Consumed(events) => events,
            _ => &[],
        }
    }
}

/// Left control held around a tap of the prefix key.
pub fn prefix_chord() -> Vec<KeyEvent> {
    vec![
        KeyEvent::press(Key::KEY_LEFTCTRL),
        KeyEvent::press(PREFIX_KEY),
        KeyEvent::release(PREFIX_KEY),
        KeyEvent::release(Key::KEY_LEFTCTRL),
    ]
}

impl<H: TouchHardware> TouchDevice<H> {
    /// Decide whether `key` in `state` is taken over by touch handling.
    pub fn consumes_keycode(
        &mut self,
        key: Key,
        state: KeyState,
        meta: &mut impl MetaMode,
    ) -> Verdict {
        if key == TOUCHPAD_CLICK {
            if !self.state().is_enabled() {
                return Verdict::PassThrough;
            }

            return match (self.state().input_as(), state) {
                (InputInterpretation::Keys, KeyState::Released) => {
                    Verdict::Pending(PendingAction::Enter)
                }
                (InputInterpretation::Pointer, _) => Verdict::Pending(PendingAction::PointerClick),
                _ => Verdict::Consumed(Vec::new()),
            };
        }

        if key == BERRY_KEY {
            if state != KeyState::Released {
                return Verdict::Consumed(Vec::new());
            }

            if self.state().is_enabled() {
                tracing::debug!("Berry key released with touch on, enabling meta mode");
                meta.enable();
                return Verdict::Consumed(Vec::new());
            }

            tracing::debug!("Berry key released with touch off, sending prefix");
            return Verdict::Consumed(prefix_chord());
        }

        Verdict::PassThrough
    }
}
