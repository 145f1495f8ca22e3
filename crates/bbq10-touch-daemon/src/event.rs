//! Key event values produced by the filter and arbiter

use evdev::Key;

/// Touchpad click on the BBQ10 keymap
pub const TOUCHPAD_CLICK: Key = Key::KEY_COMPOSE;

/// Berry key on the BBQ10 keymap
pub const BERRY_KEY: Key = Key::KEY_PROPS;

/// Auxiliary key (code 171) bound as the tmux prefix together with left control
pub const PREFIX_KEY: Key = Key::KEY_CONFIG;

/// Event value constants for key events.
pub mod event_value {
    pub const RELEASE: i32 = 0;
    pub const PRESS: i32 = 1;
    pub const REPEAT: i32 = 2;
}

/// State of a physical key as reported by the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyState {
    Pressed,
    /// Autorepeat while held down
    Held,
    Released,
}

impl KeyState {
    /// Map an evdev key event value to a state. Unknown values yield `None`.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            event_value::RELEASE => Some(Self::Released),
            event_value::PRESS => Some(Self::Pressed),
            event_value::REPEAT => Some(Self::Held),
            _ => None,
        }
    }
}

/// A key transition to be delivered to the key sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub fn press(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub fn release(key: Key) -> Self {
        Self { key, pressed: false }
    }

    /// Press immediately followed by release.
    pub fn tap(key: Key) -> [Self; 2] {
        [Self::press(key), Self::release(key)]
    }

    /// evdev event value for this transition.
    pub fn value(&self) -> i32 {
        if self.pressed {
            event_value::PRESS
        } else {
            event_value::RELEASE
        }
    }

    pub fn to_input_event(&self) -> evdev::InputEvent {
        evdev::InputEvent::new(evdev::EventType::KEY, self.key.code(), self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_key_code() {
        assert_eq!(PREFIX_KEY.code(), 171);
    }

    #[test]
    fn test_key_state_from_value() {
        assert_eq!(KeyState::from_value(0), Some(KeyState::Released));
        assert_eq!(KeyState::from_value(1), Some(KeyState::Pressed));
        assert_eq!(KeyState::from_value(2), Some(KeyState::Held));
        assert_eq!(KeyState::from_value(7), None);
    }

    #[test]
    fn test_tap_is_press_then_release() {
        let [press, release] = KeyEvent::tap(Key::KEY_UP);
        assert_eq!(press, KeyEvent { key: Key::KEY_UP, pressed: true });
        assert_eq!(release, KeyEvent { key: Key::KEY_UP, pressed: false });
    }

    #[test]
    fn test_to_input_event() {
        let event = KeyEvent::release(Key::KEY_LEFT).to_input_event();
        assert_eq!(event.event_type(), evdev::EventType::KEY);
        assert_eq!(event.code(), Key::KEY_LEFT.code());
        assert_eq!(event.value(), 0);
    }
}
