//! Virtual device injection via uinput
//!
//! Translated arrow keys, substitute chords and passed-through keys all leave
//! the daemon through one virtual keyboard.

use anyhow::{Context, Result};
use evdev::{uinput::VirtualDeviceBuilder, AttributeSet, InputEvent, Key};

use crate::event::KeyEvent;

/// A virtual input device for injecting events
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
}

impl VirtualDevice {
    /// Create a new virtual keyboard device
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual device cannot be created (e.g., insufficient
    /// permissions to access /dev/uinput).
    pub fn new_keyboard(name: &str) -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();

        // Every code in the keyboard range, so passthrough never drops a key
        for code in 0..256u16 {
            keys.insert(Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .context("failed to open /dev/uinput")?
            .name(name)
            .with_keys(&keys)?
            .build()
            .with_context(|| format!("failed to create virtual keyboard '{}'", name))?;

        tracing::info!("Created virtual keyboard '{}'", name);

        Ok(Self { device })
    }

    /// Emit raw input events; evdev terminates the batch with SYN_REPORT.
    pub fn emit(&mut self, events: &[InputEvent]) -> Result<()> {
        self.device.emit(events)?;
        Ok(())
    }

    /// Emit key transitions in order, one synchronized report each.
    ///
    /// Each transition gets its own report so that taps are seen as a
    /// separate press and release by clients.
    pub fn send(&mut self, events: &[KeyEvent]) -> Result<()> {
        for event in events {
            self.emit(&[event.to_input_event()])?;
        }
        Ok(())
    }
}
