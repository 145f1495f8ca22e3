//! Device enumeration and sensor plumbing

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use evdev::{Device, EventType, InputEvent, InputEventKind, RelativeAxisType, Synchronization};

use crate::touch::TouchHardware;

/// Information about an input device
#[derive(Debug)]
pub struct DeviceInfo {
    pub path: PathBuf,
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub keyboard: bool,
    pub relative_motion: bool,
}

impl DeviceInfo {
    /// Get vendor:product string (e.g., "1209:9a99")
    pub fn vendor_product(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor, self.product)
    }
}

fn is_event_node(path: &std::path::Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with("event"))
        .unwrap_or(false)
}

/// Enumerate all input devices
pub fn enumerate_devices() -> Result<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    for entry in std::fs::read_dir("/dev/input").context("failed to read /dev/input")? {
        let path = entry?.path();

        if !is_event_node(&path) {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let id = device.input_id();
                devices.push(DeviceInfo {
                    name: device.name().unwrap_or("Unknown").to_string(),
                    vendor: id.vendor(),
                    product: id.product(),
                    keyboard: is_keyboard(&device),
                    relative_motion: has_relative_motion(&device),
                    path,
                });
            }
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
            }
        }
    }

    devices.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(devices)
}

/// Check if a device is a keyboard
pub fn is_keyboard(device: &Device) -> bool {
    device.supported_events().contains(EventType::KEY)
        && device
            .supported_keys()
            .map(|keys| keys.contains(evdev::Key::KEY_A))
            .unwrap_or(false)
}

/// Check if a device reports relative X/Y motion
pub fn has_relative_motion(device: &Device) -> bool {
    device
        .supported_relative_axes()
        .map(|axes| {
            axes.contains(RelativeAxisType::REL_X) && axes.contains(RelativeAxisType::REL_Y)
        })
        .unwrap_or(false)
}

/// Open the first event device whose name matches exactly.
pub fn open_by_name(name: &str) -> Result<(PathBuf, Device)> {
    for entry in std::fs::read_dir("/dev/input").context("failed to read /dev/input")? {
        let path = entry?.path();
        if !is_event_node(&path) {
            continue;
        }

        let device = match Device::open(&path) {
            Ok(device) => device,
            Err(e) => {
                tracing::debug!("Could not open {}: {}", path.display(), e);
                continue;
            }
        };

        if device.name() == Some(name) {
            return Ok((path, device));
        }
    }

    bail!("no input device named '{}' found", name)
}

/// Open a device by name and grab it for exclusive access
pub fn open_and_grab(name: &str) -> Result<Device> {
    let (path, mut device) = open_by_name(name)?;
    device
        .grab()
        .with_context(|| format!("failed to grab {} ({})", name, path.display()))?;
    tracing::info!("Grabbed '{}' at {}", name, path.display());
    Ok(device)
}

/// Stream an event was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    Keyboard,
    Sensor,
}

/// Handler an event is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventRoute {
    Keys,
    Motion,
    Ignore,
}

/// Pick the handler for an event.
///
/// Motion and its SYN_REPORT frames are only taken from the sensor. When the
/// keyboard also carries the sensor (`shared`), its motion frames count too;
/// otherwise the keyboard's own SYN_REPORTs would close sensor frames early.
pub fn route_event(source: EventSource, event_type: EventType, shared: bool) -> EventRoute {
    match (source, event_type) {
        (EventSource::Keyboard, EventType::KEY) => EventRoute::Keys,
        (EventSource::Keyboard, EventType::RELATIVE | EventType::SYNCHRONIZATION) if shared => {
            EventRoute::Motion
        }
        (EventSource::Sensor, EventType::RELATIVE | EventType::SYNCHRONIZATION) => {
            EventRoute::Motion
        }
        _ => EventRoute::Ignore,
    }
}

/// Interrupt switch for a sensor read through evdev.
///
/// The sensor keeps producing events while grabbed; turning interrupts off
/// means samples are discarded before they reach the filter.
#[derive(Debug, Default)]
pub struct SensorGate {
    reporting: bool,
    latch: MotionLatch,
}

impl SensorGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_reporting(&self) -> bool {
        self.reporting
    }

    /// Feed one raw event from the sensor. Returns the complete sample when
    /// the event closes a report and reporting is on.
    pub fn ingest(&mut self, event: &InputEvent) -> Option<(i32, i32)> {
        if !self.reporting {
            return None;
        }
        self.latch.ingest(event)
    }
}

impl TouchHardware for SensorGate {
    fn enable_touch_interrupts(&mut self) {
        tracing::debug!("Touch sensor interrupts on");
        self.reporting = true;
    }

    fn disable_touch_interrupts(&mut self) {
        tracing::debug!("Touch sensor interrupts off");
        self.reporting = false;
        self.latch = MotionLatch::default();
    }
}

/// Collects REL_X / REL_Y deltas until the SYN_REPORT closing the frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MotionLatch {
    rel_x: i32,
    rel_y: i32,
    pending: bool,
}

impl MotionLatch {
    pub fn ingest(&mut self, event: &InputEvent) -> Option<(i32, i32)> {
        match event.kind() {
            InputEventKind::RelAxis(RelativeAxisType::REL_X) => {
                self.rel_x = self.rel_x.saturating_add(event.value());
                self.pending = true;
                None
            }
            InputEventKind::RelAxis(RelativeAxisType::REL_Y) => {
                self.rel_y = self.rel_y.saturating_add(event.value());
                self.pending = true;
                None
            }
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) if self.pending => {
                let sample = (self.rel_x, self.rel_y);
                *self = Self::default();
                Some(sample)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(axis: RelativeAxisType, value: i32) -> InputEvent {
        InputEvent::new(EventType::RELATIVE, axis.0, value)
    }

    fn syn() -> InputEvent {
        InputEvent::new(EventType::SYNCHRONIZATION, Synchronization::SYN_REPORT.0, 0)
    }

    #[test]
    fn test_latch_emits_on_syn_report() {
        let mut latch = MotionLatch::default();
        assert_eq!(latch.ingest(&rel(RelativeAxisType::REL_X, 3)), None);
        assert_eq!(latch.ingest(&rel(RelativeAxisType::REL_Y, -2)), None);
        assert_eq!(latch.ingest(&syn()), Some((3, -2)));
        assert_eq!(latch, MotionLatch::default());
    }

    #[test]
    fn test_latch_single_axis_frame() {
        let mut latch = MotionLatch::default();
        latch.ingest(&rel(RelativeAxisType::REL_Y, 4));
        assert_eq!(latch.ingest(&syn()), Some((0, 4)));
    }

    #[test]
    fn test_latch_sums_repeated_axis() {
        let mut latch = MotionLatch::default();
        latch.ingest(&rel(RelativeAxisType::REL_X, 3));
        latch.ingest(&rel(RelativeAxisType::REL_X, 2));
        assert_eq!(latch.ingest(&syn()), Some((5, 0)));
    }

    #[test]
    fn test_latch_ignores_empty_frames_and_other_axes() {
        let mut latch = MotionLatch::default();
        assert_eq!(latch.ingest(&syn()), None);
        assert_eq!(latch.ingest(&rel(RelativeAxisType::REL_WHEEL, 1)), None);
        assert_eq!(latch.ingest(&syn()), None);
    }

    #[test]
    fn test_gate_drops_samples_while_off() {
        let mut gate = SensorGate::new();
        assert!(!gate.is_reporting());
        assert_eq!(gate.ingest(&rel(RelativeAxisType::REL_X, 3)), None);
        assert_eq!(gate.ingest(&syn()), None);

        gate.enable_touch_interrupts();
        gate.ingest(&rel(RelativeAxisType::REL_X, 3));
        assert_eq!(gate.ingest(&syn()), Some((3, 0)));
    }

    #[test]
    fn test_gate_disable_discards_partial_frame() {
        let mut gate = SensorGate::new();
        gate.enable_touch_interrupts();
        gate.ingest(&rel(RelativeAxisType::REL_X, 3));

        gate.disable_touch_interrupts();
        gate.enable_touch_interrupts();
        assert_eq!(gate.ingest(&syn()), None);
    }

    #[test]
    fn test_route_shared_keyboard_carries_motion() {
        let route = |t| route_event(EventSource::Keyboard, t, true);
        assert_eq!(route(EventType::KEY), EventRoute::Keys);
        assert_eq!(route(EventType::RELATIVE), EventRoute::Motion);
        assert_eq!(route(EventType::SYNCHRONIZATION), EventRoute::Motion);
        assert_eq!(route(EventType::MISC), EventRoute::Ignore);
    }

    #[test]
    fn test_route_separate_sensor_owns_motion_frames() {
        let keyboard = |t| route_event(EventSource::Keyboard, t, false);
        assert_eq!(keyboard(EventType::KEY), EventRoute::Keys);
        assert_eq!(keyboard(EventType::SYNCHRONIZATION), EventRoute::Ignore);
        assert_eq!(keyboard(EventType::RELATIVE), EventRoute::Ignore);

        let sensor = |t| route_event(EventSource::Sensor, t, false);
        assert_eq!(sensor(EventType::RELATIVE), EventRoute::Motion);
        assert_eq!(sensor(EventType::SYNCHRONIZATION), EventRoute::Motion);
        assert_eq!(sensor(EventType::KEY), EventRoute::Ignore);
    }

    #[test]
    fn test_keyboard_syn_does_not_split_sensor_frame() {
        let mut gate = SensorGate::new();
        gate.enable_touch_interrupts();
        let mut feed = |source, event: InputEvent| {
            match route_event(source, event.event_type(), false) {
                EventRoute::Motion => gate.ingest(&event),
                _ => None,
            }
        };

        assert_eq!(feed(EventSource::Sensor, rel(RelativeAxisType::REL_X, 3)), None);
        // key press on the keyboard, closed by its own SYN_REPORT
        let key = InputEvent::new(EventType::KEY, evdev::Key::KEY_A.code(), 1);
        assert_eq!(feed(EventSource::Keyboard, key), None);
        assert_eq!(feed(EventSource::Keyboard, syn()), None);

        assert_eq!(feed(EventSource::Sensor, rel(RelativeAxisType::REL_Y, -2)), None);
        assert_eq!(feed(EventSource::Sensor, syn()), Some((3, -2)));
    }

    #[test]
    fn test_vendor_product_format() {
        let info = DeviceInfo {
            path: PathBuf::from("/dev/input/event3"),
            name: "BBQ10 Keyboard".to_string(),
            vendor: 0x1209,
            product: 0x9a9,
            keyboard: true,
            relative_motion: true,
        };
        assert_eq!(info.vendor_product(), "1209:09a9");
    }
}
