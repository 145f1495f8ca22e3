//! bbq10-touch daemon
//!
//! Grabs the keyboard and its touch sensor, turns touch motion into arrow
//! keys and arbitrates the touchpad click and berry keys.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use bbq10_touch::device::{self, EventRoute, EventSource, SensorGate};
use bbq10_touch::event::KeyState;
use bbq10_touch::injector::VirtualDevice;
use bbq10_touch::{FilterParams, MetaMode, MotionOutput, TouchDevice, Verdict};
use bbq10_touch_config::{Activation, ConfigError, InputInterpretation};
use clap::Parser;
use evdev::{EventStream, InputEvent, InputEventKind};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{reload, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bbq10-touchd")]
#[command(about = "Touch sensor to arrow key daemon for BBQ10 keyboards")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/bbq10-touch/config.kdl")]
    config: String,

    /// Override touch activation: always, meta
    #[arg(long, value_parser = parse_activation)]
    activation: Option<Activation>,

    /// Override touch input interpretation: keys, pointer
    #[arg(long, value_parser = parse_input_as)]
    input_as: Option<InputInterpretation>,
}

fn parse_activation(s: &str) -> Result<Activation, String> {
    s.parse()
}

fn parse_input_as(s: &str) -> Result<InputInterpretation, String> {
    s.parse()
}

/// Meta mode lives outside this daemon; requests are only reported.
#[derive(Debug, Default)]
struct LoggedMetaMode {
    requests: u64,
}

impl MetaMode for LoggedMetaMode {
    fn enable(&mut self) {
        self.requests += 1;
        tracing::info!(requests = self.requests, "Meta mode requested");
    }
}

/// Nanoseconds since daemon start, from a monotonic clock.
struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    fn new() -> Self {
        Self { start: Instant::now() }
    }

    fn now_ns(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

struct Daemon {
    touch: TouchDevice<SensorGate>,
    output: VirtualDevice,
    meta: LoggedMetaMode,
    clock: MonotonicClock,
    /// Keyboard and sensor are the same evdev device
    shared: bool,
}

impl Daemon {
    fn handle_sensor_event(&mut self, event: &InputEvent) -> Result<()> {
        let Some((rel_x, rel_y)) = self.touch.hardware_mut().ingest(event) else {
            return Ok(());
        };

        match self.touch.report_motion(rel_x, rel_y, self.clock.now_ns()) {
            MotionOutput::Keys(events) => self.output.send(&events)?,
            MotionOutput::Pointer(motion) => {
                tracing::trace!(?motion, "Pointer output is not implemented, dropping motion");
            }
        }
        Ok(())
    }

    fn handle_keyboard_event(&mut self, event: &InputEvent) -> Result<()> {
        let InputEventKind::Key(key) = event.kind() else {
            return Ok(());
        };

        let Some(state) = KeyState::from_value(event.value()) else {
            return self.output.emit(&[*event]);
        };

        match self.touch.consumes_keycode(key, state, &mut self.meta) {
            Verdict::PassThrough => self.output.emit(&[*event]),
            Verdict::Consumed(events) => self.output.send(&events),
            Verdict::Pending(action) => {
                tracing::debug!(?key, ?action, "Trigger key consumed, substitute not implemented");
                Ok(())
            }
        }
    }

    fn handle_event(&mut self, source: EventSource, event: InputEvent) -> Result<()> {
        match device::route_event(source, event.event_type(), self.shared) {
            EventRoute::Keys => self.handle_keyboard_event(&event),
            EventRoute::Motion => self.handle_sensor_event(&event),
            EventRoute::Ignore => Ok(()),
        }
    }
}

async fn next_sensor_event(sensor: &mut Option<EventStream>) -> std::io::Result<InputEvent> {
    match sensor {
        Some(stream) => stream.next_event().await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Level from the config file applies once it is loaded, unless RUST_LOG is set
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();

    tracing::info!("Loading configuration from {}", config_path.display());

    let mut config = bbq10_touch_config::parse_config(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;

    if std::env::var_os("RUST_LOG").is_none() {
        filter_handle.reload(EnvFilter::new(config.global.log_level.as_filter()))?;
    }

    if let Some(activation) = args.activation {
        config.touch.activation = activation;
    }
    if let Some(input_as) = args.input_as {
        config.touch.input_as = input_as;
    }

    let keyboard_name = config.keyboard.clone().ok_or_else(|| ConfigError::MissingField {
        field: "keyboard (e.g., `keyboard \"BBQ10 Keyboard\"`)".to_string(),
    })?;
    let sensor_name = config.sensor_name().unwrap_or(&keyboard_name).to_string();

    let keyboard = device::open_and_grab(&keyboard_name)?;
    let mut keyboard = keyboard
        .into_event_stream()
        .context("failed to stream keyboard events")?;

    let mut sensor = if sensor_name == keyboard_name {
        None
    } else {
        let device = device::open_and_grab(&sensor_name)?;
        Some(device.into_event_stream().context("failed to stream sensor events")?)
    };

    let params = FilterParams::from(&config.touch.filter);
    let mut touch = TouchDevice::probe(SensorGate::new(), params);
    touch.set_input_interpretation(config.touch.input_as);
    touch.set_activation(config.touch.activation);

    let mut daemon = Daemon {
        touch,
        output: VirtualDevice::new_keyboard(&config.global.virtual_device_name)?,
        meta: LoggedMetaMode::default(),
        clock: MonotonicClock::new(),
        shared: sensor.is_none(),
    };

    tracing::info!(
        activation = ?config.touch.activation,
        input_as = ?config.touch.input_as,
        "bbq10-touch daemon running"
    );

    loop {
        tokio::select! {
            event = keyboard.next_event() => {
                let event = event.context("keyboard read failed")?;
                daemon.handle_event(EventSource::Keyboard, event)?;
            }
            event = next_sensor_event(&mut sensor) => {
                let event = event.context("sensor read failed")?;
                daemon.handle_event(EventSource::Sensor, event)?;
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    daemon.touch.shutdown();

    Ok(())
}
