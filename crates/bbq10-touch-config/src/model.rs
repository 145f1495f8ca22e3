//! Configuration data model

/// Root configuration structure
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub global: GlobalConfig,
    /// Name of the keyboard evdev device carrying the trigger keys
    pub keyboard: Option<String>,
    /// Name of the evdev device reporting relative touch motion.
    /// Falls back to the keyboard device when unset.
    pub sensor: Option<String>,
    pub touch: TouchConfig,
}

impl Config {
    /// Device name the touch sensor is read from.
    pub fn sensor_name(&self) -> Option<&str> {
        self.sensor.as_deref().or(self.keyboard.as_deref())
    }
}

/// Global settings
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub log_level: LogLevel,
    /// Name given to the uinput keyboard that receives translated events
    pub virtual_device_name: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            virtual_device_name: "bbq10-touch".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown log level: {}", s)),
        }
    }
}

/// When touch reporting is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Activation {
    /// Touch reporting is always on
    Always,
    /// Touch reporting is only on while meta mode is engaged
    #[default]
    Meta,
}

impl std::str::FromStr for Activation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "meta" => Ok(Self::Meta),
            _ => Err(format!("Unknown activation: {} (expected \"always\" or \"meta\")", s)),
        }
    }
}

/// How touch motion is turned into output events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputInterpretation {
    /// Motion becomes arrow key taps
    #[default]
    Keys,
    /// Motion is forwarded as pointer movement
    Pointer,
}

impl std::str::FromStr for InputInterpretation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keys" | "arrows" => Ok(Self::Keys),
            "pointer" | "mouse" => Ok(Self::Pointer),
            _ => Err(format!(
                "Unknown input interpretation: {} (expected \"keys\" or \"pointer\")",
                s
            )),
        }
    }
}

/// Touch behaviour settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchConfig {
    pub activation: Activation,
    pub input_as: InputInterpretation,
    pub filter: FilterConfig,
}

/// Motion filter tuning. Defaults match the sensor on the BBQ10 keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Virtual displacement a sample must exceed to emit a key; also the
    /// accumulator clamp
    pub threshold: i64,
    /// Horizontal accumulator gain per unit of motion
    pub gain_x: i64,
    /// Vertical accumulator gain per unit of motion
    pub gain_y: i64,
    /// Nanoseconds per accumulator halving
    pub decay_tick_ns: u64,
    /// Minimum milliseconds between emitted key events
    pub min_emit_interval_ms: u64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            threshold: 10_000,
            gain_x: 3200,
            gain_y: 1700,
            decay_tick_ns: 10_000,
            min_emit_interval_ms: 25,
        }
    }
}
