//! Motion to arrow key filter
//!
//! Each sample from the touch sensor is folded into a pair of per-axis
//! accumulators that halve once per decay tick. When enough time has passed
//! since the last emitted key, the accumulated motion of each axis is
//! attenuated by the other axis and compared against the threshold:
//!
//! ```text
//! virt_x = (|factor_x| / (|factor_y| + 1)) * rel_x
//! virt_y = (|factor_y| / (|factor_x| + 1)) * rel_y
//! ```
//!
//! A dominant vertical swipe therefore drives `virt_x` toward zero, which
//! keeps diagonal jitter from producing stray left/right taps.

use bbq10_touch_config::{FilterConfig, InputInterpretation};
use evdev::Key;

use crate::event::KeyEvent;
use crate::touch::TouchState;

const NS_PER_MS: u64 = 1_000_000;

/// Tuning constants for the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterParams {
    /// Emission threshold and accumulator clamp
    pub threshold: i64,
    pub gain_x: i64,
    pub gain_y: i64,
    pub decay_tick_ns: u64,
    pub min_emit_interval_ms: u64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::from(&FilterConfig::default())
    }
}

impl From<&FilterConfig> for FilterParams {
    fn from(config: &FilterConfig) -> Self {
        Self {
            threshold: config.threshold,
            gain_x: config.gain_x,
            gain_y: config.gain_y,
            // a zero tick would divide by zero; the parser rejects it anyway
            decay_tick_ns: config.decay_tick_ns.max(1),
            min_emit_interval_ms: config.min_emit_interval_ms,
        }
    }
}

/// Relative motion forwarded untouched in pointer mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerMotion {
    pub dx: i32,
    pub dy: i32,
}

/// Result of feeding one sample through the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MotionOutput {
    /// Arrow key taps, possibly none
    Keys(Vec<KeyEvent>),
    /// Pointer motion. Emission of pointer events is not implemented by the
    /// host yet; the motion is handed over as-is.
    Pointer(PointerMotion),
}

impl MotionOutput {
    /// Key events carried by this output, empty for pointer motion.
    pub fn key_events(&self) -> &[KeyEvent] {
        match self {
            MotionOutput::Keys(events) => events,
            MotionOutput::Pointer(_) => &[],
        }
    }
}

/// Accumulators and timestamps carried between samples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    factor_x: i64,
    factor_y: i64,
    last_decay_ns: u64,
    last_emit_ns: u64,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current accumulator values `(factor_x, factor_y)`.
    pub fn factors(&self) -> (i64, i64) {
        (self.factor_x, self.factor_y)
    }

    pub fn last_decay_ns(&self) -> u64 {
        self.last_decay_ns
    }

    pub fn last_emit_ns(&self) -> u64 {
        self.last_emit_ns
    }

    /// Process the sample latched in `touch` at monotonic time `now_ns`.
    pub fn process(
        &mut self,
        params: &FilterParams,
        touch: &TouchState,
        now_ns: u64,
    ) -> MotionOutput {
        let (rel_x, rel_y) = touch.rel();

        match touch.input_as() {
            InputInterpretation::Pointer => {
                MotionOutput::Pointer(PointerMotion { dx: rel_x, dy: rel_y })
            }
            InputInterpretation::Keys => {
                MotionOutput::Keys(self.process_keys(params, rel_x, rel_y, now_ns))
            }
        }
    }

    fn process_keys(
        &mut self,
        params: &FilterParams,
        rel_x: i32,
        rel_y: i32,
        now_ns: u64,
    ) -> Vec<KeyEvent> {
        if now_ns < self.last_decay_ns {
            tracing::debug!(
                now_ns,
                last = self.last_decay_ns,
                "Clock went backwards, resyncing decay timer"
            );
            self.last_decay_ns = now_ns;
            return Vec::new();
        }
        if now_ns < self.last_emit_ns {
            tracing::debug!(
                now_ns,
                last = self.last_emit_ns,
                "Clock went backwards, resyncing emit timer"
            );
            self.last_emit_ns = now_ns;
            return Vec::new();
        }

        let clamp = params.threshold.saturating_abs();
        self.factor_x = self.factor_x.clamp(-clamp, clamp);
        self.factor_y = self.factor_y.clamp(-clamp, clamp);

        let ticks = (now_ns - self.last_decay_ns) / params.decay_tick_ns;
        if ticks > 0 {
            self.factor_x = halve(self.factor_x, ticks);
            self.factor_y = halve(self.factor_y, ticks);
            self.last_decay_ns = now_ns;
        }

        self.factor_x = self
            .factor_x
            .saturating_add(i64::from(rel_x).saturating_mul(params.gain_x));
        self.factor_y = self
            .factor_y
            .saturating_add(i64::from(rel_y).saturating_mul(params.gain_y));

        let since_emit_ms = (now_ns - self.last_emit_ns) / NS_PER_MS;
        if since_emit_ms < params.min_emit_interval_ms {
            return Vec::new();
        }
        self.last_emit_ns = now_ns;

        let virt_x = attenuate(self.factor_x, self.factor_y).saturating_mul(i64::from(rel_x));
        let virt_y = attenuate(self.factor_y, self.factor_x).saturating_mul(i64::from(rel_y));

        let mut events = Vec::new();

        if virt_x.unsigned_abs() > clamp.unsigned_abs() {
            let key = if virt_x > 0 { Key::KEY_RIGHT } else { Key::KEY_LEFT };
            tracing::debug!(virt_x, ?key, "Horizontal swipe");
            events.extend(KeyEvent::tap(key));
        }

        if virt_y.unsigned_abs() > clamp.unsigned_abs() {
            let key = if virt_y > 0 { Key::KEY_DOWN } else { Key::KEY_UP };
            tracing::debug!(virt_y, ?key, "Vertical swipe");
            events.extend(KeyEvent::tap(key));
        }

        events
    }
}

/// `|major| / (|minor| + 1)`, saturating at `i64::MAX`.
fn attenuate(major: i64, minor: i64) -> i64 {
    let ratio = major.unsigned_abs() / minor.unsigned_abs().saturating_add(1);
    i64::try_from(ratio).unwrap_or(i64::MAX)
}

/// Halve `value` `ticks` times, truncating toward zero at every step.
fn halve(value: i64, ticks: u64) -> i64 {
    // truncating division composes, so n halvings equal one division by 2^n
    if ticks >= 63 {
        0
    } else {
        value / (1i64 << ticks)
    }
}
