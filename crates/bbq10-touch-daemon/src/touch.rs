//! Touch device context and activation state
//!
//! # Activation State Machine
//!
//! ```text
//!                 set_activation(Always)
//!      ┌──────────────────────────────────────────┐
//!      │                                          ▼
//!  ┌──────────┐        enable()            ┌──────────┐
//!  │ DISABLED │ ─────────────────────────► │ ENABLED  │
//!  │          │ ◄───────────────────────── │          │
//!  └──────────┘        disable()           └──────────┘
//!      ▲                                          │
//!      └──────────────────────────────────────────┘
//!                 set_activation(Meta)
//! ```
//!
//! `enable`, `disable` and `set_activation` are the only paths that change
//! the activation or the enabled flag, and every one of them drives the
//! sensor interrupts to match. With `Activation::Meta` the meta mode
//! component is expected to call `enable`/`disable` as it engages and leaves.

use bbq10_touch_config::{Activation, InputInterpretation};

use crate::filter::{FilterParams, FilterState, MotionOutput};

/// Sensor side of the touch device.
pub trait TouchHardware {
    fn enable_touch_interrupts(&mut self);
    fn disable_touch_interrupts(&mut self);
}

/// Entry point into the meta mode feature set.
pub trait MetaMode {
    fn enable(&mut self);
}

/// Touch reporting state of one keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchState {
    activation: Activation,
    input_as: InputInterpretation,
    enabled: bool,
    rel_x: i32,
    rel_y: i32,
}

impl Default for TouchState {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchState {
    /// State right after probe: meta activation, keys, reporting off.
    pub fn new() -> Self {
        Self {
            activation: Activation::Meta,
            input_as: InputInterpretation::Keys,
            enabled: false,
            rel_x: 0,
            rel_y: 0,
        }
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn input_as(&self) -> InputInterpretation {
        self.input_as
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Last latched motion sample `(rel_x, rel_y)`.
    pub fn rel(&self) -> (i32, i32) {
        (self.rel_x, self.rel_y)
    }

    /// Latch a motion sample read from the sensor.
    pub(crate) fn set_rel(&mut self, rel_x: i32, rel_y: i32) {
        self.rel_x = rel_x;
        self.rel_y = rel_y;
    }

    pub(crate) fn set_input_interpretation(&mut self, input_as: InputInterpretation) {
        self.input_as = input_as;
    }
}

/// A probed touch device: reporting state, filter state and the sensor.
pub struct TouchDevice<H: TouchHardware> {
    hardware: H,
    state: TouchState,
    filter: FilterState,
    params: FilterParams,
}

impl<H: TouchHardware> TouchDevice<H> {
    /// Attach to a sensor. Reporting starts disabled; the sensor is not touched.
    pub fn probe(hardware: H, params: FilterParams) -> Self {
        tracing::info!(
            threshold = params.threshold,
            gain_x = params.gain_x,
            gain_y = params.gain_y,
            "Touch device probed"
        );

        Self {
            hardware,
            state: TouchState::new(),
            filter: FilterState::new(),
            params,
        }
    }

    /// Detach, handing the sensor back with its interrupts off.
    pub fn shutdown(mut self) -> H {
        if self.state.enabled {
            self.disable();
        }
        tracing::info!("Touch device shut down");
        self.hardware
    }

    pub fn state(&self) -> &TouchState {
        &self.state
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn hardware(&self) -> &H {
        &self.hardware
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hardware
    }

    pub fn enable(&mut self) {
        tracing::debug!("Touch reporting enabled");
        self.state.enabled = true;
        self.hardware.enable_touch_interrupts();
    }

    pub fn disable(&mut self) {
        tracing::debug!("Touch reporting disabled");
        self.state.enabled = false;
        self.hardware.disable_touch_interrupts();
    }

    pub fn set_activation(&mut self, activation: Activation) {
        self.state.activation = activation;
        match activation {
            Activation::Always => self.enable(),
            Activation::Meta => self.disable(),
        }
    }

    pub fn set_input_interpretation(&mut self, input_as: InputInterpretation) {
        tracing::debug!(?input_as, "Touch input interpretation changed");
        self.state.set_input_interpretation(input_as);
    }

    /// Feed one motion sample read from the sensor at monotonic time `now_ns`.
    ///
    /// Samples that arrive while reporting is disabled were already in flight
    /// when interrupts were turned off; they are dropped.
    pub fn report_motion(&mut self, rel_x: i32, rel_y: i32, now_ns: u64) -> MotionOutput {
        if !self.state.enabled {
            tracing::trace!(rel_x, rel_y, "Dropping motion while touch is disabled");
            return MotionOutput::Keys(Vec::new());
        }

        tracing::trace!(rel_x, rel_y, "Touch motion");
        self.state.set_rel(rel_x, rel_y);
        self.filter.process(&self.params, &self.state, now_ns)
    }
}
