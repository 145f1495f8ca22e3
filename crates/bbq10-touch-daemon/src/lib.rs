//! Touch sensor handling for BBQ10 keyboards
//!
//! Turns relative motion from the keyboard's capacitive touch sensor into
//! arrow key taps, and arbitrates the touchpad click and berry keys depending
//! on whether touch reporting is active.

pub mod arbiter;
pub mod device;
pub mod event;
pub mod filter;
pub mod injector;
pub mod touch;

pub use arbiter::{PendingAction, Verdict};
pub use event::{KeyEvent, KeyState};
pub use filter::{FilterParams, FilterState, MotionOutput, PointerMotion};
pub use touch::{MetaMode, TouchDevice, TouchHardware, TouchState};
