//! Configuration parsing for bbq10-touch
//!
//! This crate parses the KDL configuration file that selects the keyboard and
//! touch sensor devices and tunes the motion filter.

mod error;
mod model;
mod parser;

pub use error::ConfigError;
pub use model::*;
pub use parser::{parse_config, parse_config_str};
