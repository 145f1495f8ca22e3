//! KDL configuration parser

use std::path::Path;

use crate::error::ConfigError;
use crate::model::*;

/// Parse a configuration file from the given path
pub fn parse_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse configuration from a string
pub fn parse_config_str(content: &str) -> Result<Config, ConfigError> {
    let doc: kdl::KdlDocument = content.parse().map_err(|e: kdl::KdlError| {
        // kdl links an older miette, so rebuild the span from offset/len
        let offset = e.span.offset();
        let len = e.span.len();
        let span = miette::SourceSpan::from((offset, len));
        ConfigError::ParseError {
            src: content.to_string(),
            span,
            source: e,
        }
    })?;

    let mut config = Config::default();

    for node in doc.nodes() {
        match node.name().value() {
            "global" => {
                config.global = parse_global(node)?;
            }
            "keyboard" => {
                config.keyboard = Some(required_string(node, "keyboard")?.to_string());
            }
            "sensor" => {
                config.sensor = Some(required_string(node, "sensor")?.to_string());
            }
            "touch" => {
                config.touch = parse_touch(node)?;
            }
            name => {
                tracing::warn!("Unknown top-level node: {}", name);
            }
        }
    }

    Ok(config)
}

/// First positional string argument of a node, if any.
fn first_string(node: &kdl::KdlNode) -> Option<&str> {
    node.entries().first().and_then(|e| e.value().as_string())
}

fn required_string<'a>(node: &'a kdl::KdlNode, field: &str) -> Result<&'a str, ConfigError> {
    first_string(node).ok_or_else(|| ConfigError::MissingField {
        field: format!("{} name (e.g., `{} \"BBQ10 Keyboard\"`)", field, field),
    })
}

/// First positional argument of a node as a strictly positive integer.
fn positive_int(node: &kdl::KdlNode) -> Result<i64, ConfigError> {
    let name = node.name().value();
    let value = node
        .entries()
        .first()
        .and_then(|e| e.value().as_i64())
        .ok_or_else(|| ConfigError::Invalid {
            message: format!("'{}' expects an integer value", name),
        })?;

    if value <= 0 {
        return Err(ConfigError::Invalid {
            message: format!("'{}' must be positive, got {}", name, value),
        });
    }

    Ok(value)
}

fn parse_global(node: &kdl::KdlNode) -> Result<GlobalConfig, ConfigError> {
    let mut global = GlobalConfig::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "log-level" => {
                    if let Some(val) = first_string(child) {
                        global.log_level =
                            val.parse().map_err(|e| ConfigError::Invalid { message: e })?;
                    }
                }
                "virtual-device-name" => {
                    if let Some(val) = first_string(child) {
                        global.virtual_device_name = val.to_string();
                    }
                }
                name => {
                    tracing::warn!("Unknown global config option: {}", name);
                }
            }
        }
    }

    Ok(global)
}

fn parse_touch(node: &kdl::KdlNode) -> Result<TouchConfig, ConfigError> {
    let mut touch = TouchConfig::default();

    let Some(children) = node.children() else {
        return Ok(touch);
    };

    for child in children.nodes() {
        match child.name().value() {
            "activation" => {
                let val = first_string(child).ok_or_else(|| ConfigError::Invalid {
                    message: "'activation' expects \"always\" or \"meta\"".to_string(),
                })?;
                touch.activation = val.parse().map_err(|e| ConfigError::Invalid { message: e })?;
            }
            "input-as" => {
                let val = first_string(child).ok_or_else(|| ConfigError::Invalid {
                    message: "'input-as' expects \"keys\" or \"pointer\"".to_string(),
                })?;
                touch.input_as = val.parse().map_err(|e| ConfigError::Invalid { message: e })?;
            }
            "threshold" => touch.filter.threshold = positive_int(child)?,
            "gain-x" => touch.filter.gain_x = positive_int(child)?,
            "gain-y" => touch.filter.gain_y = positive_int(child)?,
            "decay-tick-ns" => touch.filter.decay_tick_ns = positive_int(child)? as u64,
            "min-emit-interval-ms" => {
                touch.filter.min_emit_interval_ms = positive_int(child)? as u64
            }
            name => {
                tracing::warn!("Unknown touch config option: {}", name);
            }
        }
    }

    Ok(touch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_config() {
        let config = r#"
            global {
                log-level "debug"
                virtual-device-name "bbq10-arrows"
            }

            keyboard "BBQ10 Keyboard"
            sensor "BBQ10 Touch"

            touch {
                activation "always"
                input-as "keys"
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.global.log_level, LogLevel::Debug);
        assert_eq!(result.global.virtual_device_name, "bbq10-arrows");
        assert_eq!(result.keyboard.as_deref(), Some("BBQ10 Keyboard"));
        assert_eq!(result.sensor_name(), Some("BBQ10 Touch"));
        assert_eq!(result.touch.activation, Activation::Always);
        assert_eq!(result.touch.input_as, InputInterpretation::Keys);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let result = parse_config_str("").unwrap();
        assert_eq!(result.global.log_level, LogLevel::Info);
        assert_eq!(result.global.virtual_device_name, "bbq10-touch");
        assert_eq!(result.keyboard, None);
        assert_eq!(result.touch.activation, Activation::Meta);
        assert_eq!(result.touch.input_as, InputInterpretation::Keys);
        assert_eq!(result.touch.filter, FilterConfig::default());
    }

    #[test]
    fn test_default_filter_constants() {
        let filter = FilterConfig::default();
        assert_eq!(filter.threshold, 10_000);
        assert_eq!(filter.gain_x, 3200);
        assert_eq!(filter.gain_y, 1700);
        assert_eq!(filter.decay_tick_ns, 10_000);
        assert_eq!(filter.min_emit_interval_ms, 25);
    }

    #[test]
    fn test_sensor_falls_back_to_keyboard() {
        let result = parse_config_str(r#"keyboard "BBQ10 Keyboard""#).unwrap();
        assert_eq!(result.sensor, None);
        assert_eq!(result.sensor_name(), Some("BBQ10 Keyboard"));
    }

    #[test]
    fn test_filter_overrides() {
        let config = r#"
            touch {
                threshold 8000
                gain-x 4000
                gain-y 2000
                decay-tick-ns 20000
                min-emit-interval-ms 40
            }
        "#;

        let filter = parse_config_str(config).unwrap().touch.filter;
        assert_eq!(filter.threshold, 8000);
        assert_eq!(filter.gain_x, 4000);
        assert_eq!(filter.gain_y, 2000);
        assert_eq!(filter.decay_tick_ns, 20_000);
        assert_eq!(filter.min_emit_interval_ms, 40);
    }

    #[test]
    fn test_pointer_aliases() {
        let result = parse_config_str(r#"touch { input-as "mouse"; }"#).unwrap();
        assert_eq!(result.touch.input_as, InputInterpretation::Pointer);
    }

    #[test]
    fn test_unknown_activation_error() {
        let result = parse_config_str(r#"touch { activation "sometimes"; }"#);
        match result {
            Err(ConfigError::Invalid { message }) => {
                assert!(message.contains("sometimes"));
            }
            other => panic!("Expected Invalid error, got: {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_threshold_error() {
        let result = parse_config_str("touch { threshold 0; }");
        match result {
            Err(ConfigError::Invalid { message }) => {
                assert!(message.contains("threshold"));
            }
            other => panic!("Expected Invalid error, got: {:?}", other),
        }
    }

    #[test]
    fn test_string_gain_error() {
        let result = parse_config_str(r#"touch { gain-x "fast"; }"#);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_keyboard_missing_name_error() {
        let result = parse_config_str("keyboard");
        match result {
            Err(ConfigError::MissingField { field }) => {
                assert!(field.contains("keyboard"));
            }
            other => panic!("Expected MissingField error, got: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_log_level_error() {
        let result = parse_config_str(r#"global { log-level "loud"; }"#);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_kdl_syntax_error() {
        let result = parse_config_str("touch { threshold");
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_unknown_nodes_are_ignored() {
        let config = r#"
            trackball "yes"
            touch {
                sparkle 3
            }
        "#;

        let result = parse_config_str(config).unwrap();
        assert_eq!(result.touch, TouchConfig::default());
    }

    #[test]
    fn test_parse_config_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"keyboard "BBQ10 Keyboard""#).unwrap();
        writeln!(file, r#"touch {{ activation "always"; }}"#).unwrap();

        let result = parse_config(file.path()).unwrap();
        assert_eq!(result.keyboard.as_deref(), Some("BBQ10 Keyboard"));
        assert_eq!(result.touch.activation, Activation::Always);
    }

    #[test]
    fn test_parse_config_missing_file() {
        let result = parse_config(Path::new("/nonexistent/bbq10-touch/config.kdl"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
