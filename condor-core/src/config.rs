//! Configuration file management for condor-telemetry.
//!
//! Reads/writes `~/.condor-telemetry/config.yaml` with listener settings,
//! the coordinate helper location, and output paths.

use std::path::PathBuf;

use crate::types::CondorError;

/// Full configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    pub listener: ListenerConfig,
    pub helper: HelperConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub host: String,
    pub port: u16,
    /// Label attached to log lines when watching several servers.
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HelperConfig {
    /// Path to the coordinate helper executable; `None` disables
    /// geographic enrichment.
    pub path: Option<String>,
    /// Per-request timeout, seconds.
    pub timeout_secs: f64,
    /// Landscape name passed to the helper at startup.
    pub landscape: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Directory for flight-plan files and the identity map.
    pub dir: String,
    /// Identity map filename inside `dir`.
    pub identity_map: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: ListenerConfig {
                host: "0.0.0.0".into(),
                port: 56298,
                label: None,
            },
            helper: HelperConfig {
                path: None,
                timeout_secs: 2.0,
                landscape: None,
            },
            output: OutputConfig {
                dir: "data".into(),
                identity_map: "identity_map.json".into(),
            },
        }
    }
}

/// Get the config directory path (`~/.condor-telemetry/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".condor-telemetry")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.condor-telemetry/config.yaml`.
///
/// Returns default config if file doesn't exist.
pub fn load_config() -> Config {
    let path = config_file();
    if !path.exists() {
        return Config::default();
    }

    let text = match std::fs::read_to_string(&path) {
        Ok(t) => t,
        Err(_) => return Config::default(),
    };

    parse_config(&text).unwrap_or_default()
}

/// Save config to `~/.condor-telemetry/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf, CondorError> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir).map_err(|e| CondorError::Config(e.to_string()))?;

    let path = config_file();
    let text = serialize_config(config);
    std::fs::write(&path, text).map_err(|e| CondorError::Config(e.to_string()))?;

    Ok(path)
}

/// Parse simple YAML-like config text.
fn parse_config(text: &str) -> Option<Config> {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        if let Some((key, val)) = stripped.split_once(':') {
            let key = key.trim();
            let val = val.trim();

            if !is_indented {
                if val.is_empty() {
                    current_section = Some(key.to_string());
                } else {
                    current_section = None;
                }
            } else if let Some(ref section) = current_section {
                match section.as_str() {
                    "listener" => match key {
                        "host" => {
                            if let Some(v) = parse_string_value(val) {
                                config.listener.host = v;
                            }
                        }
                        "port" => {
                            if let Ok(v) = val.parse::<u16>() {
                                config.listener.port = v;
                            }
                        }
                        "label" => config.listener.label = parse_string_value(val),
                        _ => {}
                    },
                    "helper" => match key {
                        "path" => config.helper.path = parse_string_value(val),
                        "timeout_secs" => {
                            if let Some(v) = parse_float_value(val) {
                                config.helper.timeout_secs = v;
                            }
                        }
                        "landscape" => config.helper.landscape = parse_string_value(val),
                        _ => {}
                    },
                    "output" => match key {
                        "dir" => {
                            if let Some(v) = parse_string_value(val) {
                                config.output.dir = v;
                            }
                        }
                        "identity_map" => {
                            if let Some(v) = parse_string_value(val) {
                                config.output.identity_map = v;
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
    }

    Some(config)
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if (val.starts_with('"') && val.ends_with('"'))
        || (val.starts_with('\'') && val.ends_with('\''))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let mut lines = vec![
        "# condor-telemetry configuration".to_string(),
        String::new(),
    ];

    lines.push("listener:".into());
    lines.push(format!("  host: \"{}\"", config.listener.host));
    lines.push(format!("  port: {}", config.listener.port));
    match &config.listener.label {
        Some(v) => lines.push(format!("  label: \"{v}\"")),
        None => lines.push("  label: null".into()),
    }
    lines.push(String::new());

    lines.push("helper:".into());
    match &config.helper.path {
        Some(v) => lines.push(format!("  path: \"{v}\"")),
        None => lines.push("  path: null".into()),
    }
    lines.push(format!("  timeout_secs: {}", config.helper.timeout_secs));
    match &config.helper.landscape {
        Some(v) => lines.push(format!("  landscape: \"{v}\"")),
        None => lines.push("  landscape: null".into()),
    }
    lines.push(String::new());

    lines.push("output:".into());
    lines.push(format!("  dir: \"{}\"", config.output.dir));
    lines.push(format!("  identity_map: \"{}\"", config.output.identity_map));
    lines.push(String::new());

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.listener.port, 56298);
        assert!(config.helper.path.is_none());
        assert_eq!(config.output.identity_map, "identity_map.json");
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
listener:
  host: "127.0.0.1"
  port: 56300
  label: "ridge-server"

helper:
  path: "/opt/condor/navicon-helper"
  timeout_secs: 1.5
  landscape: "AA3"

output:
  dir: "/var/lib/condor"
  identity_map: "pilots.json"
"#;
        let config = parse_config(text).unwrap();
        assert_eq!(config.listener.host, "127.0.0.1");
        assert_eq!(config.listener.port, 56300);
        assert_eq!(config.listener.label, Some("ridge-server".into()));
        assert_eq!(config.helper.path, Some("/opt/condor/navicon-helper".into()));
        assert_eq!(config.helper.timeout_secs, 1.5);
        assert_eq!(config.helper.landscape, Some("AA3".into()));
        assert_eq!(config.output.dir, "/var/lib/condor");
        assert_eq!(config.output.identity_map, "pilots.json");
    }

    #[test]
    fn test_parse_config_null_values() {
        let text = r#"
listener:
  label: null

helper:
  path: ~
  landscape: null
"#;
        let config = parse_config(text).unwrap();
        assert!(config.listener.label.is_none());
        assert!(config.helper.path.is_none());
        assert!(config.helper.landscape.is_none());
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.listener.port = 56300;
        config.listener.label = Some("test".into());
        config.helper.path = Some("helper.exe".into());
        config.helper.landscape = Some("Slovenia".into());

        let text = serialize_config(&config);
        let parsed = parse_config(&text).unwrap();
        assert_eq!(parsed.listener.port, 56300);
        assert_eq!(parsed.listener.label, Some("test".into()));
        assert_eq!(parsed.helper.path, Some("helper.exe".into()));
        assert_eq!(parsed.helper.landscape, Some("Slovenia".into()));
        assert_eq!(parsed.helper.timeout_secs, 2.0);
    }
}
