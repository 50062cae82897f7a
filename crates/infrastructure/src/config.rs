//! Settings loading.
//!
//! Settings come from an optional JSON file (every field has a default) and
//! are then overridden by `COURIER_*` environment variables.

use std::path::Path;
use std::str::FromStr;

use courier_domain::settings::Settings;
use thiserror::Error;
use tracing::debug;

use crate::serialization::from_json;

/// Errors raised while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that was read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid settings JSON.
    #[error("invalid settings in {path}: {message}")]
    Parse {
        /// File that was parsed.
        path: String,
        /// Parser message.
        message: String,
    },

    /// An override variable holds an unusable value.
    #[error("invalid value for {name}: {value:?}")]
    Override {
        /// Variable name.
        name: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Loads settings from `path` (defaults when `None` or missing) and applies
/// environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError`] for unreadable or malformed files and for
/// override values that do not parse.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(path) => read_file(path)?,
        None => Settings::default(),
    };
    apply_overrides(&mut settings, |name| std::env::var(name).ok())?;
    Ok(settings)
}

fn read_file(path: &Path) -> Result<Settings, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "settings file not found; using defaults");
            return Ok(Settings::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };
    from_json(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn parse_override<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Override { name, value })
}

/// Applies `COURIER_*` overrides read through `lookup`.
fn apply_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("COURIER_ITERATIONS") {
        settings.runner.iterations = parse_override("COURIER_ITERATIONS", value)?;
    }
    if let Some(value) = lookup("COURIER_HTTP_TIMEOUT_MS") {
        settings.http.timeout_ms = parse_override("COURIER_HTTP_TIMEOUT_MS", value)?;
    }
    if let Some(value) = lookup("COURIER_MAX_INLINE_BODY_BYTES") {
        settings.http.max_inline_body_bytes =
            parse_override("COURIER_MAX_INLINE_BODY_BYTES", value)?;
    }
    if let Some(value) = lookup("COURIER_ECHO_CONSOLE") {
        settings.scripting.echo_console = match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(ConfigError::Override {
                    name: "COURIER_ECHO_CONSOLE",
                    value,
                });
            }
        };
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = read_file(&dir.path().join("courier.json")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_file_values_are_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courier.json");
        std::fs::write(&path, r#"{"runner": {"iterations": 4}, "http": {"timeout_ms": 500}}"#).unwrap();

        let settings = read_file(&path).unwrap();
        assert_eq!(settings.runner.iterations, 4);
        assert_eq!(settings.http.timeout_ms, 500);
        assert_eq!(settings.scripting.recursion_limit, 512);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("courier.json");
        std::fs::write(&path, "{").unwrap();

        assert!(matches!(read_file(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_overrides_win() {
        let mut settings = Settings::default();
        apply_overrides(
            &mut settings,
            lookup(&[
                ("COURIER_ITERATIONS", "3"),
                ("COURIER_HTTP_TIMEOUT_MS", " 250 "),
                ("COURIER_ECHO_CONSOLE", "true"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.runner.iterations, 3);
        assert_eq!(settings.http.timeout_ms, 250);
        assert!(settings.scripting.echo_console);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let mut settings = Settings::default();
        let err = apply_overrides(&mut settings, lookup(&[("COURIER_ITERATIONS", "many")]))
            .unwrap_err();

        assert_eq!(err.to_string(), "invalid value for COURIER_ITERATIONS: \"many\"");
    }
}
