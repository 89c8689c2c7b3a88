//! Configuration file parsing and structures.
//!
//! The bridge is configured from a single TOML file with a `[logging]` section
//! and a `[platform]` section carrying the account credentials and options.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub platform: RawPlatformConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

/// The `[platform]` section as written in the file.
///
/// Nothing here is validated yet; see [`PlatformConfig`].
#[derive(Debug, Default, Deserialize)]
pub struct RawPlatformConfig {
    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Kept untyped so that a non-boolean value can be reported instead of
    /// rejecting the whole file.
    #[serde(default, alias = "showPlugsAsSwitches")]
    pub show_plugs_as_switches: Option<toml::Value>,
}

/// Validated platform options.
#[derive(Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub email: String,
    pub password: String,
    pub show_plugs_as_switches: bool,
}

impl std::fmt::Debug for PlatformConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformConfig")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("show_plugs_as_switches", &self.show_plugs_as_switches)
            .finish()
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML text
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::Parse)
    }

    /// Validate the `[platform]` section.
    pub fn platform_config(&self) -> Result<PlatformConfig, ConfigError> {
        PlatformConfig::try_from(&self.platform)
    }
}

impl TryFrom<&RawPlatformConfig> for PlatformConfig {
    type Error = ConfigError;

    fn try_from(raw: &RawPlatformConfig) -> Result<Self, Self::Error> {
        let (email, password) = match (&raw.email, &raw.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                (email.clone(), password.clone())
            }
            _ => return Err(ConfigError::MissingCredentials),
        };

        let show_plugs_as_switches = match &raw.show_plugs_as_switches {
            Some(toml::Value::Boolean(b)) => *b,
            Some(other) => {
                if is_truthy(other) {
                    error!("Invalid show_plugs_as_switches config value - must be boolean value!");
                }
                false
            }
            None => false,
        };

        Ok(PlatformConfig {
            email,
            password,
            show_plugs_as_switches,
        })
    }
}

fn is_truthy(value: &toml::Value) -> bool {
    match value {
        toml::Value::Boolean(b) => *b,
        toml::Value::String(s) => !s.is_empty(),
        toml::Value::Integer(i) => *i != 0,
        toml::Value::Float(f) => *f != 0.0 && !f.is_nan(),
        toml::Value::Datetime(_) | toml::Value::Array(_) | toml::Value::Table(_) => true,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No valid Eufy account email/password provided")]
    MissingCredentials,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let toml = r#"
            [platform]
            email = "me@example.com"
            password = "hunter2"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);

        let platform = config.platform_config().unwrap();
        assert_eq!(platform.email, "me@example.com");
        assert_eq!(platform.password, "hunter2");
        assert!(!platform.show_plugs_as_switches);
    }

    #[test]
    fn test_parse_logging_overrides() {
        let toml = r#"
            [logging]
            level = "debug"

            [logging.overrides]
            "eufy_bridge::engine" = "trace"

            [platform]
            email = "me@example.com"
            password = "hunter2"
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.logging.overrides.get("eufy_bridge::engine"),
            Some(&LogLevel::Trace)
        );
    }

    #[test]
    fn test_show_plugs_as_switches() {
        let toml = r#"
            [platform]
            email = "me@example.com"
            password = "hunter2"
            show_plugs_as_switches = true
        "#;
        let platform = Config::parse(toml).unwrap().platform_config().unwrap();
        assert!(platform.show_plugs_as_switches);

        let camel = r#"
            [platform]
            email = "me@example.com"
            password = "hunter2"
            showPlugsAsSwitches = true
        "#;
        let platform = Config::parse(camel).unwrap().platform_config().unwrap();
        assert!(platform.show_plugs_as_switches);
    }

    #[test]
    fn test_non_boolean_show_plugs_falls_back_to_default() {
        let toml = r#"
            [platform]
            email = "me@example.com"
            password = "hunter2"
            show_plugs_as_switches = "yes"
        "#;

        let platform = Config::parse(toml).unwrap().platform_config().unwrap();
        assert!(!platform.show_plugs_as_switches);
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let toml = r#"
            [platform]
            email = "me@example.com"
        "#;

        let err = Config::parse(toml).unwrap().platform_config().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));

        let empty = r#"
            [platform]
            email = ""
            password = "hunter2"
        "#;
        let err = Config::parse(empty).unwrap().platform_config().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[logging]
level = "warn"

[platform]
email = "me@example.com"
password = "hunter2"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert!(config.platform_config().is_ok());
    }

    #[test]
    fn test_missing_file_error() {
        let err = Config::from_file("/nonexistent/eufy.toml").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failed to read"), "unexpected error: {}", msg);
        assert!(msg.contains("/nonexistent/eufy.toml"));
    }

    #[test]
    fn test_missing_platform_section_is_parse_error() {
        let err = Config::parse("[logging]\nlevel = \"info\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
