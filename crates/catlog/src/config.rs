use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use log_schema::Level;
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_schema_file")]
    pub schema_file: PathBuf,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    #[serde(default)]
    pub transport: TransportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_file: default_schema_file(),
            logging: LoggingConfig::default(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Filter for catlog's own diagnostics (not for the entries it routes).
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Everything the logger factory needs besides the schema.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Directory every destination template is resolved against.
    #[serde(default = "default_log_root")]
    pub log_root: PathBuf,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    #[serde(default = "default_targets")]
    pub targets: Vec<TargetConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            log_root: default_log_root(),
            flush_interval_ms: default_flush_interval_ms(),
            targets: default_targets(),
        }
    }
}

impl TransportConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

/// One configured delivery target. Every category gets its own instance of
/// each target, with `{category}` substituted into its destination.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetConfig {
    Console {
        #[serde(default = "default_console_level")]
        min_level: Level,
        #[serde(default = "default_true")]
        colorize: bool,
    },
    File {
        #[serde(default = "default_file_level")]
        min_level: Level,
        #[serde(default = "default_file_destination")]
        destination: String,
    },
    #[serde(alias = "rotatingCompressed")]
    RotatingCompressed {
        #[serde(default = "default_archive_level")]
        min_level: Level,
        /// Resolved once at startup; `{level}` becomes `min_level` and
        /// `{date}` the startup date.
        #[serde(default = "default_archive_destination")]
        destination: String,
        #[serde(default = "default_max_bytes")]
        max_bytes: u64,
        /// `None` disables age-based rotation.
        #[serde(default = "default_max_age_secs")]
        max_age_secs: Option<u64>,
        #[serde(default = "default_retention")]
        retention: usize,
        #[serde(default = "default_true")]
        compress: bool,
        /// Route through a flush worker instead of writing inline.
        #[serde(default = "default_true")]
        buffered: bool,
    },
}

impl TargetConfig {
    pub fn min_level(&self) -> Level {
        match self {
            TargetConfig::Console { min_level, .. }
            | TargetConfig::File { min_level, .. }
            | TargetConfig::RotatingCompressed { min_level, .. } => *min_level,
        }
    }

    /// Destination template, for targets that write files.
    pub fn destination(&self) -> Option<&str> {
        match self {
            TargetConfig::Console { .. } => None,
            TargetConfig::File { destination, .. }
            | TargetConfig::RotatingCompressed { destination, .. } => Some(destination.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_schema_file() -> PathBuf {
    PathBuf::from("schema.yaml")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

fn default_log_root() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_flush_interval_ms() -> u64 {
    100
}

fn default_targets() -> Vec<TargetConfig> {
    vec![
        TargetConfig::Console {
            min_level: default_console_level(),
            colorize: default_true(),
        },
        TargetConfig::File {
            min_level: default_file_level(),
            destination: default_file_destination(),
        },
        TargetConfig::RotatingCompressed {
            min_level: default_archive_level(),
            destination: default_archive_destination(),
            max_bytes: default_max_bytes(),
            max_age_secs: default_max_age_secs(),
            retention: default_retention(),
            compress: default_true(),
            buffered: default_true(),
        },
    ]
}

fn default_console_level() -> Level {
    Level::Info
}

fn default_file_level() -> Level {
    Level::Trace
}

fn default_archive_level() -> Level {
    Level::Warn
}

fn default_file_destination() -> String {
    log_transport::DEFAULT_FILE_TEMPLATE.to_string()
}

fn default_archive_destination() -> String {
    "{category}/archive/{category}.log".to_string()
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_age_secs() -> Option<u64> {
    Some(24 * 60 * 60)
}

fn default_retention() -> usize {
    5
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// If the file does not exist a default configuration is returned and a
/// warning is emitted.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "configuration file not found; using defaults"
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    serde_yml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load(Path::new("/does/not/exist/catlog.yaml")).unwrap();
        assert_eq!(config.schema_file, PathBuf::from("schema.yaml"));
        assert_eq!(config.transport.flush_interval(), Duration::from_millis(100));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.transport.targets.len(), 3);
        assert_eq!(config.transport.targets[2].min_level(), Level::Warn);
    }

    #[test]
    fn parses_explicit_targets() {
        let yaml = r#"
schema_file: /etc/catlog/schema.yaml
logging:
  level: debug
transport:
  log_root: /var/log/catlog
  flush_interval_ms: 250
  targets:
    - kind: console
      min_level: warn
      colorize: false
    - kind: file
    - kind: rotatingCompressed
      destination: "{category}/{level}.log"
      max_bytes: 1024
      max_age_secs: null
      retention: 2
      buffered: false
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.transport.log_root, PathBuf::from("/var/log/catlog"));
        assert_eq!(config.transport.flush_interval_ms, 250);
        assert_eq!(
            config.transport.targets,
            vec![
                TargetConfig::Console {
                    min_level: Level::Warn,
                    colorize: false,
                },
                TargetConfig::File {
                    min_level: Level::Trace,
                    destination: "{category}/{level}/{level}-{date}.log".to_string(),
                },
                TargetConfig::RotatingCompressed {
                    min_level: Level::Warn,
                    destination: "{category}/{level}.log".to_string(),
                    max_bytes: 1024,
                    max_age_secs: None,
                    retention: 2,
                    compress: true,
                    buffered: false,
                },
            ]
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"transport:\n  targets:\n    - kind: carrier_pigeon\n")
            .unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(
            err.to_string().contains("failed to parse config file"),
            "unexpected error: {err}"
        );
    }
}
