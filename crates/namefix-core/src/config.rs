//! Configuration module for namefix.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::status::{TransitionMode, TransitionTable};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for namefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

/// Execution settings for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// How many times an item is attempted before it is marked failed.
    pub max_attempts: u32,
    /// Seconds a single attempt may take before it counts as failed.
    pub attempt_timeout_secs: u64,
    /// Maximum number of items executed concurrently within one wave.
    pub max_concurrent: usize,
    /// Status transition rules: `permissive` or `strict`.
    pub transitions: TransitionMode,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/namefix/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("namefix")
            .join("config.yaml")
    }
}

impl OrchestratorConfig {
    /// Per-attempt timeout as a [`Duration`].
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Transition table selected by `transitions`.
    pub fn transition_table(&self) -> TransitionTable {
        TransitionTable::for_mode(self.transitions)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_secs: 30,
            max_concurrent: 4,
            transitions: TransitionMode::Permissive,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"orchestrator.max_attempts"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- orchestrator ---
        if self.orchestrator.max_attempts == 0 {
            errors.push(ValidationError {
                field: "orchestrator.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.orchestrator.attempt_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "orchestrator.attempt_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.orchestrator.max_concurrent == 0 || self.orchestrator.max_concurrent > 64 {
            errors.push(ValidationError {
                field: "orchestrator.max_concurrent".into(),
                message: "must be in range 1..=64".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use namefix_core::config::ConfigBuilder;
/// use namefix_core::domain::TransitionMode;
///
/// let config = ConfigBuilder::new()
///     .max_attempts(5)
///     .transitions(TransitionMode::Strict)
///     .logging_level("debug")
///     .build();
///
/// assert_eq!(config.orchestrator.max_attempts, 5);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- orchestrator ---

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.orchestrator.max_attempts = n;
        self
    }

    pub fn attempt_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.orchestrator.attempt_timeout_secs = seconds;
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.config.orchestrator.max_concurrent = n;
        self
    }

    pub fn transitions(mut self, mode: TransitionMode) -> Self {
        self.config.orchestrator.transitions = mode;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::Status;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert_eq!(cfg.orchestrator.max_attempts, 3);
        assert_eq!(cfg.orchestrator.attempt_timeout_secs, 30);
        assert_eq!(cfg.orchestrator.max_concurrent, 4);
        assert_eq!(cfg.orchestrator.transitions, TransitionMode::Permissive);
        assert_eq!(cfg.logging.level, "info");
        assert!(!cfg.logging.json);
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
orchestrator:
  max_attempts: 5
  attempt_timeout_secs: 10
  max_concurrent: 2
  transitions: strict
logging:
  level: debug
  json: true
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.orchestrator.max_attempts, 5);
        assert_eq!(cfg.orchestrator.attempt_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.orchestrator.max_concurrent, 2);
        assert_eq!(cfg.orchestrator.transitions, TransitionMode::Strict);
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn load_partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"orchestrator:\n  max_attempts: 1\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.orchestrator.max_attempts, 1);
        assert_eq!(cfg.orchestrator.max_concurrent, 4);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg.orchestrator.max_attempts, 3);
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn load_rejects_unknown_transition_mode() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"orchestrator:\n  transitions: lenient\n").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_attempts() {
        let mut cfg = Config::default();
        cfg.orchestrator.max_attempts = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "orchestrator.max_attempts"));
    }

    #[test]
    fn validate_catches_zero_timeout() {
        let mut cfg = Config::default();
        cfg.orchestrator.attempt_timeout_secs = 0;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "orchestrator.attempt_timeout_secs"));
    }

    #[test]
    fn validate_catches_concurrency_out_of_range() {
        for n in [0, 65] {
            let mut cfg = Config::default();
            cfg.orchestrator.max_concurrent = n;
            let errors = cfg.validate();
            assert!(errors.iter().any(|e| e.field == "orchestrator.max_concurrent"));
        }
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".into();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn validate_accepts_all_valid_log_levels() {
        for level in VALID_LOG_LEVELS {
            let mut cfg = Config::default();
            cfg.logging.level = level.to_string();
            assert!(cfg.validate().is_empty(), "level {level} rejected");
        }
    }

    // -- Builder --

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .max_attempts(7)
            .attempt_timeout_secs(2)
            .max_concurrent(1)
            .transitions(TransitionMode::Strict)
            .logging_level("warn")
            .logging_json(true)
            .build();

        assert_eq!(cfg.orchestrator.max_attempts, 7);
        assert_eq!(cfg.orchestrator.attempt_timeout_secs, 2);
        assert_eq!(cfg.orchestrator.max_concurrent, 1);
        assert_eq!(cfg.logging.level, "warn");
        assert!(cfg.logging.json);

        let table = cfg.orchestrator.transition_table();
        assert!(!table.is_allowed(Status::Completed, Status::Pending));
    }

    #[test]
    fn builder_build_validated_fails_for_invalid_config() {
        let result = ConfigBuilder::new().max_attempts(0).build_validated();
        let errors = result.unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "orchestrator.max_attempts");
    }

    #[test]
    fn default_path_ends_with_config_yaml() {
        let p = Config::default_path();
        assert!(p.ends_with("namefix/config.yaml"));
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError {
            field: "orchestrator.max_attempts".into(),
            message: "must be greater than 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "orchestrator.max_attempts: must be greater than 0"
        );
    }
}
