//! Protocol limits with layered loading.

use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::{Error as FigmentError, Figment};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading protocol configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error from the Figment configuration library.
    #[error("Configuration error: {0}")]
    Figment(Box<FigmentError>),

    /// The specified configuration file was not found.
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<FigmentError> for ConfigError {
    fn from(err: FigmentError) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Decoder limits.
///
/// Defaults impose no size limits and cap nesting at
/// [`DEFAULT_MAX_DEPTH`] contexts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum decoded length of a string or binary payload, in bytes.
    #[serde(default)]
    pub string_limit: Option<usize>,

    /// Maximum declared element count of a map, list or set.
    #[serde(default)]
    pub container_limit: Option<usize>,

    /// Maximum number of nested contexts.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// Default nesting cap. A struct field holds two contexts while reading.
pub const DEFAULT_MAX_DEPTH: usize = 256;

const fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            string_limit: None,
            container_limit: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ProtocolConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Environment variables prefixed with `THRIFT_XML_` override file
    /// settings.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("THRIFT_XML_"))
            .extract::<Self>()
            .map_err(ConfigError::from)
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Figment::new()
            .merge(Toml::string(content))
            .extract::<Self>()
            .map_err(ConfigError::from)
    }

    /// Sets the string length limit.
    #[must_use]
    pub const fn with_string_limit(mut self, limit: usize) -> Self {
        self.string_limit = Some(limit);
        self
    }

    /// Sets the container size limit.
    #[must_use]
    pub const fn with_container_limit(mut self, limit: usize) -> Self {
        self.container_limit = Some(limit);
        self
    }

    /// Sets the nesting cap.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_empty_uses_defaults() {
        let config = ProtocolConfig::parse("").unwrap();
        assert_eq!(config, ProtocolConfig::default());
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn parse_limits() {
        let config = ProtocolConfig::parse(
            r#"
            string_limit = 1024
            container_limit = 16
            max_depth = 32
            "#,
        )
        .unwrap();

        assert_eq!(config.string_limit, Some(1024));
        assert_eq!(config.container_limit, Some(16));
        assert_eq!(config.max_depth, 32);
    }

    #[test]
    fn parse_rejects_wrong_types() {
        let result = ProtocolConfig::parse(r#"string_limit = "lots""#);
        assert!(matches!(result, Err(ConfigError::Figment(_))));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "container_limit = 8").unwrap();

        let config = ProtocolConfig::load_from(file.path()).unwrap();
        assert_eq!(config.container_limit, Some(8));
        assert_eq!(config.string_limit, None);
    }

    #[test]
    fn load_missing_file() {
        let result = ProtocolConfig::load_from("/nonexistent/thrift-xml.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn builder_methods() {
        let config = ProtocolConfig::default()
            .with_string_limit(10)
            .with_container_limit(2)
            .with_max_depth(4);
        assert_eq!(config.string_limit, Some(10));
        assert_eq!(config.container_limit, Some(2));
        assert_eq!(config.max_depth, 4);
    }
}
