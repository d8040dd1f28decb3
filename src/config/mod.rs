// Configuration module

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{DEFAULT_ENCODE_QUALITY, DEFAULT_FONT_DIR, DEFAULT_MAX_DIMENSION};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_encode_quality() -> u8 {
    DEFAULT_ENCODE_QUALITY
}

fn default_font_dir() -> PathBuf {
    PathBuf::from(DEFAULT_FONT_DIR)
}

/// Font lookup configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FontConfig {
    /// Directory holding the font files (default: /usr/share/fonts/truetype)
    #[serde(default = "default_font_dir")]
    pub dir: PathBuf,
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            dir: default_font_dir(),
        }
    }
}

/// Engine-wide processing limits and defaults
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Maximum accepted edge length for any image (default: 4096)
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,

    /// Quality passed to lossy encoders, 1..=100 (default: 90)
    #[serde(default = "default_encode_quality")]
    pub encode_quality: u8,

    /// Font lookup configuration
    #[serde(default)]
    pub fonts: FontConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_dimension: default_max_dimension(),
            encode_quality: default_encode_quality(),
            fonts: FontConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::Invalid(
                "max_dimension must be greater than 0".to_string(),
            ));
        }
        if self.encode_quality == 0 || self.encode_quality > 100 {
            return Err(ConfigError::Invalid(format!(
                "encode_quality {} is outside 1..=100",
                self.encode_quality
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_apply_when_fields_omitted() {
        let config = EngineConfig::from_yaml("{}").unwrap();
        assert_eq!(config.max_dimension, 4096);
        assert_eq!(config.encode_quality, 90);
        assert_eq!(config.fonts.dir, PathBuf::from("/usr/share/fonts/truetype"));
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let yaml = r#"
max_dimension: 2048
encode_quality: 75
fonts:
  dir: "/opt/fonts"
"#;
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_dimension, 2048);
        assert_eq!(config.encode_quality, 75);
        assert_eq!(config.fonts.dir, PathBuf::from("/opt/fonts"));
    }

    #[test]
    fn test_config_can_be_loaded_from_file_path() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"max_dimension: 1024\n").unwrap();
        temp_file.flush().unwrap();

        let config = EngineConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.max_dimension, 1024);
        assert_eq!(config.encode_quality, 90);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let err = EngineConfig::from_yaml("max_dimension: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_yaml("encode_quality: 101").unwrap_err();
        assert!(err.to_string().contains("encode_quality"));
    }

    #[test]
    fn test_missing_file_reports_io_error() {
        let err = EngineConfig::from_file("/nonexistent/engine.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
