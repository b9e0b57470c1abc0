//! Simulator configuration
//!
//! Layered as: built-in defaults → optional TOML file → `SLABSIM_*` environment.

use crate::error::{Error, Result};
use crate::slab::SizeClass;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix (`SLABSIM_OBJECT_SIZE`, `SLABSIM_LOG_DIR`, ...)
pub const ENV_PREFIX: &str = "SLABSIM";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Object size used when none is given on the command line
    pub object_size: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory for rolling log files
    pub log_dir: PathBuf,
    /// Disable colored console output
    pub no_color: bool,
    /// Print Prometheus metrics after a simulation run
    pub metrics: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            object_size: 16,
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
            no_color: false,
            metrics: false,
        }
    }
}

impl SimulatorConfig {
    /// Load configuration, reading `path` if given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!(path = ?path, "Loading configuration file");
            builder = builder.add_source(
                config::File::new(&path.to_string_lossy(), config::FileFormat::Toml).required(true),
            );
        }

        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize::<Self>())
            .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize configuration: {}", e)))
    }

    /// Validated default size class
    pub fn size_class(&self) -> Result<SizeClass> {
        SizeClass::new(self.object_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = SimulatorConfig::default();
        assert_eq!(cfg.object_size, 16);
        assert_eq!(cfg.log_level, "info");
        assert!(!cfg.metrics);
        assert_eq!(cfg.size_class().unwrap().bytes(), 16);
    }

    #[test]
    fn test_toml_round_trip() -> Result<()> {
        let cfg = SimulatorConfig {
            object_size: 128,
            metrics: true,
            ..Default::default()
        };
        let text = cfg.to_toml()?;
        assert!(text.contains("object_size = 128"));
        assert_eq!(SimulatorConfig::from_toml(&text)?, cfg);
        Ok(())
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> Result<()> {
        let cfg = SimulatorConfig::from_toml("object_size = 48\n")?;
        assert_eq!(cfg.object_size, 48);
        assert_eq!(cfg.log_dir, PathBuf::from("logs"));
        Ok(())
    }

    #[test]
    fn test_zero_object_size_rejected() -> Result<()> {
        let cfg = SimulatorConfig::from_toml("object_size = 0\n")?;
        assert_eq!(cfg.size_class(), Err(Error::InvalidSizeClass(0)));
        Ok(())
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let temp_dir = std::env::temp_dir().join(format!("slabsim_cfg_{}", std::process::id()));
        std::fs::create_dir_all(&temp_dir).unwrap();
        let path = temp_dir.join("slabsim.toml");
        std::fs::write(&path, "object_size = 256\nno_color = true\n").unwrap();

        let cfg = SimulatorConfig::load(Some(&path))?;
        assert_eq!(cfg.object_size, 256);
        assert!(cfg.no_color);

        // Cleanup
        std::fs::remove_dir_all(temp_dir).ok();
        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = std::env::temp_dir().join("slabsim_does_not_exist.toml");
        let err = SimulatorConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
