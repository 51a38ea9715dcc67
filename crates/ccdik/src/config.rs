//! Solver configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_tolerance() -> f32 {
    0.001
}
const fn default_max_iterations() -> u32 {
    50
}

// ---------------------------------------------------------------------------
// CcdConfig
// ---------------------------------------------------------------------------

/// Configuration for the CCD solver and the orchestrator around it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CcdConfig {
    /// Effector-to-target distance at which solving stops, in the chain's
    /// length units (default: 0.001).
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,

    /// Maximum number of root-ward sweeps per solve (default: 50).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Write solved orientations back to the robot description.
    #[serde(default)]
    pub update_source: bool,
}

impl Default for CcdConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            max_iterations: default_max_iterations(),
            update_source: false,
        }
    }
}

impl CcdConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        Ok(())
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let cfg = CcdConfig::default();
        assert!(cfg.validate().is_ok());
        assert!((cfg.tolerance - 0.001).abs() < f32::EPSILON);
        assert_eq!(cfg.max_iterations, 50);
        assert!(!cfg.update_source);
    }

    #[test]
    fn rejects_non_positive_tolerance() {
        for tolerance in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let cfg = CcdConfig {
                tolerance,
                ..CcdConfig::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidTolerance(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_iterations() {
        let cfg = CcdConfig {
            max_iterations: 0,
            ..CcdConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroIterations)));
    }

    #[test]
    fn toml_deserialization() {
        let cfg: CcdConfig = toml::from_str(
            r"
            tolerance = 0.05
            max_iterations = 10
            update_source = true
        ",
        )
        .unwrap();
        assert!((cfg.tolerance - 0.05).abs() < f32::EPSILON);
        assert_eq!(cfg.max_iterations, 10);
        assert!(cfg.update_source);
    }

    #[test]
    fn toml_defaults() {
        let cfg: CcdConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, CcdConfig::default());
    }

    #[test]
    fn from_file() {
        let dir = std::env::temp_dir().join("ccdik_test_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ccd.toml");
        std::fs::write(&path, "tolerance = 0.01\nmax_iterations = 20\n").unwrap();

        let cfg = CcdConfig::from_file(&path).unwrap();
        assert!((cfg.tolerance - 0.01).abs() < f32::EPSILON);
        assert_eq!(cfg.max_iterations, 20);

        // Cleanup
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_invalid() {
        let dir = std::env::temp_dir().join("ccdik_test_config_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ccd.toml");
        std::fs::write(&path, "max_iterations = 0\n").unwrap();

        assert!(CcdConfig::from_file(&path).is_err());

        // Cleanup
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_dir(&dir);
    }

    #[test]
    fn from_file_missing() {
        let result = CcdConfig::from_file("/nonexistent/ccdik/config.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
