use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_max_iterations() -> u32 {
    20
}
const fn default_tolerance() -> f64 {
    1e-3
}

// ---------------------------------------------------------------------------
// AlgorithmConfig
// ---------------------------------------------------------------------------

/// Per-solver algorithm settings. Read-only during a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmConfig {
    /// Number of forward sweeps performed per solve (default: 20).
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Distance below which an effector counts as having reached its
    /// target (default: 1e-3). Compared squared.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Stop iterating once every effector is within `tolerance`.
    ///
    /// Off by default: a solve then always performs exactly
    /// `max_iterations` sweeps.
    #[serde(default)]
    pub stop_on_convergence: bool,

    /// Request constraint handling. Accepted for forward compatibility;
    /// no constraint layer exists yet, so this has no effect.
    #[serde(default)]
    pub constraints: bool,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            stop_on_convergence: false,
            constraints: false,
        }
    }
}

impl AlgorithmConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }

    /// Squared tolerance, as used by the convergence check.
    pub fn tolerance_squared(&self) -> f64 {
        self.tolerance * self.tolerance
    }

    /// Parse and validate a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = AlgorithmConfig::default();
        assert_eq!(cfg.max_iterations, 20);
        assert!((cfg.tolerance - 1e-3).abs() < f64::EPSILON);
        assert!(!cfg.stop_on_convergence);
        assert!(!cfg.constraints);
    }

    #[test]
    fn validate_ok() {
        assert!(AlgorithmConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_zero_tolerance_ok() {
        let cfg = AlgorithmConfig {
            tolerance: 0.0,
            ..AlgorithmConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_negative_tolerance() {
        let cfg = AlgorithmConfig {
            tolerance: -0.5,
            ..AlgorithmConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTolerance(_)));
    }

    #[test]
    fn validate_nan_tolerance() {
        let cfg = AlgorithmConfig {
            tolerance: f64::NAN,
            ..AlgorithmConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tolerance_squared() {
        let cfg = AlgorithmConfig {
            tolerance: 0.5,
            ..AlgorithmConfig::default()
        };
        assert!((cfg.tolerance_squared() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_iterations_allowed() {
        let cfg = AlgorithmConfig::from_toml_str("max_iterations = 0").unwrap();
        assert_eq!(cfg.max_iterations, 0);
    }

    // ---- TOML ----

    #[test]
    fn toml_deserialization() {
        let toml_str = r"
            max_iterations = 50
            tolerance = 0.01
            stop_on_convergence = true
            constraints = true
        ";
        let cfg = AlgorithmConfig::from_toml_str(toml_str).unwrap();
        assert_eq!(cfg.max_iterations, 50);
        assert!((cfg.tolerance - 0.01).abs() < f64::EPSILON);
        assert!(cfg.stop_on_convergence);
        assert!(cfg.constraints);
    }

    #[test]
    fn toml_defaults() {
        let cfg = AlgorithmConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AlgorithmConfig::default());
    }

    #[test]
    fn toml_rejects_invalid_tolerance() {
        let err = AlgorithmConfig::from_toml_str("tolerance = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTolerance(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = AlgorithmConfig {
            max_iterations: 7,
            tolerance: 0.25,
            stop_on_convergence: true,
            constraints: false,
        };
        let s = toml::to_string(&cfg).unwrap();
        let back = AlgorithmConfig::from_toml_str(&s).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn from_file() {
        let dir = std::env::temp_dir().join("arbor_test_algorithm_config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("solver.toml");
        std::fs::write(&path, "max_iterations = 12\ntolerance = 0.002\n").unwrap();

        let cfg = AlgorithmConfig::from_file(&path).unwrap();
        assert_eq!(cfg.max_iterations, 12);
        assert!((cfg.tolerance - 0.002).abs() < f64::EPSILON);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn from_missing_file() {
        let err = AlgorithmConfig::from_file("/nonexistent/arbor/solver.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
