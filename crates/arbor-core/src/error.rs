use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid tolerance: {0} (must be finite and >= 0)")]
    InvalidTolerance(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
        assert!(config_err.to_string().contains("file not found"));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err = toml::from_str::<toml::Table>("max_iterations = ").unwrap_err();
        let config_err: ConfigError = toml_err.into();
        assert!(matches!(config_err, ConfigError::Toml(_)));
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            ConfigError::InvalidTolerance(-1.0).to_string(),
            "Invalid tolerance: -1 (must be finite and >= 0)"
        );
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn error_is_send_sync() {
        assert_send_sync::<ConfigError>();
    }
}
