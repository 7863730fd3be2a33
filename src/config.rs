//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

/// Development default values - NEVER use in production.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const DEV_UPLOAD_DIR: &str = "/tmp/apkscan_uploads";
    pub const DEV_OUTPUT_DIR: &str = "/tmp/apkscan_output";
    pub const DEV_MAX_UPLOAD_SIZE: usize = 104_857_600; // 100MB per artifact
    pub const DEV_MAX_CONCURRENT_SCANS: usize = 4; // Scan pipeline worker pool size
    pub const DEV_DECOMPILER_CMD: &str = "jadx";
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root directory for persisted uploads (one subdirectory per scan)
    pub upload_dir: PathBuf,
    /// Root directory for scan output: build trees and generated reports
    pub output_dir: PathBuf,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
    /// Maximum concurrently executing scan pipelines (default: 4)
    pub max_concurrent_scans: usize,
    /// External decompiler command invoked for APK/JAR inputs
    pub decompiler_cmd: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In development mode (RUST_ENV=development) all variables have sensible
    /// defaults; only RUST_ENV is required. In production mode the upload and
    /// output directories must be moved off the /tmp defaults.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `SCAN_HOST`: Server host (default: 127.0.0.1)
    /// - `SCAN_PORT`: Server port (default: 8080)
    /// - `SCAN_UPLOAD_DIR`: Upload root directory
    /// - `SCAN_OUTPUT_DIR`: Output root directory
    /// - `SCAN_MAX_UPLOAD_SIZE`: Max upload size in bytes (default: 100MB)
    /// - `SCAN_MAX_CONCURRENT_SCANS`: Scan worker pool size (default: 4)
    /// - `SCAN_DECOMPILER_CMD`: Decompiler executable (default: jadx)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Parse environment - required
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("SCAN_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("SCAN_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("SCAN_PORT must be a valid port number"))?;

        let upload_dir = env::var("SCAN_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DEV_UPLOAD_DIR));

        let output_dir = env::var("SCAN_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(defaults::DEV_OUTPUT_DIR));

        let max_upload_size = env::var("SCAN_MAX_UPLOAD_SIZE")
            .unwrap_or_else(|_| defaults::DEV_MAX_UPLOAD_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue("SCAN_MAX_UPLOAD_SIZE must be a valid number")
            })?;

        let max_concurrent_scans = env::var("SCAN_MAX_CONCURRENT_SCANS")
            .unwrap_or_else(|_| defaults::DEV_MAX_CONCURRENT_SCANS.to_string())
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue("SCAN_MAX_CONCURRENT_SCANS must be a valid number")
            })?;

        if max_concurrent_scans == 0 {
            return Err(ConfigError::InvalidValue(
                "SCAN_MAX_CONCURRENT_SCANS must be at least 1",
            ));
        }

        let decompiler_cmd = env::var("SCAN_DECOMPILER_CMD")
            .unwrap_or_else(|_| defaults::DEV_DECOMPILER_CMD.to_string());

        let config = Config {
            environment,
            host,
            port,
            upload_dir,
            output_dir,
            max_upload_size,
            max_concurrent_scans,
            decompiler_cmd,
        };

        // Validate production configuration
        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Validate that production configuration does not use development defaults.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.upload_dir == PathBuf::from(defaults::DEV_UPLOAD_DIR) {
            errors.push(format!(
                "SCAN_UPLOAD_DIR is using development default '{}'. Set a durable upload directory.",
                defaults::DEV_UPLOAD_DIR
            ));
        }

        if self.output_dir == PathBuf::from(defaults::DEV_OUTPUT_DIR) {
            errors.push(format!(
                "SCAN_OUTPUT_DIR is using development default '{}'. Set a durable output directory.",
                defaults::DEV_OUTPUT_DIR
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
