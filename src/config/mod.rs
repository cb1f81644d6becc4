use std::env;
use std::time::Duration;
use anyhow::{Result, Context};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub max_file_size_mb: usize,
    pub max_request_size_mb: usize,
    pub max_concurrent_requests: usize,
    pub ghostscript_path: String,
    pub compression_timeout_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            max_file_size_mb: 50,
            max_request_size_mb: 200,
            max_concurrent_requests: 8,
            ghostscript_path: "gs".to_string(),
            compression_timeout_seconds: 180,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let defaults = Config::default();

        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                info!("SERVER_HOST not set, using default: {}", defaults.server_host);
                defaults.server_host.clone()
            }),
            server_port: Self::parse_env_var("SERVER_PORT", defaults.server_port)
                .context("Failed to parse SERVER_PORT")?,
            max_file_size_mb: Self::parse_env_var("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)
                .context("Failed to parse MAX_FILE_SIZE_MB")?,
            max_request_size_mb: Self::parse_env_var(
                "MAX_REQUEST_SIZE_MB",
                defaults.max_request_size_mb,
            )
            .context("Failed to parse MAX_REQUEST_SIZE_MB")?,
            max_concurrent_requests: Self::parse_env_var(
                "MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            )
            .context("Failed to parse MAX_CONCURRENT_REQUESTS")?,
            ghostscript_path: env::var("GHOSTSCRIPT_PATH").unwrap_or_else(|_| {
                info!("GHOSTSCRIPT_PATH not set, using default: {}", defaults.ghostscript_path);
                defaults.ghostscript_path.clone()
            }),
            compression_timeout_seconds: Self::parse_env_var(
                "COMPRESSION_TIMEOUT_SECONDS",
                defaults.compression_timeout_seconds,
            )
            .context("Failed to parse COMPRESSION_TIMEOUT_SECONDS")?,
        };

        config.validate()?;

        info!("Configuration loaded successfully: {:?}", config);
        Ok(config)
    }

    fn parse_env_var<T>(var_name: &str, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(val) => match val.trim().parse() {
                Ok(parsed) => Ok(parsed),
                Err(e) => {
                    warn!("Failed to parse {}: {} (using default: {:?})", var_name, e, default);
                    Ok(default)
                }
            },
            Err(_) => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("SERVER_PORT must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.max_request_size_mb < self.max_file_size_mb {
            return Err(anyhow::anyhow!(
                "MAX_REQUEST_SIZE_MB ({}) must be at least MAX_FILE_SIZE_MB ({})",
                self.max_request_size_mb,
                self.max_file_size_mb
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_REQUESTS must be greater than 0"));
        }
        if self.ghostscript_path.trim().is_empty() {
            return Err(anyhow::anyhow!("GHOSTSCRIPT_PATH must not be empty"));
        }
        if self.compression_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("COMPRESSION_TIMEOUT_SECONDS must be greater than 0"));
        }
        Ok(())
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn max_request_size_bytes(&self) -> usize {
        self.max_request_size_mb * 1024 * 1024
    }

    pub fn compression_timeout(&self) -> Duration {
        Duration::from_secs(self.compression_timeout_seconds)
    }
}
