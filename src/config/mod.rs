use std::env;
use std::path::PathBuf;
use anyhow::{Result, Context};
use tracing::{info, warn};

/// Origins allowed when `CORS_ALLOWED_ORIGINS` is not set.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "https://reader-frontend-e3f.pages.dev",
    "http://localhost:5173",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    pub recursive_listing: bool,
    pub max_upload_size_mb: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        let config = Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| {
                info!("SERVER_HOST not set, using default: 0.0.0.0");
                "0.0.0.0".to_string()
            }),
            server_port: Self::parse_env_var("PORT", 5000)
                .context("Failed to parse PORT")?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    info!("UPLOAD_DIR not set, using default: ./uploads");
                    PathBuf::from("./uploads")
                }),
            allowed_origins: Self::parse_origins(env::var("CORS_ALLOWED_ORIGINS").ok()),
            recursive_listing: Self::parse_env_var("RECURSIVE_LISTING", true)
                .context("Failed to parse RECURSIVE_LISTING")?,
            max_upload_size_mb: Self::parse_env_var("MAX_UPLOAD_SIZE_MB", 100)
                .context("Failed to parse MAX_UPLOAD_SIZE_MB")?,
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
        Self::parse_value(var_name, env::var(var_name).ok(), default)
    }

    /// An unset variable takes the default; a set but malformed one is an error.
    fn parse_value<T>(var_name: &str, raw: Option<String>, default: T) -> Result<T>
    where
        T: std::str::FromStr + Copy + std::fmt::Debug,
        T::Err: std::fmt::Display,
    {
        match raw {
            Some(val) => val
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid value {:?} for {}: {}", val, var_name, e)),
            None => {
                info!("{} not set, using default: {:?}", var_name, default);
                Ok(default)
            }
        }
    }

    fn parse_origins(raw: Option<String>) -> Vec<String> {
        match raw {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => {
                info!("CORS_ALLOWED_ORIGINS not set, using defaults: {:?}", DEFAULT_ALLOWED_ORIGINS);
                DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server_port == 0 {
            return Err(anyhow::anyhow!("PORT must be greater than 0"));
        }
        if self.max_upload_size_mb == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }
        if self.upload_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_DIR must not be empty"));
        }
        for origin in &self.allowed_origins {
            if origin.parse::<axum::http::HeaderValue>().is_err() {
                return Err(anyhow::anyhow!("Invalid origin in CORS_ALLOWED_ORIGINS: {}", origin));
            }
        }
        if self.allowed_origins.is_empty() {
            warn!("No CORS origins allowed; browser clients will be rejected");
        }
        Ok(())
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.max_upload_size_mb * 1024 * 1024
    }
}
