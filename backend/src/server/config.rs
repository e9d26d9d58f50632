use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("Invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Deployment environment, read from `NODE_ENV`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    /// Internal error messages are only sent to clients outside production.
    pub fn exposes_error_detail(self) -> bool {
        !self.is_production()
    }

    pub fn default_log_filter(self) -> &'static str {
        match self {
            Environment::Production => "info,sqlx=warn,tower_http=info",
            Environment::Development | Environment::Test => "debug,sqlx=warn,tower_http=debug",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub environment: Environment,
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub cors_origin: String,
    pub log_dir: Option<PathBuf>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
pub struct PartialServerConfig {
    node_env: Option<Environment>,
    host: Option<IpAddr>,
    port: Option<u16>,
    database_url: Option<String>,
    database_max_connections: Option<u32>,
    cors_origin: Option<String>,
    log_dir: Option<PathBuf>,
}

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl ServerConfig {
    /// Loads `.env`, then the optional TOML file, then the process environment.
    /// Environment variables override the file.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) if Path::new(path_str).exists() => Self::read_file(Path::new(path_str))?,
            _ => PartialServerConfig::default(),
        };
        let env_config: PartialServerConfig = envy::from_env()?;

        Self::merge(env_config, file_config)
    }

    fn read_file(path: &Path) -> Result<PartialServerConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Combines two layers; `primary` wins over `fallback`.
    pub fn merge(primary: PartialServerConfig, fallback: PartialServerConfig) -> Result<Self, ConfigError> {
        let port = primary.port.or(fallback.port).unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(ConfigError::Invalid {
                key: "PORT",
                reason: "must be a positive integer".to_string(),
            });
        }

        let database_url = primary
            .database_url
            .or(fallback.database_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        if !(database_url.starts_with("postgres://") || database_url.starts_with("postgresql://")) {
            return Err(ConfigError::Invalid {
                key: "DATABASE_URL",
                reason: "must be a postgres:// or postgresql:// connection string".to_string(),
            });
        }

        let database_max_connections = primary
            .database_max_connections
            .or(fallback.database_max_connections)
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: "must be at least 1".to_string(),
            });
        }

        let cors_origin = primary
            .cors_origin
            .or(fallback.cors_origin)
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .unwrap_or_else(default_cors_origin);
        validate_cors_origin(&cors_origin)?;

        Ok(ServerConfig {
            environment: primary.node_env.or(fallback.node_env).unwrap_or_default(),
            host: primary.host.or(fallback.host).unwrap_or_else(default_host),
            port,
            database_url,
            database_max_connections,
            cors_origin,
            log_dir: primary.log_dir.or(fallback.log_dir),
        })
    }

    /// Explicit origins from `CORS_ORIGIN`; empty when any origin is allowed.
    pub fn cors_origins(&self) -> Vec<&str> {
        if self.cors_origin == "*" {
            return Vec::new();
        }
        self.cors_origin
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}

fn validate_cors_origin(value: &str) -> Result<(), ConfigError> {
    if value == "*" {
        return Ok(());
    }
    for origin in value.split(',').map(str::trim).filter(|o| !o.is_empty()) {
        let valid = (origin.starts_with("http://") || origin.starts_with("https://"))
            && origin.chars().all(|c| c.is_ascii_graphic());
        if !valid {
            return Err(ConfigError::Invalid {
                key: "CORS_ORIGIN",
                reason: format!("'{origin}' is not an http(s) origin"),
            });
        }
    }
    Ok(())
}
