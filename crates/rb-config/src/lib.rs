//! # rb-config
//!
//! Layered settings for the Rusty-Blog binary.
//! Precedence, lowest first: built-in defaults, `rusty-blog.toml`, an explicit
//! config file, then `RUSTY_BLOG__SECTION__KEY` environment variables.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG_BASENAME: &str = "rusty-blog";
const ENV_PREFIX: &str = "RUSTY_BLOG";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite:rusty_blog.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 20;
const DEFAULT_IDENTITY_HEADER: &str = "x-blog-user";
const DEFAULT_LOGIN_URL: &str = "/auth/login/";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub auth: AuthSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug)]
pub struct DatabaseSettings {
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
}

/// Authentication itself happens upstream; we only learn who the caller is.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Request header carrying the authenticated username
    pub identity_header: String,
    /// Where anonymous writers are sent, with `?next=` appended
    pub login_url: String,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { key, reason: reason.into() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    database: RawDatabaseSettings,
    cache: RawCacheSettings,
    auth: RawAuthSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAuthSettings {
    identity_header: Option<String>,
    login_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    filter: Option<String>,
    json: Option<bool>,
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let port = raw.server.port.unwrap_or(DEFAULT_PORT);
        if port == 0 {
            return Err(LoadError::invalid("server.port", "must be non-zero"));
        }

        let max_connections = raw.database.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(LoadError::invalid("database.max_connections", "must be at least 1"));
        }

        let identity_header = raw
            .auth
            .identity_header
            .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_string())
            .trim()
            .to_ascii_lowercase();
        if identity_header.is_empty() {
            return Err(LoadError::invalid("auth.identity_header", "must not be empty"));
        }

        Ok(Self {
            server: ServerSettings {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            database: DatabaseSettings {
                url: SecretString::from(
                    raw.database.url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                ),
                max_connections,
            },
            cache: CacheSettings {
                enabled: raw.cache.enabled.unwrap_or(true),
                ttl: Duration::from_secs(raw.cache.ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS)),
            },
            auth: AuthSettings {
                identity_header,
                login_url: raw.auth.login_url.unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            },
            logging: LoggingSettings {
                filter: raw.logging.filter.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
                json: raw.logging.json.unwrap_or(false),
            },
        })
    }

    pub fn bind_addr(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings, LoadError> {
    let builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );
    let raw: RawSettings = builder.build()?.try_deserialize()?;
    Settings::from_raw(raw)
}

/// Loads `.env`, then the layered sources.
pub fn load(config_file: Option<&Path>) -> Result<Settings, LoadError> {
    dotenvy::dotenv().ok();

    let mut builder =
        Config::builder().add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false));
    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }
    finish(builder)
}
