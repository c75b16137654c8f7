//! Server configuration, read from environment variables.
//!
//! - `LINKS_SECRET_KEY`: token signing secret (required, non-empty)
//! - `LINKS_DATABASE_PATH`: SQLite file (default: `links.sqlite3`)
//! - `LINKS_LISTEN_ADDR`: socket address to bind (default: `127.0.0.1:5000`)
//! - `LINKS_SERVER_NAME`: token issuer and audience (default: `link-bookmarks`)
//! - `LINKS_TOKEN_TTL_SECS`: token lifetime in seconds (default: `900`)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::crypto::TokenIssuer;

#[derive(Clone)]
pub struct ServerConfig {
    pub secret_key :    String,
    pub database_path : PathBuf,
    pub listen_addr :   SocketAddr,
    pub server_name :   String,
    pub token_ttl :     Duration,
}

// The secret stays out of logs.
impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f : &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("database_path", &self.database_path)
            .field("listen_addr", &self.listen_addr)
            .field("server_name", &self.server_name)
            .field("token_ttl", &self.token_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingEnvVar(String),
    InvalidValue { name : String, message : String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f : &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {}", name)
            },
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {}: {}", name, message)
            },
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    pub const DEFAULT_DATABASE_PATH : &'static str = "links.sqlite3";
    pub const DEFAULT_LISTEN_ADDR : &'static str = "127.0.0.1:5000";
    pub const DEFAULT_SERVER_NAME : &'static str = "link-bookmarks";
    pub const DEFAULT_TOKEN_TTL_SECS : u64 = 15 * 60;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup : F) -> Result<Self, ConfigError>
    where
        F : Fn(&str) -> Option<String>,
    {
        let secret_key = lookup("LINKS_SECRET_KEY")
            .ok_or_else(|| {
                ConfigError::MissingEnvVar("LINKS_SECRET_KEY".to_string())
            })?;

        if secret_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                name :    "LINKS_SECRET_KEY".to_string(),
                message : "must not be empty".to_string(),
            });
        }

        let database_path = lookup("LINKS_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(Self::DEFAULT_DATABASE_PATH));

        let listen_addr = lookup("LINKS_LISTEN_ADDR")
            .unwrap_or_else(|| Self::DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|_| {
            ConfigError::InvalidValue {
                name :    "LINKS_LISTEN_ADDR".to_string(),
                message : format!("'{}' is not a socket address", listen_addr),
            }
        })?;

        let server_name = lookup("LINKS_SERVER_NAME")
            .unwrap_or_else(|| Self::DEFAULT_SERVER_NAME.to_string());

        let token_ttl = match lookup("LINKS_TOKEN_TTL_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name :    "LINKS_TOKEN_TTL_SECS".to_string(),
                        message : format!(
                            "'{}' is not a positive number of seconds",
                            value
                        ),
                    })
                },
            },
            None => Duration::from_secs(Self::DEFAULT_TOKEN_TTL_SECS),
        };

        Ok(Self {
            secret_key,
            database_path,
            listen_addr,
            server_name,
            token_ttl,
        })
    }

    pub fn token_issuer(&self) -> TokenIssuer {
        TokenIssuer::new(
            self.secret_key.as_bytes(),
            self.server_name.as_str(),
            self.token_ttl,
        )
    }
}
