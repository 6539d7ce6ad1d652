use std::{env, path::PathBuf};

use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_DATA_PATH: &str = "data/events.json";
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Memory,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host name or IP literal the API listens on; names are resolved at bind
    pub host: String,
    pub port: u16,
    /// JSON file holding the event collection
    pub data_path: PathBuf,
    /// Directory with the browser UI bundle
    pub static_dir: PathBuf,
    pub store: StoreBackend,
}

impl Config {
    /// Load from the process environment, reading `.env` first if present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let invalid = |var: &'static str, value: String| ConfigError::Invalid { var, value };

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| invalid("PORT", raw))?,
            None => DEFAULT_PORT,
        };
        if host.is_empty() || host.chars().any(char::is_whitespace) {
            return Err(invalid("HOST", host));
        }

        let store = match lookup("EVENT_STORE").as_deref() {
            None | Some("file") => StoreBackend::File,
            Some("memory") => StoreBackend::Memory,
            Some(other) => return Err(invalid("EVENT_STORE", other.to_string())),
        };

        Ok(Self {
            host,
            port,
            data_path: lookup("DATA_PATH")
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            static_dir: lookup("STATIC_DIR")
                .unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string())
                .into(),
            store,
        })
    }

    /// Target for `TcpListener::bind`, which resolves host names.
    pub fn listen_target(&self) -> (&str, u16) {
        (&self.host, self.port)
    }
}
