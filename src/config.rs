//! Configuration for userdb.
//!
//! Loaded with figment, in order of precedence (highest last):
//! 1. Default values
//! 2. TOML config file (`userdb.toml` unless another path is given)
//! 3. Environment variables prefixed with `USERDB_`, `__` between sections
//! 4. The plain `PORT` environment variable

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::log::LogSink;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "userdb.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "USERDB_";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub request_log: RequestLogConfig,
    pub docs: DocsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// The JSON document holding the whole collection.
    pub data_path: PathBuf,
    /// Write `[]` to `data_path` at startup when it does not exist.
    pub create_if_missing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    File,
    Console,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLogConfig {
    pub sink: SinkKind,
    /// Only used by the `file` sink.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub enabled: bool,
    pub title: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.json"),
            create_if_missing: true,
        }
    }
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::File,
            path: PathBuf::from("log.txt"),
        }
    }
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "userdb".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources, using `userdb.toml` if present.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config file path.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config: Config = Self::figment(config_path).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// The provider stack, exposed so binaries can layer CLI flags on top.
    pub fn figment(config_path: Option<PathBuf>) -> Figment {
        let config_file = config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Env::raw().only(&["port"]).map(|_| "server.port".into()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::ConfigValidation {
                message: "server.port must be greater than 0".to_string(),
            });
        }
        if self.storage.data_path.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "storage.data_path must not be empty".to_string(),
            });
        }
        if self.request_log.sink == SinkKind::File && self.request_log.path.as_os_str().is_empty() {
            return Err(Error::ConfigValidation {
                message: "request_log.path must not be empty with the file sink".to_string(),
            });
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    pub fn log_sink(&self) -> LogSink {
        match self.request_log.sink {
            SinkKind::File => LogSink::File(self.request_log.path.clone()),
            SinkKind::Console => LogSink::Console,
            SinkKind::Disabled => LogSink::Disabled,
        }
    }
}
