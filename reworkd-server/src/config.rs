//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via REWORKD_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network configuration.
    pub network: NetworkConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Notification configuration.
    pub notify: NotifyConfig,
    /// Station configuration.
    pub station: StationConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("REWORKD_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.storage.apply_env_overrides();
        self.notify.apply_env_overrides();
        self.station.apply_env_overrides();
    }
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the API server to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7420".parse().unwrap(),
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("REWORKD_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("REWORKD_DATA") {
            self.data_dir = PathBuf::from(dir);
        }
    }

    /// Returns the station records directory path.
    pub fn stations_dir(&self) -> PathBuf {
        self.data_dir.join("stations")
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Topic namespace for state notifications.
    pub namespace: String,
    /// Broadcast channel capacity per topic.
    pub channel_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            namespace: "dcr".to_string(),
            channel_capacity: 1024,
        }
    }
}

impl NotifyConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(namespace) = std::env::var("REWORKD_NAMESPACE") {
            if !namespace.is_empty() {
                self.namespace = namespace;
            }
        }

        if let Ok(capacity) = std::env::var("REWORKD_BUS_CAPACITY") {
            if let Ok(n) = capacity.parse() {
                self.channel_capacity = n;
            }
        }
    }
}

/// Station configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StationConfig {
    /// Type label stamped on newly created station records.
    pub kind: String,
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            kind: "choco_rework".to_string(),
        }
    }
}

impl StationConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(kind) = std::env::var("REWORKD_STATION_KIND") {
            if !kind.is_empty() {
                self.kind = kind;
            }
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.network.bind_addr.port(), 7420);
        assert_eq!(config.notify.namespace, "dcr");
        assert_eq!(config.station.kind, "choco_rework");
        assert_eq!(config.storage.stations_dir(), PathBuf::from("./data/stations"));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.network.bind_addr, config.network.bind_addr);
        assert_eq!(parsed.notify.namespace, config.notify.namespace);
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reworkd.yaml");
        std::fs::write(&path, "notify:\n  namespace: plant2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.notify.namespace, "plant2");
        // Unspecified sections keep their defaults.
        assert_eq!(config.network.bind_addr.port(), 7420);
    }

    #[test]
    fn test_bad_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("reworkd.yaml");
        std::fs::write(&path, "network: [not, a, map]").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::ParseError(_, _))
        ));
    }
}
