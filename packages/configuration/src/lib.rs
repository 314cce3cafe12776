//! Configuration model for the swarm tracker.
//!
//! The configuration is loaded from a YAML file, optionally overridden by
//! environment variables prefixed with `SWARM_TRACKER_` (nested keys
//! separated by `__`). All intervals are expressed in seconds.
//!
//! ```yaml
//! log_level: info
//! metrics_addr: "127.0.0.1:6880"
//! storage:
//!   name: memory
//!   config:
//!     shard_count: 1024
//!     garbage_collection_interval: 180
//!     peer_lifetime: 1800
//!     statistics_reporting_interval: 60
//! prehooks: []
//! posthooks:
//!   - name: varinterval
//!     options:
//!       modify_response_probability: 0.2
//!       max_increase_delta: 60
//!       modify_min_interval: true
//! http:
//!   bind_address: "0.0.0.0:6969"
//!   on_reverse_proxy: false
//! udp:
//!   bind_address: "0.0.0.0:6969"
//!   private_key: ""
//!   max_clock_skew: 1
//! response:
//!   default_numwant: 50
//!   max_numwant: 100
//!   announce_interval: 1800
//!   min_announce_interval: 900
//! ```
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix for environment variable overrides.
const ENV_VAR_PREFIX: &str = "SWARM_TRACKER_";

/// The whole tracker configuration.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct Configuration {
    /// Logging level for the process.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Listen address for the metrics exposition endpoint. `None` (or an
    /// empty string in the file) disables metrics.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub metrics_addr: Option<SocketAddr>,

    /// The peer store to use and its settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Hooks executed before the swarm interaction, in order.
    #[serde(default)]
    pub prehooks: Vec<HookConfig>,

    /// Hooks executed after the response assembly, in order.
    #[serde(default)]
    pub posthooks: Vec<HookConfig>,

    /// HTTP frontend. Absent disables it.
    #[serde(default)]
    pub http: Option<HttpTrackerConfig>,

    /// UDP frontend. Absent disables it.
    #[serde(default)]
    pub udp: Option<UdpTrackerConfig>,

    /// Announce response policy.
    #[serde(default)]
    pub response: ResponseConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            metrics_addr: None,
            storage: StorageConfig::default(),
            prehooks: vec![],
            posthooks: vec![],
            http: Some(HttpTrackerConfig::default()),
            udp: Some(UdpTrackerConfig::default()),
            response: ResponseConfig::default(),
        }
    }
}

impl Configuration {
    /// Loads the configuration from a YAML file, with environment overrides.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the file cannot be read or does not match
    /// the configuration model, or if a value fails validation.
    pub fn load_from_file(path: &Path) -> Result<Configuration, Error> {
        let figment = Figment::new()
            .merge(Yaml::file_exact(path))
            .merge(Env::prefixed(ENV_VAR_PREFIX).split("__"));

        let config: Configuration = figment.extract()?;
        config.validate()?;

        Ok(config)
    }

    /// Checks the semantic constraints the type system cannot express.
    ///
    /// # Errors
    ///
    /// Will return an `Error::InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<(), Error> {
        self.storage.validate()?;

        for hook in self.prehooks.iter().chain(self.posthooks.iter()) {
            hook.validate()?;
        }

        if self.response.max_numwant == 0 {
            return Err(Error::InvalidValue {
                key: "response.max_numwant",
                reason: "must be greater than zero".to_owned(),
            });
        }

        Ok(())
    }
}

/// Logging levels accepted by the `log_level` key.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Selects the peer store and carries its settings.
///
/// The in-memory store is the reference implementation; external stores
/// (Redis, SQL, LMDB) plug in through the same storage trait and extend this
/// enum with their own variant and options.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory {
        #[serde(default)]
        config: MemoryStorageConfig,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory {
            config: MemoryStorageConfig::default(),
        }
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<(), Error> {
        match self {
            Self::Memory { config } => config.validate(),
        }
    }
}

/// Settings of the sharded in-memory peer store.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct MemoryStorageConfig {
    /// Number of shards of the swarm map. Must be a power of two.
    pub shard_count: usize,
    /// Seconds between garbage collection sweeps.
    pub garbage_collection_interval: u64,
    /// Seconds after which a peer that has not announced is evicted.
    pub peer_lifetime: u64,
    /// Seconds between walks of the store that refresh the swarm gauges.
    pub statistics_reporting_interval: u64,
}

impl Default for MemoryStorageConfig {
    fn default() -> Self {
        Self {
            shard_count: 1024,
            garbage_collection_interval: 180,
            peer_lifetime: 1800,
            statistics_reporting_interval: 60,
        }
    }
}

impl MemoryStorageConfig {
    #[must_use]
    pub fn garbage_collection_interval(&self) -> Duration {
        Duration::from_secs(self.garbage_collection_interval)
    }

    #[must_use]
    pub fn peer_lifetime(&self) -> Duration {
        Duration::from_secs(self.peer_lifetime)
    }

    #[must_use]
    pub fn statistics_reporting_interval(&self) -> Duration {
        Duration::from_secs(self.statistics_reporting_interval)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.shard_count == 0 || !self.shard_count.is_power_of_two() {
            return Err(Error::InvalidValue {
                key: "storage.config.shard_count",
                reason: format!("{} is not a power of two", self.shard_count),
            });
        }
        Ok(())
    }
}

/// One configured hook of the request pipeline.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum HookConfig {
    ClientApproval {
        options: ClientApprovalOptions,
    },
    TorrentApproval {
        options: TorrentApprovalOptions,
    },
    Varinterval {
        options: VarintervalOptions,
    },
}

impl HookConfig {
    fn validate(&self) -> Result<(), Error> {
        match self {
            Self::ClientApproval { options } => options.validate(),
            Self::TorrentApproval { .. } => Ok(()),
            Self::Varinterval { options } => options.validate(),
        }
    }
}

/// Options of the client-approval pre-hook.
///
/// Client IDs are the 6-character prefixes of the peer ID convention, e.g.
/// `-qB45A` for qBittorrent 4.5.x.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default)]
pub struct ClientApprovalOptions {
    pub allowed_client_ids: Vec<String>,
    pub denied_client_ids: Vec<String>,
}

impl ClientApprovalOptions {
    fn validate(&self) -> Result<(), Error> {
        if !self.allowed_client_ids.is_empty() && !self.denied_client_ids.is_empty() {
            return Err(Error::InvalidValue {
                key: "client_approval.options",
                reason: "allowed and denied client id lists are mutually exclusive".to_owned(),
            });
        }
        for client_id in self.allowed_client_ids.iter().chain(self.denied_client_ids.iter()) {
            if client_id.len() != 6 {
                return Err(Error::InvalidValue {
                    key: "client_approval.options",
                    reason: format!("client id {client_id} is not 6 characters long"),
                });
            }
        }
        Ok(())
    }
}

/// Options of the torrent-approval pre-hook. Hashes are hex infohashes.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
#[serde(default)]
pub struct TorrentApprovalOptions {
    /// The list of infohashes the hook matches against.
    pub hash_list: Vec<String>,
    /// When false the list is a whitelist, when true a blacklist.
    pub invert: bool,
}

/// Options of the varinterval post-hook.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct VarintervalOptions {
    /// Probability that an announce response gets its interval increased.
    pub modify_response_probability: f32,
    /// Largest number of seconds ever added to an interval.
    pub max_increase_delta: u64,
    /// Whether `min interval` is increased by the same delta.
    pub modify_min_interval: bool,
}

impl Default for VarintervalOptions {
    fn default() -> Self {
        Self {
            modify_response_probability: 0.2,
            max_increase_delta: 60,
            modify_min_interval: false,
        }
    }
}

impl VarintervalOptions {
    fn validate(&self) -> Result<(), Error> {
        if self.modify_response_probability <= 0.0 || self.modify_response_probability > 1.0 {
            return Err(Error::InvalidValue {
                key: "varinterval.options.modify_response_probability",
                reason: format!("{} is not in (0, 1]", self.modify_response_probability),
            });
        }
        if self.max_increase_delta == 0 {
            return Err(Error::InvalidValue {
                key: "varinterval.options.max_increase_delta",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }
}

/// HTTP frontend settings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct HttpTrackerConfig {
    /// The address the frontend binds to.
    pub bind_address: SocketAddr,
    /// When true the peer IP is taken from the leftmost `X-Forwarded-For`
    /// entry instead of the connection source address.
    pub on_reverse_proxy: bool,
    /// Seconds a request may take end to end before it is aborted.
    pub request_timeout: u64,
}

impl Default for HttpTrackerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6969".parse().expect("hardcoded socket address is valid"),
            on_reverse_proxy: false,
            request_timeout: 30,
        }
    }
}

impl HttpTrackerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

/// UDP frontend settings.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct UdpTrackerConfig {
    /// The address the frontend binds to.
    pub bind_address: SocketAddr,
    /// Secret for connection-ID derivation as a hex string. When empty a
    /// random secret is generated at startup and rotated hourly.
    pub private_key: String,
    /// How many previous one-minute buckets a connection ID stays valid for.
    pub max_clock_skew: u64,
}

impl Default for UdpTrackerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:6969".parse().expect("hardcoded socket address is valid"),
            private_key: String::new(),
            max_clock_skew: 1,
        }
    }
}

/// Values the tracker advertises in announce responses.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default)]
pub struct ResponseConfig {
    /// Number of peers returned when the client does not send `numwant`.
    pub default_numwant: u32,
    /// Hard cap applied to the client-requested `numwant`.
    pub max_numwant: u32,
    /// Seconds the client should wait between regular announces.
    pub announce_interval: u32,
    /// Seconds the client must at least wait between announces.
    pub min_announce_interval: u32,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            default_numwant: 50,
            max_numwant: 100,
            announce_interval: 1800,
            min_announce_interval: 900,
        }
    }
}

/// Errors loading or validating the configuration. All of them are fatal at
/// startup.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unable to load configuration: {source}")]
    Load {
        #[from]
        source: figment::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<SocketAddr>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use crate::{Configuration, HookConfig, StorageConfig};

    fn parse(yaml: &str) -> Result<Configuration, figment::Error> {
        use figment::providers::{Format, Yaml};
        use figment::Figment;

        Figment::new().merge(Yaml::string(yaml)).extract()
    }

    #[test]
    fn it_should_fall_back_to_defaults_for_missing_keys() {
        let config = parse("{}").unwrap();

        assert_eq!(config.response.default_numwant, 50);
        assert_eq!(config.response.announce_interval, 1800);
        assert!(config.metrics_addr.is_none());
        assert!(matches!(config.storage, StorageConfig::Memory { .. }));
    }

    #[test]
    fn it_should_parse_a_full_configuration() {
        let yaml = r#"
            log_level: debug
            metrics_addr: "127.0.0.1:6880"
            storage:
              name: memory
              config:
                shard_count: 8
                garbage_collection_interval: 60
                peer_lifetime: 120
                statistics_reporting_interval: 30
            prehooks:
              - name: torrent_approval
                options:
                  hash_list: ["3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0"]
                  invert: false
            posthooks:
              - name: varinterval
                options:
                  modify_response_probability: 1.0
                  max_increase_delta: 30
                  modify_min_interval: true
            udp:
              bind_address: "0.0.0.0:6868"
              private_key: "deadbeef"
              max_clock_skew: 2
            response:
              max_numwant: 80
        "#;

        let config = parse(yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.metrics_addr, Some("127.0.0.1:6880".parse().unwrap()));
        assert_eq!(config.prehooks.len(), 1);
        assert!(matches!(config.posthooks[0], HookConfig::Varinterval { .. }));
        assert_eq!(config.udp.as_ref().unwrap().max_clock_skew, 2);
        assert_eq!(config.response.max_numwant, 80);
        assert_eq!(config.response.default_numwant, 50);
    }

    #[test]
    fn it_should_treat_an_empty_metrics_addr_as_disabled() {
        let config = parse("metrics_addr: \"\"").unwrap();

        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn it_should_reject_a_shard_count_that_is_not_a_power_of_two() {
        let yaml = r#"
            storage:
              name: memory
              config:
                shard_count: 1000
        "#;

        let config = parse(yaml).unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn it_should_reject_an_out_of_range_modify_response_probability() {
        let yaml = r#"
            posthooks:
              - name: varinterval
                options:
                  modify_response_probability: 1.5
        "#;

        let config = parse(yaml).unwrap();

        assert!(config.validate().is_err());
    }
}
